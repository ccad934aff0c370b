use serde::Serialize;

/// Which layer an error came from. Every kind ends up as one user-visible
/// message; the kind only decides how the session and the UI treat it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Caught locally, never reaches the network.
    Validation,
    /// Transport failure, unreadable upload or malformed response.
    Network,
    /// Non-2xx response carrying a structured error body.
    Server,
    /// The request was superseded before its response arrived.
    Cancelled,
}

#[derive(Debug, Clone, Serialize, thiserror::Error)]
#[error("{message}")]
pub struct AppError {
    pub kind: ErrorKind,
    pub message: String,
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Validation,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Network,
            message: message.into(),
        }
    }

    pub fn server(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Server,
            message: message.into(),
        }
    }

    pub fn cancelled() -> Self {
        Self {
            kind: ErrorKind::Cancelled,
            message: "Request cancelled".to_string(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.kind == ErrorKind::Cancelled
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::network(err.to_string())
    }
}

impl From<image::ImageError> for AppError {
    fn from(err: image::ImageError) -> Self {
        AppError::validation(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::network(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::network(err.to_string())
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::validation(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::validation(msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_the_bare_message() {
        let err = AppError::server("model unavailable");
        assert_eq!(err.to_string(), "model unavailable");
        assert_eq!(err.kind, ErrorKind::Server);
    }

    #[test]
    fn serializes_kind_and_message_for_the_frontend() {
        let json = serde_json::to_value(AppError::validation("Please select an image")).unwrap();
        assert_eq!(json["kind"], "validation");
        assert_eq!(json["message"], "Please select an image");
    }

    #[test]
    fn string_conversions_are_validation_errors() {
        let err: AppError = "bad input".into();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert!(!err.is_cancelled());
        assert!(AppError::cancelled().is_cancelled());
    }
}
