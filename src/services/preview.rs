use crate::error::AppError;
use crate::models::predict_types::SelectedFile;
use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::ImageReader;
use std::path::Path;

const PREVIEW_SIZE: u32 = 320;
const PREVIEW_QUALITY: u8 = 75;

/// Small JPEG data URL of a picked image, shown before it is uploaded.
pub fn preview_data_url(path: &Path) -> Result<String, AppError> {
    let img = ImageReader::open(path)
        .map_err(|e| AppError::validation(format!("Failed to open image {}: {}", path.display(), e)))?
        .with_guessed_format()
        .map_err(|e| AppError::validation(format!("Failed to read image {}: {}", path.display(), e)))?
        .decode()
        .map_err(|e| AppError::validation(format!("Failed to decode image {}: {}", path.display(), e)))?;

    let img = if img.width() > PREVIEW_SIZE || img.height() > PREVIEW_SIZE {
        img.resize(PREVIEW_SIZE, PREVIEW_SIZE, FilterType::Triangle)
    } else {
        img
    };

    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, PREVIEW_QUALITY).encode_image(&img.to_rgb8())?;

    let b64 = base64::engine::general_purpose::STANDARD.encode(&bytes);
    Ok(format!("data:image/jpeg;base64,{}", b64))
}

/// Drops paths that are not image files the backend accepts.
pub fn accepted_images(paths: Vec<String>) -> Vec<SelectedFile> {
    paths
        .into_iter()
        .map(SelectedFile::new)
        .filter(|f| is_accepted_image(f.path()))
        .collect()
}

pub fn is_accepted_image(path: &Path) -> bool {
    matches!(
        image::ImageFormat::from_path(path),
        Ok(image::ImageFormat::Jpeg) | Ok(image::ImageFormat::Png)
    )
}
