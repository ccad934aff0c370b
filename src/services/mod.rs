pub mod analysis;
pub mod api_client;
pub mod cancel;
pub mod clinic_locator;
pub mod geocoder;
pub mod navigation;
pub mod presentation;
pub mod preview;
