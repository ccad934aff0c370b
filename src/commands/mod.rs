pub mod analysis;
pub mod clinic;
pub mod navigation;
