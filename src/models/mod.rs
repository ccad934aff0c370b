pub mod catalog_types;
pub mod clinic_types;
pub mod predict_types;
