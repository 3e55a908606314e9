pub mod models;
pub mod status;
pub mod templates;
