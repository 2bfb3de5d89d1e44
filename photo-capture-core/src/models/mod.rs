pub mod capture_artifact;
pub mod capture_models;
pub mod capture_record;
pub mod config;
pub mod error;
pub mod state;
