pub mod error;
pub mod types;
pub mod upload;
pub mod validation;
