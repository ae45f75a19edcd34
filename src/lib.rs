pub mod config;
pub mod image;
pub mod labels;
pub mod models;
pub mod pipeline;
pub mod utils;
pub mod web;

pub use config::Config;
pub use pipeline::Diagnosis;
pub use utils::error::DermaError;

pub type Result<T> = std::result::Result<T, DermaError>;
