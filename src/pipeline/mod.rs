pub mod runner;
pub mod types;

pub use runner::Pipeline;
pub use types::Diagnosis;
