use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SummaryError {
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("File not found: \"{}\". Cannot continue", .0.display())]
    MissingFile(PathBuf),
    #[error("Cannot calculate distance matrix to make tree: {0}")]
    InsufficientData(String),
    #[error("Tree building failed: {0}")]
    TreeBuild(String),
    #[error("Malformed report {}: {message}", .path.display())]
    ReportFormat { path: PathBuf, message: String },
}
