
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DonnedError {
    #[error("Codec error: {0}")]
    Codec(String),
    #[error("Incompatible snapshot: {0}")]
    Snapshot(String),
    #[error("Data corruption: {message}")]
    DataCorruption { message: String },
}

pub type Result<T> = std::result::Result<T, DonnedError>;

// Helper conversions
impl From<std::io::Error> for DonnedError {
    fn from(e: std::io::Error) -> Self { Self::Codec(e.to_string()) }
}
impl From<bincode::Error> for DonnedError {
    fn from(e: bincode::Error) -> Self { Self::Codec(e.to_string()) }
}
