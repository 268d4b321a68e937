use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImageDataError {
    #[error("Failed to decode {}: {reason}", .path.display())]
    Decode { path: PathBuf, reason: String },

    #[error("Invalid dimensions {width}x{height}: width and height must be positive")]
    InvalidDimension { width: i64, height: i64 },

    #[error("Could not allocate a {width}x{height} pixel buffer")]
    AllocationFailure { width: i64, height: i64 },

    #[error("Pixel ({x}, {y}) is out of bounds for a {width}x{height} buffer")]
    OutOfBounds { x: i64, y: i64, width: u32, height: u32 },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Transform error: {0}")]
    Transform(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ImageDataError>;

// Script runtimes only see the message
impl serde::Serialize for ImageDataError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
