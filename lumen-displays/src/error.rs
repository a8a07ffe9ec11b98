use thiserror::Error;

#[derive(Error, Debug)]
pub enum TopologyError {
    #[error("Display enumeration failed: {0}")]
    Enumeration(String),

    #[error("Screen capture failed: {0}")]
    Capture(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, TopologyError>;
