use thiserror::Error;

pub type Result<T> = std::result::Result<T, AlbumError>;

#[derive(Debug, Error)]
pub enum AlbumError {
    /// A required setting, secret or value is missing or malformed.
    #[error("{0}")]
    Configuration(String),
    #[error("{0}")]
    NotFound(String),
    #[error("request to photo service failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("could not decode image: {0}")]
    Decode(#[from] image::ImageError),
    /// Boundary error surfaced to the host once a provider gave up.
    #[error("Failed to load image, please check logs.")]
    LoadFailed {
        #[source]
        source: Option<Box<AlbumError>>,
    },
}

impl AlbumError {
    pub fn config(msg: impl Into<String>) -> Self {
        AlbumError::Configuration(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        AlbumError::NotFound(msg.into())
    }

    pub fn load_failed(cause: AlbumError) -> Self {
        AlbumError::LoadFailed {
            source: Some(Box::new(cause)),
        }
    }
}
