use thiserror::Error;

pub type Result<T> = std::result::Result<T, KintsugiError>;

#[derive(Debug, Error)]
pub enum KintsugiError {
    #[error("malformed scramble key: {0}")]
    MalformedKey(String),

    #[error("no scramble key published for image '{0}'")]
    KeyMissing(String),

    #[error("not a recognized series URL: '{0}'")]
    InvalidUrl(String),

    #[error("page scrape failed: {0}")]
    Scrape(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("image error: {0}")]
    Image(#[source] Box<image::ImageError>),

    #[error("JSON decode error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl From<image::ImageError> for KintsugiError {
    fn from(value: image::ImageError) -> Self {
        KintsugiError::Image(Box::new(value))
    }
}
