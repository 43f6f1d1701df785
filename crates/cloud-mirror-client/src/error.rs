//! Error types for the cloud mirror client

use std::fmt;

#[derive(Debug)]
pub enum CloudMirrorError {
    Http(Box<reqwest::Error>),
    InvalidUrl(String),
    /// The object store answered with a non-success status
    Status { status: u16, key: String },
    Io(std::io::Error),
}

impl fmt::Display for CloudMirrorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloudMirrorError::Http(err) => write!(f, "HTTP error: {}", err),
            CloudMirrorError::InvalidUrl(msg) => write!(f, "Invalid mirror URL: {}", msg),
            CloudMirrorError::Status { status, key } => {
                write!(f, "Object store returned status {} for {}", status, key)
            }
            CloudMirrorError::Io(err) => write!(f, "IO error: {}", err),
        }
    }
}

impl std::error::Error for CloudMirrorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CloudMirrorError::Http(err) => Some(err.as_ref()),
            CloudMirrorError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for CloudMirrorError {
    fn from(err: reqwest::Error) -> Self {
        CloudMirrorError::Http(Box::new(err))
    }
}

impl From<std::io::Error> for CloudMirrorError {
    fn from(err: std::io::Error) -> Self {
        CloudMirrorError::Io(err)
    }
}

impl From<url::ParseError> for CloudMirrorError {
    fn from(err: url::ParseError) -> Self {
        CloudMirrorError::InvalidUrl(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CloudMirrorError>;
