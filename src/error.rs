use hmac::digest::InvalidLength;
use reqwest::header::{InvalidHeaderName, InvalidHeaderValue};
use reqwest::StatusCode;

use crate::ValidationErrors;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Sign Error: {0}")]
    SignError(String),
    #[error("Execute Request Error: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error("Invalid Url: {0}")]
    UrlError(#[from] url::ParseError),
    #[error("Invalid Header Value: {0}")]
    HeaderError(#[from] InvalidHeaderValue),
    #[error("Invalid Header Name: {0}")]
    HeaderNameError(#[from] InvalidHeaderName),
    #[error("Unexpected response {status} for key {key}")]
    ResponseError { status: StatusCode, key: String },
    #[error("Copy to {key} failed: {code} {message}")]
    CopyError {
        key: String,
        code: String,
        message: String,
    },
    #[error("Invalid object key: {0}")]
    KeyError(String),
    #[error("Configuration Error: {0}")]
    ConfigError(String),
    #[error("Upload does not validate: {0}")]
    Validation(ValidationErrors),
}

impl From<InvalidLength> for Error {
    fn from(e: InvalidLength) -> Self {
        Self::SignError(e.to_string())
    }
}

impl From<ValidationErrors> for Error {
    fn from(e: ValidationErrors) -> Self {
        Self::Validation(e)
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
