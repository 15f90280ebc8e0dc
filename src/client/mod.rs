pub mod http;
pub mod types;

use crate::registry::ImageItem;
use std::time::Duration;
use thiserror::Error;

pub use types::{ImagePayload, Prediction};

/// Failure of one collaborator call. Always scoped to the item it was made for.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("endpoint returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed response: {0}")]
    Malformed(String),
}

pub trait AnonymizeClient {
    /// Sends the raw upload and returns the encoded image the service produced.
    fn anonymize(&self, image: &ImageItem) -> Result<Vec<u8>, ClientError>;
}

pub trait Classifier {
    fn predict(&self, image: &ImageItem) -> Result<Prediction, ClientError>;
    fn saliency(&self, image: &ImageItem) -> Result<Vec<u8>, ClientError>;
}
