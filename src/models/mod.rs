pub mod link;

pub use link::{CreateLinkRequest, ScanEvent, ShortLink, UpdateLinkRequest};

use serde::Serialize;

/// JSON error body shared by the API, auth and redirect surfaces.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub message: String,
}
