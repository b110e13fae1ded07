use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// JSON error body shared by all API failure responses: a single
/// human-readable message.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// The failure message
    pub error: String,
}

impl ErrorResponse {
    /// Creates a new ErrorResponse with the given message.
    pub fn new(error: String) -> Self {
        Self { error }
    }
}
