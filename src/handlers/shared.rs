use actix_web::{
    error::{JsonPayloadError, PathError},
    Error as ActixError, HttpRequest,
};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Body for errors and acknowledgements: `{"message": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

/// Malformed JSON bodies become a 400 with a `{message}` body.
pub fn json_error_handler(error: JsonPayloadError, _req: &HttpRequest) -> ActixError {
    let message = match &error {
        JsonPayloadError::Deserialize(inner) => format!("Invalid request body: {}", inner),
        JsonPayloadError::ContentType => "Content type must be application/json".to_string(),
        other => format!("Invalid request body: {}", other),
    };
    AppError::Validation(message).into()
}

pub fn path_error_handler(error: PathError, _req: &HttpRequest) -> ActixError {
    log::debug!("Rejected path: {}", error);
    AppError::validation("Invalid id").into()
}
