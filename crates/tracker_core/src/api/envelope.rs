//! Response envelope shared by every api operation.

use crate::service::sheet_service::{ErrorKind, SheetServiceError};
use serde::{Deserialize, Serialize};

/// `{success, data?, message?, error?}` wire envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Machine-readable failure class; absent on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorKind>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            error: None,
        }
    }

    pub fn ok_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::ok(data)
        }
    }

    /// Success without payload, e.g. a delete confirmation.
    pub fn confirmed(message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: None,
            message: Some(message.into()),
            error: None,
        }
    }

    pub fn failure(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
            error: Some(kind),
        }
    }

    pub fn from_error(err: &SheetServiceError) -> Self {
        Self::failure(err.kind(), public_message(err))
    }
}

/// Caller-facing message. Not-found errors name only the level that failed.
pub fn public_message(err: &SheetServiceError) -> String {
    match err {
        SheetServiceError::SheetNotFound(_) => "Sheet not found".to_string(),
        SheetServiceError::TopicNotFound(_) => "Topic not found".to_string(),
        SheetServiceError::SubTopicNotFound { .. } => "Sub-topic not found".to_string(),
        SheetServiceError::QuestionNotFound { .. } => "Question not found".to_string(),
        other => other.to_string(),
    }
}
