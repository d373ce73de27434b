//! Domain error surfaced by the Twilio REST APIs and by the build orchestrator.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error code raised when a Runtime build ends in the `failed` status.
pub const BUILD_FAILED_CODE: u32 = 20400;
/// Error code raised when a Runtime build does not finish in time.
pub const BUILD_TIMEOUT_CODE: u32 = 11205;

/// A Twilio API error: numeric code, message and the HTTP status it maps to.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message} (code {code}, status {status})")]
pub struct ApiError {
    pub code: u32,
    pub message: String,
    pub status: u16,
}

impl ApiError {
    pub fn new(code: u32, message: impl Into<String>, status: u16) -> Self {
        Self {
            code,
            message: message.into(),
            status,
        }
    }

    pub fn build_failed() -> Self {
        Self::new(BUILD_FAILED_CODE, "Twilio Runtime build has failed.", 400)
    }

    pub fn build_timeout() -> Self {
        Self::new(
            BUILD_TIMEOUT_CODE,
            "Timeout while waiting for new Twilio Runtime build status to change to complete.",
            408,
        )
    }

    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }
}
