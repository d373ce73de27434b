use flex_plugins_core::{ApiError, RestError};
use thiserror::Error;

use crate::model::BuildStatus;

pub type Result<T> = std::result::Result<T, ServerlessError>;

#[derive(Debug, Error)]
pub enum ServerlessError {
    #[error(transparent)]
    Rest(#[from] RestError),
    #[error(transparent)]
    Api(#[from] ApiError),
    /// A build has not reached a terminal status yet.
    #[error("build {sid} is still {status}")]
    BuildPending { sid: String, status: BuildStatus },
}

impl ServerlessError {
    /// The API error behind this failure, if any.
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            Self::Api(err) => Some(err),
            Self::Rest(err) => err.api_error(),
            Self::BuildPending { .. } => None,
        }
    }
}
