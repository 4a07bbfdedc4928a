//! Core error type
//!
//! The merge engine itself never fails: duplicates and unknown ids are
//! absorbed as no-ops. Errors only come from decoding wire data.

use serde::{Deserialize, Serialize};

/// Error type for feed decoding and validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum FeedError {
    /// A frame or page could not be decoded
    #[error("Decode error: {message}")]
    Decode {
        /// What failed to decode
        message: String,
    },

    /// Structurally valid input that violates a feed rule
    #[error("Invalid: {message}")]
    Invalid {
        /// Description of the violated rule
        message: String,
    },
}

impl FeedError {
    /// Create a decode error
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Create an invalid input error
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for FeedError {
    fn from(err: serde_json::Error) -> Self {
        Self::decode(err.to_string())
    }
}

/// Result alias for core operations
pub type FeedResult<T> = Result<T, FeedError>;
