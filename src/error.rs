use std::path::PathBuf;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Why a command was refused. `Display` is the text sent back to the sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("Your wish cannot be empty!")]
    Empty,

    #[error("Your wish is too long (max {max} characters)!")]
    TooLong { max: usize },

    #[error("Your wish contains forbidden words!")]
    ForbiddenWords,

    #[error("Please wait a moment before sending another wish!")]
    WishCooldown,

    #[error("You have reached the wish limit for this hour!")]
    WishQuota,

    #[error("Please wait a moment before sending another heart!")]
    HeartCooldown,
}

impl Rejection {
    /// Label used for the rejections metric and logs.
    pub fn reason(&self) -> &'static str {
        match self {
            Rejection::Empty => "empty",
            Rejection::TooLong { .. } => "too_long",
            Rejection::ForbiddenWords => "forbidden_words",
            Rejection::WishCooldown => "wish_cooldown",
            Rejection::WishQuota => "wish_quota",
            Rejection::HeartCooldown => "heart_cooldown",
        }
    }

    pub fn is_rate_limit(&self) -> bool {
        matches!(
            self,
            Rejection::WishCooldown | Rejection::WishQuota | Rejection::HeartCooldown
        )
    }
}

#[derive(Debug, Error)]
pub enum GuestbookError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to persist {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Gateway worker is not running")]
    WorkerGone,
}

impl IntoResponse for GuestbookError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "request failed");
        let status = match self {
            GuestbookError::WorkerGone => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, "Internal server error").into_response()
    }
}
