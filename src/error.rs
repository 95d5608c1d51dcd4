//! Error types for channel stages.

use std::any::Any;

use thiserror::Error;

/// The main error type for pipeweld stages and channels.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A send was attempted on a closed channel, or every receiver is gone
    #[error("Channel was closed")]
    ChannelClosed,

    /// A transform function failed or panicked for one item
    #[error("Stage `{stage}` failed: {message}")]
    Stage { stage: String, message: String },
}

// Convenience constructors
impl Error {
    /// Create a stage fault from any displayable error
    pub fn stage<S: Into<String>, E: std::fmt::Display>(stage: S, error: E) -> Self {
        Error::Stage {
            stage: stage.into(),
            message: error.to_string(),
        }
    }

    /// Create a stage fault from a caught panic payload
    pub fn panicked<S: Into<String>>(stage: S, payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(msg) = payload.downcast_ref::<&str>() {
            format!("panicked: {}", msg)
        } else if let Some(msg) = payload.downcast_ref::<String>() {
            format!("panicked: {}", msg)
        } else {
            "panicked".to_string()
        };
        Error::Stage {
            stage: stage.into(),
            message,
        }
    }

    /// Whether this error is a fault raised inside a stage function
    pub fn is_stage_fault(&self) -> bool {
        matches!(self, Error::Stage { .. })
    }
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for Error {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        Error::ChannelClosed
    }
}

impl From<tokio::sync::oneshot::error::RecvError> for Error {
    fn from(_: tokio::sync::oneshot::error::RecvError) -> Self {
        Error::ChannelClosed
    }
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, Error>;
