//! Error types for the render phase.
//!
//! Parsing is total and never fails; only renderers (or custom
//! [`Visitor`](crate::walk::Visitor) implementations) produce errors.

use thiserror::Error;

/// An error produced while rendering a document tree.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The underlying writer failed.
    #[error("write failed while rendering: {0}")]
    Write(#[from] std::fmt::Error),

    /// A visitor aborted the walk with a message.
    #[error("render aborted: {0}")]
    Aborted(String),
}

impl RenderError {
    /// Abort a tree walk with a custom message.
    #[must_use]
    pub fn aborted(message: impl Into<String>) -> Self {
        Self::Aborted(message.into())
    }
}
