//! Handler failure types.
//!
//! Handlers report failure with a [`HandlerError`], which carries a
//! [`FailureKind`] discriminator. The worker compares that kind against the
//! kind configured as retryable for the job's tube; a match releases the job
//! for redelivery, anything else buries it.

use std::fmt;

use thiserror::Error;

/// Tagged discriminator for classifying handler failures.
///
/// Kinds are plain named tags compared by equality, with no hierarchy and
/// no introspection. Callers define their own kinds as constants:
///
/// ```ignore
/// const GATEWAY_DOWN: FailureKind = FailureKind::new("gateway-down");
///
/// worker.register("payments", Box::new(ChargeHandler), Some(GATEWAY_DOWN)).await?;
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FailureKind(&'static str);

impl FailureKind {
    /// A generic transient failure, suitable when no finer classification
    /// is needed.
    pub const TRANSIENT: Self = Self::new("transient");

    /// Creates a failure kind with the given tag.
    #[must_use]
    pub const fn new(tag: &'static str) -> Self {
        Self(tag)
    }

    /// Returns the kind's tag.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        self.0
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Error returned by a job handler.
///
/// Carries the failure kind used for the retry decision plus a human-readable
/// message for the logs. Handler errors never escape dispatch: the worker
/// translates them into a release or a bury.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct HandlerError {
    kind: FailureKind,
    message: String,
}

impl HandlerError {
    /// Creates a handler error with the given kind and message.
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Creates a [`FailureKind::TRANSIENT`] handler error.
    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(FailureKind::TRANSIENT, message)
    }

    /// Returns the failure kind.
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        self.kind
    }

    /// Returns the failure message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}
