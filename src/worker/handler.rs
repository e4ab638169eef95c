//! Job handler trait and the per-worker registration table.
//!
//! A handler carries the application logic for one tube. The worker owns the
//! table mapping tube names to handlers, together with each tube's optional
//! retryable failure kind.

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;

use crate::models::{FailureKind, HandlerError, Job};

/// Trait for job handlers.
///
/// Implement this trait to process jobs arriving on one tube. Handlers are
/// async and report failures through [`HandlerError`]; the error's kind
/// decides whether the worker releases the job for another attempt or
/// buries it.
///
/// # Example
///
/// ```ignore
/// use async_trait::async_trait;
/// use tubeline::{FailureKind, HandlerError, Job, JobHandler};
///
/// struct SendEmailHandler;
///
/// #[async_trait]
/// impl JobHandler for SendEmailHandler {
///     async fn handle(&self, job: &Job) -> Result<(), HandlerError> {
///         let address = job
///             .payload_str()
///             .ok_or_else(|| HandlerError::new(
///                 FailureKind::new("malformed"),
///                 "payload is not UTF-8",
///             ))?;
///         send_email(address).await
///             .map_err(|e| HandlerError::transient(e.to_string()))
///     }
/// }
/// ```
#[async_trait]
pub trait JobHandler: Send + Sync {
    /// Processes one reserved job.
    ///
    /// # Errors
    ///
    /// Returns a [`HandlerError`] describing the failure. The worker
    /// compares its kind against the tube's registered retryable kind to
    /// pick between release and bury.
    async fn handle(&self, job: &Job) -> Result<(), HandlerError>;
}

/// A tube's entry in the worker's table: the handler plus the failure kind
/// that warrants redelivery instead of burial.
pub(crate) struct TubeRegistration {
    pub(crate) handler: Box<dyn JobHandler>,
    pub(crate) retry_on: Option<FailureKind>,
}

impl TubeRegistration {
    pub(crate) fn new(handler: Box<dyn JobHandler>, retry_on: Option<FailureKind>) -> Self {
        Self { handler, retry_on }
    }
}

impl fmt::Debug for TubeRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TubeRegistration")
            .field("retry_on", &self.retry_on)
            .finish_non_exhaustive()
    }
}

/// Registry of tube registrations.
///
/// Maps tube names to their handlers so dispatch can route a reserved job
/// by its origin tube. Later registrations for the same tube replace
/// earlier ones.
#[derive(Default)]
pub(crate) struct HandlerRegistry {
    entries: HashMap<String, TubeRegistration>,
}

impl HandlerRegistry {
    /// Creates a new empty registry.
    #[must_use]
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Registers `registration` for `tube`, returning `true` when an
    /// earlier registration was replaced.
    pub(crate) fn insert(&mut self, tube: impl Into<String>, registration: TubeRegistration) -> bool {
        self.entries.insert(tube.into(), registration).is_some()
    }

    /// Gets the registration for a tube, if any.
    #[must_use]
    pub(crate) fn get(&self, tube: &str) -> Option<&TubeRegistration> {
        self.entries.get(tube)
    }

    /// Returns the registered tube names, sorted.
    #[must_use]
    pub(crate) fn tubes(&self) -> Vec<&str> {
        let mut tubes: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        tubes.sort_unstable();
        tubes
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("tubes", &self.tubes())
            .finish()
    }
}
