//! The queue client contract consumed by workers.
//!
//! This trait captures the narrow slice of a queue connection the dispatch
//! logic needs: tube subscription, reservation, the two stats lookups, and
//! the three terminal operations on a reserved job. An implementation backed
//! by a real queue server satisfies it; so does [`InMemoryQueue`] for tests
//! and local development.
//!
//! [`InMemoryQueue`]: crate::queue::InMemoryQueue

use std::time::Duration;

use async_trait::async_trait;

use crate::models::{Job, JobStats, TubeStats};
use crate::queue::QueueError;

/// Maximum length of a tube name in bytes.
pub const MAX_TUBE_NAME_LEN: usize = 200;

/// The tube every connection starts out using and watching.
pub const DEFAULT_TUBE: &str = "default";

/// A connection to a queue service, scoped to one logical consumer.
///
/// Watched tubes are connection state: `reserve` only yields jobs from tubes
/// the connection currently watches. Every reserved job must eventually see
/// exactly one of `delete`, `release`, or `bury`; until then the queue
/// considers it held by this connection.
#[async_trait]
pub trait QueueClient: Send + Sync {
    /// Subscribes the connection to a tube's deliveries. Idempotent.
    ///
    /// # Errors
    ///
    /// Fails if the tube name is invalid or the connection is closed.
    async fn watch(&self, tube: &str) -> Result<(), QueueError>;

    /// Unsubscribes the connection from a tube's deliveries.
    ///
    /// # Errors
    ///
    /// Fails with [`QueueError::NotIgnored`] when `tube` is the only watched
    /// tube, and if the tube name is invalid or the connection is closed.
    async fn ignore(&self, tube: &str) -> Result<(), QueueError>;

    /// Blocks until a job from a watched tube can be reserved.
    ///
    /// Returns `None` only when the connection shuts down; there is no other
    /// way out of the wait.
    ///
    /// # Errors
    ///
    /// Fails on transport problems. A closed connection is not an error
    /// here: it is the `None` return.
    async fn reserve(&self) -> Result<Option<Job>, QueueError>;

    /// Bounded-wait variant of [`reserve`](Self::reserve).
    ///
    /// Returns `None` when the timeout expires with nothing available. A
    /// zero timeout still performs one immediate check.
    ///
    /// # Errors
    ///
    /// Fails on transport problems.
    async fn reserve_with_timeout(&self, timeout: Duration) -> Result<Option<Job>, QueueError>;

    /// Looks up statistics for a job, including its origin tube.
    ///
    /// # Errors
    ///
    /// Fails with [`QueueError::NotFound`] if the job no longer exists.
    async fn stats_job(&self, job: &Job) -> Result<JobStats, QueueError>;

    /// Looks up statistics for a tube.
    ///
    /// # Errors
    ///
    /// Fails with [`QueueError::UnknownTube`] if no such tube exists.
    async fn stats_tube(&self, tube: &str) -> Result<TubeStats, QueueError>;

    /// Permanently removes a reserved job. The terminal acknowledgment.
    ///
    /// # Errors
    ///
    /// Fails unless this connection currently holds the job.
    async fn delete(&self, job: &Job) -> Result<(), QueueError>;

    /// Returns a reserved job to its tube, immediately eligible for
    /// redelivery.
    ///
    /// # Errors
    ///
    /// Fails unless this connection currently holds the job.
    async fn release(&self, job: &Job) -> Result<(), QueueError>;

    /// Moves a reserved job to its tube's buried list, where it stays until
    /// manual intervention.
    ///
    /// # Errors
    ///
    /// Fails unless this connection currently holds the job.
    async fn bury(&self, job: &Job) -> Result<(), QueueError>;
}

/// Checks a tube name against the naming rules: 1 to 200 bytes of ASCII
/// letters, digits, and `- + / ; . $ _ ( )`, not starting with a hyphen.
#[must_use]
pub fn is_valid_tube_name(name: &str) -> bool {
    if name.is_empty() || name.len() > MAX_TUBE_NAME_LEN || name.starts_with('-') {
        return false;
    }
    name.bytes().all(|b| {
        b.is_ascii_alphanumeric()
            || matches!(
                b,
                b'-' | b'+' | b'/' | b';' | b'.' | b'$' | b'_' | b'(' | b')'
            )
    })
}
