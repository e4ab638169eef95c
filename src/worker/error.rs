//! Worker errors.

use thiserror::Error;

use crate::models::JobId;
use crate::queue::QueueError;

/// Error returned by worker operations.
///
/// Handler failures are not represented here: dispatch absorbs them into a
/// release or a bury. What remains is queue transport trouble and the one
/// condition the worker cannot recover from on its own.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkerError {
    /// A job was reserved from a tube that has no registered handler and is
    /// not the fallback tube. The worker only watches tubes it registered,
    /// so this means its subscription state no longer matches reality.
    #[error("job {job_id} reserved from unknown tube {tube:?}")]
    UnknownTube {
        /// Tube the job was reserved from.
        tube: String,
        /// The reserved job.
        job_id: JobId,
    },

    /// A queue operation failed.
    #[error("queue operation failed: {0}")]
    Queue(#[from] QueueError),
}
