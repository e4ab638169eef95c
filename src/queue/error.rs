//! Error types for queue operations.

use thiserror::Error;

use crate::models::JobId;

/// Errors reported by a queue client.
///
/// The vocabulary mirrors the queue protocol's error replies: operations on
/// jobs a client does not hold fail, ignoring the last watched tube fails,
/// and nothing works on a closed connection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    /// The job does not exist (it may have been deleted).
    #[error("job {job_id} not found")]
    NotFound {
        /// The id that could not be resolved.
        job_id: JobId,
    },

    /// The job exists but is not currently reserved by this client.
    ///
    /// Delete, release, and bury only operate on a job the client holds.
    #[error("job {job_id} is not reserved by this connection")]
    NotReserved {
        /// The id of the job in the wrong state.
        job_id: JobId,
    },

    /// Refused to ignore the only watched tube.
    ///
    /// A connection must always watch at least one tube, so the last one
    /// cannot be ignored.
    #[error("cannot ignore '{tube}': it is the only watched tube")]
    NotIgnored {
        /// The tube that was not ignored.
        tube: String,
    },

    /// The named tube does not exist.
    #[error("tube '{tube}' not found")]
    UnknownTube {
        /// The missing tube's name.
        tube: String,
    },

    /// The tube name violates the naming rules.
    ///
    /// Names are 1 to 200 ASCII characters from letters, digits, and
    /// `- + / ; . $ _ ( )`, and may not start with a hyphen.
    #[error("invalid tube name '{tube}'")]
    InvalidTubeName {
        /// The rejected name.
        tube: String,
    },

    /// The connection has been closed; no further operations are possible.
    #[error("queue connection is closed")]
    Closed,
}
