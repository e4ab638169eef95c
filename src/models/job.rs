//! Job handle types.
//!
//! A [`Job`] is a unit of work owned by the queue service for the duration of
//! a reservation. Workers never mutate a job directly; they only ask the
//! queue to delete, release, or bury it.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier assigned to a job by the queue service.
///
/// Job ids are unsigned 64-bit integers, unique per queue instance and
/// monotonically increasing, so comparing two ids orders jobs by creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(u64);

impl JobId {
    /// Creates a job id from its raw value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw id value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<u64> for JobId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// A reserved unit of work: an id plus an opaque payload.
///
/// The payload is raw bytes; interpreting it (JSON, text, anything else) is
/// the handler's concern. The handle says nothing about the tube the job
/// came from; that association lives with the queue and is discovered via
/// a stats lookup at dispatch time.
#[derive(Clone, PartialEq, Eq)]
pub struct Job {
    /// Queue-assigned identifier.
    pub id: JobId,
    /// Opaque payload bytes.
    pub payload: Vec<u8>,
}

impl Job {
    /// Creates a job handle from an id and payload.
    #[must_use]
    pub fn new(id: JobId, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            id,
            payload: payload.into(),
        }
    }

    /// Returns the payload as UTF-8 text, or `None` if it is not valid UTF-8.
    #[must_use]
    pub fn payload_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.payload).ok()
    }
}

// Payloads can be large and are not generally printable, so Debug reports
// only their length.
impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("id", &self.id)
            .field("payload_len", &self.payload.len())
            .finish()
    }
}
