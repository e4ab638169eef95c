//! Typed views of the queue's stats maps.
//!
//! The queue service reports per-job and per-tube statistics as maps with
//! kebab-case keys (`total-jobs`, `current-jobs-ready`). These structs give
//! those maps a typed shape; serde renames keep the serialized form on the
//! wire names.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::job::JobId;

/// Where a job currently sits in its tube.
///
/// Jobs move `Ready` -> `Reserved` on reservation, back to `Ready` on
/// release, and to `Buried` when poisoned. Deleted jobs have no state: they
/// are gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    /// Eligible for reservation.
    Ready,
    /// Held exclusively by a worker.
    Reserved,
    /// Set aside for manual intervention; never delivered.
    Buried,
}

impl JobState {
    /// Lowercase name as reported by the queue.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::Reserved => "reserved",
            Self::Buried => "buried",
        }
    }
}

impl FromStr for JobState {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ready" => Ok(Self::Ready),
            "reserved" => Ok(Self::Reserved),
            "buried" => Ok(Self::Buried),
            _ => Err(()),
        }
    }
}

/// Statistics for a single job.
///
/// The `tube` field carries the job's origin tube; dispatch routing relies
/// on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct JobStats {
    /// The job's id.
    pub id: JobId,
    /// Tube the job was put into.
    pub tube: String,
    /// Current state.
    pub state: JobState,
    /// Seconds since the job was created.
    pub age: u64,
    /// Times the job has been reserved.
    pub reserves: u32,
    /// Times the job has been released.
    pub releases: u32,
    /// Times the job has been buried.
    pub buries: u32,
}

/// Statistics for a single tube.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TubeStats {
    /// The tube's name.
    pub name: String,
    /// Jobs currently eligible for reservation.
    pub current_jobs_ready: u64,
    /// Jobs currently held by workers.
    pub current_jobs_reserved: u64,
    /// Jobs currently buried.
    pub current_jobs_buried: u64,
    /// Jobs ever created in this tube.
    pub total_jobs: u64,
    /// Delete commands executed against this tube's jobs.
    pub cmd_delete: u64,
}
