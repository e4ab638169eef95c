//! Data model for jobs, handler failures, and queue statistics.

mod failure;
mod job;
mod stats;

pub use failure::{FailureKind, HandlerError};
pub use job::{Job, JobId};
pub use stats::{JobState, JobStats, TubeStats};
