//! Resident memory sampling for per-job resource reporting.

use std::fmt;
use std::sync::{Mutex, PoisonError};

use sysinfo::{get_current_pid, Pid, System};

/// Samples this process's resident set size around each job.
///
/// Sampling degrades to zero rather than failing: a job report is not worth
/// aborting dispatch over.
pub(crate) struct JobMeter {
    system: Mutex<System>,
    pid: Option<Pid>,
}

impl JobMeter {
    pub(crate) fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
            pid: get_current_pid().ok(),
        }
    }

    /// Current resident set size in bytes, 0 when the platform gives no
    /// answer.
    pub(crate) fn resident_memory(&self) -> u64 {
        let Some(pid) = self.pid else {
            return 0;
        };
        let mut system = self
            .system
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if !system.refresh_process(pid) {
            return 0;
        }
        system.process(pid).map_or(0, sysinfo::Process::memory)
    }
}

impl fmt::Debug for JobMeter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobMeter")
            .field("pid", &self.pid)
            .finish_non_exhaustive()
    }
}

/// Signed difference between two RSS samples taken around a job.
#[allow(clippy::cast_possible_wrap)]
pub(crate) fn delta_bytes(before: u64, after: u64) -> i64 {
    after.wrapping_sub(before) as i64
}
