//! Single-job dispatch.
//!
//! This module routes one reserved job to its tube's handler and maps the
//! handler's result to exactly one terminal queue operation: delete on
//! success, release when the failure kind is the tube's retryable kind,
//! bury otherwise.

use std::time::Instant;

use metrics::{counter, histogram};
use tracing::{error, info, warn};

use crate::models::{FailureKind, Job, JobId, JobStats};
use crate::queue::QueueClient;
use crate::worker::{meter, Worker, WorkerError};

/// Result of dispatching one reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// There was no job to dispatch.
    Idle,
    /// The handler succeeded and the job was deleted.
    Completed {
        /// The finished job.
        job_id: JobId,
    },
    /// The handler failed with the tube's retryable kind and the job was
    /// released for another attempt.
    Retried {
        /// The released job.
        job_id: JobId,
        /// The failure kind that triggered the release.
        kind: FailureKind,
    },
    /// The handler failed with any other kind and the job was buried.
    Buried {
        /// The buried job.
        job_id: JobId,
    },
    /// The job came from the fallback tube with no handler registered; it
    /// was released and the tube unwatched.
    OrphanReleased {
        /// The released job.
        job_id: JobId,
    },
}

impl DispatchOutcome {
    /// Returns true when there was no job to dispatch.
    #[must_use]
    pub const fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// Returns the dispatched job's id, `None` when idle.
    #[must_use]
    pub const fn job_id(&self) -> Option<JobId> {
        match self {
            Self::Idle => None,
            Self::Completed { job_id }
            | Self::Retried { job_id, .. }
            | Self::Buried { job_id }
            | Self::OrphanReleased { job_id } => Some(*job_id),
        }
    }
}

impl<C: QueueClient> Worker<C> {
    /// Dispatches a single reservation.
    ///
    /// The queue does not say which tube a reservation came from, so dispatch
    /// first asks via `stats-job`, then:
    ///
    /// 1. `None` is a no-op, [`DispatchOutcome::Idle`].
    /// 2. A registered tube runs its handler. Success deletes the job; a
    ///    failure matching the tube's retryable kind releases it; any other
    ///    failure buries it.
    /// 3. The fallback tube with no handler means the implicit subscription
    ///    never got dropped: the job is released and the tube unwatched, and
    ///    processing continues.
    /// 4. Any other handlerless tube is a subscription invariant violation.
    ///    The job is released and the call fails.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError::UnknownTube`] for case 4 and
    /// [`WorkerError::Queue`] when a queue operation fails.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let job = queue.reserve_with_timeout(Duration::from_secs(5)).await?;
    /// match worker.dispatch_one(job).await? {
    ///     DispatchOutcome::Idle => println!("nothing to do"),
    ///     outcome => println!("dispatched: {outcome:?}"),
    /// }
    /// ```
    pub async fn dispatch_one(&self, job: Option<Job>) -> Result<DispatchOutcome, WorkerError> {
        let Some(job) = job else {
            return Ok(DispatchOutcome::Idle);
        };

        let stats = self.client.stats_job(&job).await?;
        let Some(registration) = self.registry.get(&stats.tube) else {
            return self.dispatch_orphan(&job, &stats).await;
        };
        let tube = stats.tube;

        let memory_before = self.meter.resident_memory();
        let start = Instant::now();
        let result = registration.handler.handle(&job).await;
        let duration = start.elapsed();

        // Handler duration is recorded for every attempt, whatever follows.
        histogram!("tubeline.job.duration_seconds", "tube" => tube.clone())
            .record(duration.as_secs_f64());

        match result {
            Ok(()) => {
                self.client.delete(&job).await?;
                let memory_delta =
                    meter::delta_bytes(memory_before, self.meter.resident_memory());
                counter!("tubeline.jobs.completed", "tube" => tube.clone()).increment(1);
                info!(
                    job_id = %job.id,
                    tube = %tube,
                    elapsed_secs = duration.as_secs_f64(),
                    memory_delta_bytes = memory_delta,
                    "job completed"
                );
                Ok(DispatchOutcome::Completed { job_id: job.id })
            }
            Err(e) if registration.retry_on == Some(e.kind()) => {
                self.client.release(&job).await?;
                counter!("tubeline.jobs.retried", "tube" => tube.clone(), "kind" => e.kind().tag())
                    .increment(1);
                warn!(
                    job_id = %job.id,
                    tube = %tube,
                    error = %e,
                    "job failed with the tube's retryable kind, released for retry"
                );
                Ok(DispatchOutcome::Retried {
                    job_id: job.id,
                    kind: e.kind(),
                })
            }
            Err(e) => {
                self.client.bury(&job).await?;
                counter!("tubeline.jobs.buried", "tube" => tube.clone()).increment(1);
                error!(
                    job_id = %job.id,
                    tube = %tube,
                    kind = %e.kind(),
                    error = %e,
                    "job failed, buried"
                );
                Ok(DispatchOutcome::Buried { job_id: job.id })
            }
        }
    }

    /// Handles a job from a tube with no registered handler.
    async fn dispatch_orphan(
        &self,
        job: &Job,
        stats: &JobStats,
    ) -> Result<DispatchOutcome, WorkerError> {
        let tube = stats.tube.as_str();

        if tube == self.config.fallback_tube {
            // The implicit subscription delivered a job nobody registered
            // for. Put it back and drop the subscription so it cannot recur.
            self.client.release(job).await?;
            self.client.ignore(tube).await?;
            counter!("tubeline.jobs.orphaned", "tube" => tube.to_string()).increment(1);
            warn!(
                job_id = %job.id,
                tube = %tube,
                age_secs = stats.age,
                reserves = stats.reserves,
                "job reserved from fallback tube with no handler, released and tube unwatched"
            );
            return Ok(DispatchOutcome::OrphanReleased { job_id: job.id });
        }

        // This worker only watches tubes it registered handlers for, plus
        // the fallback. A reservation from anywhere else means the
        // subscription state no longer matches reality.
        self.client.release(job).await?;
        error!(
            job_id = %job.id,
            tube = %tube,
            "job reserved from unknown tube, releasing it"
        );
        Err(WorkerError::UnknownTube {
            tube: tube.to_string(),
            job_id: job.id,
        })
    }
}
