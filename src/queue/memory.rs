//! In-memory queue, a miniature of the real service for development and
//! tests.
//!
//! One `InMemoryQueue` models a single queue instance plus one logical
//! connection to it: per-tube FIFO ready lists, buried lists, a watched-tube
//! set, and lifetime command counters. Reservation blocks asynchronously
//! until a job is available or the queue is closed.
//!
//! Handles are cheap to clone and share state, so a producer can `put` on
//! one clone while a worker reserves on another.

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio::time::timeout;

use crate::models::{Job, JobId, JobState, JobStats, TubeStats};
use crate::queue::client::{is_valid_tube_name, QueueClient, DEFAULT_TUBE};
use crate::queue::QueueError;

/// Lifetime counters of successfully processed commands.
///
/// Useful for asserting exactly which operations a worker issued.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    /// Jobs put into the queue.
    pub cmd_put: u64,
    /// Reserve calls (bounded or not).
    pub cmd_reserve: u64,
    /// Jobs deleted.
    pub cmd_delete: u64,
    /// Jobs released.
    pub cmd_release: u64,
    /// Jobs buried.
    pub cmd_bury: u64,
    /// Watch commands.
    pub cmd_watch: u64,
    /// Ignore commands.
    pub cmd_ignore: u64,
}

#[derive(Debug)]
struct JobRecord {
    tube: String,
    payload: Vec<u8>,
    state: JobState,
    created: Instant,
    reserves: u32,
    releases: u32,
    buries: u32,
}

#[derive(Debug, Default)]
struct TubeRecord {
    ready: VecDeque<JobId>,
    buried: Vec<JobId>,
    total_jobs: u64,
    cmd_delete: u64,
}

#[derive(Debug)]
struct State {
    next_id: u64,
    jobs: HashMap<JobId, JobRecord>,
    tubes: HashMap<String, TubeRecord>,
    watching: BTreeSet<String>,
    counters: QueueStats,
    closed: bool,
}

#[derive(Debug)]
struct Inner {
    state: Mutex<State>,
    wake: Notify,
}

/// In-memory implementation of [`QueueClient`].
///
/// Tubes persist once created (by a put or a watch); there is no garbage
/// collection of empty tubes. Reservation picks, among the front jobs of
/// all watched tubes, the one with the smallest id: FIFO within a tube,
/// oldest-front-first across tubes.
///
/// ```ignore
/// let queue = InMemoryQueue::new();
/// let id = queue.put("emails", "hello").await?;
/// let job = queue.reserve_with_timeout(Duration::ZERO).await?;
/// ```
#[derive(Debug, Clone)]
pub struct InMemoryQueue {
    inner: Arc<Inner>,
}

impl InMemoryQueue {
    /// Creates a queue whose connection initially watches [`DEFAULT_TUBE`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_default_tube(DEFAULT_TUBE)
    }

    /// Creates a queue whose connection initially watches `tube`.
    ///
    /// The name is not validated here; deployments that rename the implicit
    /// tube are expected to pick a protocol-legal name.
    #[must_use]
    pub fn with_default_tube(tube: impl Into<String>) -> Self {
        let tube = tube.into();
        let mut tubes = HashMap::new();
        tubes.insert(tube.clone(), TubeRecord::default());
        let mut watching = BTreeSet::new();
        watching.insert(tube);

        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State {
                    next_id: 1,
                    jobs: HashMap::new(),
                    tubes,
                    watching,
                    counters: QueueStats::default(),
                    closed: false,
                }),
                wake: Notify::new(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        // A poisoned lock only means another test thread panicked mid-write;
        // the state itself stays consistent (every mutation is complete
        // before the lock drops).
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Puts a job into `tube`, creating the tube on first use.
    ///
    /// Returns the assigned job id. Producer-side counterpart of the
    /// [`QueueClient`] consumer contract.
    ///
    /// # Errors
    ///
    /// Fails if the queue is closed or the tube name is invalid.
    pub async fn put(&self, tube: &str, payload: impl Into<Vec<u8>>) -> Result<JobId, QueueError> {
        let payload = payload.into();
        let id = {
            let mut state = self.state();
            if state.closed {
                return Err(QueueError::Closed);
            }
            if !is_valid_tube_name(tube) {
                return Err(QueueError::InvalidTubeName {
                    tube: tube.to_string(),
                });
            }

            let id = JobId::new(state.next_id);
            state.next_id += 1;
            state.jobs.insert(
                id,
                JobRecord {
                    tube: tube.to_string(),
                    payload,
                    state: JobState::Ready,
                    created: Instant::now(),
                    reserves: 0,
                    releases: 0,
                    buries: 0,
                },
            );

            let tube_rec = state.tubes.entry(tube.to_string()).or_default();
            tube_rec.ready.push_back(id);
            tube_rec.total_jobs += 1;
            state.counters.cmd_put += 1;
            id
        };

        self.inner.wake.notify_waiters();
        Ok(id)
    }

    /// Closes the connection: pending and future reserves return `None`,
    /// every other operation fails with [`QueueError::Closed`].
    pub fn close(&self) {
        self.state().closed = true;
        self.inner.wake.notify_waiters();
    }

    /// Returns the lifetime command counters.
    #[must_use]
    pub fn stats(&self) -> QueueStats {
        self.state().counters
    }

    /// Returns the currently watched tubes, sorted by name.
    #[must_use]
    pub fn watched_tubes(&self) -> Vec<String> {
        self.state().watching.iter().cloned().collect()
    }

    /// One reservation attempt. `Some(None)` means closed, `Some(Some(_))`
    /// a reserved job, `None` nothing available yet.
    fn try_reserve(&self) -> Option<Option<Job>> {
        let mut state = self.state();
        if state.closed {
            return Some(None);
        }

        // Front job with the smallest id among all watched tubes.
        let mut best: Option<(JobId, String)> = None;
        for tube in &state.watching {
            if let Some(&front) = state.tubes.get(tube).and_then(|t| t.ready.front()) {
                if best.as_ref().map_or(true, |(id, _)| front < *id) {
                    best = Some((front, tube.clone()));
                }
            }
        }
        let (id, tube) = best?;

        let tube_rec = state.tubes.get_mut(&tube)?;
        tube_rec.ready.pop_front();
        let record = state.jobs.get_mut(&id)?;
        record.state = JobState::Reserved;
        record.reserves += 1;
        let payload = record.payload.clone();

        Some(Some(Job::new(id, payload)))
    }

    async fn next_job(&self) -> Option<Job> {
        loop {
            // Register for wakeups before checking, so a put that lands
            // between the check and the await is not lost.
            let notified = self.inner.wake.notified();
            if let Some(result) = self.try_reserve() {
                return result;
            }
            notified.await;
        }
    }
}

impl Default for InMemoryQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QueueClient for InMemoryQueue {
    async fn watch(&self, tube: &str) -> Result<(), QueueError> {
        let mut state = self.state();
        if state.closed {
            return Err(QueueError::Closed);
        }
        if !is_valid_tube_name(tube) {
            return Err(QueueError::InvalidTubeName {
                tube: tube.to_string(),
            });
        }

        // A tube exists while anything watches it.
        state.tubes.entry(tube.to_string()).or_default();
        state.watching.insert(tube.to_string());
        state.counters.cmd_watch += 1;
        Ok(())
    }

    async fn ignore(&self, tube: &str) -> Result<(), QueueError> {
        let mut state = self.state();
        if state.closed {
            return Err(QueueError::Closed);
        }
        if !is_valid_tube_name(tube) {
            return Err(QueueError::InvalidTubeName {
                tube: tube.to_string(),
            });
        }
        if state.watching.len() == 1 && state.watching.contains(tube) {
            return Err(QueueError::NotIgnored {
                tube: tube.to_string(),
            });
        }

        state.watching.remove(tube);
        state.counters.cmd_ignore += 1;
        Ok(())
    }

    async fn reserve(&self) -> Result<Option<Job>, QueueError> {
        self.state().counters.cmd_reserve += 1;
        Ok(self.next_job().await)
    }

    async fn reserve_with_timeout(&self, duration: Duration) -> Result<Option<Job>, QueueError> {
        self.state().counters.cmd_reserve += 1;
        match timeout(duration, self.next_job()).await {
            Ok(job) => Ok(job),
            // Nothing became available within the window.
            Err(_elapsed) => Ok(None),
        }
    }

    async fn stats_job(&self, job: &Job) -> Result<JobStats, QueueError> {
        let state = self.state();
        if state.closed {
            return Err(QueueError::Closed);
        }
        let record = state
            .jobs
            .get(&job.id)
            .ok_or(QueueError::NotFound { job_id: job.id })?;

        Ok(JobStats {
            id: job.id,
            tube: record.tube.clone(),
            state: record.state,
            age: record.created.elapsed().as_secs(),
            reserves: record.reserves,
            releases: record.releases,
            buries: record.buries,
        })
    }

    async fn stats_tube(&self, tube: &str) -> Result<TubeStats, QueueError> {
        let state = self.state();
        if state.closed {
            return Err(QueueError::Closed);
        }
        if !is_valid_tube_name(tube) {
            return Err(QueueError::InvalidTubeName {
                tube: tube.to_string(),
            });
        }
        let record = state.tubes.get(tube).ok_or_else(|| QueueError::UnknownTube {
            tube: tube.to_string(),
        })?;

        let reserved = state
            .jobs
            .values()
            .filter(|j| j.tube == tube && j.state == JobState::Reserved)
            .count();

        Ok(TubeStats {
            name: tube.to_string(),
            current_jobs_ready: record.ready.len() as u64,
            current_jobs_reserved: reserved as u64,
            current_jobs_buried: record.buried.len() as u64,
            total_jobs: record.total_jobs,
            cmd_delete: record.cmd_delete,
        })
    }

    async fn delete(&self, job: &Job) -> Result<(), QueueError> {
        let mut state = self.state();
        if state.closed {
            return Err(QueueError::Closed);
        }
        let record = state
            .jobs
            .get(&job.id)
            .ok_or(QueueError::NotFound { job_id: job.id })?;
        if record.state != JobState::Reserved {
            return Err(QueueError::NotReserved { job_id: job.id });
        }

        let tube = record.tube.clone();
        state.jobs.remove(&job.id);
        if let Some(tube_rec) = state.tubes.get_mut(&tube) {
            tube_rec.cmd_delete += 1;
        }
        state.counters.cmd_delete += 1;
        Ok(())
    }

    async fn release(&self, job: &Job) -> Result<(), QueueError> {
        {
            let mut state = self.state();
            if state.closed {
                return Err(QueueError::Closed);
            }
            let record = state
                .jobs
                .get_mut(&job.id)
                .ok_or(QueueError::NotFound { job_id: job.id })?;
            if record.state != JobState::Reserved {
                return Err(QueueError::NotReserved { job_id: job.id });
            }

            record.state = JobState::Ready;
            record.releases += 1;
            let tube = record.tube.clone();
            if let Some(tube_rec) = state.tubes.get_mut(&tube) {
                // Released jobs rejoin at the back of the FIFO.
                tube_rec.ready.push_back(job.id);
            }
            state.counters.cmd_release += 1;
        }
        self.inner.wake.notify_waiters();
        Ok(())
    }

    async fn bury(&self, job: &Job) -> Result<(), QueueError> {
        let mut state = self.state();
        if state.closed {
            return Err(QueueError::Closed);
        }
        let record = state
            .jobs
            .get_mut(&job.id)
            .ok_or(QueueError::NotFound { job_id: job.id })?;
        if record.state != JobState::Reserved {
            return Err(QueueError::NotReserved { job_id: job.id });
        }

        record.state = JobState::Buried;
        record.buries += 1;
        let tube = record.tube.clone();
        if let Some(tube_rec) = state.tubes.get_mut(&tube) {
            tube_rec.buried.push(job.id);
        }
        state.counters.cmd_bury += 1;
        Ok(())
    }
}
