//! Worker module for registering tube handlers and processing jobs.
//!
//! This module provides the consumer side of the queue:
//! - `Worker` - owns the queue connection, the handler table, and dispatch
//! - `JobHandler` - trait implemented once per tube
//! - `DispatchOutcome` - what happened to one reservation
//! - `WorkerError` - processing failures
//! - `WorkerConfig` - worker settings

mod config;
mod dispatch;
mod error;
mod handler;
mod meter;

pub use config::WorkerConfig;
pub use dispatch::DispatchOutcome;
pub use error::WorkerError;
pub use handler::JobHandler;

use std::fmt;

use tracing::{info, warn};

use crate::models::FailureKind;
use crate::queue::QueueClient;
use handler::{HandlerRegistry, TubeRegistration};
use meter::JobMeter;

/// A worker that reserves jobs from watched tubes and dispatches them to
/// registered handlers.
///
/// Registration is the only subscription mechanism: each [`register`] call
/// watches the tube it registers for, so the set of watched tubes tracks the
/// handler table (plus the implicit fallback tube until a job arrives on it).
///
/// [`register`]: Worker::register
pub struct Worker<C> {
    /// Queue connection.
    client: C,
    /// Tube registrations.
    registry: HandlerRegistry,
    /// Worker settings.
    config: WorkerConfig,
    /// RSS sampler for per-job resource reporting.
    meter: JobMeter,
}

impl<C: QueueClient> Worker<C> {
    /// Creates a worker with default settings.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let worker = Worker::new(queue.clone());
    /// ```
    pub fn new(client: C) -> Self {
        Self::with_config(client, WorkerConfig::default())
    }

    /// Creates a worker with the given settings.
    pub fn with_config(client: C, config: WorkerConfig) -> Self {
        info!(fallback_tube = %config.fallback_tube, "worker initialized");
        Self {
            client,
            registry: HandlerRegistry::new(),
            config,
            meter: JobMeter::new(),
        }
    }

    /// Registers a handler for a tube and watches that tube.
    ///
    /// `retry_on` names the one failure kind that releases a failed job for
    /// redelivery instead of burying it; `None` buries on every failure.
    /// Registering the same tube again replaces the earlier handler and
    /// re-issues the (idempotent) watch.
    ///
    /// # Arguments
    ///
    /// * `tube` - The tube to subscribe to
    /// * `handler` - The handler invoked for this tube's jobs
    /// * `retry_on` - Failure kind that warrants redelivery
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError::Queue`] when the watch fails; the handler
    /// table is left unchanged in that case.
    ///
    /// # Example
    ///
    /// ```ignore
    /// worker
    ///     .register("emails", Box::new(SendEmailHandler), Some(FailureKind::TRANSIENT))
    ///     .await?;
    /// ```
    pub async fn register(
        &mut self,
        tube: impl Into<String>,
        handler: Box<dyn JobHandler>,
        retry_on: Option<FailureKind>,
    ) -> Result<(), WorkerError> {
        let tube = tube.into();
        self.client.watch(&tube).await?;

        let replaced = self
            .registry
            .insert(tube.clone(), TubeRegistration::new(handler, retry_on));
        if replaced {
            warn!(tube = %tube, "replacing existing handler registration");
        }
        info!(tube = %tube, retry_on = ?retry_on, "handler registered");
        Ok(())
    }

    /// Processes jobs until the queue reports shutdown.
    ///
    /// Each iteration blocks on `reserve` and dispatches the job it yields.
    /// A `None` reservation means the connection is gone and ends the loop
    /// cleanly.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError::UnknownTube`] when a job arrives from a tube
    /// this worker never registered (and that is not the fallback tube), and
    /// [`WorkerError::Queue`] when a queue operation fails. The job in
    /// flight is released before either error is returned.
    pub async fn process(&self) -> Result<(), WorkerError> {
        info!(tubes = ?self.registry.tubes(), "processing jobs");

        loop {
            match self.client.reserve().await? {
                Some(job) => {
                    self.dispatch_one(Some(job)).await?;
                }
                None => {
                    info!("queue reported shutdown, stopping");
                    return Ok(());
                }
            }
        }
    }

    /// Returns the registered tube names, sorted.
    #[must_use]
    pub fn tubes(&self) -> Vec<&str> {
        self.registry.tubes()
    }

    /// Returns the worker settings.
    #[must_use]
    pub const fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Returns a reference to the queue connection.
    #[must_use]
    pub const fn client(&self) -> &C {
        &self.client
    }
}

impl<C> fmt::Debug for Worker<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Worker")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
