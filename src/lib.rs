//! tubeline - Tube-routed job worker
//!
//! A consumer layer for beanstalkd-style tube queues: register one handler
//! per tube and the worker watches those tubes, reserves jobs, and maps each
//! handler result onto a terminal queue operation. Success deletes the job,
//! a failure matching the tube's registered retryable kind releases it for
//! redelivery, and any other failure buries it for inspection.
//!
//! The crate ships an in-memory queue for tests and local development;
//! production deployments implement [`QueueClient`] over a real connection.

pub mod models;
pub mod queue;
pub mod worker;

pub use models::{FailureKind, HandlerError, Job, JobId, JobState, JobStats, TubeStats};
pub use queue::{InMemoryQueue, QueueClient, QueueError, QueueStats};
pub use worker::{DispatchOutcome, JobHandler, Worker, WorkerConfig, WorkerError};
