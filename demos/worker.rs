//! Example worker that processes email and report jobs.
//!
//! Run with:
//!     cargo run --example worker
//!
//! This example demonstrates:
//! - Implementing the `JobHandler` trait
//! - Registering handlers with per-tube retry kinds
//! - A transient failure being released and redelivered
//! - A malformed job being buried
//! - A stray job on the fallback tube healing the subscription set
//! - Clean shutdown via queue close

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tubeline::{FailureKind, HandlerError, InMemoryQueue, Job, JobHandler, QueueClient, Worker};

const MALFORMED: FailureKind = FailureKind::new("malformed-payload");

/// Handler for email jobs. Buries anything it cannot parse.
struct SendEmailHandler;

#[async_trait]
impl JobHandler for SendEmailHandler {
    async fn handle(&self, job: &Job) -> Result<(), HandlerError> {
        let text = job
            .payload_str()
            .ok_or_else(|| HandlerError::new(MALFORMED, "payload is not UTF-8"))?;
        let value: serde_json::Value =
            serde_json::from_str(text).map_err(|e| HandlerError::new(MALFORMED, e.to_string()))?;
        let to = value["to"]
            .as_str()
            .ok_or_else(|| HandlerError::new(MALFORMED, "missing 'to' field"))?;

        println!("[worker] sending email to {to}");
        Ok(())
    }
}

/// Handler for report jobs. The first attempt fails with a transient error
/// to show the release-and-retry path.
struct GenerateReportHandler {
    failed_once: AtomicBool,
}

#[async_trait]
impl JobHandler for GenerateReportHandler {
    async fn handle(&self, job: &Job) -> Result<(), HandlerError> {
        if !self.failed_once.swap(true, Ordering::SeqCst) {
            println!("[worker] report backend unavailable, job will be retried");
            return Err(HandlerError::transient("report backend unavailable"));
        }

        // Simulate some processing time.
        tokio::time::sleep(Duration::from_millis(100)).await;
        println!(
            "[worker] generated report for job {} ({} bytes)",
            job.id,
            job.payload.len()
        );
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    println!("[worker] starting...");

    let queue = InMemoryQueue::new();
    let mut worker = Worker::new(queue.clone());

    worker
        .register("emails", Box::new(SendEmailHandler), None)
        .await?;
    worker
        .register(
            "reports",
            Box::new(GenerateReportHandler {
                failed_once: AtomicBool::new(false),
            }),
            Some(FailureKind::TRANSIENT),
        )
        .await?;

    println!("[worker] registered tubes: {:?}", worker.tubes());

    let processor = tokio::spawn(async move { worker.process().await });

    // Produce a mix of jobs: two good emails, one malformed one, a report
    // that succeeds on its second attempt, and a stray job on the fallback
    // tube that nothing registered for.
    queue
        .put("emails", json!({"to": "ada@example.com"}).to_string())
        .await?;
    queue
        .put("emails", json!({"to": "grace@example.com"}).to_string())
        .await?;
    queue.put("emails", "not json at all").await?;
    queue
        .put("reports", json!({"period": "2024-Q3"}).to_string())
        .await?;
    queue.put("default", "stray job").await?;

    // Let the worker drain everything, then report before shutting down.
    tokio::time::sleep(Duration::from_secs(1)).await;

    let stats = queue.stats();
    println!();
    println!("[worker] commands: {stats:?}");
    for tube in ["emails", "reports"] {
        let tube_stats = queue.stats_tube(tube).await?;
        println!(
            "[worker] tube {tube}: total-jobs={} buried={} ready={}",
            tube_stats.total_jobs, tube_stats.current_jobs_buried, tube_stats.current_jobs_ready
        );
    }
    println!("[worker] watched tubes after orphan healing: {:?}", queue.watched_tubes());

    queue.close();
    processor.await??;

    println!("[worker] shutdown complete");

    Ok(())
}
