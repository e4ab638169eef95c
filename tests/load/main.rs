//! Load tests for the tubeline worker.
//!
//! These tests push batches of jobs from concurrent producers through a
//! single worker loop to check nothing is lost or reordered under sustained
//! submission. Everything runs in memory.
//!
//! Run: cargo test --test load -- --nocapture

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tubeline::{HandlerError, InMemoryQueue, Job, JobHandler, Worker};

/// Configuration for load tests.
#[derive(Debug, Clone)]
struct LoadTestConfig {
    /// Number of concurrent producers.
    num_producers: usize,
    /// Jobs each producer submits.
    jobs_per_producer: usize,
    /// Tubes the jobs spread across.
    num_tubes: usize,
    /// How long to wait for the queue to drain.
    timeout: Duration,
}

impl Default for LoadTestConfig {
    fn default() -> Self {
        Self {
            num_producers: 4,
            jobs_per_producer: 50,
            num_tubes: 3,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Handler that counts completions.
struct CountingHandler {
    completed: Arc<AtomicUsize>,
}

#[async_trait]
impl JobHandler for CountingHandler {
    async fn handle(&self, _job: &Job) -> Result<(), HandlerError> {
        self.completed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Handler that records payloads in completion order.
struct OrderedHandler {
    seen: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl JobHandler for OrderedHandler {
    async fn handle(&self, job: &Job) -> Result<(), HandlerError> {
        let payload = job.payload_str().unwrap_or_default().to_string();
        self.seen.lock().unwrap().push(payload);
        Ok(())
    }
}

/// Runs concurrent producers against one worker and returns the number of
/// jobs it completed.
async fn run_load_test(config: LoadTestConfig) -> usize {
    let queue = InMemoryQueue::new();
    let completed = Arc::new(AtomicUsize::new(0));

    let mut worker = Worker::new(queue.clone());
    for tube in 0..config.num_tubes {
        worker
            .register(
                format!("load-{tube}"),
                Box::new(CountingHandler {
                    completed: completed.clone(),
                }),
                None,
            )
            .await
            .expect("register");
    }
    let processor = tokio::spawn(async move { worker.process().await });

    let total = config.num_producers * config.jobs_per_producer;
    let mut producers = Vec::new();
    for p in 0..config.num_producers {
        let queue = queue.clone();
        let num_tubes = config.num_tubes;
        let jobs = config.jobs_per_producer;
        producers.push(tokio::spawn(async move {
            for j in 0..jobs {
                let tube = format!("load-{}", j % num_tubes);
                queue
                    .put(&tube, format!("producer-{p} job-{j}"))
                    .await
                    .expect("put");
            }
        }));
    }
    for handle in producers {
        handle.await.expect("producer");
    }

    // Gate shutdown on the queue-side delete counter: once it matches, the
    // worker has finished the terminal operation for every job.
    let deadline = Instant::now() + config.timeout;
    while queue.stats().cmd_delete < total as u64 {
        assert!(
            Instant::now() < deadline,
            "queue did not drain: {} of {total} jobs completed",
            completed.load(Ordering::SeqCst)
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    queue.close();
    processor.await.expect("join").expect("process");

    completed.load(Ordering::SeqCst)
}

#[tokio::test]
async fn test_basic_load() {
    let config = LoadTestConfig::default();
    let total = config.num_producers * config.jobs_per_producer;

    let start = Instant::now();
    let completed = run_load_test(config).await;
    println!("processed {completed} jobs in {:?}", start.elapsed());

    assert_eq!(completed, total);
}

#[tokio::test]
async fn test_many_producers_few_jobs_each() {
    let config = LoadTestConfig {
        num_producers: 20,
        jobs_per_producer: 5,
        num_tubes: 2,
        timeout: Duration::from_secs(30),
    };
    let total = config.num_producers * config.jobs_per_producer;

    let completed = run_load_test(config).await;
    assert_eq!(completed, total);
}

#[tokio::test]
async fn test_single_tube_preserves_order_under_load() {
    let queue = InMemoryQueue::new();
    let seen = Arc::new(Mutex::new(Vec::new()));

    let mut worker = Worker::new(queue.clone());
    worker
        .register("orders", Box::new(OrderedHandler { seen: seen.clone() }), None)
        .await
        .expect("register");
    let processor = tokio::spawn(async move { worker.process().await });

    let count: u64 = 300;
    let expected: Vec<String> = (0..count).map(|i| format!("job-{i:04}")).collect();
    for payload in &expected {
        queue.put("orders", payload.clone()).await.expect("put");
    }

    let deadline = Instant::now() + Duration::from_secs(30);
    while queue.stats().cmd_delete < count {
        assert!(Instant::now() < deadline, "queue did not drain");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    queue.close();
    processor.await.expect("join").expect("process");

    assert_eq!(*seen.lock().unwrap(), expected);
}

#[tokio::test]
async fn test_worker_survives_idle_gaps() {
    let queue = InMemoryQueue::new();
    let completed = Arc::new(AtomicUsize::new(0));

    let mut worker = Worker::new(queue.clone());
    worker
        .register(
            "bursts",
            Box::new(CountingHandler {
                completed: completed.clone(),
            }),
            None,
        )
        .await
        .expect("register");
    let processor = tokio::spawn(async move { worker.process().await });

    // Two bursts separated by an idle stretch where the worker sits in a
    // blocked reserve.
    for burst in 0..2 {
        for j in 0..10 {
            queue
                .put("bursts", format!("burst-{burst} job-{j}"))
                .await
                .expect("put");
        }

        let target = (burst + 1) * 10;
        let deadline = Instant::now() + Duration::from_secs(10);
        while queue.stats().cmd_delete < target {
            assert!(Instant::now() < deadline, "burst {burst} did not drain");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    queue.close();
    processor.await.expect("join").expect("process");

    assert_eq!(completed.load(Ordering::SeqCst), 20);
}
