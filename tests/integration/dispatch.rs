//! Test: dispatch maps each handler result to one terminal queue operation.

use tubeline::{
    DispatchOutcome, FailureKind, InMemoryQueue, JobState, QueueClient, Worker, WorkerError,
};

use crate::common::{reserve_now, unique_payload, FailingHandler, RecordingHandler};

#[tokio::test]
async fn test_empty_queue_dispatches_to_idle() {
    let queue = InMemoryQueue::new();
    let mut worker = Worker::new(queue.clone());
    worker
        .register("emails", Box::new(RecordingHandler::new()), None)
        .await
        .unwrap();

    // A bounded reserve on an empty queue comes back empty, and feeding
    // that into dispatch touches nothing.
    let job = reserve_now(&queue).await;
    assert!(job.is_none());

    let outcome = worker.dispatch_one(job).await.unwrap();
    assert!(outcome.is_idle());
    assert_eq!(queue.stats_tube("emails").await.unwrap().total_jobs, 0);
}

#[tokio::test]
async fn test_success_deletes_and_preserves_total_jobs() {
    let queue = InMemoryQueue::new();
    let mut worker = Worker::new(queue.clone());

    let recorder = RecordingHandler::new();
    worker
        .register("emails", Box::new(recorder.clone()), None)
        .await
        .unwrap();

    let payload = unique_payload("welcome-email");
    let id = queue.put("emails", payload.clone()).await.unwrap();
    let job = reserve_now(&queue).await;

    let outcome = worker.dispatch_one(job).await.unwrap();
    assert_eq!(outcome, DispatchOutcome::Completed { job_id: id });
    assert_eq!(recorder.seen(), vec![payload]);

    // The job is gone but the tube remembers it was created.
    let stats = queue.stats_tube("emails").await.unwrap();
    assert_eq!(stats.total_jobs, 1);
    assert_eq!(stats.current_jobs_ready, 0);
    assert_eq!(stats.cmd_delete, 1);
}

#[tokio::test]
async fn test_retryable_failure_releases_for_redelivery() {
    let queue = InMemoryQueue::new();
    let mut worker = Worker::new(queue.clone());

    worker
        .register(
            "payments",
            Box::new(FailingHandler {
                kind: FailureKind::TRANSIENT,
            }),
            Some(FailureKind::TRANSIENT),
        )
        .await
        .unwrap();

    let id = queue.put("payments", "charge #42").await.unwrap();
    let job = reserve_now(&queue).await.unwrap();

    let outcome = worker.dispatch_one(Some(job)).await.unwrap();
    assert_eq!(
        outcome,
        DispatchOutcome::Retried {
            job_id: id,
            kind: FailureKind::TRANSIENT,
        }
    );

    // The same job comes straight back for another attempt.
    let again = reserve_now(&queue).await.unwrap();
    assert_eq!(again.id, id);
    let stats = queue.stats_job(&again).await.unwrap();
    assert_eq!(stats.reserves, 2);
    assert_eq!(stats.releases, 1);
}

#[tokio::test]
async fn test_retry_kinds_do_not_leak_across_tubes() {
    let queue = InMemoryQueue::new();
    let mut worker = Worker::new(queue.clone());

    // Two tubes fail with the same kind; only one of them registered that
    // kind as retryable. Each tube must be judged by its own registration,
    // never by another tube's.
    const GATEWAY_DOWN: FailureKind = FailureKind::new("gateway-down");

    worker
        .register(
            "invoices",
            Box::new(FailingHandler { kind: GATEWAY_DOWN }),
            None,
        )
        .await
        .unwrap();
    worker
        .register(
            "payments",
            Box::new(FailingHandler { kind: GATEWAY_DOWN }),
            Some(GATEWAY_DOWN),
        )
        .await
        .unwrap();

    let invoice_id = queue.put("invoices", "invoice #1").await.unwrap();
    let payment_id = queue.put("payments", "charge #1").await.unwrap();

    let invoice_job = reserve_now(&queue).await.unwrap();
    assert_eq!(invoice_job.id, invoice_id);
    let outcome = worker.dispatch_one(Some(invoice_job)).await.unwrap();
    assert_eq!(
        outcome,
        DispatchOutcome::Buried {
            job_id: invoice_id
        }
    );

    let payment_job = reserve_now(&queue).await.unwrap();
    assert_eq!(payment_job.id, payment_id);
    let outcome = worker.dispatch_one(Some(payment_job)).await.unwrap();
    assert_eq!(
        outcome,
        DispatchOutcome::Retried {
            job_id: payment_id,
            kind: GATEWAY_DOWN,
        }
    );

    let invoices = queue.stats_tube("invoices").await.unwrap();
    assert_eq!(invoices.current_jobs_buried, 1);
    let payments = queue.stats_tube("payments").await.unwrap();
    assert_eq!(payments.current_jobs_ready, 1);
}

#[tokio::test]
async fn test_unmatched_kind_is_buried_for_inspection() {
    let queue = InMemoryQueue::new();
    let mut worker = Worker::new(queue.clone());

    worker
        .register(
            "emails",
            Box::new(FailingHandler {
                kind: FailureKind::new("bad-address"),
            }),
            Some(FailureKind::TRANSIENT),
        )
        .await
        .unwrap();

    queue.put("emails", "to: nobody").await.unwrap();
    let job = reserve_now(&queue).await.unwrap();

    let outcome = worker.dispatch_one(Some(job.clone())).await.unwrap();
    assert!(matches!(outcome, DispatchOutcome::Buried { .. }));

    // Buried jobs stay inspectable but leave the ready flow.
    let stats = queue.stats_job(&job).await.unwrap();
    assert_eq!(stats.state, JobState::Buried);
    assert_eq!(stats.buries, 1);
    assert!(reserve_now(&queue).await.is_none());
}

#[tokio::test]
async fn test_orphan_heals_then_processing_continues() {
    let queue = InMemoryQueue::new();
    let mut worker = Worker::new(queue.clone());

    let recorder = RecordingHandler::new();
    worker
        .register("emails", Box::new(recorder.clone()), None)
        .await
        .unwrap();

    let stray_id = queue.put("default", "stray").await.unwrap();
    let payload = unique_payload("real-work");
    queue.put("emails", payload.clone()).await.unwrap();

    // The stray arrives first, heals the subscription, and does not stop
    // the worker from handling the real job next.
    let stray = reserve_now(&queue).await.unwrap();
    assert_eq!(stray.id, stray_id);
    let outcome = worker.dispatch_one(Some(stray)).await.unwrap();
    assert_eq!(outcome, DispatchOutcome::OrphanReleased { job_id: stray_id });
    assert_eq!(queue.watched_tubes(), vec!["emails".to_string()]);

    let job = reserve_now(&queue).await;
    let outcome = worker.dispatch_one(job).await.unwrap();
    assert!(matches!(outcome, DispatchOutcome::Completed { .. }));
    assert_eq!(recorder.seen(), vec![payload]);

    // The stray is back in its unwatched tube, untouched.
    let default_stats = queue.stats_tube("default").await.unwrap();
    assert_eq!(default_stats.current_jobs_ready, 1);
}

#[tokio::test]
async fn test_unknown_tube_aborts_dispatch() {
    let queue = InMemoryQueue::new();
    let mut worker = Worker::new(queue.clone());

    worker
        .register("emails", Box::new(RecordingHandler::new()), None)
        .await
        .unwrap();

    // Simulate subscription drift by watching a tube behind the worker's
    // back.
    queue.watch("ghost").await.unwrap();
    let id = queue.put("ghost", "who put this here").await.unwrap();
    let job = reserve_now(&queue).await.unwrap();

    let err = worker.dispatch_one(Some(job.clone())).await.unwrap_err();
    assert_eq!(
        err,
        WorkerError::UnknownTube {
            tube: "ghost".to_string(),
            job_id: id,
        }
    );

    // The job was put back before the error surfaced.
    let stats = queue.stats_job(&job).await.unwrap();
    assert_eq!(stats.state, JobState::Ready);
    assert_eq!(stats.releases, 1);
}
