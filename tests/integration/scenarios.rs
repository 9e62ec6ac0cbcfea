//! End-to-end runs for the duplicate, concurrent-duplicate, overload, and
//! unsupported-media cases.

use std::time::Duration;

use ferry_services::{Dispatcher, TaskOutcome, UploadTask};
use futures::StreamExt;
use tokio::sync::mpsc;

use crate::infra::*;

/// Registry seeded with a.jpg-100: the asset is skipped and never uploaded.
#[tokio::test]
async fn seeded_duplicate_is_never_uploaded() {
    let remote = FakeRemote::new().knows("a.jpg-100").build();
    let ctx = context(remote.clone()).await;

    // Task level: the claim check rejects it.
    let outcome = UploadTask::new(asset("a.jpg", 100), ctx.clone()).run().await;
    assert_eq!(outcome, TaskOutcome::SkippedAlreadyClaimed);

    // Dispatcher level: it is filtered before submission.
    let summary = Dispatcher::new(ctx.clone(), started_pool(2))
        .run(futures::stream::iter(vec![asset("a.jpg", 100)]))
        .await
        .unwrap();

    assert_eq!(summary.submitted, 0);
    assert_eq!(summary.skipped_known, 1);
    assert_eq!(summary.uploaded(), 0);
    assert!(remote.calls().is_empty());
}

/// Two b.jpg/200 tasks in flight at once: one upload, one skip.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_duplicates_upload_once() {
    let remote = FakeRemote::new().delay(Duration::from_millis(20)).build();
    let ctx = context(remote.clone()).await;
    let mut pool = started_pool(2);
    let (tx, mut rx) = mpsc::unbounded_channel();

    for _ in 0..2 {
        let task = UploadTask::new(asset("b.jpg", 200), ctx.clone());
        let tx = tx.clone();
        pool.submit(async move {
            let _ = tx.send(task.run().await);
        })
        .await
        .unwrap();
    }
    drop(tx);
    pool.stop().await;

    let mut outcomes = Vec::new();
    while let Some(o) = rx.recv().await {
        outcomes.push(o);
    }
    assert_eq!(outcomes.len(), 2);
    assert!(outcomes.contains(&TaskOutcome::Uploaded));
    assert!(outcomes.contains(&TaskOutcome::SkippedAlreadyClaimed));
    assert_eq!(ctx.stats.uploaded(), 1);
    assert_eq!(remote.calls(), vec!["b.jpg-200".to_string()]);
}

/// c.jpg overloads the server; d.jpg, offered after the trip, is never submitted.
#[tokio::test]
async fn overload_stops_dispatch() {
    let remote = FakeRemote::new().reply("c.jpg-300", Reply::Overload).build();
    let ctx = context(remote.clone()).await;
    let breaker = ctx.breaker.clone();

    let candidates = futures::stream::iter(vec![asset("c.jpg", 300)]).chain(
        futures::stream::once(async move {
            breaker.tripped().await;
            asset("d.jpg", 400)
        }),
    );

    let summary = Dispatcher::new(ctx.clone(), started_pool(2))
        .run(candidates)
        .await
        .unwrap();

    assert!(summary.stopped_early);
    assert_eq!(summary.submitted, 1);
    assert_eq!(summary.outcomes.failed_fatal, 1);
    assert_eq!(remote.calls(), vec!["c.jpg-300".to_string()]);
    assert!(ctx.breaker.is_tripped());
}

/// e.jpg is unsupported; the breaker stays closed and f.jpg goes through.
#[tokio::test]
async fn unsupported_media_does_not_stop_the_run() {
    let remote = FakeRemote::new()
        .reply("e.jpg-500", Reply::Unsupported)
        .build();
    let ctx = context(remote.clone()).await;

    let summary = Dispatcher::new(ctx.clone(), started_pool(1))
        .run(futures::stream::iter(vec![asset("e.jpg", 500), asset("f.jpg", 600)]))
        .await
        .unwrap();

    assert!(!summary.stopped_early);
    assert!(!ctx.breaker.is_tripped());
    assert_eq!(summary.outcomes.skipped_unsupported, 1);
    assert_eq!(summary.uploaded(), 1);
    assert_eq!(
        remote.calls(),
        vec!["e.jpg-500".to_string(), "f.jpg-600".to_string()]
    );
}

/// A rejected upload is logged and the run carries on.
#[tokio::test]
async fn other_failures_are_task_local() {
    let remote = FakeRemote::new().reply("g.jpg-1", Reply::Reject(409)).build();
    let ctx = context(remote.clone()).await;

    let summary = Dispatcher::new(ctx.clone(), started_pool(2))
        .run(futures::stream::iter(vec![
            asset("g.jpg", 1),
            asset("h.jpg", 2),
            asset("i.jpg", 3),
        ]))
        .await
        .unwrap();

    assert!(!summary.stopped_early);
    assert_eq!(summary.outcomes.failed_other, 1);
    assert_eq!(summary.uploaded(), 2);
}
