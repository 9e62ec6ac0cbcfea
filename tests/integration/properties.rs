//! Concurrency properties checked over many repetitions.

use std::time::Duration;

use ferry_core::FingerprintId;
use ferry_services::{Dispatcher, UploadTask, WorkerPool};
use futures::StreamExt;

use crate::infra::*;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn at_most_one_claim_per_fingerprint() {
    for round in 0..100 {
        let remote = FakeRemote::new().delay(Duration::from_millis(1)).build();
        let ctx = context(remote.clone()).await;
        let mut pool = started_pool(4);

        for _ in 0..4 {
            let task = UploadTask::new(asset("race.jpg", round), ctx.clone());
            pool.submit(async move {
                task.run().await;
            })
            .await
            .unwrap();
        }
        pool.stop().await;

        assert_eq!(ctx.stats.uploaded(), 1, "round {round}");
        assert_eq!(ctx.stats.snapshot().skipped_claimed, 3, "round {round}");
        assert_eq!(remote.calls().len(), 1, "round {round}");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn drain_accounts_for_every_task() {
    let remote = FakeRemote::new()
        .delay(Duration::from_millis(2))
        .reply("p3.jpg-3", Reply::Unsupported)
        .reply("p7.jpg-7", Reply::Reject(500))
        .build();
    let ctx = context(remote.clone()).await;
    let mut pool = started_pool(3);

    for i in 0..60 {
        let task = UploadTask::new(asset(&format!("p{i}.jpg"), i), ctx.clone());
        pool.submit(async move {
            task.run().await;
        })
        .await
        .unwrap();
    }
    let report = pool.stop().await;

    let snap = ctx.stats.snapshot();
    assert_eq!(report.submitted, 60);
    assert_eq!(report.completed, 60);
    assert_eq!(snap.total(), 60);
    assert_eq!(snap.uploaded, 58);
    assert!(remote.peak_in_flight() <= 3);
}

#[tokio::test]
async fn nothing_is_submitted_after_the_trip() {
    let remote = FakeRemote::new().reply("q5.jpg-5", Reply::Overload).build();
    let ctx = context(remote.clone()).await;
    let breaker = ctx.breaker.clone();

    let before = futures::stream::iter((0..6).map(|i| asset(&format!("q{i}.jpg"), i)));
    let after = futures::stream::once(async move {
        breaker.tripped().await;
    })
    .flat_map(|_| futures::stream::iter((6..20).map(|i| asset(&format!("q{i}.jpg"), i))));

    let summary = Dispatcher::new(ctx.clone(), started_pool(2))
        .run(before.chain(after))
        .await
        .unwrap();

    assert!(summary.stopped_early);
    assert_eq!(summary.submitted, 6);
    let calls = remote.calls();
    assert_eq!(calls.len(), 6);
    for i in 6..20u64 {
        let id = FingerprintId::from_name_and_size(&format!("q{i}.jpg"), i);
        assert!(!calls.contains(&id.to_string()));
        assert!(!ctx.registry.contains(&id));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn full_intake_gives_way_to_the_trip() {
    let remote = FakeRemote::new()
        .delay(Duration::from_millis(50))
        .reply("c0.jpg-1", Reply::Overload)
        .build();
    let ctx = context(remote.clone()).await;
    let mut pool = WorkerPool::new(1);
    pool.start(1).unwrap();

    let candidates = (0..4).map(|i| asset(&format!("c{i}.jpg"), i + 1));
    let summary = Dispatcher::new(ctx.clone(), pool)
        .run(futures::stream::iter(candidates))
        .await
        .unwrap();

    let calls = remote.calls();
    assert!(summary.stopped_early);
    assert_eq!(calls, vec!["c0.jpg-1", "c1.jpg-2"]);
    assert_eq!(summary.submitted, 2);
    for id in ["c2.jpg-3", "c3.jpg-4"] {
        assert!(!ctx.registry.contains(&id.into()));
    }
}

#[tokio::test]
async fn registry_only_grows_over_a_run() {
    let remote = FakeRemote::new()
        .knows("old.jpg-1")
        .reply("bad.jpg-2", Reply::Reject(400))
        .build();
    let ctx = context(remote.clone()).await;
    let before = ctx.registry.len();

    Dispatcher::new(ctx.clone(), started_pool(2))
        .run(futures::stream::iter(vec![
            asset("old.jpg", 1),
            asset("bad.jpg", 2),
            asset("new.jpg", 3),
        ]))
        .await
        .unwrap();

    assert_eq!(before, 1);
    assert_eq!(ctx.registry.len(), 3);
    for id in ["old.jpg-1", "bad.jpg-2", "new.jpg-3"] {
        assert!(ctx.registry.contains(&id.into()));
    }
}
