//! Worker pool — a fixed set of tokio tasks draining one bounded intake queue.
//!
//! Lifecycle: Created → Running (start) → Draining (stop) → Stopped.
//! Every job accepted by `submit` runs exactly once before `stop` returns.
//! A job that panics is logged and still counts as completed.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::{mpsc, Mutex, Notify};
use tokio::task::JoinHandle;

/// A unit of work. Outcomes are reported through side effects, not returned.
pub type Job = BoxFuture<'static, ()>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolState {
    Created,
    Running,
    Draining,
    Stopped,
}

#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("worker pool is {0:?}, not accepting work")]
    NotRunning(PoolState),
    #[error("worker pool already started")]
    AlreadyStarted,
    #[error("all workers have exited")]
    WorkersGone,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolReport {
    pub submitted: usize,
    pub completed: usize,
}

/// Drain barrier: incremented on submit, decremented when a job finishes.
#[derive(Default)]
struct Pending {
    submitted: AtomicUsize,
    completed: AtomicUsize,
    outstanding: AtomicUsize,
    idle: Notify,
}

impl Pending {
    fn add(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
        self.outstanding.fetch_add(1, Ordering::AcqRel);
    }

    fn finish(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
        if self.outstanding.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.idle.notify_waiters();
        }
    }

    async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.outstanding.load(Ordering::Acquire) == 0 {
                return;
            }
            notified.await;
        }
    }

    fn report(&self) -> PoolReport {
        PoolReport {
            submitted: self.submitted.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
        }
    }
}

/// A reserved place in the intake queue. Dropping it frees the place.
pub struct Slot<'a> {
    permit: mpsc::Permit<'a, Job>,
    pending: &'a Pending,
}

impl Slot<'_> {
    pub fn send<F>(self, job: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.pending.add();
        self.permit.send(job.boxed());
    }
}

pub struct WorkerPool {
    state: PoolState,
    capacity: usize,
    intake: Option<mpsc::Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
    pending: Arc<Pending>,
}

impl WorkerPool {
    /// Create an idle pool whose intake holds at most `queue_capacity` jobs.
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            state: PoolState::Created,
            capacity: queue_capacity.max(1),
            intake: None,
            workers: Vec::new(),
            pending: Arc::new(Pending::default()),
        }
    }

    pub fn state(&self) -> PoolState {
        self.state
    }

    /// Launch `worker_count` workers (at least one).
    pub fn start(&mut self, worker_count: usize) -> Result<(), PoolError> {
        if self.state != PoolState::Created {
            return Err(PoolError::AlreadyStarted);
        }
        let worker_count = worker_count.max(1);
        let (tx, rx) = mpsc::channel::<Job>(self.capacity);
        let rx = Arc::new(Mutex::new(rx));

        for worker in 0..worker_count {
            self.workers.push(tokio::spawn(run_worker(
                worker,
                rx.clone(),
                self.pending.clone(),
            )));
        }

        self.intake = Some(tx);
        self.state = PoolState::Running;
        tracing::info!(
            workers = worker_count,
            queue_capacity = self.capacity,
            "worker pool started"
        );
        Ok(())
    }

    /// Wait for a free intake slot. Nothing is counted until the slot is used,
    /// so dropping the slot (or cancelling this call) leaves no trace.
    pub async fn reserve(&self) -> Result<Slot<'_>, PoolError> {
        let intake = match (&self.state, &self.intake) {
            (PoolState::Running, Some(tx)) => tx,
            _ => return Err(PoolError::NotRunning(self.state)),
        };
        let permit = intake
            .reserve()
            .await
            .map_err(|_| PoolError::WorkersGone)?;
        Ok(Slot {
            permit,
            pending: &self.pending,
        })
    }

    /// Enqueue a job. Waits while the intake is full.
    pub async fn submit<F>(&self, job: F) -> Result<(), PoolError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.reserve().await?.send(job);
        Ok(())
    }

    /// Close the intake and wait for every queued and in-flight job to finish.
    pub async fn stop(&mut self) -> PoolReport {
        match self.state {
            PoolState::Running => {}
            PoolState::Created => {
                self.state = PoolState::Stopped;
                return self.report();
            }
            PoolState::Draining | PoolState::Stopped => return self.report(),
        }

        self.state = PoolState::Draining;
        drop(self.intake.take());
        tracing::debug!(outstanding = self.outstanding(), "draining worker pool");

        self.pending.wait_idle().await;
        for handle in self.workers.drain(..) {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "worker task ended abnormally");
            }
        }

        self.state = PoolState::Stopped;
        let report = self.report();
        tracing::info!(
            submitted = report.submitted,
            completed = report.completed,
            "worker pool stopped"
        );
        report
    }

    pub fn report(&self) -> PoolReport {
        self.pending.report()
    }

    /// Jobs submitted but not yet finished.
    pub fn outstanding(&self) -> usize {
        self.pending.outstanding.load(Ordering::Acquire)
    }
}

async fn run_worker(
    worker: usize,
    intake: Arc<Mutex<mpsc::Receiver<Job>>>,
    pending: Arc<Pending>,
) {
    loop {
        let job = intake.lock().await.recv().await;
        let Some(job) = job else {
            tracing::debug!(worker, "intake closed, worker exiting");
            return;
        };
        if AssertUnwindSafe(job).catch_unwind().await.is_err() {
            tracing::error!(worker, "job panicked");
        }
        pending.finish();
    }
}
