//! ferry-services — the concurrent upload orchestrator and its collaborators.

pub mod breaker;
pub mod client;
pub mod dispatch;
pub mod pool;
pub mod registry;
pub mod remote;
pub mod scan;
pub mod stats;
pub mod task;

pub use breaker::CircuitBreaker;
pub use client::{ClientSettings, ImmichClient, User};
pub use dispatch::{Dispatcher, RunSummary};
pub use pool::{PoolError, PoolReport, PoolState, Slot, WorkerPool};
pub use registry::DedupRegistry;
pub use remote::RemoteAssetService;
pub use scan::scan_roots;
pub use stats::{StatsSnapshot, UploadStats};
pub use task::{TaskOutcome, UploadContext, UploadTask};
