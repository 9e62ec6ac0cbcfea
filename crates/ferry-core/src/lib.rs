//! ferry-core — shared asset types, the upload error taxonomy, and configuration.
//! All other ferry crates depend on this one.

pub mod asset;
pub mod config;
pub mod error;

pub use asset::{AssetMetadata, CandidateAsset, FingerprintId};
pub use error::{FailureKind, UploadError};
