//! The remote asset service seam.
//!
//! The orchestrator only needs two things from the server: the inventory of
//! fingerprints already uploaded from this device, and a way to upload one
//! asset. [`crate::client::ImmichClient`] is the HTTP implementation.

use std::collections::HashSet;

use async_trait::async_trait;
use ferry_core::{AssetMetadata, CandidateAsset, FingerprintId, UploadError};

#[async_trait]
pub trait RemoteAssetService: Send + Sync {
    /// Fingerprints the server already holds for `device_id`.
    async fn list_known_fingerprints(&self, device_id: &str)
        -> anyhow::Result<HashSet<FingerprintId>>;

    /// Upload one asset. Errors are classified by [`UploadError::kind`].
    async fn upload_asset(&self, asset: &CandidateAsset) -> Result<AssetMetadata, UploadError>;
}
