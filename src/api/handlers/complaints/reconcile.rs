//! Bounded image-set reconciliation against the remote asset store.
//!
//! A complaint owns at most [`MAX_IMAGES`] images. Every mutation goes
//! through the same sequence: capacity check before any I/O, sequential
//! uploads in submission order (submission order is display order), then
//! deletion of displaced assets, then persistence. An old asset is never
//! destroyed before its replacement is confirmed stored, so a failed
//! upload can not leave the set empty.

use tracing::{info, warn};

use crate::api::error::ApiError;
use crate::assets::{AssetStore, extract_public_id};

pub(crate) const MAX_IMAGES: usize = 5;
pub(crate) const MSG_MAX_IMAGES: &str = "You can upload a maximum of 5 images";

/// Outcome of diffing the stored set against a replacement set.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct ReconcilePlan {
    /// Stored URLs displaced by the replacement, in stored order.
    pub(crate) to_delete: Vec<String>,
    /// The set to persist, in submission order.
    pub(crate) final_urls: Vec<String>,
}

/// Enforce the set bound before any upload or delete happens.
///
/// # Errors
/// Returns a validation error on the `images` field when the resulting
/// count would exceed [`MAX_IMAGES`].
pub(crate) fn check_capacity(current_count: usize, incoming_count: usize) -> Result<(), ApiError> {
    if current_count + incoming_count > MAX_IMAGES {
        return Err(ApiError::field("images", MSG_MAX_IMAGES));
    }
    Ok(())
}

/// Diff for the replace path: incoming URLs entirely supersede the stored
/// set, and every stored URL not re-submitted is scheduled for deletion.
pub(crate) fn replacement_plan(current: &[String], new_urls: Vec<String>) -> ReconcilePlan {
    let to_delete = current
        .iter()
        .filter(|url| !new_urls.contains(url))
        .cloned()
        .collect();
    ReconcilePlan {
        to_delete,
        final_urls: new_urls,
    }
}

/// Upload `files` one at a time, preserving submission order.
///
/// On a mid-batch failure the already-stored assets are destroyed best
/// effort and the error is surfaced; nothing is persisted for a partial
/// batch.
pub(crate) async fn upload_batch(
    store: &dyn AssetStore,
    folder: &str,
    files: Vec<Vec<u8>>,
) -> Result<Vec<String>, ApiError> {
    let mut uploaded = Vec::with_capacity(files.len());
    for bytes in files {
        match store.upload(bytes, folder).await {
            Ok(url) => uploaded.push(url),
            Err(err) => {
                warn!(
                    "Upload failed after {} stored, compensating: {err:?}",
                    uploaded.len()
                );
                destroy_urls(store, &uploaded).await;
                return Err(ApiError::Internal(err.context("failed to upload image")));
            }
        }
    }
    Ok(uploaded)
}

/// Destroy each URL's backing asset, best effort. Unrecognized URL shapes
/// and store failures are logged and skipped, never raised.
pub(crate) async fn destroy_urls(store: &dyn AssetStore, urls: &[String]) {
    for url in urls {
        let Some(public_id) = extract_public_id(url) else {
            warn!("Unrecognized asset URL shape, skipping: {url}");
            continue;
        };
        match store.destroy(&public_id).await {
            Ok(()) => info!("Complaint image deleted successfully"),
            Err(err) => warn!("Failed to destroy asset {public_id}: {err:?}"),
        }
    }
}
