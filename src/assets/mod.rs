//! Remote asset store abstraction and asset URL parsing.
//!
//! Complaint images live in a Cloudinary-style store. Handlers only talk to
//! the [`AssetStore`] trait so the reconciler can be exercised against an
//! in-memory store under test.

use async_trait::async_trait;

mod cloudinary;
pub use cloudinary::CloudinaryStore;

/// Remote object store for complaint images.
///
/// Implementations must be idempotent on `destroy`: destroying an object
/// that is already gone is not an error.
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Upload raw image bytes into `folder`, returning the public URL.
    async fn upload(&self, bytes: Vec<u8>, folder: &str) -> anyhow::Result<String>;

    /// Remove the object identified by `public_id`.
    async fn destroy(&self, public_id: &str) -> anyhow::Result<()>;
}

/// Derive the store object identifier from an asset URL.
///
/// Two historical URL shapes are in circulation:
///
/// - versioned: `https://res.cloudinary.com/demo/image/upload/v123/complaints/abc.jpg`
/// - unversioned nested folders: `https://res.cloudinary.com/demo/image/upload/complaints/2024/abc.jpg`
///
/// Both map to the path after `upload/` (minus the version segment and the
/// file extension). Unrecognized shapes return `None`; callers log and skip
/// them instead of failing the whole operation.
#[must_use]
pub fn extract_public_id(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    if !parsed
        .host_str()
        .is_some_and(|host| host.ends_with("cloudinary.com"))
    {
        return None;
    }

    let segments: Vec<&str> = parsed.path_segments()?.filter(|s| !s.is_empty()).collect();
    let upload_at = segments.iter().position(|segment| *segment == "upload")?;
    let mut tail = &segments[upload_at + 1..];

    // Versioned URLs carry a `v<digits>` segment right after `upload/`.
    if let Some(first) = tail.first() {
        if first.len() > 1
            && first.starts_with('v')
            && first[1..].chars().all(|c| c.is_ascii_digit())
        {
            tail = &tail[1..];
        }
    }

    if tail.is_empty() {
        return None;
    }

    let mut public_id = tail.join("/");
    // Object ids are stored without the delivery extension.
    if let Some(last_slash) = public_id.rfind('/') {
        if let Some(dot) = public_id[last_slash..].rfind('.') {
            public_id.truncate(last_slash + dot);
        }
    } else if let Some(dot) = public_id.rfind('.') {
        public_id.truncate(dot);
    }

    if public_id.is_empty() {
        None
    } else {
        Some(public_id)
    }
}
