//! Blob store gateway.
//!
//! The pipeline only ever talks to a [`BlobStore`]: put a local file under a
//! key, get a key into a local file, list a bucket.  Two adapters exist:
//!
//! | Adapter        | Selected when                   | Backing                       |
//! |----------------|---------------------------------|-------------------------------|
//! | [`S3Store`]    | `[local].root` is not set       | S3 or any S3-compatible API   |
//! | [`LocalStore`] | `[local].root` is set           | `<root>/<bucket>/<key>` files |
//!
//! Every adapter error surfaces as [`Error::Remote`]; nothing is retried.

mod local;
mod s3;

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

pub use self::{local::LocalStore, s3::S3Store};
use crate::{
    config::Config,
    error::{Error, Result},
};

/// One entry of a bucket listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectSummary {
    pub key: String,
    pub last_modified: DateTime<Utc>,
    pub size_bytes: u64,
}

pub trait BlobStore {
    /// Upload the file at `src` as `key`.
    fn put(&self, bucket: &str, key: &str, src: &Path) -> Result<()>;

    /// Download `key` into a new file at `dest`.
    fn get(&self, bucket: &str, key: &str, dest: &Path) -> Result<()>;

    /// Every object in `bucket`, in no particular order.
    fn list(&self, bucket: &str) -> Result<Vec<ObjectSummary>>;
}

/// Build the adapter selected by `cfg`.
pub fn open(cfg: &Config) -> Result<Box<dyn BlobStore>> {
    match &cfg.local.root {
        Some(root) => Ok(Box::new(LocalStore::new(root))),
        None => Ok(Box::new(S3Store::connect(&cfg.s3)?)),
    }
}

/// Reject keys that could escape a directory-backed bucket or confuse S3
/// tooling.
pub(crate) fn ensure_key_safe(key: &str) -> Result<()> {
    const MAX_KEY_LEN: usize = 1024;

    let bad = key.is_empty()
        || key.len() > MAX_KEY_LEN
        || key.starts_with('/')
        || key.split('/').any(|seg| seg == ".." || seg == ".")
        || key.bytes().any(|b| b.is_ascii_control() || b == b'\\');
    if bad {
        return Err(Error::remote(format!("invalid object key: {key:?}")));
    }
    Ok(())
}

// ─── Tests ────────────────────────────────────────────────────────────────────
