//! Directory-backed blob store: `<root>/<bucket>/<key>`.
//!
//! Handy for backing up to a mounted volume, and what the test suite runs
//! against.  Keys containing `/` become nested directories.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use tracing::debug;

use super::{BlobStore, ObjectSummary, ensure_key_safe};
use crate::error::{Error, Result};

const PART_SUFFIX: &str = ".upload-part";

#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf> {
        ensure_key_safe(bucket)?;
        if bucket.contains('/') {
            return Err(Error::remote(format!("invalid bucket name: {bucket:?}")));
        }
        ensure_key_safe(key)?;
        Ok(self.root.join(bucket).join(key))
    }
}

fn remote_io(what: &str, path: &Path, e: &io::Error) -> Error {
    Error::remote(format!("{what} {}: {e}", path.display()))
}

impl BlobStore for LocalStore {
    fn put(&self, bucket: &str, key: &str, src: &Path) -> Result<()> {
        let dest = self.object_path(bucket, key)?;
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|e| remote_io("creating", parent, &e))?;
        }
        // Copy beside the final name and rename, so a reader never sees a
        // half-written object.
        let mut part = dest.clone().into_os_string();
        part.push(PART_SUFFIX);
        let part = PathBuf::from(part);
        fs::copy(src, &part).map_err(|e| remote_io("writing", &part, &e))?;
        fs::rename(&part, &dest).map_err(|e| {
            let _ = fs::remove_file(&part);
            remote_io("writing", &dest, &e)
        })?;
        debug!("stored {key} in {}", self.root.join(bucket).display());
        Ok(())
    }

    fn get(&self, bucket: &str, key: &str, dest: &Path) -> Result<()> {
        let src = self.object_path(bucket, key)?;
        if !src.is_file() {
            return Err(Error::remote(format!(
                "object `{key}` not found in bucket `{bucket}`"
            )));
        }
        fs::copy(&src, dest).map_err(|e| remote_io("reading", &src, &e))?;
        Ok(())
    }

    fn list(&self, bucket: &str) -> Result<Vec<ObjectSummary>> {
        let base = self.root.join(bucket);
        let mut out = Vec::new();
        if base.is_dir() {
            walk(&base, &base, &mut out)?;
        }
        Ok(out)
    }
}

fn walk(base: &Path, dir: &Path, out: &mut Vec<ObjectSummary>) -> Result<()> {
    let entries = fs::read_dir(dir).map_err(|e| remote_io("listing", dir, &e))?;
    for entry in entries {
        let entry = entry.map_err(|e| remote_io("listing", dir, &e))?;
        let path = entry.path();
        let meta = entry
            .metadata()
            .map_err(|e| remote_io("listing", &path, &e))?;

        if meta.is_dir() {
            walk(base, &path, out)?;
            continue;
        }
        if path.to_string_lossy().ends_with(PART_SUFFIX) {
            continue;
        }

        let Ok(rel) = path.strip_prefix(base) else {
            continue;
        };
        let key = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let last_modified: DateTime<Utc> = meta
            .modified()
            .map(DateTime::from)
            .unwrap_or_default();

        out.push(ObjectSummary {
            key,
            last_modified,
            size_bytes: meta.len(),
        });
    }
    Ok(())
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> (tempfile::TempDir, LocalStore, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path().join("remote"));
        let src = dir.path().join("payload.bin");
        fs::write(&src, b"payload bytes").unwrap();
        (dir, store, src)
    }

    #[test]
    fn put_then_get_returns_same_bytes() {
        let (dir, store, src) = fixture();
        store.put("bkt", "payload.bin.20240102-030405", &src).unwrap();

        let dest = dir.path().join("back");
        store.get("bkt", "payload.bin.20240102-030405", &dest).unwrap();
        assert_eq!(fs::read(dest).unwrap(), b"payload bytes");
    }

    #[test]
    fn list_reports_key_and_size() {
        let (_dir, store, src) = fixture();
        store.put("bkt", "one", &src).unwrap();
        store.put("bkt", "nested/two", &src).unwrap();
        store.put("other", "three", &src).unwrap();

        let mut listed = store.list("bkt").unwrap();
        listed.sort_by(|a, b| a.key.cmp(&b.key));
        let keys: Vec<_> = listed.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(keys, vec!["nested/two", "one"]);
        assert!(listed.iter().all(|o| o.size_bytes == 13));
    }

    #[test]
    fn list_of_unknown_bucket_is_empty() {
        let (_dir, store, _src) = fixture();
        assert!(store.list("never-written").unwrap().is_empty());
    }

    #[test]
    fn get_missing_key_is_remote_error() {
        let (dir, store, _src) = fixture();
        let err = store.get("bkt", "missing", &dir.path().join("x")).unwrap_err();
        assert!(matches!(err, Error::Remote(_)));
        assert!(!dir.path().join("x").exists());
    }

    #[test]
    fn put_missing_source_is_remote_error_and_leaves_nothing() {
        let (dir, store, _src) = fixture();
        let err = store
            .put("bkt", "k", &dir.path().join("does-not-exist"))
            .unwrap_err();
        assert!(matches!(err, Error::Remote(_)));
        assert!(store.list("bkt").unwrap().is_empty());
    }

    #[test]
    fn unsafe_keys_never_touch_disk() {
        let (dir, store, src) = fixture();
        assert!(store.put("bkt", "../escape", &src).is_err());
        assert!(store.put("../bkt", "k", &src).is_err());
        assert!(!dir.path().join("escape").exists());
    }
}
