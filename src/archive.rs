//! Archiver: one file or directory in, one `.tgz` out.
//!
//! The archive root entry is always the source's base name, never its
//! absolute path, so extracting `report.csv.…tgz` yields `report.csv` and
//! extracting `photos.…tgz` yields `photos/…`.

use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use flate2::{Compression, read::GzDecoder, write::GzEncoder};
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{Error, Result};

/// Write a gzip-compressed tar of `source` to `dest`.
///
/// `entry_name` becomes the root entry of the archive.  When `source` is a
/// directory, the subtree at `skip` (if it lies inside `source`) is left out;
/// the pipeline passes its own staging directory here.
pub fn archive(source: &Path, entry_name: &str, dest: &Path, skip: Option<&Path>) -> Result<()> {
    let meta = fs::metadata(source).map_err(Error::io(source))?;

    let out = File::create(dest).map_err(Error::io(dest))?;
    let enc = GzEncoder::new(BufWriter::new(out), Compression::default());
    let mut tar = tar::Builder::new(enc);

    if meta.is_dir() {
        let skip = skip.and_then(|s| nested_path(source, s));
        if let Some(s) = &skip {
            debug!("leaving {} out of the archive", s.display());
        }
        let walker = WalkDir::new(source)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| skip.as_deref() != Some(e.path()));
        for entry in walker {
            let entry = entry.map_err(|e| Error::Io {
                path: e.path().unwrap_or(source).to_path_buf(),
                source: e.into(),
            })?;
            let rel = entry.path().strip_prefix(source).unwrap_or(entry.path());
            let name = Path::new(entry_name).join(rel);
            let appended = if entry.file_type().is_dir() {
                tar.append_dir(&name, entry.path())
            } else {
                tar.append_path_with_name(entry.path(), &name)
            };
            appended.map_err(Error::io(entry.path()))?;
        }
    } else {
        tar.append_path_with_name(source, entry_name)
            .map_err(Error::io(source))?;
    }

    let enc = tar.into_inner().map_err(Error::io(dest))?;
    let mut writer = enc.finish().map_err(Error::io(dest))?;
    writer.flush().map_err(Error::io(dest))?;

    debug!(
        "archived {} -> {} ({} bytes)",
        source.display(),
        dest.display(),
        fs::metadata(dest).map(|m| m.len()).unwrap_or(0)
    );
    Ok(())
}

/// `inner` re-expressed under `root` as walked, if it lies inside `root`.
///
/// Both sides are resolved first so a staging root reached through a
/// symlink (or a relative path) still matches.
fn nested_path(root: &Path, inner: &Path) -> Option<PathBuf> {
    let root_real = fs::canonicalize(root).ok()?;
    let inner_real = fs::canonicalize(inner).ok()?;
    let rel = inner_real.strip_prefix(&root_real).ok()?;
    if rel.as_os_str().is_empty() {
        return None;
    }
    Some(root.join(rel))
}

/// Copy a single file verbatim; the compression-disabled path.
pub fn copy_verbatim(source: &Path, dest: &Path) -> Result<()> {
    let meta = fs::metadata(source).map_err(Error::io(source))?;
    if meta.is_dir() {
        return Err(Error::policy(format!(
            "{} is a directory; directories can only be backed up compressed",
            source.display()
        )));
    }
    fs::copy(source, dest).map_err(Error::io(dest))?;
    Ok(())
}

/// Unpack `archive_path` into `dest_dir`, returning the top-level entry names.
///
/// With `overwrite` unset, an entry that already exists on disk is an error.
/// Entries that would land outside `dest_dir` are skipped by the tar reader.
pub fn extract(archive_path: &Path, dest_dir: &Path, overwrite: bool) -> Result<Vec<String>> {
    let roots = if overwrite {
        top_level_entries(archive_path)?
    } else {
        check_collisions(archive_path, dest_dir)?
    };

    fs::create_dir_all(dest_dir).map_err(Error::io(dest_dir))?;
    let file = File::open(archive_path).map_err(Error::io(archive_path))?;
    let mut tar = tar::Archive::new(GzDecoder::new(BufReader::new(file)));
    tar.set_overwrite(overwrite);
    tar.unpack(dest_dir).map_err(Error::io(dest_dir))?;
    Ok(roots)
}

/// Refuse if any top-level entry of `archive_path` already exists in
/// `dest_dir`.  Returns the entries.
pub fn check_collisions(archive_path: &Path, dest_dir: &Path) -> Result<Vec<String>> {
    let roots = top_level_entries(archive_path)?;
    if let Some(existing) = roots.iter().find(|r| dest_dir.join(r).exists()) {
        return Err(Error::policy(format!(
            "refusing to overwrite existing path: {}",
            dest_dir.join(existing).display()
        )));
    }
    Ok(roots)
}

fn top_level_entries(archive_path: &Path) -> Result<Vec<String>> {
    let file = File::open(archive_path).map_err(Error::io(archive_path))?;
    let mut tar = tar::Archive::new(GzDecoder::new(BufReader::new(file)));

    let mut roots: Vec<String> = Vec::new();
    for entry in tar.entries().map_err(Error::io(archive_path))? {
        let entry = entry.map_err(Error::io(archive_path))?;
        let path = entry.path().map_err(Error::io(archive_path))?;
        let Some(first) = path.components().next() else {
            continue;
        };
        let first = first.as_os_str().to_string_lossy().into_owned();
        if !roots.contains(&first) {
            roots.push(first);
        }
    }
    Ok(roots)
}

// ─── Tests ────────────────────────────────────────────────────────────────────
