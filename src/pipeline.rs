//! The backup/restore pipeline.
//!
//! # Backup stages
//!
//! | # | Stage     | Runs when            | Produces                          |
//! |---|-----------|----------------------|-----------------------------------|
//! | 1 | Archive   | `compress`           | staged `<name>.tgz`               |
//! | 1 | Copy      | `!compress`          | staged `<name>` (verbatim copy)   |
//! | 2 | Encrypt   | password given       | staged `<name>[.tgz].enc`         |
//! | 3 | Upload    | always               | remote object `<name>[.tgz][.enc]`|
//! | 4 | Cleanup   | always, even on error| nothing left on disk              |
//!
//! # Restore stages
//!
//! | # | Stage     | Runs when            |
//! |---|-----------|----------------------|
//! | 1 | Download  | always               |
//! | 2 | Decrypt   | key ends in `.enc`   |
//! | 3 | Write     | always               |
//! | 4 | Extract   | `--extract` on `.tgz`|
//!
//! Every intermediate file is a [`StagedArtifact`] living in a private
//! per-invocation directory.  Artifacts are removed as soon as the next stage
//! has consumed them, and in any case when they go out of scope, so an error
//! at any point (including a failed upload) never leaves a cleartext archive
//! behind.

use std::{
    fmt, fs,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use tempfile::TempDir;
use tracing::{debug, info, warn};

use crate::{
    archive,
    cipher::{self, KdfParams},
    error::{Error, Result},
    interrupt::{CleanupRegistry, Tracked},
    naming::{self, ENCRYPTED_SUFFIX, ObjectName},
    store::BlobStore,
};

// ─── Options ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub compress: bool,
    pub password: Option<String>,
    /// Argon2 cost for encryption; `None` uses the library default.
    pub kdf: Option<KdfParams>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            compress: true,
            password: None,
            kdf: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RestoreOptions {
    pub password: Option<String>,
    /// Unpack a `.tgz` result into the output directory.
    pub extract: bool,
    /// Replace existing output files.
    pub force: bool,
}

// ─── Stages and reports ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Archive,
    Copy,
    Encrypt,
    Upload,
    Cleanup,
    Download,
    Decrypt,
    Write,
    Extract,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Archive => "Archive",
            Self::Copy => "Copy",
            Self::Encrypt => "Encrypt",
            Self::Upload => "Upload",
            Self::Cleanup => "Cleanup",
            Self::Download => "Download",
            Self::Decrypt => "Decrypt",
            Self::Write => "Write",
            Self::Extract => "Extract",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupReport {
    pub bucket: String,
    pub key: String,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreReport {
    pub output: PathBuf,
    pub decrypted: bool,
    /// Top-level entries unpacked when extraction ran.
    pub extracted: Vec<String>,
}

// ─── Source item ──────────────────────────────────────────────────────────────

/// A validated backup source.
#[derive(Debug, Clone)]
pub struct SourceItem {
    pub path: PathBuf,
    pub base_name: String,
    pub is_dir: bool,
}

impl SourceItem {
    /// The base name is taken from `path` as given, so a symlink is backed
    /// up under its own name rather than its target's.  Only a path with no
    /// final component (`..`, `/`) is resolved first.
    pub fn inspect(path: &Path) -> Result<Self> {
        let abs = std::path::absolute(path).map_err(Error::io(path))?;
        let path = if abs.file_name().is_some() {
            abs
        } else {
            fs::canonicalize(&abs).map_err(Error::io(&abs))?
        };
        let meta = fs::metadata(&path).map_err(Error::io(&path))?;
        let base_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| Error::policy(format!("{} has no base name", path.display())))?;
        Ok(Self {
            path,
            base_name,
            is_dir: meta.is_dir(),
        })
    }
}

// ─── Staged artifacts ─────────────────────────────────────────────────────────

/// A pipeline-owned temporary file, deleted on drop unless persisted.
#[derive(Debug)]
pub struct StagedArtifact {
    path: PathBuf,
    armed: bool,
}

impl StagedArtifact {
    pub fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Move the file to `dest`, handing ownership to the caller.
    pub fn persist(mut self, dest: &Path) -> Result<()> {
        fs::rename(&self.path, dest).map_err(Error::io(dest))?;
        self.armed = false;
        Ok(())
    }
}

impl Drop for StagedArtifact {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match fs::remove_file(&self.path) {
            Ok(()) => debug!("removed staged file {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {},
            Err(e) => warn!("could not remove staged file {}: {e}", self.path.display()),
        }
    }
}

// ─── Pipeline ─────────────────────────────────────────────────────────────────

pub struct Pipeline<'a> {
    store: &'a dyn BlobStore,
    bucket: String,
    staging_root: PathBuf,
    cleanup: Option<CleanupRegistry>,
}

impl<'a> Pipeline<'a> {
    pub fn new(store: &'a dyn BlobStore, bucket: impl Into<String>, staging_root: impl Into<PathBuf>) -> Self {
        Self {
            store,
            bucket: bucket.into(),
            staging_root: staging_root.into(),
            cleanup: None,
        }
    }

    /// Register staged paths with `registry` so an interrupt can remove them.
    pub fn with_cleanup(mut self, registry: CleanupRegistry) -> Self {
        self.cleanup = Some(registry);
        self
    }

    fn track(&self, path: &Path) -> Option<Tracked> {
        self.cleanup.as_ref().map(|r| r.track(path))
    }

    fn staging_dir(&self) -> Result<TempDir> {
        tempfile::Builder::new()
            .prefix(".hotbackup-")
            .tempdir_in(&self.staging_root)
            .map_err(Error::io(&self.staging_root))
    }

    /// Back up `source` and return the key it was stored under.
    ///
    /// `now` is the invocation timestamp used in the object name.
    /// `on_stage` is called after each stage completes.
    pub fn backup(
        &self,
        source: &Path,
        opts: &PipelineOptions,
        now: DateTime<Utc>,
        on_stage: &mut dyn FnMut(Stage),
    ) -> Result<BackupReport> {
        let item = SourceItem::inspect(source)?;
        if item.is_dir && !opts.compress {
            return Err(Error::policy(format!(
                "{} is a directory; directories can only be backed up compressed",
                item.path.display()
            )));
        }

        let encrypted = opts.password.is_some();
        let key = naming::object_name(&item.base_name, now, opts.compress, encrypted);
        let plain_name = naming::object_name(&item.base_name, now, opts.compress, false);
        info!("backing up {} as {key}", item.path.display());

        let staging = self.staging_dir()?;
        let _tracked = self.track(staging.path());
        let result: Result<u64> = (|| {
            let plain = StagedArtifact::new(staging.path().join(&plain_name));
            if opts.compress {
                // The staging root may sit inside the directory being backed up.
                archive::archive(&item.path, &item.base_name, plain.path(), Some(staging.path()))?;
                on_stage(Stage::Archive);
            } else {
                archive::copy_verbatim(&item.path, plain.path())?;
                on_stage(Stage::Copy);
            }

            let upload = match &opts.password {
                Some(password) => {
                    let enc = StagedArtifact::new(staging.path().join(&key));
                    let plaintext = fs::read(plain.path()).map_err(Error::io(plain.path()))?;
                    drop(plain);
                    let blob = match opts.kdf {
                        Some(params) => cipher::encrypt_with_params(password, &plaintext, params)?,
                        None => cipher::encrypt(password, &plaintext)?,
                    };
                    fs::write(enc.path(), &blob).map_err(Error::io(enc.path()))?;
                    on_stage(Stage::Encrypt);
                    enc
                },
                None => plain,
            };

            let size_bytes = fs::metadata(upload.path())
                .map_err(Error::io(upload.path()))?
                .len();
            self.store.put(&self.bucket, &key, upload.path())?;
            on_stage(Stage::Upload);
            info!("uploaded {key} to {} ({size_bytes} bytes)", self.bucket);
            Ok(size_bytes)
        })();

        // Runs on every path: the closure's artifacts are already dropped,
        // this removes the staging directory itself.
        if let Err(e) = staging.close() {
            warn!("could not remove staging directory: {e}");
        }

        let size_bytes = result?;
        on_stage(Stage::Cleanup);
        Ok(BackupReport {
            bucket: self.bucket.clone(),
            key,
            size_bytes,
        })
    }

    /// Download `key` into `out_dir`, decrypting it if it ends in `.enc`.
    pub fn restore(
        &self,
        key: &str,
        out_dir: &Path,
        opts: &RestoreOptions,
        on_stage: &mut dyn FnMut(Stage),
    ) -> Result<RestoreReport> {
        let (_, compressed, encrypted) = naming::peel_suffixes(key);
        if ObjectName::parse(key).is_none() {
            debug!("{key} is not a <name>.<timestamp> key; stages are chosen from its suffixes");
        }
        let file_name = Path::new(key)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| Error::policy(format!("object key {key:?} has no file name")))?;
        let output_name = if encrypted {
            file_name.strip_suffix(ENCRYPTED_SUFFIX).unwrap_or(&file_name).to_string()
        } else {
            file_name.clone()
        };
        if output_name.is_empty() {
            return Err(Error::policy(format!(
                "object key {key:?} leaves no output file name once {ENCRYPTED_SUFFIX} is removed"
            )));
        }
        let output = out_dir.join(&output_name);

        // Policy checks before any I/O.
        let password = match (&opts.password, encrypted) {
            (None, true) => {
                return Err(Error::policy(format!(
                    "{key} is encrypted; a password is required to restore it"
                )));
            },
            (Some(_), false) => {
                info!("{key} is not encrypted; skipping decryption");
                None
            },
            (pw, _) => pw.as_deref(),
        };
        if output.exists() && !opts.force {
            return Err(Error::policy(format!(
                "refusing to overwrite existing path: {} (use --force)",
                output.display()
            )));
        }

        info!("restoring {key} from {}", self.bucket);
        let staging = self.staging_dir()?;
        let _tracked = self.track(staging.path());
        let check_extract = opts.extract && compressed && !opts.force;
        let result: Result<()> = (|| {
            let downloaded = StagedArtifact::new(staging.path().join(&file_name));
            self.store.get(&self.bucket, key, downloaded.path())?;
            on_stage(Stage::Download);

            fs::create_dir_all(out_dir).map_err(Error::io(out_dir))?;
            let mut part_name = output.clone().into_os_string();
            part_name.push(".part");
            let part = StagedArtifact::new(PathBuf::from(part_name));
            let _part_tracked = self.track(part.path());

            if let Some(password) = password {
                let blob = fs::read(downloaded.path()).map_err(Error::io(downloaded.path()))?;
                let plaintext = cipher::decrypt(password, &blob)?;
                drop(downloaded);
                on_stage(Stage::Decrypt);
                fs::write(part.path(), &plaintext).map_err(Error::io(part.path()))?;
            } else {
                fs::copy(downloaded.path(), part.path()).map_err(Error::io(part.path()))?;
                drop(downloaded);
            }
            // Refuse before the archive lands in `out_dir`, not after.
            if check_extract {
                archive::check_collisions(part.path(), out_dir)?;
            }
            part.persist(&output)?;
            on_stage(Stage::Write);
            Ok(())
        })();

        if let Err(e) = staging.close() {
            warn!("could not remove staging directory: {e}");
        }
        result?;

        let mut extracted = Vec::new();
        if opts.extract {
            if compressed {
                extracted = match archive::extract(&output, out_dir, opts.force) {
                    Ok(roots) => roots,
                    Err(e) => {
                        if let Err(rm) = fs::remove_file(&output) {
                            warn!("could not remove {}: {rm}", output.display());
                        }
                        return Err(e);
                    },
                };
                fs::remove_file(&output).map_err(Error::io(&output))?;
                on_stage(Stage::Extract);
            } else {
                warn!("{key} is not a compressed archive; nothing to extract");
            }
        }

        info!("restored {}", output.display());
        Ok(RestoreReport {
            output,
            decrypted: password.is_some(),
            extracted,
        })
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
