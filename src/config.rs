//! Configuration types and loading logic.
//!
//! `Config` is a direct 1-to-1 mapping of `config.toml`.  Every field has a
//! `Default` impl so the file is optional: without one, `hotbackup` talks to
//! S3 in `us-east-1` using the SDK's default credential chain, and `--bucket`
//! must be passed explicitly.
//!
//! # File format
//!
//! ```toml
//! default_bucket = "my-backups"
//!
//! [s3]
//! access_key       = "AKIA..."
//! secret_key       = "..."
//! region_name      = "eu-west-1"
//! endpoint_url     = "http://localhost:9000"  # optional, S3-compatible services
//! force_path_style = false
//!
//! [local]
//! root = "/mnt/backups"    # optional; store objects here instead of S3
//!
//! [backup]
//! compress    = true       # default for --compress / --no-compress
//! staging_dir = "/var/tmp" # optional; defaults to the system temp dir
//! ```
//!
//! The file holds credentials, so [`save_config`] writes it owner-only.

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};

// ─── Top-level ────────────────────────────────────────────────────────────────

/// Root configuration object, deserialised from `config.toml`.
#[derive(Debug, Deserialize, Serialize, Default, Clone, PartialEq)]
pub struct Config {
    /// Bucket used when a command is not given `--bucket`.
    #[serde(default)]
    pub default_bucket: String,

    /// S3 connection settings.
    #[serde(default)]
    pub s3: S3Config,

    /// Directory-backed store; overrides `[s3]` when `root` is set.
    #[serde(default)]
    pub local: LocalConfig,

    /// Defaults for the `backup` command.
    #[serde(default)]
    pub backup: BackupConfig,
}

impl Config {
    /// `--bucket` if given, else `default_bucket`, else an error.
    pub fn resolve_bucket(&self, flag: Option<&str>) -> Result<String> {
        match flag {
            Some(b) if !b.is_empty() => Ok(b.to_string()),
            _ if !self.default_bucket.is_empty() => Ok(self.default_bucket.clone()),
            _ => Err(Error::Config(
                "no bucket configured; pass --bucket or run `hotbackup configure`".into(),
            )),
        }
    }
}

// ─── [s3] ─────────────────────────────────────────────────────────────────────

/// Credentials and endpoint for the S3 adapter.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct S3Config {
    /// Leave both keys empty to use the AWS default credential chain.
    #[serde(default)]
    pub access_key: String,

    #[serde(default)]
    pub secret_key: String,

    #[serde(default = "default_region")]
    pub region_name: String,

    /// Custom endpoint for S3-compatible services (MinIO, Ceph, R2, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint_url: Option<String>,

    /// Use `endpoint/bucket/key` addressing instead of virtual-host style.
    /// Most self-hosted S3 implementations need this.
    #[serde(default)]
    pub force_path_style: bool,
}

impl Default for S3Config {
    fn default() -> Self {
        Self {
            access_key: String::new(),
            secret_key: String::new(),
            region_name: default_region(),
            endpoint_url: None,
            force_path_style: false,
        }
    }
}

// ─── [local] ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Serialize, Default, Clone, PartialEq)]
pub struct LocalConfig {
    /// Objects are stored at `<root>/<bucket>/<key>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,
}

// ─── [backup] ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct BackupConfig {
    /// Compress (tar + gzip) before upload unless `--no-compress` is given.
    #[serde(default = "default_compress")]
    pub compress: bool,

    /// Where per-invocation staging directories are created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staging_dir: Option<PathBuf>,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            compress: default_compress(),
            staging_dir: None,
        }
    }
}

impl BackupConfig {
    pub fn staging_root(&self) -> PathBuf {
        self.staging_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

// ─── Defaults ─────────────────────────────────────────────────────────────────

// serde needs free functions for per-field defaults.

pub fn default_region() -> String {
    "us-east-1".into()
}

pub const fn default_compress() -> bool {
    true
}

/// `<config_dir>/hotbackup/config.toml`, or `./hotbackup.toml` on platforms
/// without a config directory.
pub fn default_config_path() -> PathBuf {
    dirs_next::config_dir().map_or_else(
        || PathBuf::from("hotbackup.toml"),
        |d| d.join("hotbackup").join("config.toml"),
    )
}

// ─── Loader ───────────────────────────────────────────────────────────────────

/// Read and parse a `Config` from `path`.
///
/// A missing file logs a warning and yields defaults.  A file that exists but
/// cannot be read or parsed is a configuration error.
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        warn!(
            "config file '{}' not found, using defaults. Run 'hotbackup configure' to create one.",
            path.display()
        );
        return Ok(Config::default());
    }

    debug!("loading configuration from {}", path.display());
    let text = fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("reading {}: {e}", path.display())))?;
    toml::from_str(&text).map_err(|e| Error::Config(format!("parsing {}: {e}", path.display())))
}

/// Write `cfg` to `path`, creating parent directories.  On Unix the file is
/// created with mode `0600`.
pub fn save_config(cfg: &Config, path: &Path) -> Result<()> {
    let text = toml::to_string(cfg).map_err(|e| Error::Config(format!("serialising: {e}")))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(Error::io(parent))?;
    }

    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path).map_err(Error::io(path))?;

    // `mode` only applies on creation; tighten an existing file as well.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(Error::io(path))?;
    }

    std::io::Write::write_all(&mut file, text.as_bytes()).map_err(Error::io(path))?;
    debug!("config written to {}", path.display());
    Ok(())
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── Defaults ─────────────────────────────────────────────────────────────

    #[test]
    fn default_config_is_safe() {
        let cfg = Config::default();
        assert!(cfg.default_bucket.is_empty());
        assert!(cfg.s3.access_key.is_empty());
        assert!(cfg.s3.secret_key.is_empty());
        assert!(cfg.local.root.is_none());
    }

    #[test]
    fn default_compresses() {
        assert!(BackupConfig::default().compress);
    }

    #[test]
    fn default_region_is_us_east_1() {
        assert_eq!(S3Config::default().region_name, "us-east-1");
    }

    #[test]
    fn staging_root_falls_back_to_temp_dir() {
        assert_eq!(BackupConfig::default().staging_root(), std::env::temp_dir());
        let cfg = BackupConfig {
            compress: true,
            staging_dir: Some("/var/tmp".into()),
        };
        assert_eq!(cfg.staging_root(), PathBuf::from("/var/tmp"));
    }

    // ── resolve_bucket ────────────────────────────────────────────────────────

    #[test]
    fn flag_wins_over_default_bucket() {
        let cfg = Config {
            default_bucket: "configured".into(),
            ..Config::default()
        };
        assert_eq!(cfg.resolve_bucket(Some("flag")).unwrap(), "flag");
        assert_eq!(cfg.resolve_bucket(None).unwrap(), "configured");
    }

    #[test]
    fn missing_bucket_is_config_error() {
        let err = Config::default().resolve_bucket(None).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    // ── Round-trip serialisation ──────────────────────────────────────────────

    #[test]
    fn config_roundtrips_through_toml() {
        let original = Config {
            default_bucket: "my-backups".into(),
            s3: S3Config {
                access_key: "AKIAEXAMPLE".into(),
                secret_key: "hunter2".into(),
                region_name: "eu-west-1".into(),
                endpoint_url: Some("http://localhost:9000".into()),
                force_path_style: true,
            },
            local: LocalConfig {
                root: Some("/mnt/backups".into()),
            },
            backup: BackupConfig {
                compress: false,
                staging_dir: Some("/var/tmp".into()),
            },
        };

        let toml_str = toml::to_string(&original).expect("serialisation failed");
        let recovered: Config = toml::from_str(&toml_str).expect("deserialisation failed");
        assert_eq!(recovered, original);
    }

    #[test]
    fn partial_toml_uses_defaults_for_missing_fields() {
        let toml_str = r#"
            [s3]
            access_key = "AKIA"
            secret_key = "shh"
        "#;
        let cfg: Config = toml::from_str(toml_str).expect("parse failed");
        assert_eq!(cfg.s3.region_name, default_region());
        assert!(cfg.backup.compress);
        assert!(cfg.local.root.is_none());
        assert!(cfg.default_bucket.is_empty());
    }

    #[test]
    fn empty_toml_deserialises_to_defaults() {
        let cfg: Config = toml::from_str("").expect("empty toml should parse");
        assert_eq!(cfg, Config::default());
    }

    // ── load_config / save_config ─────────────────────────────────────────────

    #[test]
    fn load_config_returns_defaults_for_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config(&dir.path().join("absent.toml")).expect("missing file is fine");
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn load_config_errors_on_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "not valid toml ][[[").unwrap();

        assert!(matches!(load_config(&path), Err(Error::Config(_))));
    }

    #[test]
    fn save_then_load_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let cfg = Config {
            default_bucket: "b".into(),
            ..Config::default()
        };

        save_config(&cfg, &path).unwrap();
        assert_eq!(load_config(&path).unwrap(), cfg);
    }

    #[cfg(unix)]
    #[test]
    fn saved_config_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

        save_config(&Config::default(), &path).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }
}
