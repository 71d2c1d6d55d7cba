//! Command-line interface definition.
//!
//! All argument parsing lives here so the rest of the codebase can stay
//! agnostic to `clap`.  The `Cli` struct is parsed once in `main` and then
//! passed (by reference) into the command handlers.

use std::path::PathBuf;

use clap::{Args, Parser};

use crate::config::default_config_path;

/// Top-level CLI arguments, shared across every subcommand.
#[derive(Parser, Debug)]
#[command(
    name    = "hotbackup",
    about   = "Back up files and directories to S3, optionally compressed and encrypted",
    version,
    help_template = "\
{before-help}{name} {version}
{about}

{usage-heading} {usage}

{all-args}{after-help}"
)]
pub struct Cli {
    /// Verbose diagnostics, including AWS SDK logging.
    #[arg(long, global = true, overrides_with = "no_debug")]
    pub debug: bool,

    /// Informational logging only (the default).
    #[arg(long, global = true, overrides_with = "debug")]
    pub no_debug: bool,

    /// Path to the configuration file.
    ///
    /// Defaults to `<config dir>/hotbackup/config.toml`.
    #[arg(short, long, global = true, default_value_os_t = default_config_path())]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Whether `--debug` is in effect after `--no-debug` overrides.
    pub const fn debug_enabled(&self) -> bool {
        self.debug && !self.no_debug
    }
}

#[derive(clap::Subcommand, Debug)]
pub enum Command {
    /// Upload a file or directory, optionally compressed and encrypted.
    ///
    /// Prints the resulting object name on success.
    Backup(BackupArgs),

    /// Download an object, decrypting it if its name ends in `.enc`.
    Restore(RestoreArgs),

    /// List the objects in a bucket, oldest first.
    List(ListArgs),

    /// Write credentials and defaults to the configuration file.
    ///
    /// Values not given as flags are prompted for, showing the current value
    /// as the default.  The secret key is read without echo.
    Configure(ConfigureArgs),
}

#[derive(Args, Debug)]
pub struct BackupArgs {
    /// File or directory to back up.
    pub filepath: PathBuf,

    /// Archive with tar + gzip before upload.
    #[arg(long, overrides_with = "no_compress")]
    pub compress: bool,

    /// Upload the file as-is.  Not allowed for directories.
    #[arg(long, overrides_with = "compress")]
    pub no_compress: bool,

    /// Encrypt before upload.
    #[arg(long, env = "HOTBACKUP_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Bucket to upload into; defaults to `default_bucket` from the config.
    #[arg(long)]
    pub bucket: Option<String>,
}

impl BackupArgs {
    /// `--compress`/`--no-compress` if given, else the configured default.
    pub const fn compress(&self, default: bool) -> bool {
        if self.no_compress {
            false
        } else if self.compress {
            true
        } else {
            default
        }
    }
}

#[derive(Args, Debug)]
pub struct RestoreArgs {
    /// Object key to restore, as printed by `backup` or `list`.
    pub filename: String,

    /// Password for `.enc` objects.
    #[arg(long, env = "HOTBACKUP_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    #[arg(long)]
    pub bucket: Option<String>,

    /// Directory to write the restored file into.
    #[arg(long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Unpack a restored `.tgz` archive and remove it.
    #[arg(long)]
    pub extract: bool,

    /// Overwrite existing files.
    #[arg(long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    #[arg(long)]
    pub bucket: Option<String>,

    /// Print a JSON array instead of a table.
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Default)]
pub struct ConfigureArgs {
    #[arg(long)]
    pub access_key: Option<String>,

    #[arg(long)]
    pub secret_key: Option<String>,

    #[arg(long)]
    pub region: Option<String>,

    /// Default bucket for every command.
    #[arg(long)]
    pub bucket: Option<String>,

    /// S3-compatible endpoint, e.g. `http://localhost:9000`.
    #[arg(long)]
    pub endpoint_url: Option<String>,

    /// Store objects in this directory instead of S3.
    #[arg(long)]
    pub local_root: Option<PathBuf>,
}

impl ConfigureArgs {
    /// True when every value was supplied and no prompt is needed.
    pub const fn is_complete(&self) -> bool {
        self.access_key.is_some()
            && self.secret_key.is_some()
            && self.region.is_some()
            && self.bucket.is_some()
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
