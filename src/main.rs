//! `hotbackup`: back up files and directories to S3, optionally compressed
//! and encrypted.
//!
//! # Overview
//!
//! A file or directory is archived (tar + gzip), encrypted under a password
//! (Argon2id + XChaCha20-Poly1305) and uploaded as a timestamped object.
//! Restore reverses whichever of those stages the object name says were
//! applied.  Intermediate files live in a private staging directory that is
//! removed on every exit path.
//!
//! # Usage
//!
//! ```text
//! hotbackup configure                             # write credentials + default bucket
//! hotbackup backup ./photos --password hunter2    # -> photos.20240102-030405.tgz.enc
//! hotbackup list
//! hotbackup restore photos.20240102-030405.tgz.enc --password hunter2 --extract
//! ```
//!
//! # Module layout
//!
//! | Module                   | Responsibility                                   |
//! |--------------------------|--------------------------------------------------|
//! | [`cli`]                  | Argument types parsed by clap                    |
//! | [`config`]               | `Config` struct + TOML loader/writer             |
//! | [`error`]                | Error categories and their exit codes            |
//! | [`logging`]              | `tracing` subscriber setup                       |
//! | [`archive`]              | tar + gzip packing and unpacking                 |
//! | [`cipher`]               | Password-based authenticated encryption          |
//! | [`naming`]               | Object key format                                |
//! | [`store`]                | Blob store trait, S3 and local-directory adapters|
//! | [`pipeline`]             | Backup/restore stage sequencing and cleanup      |
//! | [`interrupt`]            | Remove staged files on SIGINT/SIGTERM            |
//! | [`ui`]                   | Spinner, stage ticks, summary                    |
//! | [`commands`]             | One handler per subcommand                       |
//!
//! # Exit codes
//!
//! | Code | Meaning                                         |
//! |------|-------------------------------------------------|
//! | 0    | success                                         |
//! | 1    | any other failure                               |
//! | 2    | invalid arguments                               |
//! | 64   | request refused (e.g. uncompressed directory)   |
//! | 69   | object store failure                            |
//! | 74   | local I/O failure                               |
//! | 77   | wrong password or corrupted ciphertext          |
//! | 78   | configuration error                             |
//! | 130  | interrupted; staged files were removed          |

mod archive;
mod cipher;
mod cli;
mod commands;
mod config;
mod error;
mod interrupt;
mod logging;
mod naming;
mod pipeline;
mod store;
mod ui;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command};
use console::style;
use interrupt::CleanupRegistry;
use tracing::{debug, warn};

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.debug_enabled());

    let cleanup = CleanupRegistry::default();
    if let Err(e) = interrupt::install(cleanup.clone()) {
        warn!("could not install the interrupt handler: {e}");
    }

    match run(&cli, &cleanup) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {err:#}", style("Error:").red().bold().for_stderr());
            ExitCode::from(exit_code(&err))
        },
    }
}

fn run(cli: &Cli, cleanup: &CleanupRegistry) -> Result<()> {
    let cfg = config::load_config(&cli.config)?;
    debug!("using configuration from {}", cli.config.display());

    match &cli.command {
        Command::Backup(args) => commands::backup::run(args, &cfg, cleanup),
        Command::Restore(args) => commands::restore::run(args, &cfg, cleanup),
        Command::List(args) => commands::list::run(args, &cfg),
        Command::Configure(args) => commands::configure::run(args, &cfg, &cli.config),
    }
}

/// The category code of the first [`error::Error`] in the chain, else 1.
fn exit_code(err: &anyhow::Error) -> u8 {
    err.chain()
        .find_map(|e| e.downcast_ref::<error::Error>())
        .map_or(1, error::Error::exit_code)
}

// ─── Tests ────────────────────────────────────────────────────────────────────
