//! `hotbackup backup <filepath>`.

use anyhow::{Context, Result};
use chrono::Utc;

use crate::{
    cli::BackupArgs,
    config::Config,
    interrupt::CleanupRegistry,
    pipeline::{Pipeline, PipelineOptions},
    store,
    ui::{Progress, print_summary},
};

/// Run the backup pipeline and print the object name on stdout.
pub fn run(args: &BackupArgs, cfg: &Config, cleanup: &CleanupRegistry) -> Result<()> {
    let bucket = cfg.resolve_bucket(args.bucket.as_deref())?;
    let opts = PipelineOptions {
        compress: args.compress(cfg.backup.compress),
        password: args.password.clone(),
        kdf: None,
    };

    let store = store::open(cfg)?;
    let pipeline =
        Pipeline::new(store.as_ref(), bucket, cfg.backup.staging_root()).with_cleanup(cleanup.clone());

    let mut progress = Progress::start("Backing up");
    let result = pipeline.backup(&args.filepath, &opts, Utc::now(), &mut |stage| {
        progress.stage_done(stage);
    });
    let outcomes = progress.finish(result.is_err());

    let report = result.with_context(|| format!("backing up {}", args.filepath.display()))?;
    print_summary(
        &outcomes,
        &format!("Stored {} in {} ({} bytes).", report.key, report.bucket, report.size_bytes),
    );
    println!("{}", report.key);
    Ok(())
}
