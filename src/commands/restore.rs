//! `hotbackup restore <filename>`.

use anyhow::{Context, Result};

use crate::{
    cli::RestoreArgs,
    config::Config,
    interrupt::CleanupRegistry,
    pipeline::{Pipeline, RestoreOptions},
    store,
    ui::{Progress, print_summary},
};

pub fn run(args: &RestoreArgs, cfg: &Config, cleanup: &CleanupRegistry) -> Result<()> {
    let bucket = cfg.resolve_bucket(args.bucket.as_deref())?;
    let opts = RestoreOptions {
        password: args.password.clone(),
        extract: args.extract,
        force: args.force,
    };

    let store = store::open(cfg)?;
    let pipeline =
        Pipeline::new(store.as_ref(), bucket, cfg.backup.staging_root()).with_cleanup(cleanup.clone());

    let mut progress = Progress::start("Restoring");
    let result = pipeline.restore(&args.filename, &args.output_dir, &opts, &mut |stage| {
        progress.stage_done(stage);
    });
    let outcomes = progress.finish(result.is_err());

    let report = result.with_context(|| format!("restoring {}", args.filename))?;
    let verb = if report.decrypted { "Decrypted and restored" } else { "Restored" };
    let message = if report.extracted.is_empty() {
        format!("{verb} {}.", report.output.display())
    } else {
        format!(
            "Extracted {} into {}.",
            report.extracted.join(", "),
            args.output_dir.display()
        )
    };
    print_summary(&outcomes, &message);
    Ok(())
}
