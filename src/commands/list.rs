//! `hotbackup list`: the objects in a bucket, oldest first.

use anyhow::{Context, Result};
use tracing::info;

use crate::{cli::ListArgs, config::Config, store, store::ObjectSummary};

const DISPLAY_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn run(args: &ListArgs, cfg: &Config) -> Result<()> {
    let bucket = cfg.resolve_bucket(args.bucket.as_deref())?;
    let store = store::open(cfg)?;

    let mut objects = store
        .list(&bucket)
        .with_context(|| format!("listing bucket {bucket}"))?;
    sort_oldest_first(&mut objects);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&objects)?);
        return Ok(());
    }
    if objects.is_empty() {
        info!("bucket {bucket} is empty");
        return Ok(());
    }
    print!("{}", render_table(&objects));
    Ok(())
}

fn sort_oldest_first(objects: &mut [ObjectSummary]) {
    objects.sort_by(|a, b| {
        a.last_modified
            .cmp(&b.last_modified)
            .then_with(|| a.key.cmp(&b.key))
    });
}

/// One line per object: key, UTC timestamp, size in bytes.
fn render_table(objects: &[ObjectSummary]) -> String {
    let key_width = objects.iter().map(|o| o.key.len()).max().unwrap_or(0);
    let size_width = objects
        .iter()
        .map(|o| o.size_bytes.to_string().len())
        .max()
        .unwrap_or(0);

    objects
        .iter()
        .map(|o| {
            format!(
                "{:<key_width$}  {}  {:>size_width$}\n",
                o.key,
                o.last_modified.format(DISPLAY_TIME_FORMAT),
                o.size_bytes,
            )
        })
        .collect()
}

// ─── Tests ────────────────────────────────────────────────────────────────────
