//! `hotbackup configure`: write credentials and defaults to the config file.
//!
//! Flags win.  Anything not given as a flag is prompted for on the terminal,
//! with the current value offered as the default (press Enter to keep it).
//! The secret key is read without echo and its current value is never shown.

use std::path::Path;

use anyhow::{Context, Result};
use console::{Term, style};
use tracing::info;

use crate::{
    cli::ConfigureArgs,
    config::{Config, save_config},
};

/// Source of answers for values missing from the command line.
pub trait Prompter {
    fn ask(&mut self, question: &str, current: &str) -> Result<String>;
    fn ask_secret(&mut self, question: &str, has_current: bool) -> Result<String>;
}

/// Interactive prompts on stderr.
pub struct TermPrompter {
    term: Term,
}

impl TermPrompter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for TermPrompter {
    fn default() -> Self {
        Self {
            term: Term::stderr(),
        }
    }
}

impl Prompter for TermPrompter {
    fn ask(&mut self, question: &str, current: &str) -> Result<String> {
        let hint = if current.is_empty() {
            String::new()
        } else {
            format!(" [{}]", style(current).dim())
        };
        self.term.write_str(&format!("{question}{hint}: "))?;
        Ok(self.term.read_line()?.trim().to_string())
    }

    fn ask_secret(&mut self, question: &str, has_current: bool) -> Result<String> {
        let hint = if has_current {
            format!(" [{}]", style("unchanged").dim())
        } else {
            String::new()
        };
        self.term.write_str(&format!("{question}{hint}: "))?;
        Ok(self.term.read_secure_line()?.trim().to_string())
    }
}

pub fn run(args: &ConfigureArgs, cfg: &Config, path: &Path) -> Result<()> {
    let updated = if args.is_complete() || !Term::stderr().is_term() {
        apply(args, cfg, None)?
    } else {
        apply(args, cfg, Some(&mut TermPrompter::new()))?
    };

    save_config(&updated, path)
        .with_context(|| format!("writing configuration to {}", path.display()))?;
    info!("configuration written to {}", path.display());
    Ok(())
}

/// Merge flags, then prompt answers, over `current`.  An empty answer keeps
/// the current value.
pub fn apply(
    args: &ConfigureArgs,
    current: &Config,
    mut prompter: Option<&mut dyn Prompter>,
) -> Result<Config> {
    let mut cfg = current.clone();

    let mut answer = |flag: &Option<String>, question: &str, value: &mut String| -> Result<()> {
        if let Some(v) = flag {
            *value = v.clone();
        } else if let Some(p) = prompter.as_deref_mut() {
            let got = p.ask(question, value)?;
            if !got.is_empty() {
                *value = got;
            }
        }
        Ok(())
    };

    answer(&args.access_key, "AWS access key", &mut cfg.s3.access_key)?;
    answer(&args.region, "AWS region", &mut cfg.s3.region_name)?;
    answer(&args.bucket, "Default bucket", &mut cfg.default_bucket)?;

    if let Some(ref secret) = args.secret_key {
        cfg.s3.secret_key = secret.clone();
    } else if let Some(p) = prompter.as_deref_mut() {
        let got = p.ask_secret("AWS secret key", !cfg.s3.secret_key.is_empty())?;
        if !got.is_empty() {
            cfg.s3.secret_key = got;
        }
    }

    if let Some(ref url) = args.endpoint_url {
        cfg.s3.endpoint_url = Some(url.clone()).filter(|u| !u.is_empty());
    }
    if let Some(ref root) = args.local_root {
        cfg.local.root = Some(root.clone()).filter(|r| !r.as_os_str().is_empty());
    }
    Ok(cfg)
}

// ─── Tests ────────────────────────────────────────────────────────────────────
