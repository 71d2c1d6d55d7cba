//! Terminal UI: spinner, per-stage ticks, and the closing summary.
//!
//! # Design goals
//!
//! - **Quiet stdout.** Everything here renders to stderr.  stdout carries only
//!   command results (the object name from `backup`, the `list` table) so they
//!   can be piped.
//! - **One line per stage.** While the pipeline runs the user sees a spinner;
//!   each completed stage leaves a static ✓ line behind it.
//! - **Testable without a terminal.** [`StageOutcome`] is plain data and
//!   [`StageOutcome::render`] returns a `String`; the spinner hides itself
//!   when stderr is not a TTY.
//!
//! Error messages are not rendered here; `main` prints them once, whatever
//! the command.
//!
//! # Typical usage
//!
//! ```ignore
//! let mut progress = Progress::start("Backing up");
//! let result = pipeline.backup(path, &opts, now, &mut |stage| progress.stage_done(stage));
//! let outcomes = progress.finish(result.is_err());
//! print_summary(&outcomes, "Backup complete.");
//! ```

use std::{fmt::Display, time::Duration};

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

// ─── Icons ───────────────────────────────────────────────────────────────────

/// Braille spinner frames.
static SPINNER_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

fn icon_ok() -> console::StyledObject<&'static str> {
    style("✓").green().bold()
}

fn icon_err() -> console::StyledObject<&'static str> {
    style("✗").red().bold()
}

/// Cyan ✓ next to the final success summary.
fn icon_done() -> console::StyledObject<&'static str> {
    style("✓").cyan().bold()
}

// ─── Stage result ─────────────────────────────────────────────────────────────

/// The outcome of a single pipeline stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageOutcome {
    /// Human-readable stage label, e.g. `"Encrypt"`.
    pub label: String,
    pub success: bool,
}

impl StageOutcome {
    pub fn ok(label: impl Display) -> Self {
        Self {
            label: label.to_string(),
            success: true,
        }
    }

    pub fn failed(label: impl Display) -> Self {
        Self {
            label: label.to_string(),
            success: false,
        }
    }

    /// The ✓/✗ line.
    pub fn render(&self) -> String {
        let icon = if self.success { icon_ok() } else { icon_err() };
        format!("  {icon}  {}", style(&self.label).bold())
    }

    pub fn print(&self) {
        eprintln!("{}", self.render());
    }

    pub const fn is_failure(&self) -> bool {
        !self.success
    }
}

// ─── Spinner ──────────────────────────────────────────────────────────────────

/// Create and start an indeterminate spinner for `label`.
fn make_spinner(label: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let template = ProgressStyle::with_template("  {spinner:.cyan}  {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(template.tick_chars(SPINNER_CHARS));
    pb.set_message(format!("{}", style(label).dim()));
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

// ─── Progress tracker ─────────────────────────────────────────────────────────

/// Drives the spinner while a pipeline runs and records each stage.
pub struct Progress {
    label: String,
    spinner: ProgressBar,
    outcomes: Vec<StageOutcome>,
}

impl Progress {
    pub fn start(label: &str) -> Self {
        Self {
            label: label.to_string(),
            spinner: make_spinner(label),
            outcomes: Vec::new(),
        }
    }

    /// Record a completed stage and print its ✓ line above the spinner.
    pub fn stage_done(&mut self, stage: impl Display) {
        let outcome = StageOutcome::ok(stage);
        self.spinner.suspend(|| outcome.print());
        self.outcomes.push(outcome);
    }

    /// Clear the spinner.  When the run `failed`, a ✗ line for the overall
    /// label is printed and appended.
    pub fn finish(mut self, failed: bool) -> Vec<StageOutcome> {
        self.spinner.finish_and_clear();
        if failed {
            let outcome = StageOutcome::failed(&self.label);
            outcome.print();
            self.outcomes.push(outcome);
        }
        self.outcomes
    }
}

// ─── Summary banner ───────────────────────────────────────────────────────────

/// Print the closing banner: `success_message` when every stage passed,
/// otherwise the list of failed stages.
pub fn print_summary(outcomes: &[StageOutcome], success_message: &str) {
    eprintln!();
    eprintln!("{}", render_summary(outcomes, success_message));
}

fn render_summary(outcomes: &[StageOutcome], success_message: &str) -> String {
    let failed: Vec<&StageOutcome> = outcomes.iter().filter(|o| o.is_failure()).collect();
    if failed.is_empty() {
        return format!("  {} {}", icon_done(), style(success_message).cyan().bold());
    }
    let mut out = format!("  {}  {}", icon_err(), style("Failed.").red().bold());
    for o in failed {
        out.push_str(&format!("\n    {} {}", icon_err(), style(&o.label).red()));
    }
    out
}

// ─── Tests ────────────────────────────────────────────────────────────────────
