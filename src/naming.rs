//! Object naming policy.
//!
//! A backup is stored under
//!
//! ```text
//! <base name>.<YYYYMMDD-HHMMSS>[.tgz][.enc]
//! ```
//!
//! where the timestamp is UTC, captured once when the pipeline starts.  The
//! same string names the staged file on disk and the remote key, so the name
//! printed by `backup` is exactly what `restore` expects.
//!
//! The suffix grammar is strict: `.tgz` (if present) always precedes `.enc`
//! (if present), and nothing else may follow the timestamp.

use std::fmt;

use chrono::{DateTime, NaiveDateTime, SubsecRound, Utc};

pub const TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";
pub const COMPRESSED_SUFFIX: &str = ".tgz";
pub const ENCRYPTED_SUFFIX: &str = ".enc";

/// Structured form of a backup object name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectName {
    pub base: String,
    pub timestamp: DateTime<Utc>,
    pub compressed: bool,
    pub encrypted: bool,
}

impl ObjectName {
    /// Sub-second precision is dropped so the value survives a format/parse
    /// round trip.
    pub fn new(
        base: impl Into<String>,
        timestamp: DateTime<Utc>,
        compressed: bool,
        encrypted: bool,
    ) -> Self {
        Self {
            base: base.into(),
            timestamp: timestamp.trunc_subsecs(0),
            compressed,
            encrypted,
        }
    }

    /// Parse a key produced by [`object_name`].  Returns `None` for anything
    /// that does not follow the grammar.
    pub fn parse(key: &str) -> Option<Self> {
        let (stem, compressed, encrypted) = peel_suffixes(key);
        let (base, stamp) = stem.rsplit_once('.')?;
        if base.is_empty() || stamp.len() != 15 {
            return None;
        }
        let timestamp = NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT)
            .ok()?
            .and_utc();
        Some(Self {
            base: base.to_string(),
            timestamp,
            compressed,
            encrypted,
        })
    }
}

impl fmt::Display for ObjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.base, self.timestamp.format(TIMESTAMP_FORMAT))?;
        if self.compressed {
            f.write_str(COMPRESSED_SUFFIX)?;
        }
        if self.encrypted {
            f.write_str(ENCRYPTED_SUFFIX)?;
        }
        Ok(())
    }
}

/// `<base>.<YYYYMMDD-HHMMSS>` with `.tgz` and then `.enc` appended as requested.
pub fn object_name(
    base: &str,
    timestamp: DateTime<Utc>,
    compressed: bool,
    encrypted: bool,
) -> String {
    ObjectName::new(base, timestamp, compressed, encrypted).to_string()
}

/// Strip a trailing `.enc`, then a trailing `.tgz`.
///
/// Returns `(stem, compressed, encrypted)`.  Works on any key, including ones
/// this tool did not produce, which is what restore relies on.
pub fn peel_suffixes(key: &str) -> (&str, bool, bool) {
    let (rest, encrypted) = match key.strip_suffix(ENCRYPTED_SUFFIX) {
        Some(rest) => (rest, true),
        None => (key, false),
    };
    match rest.strip_suffix(COMPRESSED_SUFFIX) {
        Some(stem) => (stem, true, encrypted),
        None => (rest, false, encrypted),
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
