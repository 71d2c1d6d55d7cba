//! Error taxonomy shared by the pipeline and its collaborators.
//!
//! Every fallible operation below the command layer returns [`Error`].  The
//! command handlers wrap it in `anyhow` for context; `main` downcasts back to
//! [`Error`] to pick the process exit code, so scripts can tell a wrong
//! password apart from a network outage.

use std::{
    io,
    path::{Path, PathBuf},
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Source unreadable, destination unwritable, disk full.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Wrong password or corrupted/tampered ciphertext.
    #[error("authentication failed: wrong password or corrupted ciphertext")]
    Authentication,

    /// Object-store failure during upload, download or listing.
    #[error("remote store error: {0}")]
    Remote(String),

    /// Request refused before any side effect took place.
    #[error("{0}")]
    Policy(String),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Adapter for `map_err` that tags an `io::Error` with the path involved.
    ///
    /// ```ignore
    /// fs::read(path).map_err(Error::io(path))?;
    /// ```
    pub fn io(path: impl AsRef<Path>) -> impl FnOnce(io::Error) -> Self {
        let path = path.as_ref().to_path_buf();
        move |source| Self::Io { path, source }
    }

    pub fn policy(msg: impl Into<String>) -> Self {
        Self::Policy(msg.into())
    }

    pub fn remote(msg: impl Into<String>) -> Self {
        Self::Remote(msg.into())
    }

    /// Process exit code for this error category (sysexits.h values).
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Policy(_) => 64,
            Self::Remote(_) => 69,
            Self::Io { .. } => 74,
            Self::Authentication => 77,
            Self::Config(_) => 78,
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_distinct_per_category() {
        let codes = [
            Error::policy("x").exit_code(),
            Error::remote("x").exit_code(),
            Error::io("/x")(io::Error::other("x")).exit_code(),
            Error::Authentication.exit_code(),
            Error::Config("x".into()).exit_code(),
        ];
        for (i, a) in codes.iter().enumerate() {
            for b in &codes[i + 1..] {
                assert_ne!(a, b);
            }
            assert_ne!(*a, 0, "an error must never map to a success code");
        }
    }

    #[test]
    fn io_error_message_names_the_path() {
        let err = Error::io("/data/report.csv")(io::Error::new(
            io::ErrorKind::NotFound,
            "no such file",
        ));
        let msg = err.to_string();
        assert!(msg.contains("/data/report.csv"), "got: {msg}");
        assert!(msg.contains("no such file"), "got: {msg}");
    }

    #[test]
    fn authentication_message_is_fixed() {
        insta::assert_snapshot!(
            Error::Authentication.to_string(),
            @"authentication failed: wrong password or corrupted ciphertext"
        );
    }
}
