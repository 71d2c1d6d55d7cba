//! Subcommand handlers.
//!
//! Each file in this module corresponds to one user-facing command:
//!
//! | File           | Invocation            | Description                           |
//! |----------------|-----------------------|---------------------------------------|
//! | `backup.rs`    | `hotbackup backup`    | Archive, encrypt and upload a path    |
//! | `restore.rs`   | `hotbackup restore`   | Download, decrypt and write an object |
//! | `list.rs`      | `hotbackup list`      | Show a bucket's objects               |
//! | `configure.rs` | `hotbackup configure` | Write the configuration file          |

pub mod backup;
pub mod configure;
pub mod list;
pub mod restore;
