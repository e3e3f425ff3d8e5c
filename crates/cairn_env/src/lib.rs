//! # Cairn Env
//!
//! Filesystem environment abstraction for Cairn.
//!
//! This crate provides the lowest-level filesystem seam used when Cairn
//! materializes files outside the live engine, most notably checkpoints.
//! Environments operate on **opaque files** - they do not interpret the
//! data they move.
//!
//! ## Design Principles
//!
//! - Environments create, link, rename, list and delete files and directories
//! - No knowledge of Cairn file names, manifests or logs
//! - Must be `Send + Sync` for concurrent access
//! - Hard-link rejection is reported as `NotSupported`, distinct from I/O errors
//!
//! ## Available Environments
//!
//! - [`PosixEnv`] - For the local filesystem
//! - [`MemEnv`] - For testing and filesystem simulations
//!
//! ## Example
//!
//! ```rust
//! use cairn_env::{file_util, Env, MemEnv};
//! use std::path::Path;
//!
//! let env = MemEnv::new();
//! env.write_file(Path::new("/db/MANIFEST-000001"), b"manifest bytes").unwrap();
//! env.create_dir(Path::new("/snap")).unwrap();
//! file_util::copy_file(&env, Path::new("/db/MANIFEST-000001"),
//!     Path::new("/snap/MANIFEST-000001"), 8, false).unwrap();
//! assert_eq!(env.read_file(Path::new("/snap/MANIFEST-000001")).unwrap(), b"manifest");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod env;
mod error;
pub mod file_util;
mod memory;
mod posix;

pub use env::{Directory, Env, SequentialFile, WritableFile};
pub use error::{EnvError, EnvResult};
pub use memory::MemEnv;
pub use posix::PosixEnv;
