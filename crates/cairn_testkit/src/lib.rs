//! # Cairn Testkit
//!
//! Test utilities for Cairn.
//!
//! This crate provides:
//! - Database directory fixtures, in memory or on disk
//! - A scriptable engine that counts every call a checkpoint makes
//! - A fault-injecting environment for driving checkpoints into every
//!   failure path
//!
//! ## Usage
//!
//! ```rust,ignore
//! use cairn_testkit::prelude::*;
//!
//! let mem = Arc::new(MemEnv::new());
//! let engine = DbLayout::default()
//!     .scripted_engine(Arc::clone(&mem), &mem, Path::new("/db"))?;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod engine;
pub mod fault;
pub mod fixtures;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::engine::*;
    pub use crate::fault::*;
    pub use crate::fixtures::*;
}

pub use engine::ScriptedEngine;
pub use fault::FaultInjectionEnv;
pub use fixtures::{patterned, DbLayout, TempDb, WalFixture};
