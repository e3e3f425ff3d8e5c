//! # Cairn Core
//!
//! Consistent checkpoints of a live Cairn database.
//!
//! This crate provides:
//! - File classification for the database directory naming scheme
//! - The [`Engine`] interface a checkpoint consumes, and the deletion gate
//! - Hard-link-or-copy file transfer with sticky cross-device fallback
//! - Write-ahead log segment selection, including the two-phase rule
//! - All-or-nothing checkpoint creation through a self-removing staging
//!   directory
//! - [`DirectoryEngine`] for checkpointing a database that is shut down

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod checkpoint;
mod config;
#[cfg(feature = "std")]
mod dir_engine;
mod engine;
mod error;
pub mod filename;
mod gate;
pub mod transfer;
mod types;
pub mod unwind;
pub mod wal_select;

pub use checkpoint::{Checkpoint, CheckpointReport, LocalCheckpoint};
pub use config::{CheckpointOptions, DEFAULT_STAGING_SUFFIX};
#[cfg(feature = "std")]
pub use dir_engine::DirectoryEngine;
pub use engine::{Engine, LiveFiles, SnapshotCutPoint, WalFileType, WalSegment};
pub use error::{CoreError, CoreResult};
pub use filename::{FileType, LiveFileEntry, LiveFileKind};
pub use gate::{DeletionGuard, FileDeletionGate};
pub use types::{LogNumber, SequenceNumber};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
