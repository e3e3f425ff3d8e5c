//! The engine interface a checkpoint consumes.
//!
//! A checkpoint never reads or writes engine data structures directly. It
//! asks the engine which files are live, where the write-ahead log stands
//! and to hold off deleting obsolete files, then moves opaque files with
//! the engine's [`Env`].

use crate::error::CoreResult;
use crate::types::{LogNumber, SequenceNumber};
use cairn_env::Env;
use std::path::Path;

/// The engine's live-file set at one instant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LiveFiles {
    /// File names relative to the database directory.
    pub files: Vec<String>,
    /// Size of the descriptor file when the set was captured.
    ///
    /// The checkpoint's copy of the descriptor never exceeds this length,
    /// even if the live descriptor grows afterward.
    pub manifest_size: u64,
}

/// Whether a log segment is still in the WAL directory or was archived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WalFileType {
    /// Segment in the WAL directory; may still be receiving writes.
    Alive,
    /// Segment moved to the archive; never needed for recovery.
    Archived,
}

/// One write-ahead log segment as reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalSegment {
    /// Log number of the segment.
    pub log_number: LogNumber,
    /// Sequence number of the first record in the segment.
    pub start_sequence: SequenceNumber,
    /// Size of the segment when it was listed.
    pub size_bytes: u64,
    /// Alive or archived.
    pub file_type: WalFileType,
    /// Path relative to the WAL directory.
    pub path_name: String,
}

impl WalSegment {
    /// Returns true if the segment is in the live WAL directory.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.file_type == WalFileType::Alive
    }

    /// File name of the segment, without any archive directory.
    #[must_use]
    pub fn file_name(&self) -> &str {
        let path = self.path_name.trim_start_matches('/');
        path.rsplit('/').next().unwrap_or(path)
    }
}

/// The logical point a checkpoint represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotCutPoint {
    /// Latest sequence number when the checkpoint started.
    pub sequence_number: SequenceNumber,
    /// Lowest log segment still needed for unresolved two-phase
    /// transactions; present only in two-phase commit mode.
    pub min_log_number_to_keep: Option<LogNumber>,
}

impl SnapshotCutPoint {
    /// Cut point for an engine without two-phase commit.
    #[must_use]
    pub const fn at(sequence_number: SequenceNumber) -> Self {
        Self {
            sequence_number,
            min_log_number_to_keep: None,
        }
    }
}

/// The query and control surface of a live storage engine.
///
/// Implementations must tolerate concurrent writers and background
/// maintenance while these methods are called.
pub trait Engine: Send + Sync {
    /// Environment holding the engine's files.
    fn env(&self) -> &dyn Env;

    /// Root directory of the database.
    fn db_path(&self) -> &Path;

    /// Directory holding write-ahead log segments.
    fn wal_dir(&self) -> &Path;

    /// Whether two-phase (multi-file) transactions are enabled.
    fn two_phase_commit(&self) -> bool;

    /// Lists the live files. With `flush`, memtables are flushed first so
    /// the listing covers every committed write.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot produce the listing.
    fn live_files(&self, flush: bool) -> CoreResult<LiveFiles>;

    /// Latest committed sequence number.
    fn latest_sequence_number(&self) -> SequenceNumber;

    /// Takes one share of the deletion gate.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine refuses to suspend deletions.
    fn disable_file_deletions(&self) -> CoreResult<()>;

    /// Returns one share of the deletion gate, or all shares with `force`.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot resume deletions.
    fn enable_file_deletions(&self, force: bool) -> CoreResult<()>;

    /// Lowest log number needed to recover prepared transactions.
    ///
    /// Only meaningful when [`Engine::two_phase_commit`] is true.
    fn min_log_number_to_keep(&self) -> Option<LogNumber>;

    /// Lists log segments in ascending log-number order.
    ///
    /// # Errors
    ///
    /// Returns an error if the WAL directory cannot be listed.
    fn sorted_wal_files(&self) -> CoreResult<Vec<WalSegment>>;
}
