//! Openable, point-in-time checkpoints of a live database.
//!
//! A checkpoint is a directory that can be opened as a database of its
//! own. Table files are hard-linked when possible, everything mutable is
//! copied up to the size observed when the checkpoint started, and the
//! current-pointer file is written fresh. The directory appears at its
//! final path only once complete: it is staged next to the target and
//! renamed into place.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use cairn_core::{checkpoint, CheckpointOptions};
//!
//! let checkpoint = checkpoint::open(&engine, CheckpointOptions::default());
//! let report = checkpoint.create_checkpoint(Path::new("/backups/snap-1"))?;
//! println!("checkpoint at {}", report.sequence_number);
//! ```

use crate::config::CheckpointOptions;
use crate::engine::{Engine, LiveFiles, SnapshotCutPoint, WalSegment};
use crate::error::{CoreError, CoreResult};
use crate::filename::{current_file_contents, current_file_name, LiveFileEntry};
use crate::gate::DeletionGuard;
use crate::transfer::{Transfer, TransferMethod, TransferState};
use crate::types::SequenceNumber;
use crate::unwind::StagingDir;
use crate::wal_select::{select_wal_files, WalTransferMode};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Creates checkpoints of one engine.
pub trait Checkpoint {
    /// Builds a checkpoint at `checkpoint_dir`, which must not exist.
    ///
    /// On success the directory is complete and synced. On failure it
    /// does not exist and no staging directory is left behind.
    ///
    /// # Errors
    ///
    /// - `AlreadyExists` if `checkpoint_dir` exists
    /// - `InvalidArgument` if two-phase commit is enabled but the engine
    ///   cannot report its minimum log number to keep
    /// - `Corruption` if the engine lists a file outside the naming scheme
    /// - `Env`/`Io` for any probe, link, copy, rename or sync failure
    fn create_checkpoint(&self, checkpoint_dir: &Path) -> CoreResult<CheckpointReport>;
}

/// Summary of a successful checkpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointReport {
    /// Where the checkpoint was installed.
    pub path: PathBuf,
    /// Sequence number the checkpoint is cut at.
    pub sequence_number: SequenceNumber,
    /// Files hard-linked from the live database.
    pub files_linked: usize,
    /// Files copied, including the descriptor and log segments.
    pub files_copied: usize,
    /// Log segments included.
    pub wal_files: usize,
    /// False if hard links were rejected and files were copied instead.
    pub same_filesystem: bool,
}

#[derive(Debug, Default)]
struct TransferStats {
    linked: usize,
    copied: usize,
    wal_files: usize,
}

impl TransferStats {
    fn record(&mut self, method: TransferMethod) {
        match method {
            TransferMethod::Linked => self.linked += 1,
            TransferMethod::Copied => self.copied += 1,
        }
    }
}

/// Checkpoints built on the engine's own filesystem.
pub struct LocalCheckpoint<'a, E: Engine + ?Sized> {
    engine: &'a E,
    options: CheckpointOptions,
}

/// Returns a checkpoint creator for `engine`.
pub fn open<'a, E: Engine + ?Sized>(
    engine: &'a E,
    options: CheckpointOptions,
) -> Box<dyn Checkpoint + 'a> {
    Box::new(LocalCheckpoint::new(engine, options))
}

/// Path of the staging directory for `target`.
#[must_use]
pub fn staging_path(target: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = target.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

impl<'a, E: Engine + ?Sized> LocalCheckpoint<'a, E> {
    /// Creates a checkpoint creator for `engine`.
    #[must_use]
    pub fn new(engine: &'a E, options: CheckpointOptions) -> Self {
        Self { engine, options }
    }

    /// Links or copies every needed file into `dir`.
    fn populate(
        &self,
        dir: &Path,
        live: &LiveFiles,
        wal_files: &[WalSegment],
        cut: &SnapshotCutPoint,
    ) -> CoreResult<(TransferStats, TransferState)> {
        let transfer = Transfer::new(self.engine.env(), dir, self.options.use_fsync);
        let mut state = TransferState::new();
        let mut stats = TransferStats::default();

        for name in &live.files {
            let entry = LiveFileEntry::parse(name)?;
            if let Some(method) =
                transfer.live_file(&mut state, self.engine.db_path(), &entry, live.manifest_size)?
            {
                stats.record(method);
            }
        }

        // CURRENT may change while we run, so write it from the
        // descriptor we actually copied.
        let manifest = state
            .manifest_file_name
            .clone()
            .ok_or_else(|| CoreError::corruption("live file set has no descriptor file"))?;
        let current = state
            .current_file_name
            .clone()
            .unwrap_or_else(|| current_file_name().to_string());
        transfer.create(&current, current_file_contents(&manifest).as_bytes())?;

        let selected = select_wal_files(wal_files, cut);
        info!(count = selected.len(), "number of log files");
        for selection in &selected {
            let segment = selection.segment;
            let src = self
                .engine
                .wal_dir()
                .join(segment.path_name.trim_start_matches('/'));
            let name = segment.file_name();
            let method = match selection.mode {
                WalTransferMode::LinkOrCopy => transfer.link_or_copy(&mut state, &src, name)?,
                WalTransferMode::CopyExact(size) => transfer.copy_prefix(&src, name, size)?,
            };
            stats.record(method);
            stats.wal_files += 1;
        }

        Ok((stats, state))
    }
}

impl<E: Engine + ?Sized> Checkpoint for LocalCheckpoint<'_, E> {
    fn create_checkpoint(&self, checkpoint_dir: &Path) -> CoreResult<CheckpointReport> {
        if self.options.staging_suffix.is_empty() {
            return Err(CoreError::invalid_argument("staging suffix must not be empty"));
        }
        let env = self.engine.env();
        // Drops any trailing separator so the staging path is a sibling.
        let target: PathBuf = checkpoint_dir.components().collect();

        if env.file_exists(&target)? {
            return Err(CoreError::AlreadyExists { path: target });
        }

        let gate = DeletionGuard::acquire(self.engine)?;
        let sequence_number = self.engine.latest_sequence_number();
        let mut live = self.engine.live_files(false)?;

        let mut min_log_number_to_keep = None;
        if self.engine.two_phase_commit() {
            let Some(min_log) = self.engine.min_log_number_to_keep() else {
                drop(gate);
                return Err(CoreError::invalid_argument(
                    "two-phase commit enabled but the minimum log number to keep is unknown",
                ));
            };
            min_log_number_to_keep = Some(min_log);
            // Re-list after a flush. A transaction prepared in an older
            // log and committed in a log created after the first listing
            // would otherwise be copied without its prepare record.
            live = self.engine.live_files(true)?;
        }

        let wal_files = self.engine.sorted_wal_files()?;
        let cut = SnapshotCutPoint {
            sequence_number,
            min_log_number_to_keep,
        };

        info!(dir = %target.display(), "creating checkpoint");
        let staging_dir = staging_path(&target, &self.options.staging_suffix);
        let mut staging = StagingDir::create(env, staging_dir)?;

        let populated = self.populate(staging.path(), &live, &wal_files, &cut);

        // Every referenced file is linked or copied (or we failed);
        // deletions may resume either way.
        if let Err(e) = gate.release() {
            warn!(error = %e, "failed to re-enable file deletions");
        }

        let (stats, state) = populated?;
        staging.install(&target)?;
        staging.sync()?;
        let path = staging.commit();

        info!(
            dir = %path.display(),
            sequence = sequence_number.as_u64(),
            linked = stats.linked,
            copied = stats.copied,
            "checkpoint done"
        );

        Ok(CheckpointReport {
            path,
            sequence_number,
            files_linked: stats.linked,
            files_copied: stats.copied,
            wal_files: stats.wal_files,
            same_filesystem: state.same_filesystem,
        })
    }
}
