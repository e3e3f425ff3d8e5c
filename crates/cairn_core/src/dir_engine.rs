//! Engine view of a database directory that no process has open.
//!
//! Lets tools checkpoint a database while it is shut down. The directory
//! is locked for the engine's lifetime, so the live-file set cannot change
//! underneath a checkpoint.
//!
//! Without a running engine there is no memtable and no decoded log
//! state: the latest sequence number is reported as zero, which makes
//! every alive log segment part of the checkpoint.

use crate::engine::{Engine, LiveFiles, WalFileType, WalSegment};
use crate::error::{CoreError, CoreResult};
use crate::filename::{current_file_name, lock_file_name, parse_file_name, FileType};
use crate::gate::FileDeletionGate;
use crate::types::{LogNumber, SequenceNumber};
use cairn_env::{Env, PosixEnv};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Subdirectory of the WAL directory holding archived segments.
const ARCHIVE_DIR: &str = "archive";

/// A closed database directory exposed through [`Engine`].
///
/// # Example
///
/// ```rust,ignore
/// use cairn_core::{checkpoint, CheckpointOptions, DirectoryEngine};
///
/// let engine = DirectoryEngine::open(Path::new("my_db"), None)?;
/// checkpoint::open(&engine, CheckpointOptions::default())
///     .create_checkpoint(Path::new("my_db.snap"))?;
/// ```
#[derive(Debug)]
pub struct DirectoryEngine {
    env: PosixEnv,
    db_path: PathBuf,
    wal_dir: PathBuf,
    gate: FileDeletionGate,
    /// Held for exclusive access.
    _lock_file: File,
}

impl DirectoryEngine {
    /// Opens and locks the database at `db_path`.
    ///
    /// Log segments are read from `wal_dir`, or from `db_path` if `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `db_path` is not a directory (`InvalidArgument`)
    /// - another process holds the lock (`DatabaseLocked`)
    /// - I/O errors occur
    pub fn open(db_path: &Path, wal_dir: Option<&Path>) -> CoreResult<Self> {
        if !db_path.is_dir() {
            return Err(CoreError::invalid_argument(format!(
                "database directory does not exist: {}",
                db_path.display()
            )));
        }

        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(db_path.join(lock_file_name()))?;
        if lock_file.try_lock_exclusive().is_err() {
            return Err(CoreError::DatabaseLocked);
        }

        Ok(Self {
            env: PosixEnv::new(),
            db_path: db_path.to_path_buf(),
            wal_dir: wal_dir.unwrap_or(db_path).to_path_buf(),
            gate: FileDeletionGate::new(),
            _lock_file: lock_file,
        })
    }

    /// Returns the deletion gate.
    #[must_use]
    pub fn deletion_gate(&self) -> &FileDeletionGate {
        &self.gate
    }

    /// Reads the descriptor name from the current-pointer file.
    ///
    /// # Errors
    ///
    /// Returns `Corruption` if the file is empty or does not name a
    /// descriptor.
    pub fn current_manifest(&self) -> CoreResult<String> {
        let contents = std::fs::read_to_string(self.db_path.join(current_file_name()))?;
        let name = contents.trim_end_matches('\n').trim_end_matches('\r');
        match parse_file_name(name) {
            Some(parsed) if parsed.file_type == FileType::Descriptor => Ok(name.to_string()),
            _ => Err(CoreError::corruption(format!(
                "CURRENT does not name a descriptor: {name:?}"
            ))),
        }
    }

    fn list_logs(
        &self,
        dir: &Path,
        prefix: Option<&str>,
        file_type: WalFileType,
    ) -> CoreResult<Vec<WalSegment>> {
        let mut segments = Vec::new();
        for name in self.env.get_children(dir)? {
            let Some(parsed) = parse_file_name(&name) else {
                continue;
            };
            if parsed.file_type != FileType::Log {
                continue;
            }
            let size_bytes = self.env.get_file_size(&dir.join(&name))?;
            let path_name = match prefix {
                Some(prefix) => format!("{prefix}/{name}"),
                None => name,
            };
            segments.push(WalSegment {
                log_number: LogNumber::new(parsed.number),
                start_sequence: SequenceNumber::default(),
                size_bytes,
                file_type,
                path_name,
            });
        }
        Ok(segments)
    }
}

impl Engine for DirectoryEngine {
    fn env(&self) -> &dyn Env {
        &self.env
    }

    fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn wal_dir(&self) -> &Path {
        &self.wal_dir
    }

    fn two_phase_commit(&self) -> bool {
        false
    }

    fn live_files(&self, _flush: bool) -> CoreResult<LiveFiles> {
        let manifest = self.current_manifest()?;
        let manifest_size = self.env.get_file_size(&self.db_path.join(&manifest))?;

        let mut tables = Vec::new();
        let mut options: Option<(u64, String)> = None;
        for name in self.env.get_children(&self.db_path)? {
            let Some(parsed) = parse_file_name(&name) else {
                continue;
            };
            match parsed.file_type {
                FileType::Table => tables.push((parsed.number, name)),
                FileType::Options if options.as_ref().map_or(true, |(n, _)| parsed.number > *n) => {
                    options = Some((parsed.number, name));
                }
                _ => {}
            }
        }
        tables.sort();

        let mut files = vec![current_file_name().to_string(), manifest];
        files.extend(tables.into_iter().map(|(_, name)| name));
        files.extend(options.map(|(_, name)| name));
        debug!(count = files.len(), manifest_size, "listed live files");

        Ok(LiveFiles {
            files,
            manifest_size,
        })
    }

    fn latest_sequence_number(&self) -> SequenceNumber {
        SequenceNumber::default()
    }

    fn disable_file_deletions(&self) -> CoreResult<()> {
        self.gate.disable();
        Ok(())
    }

    fn enable_file_deletions(&self, force: bool) -> CoreResult<()> {
        self.gate.enable(force);
        Ok(())
    }

    fn min_log_number_to_keep(&self) -> Option<LogNumber> {
        None
    }

    fn sorted_wal_files(&self) -> CoreResult<Vec<WalSegment>> {
        let mut segments = self.list_logs(&self.wal_dir, None, WalFileType::Alive)?;
        let archive = self.wal_dir.join(ARCHIVE_DIR);
        if archive.is_dir() {
            segments.extend(self.list_logs(&archive, Some(ARCHIVE_DIR), WalFileType::Archived)?);
        }
        segments.sort_by_key(|s| (s.log_number, s.file_type == WalFileType::Alive));
        Ok(segments)
    }
}
