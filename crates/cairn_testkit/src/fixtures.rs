//! Database directory fixtures.
//!
//! Provides ready-made database layouts, written either into a [`MemEnv`]
//! or onto disk in a temporary directory, plus the engine listings that
//! describe them.

use crate::engine::ScriptedEngine;
use cairn_core::filename::{
    current_file_contents, current_file_name, descriptor_file_name, log_file_name,
    options_file_name, table_file_name,
};
use cairn_core::{LiveFiles, LogNumber, SequenceNumber, WalFileType, WalSegment};
use cairn_env::{Env, MemEnv};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// One log segment of a fixture.
#[derive(Debug, Clone)]
pub struct WalFixture {
    /// Log number.
    pub number: u64,
    /// Sequence number of the first record.
    pub start_sequence: u64,
    /// Segment contents.
    pub data: Vec<u8>,
    /// Alive or archived.
    pub file_type: WalFileType,
}

/// Files making up a database directory.
#[derive(Debug, Clone)]
pub struct DbLayout {
    /// Descriptor file number.
    pub manifest_number: u64,
    /// Descriptor contents.
    pub manifest: Vec<u8>,
    /// Table files by number.
    pub tables: Vec<(u64, Vec<u8>)>,
    /// Options file number.
    pub options_number: u64,
    /// Options file contents.
    pub options: Vec<u8>,
    /// Log segments in ascending log number.
    pub wal: Vec<WalFixture>,
}

impl Default for DbLayout {
    /// Three tables, a 1000-byte descriptor and two alive log segments.
    fn default() -> Self {
        Self {
            manifest_number: 5,
            manifest: patterned(1000, 5),
            tables: vec![
                (10, patterned(4096, 10)),
                (11, patterned(8000, 11)),
                (13, patterned(100, 13)),
            ],
            options_number: 7,
            options: b"[DBOptions]\n  create_if_missing=true\n".to_vec(),
            wal: vec![
                WalFixture {
                    number: 12,
                    start_sequence: 100,
                    data: patterned(300, 12),
                    file_type: WalFileType::Alive,
                },
                WalFixture {
                    number: 14,
                    start_sequence: 180,
                    data: patterned(120, 14),
                    file_type: WalFileType::Alive,
                },
            ],
        }
    }
}

/// Deterministic filler bytes.
#[must_use]
pub fn patterned(len: usize, seed: u64) -> Vec<u8> {
    (0..len)
        .map(|i| ((i as u64).wrapping_mul(31).wrapping_add(seed) % 251) as u8)
        .collect()
}

impl DbLayout {
    /// Name of the descriptor file.
    #[must_use]
    pub fn manifest_name(&self) -> String {
        descriptor_file_name(self.manifest_number)
    }

    /// Every file of the layout with its contents, logs included.
    #[must_use]
    pub fn files(&self) -> Vec<(String, Vec<u8>)> {
        let mut files = vec![
            (
                current_file_name().to_string(),
                current_file_contents(&self.manifest_name()).into_bytes(),
            ),
            (self.manifest_name(), self.manifest.clone()),
        ];
        files.extend(
            self.tables
                .iter()
                .map(|(n, data)| (table_file_name(*n), data.clone())),
        );
        files.push((options_file_name(self.options_number), self.options.clone()));
        files.extend(self.wal.iter().map(|w| (Self::wal_path(w), w.data.clone())));
        files
    }

    fn wal_path(wal: &WalFixture) -> String {
        match wal.file_type {
            WalFileType::Alive => log_file_name(wal.number),
            WalFileType::Archived => format!("archive/{}", log_file_name(wal.number)),
        }
    }

    /// Writes the layout under `dir` in `env`.
    ///
    /// # Errors
    ///
    /// Returns any environment error.
    pub fn write_to(&self, env: &MemEnv, dir: &Path) -> cairn_env::EnvResult<()> {
        env.create_dir_all(dir);
        for (name, data) in self.files() {
            env.write_file(&dir.join(name), &data)?;
        }
        Ok(())
    }

    /// Writes the layout under `dir` on disk.
    ///
    /// # Errors
    ///
    /// Returns any I/O error.
    pub fn write_to_disk(&self, dir: &Path) -> io::Result<()> {
        fs::create_dir_all(dir)?;
        for (name, data) in self.files() {
            let path = dir.join(name);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, data)?;
        }
        Ok(())
    }

    /// The listing a live engine would give for this layout.
    #[must_use]
    pub fn live_files(&self) -> LiveFiles {
        self.files()
            .into_iter()
            .filter(|(name, _)| !name.ends_with(".log"))
            .fold(
                LiveFiles {
                    files: Vec::new(),
                    manifest_size: self.manifest.len() as u64,
                },
                |mut live, (name, _)| {
                    live.files.push(name);
                    live
                },
            )
    }

    /// The log listing a live engine would give for this layout.
    #[must_use]
    pub fn wal_segments(&self) -> Vec<WalSegment> {
        self.wal
            .iter()
            .map(|w| WalSegment {
                log_number: LogNumber::new(w.number),
                start_sequence: SequenceNumber::new(w.start_sequence),
                size_bytes: w.data.len() as u64,
                file_type: w.file_type,
                path_name: Self::wal_path(w),
            })
            .collect()
    }

    /// Builds a scripted engine over this layout, written under `dir`.
    ///
    /// # Errors
    ///
    /// Returns any error from writing the layout.
    pub fn scripted_engine<E: Env>(
        &self,
        env: Arc<E>,
        mem: &MemEnv,
        dir: &Path,
    ) -> cairn_env::EnvResult<ScriptedEngine<E>> {
        self.write_to(mem, dir)?;
        let engine = ScriptedEngine::new(env, dir);
        engine.set_live_files(self.live_files());
        engine.set_wal_files(self.wal_segments());
        Ok(engine)
    }
}

/// A database directory on disk with automatic cleanup.
pub struct TempDb {
    /// Path to the database directory.
    pub path: PathBuf,
    /// The layout written there.
    pub layout: DbLayout,
    /// The temporary root (kept alive to prevent cleanup).
    temp_dir: TempDir,
}

impl TempDb {
    /// Writes `layout` into a fresh temporary directory.
    pub fn new(layout: DbLayout) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("db");
        layout
            .write_to_disk(&path)
            .expect("Failed to write database layout");
        Self {
            path,
            layout,
            temp_dir,
        }
    }

    /// Returns a path inside the temporary root, outside the database.
    pub fn sibling(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }
}
