//! Checkpoint command implementation.

use super::{format_size, OutputFormat};
use cairn_core::{checkpoint, CheckpointOptions, CheckpointReport, DirectoryEngine};
use serde::Serialize;
use std::path::Path;
use tracing::info;

/// Checkpoint command result.
#[derive(Debug, Serialize)]
pub struct CheckpointResult {
    /// Source database path.
    pub source: String,
    /// Installed checkpoint path.
    pub path: String,
    /// Sequence number the checkpoint is cut at.
    pub sequence_number: u64,
    /// Files hard-linked.
    pub files_linked: usize,
    /// Files copied.
    pub files_copied: usize,
    /// Log segments included.
    pub wal_files: usize,
    /// Whether hard links were usable.
    pub same_filesystem: bool,
    /// Total size of the checkpoint directory in bytes.
    pub total_size: u64,
}

impl CheckpointResult {
    fn new(source: &Path, report: &CheckpointReport) -> std::io::Result<Self> {
        let mut total_size = 0;
        for entry in std::fs::read_dir(&report.path)? {
            total_size += entry?.metadata()?.len();
        }
        Ok(Self {
            source: source.display().to_string(),
            path: report.path.display().to_string(),
            sequence_number: report.sequence_number.as_u64(),
            files_linked: report.files_linked,
            files_copied: report.files_copied,
            wal_files: report.wal_files,
            same_filesystem: report.same_filesystem,
            total_size,
        })
    }
}

/// Runs the checkpoint command.
pub fn run(
    path: &Path,
    wal_dir: Option<&Path>,
    target: &Path,
    use_fsync: bool,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    info!("Creating checkpoint of {:?} at {:?}", path, target);
    let engine = DirectoryEngine::open(path, wal_dir)?;
    let options = CheckpointOptions::new().use_fsync(use_fsync);
    let report = checkpoint::open(&engine, options).create_checkpoint(target)?;
    let result = CheckpointResult::new(path, &report)?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        OutputFormat::Text => print_text_output(&result),
    }
    Ok(())
}

fn print_text_output(result: &CheckpointResult) {
    println!("Cairn Checkpoint");
    println!("================");
    println!();
    println!("Source:     {}", result.source);
    println!("Checkpoint: {}", result.path);
    println!("Sequence:   {}", result.sequence_number);
    println!();
    println!("Files:");
    println!("  Linked:    {}", result.files_linked);
    println!("  Copied:    {}", result.files_copied);
    println!("  Log files: {}", result.wal_files);
    if !result.same_filesystem {
        println!("  (hard links unavailable, all files copied)");
    }
    println!();
    println!("Total size: {}", format_size(result.total_size));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn result_from_checkpoint() {
        let temp = tempdir().unwrap();
        let db = temp.path().join("db");
        fs::create_dir(&db).unwrap();
        fs::write(db.join("CURRENT"), b"MANIFEST-000002\n").unwrap();
        fs::write(db.join("MANIFEST-000002"), [7u8; 64]).unwrap();
        fs::write(db.join("000003.sst"), b"table").unwrap();
        fs::write(db.join("000004.log"), b"log").unwrap();

        let target = temp.path().join("snap");
        run(&db, None, &target, false, OutputFormat::Json).unwrap();

        assert_eq!(fs::read(target.join("CURRENT")).unwrap(), b"MANIFEST-000002\n");
        assert_eq!(fs::read(target.join("000004.log")).unwrap(), b"log");
    }

    #[test]
    fn refuses_existing_target() {
        let temp = tempdir().unwrap();
        let db = temp.path().join("db");
        fs::create_dir(&db).unwrap();
        fs::write(db.join("CURRENT"), b"MANIFEST-000002\n").unwrap();
        fs::write(db.join("MANIFEST-000002"), b"m").unwrap();

        let result = run(&db, None, temp.path(), false, OutputFormat::Text);
        assert!(result.is_err());
    }
}
