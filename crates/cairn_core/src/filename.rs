//! File naming scheme of a Cairn database directory.
//!
//! ```text
//! <db_path>/
//! ├─ CURRENT            # Names the active MANIFEST
//! ├─ MANIFEST-000005    # Descriptor: the set of live table files
//! ├─ OPTIONS-000007     # Options the engine was opened with
//! ├─ 000010.sst         # Immutable table (data) files
//! ├─ 000012.log         # Write-ahead log segments
//! ├─ LOCK               # Advisory lock
//! └─ LOG                # Info log
//! ```
//!
//! Numbers are zero-padded to six digits when generated; any width is
//! accepted when parsing.

use crate::error::{CoreError, CoreResult};

const CURRENT: &str = "CURRENT";
const LOCK: &str = "LOCK";
const IDENTITY: &str = "IDENTITY";
const INFO_LOG: &str = "LOG";
const INFO_LOG_OLD_PREFIX: &str = "LOG.old.";
const DESCRIPTOR_PREFIX: &str = "MANIFEST-";
const OPTIONS_PREFIX: &str = "OPTIONS-";

/// Every kind of file that can appear in a database directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileType {
    /// Write-ahead log segment (`000012.log`).
    Log,
    /// Advisory lock file (`LOCK`).
    Lock,
    /// Immutable table file (`000010.sst`, legacy `000010.ldb`).
    Table,
    /// Descriptor (manifest) file (`MANIFEST-000005`).
    Descriptor,
    /// Current-pointer file (`CURRENT`).
    Current,
    /// Temporary file (`000009.dbtmp`).
    Temp,
    /// Info log (`LOG`, `LOG.old.<n>`).
    InfoLog,
    /// Options file (`OPTIONS-000007`).
    Options,
    /// Database identity file (`IDENTITY`).
    Identity,
}

/// A successfully parsed file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedFileName {
    /// File number; zero for unnumbered files.
    pub number: u64,
    /// The kind of file.
    pub file_type: FileType,
}

fn parse_number(digits: &str) -> Option<u64> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Parses a file name, with or without a leading `/`.
///
/// Returns `None` for names outside the naming scheme.
#[must_use]
pub fn parse_file_name(name: &str) -> Option<ParsedFileName> {
    let name = name.strip_prefix('/').unwrap_or(name);
    let parsed = |number, file_type| Some(ParsedFileName { number, file_type });

    match name {
        CURRENT => return parsed(0, FileType::Current),
        LOCK => return parsed(0, FileType::Lock),
        IDENTITY => return parsed(0, FileType::Identity),
        INFO_LOG => return parsed(0, FileType::InfoLog),
        _ => {}
    }

    if let Some(rest) = name.strip_prefix(INFO_LOG_OLD_PREFIX) {
        return parsed(parse_number(rest)?, FileType::InfoLog);
    }
    if let Some(rest) = name.strip_prefix(DESCRIPTOR_PREFIX) {
        return parsed(parse_number(rest)?, FileType::Descriptor);
    }
    if let Some(rest) = name.strip_prefix(OPTIONS_PREFIX) {
        return parsed(parse_number(rest)?, FileType::Options);
    }

    let (stem, ext) = name.split_once('.')?;
    let number = parse_number(stem)?;
    let file_type = match ext {
        "sst" | "ldb" => FileType::Table,
        "log" => FileType::Log,
        "dbtmp" => FileType::Temp,
        _ => return None,
    };
    parsed(number, file_type)
}

/// The kinds of file an engine may report as live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LiveFileKind {
    /// Immutable data file; safe to hard-link.
    DataFile,
    /// Descriptor (manifest); copied up to its captured size.
    DescriptorFile,
    /// Current-pointer; regenerated, never transferred.
    CurrentFile,
    /// Options file; copied whole.
    OptionsFile,
}

impl LiveFileKind {
    /// Classifies a live-file name.
    ///
    /// # Errors
    ///
    /// Returns `Corruption` if the name cannot be parsed, or names a kind
    /// of file that is never part of the live set.
    pub fn classify(name: &str) -> CoreResult<Self> {
        let parsed = parse_file_name(name).ok_or_else(|| {
            CoreError::corruption(format!("can't parse file name: {name}"))
        })?;
        match parsed.file_type {
            FileType::Table => Ok(Self::DataFile),
            FileType::Descriptor => Ok(Self::DescriptorFile),
            FileType::Current => Ok(Self::CurrentFile),
            FileType::Options => Ok(Self::OptionsFile),
            other => Err(CoreError::corruption(format!(
                "unexpected live file {name} of type {other:?}"
            ))),
        }
    }
}

/// A classified entry of the engine's live-file set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveFileEntry {
    /// File name relative to the database directory.
    pub name: String,
    /// The classified kind.
    pub kind: LiveFileKind,
}

impl LiveFileEntry {
    /// Classifies `name`, stripping any leading `/`.
    ///
    /// # Errors
    ///
    /// Returns `Corruption` if the name cannot be classified.
    pub fn parse(name: &str) -> CoreResult<Self> {
        let kind = LiveFileKind::classify(name)?;
        Ok(Self {
            name: name.strip_prefix('/').unwrap_or(name).to_string(),
            kind,
        })
    }
}

/// Name of the current-pointer file.
#[must_use]
pub fn current_file_name() -> &'static str {
    CURRENT
}

/// Name of the lock file.
#[must_use]
pub fn lock_file_name() -> &'static str {
    LOCK
}

/// Name of descriptor file `number`.
#[must_use]
pub fn descriptor_file_name(number: u64) -> String {
    format!("{DESCRIPTOR_PREFIX}{number:06}")
}

/// Name of options file `number`.
#[must_use]
pub fn options_file_name(number: u64) -> String {
    format!("{OPTIONS_PREFIX}{number:06}")
}

/// Name of table file `number`.
#[must_use]
pub fn table_file_name(number: u64) -> String {
    format!("{number:06}.sst")
}

/// Name of log segment `number`.
#[must_use]
pub fn log_file_name(number: u64) -> String {
    format!("{number:06}.log")
}

/// Name of temporary file `number`.
#[must_use]
pub fn temp_file_name(number: u64) -> String {
    format!("{number:06}.dbtmp")
}

/// Contents of a current-pointer file naming `descriptor`.
#[must_use]
pub fn current_file_contents(descriptor: &str) -> String {
    let descriptor = descriptor.strip_prefix('/').unwrap_or(descriptor);
    format!("{descriptor}\n")
}
