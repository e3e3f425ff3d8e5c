//! Inspect command implementation.

use super::{format_size, OutputFormat};
use cairn_core::filename::{current_file_name, parse_file_name, FileType};
use cairn_env::{Env, PosixEnv};
use serde::Serialize;
use std::path::Path;
use tracing::info;

/// Directory inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Inspected directory.
    pub path: String,
    /// Descriptor named by CURRENT, if readable.
    pub current_descriptor: Option<String>,
    /// Whether that descriptor exists in the directory.
    pub descriptor_present: bool,
    /// Every entry, sorted by name.
    pub files: Vec<FileInfo>,
    /// Total size in bytes.
    pub total_size: u64,
}

/// One directory entry.
#[derive(Debug, Serialize)]
pub struct FileInfo {
    /// File name.
    pub name: String,
    /// Kind of engine file, or `unknown`.
    pub kind: &'static str,
    /// File number, where the name carries one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number: Option<u64>,
    /// Size in bytes.
    pub size: u64,
}

fn kind_name(file_type: FileType) -> &'static str {
    match file_type {
        FileType::Log => "log",
        FileType::Lock => "lock",
        FileType::Table => "table",
        FileType::Descriptor => "descriptor",
        FileType::Current => "current",
        FileType::Temp => "temp",
        FileType::InfoLog => "info-log",
        FileType::Options => "options",
        FileType::Identity => "identity",
    }
}

/// Collects the inspection result for `path`.
pub fn inspect(path: &Path) -> Result<InspectResult, Box<dyn std::error::Error>> {
    let env = PosixEnv::new();
    if !env.file_exists(path)? {
        return Err(format!("No database found at {:?}", path).into());
    }

    let mut names = env.get_children(path)?;
    names.sort();

    let mut files = Vec::with_capacity(names.len());
    for name in names {
        let size = env.get_file_size(&path.join(&name))?;
        let parsed = parse_file_name(&name);
        files.push(FileInfo {
            kind: parsed.map_or("unknown", |p| kind_name(p.file_type)),
            number: parsed
                .filter(|p| p.file_type != FileType::Current && p.file_type != FileType::Lock)
                .map(|p| p.number),
            name,
            size,
        });
    }

    let current_descriptor = std::fs::read_to_string(path.join(current_file_name()))
        .ok()
        .map(|contents| contents.trim_end().to_string());
    let descriptor_present = current_descriptor
        .as_ref()
        .is_some_and(|name| files.iter().any(|f| &f.name == name));

    Ok(InspectResult {
        path: path.display().to_string(),
        current_descriptor,
        descriptor_present,
        total_size: files.iter().map(|f| f.size).sum(),
        files,
    })
}

/// Runs the inspect command.
pub fn run(path: &Path, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    info!("Inspecting {:?}", path);
    let result = inspect(path)?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        OutputFormat::Text => print_text_output(&result),
    }
    Ok(())
}

fn print_text_output(result: &InspectResult) {
    println!("Cairn Directory Inspection");
    println!("==========================");
    println!();
    println!("Path: {}", result.path);
    match &result.current_descriptor {
        Some(name) if result.descriptor_present => println!("CURRENT -> {}", name),
        Some(name) => println!("CURRENT -> {} (missing)", name),
        None => println!("CURRENT: not found"),
    }
    println!();
    println!("Files:");
    for file in &result.files {
        println!("  {:<20} {:<11} {:>10}", file.name, file.kind, format_size(file.size));
    }
    println!();
    println!("Total size: {}", format_size(result.total_size));
}
