//! Environment trait definitions.

use crate::error::EnvResult;
use std::path::Path;

/// A file opened for sequential reading.
pub trait SequentialFile: Send {
    /// Reads up to `buf.len()` bytes into `buf`.
    ///
    /// Returns the number of bytes read. Zero means end of file.
    ///
    /// # Errors
    ///
    /// Returns an error if an I/O error occurs.
    fn read(&mut self, buf: &mut [u8]) -> EnvResult<usize>;
}

/// A file opened for appending.
///
/// Mirrors the append/flush/sync contract of the engine's own log writers.
pub trait WritableFile: Send {
    /// Appends data to the end of the file.
    ///
    /// # Errors
    ///
    /// Returns an error if an I/O error occurs.
    fn append(&mut self, data: &[u8]) -> EnvResult<()>;

    /// Pushes buffered data to the operating system.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush fails.
    fn flush(&mut self) -> EnvResult<()>;

    /// Syncs file data to durable storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the sync fails.
    fn sync(&mut self) -> EnvResult<()>;

    /// Syncs file data and metadata to durable storage.
    ///
    /// This is a stronger guarantee than [`WritableFile::sync`].
    ///
    /// # Errors
    ///
    /// Returns an error if the sync fails.
    fn fsync(&mut self) -> EnvResult<()>;
}

/// An open directory handle.
pub trait Directory: Send {
    /// Syncs the directory entries to durable storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the sync fails.
    fn fsync(&mut self) -> EnvResult<()>;
}

/// The filesystem operations a checkpoint needs.
///
/// An `Env` knows nothing about engine file formats. It creates, links,
/// copies and removes opaque files and directories.
///
/// # Implementors
///
/// - [`super::PosixEnv`] - For the local filesystem
/// - [`super::MemEnv`] - For testing
pub trait Env: Send + Sync {
    /// Probes whether `path` exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the probe fails for a reason other than the
    /// path being absent.
    fn file_exists(&self, path: &Path) -> EnvResult<bool>;

    /// Creates a single directory. The parent must exist.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyExists` if the path exists, or an I/O error.
    fn create_dir(&self, path: &Path) -> EnvResult<()>;

    /// Creates a hard link `dst` pointing at `src`.
    ///
    /// # Errors
    ///
    /// Returns `NotSupported` if the filesystem cannot link these paths
    /// (for example across devices), or an I/O error.
    fn link_file(&self, src: &Path, dst: &Path) -> EnvResult<()>;

    /// Renames `src` to `dst`.
    ///
    /// # Errors
    ///
    /// Returns an error if the rename fails.
    fn rename_file(&self, src: &Path, dst: &Path) -> EnvResult<()>;

    /// Returns the names of the entries in `dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be listed.
    fn get_children(&self, dir: &Path) -> EnvResult<Vec<String>>;

    /// Deletes a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be removed.
    fn delete_file(&self, path: &Path) -> EnvResult<()>;

    /// Deletes an empty directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be removed.
    fn delete_dir(&self, path: &Path) -> EnvResult<()>;

    /// Returns the size of a file in bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be inspected.
    fn get_file_size(&self, path: &Path) -> EnvResult<u64>;

    /// Opens a file for sequential reading.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    fn new_sequential_file(&self, path: &Path) -> EnvResult<Box<dyn SequentialFile>>;

    /// Creates (or truncates) a file for writing.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created.
    fn new_writable_file(&self, path: &Path) -> EnvResult<Box<dyn WritableFile>>;

    /// Opens a directory so it can be synced.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be opened.
    fn new_directory(&self, path: &Path) -> EnvResult<Box<dyn Directory>>;
}
