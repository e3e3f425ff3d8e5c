//! Environment backed by the local filesystem.

use crate::env::{Directory, Env, SequentialFile, WritableFile};
use crate::error::{EnvError, EnvResult};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

/// OS error code for a link across filesystems.
#[cfg(unix)]
const CROSS_DEVICE_LINK: i32 = 18; // EXDEV
#[cfg(windows)]
const CROSS_DEVICE_LINK: i32 = 17; // ERROR_NOT_SAME_DEVICE
#[cfg(not(any(unix, windows)))]
const CROSS_DEVICE_LINK: i32 = -1;

/// An environment using OS file APIs.
///
/// # Durability
///
/// - `WritableFile::sync()` calls `File::sync_data()`
/// - `WritableFile::fsync()` calls `File::sync_all()`
/// - `Directory::fsync()` syncs the directory entries on Unix; it is a
///   no-op elsewhere, where the filesystem journal covers metadata
///
/// # Example
///
/// ```no_run
/// use cairn_env::{Env, PosixEnv};
/// use std::path::Path;
///
/// let env = PosixEnv::new();
/// assert!(!env.file_exists(Path::new("/no/such/dir")).unwrap());
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct PosixEnv;

impl PosixEnv {
    /// Creates a new POSIX environment.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

fn not_found_or_io(path: &Path, err: io::Error) -> EnvError {
    if err.kind() == io::ErrorKind::NotFound {
        EnvError::NotFound {
            path: path.to_path_buf(),
        }
    } else {
        EnvError::Io(err)
    }
}

impl Env for PosixEnv {
    fn file_exists(&self, path: &Path) -> EnvResult<bool> {
        match fs::metadata(path) {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(EnvError::Io(e)),
        }
    }

    fn create_dir(&self, path: &Path) -> EnvResult<()> {
        fs::create_dir(path).map_err(|e| {
            if e.kind() == io::ErrorKind::AlreadyExists {
                EnvError::AlreadyExists {
                    path: path.to_path_buf(),
                }
            } else {
                not_found_or_io(path, e)
            }
        })
    }

    fn link_file(&self, src: &Path, dst: &Path) -> EnvResult<()> {
        fs::hard_link(src, dst).map_err(|e| {
            if e.raw_os_error() == Some(CROSS_DEVICE_LINK) || e.kind() == io::ErrorKind::Unsupported
            {
                EnvError::not_supported(format!(
                    "cannot link {} to {}: {e}",
                    src.display(),
                    dst.display()
                ))
            } else {
                not_found_or_io(src, e)
            }
        })
    }

    fn rename_file(&self, src: &Path, dst: &Path) -> EnvResult<()> {
        fs::rename(src, dst).map_err(|e| not_found_or_io(src, e))
    }

    fn get_children(&self, dir: &Path) -> EnvResult<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(dir).map_err(|e| not_found_or_io(dir, e))? {
            let entry = entry?;
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        Ok(names)
    }

    fn delete_file(&self, path: &Path) -> EnvResult<()> {
        fs::remove_file(path).map_err(|e| not_found_or_io(path, e))
    }

    fn delete_dir(&self, path: &Path) -> EnvResult<()> {
        fs::remove_dir(path).map_err(|e| not_found_or_io(path, e))
    }

    fn get_file_size(&self, path: &Path) -> EnvResult<u64> {
        let metadata = fs::metadata(path).map_err(|e| not_found_or_io(path, e))?;
        Ok(metadata.len())
    }

    fn new_sequential_file(&self, path: &Path) -> EnvResult<Box<dyn SequentialFile>> {
        let file = File::open(path).map_err(|e| not_found_or_io(path, e))?;
        Ok(Box::new(PosixSequentialFile { file }))
    }

    fn new_writable_file(&self, path: &Path) -> EnvResult<Box<dyn WritableFile>> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|e| not_found_or_io(path, e))?;
        Ok(Box::new(PosixWritableFile {
            writer: BufWriter::new(file),
        }))
    }

    fn new_directory(&self, path: &Path) -> EnvResult<Box<dyn Directory>> {
        if !path.is_dir() {
            return Err(EnvError::NotFound {
                path: path.to_path_buf(),
            });
        }
        Ok(Box::new(PosixDirectory {
            path: path.to_path_buf(),
        }))
    }
}

struct PosixSequentialFile {
    file: File,
}

impl SequentialFile for PosixSequentialFile {
    fn read(&mut self, buf: &mut [u8]) -> EnvResult<usize> {
        loop {
            match self.file.read(buf) {
                Ok(n) => return Ok(n),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(EnvError::Io(e)),
            }
        }
    }
}

struct PosixWritableFile {
    writer: BufWriter<File>,
}

impl WritableFile for PosixWritableFile {
    fn append(&mut self, data: &[u8]) -> EnvResult<()> {
        self.writer.write_all(data)?;
        Ok(())
    }

    fn flush(&mut self) -> EnvResult<()> {
        self.writer.flush()?;
        Ok(())
    }

    fn sync(&mut self) -> EnvResult<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_data()?;
        Ok(())
    }

    fn fsync(&mut self) -> EnvResult<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_all()?;
        Ok(())
    }
}

struct PosixDirectory {
    path: PathBuf,
}

impl Directory for PosixDirectory {
    #[cfg(unix)]
    fn fsync(&mut self) -> EnvResult<()> {
        // fsync on a directory handle persists its entries
        let dir = File::open(&self.path)?;
        dir.sync_all()?;
        Ok(())
    }

    #[cfg(not(unix))]
    fn fsync(&mut self) -> EnvResult<()> {
        let _ = &self.path;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn exists_probe() {
        let dir = tempdir().unwrap();
        let env = PosixEnv::new();

        assert!(env.file_exists(dir.path()).unwrap());
        assert!(!env.file_exists(&dir.path().join("missing")).unwrap());
    }

    #[test]
    fn create_dir_twice_fails() {
        let dir = tempdir().unwrap();
        let env = PosixEnv::new();
        let path = dir.path().join("sub");

        env.create_dir(&path).unwrap();
        let result = env.create_dir(&path);
        assert!(matches!(result, Err(EnvError::AlreadyExists { .. })));
    }

    #[test]
    fn write_then_read() {
        let dir = tempdir().unwrap();
        let env = PosixEnv::new();
        let path = dir.path().join("data.bin");

        let mut file = env.new_writable_file(&path).unwrap();
        file.append(b"hello ").unwrap();
        file.append(b"world").unwrap();
        file.fsync().unwrap();
        drop(file);

        assert_eq!(env.get_file_size(&path).unwrap(), 11);

        let mut reader = env.new_sequential_file(&path).unwrap();
        let mut buf = [0u8; 32];
        let n = reader.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"hello world");
    }

    #[test]
    fn hard_link_shares_inode() {
        let dir = tempdir().unwrap();
        let env = PosixEnv::new();
        let src = dir.path().join("a.sst");
        let dst = dir.path().join("b.sst");
        fs::write(&src, b"table").unwrap();

        env.link_file(&src, &dst).unwrap();
        assert_eq!(fs::read(&dst).unwrap(), b"table");

        #[cfg(unix)]
        {
            use std::os::unix::fs::MetadataExt;
            let a = fs::metadata(&src).unwrap();
            let b = fs::metadata(&dst).unwrap();
            assert_eq!(a.ino(), b.ino());
        }
    }

    #[test]
    fn link_missing_source_is_not_found() {
        let dir = tempdir().unwrap();
        let env = PosixEnv::new();

        let result = env.link_file(&dir.path().join("nope"), &dir.path().join("x"));
        assert!(result.unwrap_err().is_not_found());
    }

    #[test]
    fn children_and_delete() {
        let dir = tempdir().unwrap();
        let env = PosixEnv::new();
        let sub = dir.path().join("sub");
        env.create_dir(&sub).unwrap();
        fs::write(sub.join("one"), b"1").unwrap();
        fs::write(sub.join("two"), b"2").unwrap();

        let mut children = env.get_children(&sub).unwrap();
        children.sort();
        assert_eq!(children, vec!["one".to_string(), "two".to_string()]);

        for child in children {
            env.delete_file(&sub.join(child)).unwrap();
        }
        env.delete_dir(&sub).unwrap();
        assert!(!sub.exists());
    }

    #[test]
    fn rename_and_sync_directory() {
        let dir = tempdir().unwrap();
        let env = PosixEnv::new();
        let from = dir.path().join("from");
        let to = dir.path().join("to");
        env.create_dir(&from).unwrap();

        env.rename_file(&from, &to).unwrap();
        assert!(to.is_dir());
        env.new_directory(&to).unwrap().fsync().unwrap();
    }

    #[test]
    fn open_missing_directory_fails() {
        let dir = tempdir().unwrap();
        let env = PosixEnv::new();
        assert!(env.new_directory(&dir.path().join("missing")).is_err());
    }
}
