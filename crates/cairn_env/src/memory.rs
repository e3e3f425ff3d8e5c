//! In-memory environment for testing.

use crate::env::{Directory, Env, SequentialFile, WritableFile};
use crate::error::{EnvError, EnvResult};
use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

type FileData = Arc<RwLock<Vec<u8>>>;

#[derive(Debug, Default)]
struct MemFs {
    files: HashMap<PathBuf, FileData>,
    dirs: BTreeSet<PathBuf>,
}

impl MemFs {
    fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(path) || self.dirs.contains(path)
    }

    fn parent_exists(&self, path: &Path) -> bool {
        match path.parent() {
            None => true,
            Some(p) if p.as_os_str().is_empty() || p == Path::new("/") => true,
            Some(p) => self.dirs.contains(p),
        }
    }

    fn has_children(&self, dir: &Path) -> bool {
        self.files.keys().any(|p| p.parent() == Some(dir))
            || self.dirs.iter().any(|p| p.parent() == Some(dir))
    }
}

/// An in-memory environment.
///
/// Files are shared byte buffers, so a hard link observes later appends
/// to its source exactly like a real link would. Suitable for:
/// - Unit tests
/// - Simulating filesystems without hard-link support
///
/// # Example
///
/// ```rust
/// use cairn_env::{Env, MemEnv};
/// use std::path::Path;
///
/// let env = MemEnv::new();
/// env.write_file(Path::new("/db/000001.sst"), b"table").unwrap();
/// env.link_file(Path::new("/db/000001.sst"), Path::new("/db/copy.sst")).unwrap();
/// assert_eq!(env.read_file(Path::new("/db/copy.sst")).unwrap(), b"table");
/// ```
#[derive(Debug)]
pub struct MemEnv {
    fs: RwLock<MemFs>,
    links_supported: AtomicBool,
}

impl Default for MemEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl MemEnv {
    /// Creates a new empty in-memory environment.
    #[must_use]
    pub fn new() -> Self {
        Self {
            fs: RwLock::new(MemFs::default()),
            links_supported: AtomicBool::new(true),
        }
    }

    /// Sets whether `link_file` succeeds or reports `NotSupported`.
    pub fn set_links_supported(&self, supported: bool) {
        self.links_supported.store(supported, Ordering::SeqCst);
    }

    /// Creates a directory and all missing parents.
    pub fn create_dir_all(&self, path: &Path) {
        let mut fs = self.fs.write();
        for ancestor in path.ancestors() {
            if ancestor.as_os_str().is_empty() || ancestor == Path::new("/") {
                break;
            }
            fs.dirs.insert(ancestor.to_path_buf());
        }
    }

    /// Writes a whole file, creating parent directories as needed.
    ///
    /// Replaces the contents of an existing file in place, so existing
    /// hard links see the new contents.
    ///
    /// # Errors
    ///
    /// Returns an error if `path` names a directory.
    pub fn write_file(&self, path: &Path, data: &[u8]) -> EnvResult<()> {
        if let Some(parent) = path.parent() {
            self.create_dir_all(parent);
        }
        let mut fs = self.fs.write();
        if fs.dirs.contains(path) {
            return Err(EnvError::AlreadyExists {
                path: path.to_path_buf(),
            });
        }
        if let Some(existing) = fs.files.get(path).cloned() {
            *existing.write() = data.to_vec();
        } else {
            fs.files
                .insert(path.to_path_buf(), Arc::new(RwLock::new(data.to_vec())));
        }
        Ok(())
    }

    /// Appends to an existing file, simulating a live writer.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the file does not exist.
    pub fn append_file(&self, path: &Path, data: &[u8]) -> EnvResult<()> {
        let fs = self.fs.read();
        let file = fs.files.get(path).ok_or_else(|| EnvError::NotFound {
            path: path.to_path_buf(),
        })?;
        file.write().extend_from_slice(data);
        Ok(())
    }

    /// Returns a copy of a file's contents.
    #[must_use]
    pub fn read_file(&self, path: &Path) -> Option<Vec<u8>> {
        self.fs.read().files.get(path).map(|f| f.read().clone())
    }

    /// Returns true if `a` and `b` are hard links to the same data.
    #[must_use]
    pub fn is_same_file(&self, a: &Path, b: &Path) -> bool {
        let fs = self.fs.read();
        match (fs.files.get(a), fs.files.get(b)) {
            (Some(x), Some(y)) => Arc::ptr_eq(x, y),
            _ => false,
        }
    }

    /// Returns true if a directory exists at `path`.
    #[must_use]
    pub fn is_dir(&self, path: &Path) -> bool {
        self.fs.read().dirs.contains(path)
    }
}

impl Env for MemEnv {
    fn file_exists(&self, path: &Path) -> EnvResult<bool> {
        Ok(self.fs.read().exists(path))
    }

    fn create_dir(&self, path: &Path) -> EnvResult<()> {
        let mut fs = self.fs.write();
        if fs.exists(path) {
            return Err(EnvError::AlreadyExists {
                path: path.to_path_buf(),
            });
        }
        if !fs.parent_exists(path) {
            return Err(EnvError::NotFound {
                path: path.to_path_buf(),
            });
        }
        fs.dirs.insert(path.to_path_buf());
        Ok(())
    }

    fn link_file(&self, src: &Path, dst: &Path) -> EnvResult<()> {
        if !self.links_supported.load(Ordering::SeqCst) {
            return Err(EnvError::not_supported(format!(
                "hard links disabled: {}",
                src.display()
            )));
        }
        let mut fs = self.fs.write();
        let data = fs.files.get(src).cloned().ok_or_else(|| EnvError::NotFound {
            path: src.to_path_buf(),
        })?;
        if fs.exists(dst) {
            return Err(EnvError::AlreadyExists {
                path: dst.to_path_buf(),
            });
        }
        if !fs.parent_exists(dst) {
            return Err(EnvError::NotFound {
                path: dst.to_path_buf(),
            });
        }
        fs.files.insert(dst.to_path_buf(), data);
        Ok(())
    }

    fn rename_file(&self, src: &Path, dst: &Path) -> EnvResult<()> {
        let mut fs = self.fs.write();
        if let Some(data) = fs.files.remove(src) {
            fs.files.insert(dst.to_path_buf(), data);
            return Ok(());
        }
        if !fs.dirs.contains(src) {
            return Err(EnvError::NotFound {
                path: src.to_path_buf(),
            });
        }
        if fs.exists(dst) {
            return Err(EnvError::AlreadyExists {
                path: dst.to_path_buf(),
            });
        }

        // Re-root everything below the renamed directory.
        let moved_dirs: Vec<PathBuf> = fs
            .dirs
            .iter()
            .filter(|p| p.starts_with(src))
            .cloned()
            .collect();
        for old in moved_dirs {
            fs.dirs.remove(&old);
            let rel = old.strip_prefix(src).unwrap_or(Path::new(""));
            fs.dirs.insert(dst.join(rel));
        }
        let moved_files: Vec<PathBuf> = fs
            .files
            .keys()
            .filter(|p| p.starts_with(src))
            .cloned()
            .collect();
        for old in moved_files {
            if let Some(data) = fs.files.remove(&old) {
                let rel = old.strip_prefix(src).unwrap_or(Path::new(""));
                fs.files.insert(dst.join(rel), data);
            }
        }
        Ok(())
    }

    fn get_children(&self, dir: &Path) -> EnvResult<Vec<String>> {
        let fs = self.fs.read();
        if !fs.dirs.contains(dir) {
            return Err(EnvError::NotFound {
                path: dir.to_path_buf(),
            });
        }
        let names = fs
            .files
            .keys()
            .chain(fs.dirs.iter())
            .filter(|p| p.parent() == Some(dir))
            .filter_map(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .collect();
        Ok(names)
    }

    fn delete_file(&self, path: &Path) -> EnvResult<()> {
        match self.fs.write().files.remove(path) {
            Some(_) => Ok(()),
            None => Err(EnvError::NotFound {
                path: path.to_path_buf(),
            }),
        }
    }

    fn delete_dir(&self, path: &Path) -> EnvResult<()> {
        let mut fs = self.fs.write();
        if !fs.dirs.contains(path) {
            return Err(EnvError::NotFound {
                path: path.to_path_buf(),
            });
        }
        if fs.has_children(path) {
            return Err(EnvError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("directory not empty: {}", path.display()),
            )));
        }
        fs.dirs.remove(path);
        Ok(())
    }

    fn get_file_size(&self, path: &Path) -> EnvResult<u64> {
        let fs = self.fs.read();
        let file = fs.files.get(path).ok_or_else(|| EnvError::NotFound {
            path: path.to_path_buf(),
        })?;
        let len = file.read().len() as u64;
        Ok(len)
    }

    fn new_sequential_file(&self, path: &Path) -> EnvResult<Box<dyn SequentialFile>> {
        let fs = self.fs.read();
        let data = fs.files.get(path).cloned().ok_or_else(|| EnvError::NotFound {
            path: path.to_path_buf(),
        })?;
        Ok(Box::new(MemSequentialFile { data, pos: 0 }))
    }

    fn new_writable_file(&self, path: &Path) -> EnvResult<Box<dyn WritableFile>> {
        let mut fs = self.fs.write();
        if fs.dirs.contains(path) {
            return Err(EnvError::AlreadyExists {
                path: path.to_path_buf(),
            });
        }
        if !fs.parent_exists(path) {
            return Err(EnvError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let data = fs
            .files
            .entry(path.to_path_buf())
            .or_insert_with(|| Arc::new(RwLock::new(Vec::new())))
            .clone();
        data.write().clear();
        Ok(Box::new(MemWritableFile { data }))
    }

    fn new_directory(&self, path: &Path) -> EnvResult<Box<dyn Directory>> {
        if !self.fs.read().dirs.contains(path) {
            return Err(EnvError::NotFound {
                path: path.to_path_buf(),
            });
        }
        Ok(Box::new(MemDirectory))
    }
}

struct MemSequentialFile {
    data: FileData,
    pos: usize,
}

impl SequentialFile for MemSequentialFile {
    fn read(&mut self, buf: &mut [u8]) -> EnvResult<usize> {
        let data = self.data.read();
        let available = data.len().saturating_sub(self.pos);
        let n = available.min(buf.len());
        buf[..n].copy_from_slice(&data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

struct MemWritableFile {
    data: FileData,
}

impl WritableFile for MemWritableFile {
    fn append(&mut self, data: &[u8]) -> EnvResult<()> {
        self.data.write().extend_from_slice(data);
        Ok(())
    }

    fn flush(&mut self) -> EnvResult<()> {
        Ok(())
    }

    fn sync(&mut self) -> EnvResult<()> {
        Ok(())
    }

    fn fsync(&mut self) -> EnvResult<()> {
        Ok(())
    }
}

struct MemDirectory;

impl Directory for MemDirectory {
    fn fsync(&mut self) -> EnvResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> &Path {
        Path::new(s)
    }

    #[test]
    fn create_dir_requires_parent() {
        let env = MemEnv::new();
        assert!(env.create_dir(p("/a/b")).unwrap_err().is_not_found());
        env.create_dir(p("/a")).unwrap();
        env.create_dir(p("/a/b")).unwrap();
        assert!(env.file_exists(p("/a/b")).unwrap());
    }

    #[test]
    fn link_shares_data() {
        let env = MemEnv::new();
        env.write_file(p("/db/1.sst"), b"abc").unwrap();
        env.link_file(p("/db/1.sst"), p("/db/2.sst")).unwrap();
        env.append_file(p("/db/1.sst"), b"def").unwrap();

        assert_eq!(env.read_file(p("/db/2.sst")).unwrap(), b"abcdef");
        assert!(env.is_same_file(p("/db/1.sst"), p("/db/2.sst")));
    }

    #[test]
    fn link_disabled_reports_not_supported() {
        let env = MemEnv::new();
        env.set_links_supported(false);
        env.write_file(p("/db/1.sst"), b"abc").unwrap();

        let err = env.link_file(p("/db/1.sst"), p("/db/2.sst")).unwrap_err();
        assert!(err.is_not_supported());
        assert!(!env.file_exists(p("/db/2.sst")).unwrap());
    }

    #[test]
    fn rename_directory_moves_children() {
        let env = MemEnv::new();
        env.write_file(p("/x/tmp/a"), b"1").unwrap();
        env.rename_file(p("/x/tmp"), p("/x/final")).unwrap();

        assert!(!env.file_exists(p("/x/tmp")).unwrap());
        assert!(env.is_dir(p("/x/final")));
        assert_eq!(env.read_file(p("/x/final/a")).unwrap(), b"1");
    }

    #[test]
    fn delete_dir_requires_empty() {
        let env = MemEnv::new();
        env.write_file(p("/d/f"), b"1").unwrap();
        assert!(env.delete_dir(p("/d")).is_err());

        env.delete_file(p("/d/f")).unwrap();
        env.delete_dir(p("/d")).unwrap();
        assert!(!env.file_exists(p("/d")).unwrap());
    }

    #[test]
    fn children_lists_direct_entries() {
        let env = MemEnv::new();
        env.write_file(p("/d/a"), b"").unwrap();
        env.write_file(p("/d/sub/b"), b"").unwrap();

        let mut children = env.get_children(p("/d")).unwrap();
        children.sort();
        assert_eq!(children, vec!["a".to_string(), "sub".to_string()]);
    }

    #[test]
    fn sequential_read_in_chunks() {
        let env = MemEnv::new();
        env.write_file(p("/f"), b"hello world").unwrap();
        let mut file = env.new_sequential_file(p("/f")).unwrap();

        let mut buf = [0u8; 5];
        assert_eq!(file.read(&mut buf).unwrap(), 5);
        assert_eq!(&buf, b"hello");
        assert_eq!(file.read(&mut buf).unwrap(), 5);
        assert_eq!(file.read(&mut buf).unwrap(), 1);
        assert_eq!(file.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn writable_file_truncates() {
        let env = MemEnv::new();
        env.write_file(p("/f"), b"old contents").unwrap();
        let mut file = env.new_writable_file(p("/f")).unwrap();
        file.append(b"new").unwrap();
        file.sync().unwrap();

        assert_eq!(env.read_file(p("/f")).unwrap(), b"new");
        assert_eq!(env.get_file_size(p("/f")).unwrap(), 3);
    }
}
