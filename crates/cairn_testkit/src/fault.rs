//! Fault injection for checkpoint testing.
//!
//! [`FaultInjectionEnv`] wraps another environment and fails chosen
//! operations so tests can drive a checkpoint into every failure path:
//!
//! 1. **Failing the N-th mutating operation** - directory creation, link,
//!    file creation, append, sync, rename or directory sync
//! 2. **Crashing mid-write** - a partial append after N bytes
//! 3. **Rejecting hard links** - as a filesystem without link support would
//! 4. **Failing cleanup** - deletes fail, to check the original error wins
//!
//! ## Usage
//!
//! ```rust,ignore
//! use cairn_testkit::fault::FaultInjectionEnv;
//!
//! let env = FaultInjectionEnv::new(MemEnv::new());
//! env.fail_operation_at(3);
//! ```

use cairn_env::{Directory, Env, EnvError, EnvResult, SequentialFile, WritableFile};
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

const NEVER: usize = usize::MAX;

#[derive(Debug)]
struct FaultState {
    fail_at: AtomicUsize,
    mutating_ops: AtomicUsize,
    crash_after_bytes: AtomicUsize,
    bytes_written: AtomicUsize,
    reject_links: AtomicUsize,
    fail_exists: AtomicBool,
    fail_rename: AtomicBool,
    fail_dir_fsync: AtomicBool,
    fail_deletes: AtomicBool,
    link_attempts: AtomicUsize,
    links_created: AtomicUsize,
    files_created: AtomicUsize,
    injected: AtomicUsize,
}

impl Default for FaultState {
    fn default() -> Self {
        Self {
            fail_at: AtomicUsize::new(NEVER),
            mutating_ops: AtomicUsize::new(0),
            crash_after_bytes: AtomicUsize::new(NEVER),
            bytes_written: AtomicUsize::new(0),
            reject_links: AtomicUsize::new(0),
            fail_exists: AtomicBool::new(false),
            fail_rename: AtomicBool::new(false),
            fail_dir_fsync: AtomicBool::new(false),
            fail_deletes: AtomicBool::new(false),
            link_attempts: AtomicUsize::new(0),
            links_created: AtomicUsize::new(0),
            files_created: AtomicUsize::new(0),
            injected: AtomicUsize::new(0),
        }
    }
}

impl FaultState {
    /// Counts one mutating operation and fails it if it is the chosen one.
    fn tick(&self, what: &str) -> EnvResult<()> {
        let op = self.mutating_ops.fetch_add(1, Ordering::SeqCst);
        if op == self.fail_at.load(Ordering::SeqCst) {
            return Err(self.inject(format!("operation {op} ({what})")));
        }
        Ok(())
    }

    fn inject(&self, message: String) -> EnvError {
        self.injected.fetch_add(1, Ordering::SeqCst);
        EnvError::injected(message)
    }
}

/// An environment wrapper that can simulate failures.
#[derive(Debug)]
pub struct FaultInjectionEnv<E: Env> {
    inner: E,
    state: Arc<FaultState>,
}

impl<E: Env> FaultInjectionEnv<E> {
    /// Wraps `inner` with no faults armed.
    pub fn new(inner: E) -> Self {
        Self {
            inner,
            state: Arc::new(FaultState::default()),
        }
    }

    /// Returns the wrapped environment.
    pub fn inner(&self) -> &E {
        &self.inner
    }

    /// Fails the mutating operation with index `n` (zero-based), counted
    /// from the last [`FaultInjectionEnv::reset`].
    pub fn fail_operation_at(&self, n: usize) {
        self.state.fail_at.store(n, Ordering::SeqCst);
    }

    /// Fails appends once `bytes` bytes have been written, after writing
    /// the part of the append that fits.
    pub fn crash_after(&self, bytes: usize) {
        self.state.crash_after_bytes.store(bytes, Ordering::SeqCst);
    }

    /// Reports the first `n` link attempts as unsupported.
    pub fn reject_links(&self, n: usize) {
        self.state.reject_links.store(n, Ordering::SeqCst);
    }

    /// Reports every link attempt as unsupported.
    pub fn reject_all_links(&self) {
        self.reject_links(NEVER);
    }

    /// Sets whether existence probes fail with an I/O error.
    pub fn set_fail_exists(&self, fail: bool) {
        self.state.fail_exists.store(fail, Ordering::SeqCst);
    }

    /// Sets whether renames fail.
    pub fn set_fail_rename(&self, fail: bool) {
        self.state.fail_rename.store(fail, Ordering::SeqCst);
    }

    /// Sets whether directory syncs fail.
    pub fn set_fail_dir_fsync(&self, fail: bool) {
        self.state.fail_dir_fsync.store(fail, Ordering::SeqCst);
    }

    /// Sets whether file and directory deletes fail.
    pub fn set_fail_deletes(&self, fail: bool) {
        self.state.fail_deletes.store(fail, Ordering::SeqCst);
    }

    /// Disarms every fault and zeroes every counter.
    pub fn reset(&self) {
        let s = &self.state;
        s.fail_at.store(NEVER, Ordering::SeqCst);
        s.mutating_ops.store(0, Ordering::SeqCst);
        s.crash_after_bytes.store(NEVER, Ordering::SeqCst);
        s.bytes_written.store(0, Ordering::SeqCst);
        s.reject_links.store(0, Ordering::SeqCst);
        s.fail_exists.store(false, Ordering::SeqCst);
        s.fail_rename.store(false, Ordering::SeqCst);
        s.fail_dir_fsync.store(false, Ordering::SeqCst);
        s.fail_deletes.store(false, Ordering::SeqCst);
        s.link_attempts.store(0, Ordering::SeqCst);
        s.links_created.store(0, Ordering::SeqCst);
        s.files_created.store(0, Ordering::SeqCst);
        s.injected.store(0, Ordering::SeqCst);
    }

    /// Mutating operations seen so far.
    pub fn mutating_ops(&self) -> usize {
        self.state.mutating_ops.load(Ordering::SeqCst)
    }

    /// Calls to `link_file`, successful or not.
    pub fn link_attempts(&self) -> usize {
        self.state.link_attempts.load(Ordering::SeqCst)
    }

    /// Hard links actually created.
    pub fn links_created(&self) -> usize {
        self.state.links_created.load(Ordering::SeqCst)
    }

    /// Files opened for writing.
    pub fn files_created(&self) -> usize {
        self.state.files_created.load(Ordering::SeqCst)
    }

    /// Failures injected so far.
    pub fn injected(&self) -> usize {
        self.state.injected.load(Ordering::SeqCst)
    }
}

impl<E: Env> Env for FaultInjectionEnv<E> {
    fn file_exists(&self, path: &Path) -> EnvResult<bool> {
        if self.state.fail_exists.load(Ordering::SeqCst) {
            self.state.injected.fetch_add(1, Ordering::SeqCst);
            return Err(EnvError::Io(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "simulated probe failure",
            )));
        }
        self.inner.file_exists(path)
    }

    fn create_dir(&self, path: &Path) -> EnvResult<()> {
        self.state.tick("create_dir")?;
        self.inner.create_dir(path)
    }

    fn link_file(&self, src: &Path, dst: &Path) -> EnvResult<()> {
        let attempt = self.state.link_attempts.fetch_add(1, Ordering::SeqCst);
        self.state.tick("link_file")?;
        if attempt < self.state.reject_links.load(Ordering::SeqCst) {
            return Err(EnvError::not_supported("simulated cross-device link"));
        }
        self.inner.link_file(src, dst)?;
        self.state.links_created.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn rename_file(&self, src: &Path, dst: &Path) -> EnvResult<()> {
        self.state.tick("rename_file")?;
        if self.state.fail_rename.load(Ordering::SeqCst) {
            return Err(self.state.inject("simulated rename failure".to_string()));
        }
        self.inner.rename_file(src, dst)
    }

    fn get_children(&self, dir: &Path) -> EnvResult<Vec<String>> {
        self.inner.get_children(dir)
    }

    fn delete_file(&self, path: &Path) -> EnvResult<()> {
        if self.state.fail_deletes.load(Ordering::SeqCst) {
            return Err(EnvError::injected("simulated delete failure"));
        }
        self.inner.delete_file(path)
    }

    fn delete_dir(&self, path: &Path) -> EnvResult<()> {
        if self.state.fail_deletes.load(Ordering::SeqCst) {
            return Err(EnvError::injected("simulated delete failure"));
        }
        self.inner.delete_dir(path)
    }

    fn get_file_size(&self, path: &Path) -> EnvResult<u64> {
        self.inner.get_file_size(path)
    }

    fn new_sequential_file(&self, path: &Path) -> EnvResult<Box<dyn SequentialFile>> {
        self.inner.new_sequential_file(path)
    }

    fn new_writable_file(&self, path: &Path) -> EnvResult<Box<dyn WritableFile>> {
        self.state.tick("new_writable_file")?;
        let inner = self.inner.new_writable_file(path)?;
        self.state.files_created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FaultyWritableFile {
            inner,
            state: Arc::clone(&self.state),
        }))
    }

    fn new_directory(&self, path: &Path) -> EnvResult<Box<dyn Directory>> {
        let inner = self.inner.new_directory(path)?;
        Ok(Box::new(FaultyDirectory {
            inner,
            state: Arc::clone(&self.state),
        }))
    }
}

struct FaultyWritableFile {
    inner: Box<dyn WritableFile>,
    state: Arc<FaultState>,
}

impl WritableFile for FaultyWritableFile {
    fn append(&mut self, data: &[u8]) -> EnvResult<()> {
        self.state.tick("append")?;

        let current = self.state.bytes_written.fetch_add(data.len(), Ordering::SeqCst);
        let threshold = self.state.crash_after_bytes.load(Ordering::SeqCst);
        if current >= threshold {
            return Err(self.state.inject("simulated crash during write".to_string()));
        }
        if current + data.len() > threshold {
            // Write partial data up to the crash point.
            let partial = threshold - current;
            let _ = self.inner.append(&data[..partial]);
            return Err(self.state.inject("simulated crash during partial write".to_string()));
        }
        self.inner.append(data)
    }

    fn flush(&mut self) -> EnvResult<()> {
        self.inner.flush()
    }

    fn sync(&mut self) -> EnvResult<()> {
        self.state.tick("sync")?;
        self.inner.sync()
    }

    fn fsync(&mut self) -> EnvResult<()> {
        self.state.tick("fsync")?;
        self.inner.fsync()
    }
}

struct FaultyDirectory {
    inner: Box<dyn Directory>,
    state: Arc<FaultState>,
}

impl Directory for FaultyDirectory {
    fn fsync(&mut self) -> EnvResult<()> {
        self.state.tick("directory fsync")?;
        if self.state.fail_dir_fsync.load(Ordering::SeqCst) {
            return Err(self.state.inject("simulated directory sync failure".to_string()));
        }
        self.inner.fsync()
    }
}
