//! A scriptable [`Engine`] for checkpoint tests.
//!
//! Every answer the engine gives is set by the test, and every call the
//! checkpoint makes is counted, so tests can check both what a checkpoint
//! produced and how it talked to the engine.

use cairn_core::{
    CoreError, CoreResult, Engine, FileDeletionGate, LiveFiles, LogNumber, SequenceNumber,
    WalSegment,
};
use cairn_env::Env;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

type Hook = Box<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct Script {
    live_files: LiveFiles,
    flushed_live_files: Option<LiveFiles>,
    sequence_number: SequenceNumber,
    two_phase_commit: bool,
    min_log_number_to_keep: Option<LogNumber>,
    wal_files: Vec<WalSegment>,
    fail_live_files: bool,
    after_listing: Option<Hook>,
}

/// An engine whose answers are scripted by the test.
pub struct ScriptedEngine<E: Env> {
    env: Arc<E>,
    db_path: PathBuf,
    wal_dir: PathBuf,
    script: Mutex<Script>,
    gate: FileDeletionGate,
    disable_calls: AtomicUsize,
    enable_calls: AtomicUsize,
    live_file_calls: AtomicUsize,
    flush_calls: AtomicUsize,
}

impl<E: Env> ScriptedEngine<E> {
    /// Creates an engine whose files live under `db_path` in `env`.
    ///
    /// Log segments are read from `db_path` as well.
    pub fn new(env: Arc<E>, db_path: impl Into<PathBuf>) -> Self {
        let db_path = db_path.into();
        Self {
            env,
            wal_dir: db_path.clone(),
            db_path,
            script: Mutex::new(Script::default()),
            gate: FileDeletionGate::new(),
            disable_calls: AtomicUsize::new(0),
            enable_calls: AtomicUsize::new(0),
            live_file_calls: AtomicUsize::new(0),
            flush_calls: AtomicUsize::new(0),
        }
    }

    /// Reads log segments from `wal_dir` instead of the database directory.
    #[must_use]
    pub fn with_wal_dir(mut self, wal_dir: impl Into<PathBuf>) -> Self {
        self.wal_dir = wal_dir.into();
        self
    }

    /// Returns the environment.
    pub fn env_handle(&self) -> &Arc<E> {
        &self.env
    }

    /// Sets the live-file listing.
    pub fn set_live_files(&self, live_files: LiveFiles) {
        self.script.lock().live_files = live_files;
    }

    /// Sets a different listing returned when a flush is requested.
    pub fn set_flushed_live_files(&self, live_files: LiveFiles) {
        self.script.lock().flushed_live_files = Some(live_files);
    }

    /// Sets the latest sequence number.
    pub fn set_sequence_number(&self, seq: u64) {
        self.script.lock().sequence_number = SequenceNumber::new(seq);
    }

    /// Enables two-phase commit with the given retention floor.
    pub fn set_two_phase_commit(&self, min_log_number_to_keep: Option<u64>) {
        let mut script = self.script.lock();
        script.two_phase_commit = true;
        script.min_log_number_to_keep = min_log_number_to_keep.map(LogNumber::new);
    }

    /// Sets the log segment listing.
    pub fn set_wal_files(&self, wal_files: Vec<WalSegment>) {
        self.script.lock().wal_files = wal_files;
    }

    /// Makes the live-file listing fail.
    pub fn set_fail_live_files(&self, fail: bool) {
        self.script.lock().fail_live_files = fail;
    }

    /// Runs `hook` after the log listing, before any file is transferred.
    ///
    /// Use it to simulate writes that race with the checkpoint. The hook
    /// runs under the script lock and must not call back into the engine.
    pub fn after_listing(&self, hook: impl Fn() + Send + Sync + 'static) {
        self.script.lock().after_listing = Some(Box::new(hook));
    }

    /// Successful calls to `disable_file_deletions`.
    pub fn disable_calls(&self) -> usize {
        self.disable_calls.load(Ordering::SeqCst)
    }

    /// Calls to `enable_file_deletions`.
    pub fn enable_calls(&self) -> usize {
        self.enable_calls.load(Ordering::SeqCst)
    }

    /// Calls to `live_files`.
    pub fn live_file_calls(&self) -> usize {
        self.live_file_calls.load(Ordering::SeqCst)
    }

    /// Calls to `live_files` that requested a flush.
    pub fn flush_calls(&self) -> usize {
        self.flush_calls.load(Ordering::SeqCst)
    }

    /// Returns the deletion gate.
    pub fn deletion_gate(&self) -> &FileDeletionGate {
        &self.gate
    }
}

impl<E: Env> Engine for ScriptedEngine<E> {
    fn env(&self) -> &dyn Env {
        &*self.env
    }

    fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn wal_dir(&self) -> &Path {
        &self.wal_dir
    }

    fn two_phase_commit(&self) -> bool {
        self.script.lock().two_phase_commit
    }

    fn live_files(&self, flush: bool) -> CoreResult<LiveFiles> {
        self.live_file_calls.fetch_add(1, Ordering::SeqCst);
        if flush {
            self.flush_calls.fetch_add(1, Ordering::SeqCst);
        }
        let script = self.script.lock();
        if script.fail_live_files {
            return Err(CoreError::invalid_argument("scripted live-file failure"));
        }
        match (&script.flushed_live_files, flush) {
            (Some(flushed), true) => Ok(flushed.clone()),
            _ => Ok(script.live_files.clone()),
        }
    }

    fn latest_sequence_number(&self) -> SequenceNumber {
        self.script.lock().sequence_number
    }

    fn disable_file_deletions(&self) -> CoreResult<()> {
        self.disable_calls.fetch_add(1, Ordering::SeqCst);
        self.gate.disable();
        Ok(())
    }

    fn enable_file_deletions(&self, force: bool) -> CoreResult<()> {
        self.enable_calls.fetch_add(1, Ordering::SeqCst);
        self.gate.enable(force);
        Ok(())
    }

    fn min_log_number_to_keep(&self) -> Option<LogNumber> {
        self.script.lock().min_log_number_to_keep
    }

    fn sorted_wal_files(&self) -> CoreResult<Vec<WalSegment>> {
        let script = self.script.lock();
        let wal_files = script.wal_files.clone();
        if let Some(hook) = &script.after_listing {
            hook();
        }
        Ok(wal_files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cairn_core::DeletionGuard;
    use cairn_env::MemEnv;

    #[test]
    fn guard_releases_on_drop() {
        let engine = ScriptedEngine::new(Arc::new(MemEnv::new()), "/db");
        {
            let _guard = DeletionGuard::acquire(&engine).unwrap();
            assert!(!engine.deletion_gate().deletions_enabled());
        }
        assert!(engine.deletion_gate().deletions_enabled());
        assert_eq!(engine.disable_calls(), 1);
        assert_eq!(engine.enable_calls(), 1);
    }

    #[test]
    fn explicit_release_is_not_repeated_on_drop() {
        let engine = ScriptedEngine::new(Arc::new(MemEnv::new()), "/db");
        let guard = DeletionGuard::acquire(&engine).unwrap();
        guard.release().unwrap();
        assert_eq!(engine.enable_calls(), 1);
    }

    #[test]
    fn guards_share_the_gate() {
        let engine = ScriptedEngine::new(Arc::new(MemEnv::new()), "/db");
        let first = DeletionGuard::acquire(&engine).unwrap();
        let second = DeletionGuard::acquire(&engine).unwrap();

        drop(first);
        assert!(!engine.deletion_gate().deletions_enabled());
        drop(second);
        assert!(engine.deletion_gate().deletions_enabled());
    }

    #[test]
    fn flush_listing_overrides() {
        let engine = ScriptedEngine::new(Arc::new(MemEnv::new()), "/db");
        engine.set_live_files(LiveFiles {
            files: vec!["CURRENT".into()],
            manifest_size: 1,
        });
        engine.set_flushed_live_files(LiveFiles {
            files: vec!["CURRENT".into(), "000020.sst".into()],
            manifest_size: 2,
        });

        assert_eq!(engine.live_files(false).unwrap().manifest_size, 1);
        assert_eq!(engine.live_files(true).unwrap().manifest_size, 2);
        assert_eq!(engine.flush_calls(), 1);
        assert_eq!(engine.live_file_calls(), 2);
    }
}
