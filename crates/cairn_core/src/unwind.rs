//! Staging directory that removes itself unless committed.

use crate::error::CoreResult;
use cairn_env::Env;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A checkpoint's staging directory.
///
/// Armed from creation until [`StagingDir::commit`]. Dropping an armed
/// guard deletes every file beneath the directory and then the directory
/// itself. Cleanup failures are logged and never replace the error that
/// caused the unwind.
#[must_use = "dropping the guard deletes the staging directory"]
pub struct StagingDir<'a> {
    env: &'a dyn Env,
    path: PathBuf,
    armed: bool,
}

impl<'a> StagingDir<'a> {
    /// Creates the directory at `path` and arms the guard.
    ///
    /// # Errors
    ///
    /// Returns the environment's error; nothing exists to clean up then.
    pub fn create(env: &'a dyn Env, path: PathBuf) -> CoreResult<Self> {
        env.create_dir(&path)?;
        Ok(Self {
            env,
            path,
            armed: true,
        })
    }

    /// Current location of the directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Renames the directory to `target`.
    ///
    /// The guard stays armed and now owns `target`, so a failure after
    /// the rename still leaves nothing behind.
    ///
    /// # Errors
    ///
    /// Returns the rename failure; the guard still owns the old path.
    pub fn install(&mut self, target: &Path) -> CoreResult<()> {
        self.env.rename_file(&self.path, target)?;
        self.path = target.to_path_buf();
        Ok(())
    }

    /// Syncs the directory entries.
    ///
    /// # Errors
    ///
    /// Returns the open or sync failure.
    pub fn sync(&self) -> CoreResult<()> {
        let mut dir = self.env.new_directory(&self.path)?;
        dir.fsync()?;
        Ok(())
    }

    /// Disarms the guard, keeping the directory.
    pub fn commit(mut self) -> PathBuf {
        self.armed = false;
        std::mem::take(&mut self.path)
    }

    fn remove_all(&self) {
        let children = match self.env.get_children(&self.path) {
            Ok(children) => children,
            Err(e) => {
                warn!(dir = %self.path.display(), error = %e, "cannot list directory for cleanup");
                Vec::new()
            }
        };
        for child in children {
            let child_path = self.path.join(&child);
            match self.env.delete_file(&child_path) {
                Ok(()) => debug!(file = %child_path.display(), "deleted"),
                Err(e) => warn!(file = %child_path.display(), error = %e, "delete failed"),
            }
        }
        match self.env.delete_dir(&self.path) {
            Ok(()) => debug!(dir = %self.path.display(), "deleted"),
            Err(e) => warn!(dir = %self.path.display(), error = %e, "delete failed"),
        }
    }
}

impl Drop for StagingDir<'_> {
    fn drop(&mut self) {
        if self.armed {
            warn!(dir = %self.path.display(), "checkpoint failed, removing partial output");
            self.remove_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cairn_env::MemEnv;

    #[test]
    fn drop_removes_everything() {
        let env = MemEnv::new();
        let staging = StagingDir::create(&env, PathBuf::from("/snap.tmp")).unwrap();
        env.write_file(Path::new("/snap.tmp/000010.sst"), b"t").unwrap();
        env.write_file(Path::new("/snap.tmp/MANIFEST-000005"), b"m").unwrap();

        drop(staging);
        assert!(!env.file_exists(Path::new("/snap.tmp")).unwrap());
        assert!(!env.file_exists(Path::new("/snap.tmp/000010.sst")).unwrap());
    }

    #[test]
    fn commit_keeps_directory() {
        let env = MemEnv::new();
        let mut staging = StagingDir::create(&env, PathBuf::from("/snap.tmp")).unwrap();
        env.write_file(Path::new("/snap.tmp/CURRENT"), b"MANIFEST-000005\n").unwrap();

        staging.install(Path::new("/snap")).unwrap();
        staging.sync().unwrap();
        assert_eq!(staging.commit(), PathBuf::from("/snap"));

        assert!(env.is_dir(Path::new("/snap")));
        assert!(!env.file_exists(Path::new("/snap.tmp")).unwrap());
        assert_eq!(
            env.read_file(Path::new("/snap/CURRENT")).unwrap(),
            b"MANIFEST-000005\n"
        );
    }

    #[test]
    fn failure_after_install_removes_target() {
        let env = MemEnv::new();
        let mut staging = StagingDir::create(&env, PathBuf::from("/snap.tmp")).unwrap();
        env.write_file(Path::new("/snap.tmp/CURRENT"), b"x").unwrap();
        staging.install(Path::new("/snap")).unwrap();

        drop(staging);
        assert!(!env.file_exists(Path::new("/snap")).unwrap());
        assert!(!env.file_exists(Path::new("/snap.tmp")).unwrap());
    }

    #[test]
    fn create_fails_when_path_exists() {
        let env = MemEnv::new();
        env.create_dir(Path::new("/snap.tmp")).unwrap();
        assert!(StagingDir::create(&env, PathBuf::from("/snap.tmp")).is_err());
        // The pre-existing directory is not ours to remove.
        assert!(env.is_dir(Path::new("/snap.tmp")));
    }
}
