//! Moving one file into a checkpoint directory.
//!
//! Rules:
//! - data files and older log segments are hard-linked while the
//!   destination shares a filesystem with the source
//! - the first link the filesystem rejects switches every later transfer
//!   in the same checkpoint to copying
//! - the descriptor is copied up to the size captured with the live-file
//!   listing, the newest log segment up to its listed size
//! - options files are copied whole
//! - the current-pointer file is never transferred

use crate::error::CoreResult;
use crate::filename::{LiveFileEntry, LiveFileKind};
use cairn_env::{file_util, Env};
use std::path::Path;
use tracing::{debug, info};

/// How a file reached the checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMethod {
    /// Hard-linked to the source.
    Linked,
    /// Copied byte for byte.
    Copied,
}

/// Mutable state of one checkpoint's transfer loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferState {
    /// False once the filesystem rejected a hard link. Never reset.
    pub same_filesystem: bool,
    /// Descriptor file seen in the live set.
    pub manifest_file_name: Option<String>,
    /// Current-pointer file seen in the live set.
    pub current_file_name: Option<String>,
}

impl Default for TransferState {
    fn default() -> Self {
        Self {
            same_filesystem: true,
            manifest_file_name: None,
            current_file_name: None,
        }
    }
}

impl TransferState {
    /// Creates state for a new checkpoint.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Transfers files into one destination directory.
#[derive(Clone, Copy)]
pub struct Transfer<'a> {
    env: &'a dyn Env,
    dst_dir: &'a Path,
    use_fsync: bool,
}

impl<'a> Transfer<'a> {
    /// Creates a transfer into `dst_dir`.
    #[must_use]
    pub fn new(env: &'a dyn Env, dst_dir: &'a Path, use_fsync: bool) -> Self {
        Self {
            env,
            dst_dir,
            use_fsync,
        }
    }

    /// Hard-links `src` as `name`, falling back to a whole-file copy.
    ///
    /// # Errors
    ///
    /// Returns any link or copy failure other than an unsupported link.
    pub fn link_or_copy(
        &self,
        state: &mut TransferState,
        src: &Path,
        name: &str,
    ) -> CoreResult<TransferMethod> {
        let dst = self.dst_dir.join(name);
        if state.same_filesystem {
            debug!(file = name, "hard linking");
            match self.env.link_file(src, &dst) {
                Ok(()) => return Ok(TransferMethod::Linked),
                Err(e) if e.is_not_supported() => {
                    info!(file = name, error = %e, "hard links unavailable, copying from now on");
                    state.same_filesystem = false;
                }
                Err(e) => return Err(e.into()),
            }
        }
        self.copy(src, name, 0)
    }

    /// Copies `size` bytes of `src` as `name` (`0` copies the whole file).
    ///
    /// # Errors
    ///
    /// Returns any copy failure.
    pub fn copy(&self, src: &Path, name: &str, size: u64) -> CoreResult<TransferMethod> {
        debug!(file = name, size, "copying");
        file_util::copy_file(self.env, src, &self.dst_dir.join(name), size, self.use_fsync)?;
        Ok(TransferMethod::Copied)
    }

    /// Copies exactly the first `size` bytes of `src` as `name`.
    ///
    /// Unlike [`Transfer::copy`], a zero `size` yields an empty file.
    ///
    /// # Errors
    ///
    /// Returns any copy failure.
    pub fn copy_prefix(&self, src: &Path, name: &str, size: u64) -> CoreResult<TransferMethod> {
        if size == 0 {
            self.create(name, &[])?;
            return Ok(TransferMethod::Copied);
        }
        self.copy(src, name, size)
    }

    /// Transfers one live file from `src_dir` according to its kind.
    ///
    /// Returns `None` for the current-pointer file, which is only
    /// remembered in `state`.
    ///
    /// # Errors
    ///
    /// Returns any link or copy failure other than an unsupported link.
    pub fn live_file(
        &self,
        state: &mut TransferState,
        src_dir: &Path,
        entry: &LiveFileEntry,
        manifest_size: u64,
    ) -> CoreResult<Option<TransferMethod>> {
        let src = src_dir.join(&entry.name);
        let method = match entry.kind {
            LiveFileKind::CurrentFile => {
                state.current_file_name = Some(entry.name.clone());
                return Ok(None);
            }
            LiveFileKind::DescriptorFile => {
                state.manifest_file_name = Some(entry.name.clone());
                self.copy_prefix(&src, &entry.name, manifest_size)?
            }
            LiveFileKind::DataFile => self.link_or_copy(state, &src, &entry.name)?,
            LiveFileKind::OptionsFile => self.copy(&src, &entry.name, 0)?,
        };
        Ok(Some(method))
    }

    /// Writes a small file named `name` holding `contents`.
    ///
    /// # Errors
    ///
    /// Returns any write or sync failure.
    pub fn create(&self, name: &str, contents: &[u8]) -> CoreResult<()> {
        debug!(file = name, "creating");
        file_util::create_file(self.env, &self.dst_dir.join(name), contents, self.use_fsync)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use cairn_env::MemEnv;
    use std::path::PathBuf;

    fn setup() -> (MemEnv, PathBuf, PathBuf) {
        let env = MemEnv::new();
        let src = PathBuf::from("/db");
        let dst = PathBuf::from("/snap.tmp");
        env.write_file(&src.join("000010.sst"), b"table ten").unwrap();
        env.write_file(&src.join("000011.sst"), b"table eleven").unwrap();
        env.write_file(&src.join("MANIFEST-000005"), &[1u8; 5000]).unwrap();
        env.write_file(&src.join("OPTIONS-000007"), b"[DBOptions]").unwrap();
        env.write_file(&src.join("CURRENT"), b"MANIFEST-000005\n").unwrap();
        env.create_dir(&dst).unwrap();
        (env, src, dst)
    }

    #[test]
    fn data_file_is_linked() {
        let (env, src, dst) = setup();
        let transfer = Transfer::new(&env, &dst, false);
        let mut state = TransferState::new();
        let entry = LiveFileEntry::parse("000010.sst").unwrap();

        let method = transfer.live_file(&mut state, &src, &entry, 0).unwrap();
        assert_eq!(method, Some(TransferMethod::Linked));
        assert!(env.is_same_file(&src.join("000010.sst"), &dst.join("000010.sst")));
        assert!(state.same_filesystem);
    }

    #[test]
    fn unsupported_link_is_sticky() {
        let (env, src, dst) = setup();
        env.set_links_supported(false);
        let transfer = Transfer::new(&env, &dst, false);
        let mut state = TransferState::new();

        let first = LiveFileEntry::parse("000010.sst").unwrap();
        let method = transfer.live_file(&mut state, &src, &first, 0).unwrap();
        assert_eq!(method, Some(TransferMethod::Copied));
        assert!(!state.same_filesystem);

        // Links work again, but the checkpoint keeps copying.
        env.set_links_supported(true);
        let second = LiveFileEntry::parse("000011.sst").unwrap();
        let method = transfer.live_file(&mut state, &src, &second, 0).unwrap();
        assert_eq!(method, Some(TransferMethod::Copied));
        assert!(!env.is_same_file(&src.join("000011.sst"), &dst.join("000011.sst")));
        assert_eq!(env.read_file(&dst.join("000011.sst")).unwrap(), b"table eleven");
    }

    #[test]
    fn descriptor_copied_to_bound() {
        let (env, src, dst) = setup();
        let transfer = Transfer::new(&env, &dst, true);
        let mut state = TransferState::new();
        let entry = LiveFileEntry::parse("MANIFEST-000005").unwrap();

        let method = transfer.live_file(&mut state, &src, &entry, 1000).unwrap();
        assert_eq!(method, Some(TransferMethod::Copied));
        assert_eq!(env.get_file_size(&dst.join("MANIFEST-000005")).unwrap(), 1000);
        assert_eq!(state.manifest_file_name.as_deref(), Some("MANIFEST-000005"));
    }

    #[test]
    fn empty_descriptor_bound_copies_nothing() {
        let (env, src, dst) = setup();
        let transfer = Transfer::new(&env, &dst, false);
        let mut state = TransferState::new();
        let entry = LiveFileEntry::parse("MANIFEST-000005").unwrap();

        let method = transfer.live_file(&mut state, &src, &entry, 0).unwrap();
        assert_eq!(method, Some(TransferMethod::Copied));
        assert_eq!(env.read_file(&dst.join("MANIFEST-000005")).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn options_copied_whole() {
        let (env, src, dst) = setup();
        let transfer = Transfer::new(&env, &dst, false);
        let mut state = TransferState::new();
        let entry = LiveFileEntry::parse("OPTIONS-000007").unwrap();

        transfer.live_file(&mut state, &src, &entry, 0).unwrap();
        assert_eq!(env.read_file(&dst.join("OPTIONS-000007")).unwrap(), b"[DBOptions]");
        assert!(!env.is_same_file(&src.join("OPTIONS-000007"), &dst.join("OPTIONS-000007")));
    }

    #[test]
    fn current_is_remembered_not_copied() {
        let (env, src, dst) = setup();
        let transfer = Transfer::new(&env, &dst, false);
        let mut state = TransferState::new();
        let entry = LiveFileEntry::parse("CURRENT").unwrap();

        assert_eq!(transfer.live_file(&mut state, &src, &entry, 0).unwrap(), None);
        assert_eq!(state.current_file_name.as_deref(), Some("CURRENT"));
        assert!(!env.file_exists(&dst.join("CURRENT")).unwrap());
    }

    #[test]
    fn missing_source_is_fatal() {
        let (env, src, dst) = setup();
        let transfer = Transfer::new(&env, &dst, false);
        let mut state = TransferState::new();
        let entry = LiveFileEntry::parse("000099.sst").unwrap();

        let err = transfer.live_file(&mut state, &src, &entry, 0).unwrap_err();
        assert!(matches!(err, CoreError::Env(_)));
        assert!(state.same_filesystem);
    }
}
