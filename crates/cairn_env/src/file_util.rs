//! File helpers built on [`Env`] primitives.

use crate::env::Env;
use crate::error::{EnvError, EnvResult};
use std::io;
use std::path::Path;
use tracing::trace;

/// Chunk size used when copying files.
const COPY_BUFFER_SIZE: usize = 4096;

/// Copies `src` into a newly created `dst`.
///
/// Copies exactly `size` bytes, or the whole file when `size` is zero.
/// Capping the size lets callers snapshot a file that another writer is
/// still appending to. The destination is synced before returning, with
/// a full metadata sync when `use_fsync` is set.
///
/// # Errors
///
/// Returns `Io(UnexpectedEof)` if `src` holds fewer than `size` bytes, or
/// any error reported by the environment.
pub fn copy_file(
    env: &dyn Env,
    src: &Path,
    dst: &Path,
    size: u64,
    use_fsync: bool,
) -> EnvResult<()> {
    let mut remaining = if size == 0 {
        env.get_file_size(src)?
    } else {
        size
    };
    trace!(src = %src.display(), dst = %dst.display(), bytes = remaining, "copying file");

    let mut reader = env.new_sequential_file(src)?;
    let mut writer = env.new_writable_file(dst)?;
    let mut buffer = vec![0u8; COPY_BUFFER_SIZE];

    while remaining > 0 {
        let want = usize::try_from(remaining).map_or(COPY_BUFFER_SIZE, |r| r.min(COPY_BUFFER_SIZE));
        let n = reader.read(&mut buffer[..want])?;
        if n == 0 {
            return Err(EnvError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("file too small: {} ({remaining} bytes short)", src.display()),
            )));
        }
        writer.append(&buffer[..n])?;
        remaining -= n as u64;
    }

    if use_fsync {
        writer.fsync()
    } else {
        writer.sync()
    }
}

/// Creates `dst` holding exactly `contents`, synced to disk.
///
/// # Errors
///
/// Returns any error reported by the environment.
pub fn create_file(env: &dyn Env, dst: &Path, contents: &[u8], use_fsync: bool) -> EnvResult<()> {
    let mut writer = env.new_writable_file(dst)?;
    writer.append(contents)?;
    if use_fsync {
        writer.fsync()
    } else {
        writer.sync()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemEnv;
    use proptest::prelude::*;

    #[test]
    fn copy_whole_file() {
        let env = MemEnv::new();
        let data: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        env.write_file(Path::new("/src/a"), &data).unwrap();
        env.create_dir_all(Path::new("/dst"));

        copy_file(&env, Path::new("/src/a"), Path::new("/dst/a"), 0, false).unwrap();
        assert_eq!(env.read_file(Path::new("/dst/a")).unwrap(), data);
        assert!(!env.is_same_file(Path::new("/src/a"), Path::new("/dst/a")));
    }

    #[test]
    fn copy_capped_ignores_growth() {
        let env = MemEnv::new();
        env.write_file(Path::new("/src/MANIFEST-000001"), &[7u8; 5000]).unwrap();
        env.create_dir_all(Path::new("/dst"));

        copy_file(
            &env,
            Path::new("/src/MANIFEST-000001"),
            Path::new("/dst/MANIFEST-000001"),
            1000,
            true,
        )
        .unwrap();
        assert_eq!(env.get_file_size(Path::new("/dst/MANIFEST-000001")).unwrap(), 1000);
    }

    #[test]
    fn copy_short_source_fails() {
        let env = MemEnv::new();
        env.write_file(Path::new("/src/a"), b"tiny").unwrap();
        env.create_dir_all(Path::new("/dst"));

        let err = copy_file(&env, Path::new("/src/a"), Path::new("/dst/a"), 100, false)
            .unwrap_err();
        assert!(matches!(err, EnvError::Io(ref e) if e.kind() == io::ErrorKind::UnexpectedEof));
    }

    #[test]
    fn create_file_writes_contents() {
        let env = MemEnv::new();
        env.create_dir_all(Path::new("/dst"));
        create_file(&env, Path::new("/dst/CURRENT"), b"MANIFEST-000005\n", false).unwrap();
        assert_eq!(
            env.read_file(Path::new("/dst/CURRENT")).unwrap(),
            b"MANIFEST-000005\n"
        );
    }

    proptest! {
        #[test]
        fn capped_copy_is_prefix(len in 0usize..20_000, cap in 1u64..20_000) {
            let env = MemEnv::new();
            let data: Vec<u8> = (0..len).map(|i| (i % 256) as u8).collect();
            env.write_file(Path::new("/s"), &data).unwrap();

            let result = copy_file(&env, Path::new("/s"), Path::new("/d"), cap, false);
            if cap as usize <= len {
                prop_assert!(result.is_ok());
                prop_assert_eq!(env.read_file(Path::new("/d")).unwrap(), data[..cap as usize].to_vec());
            } else {
                prop_assert!(result.is_err());
            }
        }
    }
}
