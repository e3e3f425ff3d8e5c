//! Property tests: a checkpoint is complete or absent, whatever fails.

use cairn_core::{checkpoint, CheckpointOptions};
use cairn_env::{Env, MemEnv};
use cairn_testkit::prelude::*;
use proptest::prelude::*;
use std::path::Path;
use std::sync::Arc;

fn faulty_engine() -> ScriptedEngine<FaultInjectionEnv<MemEnv>> {
    let env = Arc::new(FaultInjectionEnv::new(MemEnv::new()));
    DbLayout::default()
        .scripted_engine(Arc::clone(&env), env.inner(), Path::new("/db"))
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn checkpoint_is_complete_or_absent(
        fail_at in proptest::option::of(0usize..32),
        crash_after in proptest::option::of(0usize..16_000),
        reject_links in 0usize..4,
        sequence in 0u64..250,
    ) {
        let engine = faulty_engine();
        engine.set_sequence_number(sequence);
        let env = Arc::clone(engine.env_handle());
        if let Some(n) = fail_at {
            env.fail_operation_at(n);
        }
        if let Some(bytes) = crash_after {
            env.crash_after(bytes);
        }
        env.reject_links(reject_links);

        let result = checkpoint::open(&engine, CheckpointOptions::default())
            .create_checkpoint(Path::new("/snap"));

        let target_exists = env.file_exists(Path::new("/snap")).unwrap();
        prop_assert!(!env.file_exists(Path::new("/snap.tmp")).unwrap());
        prop_assert_eq!(engine.disable_calls(), engine.enable_calls());
        prop_assert!(engine.deletion_gate().deletions_enabled());

        match result {
            Ok(report) => {
                prop_assert!(target_exists);
                prop_assert_eq!(
                    env.inner().read_file(Path::new("/snap/CURRENT")).unwrap(),
                    b"MANIFEST-000005\n".to_vec()
                );
                prop_assert_eq!(
                    env.inner().get_file_size(Path::new("/snap/MANIFEST-000005")).unwrap(),
                    1000
                );
                if reject_links > 0 {
                    prop_assert_eq!(report.files_linked, 0);
                    prop_assert!(env.link_attempts() <= 1);
                }
            }
            Err(_) => prop_assert!(!target_exists),
        }
    }
}
