//! Choosing which log segments a checkpoint carries.
//!
//! A segment is needed when it is alive and either starts at or after the
//! cut sequence, or sits at or above the two-phase retention floor. The
//! floor matters because a sequence-only cut can keep a transaction's
//! commit record while dropping the older segment with its prepare record.

use crate::engine::{SnapshotCutPoint, WalSegment};
use crate::types::LogNumber;

/// How a selected segment is transferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalTransferMode {
    /// Hard link, or a whole-file copy once links are unavailable.
    LinkOrCopy,
    /// Copy exactly this many bytes. Used for the newest segment, which
    /// keeps receiving writes.
    CopyExact(u64),
}

/// A segment chosen for the checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalSelection<'a> {
    /// The selected segment.
    pub segment: &'a WalSegment,
    /// How to transfer it.
    pub mode: WalTransferMode,
}

/// Returns true if `segment` belongs in a checkpoint cut at `cut`.
#[must_use]
pub fn is_needed(segment: &WalSegment, cut: &SnapshotCutPoint) -> bool {
    let floor = cut.min_log_number_to_keep.unwrap_or(LogNumber::MAX);
    segment.is_alive()
        && (segment.start_sequence >= cut.sequence_number || segment.log_number >= floor)
}

/// Selects segments from `segments` (ascending log number) for `cut`.
///
/// Order is preserved. The last selected segment is copied to its listed
/// size; the others may be linked.
#[must_use]
pub fn select_wal_files<'a>(
    segments: &'a [WalSegment],
    cut: &SnapshotCutPoint,
) -> Vec<WalSelection<'a>> {
    let mut selected: Vec<WalSelection<'a>> = segments
        .iter()
        .filter(|segment| is_needed(segment, cut))
        .map(|segment| WalSelection {
            segment,
            mode: WalTransferMode::LinkOrCopy,
        })
        .collect();

    if let Some(last) = selected.last_mut() {
        last.mode = WalTransferMode::CopyExact(last.segment.size_bytes);
    }
    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::WalFileType;
    use crate::filename::log_file_name;
    use crate::types::SequenceNumber;
    use proptest::prelude::*;

    fn segment(log: u64, start: u64, size: u64, file_type: WalFileType) -> WalSegment {
        WalSegment {
            log_number: LogNumber::new(log),
            start_sequence: SequenceNumber::new(start),
            size_bytes: size,
            file_type,
            path_name: log_file_name(log),
        }
    }

    fn cut(seq: u64, min_log: Option<u64>) -> SnapshotCutPoint {
        SnapshotCutPoint {
            sequence_number: SequenceNumber::new(seq),
            min_log_number_to_keep: min_log.map(LogNumber::new),
        }
    }

    #[test]
    fn retention_floor_keeps_prepare_log() {
        let segments = vec![
            segment(2, 50, 300, WalFileType::Alive),
            segment(3, 180, 120, WalFileType::Alive),
        ];

        let selected = select_wal_files(&segments, &cut(200, Some(3)));
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].segment.log_number, LogNumber::new(3));
        assert_eq!(selected[0].mode, WalTransferMode::CopyExact(120));
    }

    #[test]
    fn sequence_only_cut() {
        let segments = vec![
            segment(4, 10, 100, WalFileType::Alive),
            segment(5, 20, 100, WalFileType::Alive),
            segment(6, 30, 100, WalFileType::Alive),
            segment(7, 40, 55, WalFileType::Alive),
        ];

        let selected = select_wal_files(&segments, &cut(20, None));
        let logs: Vec<u64> = selected.iter().map(|s| s.segment.log_number.as_u64()).collect();
        assert_eq!(logs, vec![5, 6, 7]);
        assert_eq!(selected[0].mode, WalTransferMode::LinkOrCopy);
        assert_eq!(selected[1].mode, WalTransferMode::LinkOrCopy);
        assert_eq!(selected[2].mode, WalTransferMode::CopyExact(55));
    }

    #[test]
    fn archived_segments_never_selected() {
        let segments = vec![
            segment(8, 500, 10, WalFileType::Archived),
            segment(9, 10, 20, WalFileType::Alive),
        ];

        assert!(select_wal_files(&segments, &cut(100, None)).is_empty());
        let selected = select_wal_files(&segments, &cut(0, Some(0)));
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].segment.log_number, LogNumber::new(9));
    }

    #[test]
    fn newest_selected_not_newest_listed() {
        let segments = vec![
            segment(10, 100, 64, WalFileType::Alive),
            segment(11, 200, 32, WalFileType::Archived),
        ];

        let selected = select_wal_files(&segments, &cut(50, None));
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].mode, WalTransferMode::CopyExact(64));
    }

    #[test]
    fn empty_listing() {
        assert!(select_wal_files(&[], &cut(1, Some(1))).is_empty());
    }

    fn arb_segments() -> impl Strategy<Value = Vec<WalSegment>> {
        prop::collection::vec((0u64..1_000, 0u64..4_096, any::<bool>()), 0..16).prop_map(
            |raw| {
                raw.into_iter()
                    .enumerate()
                    .map(|(i, (start, size, alive))| {
                        let file_type = if alive {
                            WalFileType::Alive
                        } else {
                            WalFileType::Archived
                        };
                        segment(i as u64 + 1, start, size, file_type)
                    })
                    .collect()
            },
        )
    }

    proptest! {
        #[test]
        fn selection_matches_rule(
            segments in arb_segments(),
            seq in 0u64..1_000,
            min_log in proptest::option::of(0u64..20),
        ) {
            let cut = cut(seq, min_log);
            let selected = select_wal_files(&segments, &cut);

            let expected: Vec<&WalSegment> = segments
                .iter()
                .filter(|s| {
                    s.is_alive()
                        && (s.start_sequence.as_u64() >= seq
                            || min_log.is_some_and(|m| s.log_number.as_u64() >= m))
                })
                .collect();
            prop_assert_eq!(selected.len(), expected.len());

            for (i, (got, want)) in selected.iter().zip(expected.iter()).enumerate() {
                prop_assert_eq!(got.segment, *want);
                if i + 1 == selected.len() {
                    prop_assert_eq!(got.mode, WalTransferMode::CopyExact(want.size_bytes));
                } else {
                    prop_assert_eq!(got.mode, WalTransferMode::LinkOrCopy);
                }
            }
        }
    }
}
