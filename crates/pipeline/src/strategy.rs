//! Chapter scheduling strategies.
//!
//! Sequential maximizes narrative continuity (every chapter sees all
//! earlier key concepts), Parallel maximizes throughput (no
//! continuity), Hybrid processes batches in order so later batches
//! still build on everything before them.

use serde::{Deserialize, Serialize};

/// Default hybrid batch size.
pub const DEFAULT_BATCH_SIZE: usize = 3;

/// How chapters are scheduled for generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Strategy {
    /// One chapter at a time, in sequence order.
    Sequential,
    /// All chapters concurrently, bounded only by the concurrency cap.
    Parallel,
    /// Sequence-ordered batches generated concurrently within a batch.
    Hybrid { batch_size: usize },
}

impl Default for Strategy {
    fn default() -> Self {
        Self::Hybrid {
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl Strategy {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sequential => "sequential",
            Self::Parallel => "parallel",
            Self::Hybrid { .. } => "hybrid",
        }
    }

    /// Batch size the strategy implies for `chapter_count` chapters.
    /// A zero hybrid batch size is clamped to 1.
    pub fn effective_batch_size(&self, chapter_count: usize) -> usize {
        match self {
            Self::Sequential => 1,
            Self::Parallel => chapter_count.max(1),
            Self::Hybrid { batch_size } => (*batch_size).max(1),
        }
    }
}

/// Split `0..count` into consecutive batches of at most `batch_size`.
pub fn batches(count: usize, batch_size: usize) -> Vec<std::ops::Range<usize>> {
    let size = batch_size.max(1);
    let mut out = Vec::new();
    let mut start = 0;
    while start < count {
        let end = (start + size).min(count);
        out.push(start..end);
        start = end;
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_hybrid_of_three() {
        assert_eq!(
            Strategy::default(),
            Strategy::Hybrid {
                batch_size: DEFAULT_BATCH_SIZE
            }
        );
    }

    #[test]
    fn effective_batch_sizes() {
        assert_eq!(Strategy::Sequential.effective_batch_size(10), 1);
        assert_eq!(Strategy::Parallel.effective_batch_size(10), 10);
        assert_eq!(Strategy::Hybrid { batch_size: 4 }.effective_batch_size(10), 4);
        assert_eq!(Strategy::Hybrid { batch_size: 0 }.effective_batch_size(10), 1);
    }

    #[test]
    fn batches_cover_range_without_overlap() {
        let ranges = batches(7, 3);
        assert_eq!(ranges, vec![0..3, 3..6, 6..7]);
    }

    #[test]
    fn batches_of_zero_count() {
        assert!(batches(0, 3).is_empty());
    }

    #[test]
    fn serde_round_trip() {
        let json = serde_json::to_string(&Strategy::Hybrid { batch_size: 5 }).unwrap();
        assert!(json.contains("hybrid"));
        let back: Strategy = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Strategy::Hybrid { batch_size: 5 });
    }
}
