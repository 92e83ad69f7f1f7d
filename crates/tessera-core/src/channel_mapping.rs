//! Output channel to file channel indirection.

use crate::types::ChannelIndex;
use serde::{Deserialize, Serialize};

/// Maps output channel `i` to file channel `indices[i]`.
///
/// Output channels beyond the explicit list map to themselves.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelMapping {
    pub indices: Vec<ChannelIndex>,
}

impl ChannelMapping {
    pub fn new(indices: Vec<ChannelIndex>) -> Self {
        Self { indices }
    }

    /// File channel to read for output channel `out_index`, or `None` when
    /// `out_index` is not below `channel_count`.
    pub fn file_index(&self, out_index: usize, channel_count: usize) -> Option<ChannelIndex> {
        if out_index >= channel_count {
            return None;
        }
        Some(
            self.indices
                .get(out_index)
                .copied()
                .unwrap_or(out_index as ChannelIndex),
        )
    }

    /// Output channel reading from `file_index`, the inverse of [`file_index`](Self::file_index).
    pub fn out_index(&self, file_index: ChannelIndex, channel_count: usize) -> Option<usize> {
        let count = self.indices.len().min(channel_count);

        if let Some(position) = self.indices[..count].iter().position(|&i| i == file_index) {
            return Some(position);
        }

        if count as ChannelIndex <= file_index && file_index < channel_count as ChannelIndex {
            return Some(file_index as usize);
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_index_explicit_entries() {
        let mapping = ChannelMapping::new(vec![2, 0]);
        assert_eq!(mapping.file_index(0, 2), Some(2));
        assert_eq!(mapping.file_index(1, 2), Some(0));
    }

    #[test]
    fn test_file_index_identity_fallback() {
        let mapping = ChannelMapping::new(vec![2, 0]);
        assert_eq!(mapping.file_index(5, 6), Some(5));
    }

    #[test]
    fn test_file_index_beyond_channel_count() {
        let mapping = ChannelMapping::new(vec![2, 0]);
        assert_eq!(mapping.file_index(2, 2), None);
        assert_eq!(ChannelMapping::default().file_index(0, 0), None);
    }

    #[test]
    fn test_out_index_inverts_file_index() {
        let mapping = ChannelMapping::new(vec![2, 0]);
        assert_eq!(mapping.out_index(2, 2), Some(0));
        assert_eq!(mapping.out_index(0, 2), Some(1));
        assert_eq!(mapping.out_index(1, 2), None);
    }

    #[test]
    fn test_out_index_identity_fallback() {
        let mapping = ChannelMapping::new(vec![1]);
        assert_eq!(mapping.out_index(1, 3), Some(0));
        assert_eq!(mapping.out_index(2, 3), Some(2));
        assert_eq!(mapping.out_index(3, 3), None);
        assert_eq!(mapping.out_index(-1, 3), None);
    }

    #[test]
    fn test_out_index_ignores_entries_past_channel_count() {
        let mapping = ChannelMapping::new(vec![0, 7]);
        assert_eq!(mapping.out_index(7, 1), None);
    }
}
