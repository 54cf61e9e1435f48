use serde::{Deserialize, Serialize};

/// A half-open range of integer frames, `start..end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameRange {
    pub start: u64,
    pub end: u64,
}

impl FrameRange {
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    /// Number of frames in the range.
    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, frame: u64) -> bool {
        frame >= self.start && frame < self.end
    }

    /// Ascending iterator over the frames.
    pub fn frames(&self) -> std::ops::Range<u64> {
        self.start..self.end
    }
}

impl std::fmt::Display for FrameRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_len_and_contains() {
        let r = FrameRange::new(10, 15);
        assert_eq!(r.len(), 5);
        assert!(r.contains(10));
        assert!(!r.contains(15));
        assert_eq!(r.frames().collect::<Vec<_>>(), vec![10, 11, 12, 13, 14]);
    }

    #[test]
    fn test_inverted_range_is_empty() {
        let r = FrameRange::new(20, 5);
        assert!(r.is_empty());
        assert_eq!(r.frames().count(), 0);
    }
}
