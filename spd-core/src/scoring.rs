/// Primitives shared by the chunk and full-file heuristics

/// Buffers shorter than this are never scored
pub const MIN_SCORING_LEN: usize = 10;

/// `true` when `a` followed by `b` is an MPEG audio frame sync
/// (0xFF, then a byte with its top three bits set)
#[inline]
pub fn is_frame_sync(a: u8, b: u8) -> bool {
    a == 0xFF && (b & 0xE0) == 0xE0
}

/// Offsets of every frame sync in `data`, in ascending order
pub fn sync_offsets(data: &[u8]) -> impl Iterator<Item = usize> + '_ {
    data.windows(2)
        .enumerate()
        .filter(|(_, w)| is_frame_sync(w[0], w[1]))
        .map(|(i, _)| i)
}

/// Byte frequency summary of a sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ByteStats {
    pub len: usize,
    pub unique: usize,
    pub max_count: usize,
}

impl ByteStats {
    pub fn of(sample: &[u8]) -> Self {
        let mut histogram = [0usize; 256];
        for &byte in sample {
            histogram[byte as usize] += 1;
        }

        Self {
            len: sample.len(),
            unique: histogram.iter().filter(|&&c| c > 0).count(),
            max_count: histogram.iter().copied().max().unwrap_or(0),
        }
    }

    /// Fraction of the sample taken by its most frequent byte
    pub fn uniformity(&self) -> f64 {
        if self.len == 0 {
            return 0.0;
        }
        self.max_count as f64 / self.len as f64
    }
}

/// A named scoring rule over measured facts `C`.
///
/// `eval` returns the points the rule contributes, zero when it does not fire.
/// Contributions may be negative; only the folded total is floored.
pub struct Rule<C> {
    pub name: &'static str,
    pub eval: fn(&C) -> i64,
}

/// Sum of every rule's contribution, before flooring
pub fn raw_total<C>(rules: &[Rule<C>], facts: &C) -> i64 {
    rules.iter().map(|rule| (rule.eval)(facts)).sum()
}

/// Per-rule contributions that actually fired
pub fn breakdown<C>(rules: &[Rule<C>], facts: &C) -> Vec<(&'static str, i64)> {
    rules
        .iter()
        .map(|rule| (rule.name, (rule.eval)(facts)))
        .filter(|&(_, points)| points != 0)
        .collect()
}

/// Clamps a raw total at zero
#[inline]
pub fn floor_score(raw: i64) -> u64 {
    raw.max(0) as u64
}
