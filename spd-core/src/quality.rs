/// Exhaustive quality heuristic over a whole decoded buffer
///
/// Used to confirm the finalists of the chunk phase and to re-validate
/// written output. The result is a fixed-shape [`QualityReport`]; the
/// MPEG header fields only exist when the buffer starts with a frame sync.
use serde::Serialize;

use crate::scoring::{
    ByteStats, MIN_SCORING_LEN, Rule, breakdown, floor_score, is_frame_sync, raw_total,
    sync_offsets,
};

/// Number of sync offsets kept in a report
pub const RECORDED_SYNCS: usize = 10;

const ENTROPY_SAMPLE: usize = 1000;

/// Fields of the MPEG audio frame header at offset 0
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FrameHeader {
    pub mpeg_version: u8,
    pub layer: u8,
    pub bitrate_index: u8,
    pub sample_rate_index: u8,
}

impl FrameHeader {
    /// Reads the header at the start of `data`.
    ///
    /// Returns `None` when there is no frame sync at offset 0 or fewer than
    /// four bytes to read from.
    pub fn parse(data: &[u8]) -> Option<Self> {
        let &[b0, b1, b2, _] = data.get(..4)? else {
            return None;
        };
        if !is_frame_sync(b0, b1) {
            return None;
        }

        Some(Self {
            mpeg_version: (b1 >> 3) & 0x03,
            layer: (b1 >> 1) & 0x03,
            bitrate_index: (b2 >> 4) & 0x0F,
            sample_rate_index: (b2 >> 2) & 0x03,
        })
    }

    /// Index 0 is "free" and 15 is reserved
    pub fn has_valid_bitrate(&self) -> bool {
        (1..=14).contains(&self.bitrate_index)
    }

    /// Index 3 is reserved
    pub fn has_valid_sample_rate(&self) -> bool {
        self.sample_rate_index <= 2
    }
}

/// Measured properties of a decoded buffer, scored by `FULL_RULES`
#[derive(Debug, Clone, PartialEq)]
pub struct FullFacts {
    pub len: usize,
    pub sync_count: usize,
    pub sync_offsets: Vec<usize>,
    pub header: Option<FrameHeader>,
    pub sample: ByteStats,
    pub has_id3: bool,
    pub has_riff: bool,
}

impl FullFacts {
    pub fn measure(data: &[u8]) -> Self {
        let mut sync_count = 0;
        let mut recorded = Vec::with_capacity(RECORDED_SYNCS);
        for offset in sync_offsets(data) {
            sync_count += 1;
            if recorded.len() < RECORDED_SYNCS {
                recorded.push(offset);
            }
        }

        Self {
            len: data.len(),
            sync_count,
            sync_offsets: recorded,
            header: FrameHeader::parse(data),
            sample: ByteStats::of(&data[..data.len().min(ENTROPY_SAMPLE)]),
            has_id3: data.starts_with(b"ID3"),
            has_riff: data.starts_with(b"RIFF"),
        }
    }

    /// Mean gap between consecutive recorded syncs, given at least two
    pub fn average_frame_distance(&self) -> Option<f64> {
        if self.sync_count < 2 || self.sync_offsets.len() < 2 {
            return None;
        }
        let gaps: usize = self.sync_offsets.windows(2).map(|w| w[1] - w[0]).sum();
        Some(gaps as f64 / (self.sync_offsets.len() - 1) as f64)
    }

    /// Spread of the recorded syncs: (last - first) / (recorded - 1)
    fn sync_spread(&self) -> Option<f64> {
        match self.sync_offsets.as_slice() {
            [first, .., last] if self.sync_count > 1 => {
                Some((last - first) as f64 / (self.sync_offsets.len() - 1) as f64)
            }
            _ => None,
        }
    }
}

fn sync_count_points(facts: &FullFacts) -> i64 {
    facts.sync_count as i64 * 20
}

fn sync_spread_points(facts: &FullFacts) -> i64 {
    match facts.sync_spread() {
        Some(spread) if spread > 100.0 && spread < 5000.0 => 50,
        _ => 0,
    }
}

fn header_points(facts: &FullFacts) -> i64 {
    if facts.header.is_some() { 200 } else { 0 }
}

fn bitrate_points(facts: &FullFacts) -> i64 {
    match facts.header {
        Some(header) if header.has_valid_bitrate() => 30,
        _ => 0,
    }
}

fn sample_rate_points(facts: &FullFacts) -> i64 {
    match facts.header {
        Some(header) if header.has_valid_sample_rate() => 30,
        _ => 0,
    }
}

fn plausible_size_points(facts: &FullFacts) -> i64 {
    if facts.len > 10_000 && facts.len < 50_000_000 { 20 } else { 0 }
}

// Overlaps with the plausible range; both bonuses can apply.
fn typical_size_points(facts: &FullFacts) -> i64 {
    if facts.len > 50_000 && facts.len < 10_000_000 { 50 } else { 0 }
}

fn uniformity_points(facts: &FullFacts) -> i64 {
    let uniformity = facts.sample.uniformity();
    if uniformity > 0.4 {
        -100
    } else if uniformity < 0.02 {
        -50
    } else {
        20
    }
}

fn variety_points(facts: &FullFacts) -> i64 {
    if facts.sample.unique > 50 && facts.sample.unique < 200 { 30 } else { 0 }
}

fn id3_points(facts: &FullFacts) -> i64 {
    if facts.has_id3 { 100 } else { 0 }
}

fn riff_points(facts: &FullFacts) -> i64 {
    if facts.has_riff { 100 } else { 0 }
}

fn frame_consistency_points(facts: &FullFacts) -> i64 {
    match facts.average_frame_distance() {
        Some(distance) if distance > 100.0 && distance < 2000.0 => 40,
        _ => 0,
    }
}

pub const FULL_RULES: [Rule<FullFacts>; 12] = [
    Rule { name: "sync_count", eval: sync_count_points },
    Rule { name: "sync_spread", eval: sync_spread_points },
    Rule { name: "header_sync", eval: header_points },
    Rule { name: "header_bitrate", eval: bitrate_points },
    Rule { name: "header_sample_rate", eval: sample_rate_points },
    Rule { name: "plausible_size", eval: plausible_size_points },
    Rule { name: "typical_size", eval: typical_size_points },
    Rule { name: "uniformity", eval: uniformity_points },
    Rule { name: "byte_variety", eval: variety_points },
    Rule { name: "id3_magic", eval: id3_points },
    Rule { name: "riff_magic", eval: riff_points },
    Rule { name: "frame_consistency", eval: frame_consistency_points },
];

/// Structured result of [`analyze`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityReport {
    pub score: u64,
    pub sync_count: usize,
    pub sync_offsets: Vec<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<FrameHeader>,
    pub file_size: usize,
    pub sample_unique_bytes: usize,
    pub sample_max_frequency: usize,
    pub has_id3: bool,
    pub has_riff: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_frame_distance: Option<f64>,
}

impl QualityReport {
    /// Report for buffers too short to analyze
    pub fn empty(file_size: usize) -> Self {
        Self {
            score: 0,
            sync_count: 0,
            sync_offsets: Vec::new(),
            header: None,
            file_size,
            sample_unique_bytes: 0,
            sample_max_frequency: 0,
            has_id3: false,
            has_riff: false,
            average_frame_distance: None,
        }
    }

    pub fn valid_header(&self) -> bool {
        self.header.is_some()
    }

    fn from_facts(facts: FullFacts, score: u64) -> Self {
        let average_frame_distance = facts.average_frame_distance();
        Self {
            score,
            sync_count: facts.sync_count,
            sync_offsets: facts.sync_offsets,
            header: facts.header,
            file_size: facts.len,
            sample_unique_bytes: facts.sample.unique,
            sample_max_frequency: facts.sample.max_count,
            has_id3: facts.has_id3,
            has_riff: facts.has_riff,
            average_frame_distance,
        }
    }
}

/// Scores a whole decoded buffer
pub fn analyze(data: &[u8]) -> QualityReport {
    if data.len() < MIN_SCORING_LEN {
        return QualityReport::empty(data.len());
    }

    let facts = FullFacts::measure(data);
    let score = floor_score(raw_total(&FULL_RULES, &facts));
    QualityReport::from_facts(facts, score)
}

/// Non-zero rule contributions for `data`, in rule order
pub fn score_breakdown(data: &[u8]) -> Vec<(&'static str, i64)> {
    if data.len() < MIN_SCORING_LEN {
        return Vec::new();
    }
    breakdown(&FULL_RULES, &FullFacts::measure(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{FRAME_HEADER, synthetic_mp3};
    use crate::xor::xor_bytes;

    fn facts_of_len(len: usize) -> FullFacts {
        FullFacts {
            len,
            sync_count: 0,
            sync_offsets: Vec::new(),
            header: None,
            sample: ByteStats::default(),
            has_id3: false,
            has_riff: false,
        }
    }

    #[test]
    fn test_short_buffer_gives_empty_report() {
        let report = analyze(&[0xFF, 0xFB, 0x90]);
        assert_eq!(report, QualityReport::empty(3));
        assert!(!report.valid_header());
        assert!(score_breakdown(&[0xFF; 9]).is_empty());
    }

    #[test]
    fn test_header_fields() {
        let header = FrameHeader::parse(&FRAME_HEADER).unwrap();
        assert_eq!(
            header,
            FrameHeader {
                mpeg_version: 3,
                layer: 1,
                bitrate_index: 9,
                sample_rate_index: 0,
            }
        );
        assert!(header.has_valid_bitrate());
        assert!(header.has_valid_sample_rate());

        assert_eq!(FrameHeader::parse(&[0xFF, 0xFB, 0x90]), None);
        assert_eq!(FrameHeader::parse(&[0xFE, 0xFB, 0x90, 0x00]), None);

        let reserved = FrameHeader::parse(&[0xFF, 0xFB, 0xFC, 0x00]).unwrap();
        assert!(!reserved.has_valid_bitrate());
        assert!(!reserved.has_valid_sample_rate());
    }

    #[test]
    fn test_leading_sync_earns_header_bonus() {
        let mut data = vec![0u8; 64];
        data[..4].copy_from_slice(&[0xFF, 0xE0, 0x00, 0x00]);
        let hits = score_breakdown(&data);
        assert!(hits.contains(&("header_sync", 200)));
        assert!(!hits.iter().any(|(name, _)| *name == "header_bitrate"));
        assert!(hits.contains(&("header_sample_rate", 30)));
        assert!(analyze(&data).valid_header());
    }

    #[test]
    fn test_size_bonuses_overlap() {
        assert_eq!(plausible_size_points(&facts_of_len(10_000)), 0);
        assert_eq!(plausible_size_points(&facts_of_len(10_001)), 20);
        assert_eq!(typical_size_points(&facts_of_len(50_000)), 0);

        let both = facts_of_len(60_000);
        assert_eq!(plausible_size_points(&both) + typical_size_points(&both), 70);

        assert_eq!(typical_size_points(&facts_of_len(10_000_000)), 0);
        assert_eq!(plausible_size_points(&facts_of_len(10_000_000)), 20);
    }

    #[test]
    fn test_uniformity_thresholds() {
        let mut facts = facts_of_len(1000);
        facts.sample = ByteStats { len: 1000, unique: 3, max_count: 401 };
        assert_eq!(uniformity_points(&facts), -100);
        facts.sample.max_count = 400;
        assert_eq!(uniformity_points(&facts), 20);
        facts.sample.max_count = 19;
        assert_eq!(uniformity_points(&facts), -50);
        facts.sample.max_count = 20;
        assert_eq!(uniformity_points(&facts), 20);
    }

    #[test]
    fn test_frame_distance_rules() {
        let mut facts = facts_of_len(20_000);
        facts.sync_count = 1;
        facts.sync_offsets = vec![0];
        assert_eq!(facts.average_frame_distance(), None);
        assert_eq!(sync_spread_points(&facts), 0);

        facts.sync_count = 40;
        facts.sync_offsets = vec![0, 400, 1000];
        assert_eq!(facts.average_frame_distance(), Some(500.0));
        assert_eq!(sync_spread_points(&facts), 50);
        assert_eq!(frame_consistency_points(&facts), 40);

        facts.sync_offsets = vec![0, 3000, 6000];
        assert_eq!(sync_spread_points(&facts), 50);
        assert_eq!(frame_consistency_points(&facts), 0);
    }

    #[test]
    fn test_sync_count_matches_independent_recount() {
        let mut state: u32 = 0x1234_5678;
        let data: Vec<u8> = (0..20_000)
            .map(|_| {
                state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                (state >> 24) as u8
            })
            .collect();

        let mut expected = 0;
        for i in 0..data.len() - 1 {
            if data[i] == 0xFF && data[i + 1] & 0xE0 == 0xE0 {
                expected += 1;
            }
        }

        let report = analyze(&data);
        assert_eq!(report.sync_count, expected);
        assert!(report.sync_offsets.len() <= RECORDED_SYNCS);
        assert!(report.sync_offsets.iter().all(|&i| data[i] == 0xFF));
    }

    #[test]
    fn test_synthetic_stream_report() {
        let data = synthetic_mp3(2000, &[0, 600, 1200], 31);
        let report = analyze(&data);

        assert_eq!(report.sync_count, 3);
        assert_eq!(report.sync_offsets, vec![0, 600, 1200]);
        assert_eq!(report.average_frame_distance, Some(600.0));
        assert!(report.valid_header());
        assert!(!report.has_id3);
        // 3 syncs, spread, header, bitrate, sample rate, frame consistency,
        // minus the near-random entropy penalty
        assert_eq!(report.score, 60 + 50 + 200 + 30 + 30 + 40 - 50);
    }

    #[test]
    fn test_riff_and_id3_magic() {
        let mut data = synthetic_mp3(2000, &[], 5);
        data[..4].copy_from_slice(b"RIFF");
        let report = analyze(&data);
        assert!(report.has_riff);
        assert!(!report.has_id3);
        assert_eq!(report.score, 100 + 20);

        data[..4].copy_from_slice(b"ID3\x04");
        let report = analyze(&data);
        assert!(report.has_id3);
        assert_eq!(report.score, 100 + 20);
    }

    #[test]
    fn test_repeated_byte_scores_zero_unless_it_decodes_to_sync() {
        let data = vec![0x5Au8; 10_000];
        for key in 0..=u8::MAX {
            let report = analyze(&xor_bytes(&data, key));
            if 0x5A ^ key == 0xFF {
                assert_eq!(report.sync_count, 9_999);
            } else {
                assert_eq!(report.score, 0, "key 0x{:02X}", key);
                assert_eq!(report.sample_max_frequency, 1000);
            }
        }
    }

    #[test]
    fn test_score_never_negative() {
        let ramp: Vec<u8> = (0..=255).collect();
        let samples: [&[u8]; 3] = [&[0u8; 10], &[0x80u8; 500], &ramp];
        for data in samples {
            let raw = raw_total(&FULL_RULES, &FullFacts::measure(data));
            assert!(raw < 0);
            assert_eq!(analyze(data).score, 0);
        }
    }
}
