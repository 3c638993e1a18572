/// Cheap quality heuristic over the leading chunk of a decoded buffer
///
/// Phase 1 of key discovery runs this for all 256 keys, so it only looks
/// at a bounded window and never allocates per rule.
use crate::scoring::{ByteStats, MIN_SCORING_LEN, Rule, floor_score, raw_total, sync_offsets};

/// Container magic searched near the start of a chunk
pub struct Magic {
    pub tag: &'static [u8],
    pub points: i64,
}

pub const CONTAINER_MAGIC: [Magic; 5] = [
    Magic { tag: b"ID3", points: 150 },
    Magic { tag: b"RIFF", points: 120 },
    Magic { tag: b"fLaC", points: 120 },
    Magic { tag: b"OggS", points: 120 },
    Magic { tag: b"FORM", points: 100 },
];

/// Magic may start anywhere before this offset
const MAGIC_WINDOW: usize = 32;

/// Entropy is sampled over at most this many leading bytes
const ENTROPY_SAMPLE: usize = 512;

/// What the chunk rules look at
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkFacts {
    pub sync_count: usize,
    pub sync_at_start: bool,
    /// Parallel to `CONTAINER_MAGIC`
    pub magic_found: [bool; 5],
    pub sample: ByteStats,
}

impl ChunkFacts {
    pub fn measure(chunk: &[u8]) -> Self {
        let mut sync_count = 0;
        let mut sync_at_start = false;
        for offset in sync_offsets(chunk) {
            sync_count += 1;
            sync_at_start |= offset == 0;
        }

        Self {
            sync_count,
            sync_at_start,
            magic_found: CONTAINER_MAGIC.map(|magic| find_magic(chunk, magic.tag)),
            sample: ByteStats::of(&chunk[..chunk.len().min(ENTROPY_SAMPLE)]),
        }
    }
}

/// Looks for `tag` starting at any offset in `0..min(len - tag.len(), 32)`
fn find_magic(chunk: &[u8], tag: &[u8]) -> bool {
    let last = chunk.len().saturating_sub(tag.len()).min(MAGIC_WINDOW);
    (0..last).any(|offset| &chunk[offset..offset + tag.len()] == tag)
}

fn frame_sync_points(facts: &ChunkFacts) -> i64 {
    let start_bonus = if facts.sync_at_start { 50 } else { 0 };
    facts.sync_count as i64 * 100 + start_bonus
}

fn container_magic_points(facts: &ChunkFacts) -> i64 {
    CONTAINER_MAGIC
        .iter()
        .zip(facts.magic_found)
        .filter(|(_, found)| *found)
        .map(|(magic, _)| magic.points)
        .sum()
}

fn uniformity_points(facts: &ChunkFacts) -> i64 {
    let uniformity = facts.sample.uniformity();
    if uniformity > 0.5 {
        -50
    } else if uniformity > 0.3 {
        -20
    } else {
        10
    }
}

fn variety_points(facts: &ChunkFacts) -> i64 {
    if facts.sample.unique > 20 && facts.sample.unique < 200 { 20 } else { 0 }
}

pub const CHUNK_RULES: [Rule<ChunkFacts>; 4] = [
    Rule { name: "frame_sync", eval: frame_sync_points },
    Rule { name: "container_magic", eval: container_magic_points },
    Rule { name: "uniformity", eval: uniformity_points },
    Rule { name: "byte_variety", eval: variety_points },
];

/// Scores a decoded chunk; never negative, zero for chunks under 10 bytes
pub fn score_chunk(chunk: &[u8]) -> u64 {
    if chunk.len() < MIN_SCORING_LEN {
        return 0;
    }
    floor_score(raw_total(&CHUNK_RULES, &ChunkFacts::measure(chunk)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{FRAME_HEADER, alternating, filler};
    use crate::xor::xor_bytes;

    fn facts(sample: ByteStats) -> ChunkFacts {
        ChunkFacts {
            sync_count: 0,
            sync_at_start: false,
            magic_found: [false; 5],
            sample,
        }
    }

    #[test]
    fn test_short_chunks_score_zero() {
        assert_eq!(score_chunk(&[]), 0);
        assert_eq!(score_chunk(&[0xFF, 0xFB, 0xFF, 0xFB, 0xFF, 0xFB, 0xFF, 0xFB, 0xFF]), 0);
    }

    #[test]
    fn test_frame_sync_rule() {
        let mut f = facts(ByteStats::default());
        f.sync_count = 3;
        assert_eq!(frame_sync_points(&f), 300);
        f.sync_at_start = true;
        assert_eq!(frame_sync_points(&f), 350);
    }

    #[test]
    fn test_measure_counts_every_sync() {
        let mut chunk = vec![0u8; 64];
        chunk[..4].copy_from_slice(&FRAME_HEADER);
        chunk[40] = 0xFF;
        chunk[41] = 0xE2;
        let f = ChunkFacts::measure(&chunk);
        assert_eq!(f.sync_count, 2);
        assert!(f.sync_at_start);
    }

    #[test]
    fn test_magic_counts_once_per_tag() {
        let mut chunk = vec![0u8; 64];
        chunk[..3].copy_from_slice(b"ID3");
        chunk[10..13].copy_from_slice(b"ID3");
        chunk[20..24].copy_from_slice(b"OggS");
        let f = ChunkFacts::measure(&chunk);
        assert_eq!(f.magic_found, [true, false, false, true, false]);
        assert_eq!(container_magic_points(&f), 270);
    }

    #[test]
    fn test_magic_window_is_first_32_offsets() {
        let mut chunk = vec![0u8; 64];
        chunk[31..35].copy_from_slice(b"fLaC");
        assert!(find_magic(&chunk, b"fLaC"));

        let mut late = vec![0u8; 64];
        late[32..36].copy_from_slice(b"fLaC");
        assert!(!find_magic(&late, b"fLaC"));

        // a tag ending exactly at the end of the chunk is outside the search range
        assert!(!find_magic(b"xxxxxxRIFF", b"RIFF"));
        assert!(find_magic(b"RIFFxxxxxx", b"RIFF"));
    }

    #[test]
    fn test_uniformity_rule_thresholds() {
        let sample = |max_count| ByteStats { len: 100, unique: 5, max_count };
        assert_eq!(uniformity_points(&facts(sample(51))), -50);
        assert_eq!(uniformity_points(&facts(sample(50))), -20);
        assert_eq!(uniformity_points(&facts(sample(31))), -20);
        assert_eq!(uniformity_points(&facts(sample(30))), 10);
    }

    #[test]
    fn test_variety_rule_is_exclusive() {
        let sample = |unique| ByteStats { len: 512, unique, max_count: 10 };
        assert_eq!(variety_points(&facts(sample(20))), 0);
        assert_eq!(variety_points(&facts(sample(21))), 20);
        assert_eq!(variety_points(&facts(sample(199))), 20);
        assert_eq!(variety_points(&facts(sample(200))), 0);
    }

    #[test]
    fn test_repeated_byte_scores_zero_unless_it_decodes_to_sync() {
        let data = vec![0x41u8; 10_000];
        for key in 0..=u8::MAX {
            let decoded = xor_bytes(&data[..4096], key);
            if decoded[0] == 0xFF {
                // a run of 0xFF is a run of frame syncs
                assert!(score_chunk(&decoded) > 0);
            } else {
                assert_eq!(score_chunk(&decoded), 0, "key 0x{:02X}", key);
            }
        }
    }

    #[test]
    fn test_alternating_buffer_scores_zero_under_every_key() {
        let data = alternating(4096);
        for key in 0..=u8::MAX {
            assert_eq!(score_chunk(&xor_bytes(&data, key)), 0, "key 0x{:02X}", key);
        }
    }

    #[test]
    fn test_mp3_like_chunk() {
        let mut chunk = filler(4096, 5);
        chunk[..4].copy_from_slice(&FRAME_HEADER);
        // one sync at the start, good entropy, moderate variety
        assert_eq!(score_chunk(&chunk), 100 + 50 + 10 + 20);
    }

    #[test]
    fn test_id3_tagged_chunk() {
        let mut chunk = filler(1024, 5);
        chunk[..3].copy_from_slice(b"ID3");
        assert_eq!(score_chunk(&chunk), 150 + 10 + 20);
    }
}
