/// Two-phase brute force over the 256 single-byte keys
///
/// Phase 1 decodes only the leading chunk with every key and keeps the keys
/// whose chunk scores positive. Phase 2 decodes the whole buffer for the best
/// of those and confirms them with the full quality analysis. The true best
/// full-file key can in principle fall outside the phase-1 finalists; that is
/// the price of scoring 256 chunks instead of 256 whole files.
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use serde::Serialize;
use thiserror::Error;

use crate::chunk::score_chunk;
use crate::quality::{QualityReport, analyze};
use crate::report::format_key;
use crate::xor::xor_bytes;

/// Buffers shorter than this are not worth a key search
pub const MIN_DISCOVERY_LEN: usize = 100;

pub const DEFAULT_CHUNK_SIZE: usize = 4096;
pub const MIN_CHUNK_SIZE: usize = 512;
pub const MAX_CHUNK_SIZE: usize = 32768;

/// Runner-up keys confirmed in with-alternates mode unless told otherwise
pub const DEFAULT_ALTERNATES: usize = 3;

/// Clamps a requested chunk size into `MIN_CHUNK_SIZE..=MAX_CHUNK_SIZE`
pub fn clamp_chunk_size(requested: usize) -> usize {
    requested.clamp(MIN_CHUNK_SIZE, MAX_CHUNK_SIZE)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscoveryConfig {
    /// Leading bytes scored in phase 1; callers clamp it first
    pub chunk_size: usize,
    /// `None` confirms only the top chunk key; `Some(n)` confirms the top `n + 1`
    pub alternates: Option<usize>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            alternates: None,
        }
    }
}

impl DiscoveryConfig {
    pub fn with_alternates(self, count: usize) -> Self {
        Self {
            alternates: Some(count),
            ..self
        }
    }

    /// How many phase-1 keys get a full-file check
    pub fn finalist_count(&self) -> usize {
        self.alternates.map_or(1, |n| n + 1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChunkScore {
    pub key: u8,
    pub score: u64,
}

/// A key confirmed by the full-file analysis
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub key: u8,
    pub report: QualityReport,
    pub decoded_len: usize,
}

impl Candidate {
    pub fn score(&self) -> u64 {
        self.report.score
    }
}

/// Outcome of a successful search. Always holds at least one candidate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Discovery {
    ranking: Vec<ChunkScore>,
    candidates: Vec<Candidate>,
}

impl Discovery {
    /// Every key that scored positive in phase 1, best first
    pub fn ranking(&self) -> &[ChunkScore] {
        &self.ranking
    }

    /// Confirmed candidates, best first
    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn best(&self) -> &Candidate {
        &self.candidates[0]
    }

    /// Confirmed candidates after the best one
    pub fn alternates(&self) -> &[Candidate] {
        &self.candidates[1..]
    }
}

/// Why a search produced no key
#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("error reading {}: {}", .path.display(), .source)]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("file very small ({len} bytes)")]
    TooSmall { len: usize },

    #[error("no promising keys found in chunk analysis")]
    NoChunkCandidates,

    #[error("none of the top {tried} chunk key(s) passed full validation")]
    NoConfirmedCandidates { tried: usize },
}

/// Phase 1: scores the leading `chunk_size` bytes under every key.
///
/// Only positive scores are kept, sorted best first; equal scores keep
/// ascending key order.
pub fn rank_keys(data: &[u8], chunk_size: usize) -> Vec<ChunkScore> {
    let chunk = &data[..data.len().min(chunk_size)];
    let mut ranking = Vec::new();

    for key in 0..=u8::MAX {
        if key % 64 == 0 {
            debug!(
                "  Scoring keys {}-{}...",
                format_key(key),
                format_key(key.saturating_add(63))
            );
        }

        let score = score_chunk(&xor_bytes(chunk, key));
        if score > 0 {
            ranking.push(ChunkScore { key, score });
        }
    }

    ranking.sort_by(|a, b| b.score.cmp(&a.score));
    ranking
}

/// Phase 2: decodes the whole buffer for each finalist and keeps the ones
/// with a positive full score, best first
pub fn confirm(data: &[u8], finalists: &[ChunkScore]) -> Vec<Candidate> {
    let mut candidates: Vec<Candidate> = finalists
        .iter()
        .filter_map(|finalist| {
            debug!(
                "  Analyzing key {} (chunk_score={})...",
                format_key(finalist.key),
                finalist.score
            );

            let decoded = xor_bytes(data, finalist.key);
            let report = analyze(&decoded);
            (report.score > 0).then(|| Candidate {
                key: finalist.key,
                report,
                decoded_len: decoded.len(),
            })
        })
        .collect();

    candidates.sort_by(|a, b| b.score().cmp(&a.score()));
    candidates
}

/// Searches `data` for its XOR key
pub fn discover(data: &[u8], config: &DiscoveryConfig) -> Result<Discovery, DiscoveryError> {
    if data.len() < MIN_DISCOVERY_LEN {
        warn!("File very small ({} bytes)", data.len());
        return Err(DiscoveryError::TooSmall { len: data.len() });
    }

    info!("File size: {} bytes", data.len());
    info!("Phase 1: Scoring chunks with all XOR keys...");

    let ranking = rank_keys(data, config.chunk_size);
    info!("Phase 1 complete: {} keys with positive scores", ranking.len());

    if ranking.is_empty() {
        warn!("No promising keys found in chunk analysis");
        return Err(DiscoveryError::NoChunkCandidates);
    }

    let finalists = &ranking[..ranking.len().min(config.finalist_count())];
    match config.alternates {
        None => info!(
            "Phase 2: Full analysis of best key {} (chunk_score={})",
            format_key(finalists[0].key),
            finalists[0].score
        ),
        Some(_) => info!("Phase 2: Full analysis of top {} keys...", finalists.len()),
    }

    let candidates = confirm(data, finalists);
    if candidates.is_empty() {
        warn!("Phase 2 rejected every finalist");
        return Err(DiscoveryError::NoConfirmedCandidates {
            tried: finalists.len(),
        });
    }

    let best = &candidates[0];
    info!(
        "Best key confirmed: {} (full_score={}, MP3_syncs={})",
        format_key(best.key),
        best.score(),
        best.report.sync_count
    );

    Ok(Discovery {
        ranking,
        candidates,
    })
}

/// Reads `path` and searches it for its XOR key
pub fn discover_file(path: &Path, config: &DiscoveryConfig) -> Result<Discovery, DiscoveryError> {
    let name = path
        .file_name()
        .map(|s| s.to_string_lossy())
        .unwrap_or_else(|| path.to_string_lossy());
    info!("Analyzing: {}", name);

    let data = fs::read(path).map_err(|source| {
        warn!("Error reading file: {}", source);
        DiscoveryError::Unreadable {
            path: path.to_path_buf(),
            source,
        }
    })?;

    discover(&data, config)
}
