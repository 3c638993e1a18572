//! core functionality for recovering the single-byte XOR key
//! of Storypod audio payloads
//!
//! # Modules
//!
//! - `xor`: the self-inverse single-byte XOR transform
//! - `scoring`: frame-sync predicate, byte statistics and the named-rule fold
//! - `chunk`: cheap heuristic over the leading chunk of a buffer
//! - `quality`: exhaustive heuristic over a whole decoded buffer
//! - `discovery`: two-phase brute force over the 256-key space
//! - `decrypt`: applies a confirmed key to a file and re-validates it
//! - `batch`: sequential discovery over many files and cross-file key patterns
//! - `report`: console rendering of candidates and batch summaries

pub mod batch;
pub mod chunk;
pub mod decrypt;
pub mod discovery;
pub mod quality;
pub mod report;
pub mod scoring;
pub mod xor;

#[cfg(test)]
mod testutil;

// Re-export commonly used items
pub use batch::{BATCH_ALTERNATES, BatchReport, FileEntry, FileOutcome, KeyPatterns, run_batch};
pub use chunk::score_chunk;
pub use decrypt::{DecryptSummary, decrypt_file};
pub use discovery::{
    Candidate, ChunkScore, DEFAULT_ALTERNATES, DEFAULT_CHUNK_SIZE, Discovery, DiscoveryConfig,
    DiscoveryError, MAX_CHUNK_SIZE, MIN_CHUNK_SIZE, MIN_DISCOVERY_LEN, clamp_chunk_size, discover,
    discover_file,
};
pub use quality::{FrameHeader, QualityReport, analyze};
pub use report::format_key;
pub use xor::xor_bytes;
