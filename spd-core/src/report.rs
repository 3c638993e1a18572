/// Console rendering of discovery results
///
/// Line formats are kept stable for scripts that scrape the output:
/// keys are `0x` plus two uppercase hex digits, scores are plain integers.
use std::fmt::Write;

use crate::batch::{BatchReport, FileOutcome};
use crate::discovery::{Candidate, ChunkScore};
use crate::quality::QualityReport;

pub fn format_key(key: u8) -> String {
    format!("0x{:02X}", key)
}

pub fn chunk_line(rank: usize, entry: &ChunkScore) -> String {
    format!("  {}. Key {}: chunk_score={}", rank, format_key(entry.key), entry.score)
}

pub fn candidate_line(rank: usize, candidate: &Candidate) -> String {
    format!(
        "  {}. Key {}: Score={:3}, MP3_syncs={:2}, Header={}",
        rank,
        format_key(candidate.key),
        candidate.score(),
        candidate.report.sync_count,
        if candidate.report.valid_header() { "✓" } else { "✗" }
    )
}

pub fn validation_line(report: &QualityReport) -> String {
    format!(
        "Validation: Score={}, MP3_syncs={}, Valid_header={}",
        report.score,
        report.sync_count,
        if report.valid_header() { "True" } else { "False" }
    )
}

pub fn file_result_line(name: &str, outcome: &FileOutcome) -> String {
    match outcome.best() {
        Some(best) => format!("  {:30} -> {} (score: {})", name, format_key(best.key), best.score()),
        None => format!("  {:30} -> FAILED", name),
    }
}

/// Multi-line dump of a quality report
pub fn render_quality(report: &QualityReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Score: {}", report.score);
    let _ = writeln!(out, "File size: {} bytes", report.file_size);
    let _ = writeln!(out, "MP3 syncs: {}", report.sync_count);
    let _ = writeln!(out, "First sync offsets: {:?}", report.sync_offsets);
    match &report.header {
        Some(header) => {
            let _ = writeln!(
                out,
                "Header: valid (mpeg_version={}, layer={}, bitrate_index={}, sample_rate_index={})",
                header.mpeg_version, header.layer, header.bitrate_index, header.sample_rate_index
            );
        }
        None => {
            let _ = writeln!(out, "Header: invalid");
        }
    }
    let _ = writeln!(
        out,
        "Sample: {} unique bytes, max frequency {}",
        report.sample_unique_bytes, report.sample_max_frequency
    );
    let _ = writeln!(out, "ID3: {}  RIFF: {}", report.has_id3, report.has_riff);
    if let Some(distance) = report.average_frame_distance {
        let _ = writeln!(out, "Average frame distance: {:.1}", distance);
    }
    out
}

/// Timing, per-file results, statistics and key analysis of a batch run
pub fn render_batch_summary(report: &BatchReport) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "TIMING: Total processing time: {:.1} seconds", report.total_secs);
    let _ = writeln!(out, "Average per file: {:.1} seconds", report.average_secs());

    let _ = writeln!(out, "\nKEY DISCOVERY SUMMARY:");
    for entry in report.files.values() {
        let _ = writeln!(out, "{}", file_result_line(&entry.name(), &entry.outcome));
    }

    let _ = writeln!(out, "\nSTATISTICS:");
    let _ = writeln!(out, "  Files processed: {}", report.processed());
    let _ = writeln!(out, "  Successful: {}", report.successful());
    let _ = writeln!(out, "  Failed: {}", report.failed());
    let _ = writeln!(out, "  Success rate: {:.1}%", report.success_rate());

    let Some(patterns) = &report.patterns else {
        return out;
    };

    let found: Vec<String> = patterns
        .distinct
        .iter()
        .map(|key| format!("'{:#x}'", key))
        .collect();

    let _ = writeln!(out, "\nKEY ANALYSIS:");
    let _ = writeln!(out, "  Keys found: [{}]", found.join(", "));
    let _ = writeln!(out, "  Unique keys: {}", patterns.distinct.len());
    let _ = writeln!(
        out,
        "  Range: {} - {}",
        format_key(patterns.min),
        format_key(patterns.max)
    );

    if patterns.same_key {
        let _ = writeln!(out, "  PATTERN: All files use the SAME key!");
    } else if patterns.all_distinct {
        let _ = writeln!(out, "  PATTERN: Every file uses a DIFFERENT key!");
    } else {
        let _ = writeln!(out, "  PATTERN: Mixed - some files share keys");
    }

    if patterns.distinct.len() > 1 {
        if let Some(step) = patterns.sequential_step {
            let _ = writeln!(out, "  PATTERN: Keys are SEQUENTIAL with step {}!", step);
        }

        let _ = writeln!(out, "  Key distribution:");
        for (key, count) in &patterns.histogram {
            let _ = writeln!(out, "    {}: {} files", format_key(*key), count);
        }
    }

    out
}
