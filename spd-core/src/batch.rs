/// Sequential key discovery over many files, plus cross-file key patterns
///
/// Each file is read, searched and dropped before the next one starts.
/// A file that cannot be read or yields no key is recorded as a failure and
/// the run moves on.
use indexmap::IndexMap;
use log::{info, warn};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Instant;

use crate::discovery::{Candidate, DiscoveryConfig, discover_file};

/// Runner-up candidates kept per file when alternates are requested
pub const BATCH_ALTERNATES: usize = 2;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileOutcome {
    Found {
        best: Candidate,
        alternates: Vec<Candidate>,
    },
    Failed {
        reason: String,
    },
}

impl FileOutcome {
    pub fn best(&self) -> Option<&Candidate> {
        match self {
            FileOutcome::Found { best, .. } => Some(best),
            FileOutcome::Failed { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileEntry {
    pub path: PathBuf,
    pub outcome: FileOutcome,
    pub elapsed_secs: f64,
}

impl FileEntry {
    /// File name for display, the full path when it has none
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Derived statistics over the best key of every successful file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyPatterns {
    /// Distinct keys, ascending
    pub distinct: Vec<u8>,
    pub min: u8,
    pub max: u8,
    /// Every file resolved to the same key
    pub same_key: bool,
    /// No two files share a key
    pub all_distinct: bool,
    /// Common difference when two or more distinct keys form an arithmetic progression
    pub sequential_step: Option<u8>,
    /// Key -> number of files
    pub histogram: BTreeMap<u8, usize>,
}

impl KeyPatterns {
    /// `None` when no file produced a key
    pub fn from_keys(keys: &[u8]) -> Option<Self> {
        let min = *keys.iter().min()?;
        let max = *keys.iter().max()?;

        let mut histogram = BTreeMap::new();
        for &key in keys {
            *histogram.entry(key).or_insert(0) += 1;
        }
        let distinct: Vec<u8> = histogram.keys().copied().collect();

        let sequential_step = if distinct.len() > 1 {
            let step = distinct[1] - distinct[0];
            distinct
                .windows(2)
                .all(|w| w[1] - w[0] == step)
                .then_some(step)
        } else {
            None
        };

        Some(Self {
            same_key: distinct.len() == 1,
            all_distinct: distinct.len() == keys.len(),
            distinct,
            min,
            max,
            sequential_step,
            histogram,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReport {
    /// Full path -> entry, in processing order
    pub files: IndexMap<String, FileEntry>,
    pub total_secs: f64,
    pub patterns: Option<KeyPatterns>,
}

impl BatchReport {
    pub fn processed(&self) -> usize {
        self.files.len()
    }

    pub fn successful(&self) -> usize {
        self.files.values().filter(|e| e.outcome.best().is_some()).count()
    }

    pub fn failed(&self) -> usize {
        self.processed() - self.successful()
    }

    /// Percentage of files that produced a key
    pub fn success_rate(&self) -> f64 {
        if self.processed() == 0 {
            return 0.0;
        }
        self.successful() as f64 / self.processed() as f64 * 100.0
    }

    pub fn average_secs(&self) -> f64 {
        if self.processed() == 0 {
            return 0.0;
        }
        self.total_secs / self.processed() as f64
    }

    /// Best key of every successful file, in processing order
    pub fn best_keys(&self) -> Vec<u8> {
        self.files
            .values()
            .filter_map(|e| e.outcome.best().map(|c| c.key))
            .collect()
    }
}

/// Runs discovery on each file in order.
///
/// `on_file` sees every entry right after its file is processed, with the
/// 1-based position of the file. Alternates are trimmed to
/// [`BATCH_ALTERNATES`] when `config` requests them. A path listed twice is
/// processed once.
pub fn run_batch<F>(files: &[PathBuf], config: &DiscoveryConfig, mut on_file: F) -> BatchReport
where
    F: FnMut(usize, &FileEntry),
{
    let total_start = Instant::now();
    let mut entries = IndexMap::with_capacity(files.len());

    for (index, path) in files.iter().enumerate() {
        let id = path.display().to_string();
        if entries.contains_key(&id) {
            warn!("Skipping repeated input: {}", id);
            continue;
        }
        info!("[{}/{}] PROCESSING: {}", index + 1, files.len(), id);

        let file_start = Instant::now();
        let outcome = match discover_file(path, config) {
            Ok(discovery) => {
                let alternates = match config.alternates {
                    Some(_) => discovery.alternates().iter().take(BATCH_ALTERNATES).cloned().collect(),
                    None => Vec::new(),
                };
                FileOutcome::Found {
                    best: discovery.best().clone(),
                    alternates,
                }
            }
            Err(err) => FileOutcome::Failed {
                reason: err.to_string(),
            },
        };

        let entry = FileEntry {
            path: path.clone(),
            outcome,
            elapsed_secs: file_start.elapsed().as_secs_f64(),
        };
        on_file(index + 1, &entry);
        entries.insert(id, entry);
    }

    let mut report = BatchReport {
        files: entries,
        total_secs: total_start.elapsed().as_secs_f64(),
        patterns: None,
    };
    report.patterns = KeyPatterns::from_keys(&report.best_keys());
    report
}
