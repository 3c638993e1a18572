/// Applies a confirmed key to a whole file
use anyhow::{Context, Result};
use log::{debug, info};
use serde::Serialize;
use std::fs;
use std::path::Path;

use crate::quality::{QualityReport, analyze};
use crate::report::validation_line;
use crate::xor::xor_bytes;

/// What a decode-and-write produced
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecryptSummary {
    pub key: u8,
    pub bytes_in: usize,
    pub bytes_out: usize,
    /// Quality of the written output; informational only
    pub validation: QualityReport,
}

/// Decodes `input` with `key` and writes the result to `output`.
///
/// The output is re-analyzed after the write for reporting; a poor score
/// does not turn a successful write into an error.
pub fn decrypt_file(input: &Path, output: &Path, key: u8) -> Result<DecryptSummary> {
    let data = fs::read(input)
        .with_context(|| format!("Failed to read input file: {}", input.display()))?;

    let decoded = xor_bytes(&data, key);

    fs::write(output, &decoded)
        .with_context(|| format!("Failed to write decoded file: {}", output.display()))?;

    info!("Decrypted {} bytes -> {} bytes", data.len(), decoded.len());

    let validation = analyze(&decoded);
    debug!("{}", validation_line(&validation));

    Ok(DecryptSummary {
        key,
        bytes_in: data.len(),
        bytes_out: decoded.len(),
        validation,
    })
}
