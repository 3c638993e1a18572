/// Input selection and output naming for decoded files
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Extensions picked up in directory mode when none are given
pub const DEFAULT_EXTENSIONS: [&str; 4] = ["abc", "dat", "bin", "enc"];

fn stem(input: &Path) -> String {
    input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// `<stem>_decrypted_key<KK>.mp3`, used for single files
pub fn single_output_path(input: &Path, key: u8) -> PathBuf {
    input.with_file_name(format!("{}_decrypted_key{:02X}.mp3", stem(input), key))
}

/// `<stem>_decrypted.mp3`, used in directory mode
pub fn batch_output_path(input: &Path) -> PathBuf {
    input.with_file_name(format!("{}_decrypted.mp3", stem(input)))
}

/// `<stem>_alt<rank>_key<KK>.mp3`; the best key has rank 1, so alternates start at 2
pub fn alternate_output_path(input: &Path, rank: usize, key: u8) -> PathBuf {
    input.with_file_name(format!("{}_alt{}_key{:02X}.mp3", stem(input), rank, key))
}

/// Lowercases and strips a leading dot, so `.ABC` and `abc` match alike
pub fn normalize_extensions<S: AsRef<str>>(extensions: &[S]) -> Vec<String> {
    extensions
        .iter()
        .map(|ext| ext.as_ref().trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|ext| !ext.is_empty())
        .collect()
}

/// Case-insensitive suffix match against normalized extensions
pub fn has_listed_extension(path: &Path, extensions: &[String]) -> bool {
    let Some(name) = path.file_name().and_then(|s| s.to_str()) else {
        return false;
    };
    let name = name.to_ascii_lowercase();
    extensions.iter().any(|ext| name.ends_with(&format!(".{}", ext)))
}

/// Regular files in `dir` with a listed extension, sorted by name
pub fn collect_inputs(dir: &Path, extensions: &[String]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory: {}", dir.display()))?
    {
        let path = entry?.path();
        if path.is_file() && has_listed_extension(&path, extensions) {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}
