use anyhow::{Context, Result, bail};
use chrono::Local;
use clap::{Parser, Subcommand};
use log::warn;
use spd_core::report::{
    candidate_line, chunk_line, render_batch_summary, render_quality, validation_line,
};
use spd_core::{
    BatchReport, DEFAULT_ALTERNATES, DEFAULT_CHUNK_SIZE, DiscoveryConfig, FileOutcome,
    MAX_CHUNK_SIZE, MIN_CHUNK_SIZE, analyze, clamp_chunk_size, decrypt_file, discover_file,
    format_key, run_batch, xor_bytes,
};
use std::fmt::Display;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

mod logger;
mod paths;

/// Alternates written next to a single decoded file
const SINGLE_FILE_ALTERNATES: usize = 3;

/// Phase-1 scores listed for a single file
const TOP_CHUNK_SCORES: usize = 5;

#[derive(Parser)]
#[command(name = "spd-cli")]
#[command(about = "Storypod audio XOR key recovery – CLI tool", long_about = None)]
#[command(version)]
struct Cli {
    /// Show per-key progress and the top chunk scores
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover the XOR key of a file, or of every matching file in a directory, and decode it
    Decode {
        /// File or directory to process
        path: Option<PathBuf>,

        /// Ask for the path on stdin when it is not given
        #[arg(short, long)]
        interactive: bool,

        /// Leading bytes scored for every key (clamped to 512..=32768)
        #[arg(short, long, default_value_t = DEFAULT_CHUNK_SIZE)]
        chunk_size: usize,

        /// Also confirm and write runner-up keys (slower but more thorough)
        #[arg(long)]
        show_alts: bool,

        /// Runner-up keys to confirm with --show-alts
        #[arg(long, default_value_t = DEFAULT_ALTERNATES)]
        alts: usize,

        /// File extensions processed in directory mode [default: abc,dat,bin,enc]
        #[arg(long = "ext", value_delimiter = ',')]
        extensions: Option<Vec<String>>,

        /// Print the discovery results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the quality report of a file, optionally after applying a key
    Analyze {
        /// File to analyze
        file: PathBuf,

        /// XOR key to apply first, e.g. 0x37 or 37
        #[arg(short, long, value_parser = parse_key)]
        key: Option<u8>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

struct DecodeOptions {
    config: DiscoveryConfig,
    extensions: Vec<String>,
    json: bool,
}

impl DecodeOptions {
    /// Human-readable output; stdout is reserved for the document under --json
    fn say(&self, line: impl Display) {
        if self.json {
            eprintln!("{}", line);
        } else {
            println!("{}", line);
        }
    }
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:?}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    logger::init(cli.verbose)?;

    match cli.command {
        Commands::Decode {
            path,
            interactive,
            chunk_size,
            show_alts,
            alts,
            extensions,
            json,
        } => {
            let target = resolve_target(path, interactive)?;
            let mut config = DiscoveryConfig {
                chunk_size: checked_chunk_size(chunk_size),
                alternates: None,
            };
            if show_alts {
                config = config.with_alternates(alts);
            }
            let extensions = match extensions {
                Some(list) => paths::normalize_extensions(&list),
                None => paths::normalize_extensions(&paths::DEFAULT_EXTENSIONS),
            };

            cmd_decode(
                &target,
                &DecodeOptions {
                    config,
                    extensions,
                    json,
                },
            )?;
        }
        Commands::Analyze { file, key, json } => {
            cmd_analyze(&file, key, json)?;
        }
    }

    Ok(())
}

/// Accepts `0x37`, `0X37` or `37`
fn parse_key(s: &str) -> Result<u8, String> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    u8::from_str_radix(digits, 16).map_err(|e| format!("invalid key '{}': {}", s, e))
}

fn checked_chunk_size(requested: usize) -> usize {
    let chunk_size = clamp_chunk_size(requested);
    if requested < MIN_CHUNK_SIZE {
        warn!("Very small chunk size may miss audio headers, using {}", chunk_size);
    } else if requested > MAX_CHUNK_SIZE {
        warn!("Large chunk size reduces optimization benefits, using {}", chunk_size);
    }
    chunk_size
}

fn resolve_target(path: Option<PathBuf>, interactive: bool) -> Result<PathBuf> {
    let target = match path {
        Some(path) => path,
        None if interactive => prompt_path()?,
        None => bail!("No input path given (pass a PATH or use --interactive)"),
    };

    if !target.exists() {
        bail!("Path '{}' does not exist!", target.display());
    }
    Ok(target)
}

fn prompt_path() -> Result<PathBuf> {
    print!("Enter file or directory path: ");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read path from stdin")?;

    let line = line.trim();
    if line.is_empty() {
        bail!("No input path given");
    }
    Ok(PathBuf::from(line))
}

fn cmd_decode(target: &Path, options: &DecodeOptions) -> Result<()> {
    options.say(format!(
        "[info] using {} byte chunks for scoring, alternates {}",
        options.config.chunk_size,
        if options.config.alternates.is_some() {
            "enabled"
        } else {
            "disabled (use --show-alts to enable)"
        }
    ));

    if target.is_file() {
        process_single_file(target, options)
    } else if target.is_dir() {
        process_directory(target, options)
    } else {
        bail!("'{}' is neither a file nor directory!", target.display());
    }
}

fn process_single_file(path: &Path, options: &DecodeOptions) -> Result<()> {
    let discovery = match discover_file(path, &options.config) {
        Ok(discovery) => discovery,
        Err(e) => {
            options.say(format!("[fail] no valid XOR key found: {}", e));
            return Ok(());
        }
    };

    options.say("Top chunk scores:");
    for (rank, entry) in discovery.ranking().iter().take(TOP_CHUNK_SCORES).enumerate() {
        options.say(chunk_line(rank + 1, entry));
    }

    if options.config.alternates.is_some() {
        options.say("Confirmed candidates:");
        for (rank, candidate) in discovery.candidates().iter().enumerate() {
            options.say(candidate_line(rank + 1, candidate));
        }
    }

    let best = discovery.best();
    options.say(format!(
        "[info] using best key: {} (score: {})",
        format_key(best.key),
        best.score()
    ));

    let output = paths::single_output_path(path, best.key);
    let summary = decrypt_file(path, &output, best.key)?;
    options.say(format!("[ok] wrote decoded audio -> {}", output.display()));
    options.say(validation_line(&summary.validation));

    if options.config.alternates.is_some() {
        for (index, alternate) in discovery
            .alternates()
            .iter()
            .take(SINGLE_FILE_ALTERNATES)
            .enumerate()
        {
            let rank = index + 2;
            let alt_output = paths::alternate_output_path(path, rank, alternate.key);
            match decrypt_file(path, &alt_output, alternate.key) {
                Ok(_) => options.say(format!("[ok] alternative {} -> {}", rank, alt_output.display())),
                Err(e) => warn!("Error writing alternative {}: {:?}", rank, e),
            }
        }
    }

    if options.json {
        println!("{}", serde_json::to_string_pretty(&discovery)?);
    }

    Ok(())
}

/// Writes the decoded outputs of one batch entry; failures are logged, not fatal
fn write_batch_outputs(path: &Path, outcome: &FileOutcome, options: &DecodeOptions) {
    let FileOutcome::Found { best, alternates } = outcome else {
        return;
    };

    let output = paths::batch_output_path(path);
    if let Err(e) = decrypt_file(path, &output, best.key) {
        warn!("Error during decryption: {:?}", e);
        return;
    }

    for (index, alternate) in alternates.iter().enumerate() {
        let rank = index + 2;
        let alt_output = paths::alternate_output_path(path, rank, alternate.key);
        match decrypt_file(path, &alt_output, alternate.key) {
            Ok(_) => options.say(format!("  Alternative {}: key {}", rank, format_key(alternate.key))),
            Err(e) => warn!("Error during decryption: {:?}", e),
        }
    }
}

fn process_directory(dir: &Path, options: &DecodeOptions) -> Result<()> {
    let files = paths::collect_inputs(dir, &options.extensions)?;
    if files.is_empty() {
        options.say("[info] no files with audio extensions found!");
        return Ok(());
    }

    options.say(format!(
        "[info] found {} files to process (started {})",
        files.len(),
        Local::now().format("%Y-%m-%d %H:%M:%S")
    ));

    let report: BatchReport = run_batch(&files, &options.config, |index, entry| {
        options.say(format!("\n[{}/{}] {}", index, files.len(), "=".repeat(50)));
        match &entry.outcome {
            FileOutcome::Found { best, .. } => options.say(format!(
                "BEST KEY: {} (score: {}) - {:.1}s",
                format_key(best.key),
                best.score(),
                entry.elapsed_secs
            )),
            FileOutcome::Failed { reason } => {
                options.say(format!("NO VALID KEY FOUND - {:.1}s", entry.elapsed_secs));
                warn!("{}: {}", entry.name(), reason);
            }
        }

        write_batch_outputs(&entry.path, &entry.outcome, options);
    });

    options.say(format!("\n{}", "=".repeat(80)));
    options.say("BATCH PROCESSING COMPLETE");
    options.say(format!("{}\n", "=".repeat(80)));
    options.say(render_batch_summary(&report).trim_end());

    if options.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    Ok(())
}

fn cmd_analyze(path: &Path, key: Option<u8>, json: bool) -> Result<()> {
    let data = fs::read(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;

    let data = match key {
        Some(key) => xor_bytes(&data, key),
        None => data,
    };
    let report = analyze(&data);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if let Some(key) = key {
        println!("[info] applied key {}", format_key(key));
    }
    print!("{}", render_quality(&report));

    for (rule, points) in spd_core::quality::score_breakdown(&data) {
        log::debug!("  {:<20} {:+}", rule, points);
    }

    Ok(())
}
