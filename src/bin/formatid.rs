//! Identify files against signature catalogues.
//!
//! ```text
//! formatid --binary-sigs binary.json --container-sigs container.json report.docx
//! formatid --binary-sigs binary.json --container-sigs container.json --json *.pdf
//! ```

use anyhow::Context;
use clap::Parser;
use formatid::error::{exit_code_of, exit_codes};
use formatid::logging::init_cli_tracing;
use formatid::{Engine, EngineConfig, FormatIdError, IdentificationResultCollection, Specificity};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::debug;

#[derive(Parser)]
#[command(name = "formatid")]
#[command(version)]
#[command(about = "Identify file formats by their byte signatures")]
struct Cli {
    /// Binary signature catalogue (JSON)
    #[arg(long, value_name = "FILE")]
    binary_sigs: PathBuf,

    /// Container signature catalogue (JSON)
    #[arg(long, value_name = "FILE")]
    container_sigs: PathBuf,

    /// Engine configuration (JSON)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print one JSON object per file
    #[arg(long)]
    json: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Files to identify
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return if err.use_stderr() {
                ExitCode::from(exit_codes::USAGE as u8)
            } else {
                ExitCode::SUCCESS
            };
        }
    };
    init_cli_tracing(cli.verbose);

    match run(&cli) {
        Ok(code) => ExitCode::from(code as u8),
        Err(err) => {
            eprintln!("formatid: {err:#}");
            ExitCode::from(exit_code_of(&err) as u8)
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<i32> {
    let config = match &cli.config {
        Some(path) => EngineConfig::from_json_file(path)
            .with_context(|| format!("loading configuration {}", path.display()))?,
        None => EngineConfig::default(),
    };
    let engine = Engine::from_json_files(&cli.binary_sigs, &cli.container_sigs, config)
        .context("loading signature catalogues")?;

    let mut failed = 0usize;
    for file in &cli.files {
        match engine.submit(file) {
            Ok(results) => {
                if cli.json {
                    println!("{}", serde_json::to_string(&results)?);
                } else {
                    print_block(file, &results);
                }
            }
            Err(FormatIdError::Io(err)) => {
                eprintln!("formatid: {}: {err}", file.display());
                failed += 1;
            }
            Err(err) => return Err(err.into()),
        }
    }
    debug!(files = cli.files.len(), failed, "Identification finished");
    Ok(if failed > 0 { exit_codes::IO } else { 0 })
}

fn print_block(file: &Path, results: &IdentificationResultCollection) {
    println!("{}", file.display());
    if results.is_empty() {
        println!("  (no identification)");
    }
    for result in results {
        let mut line = format!("  {}\t{}", result.puid, result.name);
        if let Some(version) = &result.version {
            line.push(' ');
            line.push_str(version);
        }
        line.push('\t');
        line.push_str(&result.method.to_string());
        if result.specificity == Specificity::Specific {
            line.push_str("\tspecific");
        }
        if result.extension_mismatch {
            line.push_str("\textension mismatch");
        }
        println!("{line}");
    }
}
