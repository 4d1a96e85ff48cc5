//! Compile, render and test signature expressions.
//!
//! ```text
//! # Render an expression as registry XML
//! sigtool "'%PDF-1.' [30:37]"
//!
//! # Read XML back into expression text
//! sigtool -e '<ByteSequence Reference="BOFoffset">...</ByteSequence>'
//!
//! # Compact binary syntax, anchored at the end of file
//! sigtool -a eofoffset -e -b "'%%EOF' {0-2}"
//!
//! # Re-emit every sequence of a catalogue
//! sigtool -f binary-signatures.json -e
//!
//! # Test expressions against every file in a directory
//! sigtool -m samples/ "'%PDF'" "504B0304"
//! ```

use anyhow::{bail, Context};
use clap::Parser;
use formatid::error::{exit_code_of, exit_codes};
use formatid::identify::{SignatureDefinition, SignatureFile};
use formatid::io::{ByteSource, FileSource, IOLimits};
use formatid::logging::init_cli_tracing;
use formatid::signature::{
    compile, compile_anchored, from_xml, serialize, to_xml, Anchor, ByteSequence, SequenceMatcher,
    Syntax,
};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, warn};

#[derive(Parser)]
#[command(name = "sigtool")]
#[command(version)]
#[command(about = "Compile, render and test byte signature expressions")]
struct Cli {
    /// Signature expressions, or `<ByteSequence>` XML documents
    expressions: Vec<String>,

    /// Anchor for the expressions: bofoffset, eofoffset or variable
    #[arg(short, long, default_value = "bofoffset")]
    anchor: Anchor,

    /// Emit compact binary signature syntax
    #[arg(short, long, conflicts_with = "container")]
    binary: bool,

    /// Emit container signature syntax (the default)
    #[arg(short, long)]
    container: bool,

    /// Separate every element with a space
    #[arg(short, long)]
    spaces: bool,

    /// Print only the output column
    #[arg(short, long)]
    notabs: bool,

    /// Emit XML (the default)
    #[arg(short = 'x', long, conflicts_with = "expression")]
    xml: bool,

    /// Emit expression text instead of XML
    #[arg(short, long)]
    expression: bool,

    /// Re-emit every sequence of a binary or container catalogue
    #[arg(short, long, value_name = "CATALOGUE", conflicts_with = "match_path")]
    file: Option<PathBuf>,

    /// Test the expressions against a file, or every file in a directory
    #[arg(short, long = "match", value_name = "PATH")]
    match_path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn syntax(&self) -> Syntax {
        if self.binary {
            Syntax::Binary
        } else {
            Syntax::Container
        }
    }

    fn render(&self, sequence: &ByteSequence) -> anyhow::Result<String> {
        if self.expression {
            Ok(serialize(sequence, self.syntax(), self.spaces)?)
        } else {
            Ok(to_xml(sequence))
        }
    }

    fn parse(&self, input: &str) -> anyhow::Result<ByteSequence> {
        if input.trim_start().starts_with('<') {
            from_xml(input).context("reading ByteSequence XML")
        } else {
            compile(input, self.anchor).with_context(|| format!("compiling {input:?}"))
        }
    }

    fn row(&self, columns: &[&str]) -> String {
        if self.notabs {
            columns.last().copied().unwrap_or_default().to_string()
        } else {
            columns.join("\t")
        }
    }
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
            eprintln!("sigtool: {err:#}");
            ExitCode::from(exit_code_of(&err) as u8)
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<i32> {
    if let Some(catalogue) = &cli.file {
        return emit_catalogue(cli, catalogue).map(|_| 0);
    }
    if cli.expressions.is_empty() {
        bail!("no expressions given");
    }

    let mut sequences = Vec::with_capacity(cli.expressions.len());
    for expression in &cli.expressions {
        sequences.push(cli.parse(expression)?);
    }

    match &cli.match_path {
        Some(path) => match_files(cli, &sequences, path),
        None => {
            for (expression, sequence) in cli.expressions.iter().zip(&sequences) {
                let rendered = cli.render(sequence)?;
                println!("{}", cli.row(&[expression.as_str(), rendered.as_str()]));
            }
            Ok(0)
        }
    }
}

fn emit_catalogue(cli: &Cli, path: &Path) -> anyhow::Result<()> {
    let catalogue = SignatureFile::from_json_file(path)
        .with_context(|| format!("loading {}", path.display()))?;
    match catalogue {
        SignatureFile::Binary(defs) => {
            debug!(signatures = defs.signatures.len(), "Re-emitting binary catalogue");
            for signature in &defs.signatures {
                emit_signature(cli, &[signature.id.to_string().as_str()], signature)?;
            }
        }
        SignatureFile::Container(defs) => {
            debug!(signatures = defs.signatures.len(), "Re-emitting container catalogue");
            for container in &defs.signatures {
                let id = container.id.to_string();
                for file in &container.files {
                    for signature in &file.signatures {
                        emit_signature(cli, &[id.as_str(), file.path.as_str()], signature)?;
                    }
                }
            }
        }
    }
    Ok(())
}

fn emit_signature(cli: &Cli, prefix: &[&str], signature: &SignatureDefinition) -> anyhow::Result<()> {
    for seq in &signature.sequences {
        let sequence = compile_anchored(&seq.expression, &seq.anchor)
            .with_context(|| format!("signature {}: {:?}", signature.id, seq.expression))?;
        let rendered = cli.render(&sequence)?;
        let mut columns = prefix.to_vec();
        columns.push(sequence.anchor().keyword());
        columns.push(&rendered);
        println!("{}", cli.row(&columns));
    }
    Ok(())
}

fn collect_files(path: &Path, files: &mut Vec<PathBuf>) -> anyhow::Result<()> {
    if !path.is_dir() {
        files.push(path.to_path_buf());
        return Ok(());
    }
    let entries = std::fs::read_dir(path).with_context(|| format!("reading {}", path.display()))?;
    for entry in entries {
        let entry = entry.with_context(|| format!("reading {}", path.display()))?;
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            collect_files(&entry.path(), files)?;
        } else if file_type.is_file() {
            files.push(entry.path());
        }
    }
    Ok(())
}

fn match_files(cli: &Cli, sequences: &[ByteSequence], path: &Path) -> anyhow::Result<i32> {
    let mut files = Vec::new();
    collect_files(path, &mut files)?;
    files.sort();
    let matchers: Vec<SequenceMatcher> = sequences.iter().map(SequenceMatcher::new).collect();
    let limits = IOLimits::default();

    let rows: Vec<Option<String>> = files
        .par_iter()
        .map(|file| match FileSource::open(file, &limits) {
            Ok(source) => {
                let data = source.bytes();
                let mut columns = vec![file.display().to_string()];
                columns.extend(
                    matchers
                        .iter()
                        .map(|m| if m.matches(data, None) { "1" } else { "0" }.to_string()),
                );
                Some(columns.join("\t"))
            }
            Err(err) => {
                warn!(file = %file.display(), error = %err, "Could not read file");
                eprintln!("sigtool: {}: {err}", file.display());
                None
            }
        })
        .collect();

    let mut header = vec!["file"];
    header.extend(cli.expressions.iter().map(String::as_str));
    println!("{}", header.join("\t"));
    let mut failed = false;
    for row in rows {
        match row {
            Some(row) => println!("{row}"),
            None => failed = true,
        }
    }
    Ok(if failed { exit_codes::IO } else { 0 })
}
