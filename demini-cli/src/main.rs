//! Demini CLI - bundle structure recovery for JavaScript

#![deny(warnings)]

// Global invariants enforced:
// - Deterministic output ordering
// - Identical input yields byte-for-byte identical output
// - Machine output goes to stdout, the run log to stderr

use anyhow::Context;
use clap::{Parser, Subcommand};
use demini_core::{analyze_file, fingerprint_source, render_json, render_summary_text};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "demini")]
#[command(about = "Static bundle structure recovery for JavaScript (esbuild, webpack, rollup)")]
#[command(version = env!("DEMINI_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline: annotated source plus classify/trace JSON
    Analyze {
        /// Path to the bundled JavaScript file
        file: PathBuf,

        /// Directory for output files (default: next to the input)
        #[arg(long)]
        out_dir: Option<PathBuf>,

        /// Print the annotated source to stdout instead of writing files
        #[arg(long)]
        stdout: bool,

        /// Summary format printed after analysis
        #[arg(long, default_value = "text")]
        format: OutputFormat,
    },
    /// Detect runtime helpers and report the bundler verdict only
    Fingerprint {
        /// Path to the bundled JavaScript file
        file: PathBuf,

        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,
    },
}

#[derive(Clone, Copy, PartialEq, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            file,
            out_dir,
            stdout,
            format,
        } => handle_analyze(&file, out_dir.as_deref(), stdout, format),
        Commands::Fingerprint { file, format } => handle_fingerprint(&file, format),
    }
}

fn handle_analyze(
    file: &Path,
    out_dir: Option<&Path>,
    stdout: bool,
    format: OutputFormat,
) -> anyhow::Result<()> {
    if stdout && out_dir.is_some() {
        anyhow::bail!("--stdout and --out-dir are mutually exclusive");
    }
    if !file.exists() {
        anyhow::bail!("Path does not exist: {}", file.display());
    }

    let analysis = analyze_file(file)?;

    eprintln!(
        "byte accounting: {} statement + {} gap = {} body ({})",
        analysis.annotated.statement_bytes,
        analysis.annotated.gap_bytes,
        analysis.body.len(),
        if analysis.annotated.accounting_match {
            "match"
        } else {
            "MISMATCH"
        }
    );

    if stdout {
        print!("{}", analysis.annotated.text);
        return Ok(());
    }

    let stem = file
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("bundle");
    let dir = match out_dir {
        Some(d) => {
            std::fs::create_dir_all(d)
                .with_context(|| format!("Failed to create output directory: {}", d.display()))?;
            d.to_path_buf()
        }
        None => file.parent().unwrap_or(Path::new(".")).to_path_buf(),
    };

    let annotated_path = dir.join(format!("{}.annotated.js", stem));
    let classify_path = dir.join(format!("{}.classify.json", stem));
    let trace_path = dir.join(format!("{}.trace.json", stem));

    write_output(&annotated_path, &analysis.annotated.text)?;
    write_output(&classify_path, &render_json(&analysis.classify))?;
    write_output(&trace_path, &render_json(&analysis.trace))?;

    match format {
        OutputFormat::Text => {
            print!(
                "{}",
                render_summary_text(
                    &analysis.fingerprint,
                    &analysis.modules,
                    &analysis.statements
                )
            );
            println!();
            println!("Annotated: {}", annotated_path.display());
            println!("Classify:  {}", classify_path.display());
            println!("Trace:     {}", trace_path.display());
        }
        OutputFormat::Json => {
            let summary = serde_json::json!({
                "input": file.display().to_string(),
                "bundler": analysis.fingerprint.bundler,
                "confidence": analysis.fingerprint.confidence,
                "total_statements": analysis.statements.len(),
                "total_modules": analysis.modules.len(),
                "byte_accounting_match": analysis.annotated.accounting_match,
                "outputs": [
                    annotated_path.display().to_string(),
                    classify_path.display().to_string(),
                    trace_path.display().to_string(),
                ],
            });
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }

    Ok(())
}

fn handle_fingerprint(file: &Path, format: OutputFormat) -> anyhow::Result<()> {
    let input = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read file: {}", file.display()))?;
    let (helpers, fingerprint) = fingerprint_source(&input, &file.to_string_lossy())?;

    match format {
        OutputFormat::Text => {
            println!(
                "{} (confidence: {})",
                fingerprint.bundler,
                fingerprint.confidence.as_str()
            );
            for signal in &fingerprint.signals {
                println!("  signal: {}", signal);
            }
            for (name, kind) in &helpers {
                println!("  helper: {} -> {}", name, kind.as_str());
            }
        }
        OutputFormat::Json => {
            let doc = serde_json::json!({
                "bundler": fingerprint.bundler,
                "confidence": fingerprint.confidence,
                "signals": fingerprint.signals,
                "runtime_helpers": helpers
                    .iter()
                    .map(|(name, kind)| (name.clone(), kind.as_str()))
                    .collect::<std::collections::BTreeMap<_, _>>(),
            });
            println!("{}", serde_json::to_string_pretty(&doc)?);
        }
    }

    Ok(())
}

fn write_output(path: &Path, content: &str) -> anyhow::Result<()> {
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write output: {}", path.display()))
}
