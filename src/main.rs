use anyhow::{Context, Result};
use clap::Parser;
use stallscope::block_summary::write_block_summary_csv;
use stallscope::cli::{Cli, OutputFormat};
use stallscope::pipeline::{Analysis, AnalysisOutput};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    } else if std::env::var_os("RUST_LOG").is_some() {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .init();
    }
}

fn open_input(path: &Path) -> Result<BufReader<File>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open input file: {}", path.display()))?;
    Ok(BufReader::new(file))
}

fn create_output(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create output file: {}", path.display()))?;
    Ok(BufWriter::new(file))
}

fn write_report<W: Write>(output: &AnalysisOutput, format: OutputFormat, mut out: W) -> Result<()> {
    match format {
        OutputFormat::Csv => output.report.write_csv(&mut out)?,
        OutputFormat::Json => {
            output.report.write_json(&mut out)?;
            writeln!(out)?;
        }
    }
    out.flush()?;
    Ok(())
}

fn main() -> Result<()> {
    let args = Cli::parse();

    init_tracing(args.debug);

    let config = args.load_config()?;
    config.validate().context("Invalid configuration")?;

    let output = Analysis::run(open_input(&args.trace)?, open_input(&args.events)?, &config)
        .with_context(|| format!("Failed to analyze {}", args.trace.display()))?;

    match &args.output {
        Some(path) => write_report(&output, args.format, create_output(path)?)
            .with_context(|| format!("Failed to write report: {}", path.display()))?,
        None => write_report(&output, args.format, io::stdout().lock())?,
    }

    if let Some(path) = &args.blocks_summary {
        let mut out = create_output(path)?;
        write_block_summary_csv(&output.blocks, &output.program, &mut out)
            .and_then(|()| out.flush())
            .with_context(|| format!("Failed to write block summary: {}", path.display()))?;
    }

    if let Some(path) = &args.pc_stats {
        let mut out = create_output(path)?;
        output
            .pc_costs
            .write_csv(&mut out)
            .and_then(|()| out.flush())
            .with_context(|| format!("Failed to write pc statistics: {}", path.display()))?;
    }

    if let Some(path) = &args.stages {
        let mut out = create_output(path)?;
        output
            .stages
            .write_csv(&mut out)
            .and_then(|()| out.flush())
            .with_context(|| format!("Failed to write stage attribution: {}", path.display()))?;
    }

    Ok(())
}
