use anyhow::{Context, Result};
use clap::ValueEnum;
use csv::Writer;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::scanner::summarize;
use crate::types::ProbeResult;

const CSV_HEADER: [&str; 6] = ["src", "dst", "port", "proto", "status", "elapsed"];

/// Rendering used for the final result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Csv,
    Json,
    Table,
}

/// Write results to `path`, or to stdout when no path is given.
pub fn write_results(results: &[ProbeResult], path: Option<&Path>, format: OutputFormat) -> Result<()> {
    match path {
        Some(p) => {
            let file = File::create(p)
                .with_context(|| format!("failed to create output file: {}", p.display()))?;
            let mut w = BufWriter::new(file);
            render(results, format, &mut w)?;
            w.flush()?;
        }
        None => {
            let stdout = io::stdout();
            let mut w = stdout.lock();
            render(results, format, &mut w)?;
            w.flush()?;
        }
    }
    Ok(())
}

/// Render results in `format` into any writer.
pub fn render<W: Write>(results: &[ProbeResult], format: OutputFormat, w: &mut W) -> Result<()> {
    match format {
        OutputFormat::Csv => write_csv(results, w),
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *w, results)?;
            writeln!(w)?;
            Ok(())
        }
        OutputFormat::Table => write_table(results, w),
    }
}

fn write_csv<W: Write>(results: &[ProbeResult], w: &mut W) -> Result<()> {
    let mut wtr = Writer::from_writer(w);
    // Header written explicitly so an empty run still yields the column row.
    wtr.write_record(CSV_HEADER)?;
    for r in results {
        wtr.write_record([
            r.source.as_str(),
            r.destination.as_str(),
            &r.port.to_string(),
            &r.protocol.to_string(),
            &r.outcome.to_string(),
            &format!("{:.3}", r.elapsed_secs),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

fn write_table<W: Write>(results: &[ProbeResult], w: &mut W) -> Result<()> {
    let mut src_w = "src".len();
    let mut dst_w = "dst".len();
    let mut status_w = "status".len();
    for r in results {
        src_w = src_w.max(r.source.len());
        dst_w = dst_w.max(r.destination.len());
        status_w = status_w.max(r.outcome.to_string().len().min(60));
    }
    let port_w = 5usize;
    let proto_w = 5usize;
    let el_w = "elapsed".len();

    writeln!(
        w,
        "{:<src_w$}  {:<dst_w$}  {:>port_w$}  {:<proto_w$}  {:<status_w$}  {:>el_w$}",
        "src", "dst", "port", "proto", "status", "elapsed"
    )?;
    writeln!(
        w,
        "{:-<src_w$}  {:-<dst_w$}  {:-<port_w$}  {:-<proto_w$}  {:-<status_w$}  {:-<el_w$}",
        "", "", "", "", "", ""
    )?;
    for r in results {
        let mut status = r.outcome.to_string();
        if status.len() > 60 {
            status = status.chars().take(60).collect();
        }
        writeln!(
            w,
            "{:<src_w$}  {:<dst_w$}  {:>port_w$}  {:<proto_w$}  {:<status_w$}  {:>el_w$.3}",
            r.source,
            r.destination,
            r.port,
            r.protocol.to_string(),
            status,
            r.elapsed_secs
        )?;
    }

    let counts = summarize(results);
    let parts: Vec<String> = counts.iter().map(|(k, v)| format!("{k}={v}")).collect();
    writeln!(w, "\nProbes: {} ({})", results.len(), parts.join(", "))?;
    Ok(())
}
