use super::{SweepConfig, SweepRow};
use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use std::fs;
use std::path::Path;

const REPORT_TEMPLATE: &str = include_str!("report_template.html");

#[derive(Debug, Serialize)]
struct ReportData<'a> {
    generated_at: String,
    title: String,
    shape: [usize; 2],
    dtype: String,
    compression: String,
    tiles: String,
    source: String,
    repeat: usize,
    rows: &'a [SweepRow],
}

/// HTML page with the read-time and file-size charts for `rows`.
pub fn render(config: &SweepConfig, rows: &[SweepRow]) -> Result<String> {
    let data = ReportData {
        generated_at: Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        title: format!(
            "Tile size sweep: {}x{} {} ({})",
            config.shape[0], config.shape[1], config.dtype, config.compression
        ),
        shape: config.shape,
        dtype: config.dtype.to_string(),
        compression: config.compression.to_string(),
        tiles: config.tiles.to_string(),
        source: config.source.label(),
        repeat: config.repeat,
        rows,
    };
    // `</` inside a script block would end it early.
    let json = serde_json::to_string(&data)
        .context("serialize sweep table to embed in HTML")?
        .replace("</", "<\\/");
    Ok(REPORT_TEMPLATE.replace("__DATA_PLACEHOLDER__", &json))
}

pub fn write(path: &Path, config: &SweepConfig, rows: &[SweepRow]) -> Result<()> {
    let html = render(config, rows)?;
    fs::write(path, html.as_bytes()).with_context(|| format!("write {}", path.display()))
}
