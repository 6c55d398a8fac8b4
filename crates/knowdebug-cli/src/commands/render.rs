//! The `knowdebug render` command.

use std::path::PathBuf;

use anyhow::Result;

use knowdebug_core::model::{DomainRecord, FinalReport};
use knowdebug_core::session::SessionSnapshot;
use knowdebug_report::{write_html_report, write_markdown_report};

use super::{parse_formats, OutputFormat};

pub fn execute(
    report_path: PathBuf,
    session_path: Option<PathBuf>,
    format: String,
    output: Option<PathBuf>,
) -> Result<()> {
    let report = FinalReport::load_json(&report_path)?;
    let domains: Vec<DomainRecord> = match &session_path {
        Some(path) => SessionSnapshot::load_json(path)?.records().cloned().collect(),
        None => Vec::new(),
    };

    let formats = parse_formats(&format)?;
    anyhow::ensure!(
        formats.len() == 1 && formats[0] != OutputFormat::Json,
        "render takes exactly one of: html, md"
    );
    let fmt = formats[0];

    let path = output.unwrap_or_else(|| report_path.with_extension(fmt.extension()));
    match fmt {
        OutputFormat::Html => write_html_report(&report, &domains, &path)?,
        OutputFormat::Markdown => write_markdown_report(&report, &domains, &path)?,
        OutputFormat::Json => unreachable!("rejected above"),
    }
    println!("Rendered {}", path.display());

    Ok(())
}
