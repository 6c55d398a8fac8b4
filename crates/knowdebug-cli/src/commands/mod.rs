pub mod init;
pub mod render;
pub mod run;
pub mod simulate;
pub mod validate;

use std::path::Path;

use anyhow::Result;

use knowdebug_core::model::FinalReport;
use knowdebug_core::session::SessionSnapshot;
use knowdebug_report::{write_html_report, write_markdown_report};

/// Output formats understood by `run` and `simulate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Html,
    Markdown,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Html => "html",
            OutputFormat::Markdown => "md",
        }
    }
}

/// Parse a comma-separated `--format` value; `all` selects every format.
pub fn parse_formats(format: &str) -> Result<Vec<OutputFormat>> {
    if format.trim().eq_ignore_ascii_case("all") {
        return Ok(vec![
            OutputFormat::Json,
            OutputFormat::Html,
            OutputFormat::Markdown,
        ]);
    }
    let mut formats = Vec::new();
    for f in format.split(',').map(|s| s.trim().to_ascii_lowercase()) {
        let parsed = match f.as_str() {
            "json" => OutputFormat::Json,
            "html" => OutputFormat::Html,
            "md" | "markdown" => OutputFormat::Markdown,
            other => anyhow::bail!("unknown format '{other}' (expected json, html, md or all)"),
        };
        if !formats.contains(&parsed) {
            formats.push(parsed);
        }
    }
    Ok(formats)
}

/// Write the session snapshot and, when there is one, the report in every
/// requested format. Files are named `{prefix}-session.json`,
/// `{prefix}-report.{ext}`.
pub fn write_outputs(
    output: &Path,
    prefix: &str,
    snapshot: &SessionSnapshot,
    report: Option<&FinalReport>,
    formats: &[OutputFormat],
) -> Result<()> {
    std::fs::create_dir_all(output)?;

    let session_path = output.join(format!("{prefix}-session.json"));
    snapshot.save_json(&session_path)?;
    eprintln!("Session saved to: {}", session_path.display());

    let Some(report) = report else {
        return Ok(());
    };
    let domains: Vec<_> = snapshot.records().cloned().collect();

    for fmt in formats {
        let path = output.join(format!("{prefix}-report.{}", fmt.extension()));
        match fmt {
            OutputFormat::Json => {
                report.save_json(&path)?;
                eprintln!("Report saved to: {}", path.display());
            }
            OutputFormat::Html => {
                write_html_report(report, &domains, &path)?;
                eprintln!("HTML report: {}", path.display());
            }
            OutputFormat::Markdown => {
                write_markdown_report(report, &domains, &path)?;
                eprintln!("Markdown report: {}", path.display());
            }
        }
    }
    Ok(())
}

/// Print the headline numbers of a report.
pub fn print_report_summary(report: &FinalReport) {
    println!("\n{}", report.title);
    println!(
        "Overall score: {:.1}% | Knowledge level: {} | {} domain(s) | {:.1} min",
        report.overall_score,
        report.knowledge_level,
        report.domains_assessed,
        report.total_time_minutes
    );
    for (heading, items) in [
        ("Strengths", &report.strengths),
        ("Areas for improvement", &report.areas_for_improvement),
        ("Recommendations", &report.recommendations),
    ] {
        if items.is_empty() {
            continue;
        }
        println!("{heading}:");
        for item in items {
            println!("  - {item}");
        }
    }
}
