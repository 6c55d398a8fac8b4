//! Markdown report generator.

use anyhow::{Context, Result};
use std::path::Path;

use knowdebug_core::model::{DomainRecord, FinalReport};

/// Escape pipes so text can sit inside a table cell.
fn cell(s: &str) -> String {
    s.replace('|', "\\|").replace('\n', " ")
}

fn push_list(md: &mut String, heading: &str, items: &[String]) {
    md.push_str(&format!("## {heading}\n\n"));
    if items.is_empty() {
        md.push_str("_None_\n\n");
        return;
    }
    for item in items {
        md.push_str(&format!("- {item}\n"));
    }
    md.push('\n');
}

/// Render a final report (and optionally its domain records) as Markdown.
pub fn generate_markdown(report: &FinalReport, domains: &[DomainRecord]) -> String {
    let mut md = String::new();

    md.push_str(&format!("# {}\n\n", report.title));
    md.push_str(&format!(
        "**Overall score:** {:.1}%  \n**Knowledge level:** {}  \n**Domains assessed:** {}  \n**Total time:** {:.1} minutes\n\n",
        report.overall_score, report.knowledge_level, report.domains_assessed, report.total_time_minutes
    ));

    push_list(&mut md, "Strengths", &report.strengths);
    push_list(&mut md, "Areas for improvement", &report.areas_for_improvement);
    push_list(&mut md, "Recommendations", &report.recommendations);

    if !report.detailed_breakdown.is_empty() {
        md.push_str("## Domain breakdown\n\n");
        md.push_str("| Domain | Score | Status | Key strengths | Improvement areas |\n");
        md.push_str("|--------|------:|--------|---------------|-------------------|\n");
        for (name, b) in &report.detailed_breakdown {
            md.push_str(&format!(
                "| {} | {:.1}% | {} | {} | {} |\n",
                cell(name),
                b.score,
                cell(&b.status),
                cell(&b.key_strengths.join(", ")),
                cell(&b.improvement_areas.join(", ")),
            ));
        }
        md.push('\n');
    }

    if !domains.is_empty() {
        md.push_str("## Session statistics\n\n");
        md.push_str("| Domain | Status | Correct | Accuracy | Final difficulty | Avg response | Knowledge gaps |\n");
        md.push_str("|--------|--------|--------:|---------:|-----------------:|-------------:|----------------|\n");
        for d in domains {
            md.push_str(&format!(
                "| {} | {} | {}/{} | {:.1}% | {:.1} | {:.1}s | {} |\n",
                cell(&d.domain_name),
                d.status,
                d.questions_correct,
                d.questions_attempted,
                d.accuracy() * 100.0,
                d.current_difficulty,
                d.average_response_time,
                cell(&d.knowledge_gaps.join(", ")),
            ));
        }
        md.push('\n');
    }

    md
}

/// Write a Markdown report to a file.
pub fn write_markdown_report(
    report: &FinalReport,
    domains: &[DomainRecord],
    path: &Path,
) -> Result<()> {
    let md = generate_markdown(report, domains);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, md)
        .with_context(|| format!("failed to write Markdown report to {}", path.display()))?;
    Ok(())
}
