//! HTML report generator.
//!
//! Produces a self-contained HTML file with all CSS inlined.

use anyhow::{Context, Result};
use std::path::Path;

use chrono::Utc;
use knowdebug_core::model::{DomainRecord, DomainStatus, FinalReport};

/// Escape a string for safe HTML insertion.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

fn status_class(status: DomainStatus) -> &'static str {
    match status {
        DomainStatus::Mastered => "mastered",
        DomainStatus::Completed => "completed",
        DomainStatus::Struggling => "struggling",
        DomainStatus::InProgress | DomainStatus::NotStarted => "open",
    }
}

fn push_list(html: &mut String, heading: &str, items: &[String]) {
    html.push_str(&format!("<div class=\"card\">\n<h3>{}</h3>\n", html_escape(heading)));
    if items.is_empty() {
        html.push_str("<p class=\"meta\">None</p>\n");
    } else {
        html.push_str("<ul>\n");
        for item in items {
            html.push_str(&format!("<li>{}</li>\n", html_escape(item)));
        }
        html.push_str("</ul>\n");
    }
    html.push_str("</div>\n");
}

/// Generate an HTML report from a final report and the domain records it
/// was built from. `domains` may be empty when only the report is known.
pub fn generate_html(report: &FinalReport, domains: &[DomainRecord]) -> String {
    let mut html = String::new();

    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    html.push_str(&format!("<title>{}</title>\n", html_escape(&report.title)));
    html.push_str("<style>\n");
    html.push_str(CSS);
    html.push_str("</style>\n");
    html.push_str("</head>\n<body>\n");

    // Header
    html.push_str("<header>\n");
    html.push_str(&format!("<h1>{}</h1>\n", html_escape(&report.title)));
    html.push_str(&format!(
        "<p class=\"meta\">{} domains assessed | {:.1} minutes | generated {}</p>\n",
        report.domains_assessed,
        report.total_time_minutes,
        Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    ));
    html.push_str("</header>\n");

    // Score dashboard
    html.push_str("<section class=\"dashboard\">\n");
    html.push_str(&format!(
        "<div class=\"score\"><span class=\"value\">{:.1}%</span><span class=\"label\">Overall score</span></div>\n",
        report.overall_score
    ));
    html.push_str(&format!(
        "<div class=\"score\"><span class=\"value\">{}</span><span class=\"label\">Knowledge level</span></div>\n",
        report.knowledge_level
    ));
    html.push_str("</section>\n");

    if !report.detailed_breakdown.is_empty() {
        html.push_str("<section>\n<h2>Scores by domain</h2>\n");
        html.push_str(&generate_bar_chart(report));
        html.push_str("</section>\n");
    }

    html.push_str("<section class=\"lists\">\n");
    push_list(&mut html, "Strengths", &report.strengths);
    push_list(&mut html, "Areas for improvement", &report.areas_for_improvement);
    push_list(&mut html, "Recommendations", &report.recommendations);
    html.push_str("</section>\n");

    // Per-domain breakdown
    if !report.detailed_breakdown.is_empty() {
        html.push_str("<section>\n<h2>Domain breakdown</h2>\n");
        html.push_str("<table>\n");
        html.push_str("<thead><tr><th>Domain</th><th>Score</th><th>Status</th><th>Key strengths</th><th>Improvement areas</th></tr></thead>\n");
        html.push_str("<tbody>\n");
        for (name, breakdown) in &report.detailed_breakdown {
            html.push_str(&format!(
                "<tr><td>{}</td><td>{:.1}%</td><td class=\"{}\">{}</td><td>{}</td><td>{}</td></tr>\n",
                html_escape(name),
                breakdown.score,
                html_escape(&breakdown.status.to_lowercase()),
                html_escape(&breakdown.status),
                html_escape(&breakdown.key_strengths.join(", ")),
                html_escape(&breakdown.improvement_areas.join(", ")),
            ));
        }
        html.push_str("</tbody></table>\n");
        html.push_str("</section>\n");
    }

    // Session statistics
    if !domains.is_empty() {
        html.push_str("<section>\n<h2>Session statistics</h2>\n");
        html.push_str("<table>\n");
        html.push_str("<thead><tr><th>Domain</th><th>Status</th><th>Correct</th><th>Accuracy</th><th>Final difficulty</th><th>Avg response</th><th>Avg confidence</th><th>Knowledge gaps</th></tr></thead>\n");
        html.push_str("<tbody>\n");
        for d in domains {
            html.push_str(&format!(
                "<tr><td>{}</td><td class=\"{}\">{}</td><td>{}/{}</td><td>{:.1}%</td><td>{:.1}</td><td>{:.1}s</td><td>{:.0}%</td><td>{}</td></tr>\n",
                html_escape(&d.domain_name),
                status_class(d.status),
                d.status,
                d.questions_correct,
                d.questions_attempted,
                d.accuracy() * 100.0,
                d.current_difficulty,
                d.average_response_time,
                d.confidence_score * 100.0,
                html_escape(&d.knowledge_gaps.join(", ")),
            ));
        }
        html.push_str("</tbody></table>\n");
        html.push_str("</section>\n");
    }

    // Raw JSON
    html.push_str("<section class=\"raw-data\">\n");
    html.push_str("<details>\n<summary>Raw JSON Data</summary>\n");
    html.push_str("<pre><code>");
    html.push_str(&html_escape(
        &serde_json::to_string_pretty(report).unwrap_or_default(),
    ));
    html.push_str("</code></pre>\n");
    html.push_str("</details>\n</section>\n");

    html.push_str("</body>\n</html>");
    html
}

/// Write an HTML report to a file.
pub fn write_html_report(report: &FinalReport, domains: &[DomainRecord], path: &Path) -> Result<()> {
    let html = generate_html(report, domains);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, html)
        .with_context(|| format!("failed to write HTML report to {}", path.display()))?;
    Ok(())
}

fn generate_bar_chart(report: &FinalReport) -> String {
    let bar_height = 30;
    let max_width = 400;
    let padding = 10;
    let label_width = 260;

    let total_height = report.detailed_breakdown.len() * (bar_height + padding) + padding;

    let mut svg = format!(
        "<svg width=\"{}\" height=\"{}\" xmlns=\"http://www.w3.org/2000/svg\">\n",
        label_width + max_width + 60,
        total_height
    );

    for (i, (domain, breakdown)) in report.detailed_breakdown.iter().enumerate() {
        let y = i * (bar_height + padding) + padding;
        let score = breakdown.score.clamp(0.0, 100.0) / 100.0;
        let width = (score * max_width as f64) as usize;

        let color = if score >= 0.8 {
            "#22c55e"
        } else if score >= 0.6 {
            "#eab308"
        } else {
            "#ef4444"
        };

        svg.push_str(&format!(
            "  <text x=\"{}\" y=\"{}\" font-size=\"14\" fill=\"currentColor\" text-anchor=\"end\" dominant-baseline=\"middle\">{}</text>\n",
            label_width - 10,
            y + bar_height / 2,
            html_escape(domain)
        ));
        svg.push_str(&format!(
            "  <rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" fill=\"{}\" rx=\"4\"/>\n",
            label_width, y, width, bar_height, color
        ));
        svg.push_str(&format!(
            "  <text x=\"{}\" y=\"{}\" font-size=\"12\" fill=\"currentColor\" dominant-baseline=\"middle\">{:.1}%</text>\n",
            label_width + width + 8,
            y + bar_height / 2,
            score * 100.0
        ));
    }

    svg.push_str("</svg>\n");
    svg
}

const CSS: &str = r#"
:root { --bg: #fff; --fg: #1a1a1a; --border: #e5e7eb; --good: #dcfce7; --ok: #fef9c3; --bad: #fde2e2; }
@media (prefers-color-scheme: dark) {
  :root { --bg: #111827; --fg: #f9fafb; --border: #374151; --good: #064e3b; --ok: #713f12; --bad: #7f1d1d; }
}
body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif; margin: 0; padding: 2rem; background: var(--bg); color: var(--fg); }
h1, h2 { margin-top: 2rem; }
.meta { color: #6b7280; }
.dashboard { display: flex; gap: 2rem; }
.score { display: flex; flex-direction: column; padding: 1rem 2rem; border: 1px solid var(--border); border-radius: 8px; }
.score .value { font-size: 2rem; font-weight: bold; }
.score .label { color: #6b7280; }
.lists { display: grid; grid-template-columns: repeat(auto-fit, minmax(16rem, 1fr)); gap: 1rem; margin-top: 2rem; }
.card { border: 1px solid var(--border); border-radius: 8px; padding: 0 1rem; }
table { border-collapse: collapse; width: 100%; margin: 1rem 0; }
th, td { border: 1px solid var(--border); padding: 0.5rem 1rem; text-align: left; }
th { background: var(--border); }
.mastered { background: var(--good); }
.completed { background: var(--ok); }
.struggling { background: var(--bad); }
pre { overflow-x: auto; padding: 1rem; background: var(--border); border-radius: 8px; }
code { font-family: 'JetBrains Mono', 'Fira Code', monospace; font-size: 0.85rem; }
details { margin: 1rem 0; }
summary { cursor: pointer; font-weight: bold; }
svg { margin: 1rem 0; }
"#;
