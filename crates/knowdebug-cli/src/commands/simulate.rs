//! The `knowdebug simulate` command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use comfy_table::{Cell, Table};

use knowdebug_core::parser;
use knowdebug_core::session::AssessmentSession;

use super::validate::load_scripts;
use super::{parse_formats, print_report_summary, write_outputs};

pub fn execute(script_path: PathBuf, output: Option<PathBuf>, format: String) -> Result<()> {
    let formats = parse_formats(&format)?;
    let scripts = load_scripts(&script_path)?;
    anyhow::ensure!(
        !scripts.is_empty(),
        "no answer scripts found in {}",
        script_path.display()
    );

    for script in &scripts {
        for w in parser::validate_script(script) {
            match &w.domain {
                Some(d) => eprintln!("  [{d}] WARNING: {}", w.message),
                None => eprintln!("  WARNING: {}", w.message),
            }
        }

        let session = parser::replay(script)
            .with_context(|| format!("failed to replay script '{}'", script.name))?;

        println!("Script: {} | Topic: {}", script.name, session.main_topic());
        print_summary(&session);

        let completed = session.completed_domains().len();
        let report = (completed > 0).then(|| session.report_request().statistics_report());
        if let Some(report) = &report {
            print_report_summary(report);
        } else {
            println!("No domain finished; no report generated.");
        }

        if let Some(dir) = &output {
            write_outputs(
                dir,
                &script.name,
                &session.snapshot(),
                report.as_ref(),
                &formats,
            )?;
        }
        println!();
    }

    Ok(())
}

fn print_summary(session: &AssessmentSession) {
    let mut table = Table::new();
    table.set_header(vec![
        "Domain",
        "Status",
        "Correct",
        "Accuracy",
        "Difficulty",
        "Progress",
        "Avg Response",
    ]);

    for record in session.records() {
        table.add_row(vec![
            Cell::new(&record.domain_name),
            Cell::new(record.status.to_string().to_uppercase()),
            Cell::new(format!(
                "{}/{}",
                record.questions_correct, record.questions_attempted
            )),
            Cell::new(format!("{:.1}%", record.accuracy() * 100.0)),
            Cell::new(format!("{:.1}", record.current_difficulty)),
            Cell::new(format!("{:.0}%", record.progress)),
            Cell::new(format!("{:.1}s", record.average_response_time)),
        ]);
    }

    println!("{table}");
    println!(
        "Overall: {}/{} correct ({:.1}%)",
        session.total_correct(),
        session.total_questions(),
        session.overall_accuracy() * 100.0
    );
}
