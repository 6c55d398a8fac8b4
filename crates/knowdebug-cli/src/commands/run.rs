//! The `knowdebug run` command.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use knowdebug_core::driver::{Answer, AssessmentDriver, ProgressReporter, Respondent};
use knowdebug_core::model::{DomainRecord, Question};
use knowdebug_core::session::AnswerOutcome;
use knowdebug_providers::config::{load_config_from, resolve_generator};

use super::{parse_formats, print_report_summary, write_outputs};

/// Console progress reporter.
struct ConsoleReporter;

impl ProgressReporter for ConsoleReporter {
    fn on_question(&self, domain: &str, question: &Question) {
        println!(
            "\n[{domain}] (difficulty {}, ~{}s)",
            question.difficulty_level, question.estimated_time
        );
        println!("{}", question.question);
        for (i, option) in question.options.iter().enumerate() {
            println!("  {}. {option}", i + 1);
        }
    }

    fn on_answer(&self, _domain: &str, question: &Question, outcome: &AnswerOutcome) {
        if outcome.is_correct {
            println!("Correct!");
        } else {
            println!(
                "Incorrect. The answer was {}.",
                question.correct_answer_index + 1
            );
        }
        if !question.explanation.is_empty() {
            println!("{}", question.explanation);
        }
        println!(
            "Difficulty {:.1} -> {:.1} | progress {:.0}%",
            outcome.update.previous_difficulty,
            outcome.new_difficulty(),
            outcome.progress
        );
    }

    fn on_domain_complete(&self, record: &DomainRecord) {
        println!(
            "\nFinished '{}': {} ({}/{} correct)",
            record.domain_name,
            record.status.to_string().to_uppercase(),
            record.questions_correct,
            record.questions_attempted
        );
    }
}

/// Answers questions from standard input.
struct TerminalRespondent {
    lines: Lines<BufReader<Stdin>>,
}

impl TerminalRespondent {
    fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }

    /// Prompt and read one trimmed line; `None` on end of input.
    async fn prompt(&mut self, text: &str) -> Result<Option<String>> {
        println!("{text}: ");
        let line = self
            .lines
            .next_line()
            .await
            .context("failed to read from stdin")?;
        Ok(line.map(|l| l.trim().to_string()))
    }
}

#[async_trait]
impl Respondent for TerminalRespondent {
    async fn answer(&mut self, question: &Question, _record: &DomainRecord) -> Result<Option<Answer>> {
        let started = Instant::now();
        let count = question.options.len();

        let answer_index = loop {
            let Some(input) = self.prompt(&format!("Answer [1-{count}, q to quit]")).await? else {
                return Ok(None);
            };
            if input.eq_ignore_ascii_case("q") {
                return Ok(None);
            }
            match input.parse::<usize>() {
                Ok(n) if (1..=count).contains(&n) => break n - 1,
                _ => println!("Please enter a number between 1 and {count}."),
            }
        };
        let response_time = started.elapsed().as_secs_f64();

        let confidence = loop {
            let Some(input) = self.prompt("Confidence [0-100, default 50]").await? else {
                break 50.0;
            };
            if input.is_empty() {
                break 50.0;
            }
            match input.parse::<f64>() {
                Ok(c) if (0.0..=100.0).contains(&c) => break c,
                _ => println!("Please enter a number between 0 and 100."),
            }
        };

        Ok(Some(Answer {
            answer_index,
            confidence: confidence / 100.0,
            response_time,
        }))
    }
}

/// Parse `--domains` (1-based, comma-separated) into session indices.
fn parse_domain_selection(selection: &str, domain_count: usize) -> Result<Vec<usize>> {
    let mut indices = Vec::new();
    for part in selection.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let n: usize = part
            .parse()
            .map_err(|_| anyhow::anyhow!("invalid domain number: '{part}'"))?;
        anyhow::ensure!(
            (1..=domain_count).contains(&n),
            "domain {n} out of range (1-{domain_count})"
        );
        if !indices.contains(&(n - 1)) {
            indices.push(n - 1);
        }
    }
    anyhow::ensure!(!indices.is_empty(), "no domains selected");
    Ok(indices)
}

pub async fn execute(
    source: String,
    generator_name: Option<String>,
    domains: Option<String>,
    output: Option<PathBuf>,
    format: String,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let formats = parse_formats(&format)?;
    let config = load_config_from(config_path.as_deref())?;
    let generator = resolve_generator(&config, generator_name.as_deref())?;
    let driver = AssessmentDriver::new(generator, config.driver_config());

    eprintln!(
        "knowdebug v{} (generator: {})",
        env!("CARGO_PKG_VERSION"),
        driver.generator_name()
    );

    let mut session = driver.begin(&source).await?;
    println!("Topic: {}", session.main_topic());
    for (i, domain) in session.domains().enumerate() {
        println!(
            "  {}. {} (difficulty {:.0}) - {}",
            i + 1,
            domain.domain_name,
            domain.estimated_difficulty,
            domain.description
        );
    }

    let selected = match &domains {
        Some(s) => parse_domain_selection(s, session.domain_count())?,
        None => (0..session.domain_count()).collect(),
    };

    let mut respondent = TerminalRespondent::new();
    let reporter = ConsoleReporter;
    for index in selected {
        let record = driver
            .run_domain(&mut session, index, &mut respondent, &reporter)
            .await?;
        if !record.status.is_terminal() {
            println!("\nLeft '{}' unfinished.", record.domain_name);
        }
    }

    let report = if session.completed_domains().is_empty() {
        println!("\nNo domain finished; no report generated.");
        None
    } else {
        let report = driver.final_report(&session).await?;
        print_report_summary(&report);
        Some(report)
    };

    tracing::info!(
        session = %session.id(),
        questions = session.total_questions(),
        correct = session.total_correct(),
        "assessment finished"
    );

    let output = output.unwrap_or_else(|| config.output_dir.clone());
    let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H%M%S").to_string();
    write_outputs(
        &output,
        &timestamp,
        &session.snapshot(),
        report.as_ref(),
        &formats,
    )?;

    Ok(())
}
