//! TOML answer-script parser.
//!
//! An answer script describes an assessment offline: a topic, its domains,
//! and the answers given in each domain. Scripts are replayed through a real
//! [`AssessmentSession`] without any generator.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::model::{AnswerEvent, AssessmentDomain};
use crate::policy::AssessmentPolicy;
use crate::session::AssessmentSession;

/// Intermediate TOML structure for parsing script files.
#[derive(Debug, Deserialize)]
struct TomlScriptFile {
    session: TomlSessionHeader,
    #[serde(default)]
    policy: Option<AssessmentPolicy>,
    #[serde(default)]
    domains: Vec<TomlScriptDomain>,
}

#[derive(Debug, Deserialize)]
struct TomlSessionHeader {
    main_topic: String,
    #[serde(default)]
    source: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TomlScriptDomain {
    domain_name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    estimated_difficulty: f64,
    #[serde(default)]
    answers: Vec<TomlScriptAnswer>,
}

#[derive(Debug, Deserialize)]
struct TomlScriptAnswer {
    correct: bool,
    response_time: f64,
    #[serde(default = "default_confidence")]
    confidence: f64,
    #[serde(default = "default_estimated_time")]
    estimated_time: f64,
    tag: String,
    #[serde(default)]
    question: Option<String>,
    #[serde(default)]
    answer_index: Option<usize>,
}

fn default_confidence() -> f64 {
    0.5
}

fn default_estimated_time() -> f64 {
    30.0
}

/// A parsed answer script.
#[derive(Debug, Clone)]
pub struct AnswerScript {
    /// File stem of the script.
    pub name: String,
    pub main_topic: String,
    pub source: Option<String>,
    pub policy: AssessmentPolicy,
    pub domains: Vec<ScriptedDomain>,
}

/// One domain of a script with the answers given in it.
#[derive(Debug, Clone)]
pub struct ScriptedDomain {
    pub domain: AssessmentDomain,
    pub answers: Vec<AnswerEvent>,
}

/// Parse a single TOML answer script.
pub fn parse_script(path: &Path) -> Result<AnswerScript> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read script file: {}", path.display()))?;

    parse_script_str(&content, path)
}

/// Parse a TOML string into an `AnswerScript` (useful for testing).
pub fn parse_script_str(content: &str, source_path: &Path) -> Result<AnswerScript> {
    let parsed: TomlScriptFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let name = source_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "script".to_string());

    let domains = parsed
        .domains
        .into_iter()
        .map(|d| {
            let answers = d
                .answers
                .into_iter()
                .map(|a| {
                    let mut event = AnswerEvent::new(
                        a.correct,
                        a.response_time,
                        a.confidence,
                        a.estimated_time,
                        a.tag,
                    );
                    event.question_id = a.question;
                    event.answer_index = a.answer_index;
                    event
                })
                .collect();
            ScriptedDomain {
                domain: AssessmentDomain {
                    domain_name: d.domain_name,
                    description: d.description,
                    estimated_difficulty: d.estimated_difficulty,
                },
                answers,
            }
        })
        .collect();

    Ok(AnswerScript {
        name,
        main_topic: parsed.session.main_topic,
        source: parsed.session.source,
        policy: parsed.policy.unwrap_or_default(),
        domains,
    })
}

/// Recursively load all `.toml` scripts from a directory, sorted by path.
pub fn load_script_directory(dir: &Path) -> Result<Vec<AnswerScript>> {
    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
    {
        paths.push(entry?.path());
    }
    paths.sort();

    let mut scripts = Vec::new();
    for path in paths {
        if path.is_dir() {
            scripts.extend(load_script_directory(&path)?);
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            match parse_script(&path) {
                Ok(script) => scripts.push(script),
                Err(e) => {
                    tracing::warn!("skipping {}: {:#}", path.display(), e);
                }
            }
        }
    }

    Ok(scripts)
}

/// A warning from script validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// The domain name (if applicable).
    pub domain: Option<String>,
    /// Warning message.
    pub message: String,
}

/// Validate a script for common issues.
pub fn validate_script(script: &AnswerScript) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    if let Err(e) = script.policy.validate() {
        warnings.push(ValidationWarning {
            domain: None,
            message: e.to_string(),
        });
    }

    if script.domains.is_empty() {
        warnings.push(ValidationWarning {
            domain: None,
            message: "script has no domains".into(),
        });
    }

    let mut seen = HashSet::new();
    for scripted in &script.domains {
        let name = &scripted.domain.domain_name;
        if !seen.insert(name.as_str()) {
            warnings.push(ValidationWarning {
                domain: Some(name.clone()),
                message: format!("duplicate domain name: {name}"),
            });
        }

        if scripted.answers.is_empty() {
            warnings.push(ValidationWarning {
                domain: Some(name.clone()),
                message: "no answers; domain will stay not started".into(),
            });
        }

        for (i, answer) in scripted.answers.iter().enumerate() {
            if let Err(e) = answer.validate() {
                warnings.push(ValidationWarning {
                    domain: Some(name.clone()),
                    message: format!("answer #{}: {e}", i + 1),
                });
            }
        }

        // The domain finishes once enough correct answers are in
        let required = script.policy.required_questions as usize;
        if required > 0 {
            let finish_at = scripted
                .answers
                .iter()
                .enumerate()
                .filter(|(_, a)| a.is_correct)
                .nth(required - 1)
                .map(|(i, _)| i);
            if let Some(last) = finish_at {
                let extra = scripted.answers.len() - last - 1;
                if extra > 0 {
                    warnings.push(ValidationWarning {
                        domain: Some(name.clone()),
                        message: format!(
                            "{extra} answer(s) after the domain finishes will be ignored"
                        ),
                    });
                }
            }
        }
    }

    warnings
}

/// Replay a script through a fresh session.
///
/// Domains are played in script order. Answers left over after a domain
/// finishes are skipped.
pub fn replay(script: &AnswerScript) -> Result<AssessmentSession> {
    let domains = script.domains.iter().map(|d| d.domain.clone()).collect();
    let mut session = AssessmentSession::new(&script.main_topic, domains, script.policy.clone())
        .with_context(|| format!("invalid script '{}'", script.name))?;
    if let Some(source) = &script.source {
        session = session.with_source(source);
    }

    for (index, scripted) in script.domains.iter().enumerate() {
        if scripted.answers.is_empty() {
            continue;
        }
        session.start_domain(index)?;

        for (i, answer) in scripted.answers.iter().enumerate() {
            if session.record(index)?.status.is_terminal() {
                tracing::warn!(
                    domain = %scripted.domain.domain_name,
                    skipped = scripted.answers.len() - i,
                    "domain finished, skipping remaining answers"
                );
                break;
            }
            session.submit_answer(answer).with_context(|| {
                format!(
                    "domain '{}', answer #{}",
                    scripted.domain.domain_name,
                    i + 1
                )
            })?;
        }
    }

    Ok(session)
}
