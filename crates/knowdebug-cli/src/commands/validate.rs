//! The `knowdebug validate` command.

use std::path::{Path, PathBuf};

use anyhow::Result;

use knowdebug_core::parser::{self, AnswerScript};

/// Load one script, or every script under a directory.
pub fn load_scripts(path: &Path) -> Result<Vec<AnswerScript>> {
    if path.is_dir() {
        parser::load_script_directory(path)
    } else {
        Ok(vec![parser::parse_script(path)?])
    }
}

pub fn execute(script_path: PathBuf) -> Result<()> {
    let scripts = load_scripts(&script_path)?;
    anyhow::ensure!(
        !scripts.is_empty(),
        "no answer scripts found in {}",
        script_path.display()
    );

    let mut total_warnings = 0;

    for script in &scripts {
        let answers: usize = script.domains.iter().map(|d| d.answers.len()).sum();
        println!(
            "Script: {} ({} domains, {} answers)",
            script.name,
            script.domains.len(),
            answers
        );

        let warnings = parser::validate_script(script);
        for w in &warnings {
            let prefix = w
                .domain
                .as_ref()
                .map(|d| format!("  [{d}]"))
                .unwrap_or_else(|| "  ".to_string());
            println!("{prefix} WARNING: {}", w.message);
        }
        total_warnings += warnings.len();
    }

    if total_warnings == 0 {
        println!("All scripts valid.");
    } else {
        println!("\n{total_warnings} warning(s) found.");
    }

    Ok(())
}
