//! The `knowdebug init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    // Create knowdebug.toml
    if std::path::Path::new("knowdebug.toml").exists() {
        println!("knowdebug.toml already exists, skipping.");
    } else {
        std::fs::write("knowdebug.toml", SAMPLE_CONFIG)?;
        println!("Created knowdebug.toml");
    }

    // Create example answer script
    std::fs::create_dir_all("scripts")?;
    let example_path = std::path::Path::new("scripts/example.toml");
    if example_path.exists() {
        println!("scripts/example.toml already exists, skipping.");
    } else {
        std::fs::write(example_path, EXAMPLE_SCRIPT)?;
        println!("Created scripts/example.toml");
    }

    println!("\nNext steps:");
    println!("  1. Export GEMINI_API_KEY (or edit knowdebug.toml)");
    println!("  2. Run: knowdebug simulate --script scripts/example.toml");
    println!("  3. Run: knowdebug run --source <video-url>");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# knowdebug configuration

default_generator = "gemini"
max_retries = 3
retry_delay_ms = 1000
output_dir = "./knowdebug-results"

[generators.gemini]
type = "gemini"
api_key = "${GEMINI_API_KEY}"
model = "gemini-2.5-flash"

[generators.openai]
type = "openai"
api_key = "${OPENAI_API_KEY}"

[generators.offline]
type = "mock"

[policy]
required_questions = 5
mastered_accuracy = 0.8
completed_accuracy = 0.6
default_difficulty = 50.0
"#;

const EXAMPLE_SCRIPT: &str = r#"[session]
main_topic = "Rust ownership"
source = "https://www.youtube.com/watch?v=example"

[[domains]]
domain_name = "Moves and copies"
description = "Which values move and which are copied"
estimated_difficulty = 35

[[domains.answers]]
correct = true
response_time = 12.0
confidence = 0.8
tag = "move semantics"

[[domains.answers]]
correct = true
response_time = 9.0
confidence = 0.9
tag = "Copy types"

[[domains.answers]]
correct = false
response_time = 25.0
confidence = 0.6
tag = "partial moves"

[[domains.answers]]
correct = true
response_time = 14.0
confidence = 0.7
tag = "move semantics"

[[domains.answers]]
correct = true
response_time = 10.0
confidence = 0.8
tag = "Clone vs Copy"

[[domains.answers]]
correct = true
response_time = 11.0
confidence = 0.9
tag = "move semantics"

[[domains]]
domain_name = "Borrowing"
description = "Shared and mutable references"
estimated_difficulty = 50

[[domains.answers]]
correct = false
response_time = 40.0
confidence = 0.3
tag = "aliasing rules"

[[domains.answers]]
correct = true
response_time = 20.0
confidence = 0.5
tag = "shared references"
"#;
