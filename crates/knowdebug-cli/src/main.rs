//! knowdebug CLI: the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "knowdebug",
    version,
    about = "Adaptive knowledge assessment from source material"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an interactive assessment in the terminal
    Run {
        /// Source material to assess (e.g. a video URL)
        #[arg(long)]
        source: String,

        /// Generator to use (name from config, or gemini/openai/mock)
        #[arg(long)]
        generator: Option<String>,

        /// Domains to assess, 1-based and comma-separated (default: all)
        #[arg(long)]
        domains: Option<String>,

        /// Output directory (default: from config)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Output format: json, html, md, all
        #[arg(long, default_value = "json")]
        format: String,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Replay answer scripts through the assessment engine
    Simulate {
        /// Path to an answer script or a directory of scripts
        #[arg(long)]
        script: PathBuf,

        /// Output directory for session and report files
        #[arg(long)]
        output: Option<PathBuf>,

        /// Output format: json, html, md, all
        #[arg(long, default_value = "json")]
        format: String,
    },

    /// Validate answer script TOML files
    Validate {
        /// Path to an answer script or a directory of scripts
        #[arg(long)]
        script: PathBuf,
    },

    /// Render a saved report JSON to HTML or Markdown
    Render {
        /// Report JSON written by `run` or `simulate`
        #[arg(long)]
        report: PathBuf,

        /// Session JSON to include per-domain statistics from
        #[arg(long)]
        session: Option<PathBuf>,

        /// Output format: html, md
        #[arg(long, default_value = "html")]
        format: String,

        /// Output file (default: next to the report)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Create starter config and example answer script
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("knowdebug=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            source,
            generator,
            domains,
            output,
            format,
            config,
        } => commands::run::execute(source, generator, domains, output, format, config).await,
        Commands::Simulate {
            script,
            output,
            format,
        } => commands::simulate::execute(script, output, format),
        Commands::Validate { script } => commands::validate::execute(script),
        Commands::Render {
            report,
            session,
            format,
            output,
        } => commands::render::execute(report, session, format, output),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
