//! Babelbook CLI - Command-line interface for EPUB translation

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Parse and validate batch size argument (must be at least 1)
fn parse_batch_size(s: &str) -> Result<usize, String> {
    let n: usize = s.parse().map_err(|_| format!("'{}' is not a valid number", s))?;
    if n < 1 {
        Err("batch size must be at least 1".to_string())
    } else {
        Ok(n)
    }
}

#[derive(Parser)]
#[command(name = "babelbook")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Translate an EPUB into another language
    Translate {
        /// Input EPUB path
        input: String,

        /// Directory the translated archive is written to
        #[arg(short, long, default_value = "translated")]
        output_dir: String,

        /// Translation provider (openai, deepseek)
        #[arg(short, long)]
        provider: Option<String>,

        /// Pages per translation request (must be at least 1)
        #[arg(short, long, value_parser = parse_batch_size)]
        batch_size: Option<usize>,

        /// Configuration file path
        #[arg(short, long)]
        config: Option<String>,

        /// Markdown file carrying the translation system prompt
        #[arg(long)]
        prompt: Option<String>,

        /// Skip the provider availability probe
        #[arg(long)]
        skip_probe: bool,
    },

    /// Display information about an EPUB
    Info {
        /// Input EPUB path
        input: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check provider configuration
    Check {
        /// Translation provider (openai, deepseek)
        #[arg(short, long)]
        provider: Option<String>,

        /// Configuration file path
        #[arg(short, long)]
        config: Option<String>,

        /// Issue a real probe request against the provider
        #[arg(long)]
        live: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose {
        "babelbook_cli=debug,babelbook_core=debug"
    } else {
        "babelbook_cli=info"
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(filter))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Translate {
            input,
            output_dir,
            provider,
            batch_size,
            config,
            prompt,
            skip_probe,
        } => {
            commands::translate(commands::TranslateArgs {
                input,
                output_dir,
                provider,
                batch_size,
                config,
                prompt,
                skip_probe,
            })
            .await
        }

        Commands::Info { input, json } => commands::info(&input, json),

        Commands::Check {
            provider,
            config,
            live,
        } => commands::check(provider.as_deref(), config.as_deref(), live).await,
    }
}
