//! heritage-quiz CLI — play and manage timed heritage quizzes.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "heritage-quiz",
    version,
    about = "Timed multiple-choice quizzes on cultural heritage"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a quiz in the terminal
    Play {
        /// Path to a .toml bank, or a topic served by the configured source
        #[arg(long)]
        bank: String,

        /// Bank source to fetch the topic from (default: config's default_source)
        #[arg(long)]
        source: Option<String>,

        /// Seconds for every question, overriding the bank and per-question limits
        #[arg(long)]
        seconds: Option<i64>,

        /// Do not print the countdown
        #[arg(long)]
        no_ticks: bool,

        /// Directory to write the result JSON to
        #[arg(long)]
        output: Option<PathBuf>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Validate question bank TOML files
    Validate {
        /// Path to a bank file or directory
        #[arg(long)]
        bank: PathBuf,
    },

    /// List topics from the configured bank sources
    Topics {
        /// Only list this source
        #[arg(long)]
        source: Option<String>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Create starter config and example question bank
    Init,
}

#[tokio::main]
async fn main() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("heritage_quiz=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Play {
            bank,
            source,
            seconds,
            no_ticks,
            output,
            config,
        } => {
            let options = commands::play::PlayOptions {
                bank,
                source,
                seconds,
                show_ticks: !no_ticks,
                output,
                config,
            };
            commands::play::execute(options).await
        }
        Commands::Validate { bank } => commands::validate::execute(bank),
        Commands::Topics { source, config } => commands::topics::execute(source, config).await,
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
