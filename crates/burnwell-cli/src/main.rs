//! burnwell CLI: the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "burnwell", version, about = "Burnout self-assessment client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Take the assessment interactively
    Take {
        /// User to take the assessment as (defaults to `user_id` in config)
        #[arg(long)]
        user: Option<String>,

        /// Use the built-in offline backend instead of the server
        #[arg(long)]
        offline: bool,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// List the assessment questions
    Questions {
        /// Use the built-in offline backend instead of the server
        #[arg(long)]
        offline: bool,

        /// Output format: text, json
        #[arg(long, default_value = "text")]
        format: String,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Show the user's unfinished assessment, if any
    Status {
        /// User to look up (defaults to `user_id` in config)
        #[arg(long)]
        user: Option<String>,

        /// Use the built-in offline backend instead of the server
        #[arg(long)]
        offline: bool,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Create a starter config file
    Init,
}

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("burnwell=info")),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Take {
            user,
            offline,
            config,
        } => commands::take::execute(user, offline, config).await,
        Commands::Questions {
            offline,
            format,
            config,
        } => commands::questions::execute(offline, format, config).await,
        Commands::Status {
            user,
            offline,
            config,
        } => commands::status::execute(user, offline, config).await,
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
