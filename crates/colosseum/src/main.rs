//! Colosseum - turn-based multi-agent game orchestration

use clap::{Parser, Subcommand};
use tracing::error;

mod duel;

/// Colosseum - referee-supervised games between autonomous agents
#[derive(Parser)]
#[command(name = "colosseum")]
#[command(about = "Turn-based multi-agent game orchestration")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the scripted exhibition duel
    Demo {
        /// Rounds to play
        #[arg(short, long, default_value_t = 3)]
        rounds: u32,
        /// Verbose logging
        #[arg(short, long)]
        verbose: bool,
    },
    /// Run the duel against a live chat-completions backend
    Live {
        /// Rounds to play
        #[arg(short, long, default_value_t = 3)]
        rounds: u32,
        /// Model for every persona without an override
        #[arg(short, long)]
        model: Option<String>,
        /// Verbose logging
        #[arg(short, long)]
        verbose: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let verbose = matches!(
        cli.command,
        Commands::Demo { verbose: true, .. } | Commands::Live { verbose: true, .. }
    );
    if verbose {
        tracing_subscriber::fmt().with_env_filter("debug").init();
    } else {
        tracing_subscriber::fmt::init();
    }

    let result = match cli.command {
        Commands::Demo { rounds, verbose } => duel::run_scripted(rounds, verbose).await,
        Commands::Live {
            rounds,
            model,
            verbose,
        } => duel::run_live(rounds, model, verbose).await,
    };

    if let Err(e) = result {
        error!("{:#}", e);
        std::process::exit(1);
    }
}
