//! Web player CLI - inspect and replay player frame sessions.

mod decode;
mod replay;
mod url;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "webplayer")]
#[command(about = "Inspect and replay web player frame sessions")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the player frame address for a configuration
    Url {
        #[command(flatten)]
        player: url::PlayerArgs,

        /// Session id to embed (random if omitted)
        #[arg(long)]
        session: Option<String>,
    },

    /// Decode a boundary message and print it
    Decode {
        /// Raw message (read from stdin if omitted)
        message: Option<String>,
    },

    /// Replay a transcript of runtime messages against a channel
    Replay {
        /// Transcript file, one raw message per line; `{id}` expands to the session id
        transcript: PathBuf,

        /// Source files to run, keyed by `/<file name>`
        files: Vec<PathBuf>,

        /// Module to execute first
        #[arg(short, long, default_value = "/index.js")]
        entry: String,

        #[command(flatten)]
        player: url::PlayerArgs,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        tracing_subscriber::EnvFilter::from_default_env()
            .add_directive(tracing::Level::DEBUG.into())
    } else {
        tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Url { player, session } => url::execute(&player, session.as_deref())?,

        Commands::Decode { message } => decode::execute(message.as_deref())?,

        Commands::Replay {
            transcript,
            files,
            entry,
            player,
        } => {
            replay::execute(&transcript, &files, &entry, &player).await?;
        }
    }

    Ok(())
}
