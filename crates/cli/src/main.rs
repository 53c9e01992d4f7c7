mod commands;

use clap::{CommandFactory, Parser};
use clap_complete::{Shell, generate};
use std::io;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "storekit")]
#[command(version, about = "Publish storefront layouts as static sites", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Parser)]
enum Command {
    /// Initialize a new store directory
    Init {
        /// Path to create the store directory
        path: PathBuf,

        /// Store display name
        #[arg(long)]
        name: Option<String>,
    },

    /// Validate a store's layout document
    Validate {
        /// Path to store directory
        path: PathBuf,
    },

    /// Publish a store to the hosting provider
    Publish {
        /// Path to store directory
        path: PathBuf,

        /// Skip confirmation prompts
        #[arg(long)]
        force: bool,
    },

    /// Show publish status and info
    Status {
        /// Path to store directory (defaults to current dir)
        path: Option<PathBuf>,
    },

    /// Clear a store's publish metadata
    Unpublish {
        /// Path to store directory
        path: PathBuf,
    },

    /// Serve the publish HTTP API over a directory of stores
    Serve {
        /// Directory containing one subdirectory per store
        #[arg(long)]
        stores: PathBuf,

        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
    },

    /// Configure hosting provider credentials
    Configure,

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("storekit=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Init { path, name } => commands::init::run(path, name),
        Command::Validate { path } => commands::validate::run(path),
        Command::Publish { path, force } => commands::publish::run(path, force).await,
        Command::Status { path } => commands::status::run(path).await,
        Command::Unpublish { path } => commands::unpublish::run(path),
        Command::Serve { stores, port } => commands::serve::run(stores, port).await,
        Command::Configure => commands::configure::run(),
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "storekit", &mut io::stdout());
            Ok(())
        }
    }
}
