use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "whereintheworld", version, about = "Publish where you are as your Slack status")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Track coordinates read from stdin ("lat,lon" per line)
    Run(commands::run::RunArgs),
    /// Resolve a single coordinate to a label
    Resolve(commands::resolve::ResolveArgs),
    /// Known location management
    Locations {
        #[command(subcommand)]
        action: commands::locations::LocationsAction,
    },
    /// Manual Slack status
    Status {
        #[command(subcommand)]
        action: commands::status::StatusAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// API keys for Google and Slack
    Auth {
        #[command(subcommand)]
        action: commands::auth::AuthAction,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("whereintheworld=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Run(args) => commands::run::run(args).await,
        Commands::Resolve(args) => commands::resolve::run(args).await,
        Commands::Locations { action } => commands::locations::run(action),
        Commands::Status { action } => commands::status::run(action).await,
        Commands::Config { action } => commands::config::run(action),
        Commands::Auth { action } => commands::auth::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
