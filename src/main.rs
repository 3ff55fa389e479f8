//! docagent CLI binary entry point.

use clap::Parser;
use docagent::cli::{auth, drive, AuthCommands, Cli, Commands};
use docagent::config::DocAgentConfig;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("docagent=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = DocAgentConfig::from_env();

    let result = match cli.command {
        Commands::Auth(auth_args) => match auth_args.command {
            AuthCommands::Login => auth::handle_login(&config).await,
            AuthCommands::Status => auth::handle_status(&config).await,
            AuthCommands::Logout => auth::handle_logout(&config).await,
            AuthCommands::Test(args) => auth::handle_test(&config, args.clear_cache).await,
        },
        Commands::Ingest(args) => drive::handle_ingest(&config, args).await,
        Commands::Upload(args) => drive::handle_upload(&config, args).await,
        Commands::Consolidate(args) => drive::handle_consolidate(&config, args).await,
        Commands::Check => drive::handle_check(&config).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        eprintln!("Hint: {}", e.recovery_suggestion());
        std::process::exit(1);
    }
}
