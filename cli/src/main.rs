use clap::{Parser, Subcommand};

mod commands;
mod util;

#[derive(Parser)]
#[command(
    name = "luregate",
    version,
    about = "Luregate CLI — operator interface for the deception gateway"
)]
struct Cli {
    /// Gateway base URL
    #[arg(long, env = "LUREGATE_API_URL", default_value = "http://localhost:3000")]
    api_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check gateway health
    Health,
    /// Show recent pipeline decisions
    Report {
        /// Maximum number of records (default 50, max 200)
        #[arg(long)]
        limit: Option<i64>,
    },
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let code = match cli.command {
        Commands::Health => commands::health::run(&cli.api_url).await,
        Commands::Report { limit } => commands::report::run(&cli.api_url, limit).await,
    };

    std::process::exit(code);
}
