use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "overseer", version, about = "Overseer obligation tracker CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// User registration and linking
    User {
        #[command(subcommand)]
        action: commands::user::UserAction,
    },
    /// Task management
    Task {
        #[command(subcommand)]
        action: commands::task::TaskAction,
    },
    /// Reward catalog and grants
    Reward {
        #[command(subcommand)]
        action: commands::reward::RewardAction,
    },
    /// Punishment catalog and assignments
    Punishment {
        #[command(subcommand)]
        action: commands::punishment::PunishmentAction,
    },
    /// Point threshold rules
    Threshold {
        #[command(subcommand)]
        action: commands::threshold::ThresholdAction,
    },
    /// Points and completion statistics
    Stats {
        #[command(subcommand)]
        action: commands::stats::StatsAction,
    },
    /// Deadline and reminder sweeps
    Sweep {
        #[command(subcommand)]
        action: commands::sweep::SweepAction,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::User { action } => commands::user::run(action).await,
        Commands::Task { action } => commands::task::run(action).await,
        Commands::Reward { action } => commands::reward::run(action).await,
        Commands::Punishment { action } => commands::punishment::run(action).await,
        Commands::Threshold { action } => commands::threshold::run(action).await,
        Commands::Stats { action } => commands::stats::run(action).await,
        Commands::Sweep { action } => commands::sweep::run(action).await,
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
