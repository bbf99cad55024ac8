//! Vitalis binary entry point.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use vitalis::agent::Agent;
use vitalis::channels::console::{self, ConsoleChannel};
use vitalis::channels::web;
use vitalis::config::Config;
use vitalis::db::{LibSqlStore, MemoryStore, RecordStore};
use vitalis::scheduler::ReminderScheduler;
use vitalis::time::SystemClock;

#[derive(Parser)]
#[command(name = "vitalis", version, about = "Conversational daily wellbeing tracker")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the agent with the console channel (default).
    Run {
        /// Use an in-memory store instead of the database file.
        #[arg(long)]
        ephemeral: bool,

        /// User id for the console session.
        #[arg(long, default_value = "console")]
        user: String,
    },
    /// Load and validate configuration, then exit.
    CheckConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command.unwrap_or(Commands::Run {
        ephemeral: false,
        user: "console".to_string(),
    }) {
        Commands::CheckConfig => {
            println!("Configuration OK: {config:#?}");
            Ok(())
        }
        Commands::Run { ephemeral, user } => run(config, ephemeral, &user).await,
    }
}

async fn run(config: Config, ephemeral: bool, user: &str) -> anyhow::Result<()> {
    let store: Arc<dyn RecordStore> = if ephemeral {
        tracing::info!("Using in-memory store");
        Arc::new(MemoryStore::new())
    } else {
        tracing::info!(path = %config.database.path.display(), "Opening database");
        Arc::new(LibSqlStore::open(&config.database.path).await?)
    };

    let clock = Arc::new(SystemClock);
    let agent = Arc::new(Agent::new(
        store.clone(),
        clock.clone(),
        config.bot.clone(),
    ));

    if config.web.enabled {
        let bind = config.web.bind;
        let web_store = store.clone();
        tokio::spawn(async move {
            if let Err(e) = web::serve(bind, web_store).await {
                tracing::error!(error = %e, "Health endpoint stopped");
            }
        });
    }

    if config.reminder.enabled {
        let scheduler = ReminderScheduler::new(
            store.clone(),
            Arc::new(ConsoleChannel),
            clock.clone(),
            config.bot.clone(),
            config.reminder.clone(),
        );
        tokio::spawn(scheduler.run());
    }

    console::run(agent, user).await?;
    tracing::info!("Console closed, shutting down");
    Ok(())
}
