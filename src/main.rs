use std::path::PathBuf;

use clap::Parser;
use taskboard_store::Database;

#[derive(Parser)]
#[command(name = "taskboard", about = "Task management REST server")]
struct Args {
    /// Port to listen on
    #[arg(long, default_value_t = 8080)]
    port: u16,

    /// Path to the SQLite database file (defaults to ~/.taskboard/taskboard.db)
    #[arg(long)]
    db: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Starting taskboard server");

    let db_path = match args.db {
        Some(path) => path,
        None => {
            let dir = dirs_home().join(".taskboard");
            std::fs::create_dir_all(&dir).expect("Failed to create database directory");
            dir.join("taskboard.db")
        }
    };

    let db = Database::open(&db_path).expect("Failed to open database");
    tracing::info!(path = %db_path.display(), "Database opened");

    let config = taskboard_server::ServerConfig { port: args.port };
    let handle = taskboard_server::start(config, db)
        .await
        .expect("Failed to start server");

    tracing::info!(port = handle.port, "taskboard server ready");

    // Wait for shutdown signal
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to listen for ctrl+c");

    tracing::info!("Shutting down");
}

fn dirs_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}
