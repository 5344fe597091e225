use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use reviewd::config::Config;
use reviewd::db::ReviewDb;
use reviewd::server;

#[derive(Parser)]
#[command(name = "reviewd")]
#[command(version, about = "Pull request reviewer assignment service")]
struct Cli {
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP service
    Serve {
        /// Port to serve on (overrides REVIEWD_PORT)
        #[arg(short, long)]
        port: Option<u16>,

        /// Database path (overrides REVIEWD_DB_PATH)
        #[arg(long)]
        db_path: Option<PathBuf>,

        /// Enable dev mode (bind all interfaces, permissive CORS)
        #[arg(long)]
        dev: bool,
    },
    /// Initialize the database and exit
    Init {
        /// Database path (overrides REVIEWD_DB_PATH)
        #[arg(long)]
        db_path: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let mut config = Config::load();
    init_tracing(cli.verbose, config.is_production());

    match cli.command {
        Commands::Serve { port, db_path, dev } => {
            if let Some(port) = port {
                config.port = port;
            }
            if let Some(db_path) = db_path {
                config.db_path = db_path;
            }
            config.dev_mode = dev;
            server::start_server(config).await?;
        }
        Commands::Init { db_path } => {
            if let Some(db_path) = db_path {
                config.db_path = db_path;
            }
            if let Some(parent) = config.db_path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)
                        .context("Failed to create database directory")?;
                }
            }
            ReviewDb::new(&config.db_path).context("Failed to initialize review database")?;
            println!("Initialized review database at {}", config.db_path.display());
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool, json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let directives = if verbose { "reviewd=debug,info" } else { "info" };
        tracing_subscriber::EnvFilter::new(directives)
    });
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
