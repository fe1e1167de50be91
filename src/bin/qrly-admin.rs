use anyhow::Result;
use clap::{Parser, Subcommand};
use qrly::api::handlers::generate_short_code;
use qrly::config::{Config, DatabaseBackend};
use qrly::storage::{PostgresStorage, SqliteStorage, Storage, StorageError};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "qrly-admin")]
#[command(about = "Qrly admin management CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a short link for an owner
    Create {
        /// Owner id the link belongs to
        owner: String,
        /// Destination URL (http or https)
        url: String,
        /// Custom short code (random when omitted)
        #[arg(long)]
        code: Option<String>,
    },
    /// List an owner's links
    List {
        /// Owner id to list links for
        owner: String,
    },
    /// Re-enable a deactivated link
    Activate {
        /// Link id
        id: i64,
    },
    /// Deactivate a link without deleting its history
    Deactivate {
        /// Link id
        id: i64,
    },
    /// Delete a link and all of its scan events
    Delete {
        /// Link id
        id: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    let storage: Arc<dyn Storage> = match config.database.backend {
        DatabaseBackend::Sqlite => Arc::new(
            SqliteStorage::new(&config.database.url, config.database.max_connections).await?,
        ),
        DatabaseBackend::Postgres => Arc::new(PostgresStorage::new(&config.database.url).await?),
    };

    // Ensure database is initialized
    storage.init().await?;

    match cli.command {
        Commands::Create { owner, url, code } => {
            let result = match &code {
                Some(code) => storage.create_link(code, &url, &owner).await,
                None => {
                    let mut result = Err(StorageError::Conflict);
                    for _ in 0..5 {
                        result = storage.create_link(&generate_short_code(), &url, &owner).await;
                        if !matches!(result, Err(StorageError::Conflict)) {
                            break;
                        }
                    }
                    result
                }
            };

            match result {
                Ok(link) => println!(
                    "✓ Created link '{}' -> {} (id {})",
                    link.short_code, link.destination_url, link.id
                ),
                Err(StorageError::Conflict) => println!("⚠ Short code already exists"),
                Err(StorageError::Other(e)) => return Err(e),
            }
        }
        Commands::List { owner } => {
            let links = storage.list_links(&owner, 1000, 0).await?;
            if links.is_empty() {
                println!("No links found for owner '{}'.", owner);
            } else {
                println!(
                    "{:<8} {:<12} {:<8} {:<8} {}",
                    "ID", "Code", "Active", "Scans", "Destination"
                );
                println!("{}", "-".repeat(72));
                for link in links {
                    println!(
                        "{:<8} {:<12} {:<8} {:<8} {}",
                        link.id, link.short_code, link.is_active, link.scan_count,
                        link.destination_url
                    );
                }
            }
        }
        Commands::Activate { id } => match storage.update_link(id, None, Some(true)).await? {
            Some(link) => println!("✓ Activated link '{}' (id {})", link.short_code, id),
            None => println!("⚠ Link {} not found", id),
        },
        Commands::Deactivate { id } => match storage.update_link(id, None, Some(false)).await? {
            Some(link) => println!("✓ Deactivated link '{}' (id {})", link.short_code, id),
            None => println!("⚠ Link {} not found", id),
        },
        Commands::Delete { id } => {
            if storage.delete_link(id).await? {
                println!("✓ Deleted link {} and its scan events", id);
            } else {
                println!("⚠ Link {} not found", id);
            }
        }
    }

    Ok(())
}
