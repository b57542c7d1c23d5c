//! SupportDesk: support chatbot server.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use supportdesk_chat::{LLMConfig, ProviderRegistry, ResponseGenerator};
use supportdesk_core::{DataPaths, SupportDeskConfig};
use supportdesk_server::auth::hash_password;
use supportdesk_server::{build_router, ingestion, AppState};
use supportdesk_store::{SqliteStore, UserRole};

fn resolve_data_dir() -> PathBuf {
    std::env::var("SUPPORTDESK_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("data"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Create the initial admin account unless one with that email exists.
fn seed_admin(data_dir: &Path) -> anyhow::Result<()> {
    let paths = DataPaths::new(data_dir)?;
    let store = SqliteStore::open(&paths.db)
        .map_err(|e| anyhow::anyhow!("Failed to open store: {}", e))?;

    let email = env_or("ADMIN_EMAIL", "admin@example.com");
    let username = env_or("ADMIN_USERNAME", "admin");
    let password = env_or("ADMIN_PASSWORD", "admin123");

    if store.find_user_by_email_or_username(&email, &username)?.is_some() {
        println!("Admin user already exists: {}", email);
        return Ok(());
    }

    let hash = hash_password(&password)?;
    let id = store.create_user(&username, &email, &hash, UserRole::Admin)?;
    println!("Created admin user {} ({}), id {}", username, email, id);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();

    // Handle CLI subcommands
    if args.len() > 1 {
        match args[1].as_str() {
            "seed-admin" => {
                seed_admin(&resolve_data_dir())?;
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("SupportDesk: support chatbot server");
                println!();
                println!("Usage: supportdesk [command]");
                println!();
                println!("Commands:");
                println!("  (none)        Start the server");
                println!("  seed-admin    Create the admin account from ADMIN_* variables");
                println!("  help          Show this help message");
                return Ok(());
            }
            _ => {
                eprintln!("Unknown command: {}. Use 'supportdesk help' for usage.", args[1]);
                std::process::exit(1);
            }
        }
    }

    let data_dir = resolve_data_dir();
    info!("Data directory: {}", data_dir.display());

    let config = SupportDeskConfig::from_env(&data_dir)?;
    let port = config.port;

    let store = SqliteStore::open(&config.data_paths.db)
        .map_err(|e| anyhow::anyhow!("Failed to open store: {}", e))?;

    // Unknown provider names fail here, not on the first chat
    let llm_config = LLMConfig::load(&config.data_paths.llm_config_file);
    let registry = Arc::new(ProviderRegistry::new(llm_config, reqwest::Client::new()));
    let generator = ResponseGenerator::from_config(registry)?;

    let state = Arc::new(AppState::new(config, store, generator));

    ingestion::start_ingestion_worker(state.clone());

    let app = build_router(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("SupportDesk server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
