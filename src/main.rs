use std::net::SocketAddr;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use placement_portal::auth::provision::{self, AdminRequest, Provisioned};
use placement_portal::auth::validation::AccountRules;
use placement_portal::config::{Cli, Command, Config};
use placement_portal::db;
use placement_portal::state::{AppState, DbPool};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Parse CLI args and load config
    let cli = Cli::parse();
    let data_dir = Config::data_dir(&cli);
    std::fs::create_dir_all(&data_dir)?;
    tracing::info!("Data directory: {}", data_dir.display());

    let config = Config::load(&cli)?;

    // Initialize database
    let pool = db::create_pool(&config.db_path())?;
    db::run_migrations(&pool)?;

    match cli.command {
        Some(Command::CreateAdmin {
            username,
            email,
            name,
            password,
        }) => {
            let rules = AccountRules::new()?;
            let outcome = provision::provision_admin(
                &pool,
                &rules,
                config.auth.bcrypt_cost,
                AdminRequest {
                    username: &username,
                    email: &email,
                    name: &name,
                    password: password.as_deref(),
                },
            )?;
            match outcome {
                Provisioned::Created { id } => println!("Created admin account {}", id),
                Provisioned::Promoted { id } => println!("Promoted account {} to admin", id),
                Provisioned::AlreadyAdmin { id } => println!("Account {} is already an admin", id),
            }
            Ok(())
        }
        Some(Command::Serve) | None => serve(pool, config).await,
    }
}

async fn serve(pool: DbPool, config: Config) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let state = AppState::new(pool, config)?;
    let app = placement_portal::build_router(state);

    tracing::info!("Listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Received Ctrl+C, shutting down");
}
