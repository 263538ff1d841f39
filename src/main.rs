use anyhow::Result;
use bucket_manager::{
    AppState,
    config::{AdminAction, AppConfig},
    db, routes,
    services::account_service::AccountService,
};
use std::{io::ErrorKind, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "bucket_manager=info,tower_http=info";

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    // --- Parse config + admin flags ---
    let (cfg, action) = AppConfig::from_env_and_args()?;

    tracing::info!("Starting bucket-manager with config: {:?}", cfg);

    // --- Initialize SQLite connection ---
    let db = Arc::new(db::connect(&cfg.database_url, 5).await?);
    db::run_migrations(&db).await?;

    // --- Handle one-shot admin actions ---
    if let Some(action) = action {
        let accounts = AccountService::new(db.clone(), cfg.password_hash_cost);
        run_admin_action(&accounts, action).await?;
        return Ok(()); // exit after the action
    }

    // --- Build router ---
    let addr = cfg.addr();
    let host = cfg.host.clone();
    let port = cfg.port;
    let app = routes::routes::app(AppState::new(db, cfg));

    // --- Start server ---
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn run_admin_action(accounts: &AccountService, action: AdminAction) -> Result<()> {
    match action {
        AdminAction::Migrate => {
            tracing::info!("Database migration complete.");
        }
        AdminAction::GrantStaff(username) => {
            let user = accounts.set_staff(&username, true).await?;
            tracing::info!("Granted staff privileges to {}", user.username);
        }
        AdminAction::RevokeStaff(username) => {
            let user = accounts.set_staff(&username, false).await?;
            tracing::info!("Revoked staff privileges from {}", user.username);
        }
        AdminAction::DeleteUser(username) => {
            let user = accounts.delete(&username).await?;
            tracing::info!("Deleted user {} and everything they owned", user.username);
        }
    }
    Ok(())
}
