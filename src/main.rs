use std::sync::Arc;

use futures::StreamExt;

use gloves_bot::bot::{ConversationController, ROOT_DIALOG_ID, order_dialogs};
use gloves_bot::channels::{CliChannel, message_routes};
use gloves_bot::config::BotConfig;
use gloves_bot::store::{LibSqlStore, MemoryStore, StateStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = BotConfig::from_env()?;

    eprintln!("🧤 Gloves Bot v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Messages: http://0.0.0.0:{}/api/messages", config.port);
    eprintln!("   Cancel keyword: {}", config.cancel_keyword);

    // ── State Store ──────────────────────────────────────────────────────
    let store: Arc<dyn StateStore> = match &config.db_path {
        Some(path) => {
            eprintln!("   Database: {}", path.display());
            Arc::new(LibSqlStore::new_local(path).await?)
        }
        None => {
            eprintln!("   Database: in-memory (state is lost on restart)");
            Arc::new(MemoryStore::new())
        }
    };

    // ── Dialogs ──────────────────────────────────────────────────────────
    let dialogs = Arc::new(order_dialogs()?);
    let controller = Arc::new(ConversationController::new(
        dialogs,
        ROOT_DIALOG_ID,
        store,
        config.clone(),
    )?);

    // ── HTTP Server ──────────────────────────────────────────────────────
    let app = message_routes(Arc::clone(&controller));
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;
    tracing::info!(port = config.port, "HTTP server started");
    let server = tokio::spawn(async move { axum::serve(listener, app).await });

    if !config.cli_enabled {
        server.await??;
        return Ok(());
    }

    // ── CLI ──────────────────────────────────────────────────────────────
    eprintln!("   Type a message and press Enter. Ctrl-D to exit.\n");
    let cli = CliChannel::new();
    let mut events = cli.start()?;
    while let Some(event) = events.next().await {
        // The controller has already sent the apology; the detail only goes to the log.
        if let Err(e) = controller.handle_turn(&event, &cli).await {
            tracing::error!(error = %e, "CLI turn failed");
        }
    }

    server.abort();
    Ok(())
}
