/// Embersync - debug chat client for the Emberlink backend
use emberlink_core::auth::StaticCredentials;
use emberlink_core::backend::{MessageBackend, OutgoingMessage, PushChannel};
use emberlink_core::http::HttpBackend;
use emberlink_core::{ChatSession, Config};
use std::env;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Parse configuration
    let args: Vec<String> = env::args().collect();
    let (config, operands) = Config::from_args(&args)
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;

    let peer_user = operands
        .first()
        .ok_or_else(|| anyhow::anyhow!("a peer user id is required"))?;
    if config.local_user.is_empty() {
        anyhow::bail!("a local user id is required (positional or EMBERLINK_USER)");
    }

    let credentials = StaticCredentials::new(config.auth_token.clone());
    let backend = Arc::new(
        HttpBackend::new(&config, credentials)
            .map_err(|e| anyhow::anyhow!("Backend error: {}", e))?,
    );
    let push: Option<Arc<dyn PushChannel>> = if config.push_enabled {
        Some(backend.clone())
    } else {
        None
    };
    let message_backend: Arc<dyn MessageBackend> = backend;

    info!("🚀 Starting Embersync");
    info!("   Backend: {}", config.api_base);
    info!("   Local user: {}", config.local_user);
    info!("   Peer: {}", peer_user);

    let session = ChatSession::open(&config, message_backend, push, &config.local_user, peer_user)
        .await
        .map_err(|e| anyhow::anyhow!("Session error: {}", e))?;

    for msg in session.messages().await {
        info!(
            "[{}] {}: {}",
            msg.created_at.to_rfc3339(),
            msg.sender_id,
            msg.content.as_deref().unwrap_or("[image]")
        );
    }

    let mut events = session.subscribe_events();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    info!("Type a message and press enter to send; Ctrl+C to quit");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl+C received");
                break;
            }
            event = events.recv() => match event {
                Ok(event) => info!("event: {:?}", event),
                Err(RecvError::Lagged(n)) => warn!("dropped {} events", n),
                Err(RecvError::Closed) => break,
            },
            line = lines.next_line() => match line {
                Ok(Some(text)) if !text.trim().is_empty() => {
                    if let Err(e) = session.send_message(OutgoingMessage::text(text)).await {
                        warn!("send failed: {}", e);
                    }
                }
                Ok(Some(_)) => {}
                Ok(None) => break,
                Err(e) => {
                    warn!("stdin error: {}", e);
                    break;
                }
            },
        }
    }

    session.close();
    info!("Session closed");
    Ok(())
}
