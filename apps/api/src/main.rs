use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::HeaderValue;
use dotenv::dotenv;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{self, TraceLayer};
use tracing::{info, warn, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod router;

use identity_cell::{IdentityState, InMemoryOtpStore};
use integration_cell::{IntegrationState, InventoryStore};
use reminder_cell::ReminderDispatcher;
use shared_config::AppConfig;
use shared_utils::notify::{LogNotifier, Notifier};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Telecare API server");

    let config = Arc::new(AppConfig::from_env());
    if !config.is_configured() {
        warn!("Store credentials missing; store-backed routes will fail");
    }

    let notifier: Arc<dyn Notifier> = Arc::new(LogNotifier);

    let identity = Arc::new(IdentityState {
        config: config.clone(),
        otp: Arc::new(InMemoryOtpStore::new()),
        notifier: notifier.clone(),
    });

    let inventory = Arc::new(InventoryStore::new(&config.inventory_path));
    if let Err(e) = inventory.load().await {
        warn!("Inventory not loaded at startup: {}", e);
    }
    let integration = Arc::new(IntegrationState {
        config: config.clone(),
        inventory,
    });

    ReminderDispatcher::new(&config, notifier.clone()).spawn();

    let cors = if config.frontend_origin == "*" {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        match config.frontend_origin.parse::<HeaderValue>() {
            Ok(origin) => CorsLayer::new()
                .allow_origin(origin)
                .allow_methods(Any)
                .allow_headers(Any),
            Err(_) => {
                warn!(
                    "Unusable FRONTEND_ORIGIN {:?}; allowing any origin",
                    config.frontend_origin
                );
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any)
            }
        }
    };

    let app = router::create_router(config.clone(), identity, integration)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new().level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
