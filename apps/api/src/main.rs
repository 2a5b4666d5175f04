use std::net::SocketAddr;

use anyhow::Context;
use dotenv::dotenv;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{self, TraceLayer};
use tracing::{info, warn, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod events;
mod router;

use doctor_cell::services::AvailabilityService;
use shared_config::AppConfig;
use shared_database::{initialize, keys, Database, SeedData};
use shared_utils::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Loading Env Vars
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Clinic Booking API server");

    // Load configuration
    let config = AppConfig::from_env();

    // Open the store and seed it on first start
    let db = Database::from_config(&config)
        .await
        .context("Failed to open the data store")?;
    info!("Using {} store", db.backend_name());

    let initialized = db.contains(keys::DATA_INITIALIZED).await;
    let seed = match SeedData::from_path(&config.seed_data_path) {
        Ok(seed) => seed,
        Err(e) if initialized => {
            warn!("{:#}; store is already initialized, continuing", e);
            SeedData::default()
        }
        Err(e) => return Err(e),
    };
    let report = initialize(&db, &seed)
        .await
        .context("Failed to initialize the data store")?;
    if report.seeded {
        info!("Seed data written from {}", config.seed_data_path.display());
    }
    if !report.backfilled.is_empty() {
        info!("Back-filled keys: {}", report.backfilled.join(", "));
    }

    let slots = AvailabilityService::new(&db, &config)
        .ensure_catalog()
        .await
        .context("Failed to generate the slot catalog")?;
    if slots > 0 {
        info!("Generated {} appointment slots", slots);
    }

    let addr: SocketAddr = config
        .bind_addr
        .parse()
        .with_context(|| format!("Invalid bind address {}", config.bind_addr))?;

    // Create shared state
    let state = AppState::new(config, db).shared();

    // Set up CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build the application router
    let app = router::create_router(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new()
                    .level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new()
                    .level(Level::INFO)),
        )
        .layer(cors);

    // Run the server
    info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
