use actix_governor::{Governor, GovernorConfigBuilder};
use actix_web::{middleware::Logger, web, App, HttpServer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use payments_api::{
    config::{ApiConfig, StorageBackend},
    db::Database,
    metrics::register_metrics,
    routes,
    state::AppState,
    MemoryRepository,
};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ApiConfig::from_env().map_err(std::io::Error::other)?;
    let port = config.port;
    let allowed_origins = config.allowed_origins.clone();
    let rate_limit_rpm = config.rate_limit_rpm;

    tracing::info!("Starting payments-api on port {}", port);
    tracing::debug!("Configuration: {:?}", config);

    let state = match config.storage {
        StorageBackend::Sqlite => {
            let db = Database::new(&config.db_path).map_err(std::io::Error::other)?;
            tracing::info!("Database initialized at: {}", config.db_path);
            AppState::new(config, db)
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; payments are lost on restart");
            AppState::new(config, MemoryRepository::new())
        }
    };

    // Register Prometheus metrics
    register_metrics();

    let state_data = web::Data::new(state);

    let governor_conf = GovernorConfigBuilder::default()
        .requests_per_minute(rate_limit_rpm as u64)
        .finish()
        .ok_or_else(|| std::io::Error::other("invalid rate limiter configuration"))?;

    HttpServer::new(move || {
        let cors = payments_api::cors::build_cors(&allowed_origins);

        App::new()
            .app_data(state_data.clone())
            .wrap(Logger::default())
            .wrap(cors)
            .wrap(Governor::new(&governor_conf))
            .configure(routes::health::configure)
            .configure(routes::payments::configure)
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
