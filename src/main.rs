use std::net::SocketAddr;
use std::process;

use tokri_api::{config::AppConfig, create_router, db, AppState};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tokri_api=info,tower_http=info")),
        )
        .with_target(false)
        .with_level(true)
        .init();

    tracing::info!("Surprise Tokri API - Starting...");

    if let Err(e) = run().await {
        tracing::error!("{}", e);
        process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env()?;

    tracing::info!("Connecting to database...");
    let db_pool = db::create_pool(&config.database_url, config.max_db_connections).await?;

    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations").run(&db_pool).await?;
    tracing::info!("Migrations completed successfully");

    let state = AppState::new(db_pool, &config);
    let app = create_router(state, &config);

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Surprise Tokri API is running on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui", addr);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
    Ok(())
}
