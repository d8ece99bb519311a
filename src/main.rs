use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use demo_bank_api::{
    config::AppConfig,
    services::{
        mailer::{ConsoleMailer, OtpMailer, ResendMailer},
        otp::OtpService,
    },
    store::{JsonFileStorage, RecordStore},
    AppState,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,demo_bank_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;

    // Record store
    tracing::info!("Loading records from {}", config.data_dir.display());
    let storage = JsonFileStorage::new(&config.data_dir)?;
    let store = RecordStore::load(Arc::new(storage));

    // OTP delivery
    let mailer: Arc<dyn OtpMailer> = match &config.resend_api_key {
        Some(api_key) => {
            tracing::info!("OTP delivery via Resend");
            Arc::new(ResendMailer::new(api_key.clone(), config.otp_email_from.clone())?)
        }
        None => {
            tracing::warn!("RESEND_API_KEY not set, OTP codes will only be logged");
            Arc::new(ConsoleMailer)
        }
    };
    let otp = OtpService::new(mailer, config.delivery_policy);

    if config.demo_mode {
        tracing::warn!("DEMO_MODE enabled: full card numbers and OTP codes are returned to callers");
    }

    let listen_addr = config.listen_addr();
    let state = AppState {
        store: Arc::new(store),
        otp,
        config: Arc::new(config),
    };

    // Build router
    let app = demo_bank_api::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    // Start server
    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    tracing::info!("Ministry of Banking API listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
