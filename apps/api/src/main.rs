use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use dotenv::dotenv;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{self, TraceLayer};
use tracing::{info, warn, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod router;

use appointment_cell::store::{AppointmentStore, InMemoryAppointmentStore, SupabaseAppointmentStore};
use doctor_cell::store::{InMemoryScheduleStore, ScheduleStore, SupabaseScheduleStore};
use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

fn build_stores(config: &AppConfig) -> (Arc<dyn ScheduleStore>, Arc<dyn AppointmentStore>) {
    if config.is_configured() {
        info!("Using Supabase stores at {}", config.supabase_url);
        let client = Arc::new(SupabaseClient::new(config));
        (
            Arc::new(SupabaseScheduleStore::new(client.clone())),
            Arc::new(SupabaseAppointmentStore::new(client)),
        )
    } else {
        warn!("Supabase is not configured; schedules and appointments are kept in memory");
        (
            Arc::new(InMemoryScheduleStore::new()),
            Arc::new(InMemoryAppointmentStore::new()),
        )
    }
}

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

    info!("Starting slot allocator API server");

    let config = Arc::new(AppConfig::from_env());
    info!("Slot interval: {} minutes", config.slot_interval_minutes);

    let (schedules, appointments) = build_stores(&config);

    // Set up CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = router::create_router(config.clone(), schedules, appointments)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new().level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}
