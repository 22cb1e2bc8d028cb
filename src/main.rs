use rusty_lodging_ddd::{
    adapters::mock::{
        notification_service::NotificationService as MockNotificationService,
        payment_provider::PaymentProvider as MockPaymentProvider,
    },
    adapters::postgres::{
        booking_store::BookingStore as PostgresBookingStore,
        room_service::RoomService as PostgresRoomService,
    },
    api::{handlers::AppState, router::create_router},
    application::booking::{BookingPolicy, ServiceDependencies, run_expiry_sweeper},
};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rusty_lodging_ddd=debug,tower_http=debug,axum=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Database connection URL
    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| "postgres://localhost/lodging".into());

    tracing::info!("Database URL: {}", database_url);

    // Initialize database connection pool
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("Failed to connect to database");

    // Initialize adapters
    // Payment provider and notification channel are mocked until the real
    // integrations land. Swap these for the production adapters in deployment.
    let store = Arc::new(PostgresBookingStore::new(pool.clone()));
    let rooms = Arc::new(PostgresRoomService::new(pool.clone()));
    let payments = Arc::new(MockPaymentProvider::new());
    let notifications = Arc::new(MockNotificationService::new());

    // Create service dependencies
    let service_deps = ServiceDependencies {
        store,
        rooms,
        payments,
        notifications,
        policy: BookingPolicy::default(),
    };

    // Start the expiry sweeper in the background
    let sweep_interval = std::env::var("SWEEP_INTERVAL_SECS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(rusty_lodging_ddd::application::booking::DEFAULT_SWEEP_INTERVAL);

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let sweeper_deps = service_deps.clone();
    let sweeper = tokio::spawn(async move {
        run_expiry_sweeper(sweeper_deps, sweep_interval, shutdown_rx).await;
    });

    // Create application state
    let app_state = Arc::new(AppState { service_deps });

    // Create router
    let app = create_router(app_state);

    // Server configuration
    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".into());
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", addr);

    // Start server, stopping the sweeper once the server exits
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Failed to start server");

    let _ = shutdown_tx.send(true);
    let _ = sweeper.await;
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received");
}
