use axum::{
    routing::{get, post},
    Router,
};
use kechita_dashboard::api_client::DashboardApi;
use kechita_dashboard::config::Config;
use kechita_dashboard::handlers::{self, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{
    cors::CorsLayer, limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the application.
///
/// This function initializes the application, including:
/// - Logging and tracing.
/// - Configuration loading.
/// - The backend client and one polling store per view.
/// - HTTP routes and middleware (CORS, timeouts, rate limiting).
///
/// It then starts the Axum server and unmounts every view on shutdown.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kechita_dashboard=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    let api = DashboardApi::new(config.api_url.clone(), config.request_timeout())?;
    tracing::info!("✓ Dashboard API client initialized: {}", api.base_url());

    let port = config.port;
    let route_timeout = config.request_timeout() * 2;
    let app_state = Arc::new(AppState::new(config, api));

    // Every view polls for the lifetime of the service
    let mounted = app_state.mount_all();

    // Outbound actions: 2 requests/second per IP, burst of 5
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(2)
            .burst_size(5)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .ok_or_else(|| anyhow::anyhow!("Invalid rate limiter configuration"))?,
    );

    let action_routes = Router::new()
        .route("/actions/whatsapp/:kind", post(handlers::send_whatsapp))
        .route("/actions/telegram/:kind", post(handlers::send_telegram))
        .route("/actions/settings", post(handlers::save_settings))
        .route(
            "/actions/credit-score/:customer_id",
            post(handlers::calculate_score),
        )
        .layer(
            ServiceBuilder::new()
                // Credential payloads are small
                .layer(RequestBodyLimitLayer::new(64 * 1024))
                .layer(GovernorLayer {
                    config: governor_conf,
                }),
        );

    let view_routes = Router::new()
        .route("/views/overview", get(handlers::overview_view))
        .route("/views/analytics", get(handlers::analytics_view))
        .route("/views/branches", get(handlers::branches_view))
        .route("/views/branches/export.csv", get(handlers::export_branches))
        .route("/views/customers", get(handlers::customers_view))
        .route("/views/customers/export.csv", get(handlers::export_customers))
        .route("/views/loans", get(handlers::loans_view))
        .route("/views/loans/export.csv", get(handlers::export_loans))
        .route("/views/credit-scoring", get(handlers::credit_scoring_view))
        .route("/views/reports", get(handlers::reports_view))
        .route("/views/messaging", get(handlers::messaging_view))
        .route("/views/settings", get(handlers::settings_view))
        .route("/refresh/:view", post(handlers::refresh_view));

    let app = Router::new()
        .route("/health", get(handlers::health))
        .merge(view_routes)
        .merge(action_routes)
        .with_state(app_state)
        .layer(TimeoutLayer::new(route_timeout))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    drop(mounted);
    tracing::info!("All views unmounted, shutting down");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
