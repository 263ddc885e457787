use axum::{
    routing::{get, post},
    Router,
};
use durrah_agent::{
    config::{get_config, init_config},
    routes,
    storage::LocalStore,
    AppState,
};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    init_config()?;
    let config = get_config();

    let store = LocalStore::open(&config.storage_path)?;
    let app_state = AppState::new(store);

    {
        let state = app_state.clone();
        let interval = Duration::from_secs(config.sync_interval_secs);
        tokio::spawn(async move {
            loop {
                match state.sync_service.check_pending().await {
                    Ok(report) if report.attempted > 0 => {
                        info!(
                            synced = report.synced,
                            failed = report.failed,
                            parked = report.parked,
                            "Background sync pass"
                        );
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::error!(error = ?e, "Submission sync worker error");
                    }
                }
                tokio::time::sleep(interval).await;
            }
        });
    }

    let app = Router::new()
        .route("/health", get(routes::health::health))
        .route("/api/sync/submissions", post(routes::sync::enqueue_submission))
        .route("/api/sync/trigger", post(routes::sync::trigger_sync))
        .route("/api/sync/pending", get(routes::sync::get_pending))
        .route("/api/payments/sign", post(routes::payments::sign_transaction))
        .route("/api/payments", get(routes::payments::list_payments))
        .route(
            "/api/payments/:reference/reset",
            post(routes::payments::reset_payment),
        )
        .with_state(app_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Agent listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
