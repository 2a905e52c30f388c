//! Read API over the stored prices

use crate::core::price::PriceObservation;
use crate::query::LatestPriceService;
use anyhow::{Context, Result};
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use serde_json::{Value, json};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

pub fn router(service: Arc<LatestPriceService>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/prices/:pair", get(latest_price))
        .with_state(service)
}

/// Serves `router` on `bind` until `shutdown` resolves.
pub async fn serve<F>(bind: &str, router: Router, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind {bind}"))?;
    info!(addr = %listener.local_addr()?, "Read API listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .context("Read API server failed")?;

    info!("Read API stopped");
    Ok(())
}

async fn root() -> Json<Value> {
    Json(json!({ "message": "Welcome to the currency prices API!" }))
}

async fn health_check() -> &'static str {
    "OK"
}

async fn latest_price(
    State(service): State<Arc<LatestPriceService>>,
    Path(pair): Path<String>,
) -> Result<Json<PriceObservation>, StatusCode> {
    match service.get_latest_price(&pair).await {
        Ok(Some(observation)) => Ok(Json(observation)),
        Ok(None) => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            error!(%pair, error = %e, "Failed to read latest price");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
