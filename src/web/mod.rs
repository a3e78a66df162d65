use axum::{routing::get, Router};
use tokio::sync::watch;
use tower::ServiceBuilder;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::context::AppContext;

pub mod handlers;
pub mod responses;

pub use handlers::{health_check, list_products, scanner_status};
pub use responses::*;

pub fn create_router(context: AppContext) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes())
        .layer(
            ServiceBuilder::new().layer(
                TraceLayer::new_for_http()
                    .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                    .on_response(DefaultOnResponse::new().level(Level::INFO)),
            ),
        )
        .with_state(context)
}

fn api_routes() -> Router<AppContext> {
    Router::new()
        .route("/products", get(list_products))
        .route("/status", get(scanner_status))
}

/// Serves the status API until `shutdown` flips to `true`.
pub async fn serve(context: AppContext, mut shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
    let address = format!("{}:{}", context.config.server.host, context.config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;

    tracing::info!("Status server listening on {}", address);

    axum::serve(listener, create_router(context))
        .with_graceful_shutdown(async move {
            while !*shutdown.borrow() {
                if shutdown.changed().await.is_err() {
                    break;
                }
            }
        })
        .await?;

    tracing::info!("Status server stopped");
    Ok(())
}
