use std::net::SocketAddr;

use axum::{
    extract::State,
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Json, Router,
};
use tower_http::{
    cors::CorsLayer,
    trace::TraceLayer,
};

use crate::error::ApiError;
use crate::state::AppState;
use crate::{auth, chat, inspect};

async fn health(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    sqlx::query("SELECT 1")
        .execute(&state.db)
        .await
        .map_err(ApiError::from)?;
    Ok(Json(serde_json::json!({ "status": "ok" })))
}

/// Credentialed CORS: the session cookie must survive cross-origin calls
/// from the frontend, so the origin is pinned, not wildcarded. An origin
/// that cannot be pinned is a startup error; there is no permissive
/// fallback, since a wildcard would silently drop `allow_credentials` and
/// break the cookie flow anyway.
fn cors_layer(frontend_origin: &str) -> anyhow::Result<CorsLayer> {
    let origin = frontend_origin
        .parse::<HeaderValue>()
        .map_err(|_| anyhow::anyhow!("FRONTEND_ORIGIN is not a usable CORS origin: {frontend_origin:?}"))?;
    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true))
}

pub fn build_app(state: AppState) -> anyhow::Result<Router> {
    let cors = cors_layer(&state.config.frontend_origin)?;
    Ok(Router::new()
        .merge(auth::router())
        .merge(inspect::router())
        .route("/api/chat", post(chat::chat))
        .route("/health", get(health))
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     _latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, "response");
                        } else {
                            tracing::info!(%status, "response");
                        }
                    },
                ),
        ))
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "4000".into())
    )
    .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn router_builds_with_fake_state() {
        build_app(AppState::fake()).expect("router");
    }

    #[test]
    fn unusable_frontend_origin_is_a_startup_error() {
        assert!(cors_layer("http://localhost:8080").is_ok());
        assert!(cors_layer("http://bad\norigin").is_err());
    }
}
