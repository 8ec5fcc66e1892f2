use axum::{middleware, routing::get, Json, Router};
use serde_json::{json, Value};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::auth::{self, extractors::require_auth};
use crate::error::ApiError;
use crate::records::{self, repo::Persistence};
use crate::state::AppState;

pub fn build_app(state: AppState) -> Router {
    let protected = Router::new()
        .merge(auth::protected_router())
        .merge(records::router())
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .nest(
            "/api",
            Router::new()
                .route("/health", get(health))
                .merge(auth::public_router())
                .merge(protected),
        )
        .fallback(route_not_found)
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     _span: &tracing::Span| {
                        let status = res.status();
                        let latency_ms = latency.as_millis();
                        if status.is_server_error() {
                            tracing::error!(%status, latency_ms, "response");
                        } else {
                            tracing::info!(%status, latency_ms, "response");
                        }
                    },
                ),
        )
}

async fn health(axum::extract::State(state): axum::extract::State<AppState>) -> Json<Value> {
    let environment = match state.records.persistence() {
        Persistence::Durable => "durable",
        Persistence::Ephemeral => "ephemeral",
    };
    Json(json!({
        "success": true,
        "message": "API is running",
        "timestamp": OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default(),
        "environment": environment,
    }))
}

async fn route_not_found() -> ApiError {
    ApiError::NotFound("Route not found")
}
