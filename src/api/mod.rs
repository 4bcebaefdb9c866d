//! HTTP layer: system endpoints, OpenAPI document, and router composition.

pub mod dto;
pub mod handlers;

use axum::Router;
use axum::routing::get;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::app_state::AppState;
use crate::ws::handler::ws_handler;

/// OpenAPI description of the HTTP surface.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "price-relay",
        description = "Real-time stock price relay. Browser clients connect over WebSocket at `/` or `/ws` and send `{\"type\":\"subscribe\",\"symbols\":[...]}`."
    ),
    paths(handlers::system::health_handler, handlers::system::stats_handler),
    components(schemas(
        handlers::system::HealthResponse,
        dto::StatsResponse,
        crate::domain::DeliveryMode,
        crate::error::ErrorResponse,
        crate::error::ErrorBody,
    )),
    tags((name = "System", description = "Health and relay status"))
)]
pub struct ApiDoc;

/// Builds the REST router (no state attached).
pub fn build_router() -> Router<AppState> {
    handlers::routes()
}

/// Builds the complete application: REST endpoints, the WebSocket
/// endpoint, API docs, and the HTTP middleware stack.
pub fn build_app(state: AppState) -> Router {
    let router = Router::new()
        .merge(build_router())
        .route("/", get(ws_handler))
        .route("/ws", get(ws_handler));

    #[cfg(feature = "swagger-ui")]
    let router = router.merge(
        utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
            .url("/api-docs/openapi.json", ApiDoc::openapi()),
    );

    #[cfg(not(feature = "swagger-ui"))]
    let router = router.route(
        "/api-docs/openapi.json",
        get(|| async { axum::Json(ApiDoc::openapi()) }),
    );

    router
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
