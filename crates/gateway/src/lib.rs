//! # Storefront Gateway Crate
//!
//! HTTP REST and WebSocket surface of the realtime backend. Both transports
//! are thin: every operation is delegated to the shared
//! [`ChatHub`](storefront_chats::ChatHub).
//!
//! ## Architecture
//!
//! - **REST**: JSON endpoints with an OpenAPI document at `/api-docs/openapi.json`
//! - **WebSocket**: `/ws`, one reader loop and one writer task per socket
//! - **State**: [`GatewayState`], shared by every handler
//! - **Middleware**: bearer authentication, CORS and request logging
//!
//! ## Usage
//!
//! ```rust,ignore
//! use storefront_gateway::{create_router, GatewayState};
//!
//! let state = GatewayState::new(hub, &config.auth);
//! let app = create_router(state);
//!
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:7070").await?;
//! axum::serve(listener, app).await?;
//! ```

pub mod docs;
pub mod error;
pub mod middleware;
pub mod rest;
pub mod state;
pub mod websocket;

pub use docs::ApiDoc;
pub use error::{ErrorResponse, GatewayError, GatewayResult};
pub use middleware::{auth_middleware, AuthenticatedUser};
pub use state::GatewayState;

use std::sync::Arc;

use axum::{
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        Method,
    },
    middleware as axum_middleware,
    routing::get,
    Router,
};
use tower_http::cors::{Any, CorsLayer};

/// Create the main application router with all routes
pub fn create_router(state: GatewayState) -> Router {
    let state = Arc::new(state);

    Router::new()
        // REST API routes
        .merge(rest::create_rest_routes(state.clone()))
        // WebSocket routes
        .merge(websocket::create_websocket_routes())
        .route("/api-docs/openapi.json", get(docs::openapi_json))
        .with_state(state)
        .layer(cors_layer())
        .layer(axum_middleware::from_fn(middleware::logging_middleware))
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
}
