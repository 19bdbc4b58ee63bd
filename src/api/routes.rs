//! API Routes
//!
//! Configures the Axum router with all media cache endpoints.

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    add_collection_handler, clear_cache_handler, clear_collections_handler, connectivity_handler,
    health_handler, image_handler, image_set_handler, list_collections_handler, network_handler,
    preload_handler, queue_handler, remove_collection_handler, stats_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /image` - Resolve one image URL
/// - `GET /image/set` - Progressive URL set for one image
/// - `POST /preload` - Warm a batch of image URLs
/// - `DELETE /cache` - Drop every cached URL
/// - `PUT /network` - Report the client's connection class
/// - `GET|POST|DELETE /collections`, `DELETE /collections/:id` - Saved items
/// - `PUT /connectivity` - Report online/offline
/// - `GET /offline/queue` - Pending offline operations
/// - `GET /stats` - Cache and queue statistics
/// - `GET /health` - Health check endpoint
///
/// # Middleware
/// - CORS: Allows any origin
/// - Tracing: Logs all requests
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/image", get(image_handler))
        .route("/image/set", get(image_set_handler))
        .route("/preload", post(preload_handler))
        .route("/cache", delete(clear_cache_handler))
        .route("/network", put(network_handler))
        .route(
            "/collections",
            get(list_collections_handler)
                .post(add_collection_handler)
                .delete(clear_collections_handler),
        )
        .route("/collections/:id", delete(remove_collection_handler))
        .route("/connectivity", put(connectivity_handler))
        .route("/offline/queue", get(queue_handler))
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
