//! API Routes
//!
//! Configures the Axum router with all store endpoints.

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    address_delete_handler, address_get_handler, address_set_handler, cache_all_handler,
    cache_clear_handler, cache_delete_handler, cache_find_handler, cache_get_handler,
    cache_keys_handler, cache_search_handler, cache_set_handler, cache_stats_handler,
    cache_ttl_handler, create_cache_handler, create_store_handler, delete_cache_handler,
    delete_handler, delete_store_handler, expire_handler, get_handler, health_handler,
    list_caches_handler, list_stores_handler, reset_cache_stats_handler, set_handler,
    stats_handler, ttl_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `PUT /set`, `GET /get/:key`, `DELETE /del/:key`, `POST /expire`, `GET /ttl/:key` - default cache
/// - `GET|POST /caches`, `DELETE /caches/:cache` - cache lifecycle
/// - `GET|PUT /caches/:cache/keys`, `GET|DELETE /caches/:cache/keys/:key`
/// - `GET /caches/:cache/all`, `POST /caches/:cache/clear`, `GET /caches/:cache/ttl/:key`
/// - `GET /caches/:cache/search?pattern=&regex=`, `GET /caches/:cache/find?value=`
/// - `GET|DELETE /caches/:cache/stats` - per-cache counters and reset
/// - `GET|POST /caches/:cache/stores`, `DELETE /caches/:cache/stores/:store`
/// - `PUT /addr`, `GET|DELETE /addr/:address` - `cache:store:key` addressing
/// - `GET /stats`, `GET /health`
///
/// # Middleware
/// - CORS: Allows any origin (configurable for production)
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    // Configure CORS middleware
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/set", put(set_handler))
        .route("/get/:key", get(get_handler))
        .route("/del/:key", delete(delete_handler))
        .route("/expire", post(expire_handler))
        .route("/ttl/:key", get(ttl_handler))
        .route("/caches", get(list_caches_handler).post(create_cache_handler))
        .route("/caches/:cache", delete(delete_cache_handler))
        .route(
            "/caches/:cache/keys",
            get(cache_keys_handler).put(cache_set_handler),
        )
        .route(
            "/caches/:cache/keys/:key",
            get(cache_get_handler).delete(cache_delete_handler),
        )
        .route("/caches/:cache/all", get(cache_all_handler))
        .route("/caches/:cache/clear", post(cache_clear_handler))
        .route("/caches/:cache/ttl/:key", get(cache_ttl_handler))
        .route("/caches/:cache/search", get(cache_search_handler))
        .route("/caches/:cache/find", get(cache_find_handler))
        .route(
            "/caches/:cache/stats",
            get(cache_stats_handler).delete(reset_cache_stats_handler),
        )
        .route(
            "/caches/:cache/stores",
            get(list_stores_handler).post(create_store_handler),
        )
        .route(
            "/caches/:cache/stores/:store",
            delete(delete_store_handler),
        )
        .route("/addr", put(address_set_handler))
        .route(
            "/addr/:address",
            get(address_get_handler).delete(address_delete_handler),
        )
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
