//! API Module
//!
//! HTTP handlers and routing for the store's REST API.
//!
//! # Endpoints
//! - `PUT /set`, `GET /get/:key`, `DELETE /del/:key` - default cache keys
//! - `POST /expire`, `GET /ttl/:key` - Replace or read the TTL of a default-cache key
//! - `/caches/...` - Named cache lifecycle, keys, search, stats and nested stores
//! - `/addr/...` - Compound `cache:key` / `cache:store:key` addressing
//! - `GET /stats` - Aggregate store statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
