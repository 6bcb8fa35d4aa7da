//! API Handlers
//!
//! HTTP request handlers translating JSON requests into registry operations.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::cache::{CacheRegistry, KeyPattern, DEFAULT_CACHE};
use crate::error::{CacheError, Result};
use crate::models::{
    AddressSetRequest, AllResponse, CacheStatsResponse, CachesResponse, ClearResponse,
    CreateCacheRequest, CreateStoreRequest, DeleteResponse, ExpireRequest, ExpireResponse,
    FindQuery, GetResponse, HealthResponse, KeysResponse, MessageResponse, SearchQuery,
    SearchResponse, SetRequest, SetResponse, StatsResponse, StoresResponse, TtlResponse,
};

/// Application state shared across all handlers.
///
/// The registry does its own locking, so handlers share it through an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<CacheRegistry>,
}

impl AppState {
    pub fn new(registry: CacheRegistry) -> Self {
        Self::from_shared(Arc::new(registry))
    }

    pub fn from_shared(registry: Arc<CacheRegistry>) -> Self {
        Self { registry }
    }

    /// Creates a new AppState from configuration.
    pub fn from_config(config: &crate::config::Config) -> Self {
        Self::new(CacheRegistry::from_config(config))
    }
}

fn key_not_found(key: &str) -> CacheError {
    CacheError::NotFound(format!("key '{}'", key))
}

fn validated(error: Option<String>) -> Result<()> {
    match error {
        Some(msg) => Err(CacheError::InvalidRequest(msg)),
        None => Ok(()),
    }
}

// == Default Cache ==

/// Handler for PUT /set
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    validated(req.validate())?;

    let previous = state.registry.set(DEFAULT_CACHE, &req.key, &req.value, req.ttl)?;
    Ok(Json(SetResponse::new(req.key, previous)))
}

/// Handler for GET /get/:key
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    let value = state
        .registry
        .get(DEFAULT_CACHE, &key)?
        .ok_or_else(|| key_not_found(&key))?;

    Ok(Json(GetResponse::new(key, value)))
}

/// Handler for DELETE /del/:key
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<DeleteResponse>> {
    let previous = state.registry.delete(DEFAULT_CACHE, &key)?;
    Ok(Json(DeleteResponse::new(key, previous)))
}

/// Handler for POST /expire
pub async fn expire_handler(
    State(state): State<AppState>,
    Json(req): Json<ExpireRequest>,
) -> Result<Json<ExpireResponse>> {
    let updated = state.registry.expire(DEFAULT_CACHE, &req.key, req.ttl)?;
    Ok(Json(ExpireResponse {
        key: req.key,
        updated,
    }))
}

/// Handler for GET /ttl/:key
pub async fn ttl_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<TtlResponse>> {
    let ttl = state
        .registry
        .ttl(DEFAULT_CACHE, &key)?
        .ok_or_else(|| key_not_found(&key))?;

    Ok(Json(TtlResponse { key, ttl }))
}

// == Named Caches ==

/// Handler for GET /caches
pub async fn list_caches_handler(State(state): State<AppState>) -> Json<CachesResponse> {
    Json(CachesResponse {
        caches: state.registry.list_caches(),
    })
}

/// Handler for POST /caches
pub async fn create_cache_handler(
    State(state): State<AppState>,
    Json(req): Json<CreateCacheRequest>,
) -> Result<Json<MessageResponse>> {
    state.registry.create_cache(&req.name)?;
    Ok(Json(MessageResponse::new(format!(
        "Cache '{}' created",
        req.name
    ))))
}

/// Handler for DELETE /caches/:cache
pub async fn delete_cache_handler(
    State(state): State<AppState>,
    Path(cache): Path<String>,
) -> Result<Json<MessageResponse>> {
    state.registry.delete_cache(&cache)?;
    Ok(Json(MessageResponse::new(format!("Cache '{}' deleted", cache))))
}

/// Handler for PUT /caches/:cache/keys
///
/// Creates the cache first if it does not exist.
pub async fn cache_set_handler(
    State(state): State<AppState>,
    Path(cache): Path<String>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    validated(req.validate())?;

    state.registry.ensure_cache(&cache)?;
    let previous = state.registry.set(&cache, &req.key, &req.value, req.ttl)?;
    Ok(Json(SetResponse::new(req.key, previous)))
}

/// Handler for GET /caches/:cache/keys/:key
pub async fn cache_get_handler(
    State(state): State<AppState>,
    Path((cache, key)): Path<(String, String)>,
) -> Result<Json<GetResponse>> {
    let value = state
        .registry
        .get(&cache, &key)?
        .ok_or_else(|| key_not_found(&key))?;

    Ok(Json(GetResponse::new(key, value)))
}

/// Handler for DELETE /caches/:cache/keys/:key
pub async fn cache_delete_handler(
    State(state): State<AppState>,
    Path((cache, key)): Path<(String, String)>,
) -> Result<Json<DeleteResponse>> {
    let previous = state.registry.delete(&cache, &key)?;
    Ok(Json(DeleteResponse::new(key, previous)))
}

/// Handler for GET /caches/:cache/keys
pub async fn cache_keys_handler(
    State(state): State<AppState>,
    Path(cache): Path<String>,
) -> Result<Json<KeysResponse>> {
    let keys = state.registry.keys(&cache)?;
    Ok(Json(KeysResponse { cache, keys }))
}

/// Handler for GET /caches/:cache/all
pub async fn cache_all_handler(
    State(state): State<AppState>,
    Path(cache): Path<String>,
) -> Result<Json<AllResponse>> {
    let data = state.registry.get_all(&cache)?;
    Ok(Json(AllResponse { cache, data }))
}

/// Handler for POST /caches/:cache/clear
pub async fn cache_clear_handler(
    State(state): State<AppState>,
    Path(cache): Path<String>,
) -> Result<Json<ClearResponse>> {
    let removed = state.registry.clear(&cache)?;
    Ok(Json(ClearResponse { cache, removed }))
}

/// Handler for GET /caches/:cache/ttl/:key
pub async fn cache_ttl_handler(
    State(state): State<AppState>,
    Path((cache, key)): Path<(String, String)>,
) -> Result<Json<TtlResponse>> {
    let ttl = state
        .registry
        .ttl(&cache, &key)?
        .ok_or_else(|| key_not_found(&key))?;

    Ok(Json(TtlResponse { key, ttl }))
}

/// Handler for GET /caches/:cache/search?pattern=..&regex=..
pub async fn cache_search_handler(
    State(state): State<AppState>,
    Path(cache): Path<String>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SearchResponse>> {
    let pattern = KeyPattern::parse(&query.pattern, query.regex)?;
    let data = state.registry.search(&cache, &pattern)?;

    Ok(Json(SearchResponse {
        cache,
        pattern: query.pattern,
        regex: query.regex,
        data,
    }))
}

/// Handler for GET /caches/:cache/find?value=..
pub async fn cache_find_handler(
    State(state): State<AppState>,
    Path(cache): Path<String>,
    Query(query): Query<FindQuery>,
) -> Result<Json<KeysResponse>> {
    let keys = state.registry.find_by_value(&cache, &query.value)?;
    Ok(Json(KeysResponse { cache, keys }))
}

/// Handler for GET /caches/:cache/stats
pub async fn cache_stats_handler(
    State(state): State<AppState>,
    Path(cache): Path<String>,
) -> Result<Json<CacheStatsResponse>> {
    let stats = state.registry.cache_stats(&cache)?;
    Ok(Json(CacheStatsResponse::new(cache, &stats)))
}

/// Handler for DELETE /caches/:cache/stats
///
/// Zeroes the counters and returns the fresh stats.
pub async fn reset_cache_stats_handler(
    State(state): State<AppState>,
    Path(cache): Path<String>,
) -> Result<Json<CacheStatsResponse>> {
    state.registry.reset_stats(&cache)?;
    let stats = state.registry.cache_stats(&cache)?;
    Ok(Json(CacheStatsResponse::new(cache, &stats)))
}

// == Nested Stores ==

/// Handler for GET /caches/:cache/stores
pub async fn list_stores_handler(
    State(state): State<AppState>,
    Path(cache): Path<String>,
) -> Result<Json<StoresResponse>> {
    let stores = state.registry.list_stores(&cache)?;
    Ok(Json(StoresResponse { cache, stores }))
}

/// Handler for POST /caches/:cache/stores
pub async fn create_store_handler(
    State(state): State<AppState>,
    Path(cache): Path<String>,
    Json(req): Json<CreateStoreRequest>,
) -> Result<Json<MessageResponse>> {
    state.registry.create_store(&cache, &req.name, req.ttl)?;
    Ok(Json(MessageResponse::new(format!(
        "Store '{}' created in cache '{}'",
        req.name, cache
    ))))
}

/// Handler for DELETE /caches/:cache/stores/:store
pub async fn delete_store_handler(
    State(state): State<AppState>,
    Path((cache, store)): Path<(String, String)>,
) -> Result<Json<MessageResponse>> {
    state.registry.delete_store(&cache, &store)?;
    Ok(Json(MessageResponse::new(format!(
        "Store '{}' deleted from cache '{}'",
        store, cache
    ))))
}

// == Compound Addresses ==

/// Handler for PUT /addr
pub async fn address_set_handler(
    State(state): State<AppState>,
    Json(req): Json<AddressSetRequest>,
) -> Result<Json<SetResponse>> {
    validated(req.validate())?;

    let previous = state.registry.set_at(&req.address, &req.value, req.ttl)?;
    Ok(Json(SetResponse::new(req.address, previous)))
}

/// Handler for GET /addr/:address
pub async fn address_get_handler(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<GetResponse>> {
    let value = state
        .registry
        .get_at(&address)?
        .ok_or_else(|| key_not_found(&address))?;

    Ok(Json(GetResponse::new(address, value)))
}

/// Handler for DELETE /addr/:address
pub async fn address_delete_handler(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<DeleteResponse>> {
    let previous = state.registry.delete_at(&address)?;
    Ok(Json(DeleteResponse::new(address, previous)))
}

// == Diagnostics ==

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let stats = state.registry.stats();
    let per_cache = state.registry.all_cache_stats();
    let failures = state.registry.events().failure_count();

    Json(StatsResponse::new(&stats, per_cache, failures))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventBus;

    fn state() -> AppState {
        AppState::new(CacheRegistry::new(None, Arc::new(EventBus::new())))
    }

    fn set_req(key: &str, value: &str) -> SetRequest {
        SetRequest {
            key: key.to_string(),
            value: value.to_string(),
            ttl: None,
        }
    }

    #[tokio::test]
    async fn test_set_and_get_handler() {
        let state = state();

        let result = set_handler(State(state.clone()), Json(set_req("test_key", "test_value"))).await;
        assert!(result.is_ok());

        let response = get_handler(State(state.clone()), Path("test_key".to_string()))
            .await
            .unwrap();
        assert_eq!(response.value, "test_value");
    }

    #[tokio::test]
    async fn test_get_nonexistent_key() {
        let result = get_handler(State(state()), Path("nonexistent".to_string())).await;
        assert!(matches!(result, Err(CacheError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_handler_is_idempotent() {
        let state = state();
        let set = set_handler(State(state.clone()), Json(set_req("to_delete", "value")))
            .await
            .unwrap();
        assert!(set.previous.is_none());

        let first = delete_handler(State(state.clone()), Path("to_delete".to_string()))
            .await
            .unwrap();
        assert!(first.deleted);
        assert_eq!(first.previous.as_deref(), Some("value"));

        let second = delete_handler(State(state.clone()), Path("to_delete".to_string()))
            .await
            .unwrap();
        assert!(!second.deleted);
    }

    #[tokio::test]
    async fn test_cache_set_auto_creates_cache() {
        let state = state();

        let set = cache_set_handler(
            State(state.clone()),
            Path("users".to_string()),
            Json(set_req("alice", "admin")),
        )
        .await
        .unwrap();
        assert_eq!(set.key, "alice");

        assert!(state.registry.contains("users"));
        let response = cache_get_handler(
            State(state.clone()),
            Path(("users".to_string(), "alice".to_string())),
        )
        .await
        .unwrap();
        assert_eq!(response.value, "admin");
    }

    #[tokio::test]
    async fn test_delete_default_cache_is_protected() {
        let result = delete_cache_handler(State(state()), Path(DEFAULT_CACHE.to_string())).await;
        assert!(matches!(result, Err(CacheError::Protected(_))));
    }

    #[tokio::test]
    async fn test_store_handlers() {
        let state = state();
        let created = create_cache_handler(
            State(state.clone()),
            Json(CreateCacheRequest {
                name: "users".to_string(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(created.message, "Cache 'users' created");
        let created = create_store_handler(
            State(state.clone()),
            Path("users".to_string()),
            Json(CreateStoreRequest {
                name: "sessions".to_string(),
                ttl: Some(30),
            }),
        )
        .await
        .unwrap();
        assert_eq!(created.message, "Store 'sessions' created in cache 'users'");

        let listing = list_stores_handler(State(state.clone()), Path("users".to_string()))
            .await
            .unwrap();
        assert_eq!(listing.stores.len(), 1);
        assert_eq!(listing.stores[0].ttl, Some(30));

        let set = address_set_handler(
            State(state.clone()),
            Json(AddressSetRequest {
                address: "users:sessions:tok:1".to_string(),
                value: "alice".to_string(),
                ttl: None,
            }),
        )
        .await
        .unwrap();
        assert!(set.previous.is_none());
        let got = address_get_handler(State(state.clone()), Path("users:sessions:tok:1".to_string()))
            .await
            .unwrap();
        assert_eq!(got.value, "alice");
    }

    #[tokio::test]
    async fn test_stats_handler() {
        let response = stats_handler(State(state())).await;
        assert_eq!(response.hits, 0);
        assert_eq!(response.misses, 0);
        assert_eq!(response.caches, 1);
        assert!(response.per_cache.contains_key(DEFAULT_CACHE));
    }

    #[tokio::test]
    async fn test_ttl_handlers() {
        let state = state();
        let mut req = set_req("session", "v");
        req.ttl = Some(60);
        let set = set_handler(State(state.clone()), Json(req)).await.unwrap();
        assert!(set.previous.is_none());
        let set = set_handler(State(state.clone()), Json(set_req("forever", "v")))
            .await
            .unwrap();
        assert!(set.previous.is_none());

        let response = ttl_handler(State(state.clone()), Path("session".to_string()))
            .await
            .unwrap();
        assert!(matches!(response.ttl, Some(59..=60)));

        let response = cache_ttl_handler(
            State(state.clone()),
            Path((DEFAULT_CACHE.to_string(), "forever".to_string())),
        )
        .await
        .unwrap();
        assert_eq!(response.ttl, None);

        let missing = ttl_handler(State(state.clone()), Path("nope".to_string())).await;
        assert!(matches!(missing, Err(CacheError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_search_and_find_handlers() {
        let state = state();
        for (key, value) in [("user_1", "alice"), ("user_2", "bob"), ("admin_1", "alice")] {
            let set = set_handler(State(state.clone()), Json(set_req(key, value)))
                .await
                .unwrap();
            assert_eq!(set.key, key);
        }

        let glob = cache_search_handler(
            State(state.clone()),
            Path(DEFAULT_CACHE.to_string()),
            Query(SearchQuery {
                pattern: "user_*".to_string(),
                regex: false,
            }),
        )
        .await
        .unwrap();
        assert_eq!(glob.data.keys().collect::<Vec<_>>(), vec!["user_1", "user_2"]);

        let regex = cache_search_handler(
            State(state.clone()),
            Path(DEFAULT_CACHE.to_string()),
            Query(SearchQuery {
                pattern: r"\w+_1".to_string(),
                regex: true,
            }),
        )
        .await
        .unwrap();
        assert_eq!(regex.data.keys().collect::<Vec<_>>(), vec!["admin_1", "user_1"]);

        let invalid = cache_search_handler(
            State(state.clone()),
            Path(DEFAULT_CACHE.to_string()),
            Query(SearchQuery {
                pattern: "(".to_string(),
                regex: true,
            }),
        )
        .await;
        assert!(matches!(invalid, Err(CacheError::InvalidPattern(_))));

        let found = cache_find_handler(
            State(state.clone()),
            Path(DEFAULT_CACHE.to_string()),
            Query(FindQuery {
                value: "alice".to_string(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(found.keys, vec!["admin_1", "user_1"]);
    }

    #[tokio::test]
    async fn test_cache_stats_handlers() {
        let state = state();
        let set = cache_set_handler(
            State(state.clone()),
            Path("users".to_string()),
            Json(set_req("alice", "admin")),
        )
        .await
        .unwrap();
        assert_eq!(set.key, "alice");
        let got = cache_get_handler(
            State(state.clone()),
            Path(("users".to_string(), "alice".to_string())),
        )
        .await
        .unwrap();
        assert_eq!(got.value, "admin");
        let missing = cache_get_handler(
            State(state.clone()),
            Path(("users".to_string(), "bob".to_string())),
        )
        .await;
        assert!(missing.is_err());

        let stats = cache_stats_handler(State(state.clone()), Path("users".to_string()))
            .await
            .unwrap();
        assert_eq!((stats.hits, stats.misses, stats.total_entries), (1, 1, 1));
        assert!((stats.hit_rate - 0.5).abs() < f64::EPSILON);

        let reset = reset_cache_stats_handler(State(state.clone()), Path("users".to_string()))
            .await
            .unwrap();
        assert_eq!((reset.hits, reset.misses, reset.total_entries), (0, 0, 1));

        let unknown = cache_stats_handler(State(state.clone()), Path("ghost".to_string())).await;
        assert!(matches!(unknown, Err(CacheError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_health_handler() {
        let response = health_handler().await;
        assert_eq!(response.status, "healthy");
    }

    #[tokio::test]
    async fn test_set_invalid_request() {
        let result = set_handler(State(state()), Json(set_req("", "value"))).await;
        assert!(matches!(result, Err(CacheError::InvalidRequest(_))));
    }
}
