//! Request and Response models for the store API
//!
//! This module defines the DTOs (Data Transfer Objects) used for
//! serializing/deserializing HTTP request and response bodies.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::{
    AddressSetRequest, CreateCacheRequest, CreateStoreRequest, ExpireRequest, FindQuery,
    SearchQuery, SetRequest,
};
pub use responses::{
    AllResponse, CacheStatsResponse, CachesResponse, ClearResponse, DeleteResponse,
    ErrorResponse, ExpireResponse, GetResponse, HealthResponse, KeysResponse, MessageResponse,
    SearchResponse, SetResponse, StatsResponse, StoresResponse, TtlResponse,
};
