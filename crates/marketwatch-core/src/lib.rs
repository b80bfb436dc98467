//! # Marketwatch Core
//!
//! Resilient API access layer for the market watcher service.
//!
//! ## Overview
//!
//! This crate provides every piece a domain client composes for an
//! outbound call:
//!
//! - **Request executor** running the interceptor pipeline: logging,
//!   correlation ids, retry with exponential backoff, GET-404-to-null
//!   translation, bearer injection, and one-shot token refresh on 401
//! - **Token store** owning the session tokens, device id, and user
//!   snapshot, with identity-change broadcasts
//! - **In-flight map** de-duplicating identical concurrent calls
//! - **Pagination walker** materializing cursor-paged result sets
//! - **Entity cache** with LRU eviction, optional expiry, and tagged
//!   single/list values
//! - **Transport and storage abstractions** so tests run fully offline
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │ Domain client    │
//! └────────┬─────────┘
//!          │
//!          ▼
//! ┌──────────────────┐     ┌──────────────────┐
//! │ InflightMap      │────▶│ EntityCache      │
//! └────────┬─────────┘     └──────────────────┘
//!          │
//!          ▼
//! ┌──────────────────┐     ┌──────────────────┐
//! │ RequestExecutor  │────▶│ TokenStore       │
//! │ (pipeline)       │     │ (refresh on 401) │
//! └────────┬─────────┘     └──────────────────┘
//!          │
//!          ▼
//! ┌──────────────────┐
//! │ HttpTransport    │
//! │ (reqwest/mock)   │
//! └──────────────────┘
//! ```
//!
//! ## Error Handling
//!
//! All operations return [`ApiError`]. A GET that hits a 404 is not an
//! error at this layer; typed reads return `Ok(None)` instead.

pub mod cache;
pub mod config;
pub mod dedup;
pub mod error;
pub mod executor;
pub mod http;
pub mod pagination;
pub mod patch;
pub mod query;
pub mod storage;
pub mod token;

// Re-export commonly used types at crate root for convenience

pub use cache::{CachedValue, EntityCache, EntityCacheConfig};
pub use config::{ClientConfig, RetryOptions};
pub use dedup::InflightMap;
pub use error::ApiError;
pub use executor::RequestExecutor;
pub use http::{
    HttpMethod, HttpRequest, HttpResponse, HttpTransport, ReqwestTransport, TransportError,
    CORRELATION_ID_HEADER, TOKEN_EXPIRED_HEADER,
};
pub use pagination::{fetch_all_pages, CursorPage, CursorPaginationParams, PageInfo};
pub use patch::{patch_document, PatchOp, PatchOperation};
pub use query::QueryPairs;
pub use storage::{KeyValueStorage, MemoryStorage, ScopedStorage};
pub use token::{
    AuthUser, LinkedAccount, LoginResponse, RefreshTokenResponse, RegisterResponse,
    RegisterUserRequest, TokenStore,
};
