//! In-flight request de-duplication.
//!
//! Two concurrent calls for the same `(method, url)` pair collapse into
//! a single network call; every caller awaits the same shared result.
//! Entries are removed when the call settles, success or failure, so a
//! failed call never blocks future attempts.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use tracing::debug;

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpResponse};

type SharedCall = Shared<BoxFuture<'static, Result<HttpResponse, ApiError>>>;

/// Keyed map of pending calls.
///
/// Only identical concurrent calls are merged; requests differing in any
/// query parameter have different URLs and therefore different keys.
#[derive(Clone, Default)]
pub struct InflightMap {
    inner: Arc<Mutex<HashMap<String, SharedCall>>>,
}

impl InflightMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key(method: HttpMethod, url: &str) -> String {
        format!("{method}:{url}")
    }

    /// Number of currently outstanding calls.
    pub fn len(&self) -> usize {
        self.inner.lock().map(|map| map.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run `make` under the given key, joining an existing in-flight call
    /// unless `allow_simultaneous_duplicates` is set.
    pub async fn run<F>(
        &self,
        key: String,
        allow_simultaneous_duplicates: bool,
        make: F,
    ) -> Result<HttpResponse, ApiError>
    where
        F: FnOnce() -> BoxFuture<'static, Result<HttpResponse, ApiError>>,
    {
        let call = {
            let mut map = match self.inner.lock() {
                Ok(map) => map,
                Err(poisoned) => poisoned.into_inner(),
            };

            if allow_simultaneous_duplicates {
                self.install(&mut map, key, make)
            } else if let Some(existing) = map.get(&key) {
                debug!(key, "joining in-flight request");
                existing.clone()
            } else {
                self.install(&mut map, key, make)
            }
        };

        call.await
    }

    fn install<F>(
        &self,
        map: &mut HashMap<String, SharedCall>,
        key: String,
        make: F,
    ) -> SharedCall
    where
        F: FnOnce() -> BoxFuture<'static, Result<HttpResponse, ApiError>>,
    {
        let inner = self.inner.clone();
        let cleanup_key = key.clone();
        let fut = make();

        let call = async move {
            let outcome = fut.await;
            if let Ok(mut map) = inner.lock() {
                map.remove(&cleanup_key);
            }
            outcome
        }
        .boxed()
        .shared();

        map.insert(key, call.clone());
        call
    }
}
