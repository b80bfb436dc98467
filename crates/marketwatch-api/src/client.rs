//! Application context wiring the access layer together.
//!
//! The token store, the authenticated executor (and with it the
//! in-flight map), and the per-entity caches are single instances per
//! client; domain clients borrow them instead of reaching for globals.

use std::sync::Arc;
use std::time::Duration;

use marketwatch_core::{
    ClientConfig, EntityCache, EntityCacheConfig, HttpTransport, KeyValueStorage, MemoryStorage,
    ReqwestTransport, RequestExecutor, ScopedStorage, TokenStore,
};

use crate::alerts::AlertsClient;
use crate::items::ItemsClient;
use crate::realms::RealmsClient;
use crate::time_series::TimeSeriesClient;
use crate::users::UsersClient;
use crate::watch_lists::WatchListsClient;

const ALERT_CACHE_CAPACITY: usize = 100;
const ALERT_CACHE_MAX_AGE: Duration = Duration::from_secs(900);
const ITEM_CACHE_CAPACITY: usize = 100;
const REALM_CACHE_CAPACITY: usize = 500;

/// Entry point for consumers of the access layer.
pub struct MarketWatchClient {
    token_store: Arc<TokenStore>,
    executor: RequestExecutor,
    items: ItemsClient,
    alerts: AlertsClient,
    realms: RealmsClient,
    users: UsersClient,
    watch_lists: WatchListsClient,
    time_series: TimeSeriesClient,
}

impl MarketWatchClient {
    /// Client over the production transport with in-process storage.
    pub fn new(config: ClientConfig) -> Self {
        Self::with_parts(
            config,
            Arc::new(ReqwestTransport::new()),
            Arc::new(MemoryStorage::new()),
        )
    }

    /// Client over caller-supplied transport and storage collaborators.
    pub fn with_parts(
        config: ClientConfig,
        transport: Arc<dyn HttpTransport>,
        storage: Arc<dyn KeyValueStorage>,
    ) -> Self {
        let scoped = ScopedStorage::new(storage, config.storage_prefix.clone());

        // The auth endpoints run without bearer injection or the
        // unauthorized handler; everything else gets the full pipeline.
        let base_executor = RequestExecutor::new(transport.clone(), config.clone());
        let token_store = Arc::new(TokenStore::new(base_executor, scoped));
        let executor =
            RequestExecutor::new(transport, config).with_token_store(token_store.clone());

        Self {
            token_store,
            items: ItemsClient::new(
                executor.clone(),
                EntityCache::new(EntityCacheConfig::with_capacity(ITEM_CACHE_CAPACITY)),
            ),
            alerts: AlertsClient::new(
                executor.clone(),
                EntityCache::new(
                    EntityCacheConfig::with_capacity(ALERT_CACHE_CAPACITY)
                        .with_max_age(ALERT_CACHE_MAX_AGE),
                ),
            ),
            realms: RealmsClient::new(
                executor.clone(),
                EntityCache::new(EntityCacheConfig::with_capacity(REALM_CACHE_CAPACITY)),
                EntityCache::new(EntityCacheConfig::with_capacity(REALM_CACHE_CAPACITY)),
            ),
            users: UsersClient::new(executor.clone()),
            watch_lists: WatchListsClient::new(executor.clone()),
            time_series: TimeSeriesClient::new(executor.clone()),
            executor,
        }
    }

    pub fn token_store(&self) -> &Arc<TokenStore> {
        &self.token_store
    }

    /// Authenticated executor, for callers composing their own requests.
    pub fn executor(&self) -> &RequestExecutor {
        &self.executor
    }

    pub fn items(&self) -> &ItemsClient {
        &self.items
    }

    pub fn alerts(&self) -> &AlertsClient {
        &self.alerts
    }

    pub fn realms(&self) -> &RealmsClient {
        &self.realms
    }

    pub fn users(&self) -> &UsersClient {
        &self.users
    }

    pub fn watch_lists(&self) -> &WatchListsClient {
        &self.watch_lists
    }

    pub fn time_series(&self) -> &TimeSeriesClient {
        &self.time_series
    }
}
