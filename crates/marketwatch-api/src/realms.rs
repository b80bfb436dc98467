//! Realm and connected-realm reads, cached per request signature.
//!
//! Realm data changes rarely, so both list shapes are cached under their
//! full URL and every list fetch also seeds the single-entity entries it
//! contains. A connected-realm fetch seeds the plain realm cache too,
//! since its payload embeds the member realms.

use marketwatch_core::{
    ApiError, CursorPage, CursorPaginationParams, EntityCache, QueryPairs, RequestExecutor,
};

use crate::entities::{ConnectedRealm, Realm};
use crate::requests::RealmQueryParameters;

pub struct RealmsClient {
    executor: RequestExecutor,
    realm_cache: EntityCache<Realm>,
    connected_realm_cache: EntityCache<ConnectedRealm>,
}

impl RealmsClient {
    pub fn new(
        executor: RequestExecutor,
        realm_cache: EntityCache<Realm>,
        connected_realm_cache: EntityCache<ConnectedRealm>,
    ) -> Self {
        Self {
            executor,
            realm_cache,
            connected_realm_cache,
        }
    }

    fn realm_cache_key(realm_id: i64) -> String {
        format!("wow/realms/{realm_id}")
    }

    fn connected_realm_cache_key(connected_realm_id: i64) -> String {
        format!("wow/connectedRealms/{connected_realm_id}")
    }

    pub async fn get_realms(&self, params: &RealmQueryParameters) -> Result<Vec<Realm>, ApiError> {
        let mut params = params.clone();
        params.pagination.include_edges = Some(false);
        let url = params.query_pairs().append_to("wow/realms");

        if let Some(cached) = self.realm_cache.get_list(&url).await {
            return Ok(cached);
        }

        let page: Option<CursorPage<Realm>> = self.executor.get_json(&url).await?;
        let nodes = page.map(|page| page.nodes).unwrap_or_default();

        self.realm_cache.insert_list(url, nodes.clone()).await;
        for realm in &nodes {
            self.realm_cache
                .insert_single(Self::realm_cache_key(realm.id), realm.clone())
                .await;
        }

        Ok(nodes)
    }

    pub async fn get_realm(&self, realm_id: i64) -> Result<Option<Realm>, ApiError> {
        let cache_key = Self::realm_cache_key(realm_id);

        if let Some(cached) = self.realm_cache.get_single(&cache_key).await {
            return Ok(Some(cached));
        }

        let realm: Option<Realm> = self.executor.get_json(&cache_key).await?;

        if let Some(realm) = &realm {
            self.realm_cache
                .insert_single(cache_key, realm.clone())
                .await;
        }

        Ok(realm)
    }

    pub async fn get_connected_realms(
        &self,
        pagination: &CursorPaginationParams,
    ) -> Result<Vec<ConnectedRealm>, ApiError> {
        let mut pagination = pagination.clone();
        pagination.include_edges = Some(false);
        let mut pairs = QueryPairs::new();
        pagination.append_query_pairs(&mut pairs);
        let url = pairs.append_to("wow/connectedRealms");

        if let Some(cached) = self.connected_realm_cache.get_list(&url).await {
            return Ok(cached);
        }

        let page: Option<CursorPage<ConnectedRealm>> = self.executor.get_json(&url).await?;
        let nodes = page.map(|page| page.nodes).unwrap_or_default();

        self.connected_realm_cache
            .insert_list(url, nodes.clone())
            .await;
        for connected_realm in &nodes {
            self.connected_realm_cache
                .insert_single(
                    Self::connected_realm_cache_key(connected_realm.id),
                    connected_realm.clone(),
                )
                .await;

            for realm in &connected_realm.realms {
                self.realm_cache
                    .insert_single(Self::realm_cache_key(realm.id), realm.clone())
                    .await;
            }
        }

        Ok(nodes)
    }

    pub async fn get_connected_realm(
        &self,
        connected_realm_id: i64,
    ) -> Result<Option<ConnectedRealm>, ApiError> {
        let cache_key = Self::connected_realm_cache_key(connected_realm_id);

        if let Some(cached) = self.connected_realm_cache.get_single(&cache_key).await {
            return Ok(Some(cached));
        }

        let connected_realm: Option<ConnectedRealm> = self.executor.get_json(&cache_key).await?;

        if let Some(connected_realm) = &connected_realm {
            self.connected_realm_cache
                .insert_single(cache_key, connected_realm.clone())
                .await;
        }

        Ok(connected_realm)
    }
}
