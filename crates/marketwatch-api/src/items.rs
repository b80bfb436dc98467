//! Market item reads, cached per request signature.

use marketwatch_core::{ApiError, CursorPage, EntityCache, RequestExecutor};

use crate::entities::Item;
use crate::requests::ItemQueryParameters;

/// Read-only item catalog access.
///
/// List responses are cached under the full URL (query string included),
/// single items under `wow/items/{id}`.
pub struct ItemsClient {
    executor: RequestExecutor,
    cache: EntityCache<Item>,
}

impl ItemsClient {
    pub fn new(executor: RequestExecutor, cache: EntityCache<Item>) -> Self {
        Self { executor, cache }
    }

    pub async fn get_items(&self, params: &ItemQueryParameters) -> Result<Vec<Item>, ApiError> {
        let mut params = params.clone();
        params.pagination.include_edges = Some(false);
        let url = params.query_pairs().append_to("wow/items");

        if let Some(cached) = self.cache.get_list(&url).await {
            return Ok(cached);
        }

        let page: Option<CursorPage<Item>> = self.executor.get_json(&url).await?;
        let nodes = page.map(|page| page.nodes).unwrap_or_default();

        self.cache.insert_list(url, nodes.clone()).await;

        Ok(nodes)
    }

    pub async fn get_item(&self, item_id: i64) -> Result<Option<Item>, ApiError> {
        let url = format!("wow/items/{item_id}");

        if let Some(cached) = self.cache.get_single(&url).await {
            return Ok(Some(cached));
        }

        let item: Option<Item> = self.executor.get_json(&url).await?;

        if let Some(item) = &item {
            self.cache.insert_single(url, item.clone()).await;
        }

        Ok(item)
    }
}
