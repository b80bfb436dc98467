//! Watch list CRUD and membership edits.

use marketwatch_core::{patch_document, ApiError, CursorPage, RequestExecutor};

use crate::entities::WatchList;
use crate::requests::{
    AddItemToWatchListRequest, CreateWatchListRequest, UpdateWatchListRequest,
};

pub struct WatchListsClient {
    executor: RequestExecutor,
}

impl WatchListsClient {
    pub fn new(executor: RequestExecutor) -> Self {
        Self { executor }
    }

    pub async fn get_watch_lists_for_user(&self, user_id: i64) -> Result<Vec<WatchList>, ApiError> {
        let page: Option<CursorPage<WatchList>> = self
            .executor
            .get_json(&format!("users/{user_id}/watchLists"))
            .await?;
        Ok(page.map(|page| page.nodes).unwrap_or_default())
    }

    pub async fn get_watch_list(
        &self,
        user_id: i64,
        watch_list_id: i64,
    ) -> Result<Option<WatchList>, ApiError> {
        self.executor
            .get_json(&format!("users/{user_id}/watchLists/{watch_list_id}"))
            .await
    }

    pub async fn create_watch_list_for_user(
        &self,
        user_id: i64,
        request: &CreateWatchListRequest,
    ) -> Result<WatchList, ApiError> {
        self.executor
            .post_json(&format!("users/{user_id}/watchLists"), request)
            .await
    }

    pub async fn update_watch_list(
        &self,
        user_id: i64,
        watch_list_id: i64,
        fields_to_update: &UpdateWatchListRequest,
    ) -> Result<WatchList, ApiError> {
        let document = patch_document(fields_to_update)?;
        self.executor
            .patch_json(
                &format!("users/{user_id}/watchLists/{watch_list_id}"),
                &document,
            )
            .await
    }

    pub async fn delete_watch_list(&self, user_id: i64, watch_list_id: i64) -> Result<(), ApiError> {
        self.executor
            .delete(&format!("users/{user_id}/watchLists/{watch_list_id}"))
            .await
    }

    pub async fn add_item_to_watch_list(
        &self,
        user_id: i64,
        watch_list_id: i64,
        item_id: i64,
    ) -> Result<WatchList, ApiError> {
        self.executor
            .post_json(
                &format!("users/{user_id}/watchLists/{watch_list_id}/items"),
                &AddItemToWatchListRequest { id: item_id },
            )
            .await
    }

    pub async fn remove_item_from_watch_list(
        &self,
        user_id: i64,
        watch_list_id: i64,
        item_id: i64,
    ) -> Result<(), ApiError> {
        self.executor
            .delete(&format!(
                "users/{user_id}/watchLists/{watch_list_id}/items/{item_id}"
            ))
            .await
    }
}
