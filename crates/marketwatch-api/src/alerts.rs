//! Alert CRUD with write-through cache invalidation.
//!
//! Every mutation keeps the cache coherent: the single-item entry for
//! the alert is written, and any cached "alerts for user" list is
//! patched in place so a caller never observes a list known to be stale
//! relative to a just-completed mutation.

use marketwatch_core::{patch_document, ApiError, CursorPage, EntityCache, RequestExecutor};

use crate::entities::Alert;
use crate::requests::{CreateAlertRequest, UpdateAlertRequest};

pub struct AlertsClient {
    executor: RequestExecutor,
    cache: EntityCache<Alert>,
}

impl AlertsClient {
    pub fn new(executor: RequestExecutor, cache: EntityCache<Alert>) -> Self {
        Self { executor, cache }
    }

    fn alert_cache_key(user_id: i64, alert_id: i64) -> String {
        format!("users/{user_id}/alerts/{alert_id}")
    }

    fn user_alerts_cache_key(user_id: i64) -> String {
        format!("users/{user_id}/alerts")
    }

    pub async fn get_alerts_for_user(&self, user_id: i64) -> Result<Vec<Alert>, ApiError> {
        let cache_key = Self::user_alerts_cache_key(user_id);

        if let Some(cached) = self.cache.get_list(&cache_key).await {
            return Ok(cached);
        }

        let page: Option<CursorPage<Alert>> = self.executor.get_json(&cache_key).await?;
        let nodes = page.map(|page| page.nodes).unwrap_or_default();

        self.cache.insert_list(cache_key, nodes.clone()).await;
        for alert in &nodes {
            self.cache
                .insert_single(Self::alert_cache_key(user_id, alert.id), alert.clone())
                .await;
        }

        Ok(nodes)
    }

    pub async fn get_alert_for_user(
        &self,
        user_id: i64,
        alert_id: i64,
    ) -> Result<Option<Alert>, ApiError> {
        let cache_key = Self::alert_cache_key(user_id, alert_id);

        if let Some(cached) = self.cache.get_single(&cache_key).await {
            return Ok(Some(cached));
        }

        let alert: Option<Alert> = self.executor.get_json(&cache_key).await?;

        if let Some(alert) = &alert {
            self.cache.insert_single(cache_key, alert.clone()).await;
        }

        Ok(alert)
    }

    pub async fn create_alert_for_user(
        &self,
        user_id: i64,
        request: &CreateAlertRequest,
    ) -> Result<Alert, ApiError> {
        let alert: Alert = self
            .executor
            .post_json(&format!("users/{user_id}/alerts"), request)
            .await?;

        self.update_cached_user_alert(user_id, &alert).await;

        Ok(alert)
    }

    pub async fn update_alert_for_user(
        &self,
        user_id: i64,
        alert_id: i64,
        fields_to_update: &UpdateAlertRequest,
    ) -> Result<Alert, ApiError> {
        let document = patch_document(fields_to_update)?;
        let alert: Alert = self
            .executor
            .patch_json(&format!("users/{user_id}/alerts/{alert_id}"), &document)
            .await?;

        self.update_cached_user_alert(user_id, &alert).await;

        Ok(alert)
    }

    pub async fn delete_alert_for_user(&self, user_id: i64, alert_id: i64) -> Result<(), ApiError> {
        self.executor
            .delete(&format!("users/{user_id}/alerts/{alert_id}"))
            .await?;

        self.cache
            .remove(&Self::alert_cache_key(user_id, alert_id))
            .await;
        self.cache
            .remove_from_list(&Self::user_alerts_cache_key(user_id), |alert| {
                alert.id == alert_id
            })
            .await;

        Ok(())
    }

    async fn update_cached_user_alert(&self, user_id: i64, updated_or_new: &Alert) {
        self.cache
            .insert_single(
                Self::alert_cache_key(user_id, updated_or_new.id),
                updated_or_new.clone(),
            )
            .await;

        let alert_id = updated_or_new.id;
        self.cache
            .upsert_in_list(
                &Self::user_alerts_cache_key(user_id),
                updated_or_new.clone(),
                |alert| alert.id == alert_id,
            )
            .await;
    }
}
