//! User reads and partial updates.

use marketwatch_core::{patch_document, ApiError, CursorPage, RequestExecutor};

use crate::entities::User;
use crate::requests::UpdateUserRequest;

pub struct UsersClient {
    executor: RequestExecutor,
}

impl UsersClient {
    pub fn new(executor: RequestExecutor) -> Self {
        Self { executor }
    }

    pub async fn get_users(&self) -> Result<Vec<User>, ApiError> {
        let page: Option<CursorPage<User>> = self.executor.get_json("users").await?;
        Ok(page.map(|page| page.nodes).unwrap_or_default())
    }

    pub async fn get_user(&self, user_id: i64) -> Result<Option<User>, ApiError> {
        self.executor.get_json(&format!("users/{user_id}")).await
    }

    pub async fn update_user(
        &self,
        user_id: i64,
        fields_to_update: &UpdateUserRequest,
    ) -> Result<User, ApiError> {
        let document = patch_document(fields_to_update)?;
        self.executor
            .patch_json(&format!("users/{user_id}"), &document)
            .await
    }
}
