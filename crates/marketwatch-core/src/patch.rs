//! JSON-Patch partial-update documents.
//!
//! The service accepts PATCH bodies shaped as a JSON-Patch-like array of
//! `add`/`replace` operations. Update DTOs use `Option` fields with
//! `skip_serializing_if`, so the document is a field-diff: only the
//! fields the caller actually set become operations.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOp {
    Add,
    Replace,
}

/// Single JSON-Patch operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchOperation {
    pub op: PatchOp,
    pub path: String,
    pub value: Value,
}

impl PatchOperation {
    pub fn add(field: &str, value: Value) -> Self {
        Self {
            op: PatchOp::Add,
            path: format!("/{field}"),
            value,
        }
    }
}

/// Build an `add`-operation document from the set fields of an update DTO.
pub fn patch_document<T: Serialize>(fields_to_update: &T) -> Result<Vec<PatchOperation>, ApiError> {
    let value = serde_json::to_value(fields_to_update)
        .map_err(|e| ApiError::Decode(format!("failed to serialize patch source: {e}")))?;

    let Value::Object(map) = value else {
        return Err(ApiError::Decode(String::from(
            "patch source must serialize to an object",
        )));
    };

    Ok(map
        .into_iter()
        .map(|(field, value)| PatchOperation::add(&field, value))
        .collect())
}
