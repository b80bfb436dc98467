//! Request DTOs and query parameter sets.
//!
//! Update DTOs use `Option` fields with `skip_serializing_if` so
//! [`marketwatch_core::patch_document`] turns exactly the set fields
//! into JSON-Patch operations.

use marketwatch_core::{CursorPaginationParams, QueryPairs};
use serde::Serialize;

pub use marketwatch_core::RegisterUserRequest;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAlertRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAlertRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWatchListRequest {
    pub market_id: i64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateWatchListRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddItemToWatchListRequest {
    pub id: i64,
}

/// Filters accepted by the items list endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemQueryParameters {
    pub pagination: CursorPaginationParams,
    pub name: Option<String>,
    pub quality: Option<String>,
}

impl ItemQueryParameters {
    pub fn query_pairs(&self) -> QueryPairs {
        let mut pairs = QueryPairs::new();
        self.pagination.append_query_pairs(&mut pairs);
        pairs.push_opt("name", self.name.as_ref());
        pairs.push_opt("quality", self.quality.as_ref());
        pairs
    }
}

/// Filters accepted by the realm list endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RealmQueryParameters {
    pub pagination: CursorPaginationParams,
    pub name: Option<String>,
}

impl RealmQueryParameters {
    pub fn query_pairs(&self) -> QueryPairs {
        let mut pairs = QueryPairs::new();
        self.pagination.append_query_pairs(&mut pairs);
        pairs.push_opt("name", self.name.as_ref());
        pairs
    }
}

/// Filters accepted by the auction time series endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuctionTimeSeriesQueryParameters {
    pub pagination: CursorPaginationParams,
    pub item_id: Option<i64>,
    pub market_id: Option<i64>,
    pub start_date: String,
    pub end_date: Option<String>,
}

impl AuctionTimeSeriesQueryParameters {
    pub fn query_pairs(&self) -> QueryPairs {
        let mut pairs = QueryPairs::new();
        self.pagination.append_query_pairs(&mut pairs);
        pairs.push_opt("itemId", self.item_id.as_ref());
        pairs.push_opt("marketId", self.market_id.as_ref());
        pairs.push("startDate", &self.start_date);
        pairs.push_opt("endDate", self.end_date.as_ref());
        pairs
    }
}
