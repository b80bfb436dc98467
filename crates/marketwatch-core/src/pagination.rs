//! Cursor pagination types and the page walker.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::query::QueryPairs;

/// Page bookkeeping returned by every list endpoint.
///
/// `has_next_page == true` implies the service also sent an `end_cursor`;
/// the walker treats a missing cursor as exhaustion rather than an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    #[serde(default)]
    pub start_cursor: Option<String>,
    #[serde(default)]
    pub end_cursor: Option<String>,
    pub has_next_page: bool,
    pub has_previous_page: bool,
}

/// One page of a cursor-paginated response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CursorPage<T> {
    #[serde(default = "Vec::new")]
    pub nodes: Vec<T>,
    pub page_info: PageInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_count: Option<u64>,
}

/// Query parameters understood by every paginated endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CursorPaginationParams {
    pub first: Option<u32>,
    pub after: Option<String>,
    pub last: Option<u32>,
    pub before: Option<String>,
    pub include_total: Option<bool>,
    pub include_nodes: Option<bool>,
    pub include_edges: Option<bool>,
}

impl CursorPaginationParams {
    pub fn first(first: u32) -> Self {
        Self {
            first: Some(first),
            ..Self::default()
        }
    }

    /// Serialize in fixed field order so identical parameter sets always
    /// produce identical cache and dedup keys.
    pub fn append_query_pairs(&self, pairs: &mut QueryPairs) {
        pairs.push_opt("first", self.first.as_ref());
        pairs.push_opt("after", self.after.as_ref());
        pairs.push_opt("last", self.last.as_ref());
        pairs.push_opt("before", self.before.as_ref());
        pairs.push_opt("includeTotal", self.include_total.as_ref());
        pairs.push_opt("includeNodes", self.include_nodes.as_ref());
        pairs.push_opt("includeEdges", self.include_edges.as_ref());
    }
}

/// Walk a paged endpoint to exhaustion and return all nodes in order.
///
/// `first` defaults to `default_page_size` when unset and edges are
/// always excluded. Cursors are consumed monotonically forward; a stable
/// snapshot is not assumed, so server-side writes during the walk may
/// surface duplicate or missing items.
pub async fn fetch_all_pages<T, F, Fut>(
    mut fetch_page: F,
    mut params: CursorPaginationParams,
    default_page_size: u32,
) -> Result<Vec<T>, ApiError>
where
    F: FnMut(CursorPaginationParams) -> Fut,
    Fut: Future<Output = Result<CursorPage<T>, ApiError>>,
{
    params.first.get_or_insert(default_page_size);
    params.include_edges = Some(false);

    let page = fetch_page(params.clone()).await?;
    let mut results = page.nodes;
    let mut prev_page = page.page_info;

    while prev_page.has_next_page {
        let Some(end_cursor) = prev_page.end_cursor else {
            break;
        };

        params.after = Some(end_cursor);
        let next = fetch_page(params.clone()).await?;
        prev_page = next.page_info;
        results.extend(next.nodes);
    }

    Ok(results)
}
