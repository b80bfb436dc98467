//! Auction price history reads.

use marketwatch_core::{fetch_all_pages, ApiError, CursorPage, PageInfo, RequestExecutor};

use crate::entities::AuctionTimeSeriesEntry;
use crate::requests::AuctionTimeSeriesQueryParameters;

pub struct TimeSeriesClient {
    executor: RequestExecutor,
}

impl TimeSeriesClient {
    pub fn new(executor: RequestExecutor) -> Self {
        Self { executor }
    }

    async fn fetch_page(
        executor: RequestExecutor,
        params: AuctionTimeSeriesQueryParameters,
    ) -> Result<CursorPage<AuctionTimeSeriesEntry>, ApiError> {
        let url = params.query_pairs().append_to("wow/auctionTimeSeries");
        let page: Option<CursorPage<AuctionTimeSeriesEntry>> = executor.get_json(&url).await?;

        Ok(page.unwrap_or_else(empty_page))
    }

    /// Single page of observations.
    pub async fn get_auction_time_series(
        &self,
        params: &AuctionTimeSeriesQueryParameters,
    ) -> Result<Vec<AuctionTimeSeriesEntry>, ApiError> {
        let page = Self::fetch_page(self.executor.clone(), params.clone()).await?;
        Ok(page.nodes)
    }

    /// Full history: walks every page following cursors to exhaustion.
    pub async fn get_full_auction_time_series(
        &self,
        params: &AuctionTimeSeriesQueryParameters,
    ) -> Result<Vec<AuctionTimeSeriesEntry>, ApiError> {
        let base = params.clone();
        let executor = self.executor.clone();
        let default_page_size = self.executor.config().default_page_size;

        fetch_all_pages(
            move |pagination| {
                let mut page_params = base.clone();
                page_params.pagination = pagination;
                Self::fetch_page(executor.clone(), page_params)
            },
            params.pagination.clone(),
            default_page_size,
        )
        .await
    }
}

fn empty_page() -> CursorPage<AuctionTimeSeriesEntry> {
    CursorPage {
        nodes: Vec::new(),
        page_info: PageInfo {
            start_cursor: None,
            end_cursor: None,
            has_next_page: false,
            has_previous_page: false,
        },
        total_count: None,
    }
}
