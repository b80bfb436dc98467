//! # Marketwatch API
//!
//! Thin per-entity clients for the market watcher service, composed from
//! the resilient access layer in [`marketwatch_core`]: every call runs
//! through the interceptor pipeline and the in-flight map, list reads
//! use the cursor pagination walker, and cached entity types invalidate
//! on every mutation.

pub mod alerts;
pub mod client;
pub mod entities;
pub mod items;
pub mod realms;
pub mod requests;
pub mod time_series;
pub mod users;
pub mod watch_lists;

pub use alerts::AlertsClient;
pub use client::MarketWatchClient;
pub use entities::{
    Alert, AuctionTimeSeriesEntry, ConnectedRealm, Item, LinkedAccount, Realm, User, WatchList,
};
pub use items::ItemsClient;
pub use realms::RealmsClient;
pub use requests::{
    AddItemToWatchListRequest, AuctionTimeSeriesQueryParameters, CreateAlertRequest,
    CreateWatchListRequest, ItemQueryParameters, RealmQueryParameters, RegisterUserRequest,
    UpdateAlertRequest, UpdateUserRequest, UpdateWatchListRequest,
};
pub use time_series::TimeSeriesClient;
pub use users::UsersClient;
pub use watch_lists::WatchListsClient;
