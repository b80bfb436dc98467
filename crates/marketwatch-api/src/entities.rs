//! Wire entities returned by the service.

use serde::{Deserialize, Serialize};

pub use marketwatch_core::AuthUser as User;
pub use marketwatch_core::LinkedAccount;

/// Tradable market item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub quality: Option<String>,
    #[serde(default)]
    pub is_stackable: bool,
}

/// One observation in an item's auction price history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuctionTimeSeriesEntry {
    pub id: i64,
    pub item_id: i64,
    pub market_id: i64,
    pub timestamp: String,
    pub min_price: i64,
    pub max_price: i64,
    pub average_price: f64,
    pub total_available: i64,
}

/// Single game realm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Realm {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
}

/// Group of realms sharing one auction house; this is the market a
/// time-series observation belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedRealm {
    pub id: i64,
    #[serde(default)]
    pub realms: Vec<Realm>,
}

/// Named set of items a user follows on one market.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchList {
    pub id: i64,
    pub user_id: i64,
    pub market_id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub watched_items: Vec<Item>,
}

/// Price alert owned by a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}
