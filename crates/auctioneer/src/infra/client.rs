//! The client whose schedule is being auctioned: its buy, its date range
//! and its view of the candidate avails.

use {
    crate::domain::{
        DateRange,
        buy::{BuyId, CampaignBuy},
        spot::{Spot, SpotId},
    },
    indexmap::IndexMap,
    serde::{Deserialize, Serialize},
};

/// View toggles the grid exposes; they narrow the candidate set before the
/// auction ever sees it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionConstraints {
    /// Keep avails without an audience estimate in the pool (their bidders
    /// still always lose with a no-viewers status).
    pub include_zero_audience: bool,
}

pub trait AuctionClient {
    /// The client's own campaign buy.
    fn ad_buy_id(&self) -> BuyId;
    fn auction_date_range(&self) -> DateRange;
    fn auction_constraints(&self) -> AuctionConstraints;
    /// Snapshot of the client's buy, used when the pool's active-buy list
    /// doesn't carry it.
    fn auction_info(&self) -> CampaignBuy;
    /// The candidate avails for this client, in grid order.
    fn spot_map(&self) -> IndexMap<SpotId, Spot>;
}
