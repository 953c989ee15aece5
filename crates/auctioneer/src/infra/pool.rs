//! The avail pool: the engine's source of spots, bids, passes and run
//! settings. The grid ("soup") construction that decides which avails and
//! which campaign pairings are candidates happens behind this trait.

use {
    crate::domain::{
        DateRange,
        auctioneer::preassigned::PreassignedWinner,
        buy::{BuyId, CampaignBuy},
        pass::AuctionPass,
        spot::{OwnerId, Spot, SpotId},
    },
    money::{Money, Percent},
    serde::{Deserialize, Serialize},
    std::collections::BTreeMap,
};

/// Run-wide pricing knobs supplied by the pool.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionSettings {
    /// CPM increment a bid must put on top of the previous bidder's CPM.
    pub win_margin: Money,
    /// Discount offered to a sole bidder on a rate-card-eligible avail whose
    /// CPM limit sits below the floor.
    pub rate_card_discount: Percent,
}

/// One candidate (buy, avail) pairing with its grid-derived scores. The
/// engine turns seeds into arena bids at build time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BidSeed {
    pub buy: BuyId,
    pub spot: SpotId,
    pub rank: i64,
    pub alt_rank: i64,
}

/// Supplies everything a run consumes from the wider system.
pub trait AuctionPool {
    fn auction_settings(&self) -> AuctionSettings;
    /// The priority tiers, ascending. Must not be empty.
    fn auction_passes(&self) -> Vec<AuctionPass>;
    /// Winners carried into a real auction from outside.
    fn preassigned_winners(&self) -> Vec<PreassignedWinner>;
    /// All candidate pairings within the date range.
    fn auction_bidders(&self, range: &DateRange) -> Vec<BidSeed>;
    fn active_buys(&self) -> BTreeMap<BuyId, CampaignBuy>;
    /// Looks an avail up outside the client's spot map, e.g. the far side
    /// of a mirror pair.
    fn spot_by_id(&self, id: SpotId) -> Option<Spot>;
    /// Inventory-tracking policy: whether the owner sells segments
    /// partially.
    fn owner_allows_partial_sales(&self, owner: OwnerId) -> bool;
}
