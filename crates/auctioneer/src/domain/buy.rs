//! Campaign buys and their creatives, snapshotted per auction run. The
//! engine never mutates a buy; per-run creative eligibility is tracked on
//! the bids instead.

use {
    crate::domain::spot::{SpotId, SpotLength},
    money::Money,
    serde::{Deserialize, Serialize},
    std::collections::BTreeSet,
};

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
    derive_more::Display,
)]
pub struct BuyId(pub u64);

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
    derive_more::Display,
)]
pub struct CreativeId(pub u64);

/// One piece of copy a buy can air. A creative is only usable on an avail
/// whose duration matches and, in a real auction, for which an approved copy
/// has been propagated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Creative {
    pub id: CreativeId,
    pub length: SpotLength,
    pub approved: bool,
    /// Spots this creative has a propagated, approved copy for.
    pub propagated_spots: BTreeSet<SpotId>,
}

/// Snapshot of one campaign buy competing in the auction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CampaignBuy {
    pub id: BuyId,
    /// Priority tier; determines which auction passes the buy bids in.
    pub priority: u8,
    /// The most the buy is willing to pay per thousand views.
    pub cpm_limit: Money,
    /// Minimum acceptable views per whole currency unit of spend.
    pub min_efficiency: f64,
    /// The buy always pays the avail's floor price.
    pub pays_minimum_rate: bool,
    /// The buy pays its advertiser-adjusted rate instead of the derived one.
    pub pays_adjusted_rate: bool,
    pub adjusted_cpm: Option<Money>,
    /// Channel bundling: the buy must win on at least this many distinct
    /// channels per inventory owner before any single win unlocks.
    pub min_channels_per_owner: Option<u32>,
    pub creatives: Vec<Creative>,
}

impl CampaignBuy {
    pub fn creative(&self, id: CreativeId) -> Option<&Creative> {
        self.creatives.iter().find(|c| c.id == id)
    }

    pub fn creative_ids(&self) -> Vec<CreativeId> {
        self.creatives.iter().map(|c| c.id).collect()
    }
}
