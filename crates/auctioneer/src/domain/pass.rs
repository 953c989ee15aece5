//! Auction passes: the ordered priority tiers of the multi-pass algorithm.

use {money::Percent, serde::{Deserialize, Serialize}, std::collections::BTreeSet};

/// One priority tier. Passes run in ascending `number` order; each pass
/// adjusts avail floor prices by a percentage and only admits bids from
/// buys whose priority participates in the tier.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionPass {
    pub number: u32,
    /// Percentage added to (or, negative, subtracted from) the policy price
    /// when deriving this pass's floor CPM.
    pub price_adjustment: Percent,
    pub eligible_priorities: BTreeSet<u8>,
}

impl AuctionPass {
    pub fn admits(&self, priority: u8) -> bool {
        self.eligible_priorities.contains(&priority)
    }

    /// A pass with no participating priorities is skipped entirely.
    pub fn is_empty(&self) -> bool {
        self.eligible_priorities.is_empty()
    }
}
