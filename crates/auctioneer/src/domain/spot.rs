//! Avails: the sellable units of the auction. A spot is immutable once
//! loaded for a run; all auction-time state lives on the bids and on the
//! per-run [`crate::domain::auctioneer::AuctionSpot`] wrapper.

use {
    money::Money,
    serde::{Deserialize, Serialize},
};

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
    derive_more::Display,
)]
pub struct SpotId(pub u64);

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
    derive_more::Display,
)]
pub struct ChannelId(pub u64);

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
    derive_more::Display,
)]
pub struct BreakId(pub u64);

/// The inventory owner a break belongs to. Partial segment sales and channel
/// bundling requirements are scoped per owner.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
    derive_more::Display,
)]
pub struct OwnerId(pub u64);

/// Sellable spot durations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SpotLength {
    Fifteen,
    Thirty,
    Sixty,
}

impl SpotLength {
    pub fn seconds(self) -> u32 {
        match self {
            Self::Fifteen => 15,
            Self::Thirty => 30,
            Self::Sixty => 60,
        }
    }

    /// The duration of one half of a segmented avail of this length.
    pub fn half(self) -> Option<Self> {
        match self {
            Self::Sixty => Some(Self::Thirty),
            Self::Thirty => Some(Self::Fifteen),
            Self::Fifteen => None,
        }
    }

    /// The duration of one quarter of a segmented avail of this length.
    /// Quarters only exist for 60 second roots.
    pub fn quarter(self) -> Option<Self> {
        match self {
            Self::Sixty => Some(Self::Fifteen),
            _ => None,
        }
    }
}

/// Links a sub-duration avail to the root avail it is carved out of.
/// `offset` is the position within the root: 0 is the leading half (or
/// quarter), 1 the trailing one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segmentation {
    pub root: SpotId,
    pub offset: u8,
}

/// One sellable advertising time slot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Spot {
    pub id: SpotId,
    pub channel: ChannelId,
    pub break_id: BreakId,
    pub owner: OwnerId,
    pub length: SpotLength,
    /// Day index within the auction date range, 0-based.
    pub day_index: u32,
    /// Budget week index within the auction date range, 0-based.
    pub week_index: u32,
    /// Total-audience-view estimate for this slot.
    pub audience: u64,
    /// The policy (rate card) price for the full slot.
    pub policy_price: Money,
    /// Whether the rate-card discount may be offered to a sole bidder.
    pub rate_card_eligible: bool,
    pub segmentation: Option<Segmentation>,
    /// The paired avail this one must be won together with, if any.
    pub mirror_of: Option<SpotId>,
}

impl Spot {
    /// The floor CPM implied by the policy price and the audience estimate.
    pub fn floor_cpm(&self) -> Money {
        self.policy_price.per_mille(self.audience)
    }

    pub fn is_segmented(&self) -> bool {
        self.segmentation.is_some()
    }

    pub fn is_mirrored(&self) -> bool {
        self.mirror_of.is_some()
    }
}
