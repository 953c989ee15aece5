//! Bids and their run-scoped state. A bid pairs one campaign buy with one
//! avail; everything mutable about it (status, pricing, creative selection,
//! provisional-totals flag) lives here and is rebuilt on every data refresh.
//!
//! Bids are stored in an arena owned by the auction run and addressed by
//! [`BidId`] handles, so nested resolution paths (mirror, bundling, combos)
//! never hold aliasing references into shared state.

use {
    crate::domain::{
        buy::{BuyId, CreativeId},
        spot::SpotId,
    },
    money::Money,
    serde::Serialize,
    strum::IntoStaticStr,
};

/// Handle into the run's bid arena.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, derive_more::Display,
)]
pub struct BidId(pub usize);

/// The terminal or intermediate status of a bid. Exactly one status holds at
/// any time; the losing variants are the audit trail for why a bid lost.
///
/// Priority disqualification is deliberately not represented: a bid whose
/// buy is not eligible for the current pass is skipped without touching its
/// status, so the true losing reason is never masked.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, IntoStaticStr)]
pub enum BidStatus {
    InPlay,
    Winner,
    /// The avail had no estimated viewers.
    NoViewers,
    /// The buy was not an active participant when the bid was examined.
    NotInProgram,
    /// The assigned CPM exceeded the buy's CPM limit.
    CpmExceeded,
    /// Views per currency unit fell below the buy's minimum.
    EfficiencyBelowThreshold,
    /// Creative pruning left no usable creative for the avail.
    NoEligibleCreative,
    /// A specific (forced or preassigned) creative was unusable.
    CreativeRejected,
    /// Built-in adjacency rules rejected the placement.
    AutoAdjacencyFailed,
    /// Advertiser adjacency rules rejected the placement.
    AdvertiserAdjacencyFailed,
    /// Channel proximity restrictions rejected the placement.
    ProximityRestricted,
    /// The win would exceed the buy's budget limits.
    BudgetExceeded,
    /// Product attribute rules rejected every remaining creative.
    ProductAdjacencyFailed,
    /// The mirrored avail has no bid from this buy to pair with.
    MirrorOrphaned,
    /// The mirror partner bid exists but could not win.
    MirrorPartnerLost,
    /// The buy's minimum distinct-channel requirement could not be met.
    ChannelBundlingReqNotMet,
    /// The bid's segment sold to another combination of bids.
    HasSegmentedWinner,
    /// No combination of bids could fill the bid's segment.
    NoSegmentComboFound,
    /// Another bid won the avail outright.
    LostToHigherBid,
    /// The bid was never examined in any pass.
    NeverParticipated,
}

impl BidStatus {
    pub fn is_winner(self) -> bool {
        self == Self::Winner
    }

    pub fn is_in_play(self) -> bool {
        self == Self::InPlay
    }

    pub fn is_loss(self) -> bool {
        !matches!(self, Self::InPlay | Self::Winner)
    }

    pub fn name(self) -> &'static str {
        self.into()
    }
}

/// How a winning bid won.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum WinType {
    Normal,
    /// Won as the forced partner of a mirrored winner.
    MirrorPartner,
    /// Won as part of satisfying a channel bundling requirement.
    BundlingRequirement,
    /// Carried into the run as a preassigned winner.
    Preassigned,
}

/// One campaign-buy's offer on one avail plus its auction-run state.
#[derive(Clone, Debug)]
pub struct Bid {
    pub buy: BuyId,
    pub spot: SpotId,
    /// Buy-and-avail derived score used to order competing bids.
    pub rank: i64,
    /// Substitute score compared when both ranks under comparison are
    /// negative.
    pub alt_rank: i64,
    /// Budget week of the avail; the auction fills one week at a time.
    pub week_index: u32,
    /// Root avail id when the bid sits on a segmented avail.
    pub segment_root: Option<SpotId>,
    /// Offset within the segment root (0 for unsegmented bids).
    pub segment_offset: u8,
    pub status: BidStatus,
    pub win_type: Option<WinType>,
    pub assigned_cpm: Money,
    pub auction_cost: Money,
    pub selected_creative: Option<CreativeId>,
    /// Creatives still usable for this avail; pruned as checks run.
    pub eligible_creatives: Vec<CreativeId>,
    /// Partner bid on the mirrored avail, resolved at build time.
    pub mirror_partner: Option<BidId>,
    /// Whether any pass examined this bid.
    pub seen: bool,
    /// Whether the bid's buy priority participates in the current pass.
    /// Deliberately a flag, not a status: see [`BidStatus`].
    pub qualified: bool,
    /// Provisional budget totals are currently applied to this bid. Must be
    /// false whenever the bid reaches `Winner` or a terminal loss.
    pub conditional_totals: bool,
    /// Permanently out of the auction (e.g. unresolvable mirror orphan);
    /// survives status resets.
    pub disqualified: bool,
}

impl Bid {
    pub fn new(buy: BuyId, spot: SpotId, rank: i64, alt_rank: i64) -> Self {
        Self {
            buy,
            spot,
            rank,
            alt_rank,
            week_index: 0,
            segment_root: None,
            segment_offset: 0,
            status: BidStatus::InPlay,
            win_type: None,
            assigned_cpm: Money::ZERO,
            auction_cost: Money::ZERO,
            selected_creative: None,
            eligible_creatives: Vec::new(),
            mirror_partner: None,
            seen: false,
            qualified: false,
            conditional_totals: false,
            disqualified: false,
        }
    }

    pub fn is_in_play(&self) -> bool {
        self.status.is_in_play()
    }

    pub fn is_winner(&self) -> bool {
        self.status.is_winner()
    }
}

/// Arena of all bids for one auction run.
#[derive(Debug, Default)]
pub struct BidArena {
    bids: Vec<Bid>,
}

impl BidArena {
    pub fn push(&mut self, bid: Bid) -> BidId {
        self.bids.push(bid);
        BidId(self.bids.len() - 1)
    }

    pub fn get(&self, id: BidId) -> &Bid {
        &self.bids[id.0]
    }

    pub fn get_mut(&mut self, id: BidId) -> &mut Bid {
        &mut self.bids[id.0]
    }

    pub fn ids(&self) -> impl Iterator<Item = BidId> + use<> {
        (0..self.bids.len()).map(BidId)
    }

    pub fn iter(&self) -> impl Iterator<Item = (BidId, &Bid)> {
        self.bids.iter().enumerate().map(|(i, bid)| (BidId(i), bid))
    }

    pub fn len(&self) -> usize {
        self.bids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty()
    }
}
