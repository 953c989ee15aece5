//! Segmented avails: one root avail carved into sub-duration silos that can
//! only be sold as a complete composite (or, where the inventory owner
//! allows it, partially). The combinatorial resolution over those silos
//! lives in [`resolve`]; the transient candidate composites in [`combo`].
//!
//! The subsystem never touches budget state directly: it calls back into
//! the auction run through [`AuctionHooks`], which keeps every provisional
//! apply/unroll pair inside the run's journal.

pub mod combo;
pub mod resolve;

use {
    crate::domain::{
        bid::{BidId, BidStatus, WinType},
        spot::{Spot, SpotId, SpotLength},
    },
    money::Money,
    serde::{Deserialize, Serialize},
    std::cmp::Ordering,
};

/// Handle into the run's segment set list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SegmentSetId(pub usize);

/// The duration silos of a segmented avail family. A 60 second root has all
/// five; a 30 second root only the first three (its pair silos hold the 15
/// second halves).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Silo {
    Root,
    PairA,
    PairB,
    QuadA,
    QuadB,
}

impl Silo {
    pub const ALL: [Silo; 5] = [Silo::Root, Silo::PairA, Silo::PairB, Silo::QuadA, Silo::QuadB];

    fn index(self) -> usize {
        match self {
            Self::Root => 0,
            Self::PairA => 1,
            Self::PairB => 2,
            Self::QuadA => 3,
            Self::QuadB => 4,
        }
    }

    /// Occupancy of the root timeline in quarters. Quads share the leading
    /// pair's slots, so winning a quad pair invalidates pair-0 candidates
    /// and vice versa.
    pub fn quarter_mask(self) -> u8 {
        match self {
            Self::Root => 0b1111,
            Self::PairA => 0b0011,
            Self::PairB => 0b1100,
            Self::QuadA => 0b0001,
            Self::QuadB => 0b0010,
        }
    }
}

/// Which segment win algorithm the run uses. `Complex` is the default full
/// combinatorial search; the others are reduced-search policy variants with
/// weaker guarantees.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum WinAlgorithm {
    #[default]
    Complex,
    /// Evaluate only the single best-ranked combo, no member replacement.
    TopRankedOnly,
    /// Only consider combos containing the linchpin's own silo.
    LinchpinSiloOnly,
    /// Non-combinatorial: award the linchpin alone when partial sales are
    /// allowed.
    SimplePartial,
}

/// All bids across the duration silos of one segmented avail family.
#[derive(Debug)]
pub struct SegmentSet {
    pub root_spot: SpotId,
    pub root_length: SpotLength,
    pub day_index: u32,
    pub partial_sales_allowed: bool,
    /// Set once a full composite (or a preassigned winner) owns the family.
    pub resolved: bool,
    /// Quarters of the root timeline already won.
    pub occupied: u8,
    /// Sum of winning durations; never exceeds the root duration.
    pub won_seconds: u32,
    silos: [Vec<BidId>; 5],
    /// Run-scoped debug trail of resolution decisions.
    pub action_log: Vec<String>,
}

impl Default for SegmentSet {
    fn default() -> Self {
        Self {
            root_spot: SpotId(0),
            root_length: SpotLength::Thirty,
            day_index: 0,
            partial_sales_allowed: false,
            resolved: false,
            occupied: 0,
            won_seconds: 0,
            silos: Default::default(),
            action_log: Vec::new(),
        }
    }
}

impl SegmentSet {
    pub fn new(root: &Spot, partial_sales_allowed: bool) -> Self {
        Self {
            root_spot: root.id,
            root_length: root.length,
            day_index: root.day_index,
            partial_sales_allowed,
            ..Default::default()
        }
    }

    /// Classifies a spot of this family into its silo. Returns `None` for
    /// spots whose duration doesn't fit the family's layout.
    pub fn silo_of(&self, spot: &Spot) -> Option<Silo> {
        if spot.id == self.root_spot {
            return Some(Silo::Root);
        }
        let offset = spot.segmentation.map(|s| s.offset).unwrap_or(0);
        if Some(spot.length) == self.root_length.half() {
            return Some(if offset == 0 { Silo::PairA } else { Silo::PairB });
        }
        if Some(spot.length) == self.root_length.quarter() {
            return Some(if offset == 0 { Silo::QuadA } else { Silo::QuadB });
        }
        None
    }

    pub fn add_bid(&mut self, silo: Silo, bid: BidId) {
        self.silos[silo.index()].push(bid);
    }

    /// Orders every silo best-first with the run's comparator. Called once
    /// after all bids are added.
    pub fn sort_silos(&mut self, mut compare: impl FnMut(BidId, BidId) -> Ordering) {
        for silo in &mut self.silos {
            silo.sort_by(|a, b| compare(*a, *b));
        }
    }

    pub fn silo(&self, silo: Silo) -> &[BidId] {
        &self.silos[silo.index()]
    }

    pub fn all_bids(&self) -> impl Iterator<Item = BidId> + '_ {
        self.silos.iter().flatten().copied()
    }

    pub fn silo_containing(&self, bid: BidId) -> Option<Silo> {
        Silo::ALL
            .into_iter()
            .find(|silo| self.silos[silo.index()].contains(&bid))
    }

    /// Whether a win in the given silo still fits the unoccupied part of
    /// the root timeline.
    pub fn fits(&self, silo: Silo) -> bool {
        self.occupied & silo.quarter_mask() == 0
    }

    pub fn record_win(&mut self, silo: Silo, seconds: u32) {
        self.occupied |= silo.quarter_mask();
        self.won_seconds += seconds;
        if self.occupied == 0b1111 {
            self.resolved = true;
        }
    }

    pub fn has_winner(&self) -> bool {
        self.occupied != 0
    }

    pub fn remaining_seconds(&self) -> u32 {
        self.root_length.seconds().saturating_sub(self.won_seconds)
    }

    pub fn note(&mut self, message: String) {
        self.action_log.push(message);
    }
}

/// The auction run's APIs the segment subsystem calls back into. Provisional
/// effects requested through this trait are journaled by the implementation;
/// the resolver is responsible for pairing every apply with an unroll before
/// it returns.
pub trait AuctionHooks {
    fn is_in_play(&self, bid: BidId) -> bool;
    fn rank_of(&self, bid: BidId) -> i64;
    fn cost_of(&self, bid: BidId) -> Money;
    /// Duration of the bid's avail in seconds.
    fn seconds_of(&self, bid: BidId) -> u32;
    /// The global ranking comparator over two bids.
    fn compare_bids(&self, a: BidId, b: BidId) -> Ordering;

    /// Runs the full winnability chain on the bid (mirror partner included)
    /// and applies its budget effect provisionally. On failure the bid's
    /// specific losing status has been set and nothing was applied.
    fn try_provisional_win(&mut self, bid: BidId) -> bool;
    /// Reverses a provisional effect applied by [`Self::try_provisional_win`].
    fn unroll_provisional(&mut self, bid: BidId);
    /// Commits the bid (and its mirror partner, when present) as a winner.
    fn commit_winner(&mut self, bid: BidId, win: WinType);
    fn mark_lost(&mut self, bid: BidId, status: BidStatus);

    /// Opens a provisional scope; false means the nesting limit was hit and
    /// the resolution must decline.
    fn begin_scope(&mut self) -> bool;
    /// Closes the scope, reporting and force-unrolling anything leaked.
    fn end_scope(&mut self, context: &str);
    fn report_consistency(&mut self, context: &str, bid: Option<BidId>);
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::domain::spot::{BreakId, ChannelId, OwnerId, Segmentation},
        money::Money,
    };

    fn family_spot(id: u64, length: SpotLength, root: u64, offset: u8) -> Spot {
        Spot {
            id: SpotId(id),
            channel: ChannelId(1),
            break_id: BreakId(1),
            owner: OwnerId(1),
            length,
            day_index: 0,
            week_index: 0,
            audience: 1_000,
            policy_price: Money::from_major(10),
            rate_card_eligible: false,
            segmentation: (id != root).then_some(Segmentation {
                root: SpotId(root),
                offset,
            }),
            mirror_of: None,
        }
    }

    #[test]
    fn sixty_second_family_classifies_all_five_silos() {
        let root = family_spot(1, SpotLength::Sixty, 1, 0);
        let set = SegmentSet::new(&root, false);
        assert_eq!(set.silo_of(&root), Some(Silo::Root));
        assert_eq!(
            set.silo_of(&family_spot(2, SpotLength::Thirty, 1, 0)),
            Some(Silo::PairA)
        );
        assert_eq!(
            set.silo_of(&family_spot(3, SpotLength::Thirty, 1, 1)),
            Some(Silo::PairB)
        );
        assert_eq!(
            set.silo_of(&family_spot(4, SpotLength::Fifteen, 1, 0)),
            Some(Silo::QuadA)
        );
        assert_eq!(
            set.silo_of(&family_spot(5, SpotLength::Fifteen, 1, 1)),
            Some(Silo::QuadB)
        );
    }

    #[test]
    fn thirty_second_family_has_no_quads() {
        let root = family_spot(1, SpotLength::Thirty, 1, 0);
        let set = SegmentSet::new(&root, false);
        assert_eq!(
            set.silo_of(&family_spot(2, SpotLength::Fifteen, 1, 0)),
            Some(Silo::PairA)
        );
        // nothing is a quarter of thirty seconds
        assert_eq!(set.silo_of(&family_spot(3, SpotLength::Sixty, 1, 0)), None);
    }

    #[test]
    fn quads_share_the_leading_pair_slot() {
        let root = family_spot(1, SpotLength::Sixty, 1, 0);
        let mut set = SegmentSet::new(&root, true);
        set.record_win(Silo::QuadA, 15);
        // the leading half overlaps the won quarter
        assert!(!set.fits(Silo::PairA));
        assert!(set.fits(Silo::PairB));
        assert!(set.fits(Silo::QuadB));
        set.record_win(Silo::QuadB, 15);
        set.record_win(Silo::PairB, 30);
        assert!(set.resolved);
        assert_eq!(set.won_seconds, 60);
    }
}
