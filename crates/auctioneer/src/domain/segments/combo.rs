//! Candidate composites for a segmented avail. A combo is transient: built,
//! evaluated and discarded during the resolution of one linchpin.

use {
    super::{AuctionHooks, SegmentSet, Silo},
    crate::domain::{bid::BidId, spot::SpotLength},
    money::Money,
};

/// The three legal composite layouts. Quads only exist under 60 second
/// roots, and a quad pair occupies the leading half, which is why the trio
/// pairs them with the trailing pair silo.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ComboShape {
    RootOnly,
    Pair,
    Trio,
}

impl ComboShape {
    pub fn required_silos(self) -> &'static [Silo] {
        match self {
            Self::RootOnly => &[Silo::Root],
            Self::Pair => &[Silo::PairA, Silo::PairB],
            Self::Trio => &[Silo::PairB, Silo::QuadA, Silo::QuadB],
        }
    }

    pub fn shapes_for(root: SpotLength) -> &'static [ComboShape] {
        match root {
            SpotLength::Sixty => &[Self::RootOnly, Self::Pair, Self::Trio],
            SpotLength::Thirty => &[Self::RootOnly, Self::Pair],
            // a 15 second avail has nothing to segment into
            SpotLength::Fifteen => &[Self::RootOnly],
        }
    }
}

/// One candidate composite set of bids evaluated as a unit.
#[derive(Clone, Debug)]
pub struct Combo {
    pub shape: ComboShape,
    /// One member per required silo, parallel to
    /// [`ComboShape::required_silos`].
    members: Vec<BidId>,
}

impl Combo {
    /// Builds the combo for a shape: the linchpin claims its own silo's
    /// slot, every other slot takes the best-ranked still-in-play bid of
    /// its silo. Returns `None` unless every slot filled.
    pub fn build(
        shape: ComboShape,
        linchpin: Option<BidId>,
        set: &SegmentSet,
        hooks: &impl AuctionHooks,
    ) -> Option<Self> {
        let linchpin_silo = linchpin.and_then(|bid| set.silo_containing(bid));
        let members = shape
            .required_silos()
            .iter()
            .map(|&silo| {
                if let (Some(bid), Some(owned)) = (linchpin, linchpin_silo)
                    && owned == silo
                {
                    return Some(bid);
                }
                set.silo(silo)
                    .iter()
                    .copied()
                    .find(|&bid| hooks.is_in_play(bid) && Some(bid) != linchpin)
            })
            .collect::<Option<Vec<_>>>()?;
        Some(Self { shape, members })
    }

    pub fn members(&self) -> &[BidId] {
        &self.members
    }

    pub fn contains(&self, bid: BidId) -> bool {
        self.members.contains(&bid)
    }

    pub fn summed_rank(&self, hooks: &impl AuctionHooks) -> i64 {
        self.members.iter().map(|&bid| hooks.rank_of(bid)).sum()
    }

    pub fn summed_cost(&self, hooks: &impl AuctionHooks) -> Money {
        self.members.iter().map(|&bid| hooks.cost_of(bid)).sum()
    }

    /// Members ordered for evaluation: the linchpin is judged first so a
    /// doomed combo aborts before provisionally committing the rest.
    pub fn evaluation_order(&self, linchpin: Option<BidId>) -> Vec<BidId> {
        let mut order = self.members.clone();
        if let Some(linchpin) = linchpin
            && let Some(index) = order.iter().position(|&bid| bid == linchpin)
        {
            order.swap(0, index);
        }
        order
    }

    /// Replaces one member with the next-ranked still-in-play bid from the
    /// same silo. The rest of the combo is kept; re-enumerating every
    /// combination from scratch after a single member fails would redo all
    /// the work the previous attempts already did.
    pub fn replace_member(
        &mut self,
        failing: BidId,
        set: &SegmentSet,
        hooks: &impl AuctionHooks,
        protected: Option<BidId>,
    ) -> bool {
        let Some(slot) = self.members.iter().position(|&bid| bid == failing) else {
            return false;
        };
        if Some(failing) == protected {
            // the linchpin cannot be replaced out of its own combo
            return false;
        }
        let silo = self.shape.required_silos()[slot];
        let replacement = set
            .silo(silo)
            .iter()
            .copied()
            .find(|&bid| hooks.is_in_play(bid) && !self.members.contains(&bid));
        match replacement {
            Some(bid) => {
                self.members[slot] = bid;
                true
            }
            None => false,
        }
    }

    /// A combo stays viable only while every member is still in play.
    /// Members knocked out by other resolutions are swapped for the next
    /// in-play bid of their silo where one exists.
    pub fn revalidate(
        &mut self,
        set: &SegmentSet,
        hooks: &impl AuctionHooks,
        protected: Option<BidId>,
    ) -> bool {
        for slot in 0..self.members.len() {
            let member = self.members[slot];
            if hooks.is_in_play(member) {
                continue;
            }
            if !self.replace_member(member, set, hooks, protected) {
                return false;
            }
        }
        true
    }
}
