//! Preassigned winners: placements decided outside the auction that a real
//! run must honor before any pass begins. Simulated runs ignore them.

use {
    super::Run,
    crate::{
        domain::{
            bid::{BidId, BidStatus, WinType},
            segments::SegmentSetId,
        },
        infra::BudgetBook,
    },
    crate::domain::{
        buy::{BuyId, CreativeId},
        spot::SpotId,
    },
    serde::{Deserialize, Serialize},
};

/// Verification state of one preassigned winner. Anything but `Applied` is
/// a data error: logged, surfaced in the outcome, and the run continues
/// without the assignment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PreassignedState {
    Pending,
    Applied,
    /// The avail is not in the current pool, or carries no bid from the buy.
    InvalidAvail,
    /// The creative is unknown, unapproved or not propagated to the avail.
    InvalidCreative,
    /// The avail is mirrored but the paired avail's assignment is missing
    /// or disagrees.
    MirrorMismatch,
}

/// One winner carried into a real auction from outside.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreassignedWinner {
    pub spot: SpotId,
    pub buy: BuyId,
    pub creative: CreativeId,
    pub state: PreassignedState,
}

impl PreassignedWinner {
    pub fn new(spot: SpotId, buy: BuyId, creative: CreativeId) -> Self {
        Self {
            spot,
            buy,
            creative,
            state: PreassignedState::Pending,
        }
    }
}

impl<B: BudgetBook> Run<'_, B> {
    /// Step 2 of a real run: locate, verify and commit every preassigned
    /// winner. Unmatchable entries are flagged and logged without touching
    /// any other bid state.
    pub(crate) fn apply_preassigned(&mut self) {
        for index in 0..self.data.preassigned.len() {
            let entry = self.data.preassigned[index];
            let state = self.apply_one(entry);
            self.data.preassigned[index].state = state;
            if state != PreassignedState::Applied {
                // operational alert territory: the sold schedule and the
                // pool disagree
                tracing::error!(
                    spot = entry.spot.0,
                    buy = entry.buy.0,
                    creative = entry.creative.0,
                    ?state,
                    "preassigned winner could not be applied"
                );
            }
        }
    }

    fn apply_one(&mut self, entry: PreassignedWinner) -> PreassignedState {
        let Some(id) = self.find_preassigned(&entry) else {
            return PreassignedState::InvalidAvail;
        };

        // creative must be approved and propagated to this avail
        let spot = self.data.spots[&entry.spot].clone();
        let creative_ok = self
            .data
            .buys
            .get(&entry.buy)
            .and_then(|buy| buy.creative(entry.creative))
            .is_some_and(|creative| {
                creative.approved
                    && creative.length == spot.length
                    && creative.propagated_spots.contains(&spot.id)
            });
        if !creative_ok {
            return PreassignedState::InvalidCreative;
        }

        // mirror consistency: the paired avail must carry its own matching
        // assignment for the same buy and creative
        if let Some(paired) = spot.mirror_of {
            let partner_assigned = self.data.preassigned.iter().any(|other| {
                other.spot == paired && other.buy == entry.buy && other.creative == entry.creative
            });
            if !partner_assigned {
                return PreassignedState::MirrorMismatch;
            }
        }

        let bid = self.data.arena.get_mut(id);
        bid.status = BidStatus::Winner;
        bid.win_type = Some(WinType::Preassigned);
        bid.selected_creative = Some(entry.creative);
        bid.assigned_cpm = spot.floor_cpm();
        bid.auction_cost = spot.policy_price;
        bid.seen = true;
        let cost = bid.auction_cost;
        self.budget.add_winner_budget_totals(entry.buy, &spot, cost);
        self.budget
            .add_winner_content_totals(entry.buy, &spot, entry.creative);

        if let Some(auction_spot) = self.data.auction_spots.get_mut(&entry.spot) {
            auction_spot.winner = Some(id);
            for other in auction_spot.bidders.clone() {
                if other != id && self.data.arena.get(other).is_in_play() {
                    self.data.arena.get_mut(other).status = BidStatus::LostToHigherBid;
                }
            }
            let auction_spot = &self.data.auction_spots[&entry.spot];
            if let Some(SegmentSetId(segment)) = auction_spot.segment {
                // nobody else competes for a preassigned family
                let set = &mut self.data.segments[segment];
                set.resolved = true;
                set.note(format!("preassigned winner on spot {}", entry.spot.0));
                if let Some(silo) = set.silo_of(&spot) {
                    let seconds = spot.length.seconds();
                    set.record_win(silo, seconds);
                }
            }
        }
        PreassignedState::Applied
    }

    /// Locates the bid a preassigned winner maps onto: same avail, same
    /// buy. Returns `None` when the avail is missing from the pool or no
    /// bid pairs the buy with it.
    pub(crate) fn find_preassigned(&self, entry: &PreassignedWinner) -> Option<BidId> {
        let auction_spot = self.data.auction_spots.get(&entry.spot)?;
        auction_spot
            .bidders
            .iter()
            .copied()
            .find(|&id| self.data.arena.get(id).buy == entry.buy)
    }
}
