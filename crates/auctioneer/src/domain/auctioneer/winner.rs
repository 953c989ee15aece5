//! The winnability chain and the provisional/committed win accounting.
//!
//! `can_be_winner` is a pure chain of checks: participation, the adjacency
//! family, budget limits, product attributes (which prune creatives as their
//! one sanctioned side effect) and creative rotation. A failure reports the
//! precise losing status and leaves shared state untouched, so re-running
//! the chain on unchanged budget state reproduces the same answer.

use {
    super::{AuctionData, Run},
    crate::{
        domain::{
            bid::{BidId, BidStatus, WinType},
            buy::CreativeId,
            segments::AuctionHooks,
        },
        infra::BudgetBook,
    },
    std::cmp::Ordering,
};

impl<B: BudgetBook> Run<'_, B> {
    /// Runs the full chain. Returns the creative the bid would air, or the
    /// precise status it would lose with. Does not change the bid's status.
    pub(crate) fn can_be_winner(
        &mut self,
        id: BidId,
        forced_creative: Option<CreativeId>,
    ) -> Result<CreativeId, BidStatus> {
        let Run { data, budget, creative_wins, .. } = self;
        let AuctionData { arena, buys, spots, auction_spots, .. } = &mut **data;

        let (buy_id, spot_id, cost) = {
            let bid = arena.get(id);
            (bid.buy, bid.spot, bid.auction_cost)
        };
        let Some(buy) = buys.get(&buy_id) else {
            return Err(BidStatus::NotInProgram);
        };
        let Some(spot) = spots.get(&spot_id) else {
            return Err(BidStatus::NotInProgram);
        };
        if auction_spots
            .get(&spot_id)
            .is_some_and(|s| s.winner.is_some())
        {
            return Err(BidStatus::LostToHigherBid);
        }
        if !budget.auto_adjacency_passes(buy, spot) {
            return Err(BidStatus::AutoAdjacencyFailed);
        }
        if !budget.advertiser_adjacency_passes(buy, spot) {
            return Err(BidStatus::AdvertiserAdjacencyFailed);
        }
        if !budget.proximity_restriction_passes(buy, spot) {
            return Err(BidStatus::ProximityRestricted);
        }
        if !budget.budget_limits_pass(buy, spot, cost) {
            return Err(BidStatus::BudgetExceeded);
        }

        let mut creatives = arena.get(id).eligible_creatives.clone();
        let passed = budget.product_attributes_pass(buy, spot, &mut creatives);
        arena.get_mut(id).eligible_creatives = creatives.clone();
        if !passed {
            return Err(BidStatus::ProductAdjacencyFailed);
        }

        match forced_creative {
            Some(creative) => {
                if creatives.contains(&creative) {
                    Ok(creative)
                } else {
                    Err(BidStatus::CreativeRejected)
                }
            }
            None => creatives
                .iter()
                .min_by_key(|&&c| (creative_wins.get(&(buy_id, c)).copied().unwrap_or(0), c))
                .copied()
                .ok_or(BidStatus::NoEligibleCreative),
        }
    }

    /// Applies the bid's budget and content effect provisionally. Double
    /// application is a consistency violation and is refused.
    pub(crate) fn apply_provisional(&mut self, id: BidId) {
        let Run { data, budget, journal, reporter, .. } = self;
        let AuctionData { arena, spots, .. } = &mut **data;
        let bid = arena.get_mut(id);
        if bid.conditional_totals || !journal.note_apply(id) {
            reporter.report("conditional totals applied twice without unroll", Some(id));
            return;
        }
        bid.conditional_totals = true;
        let (buy, cost, creative) = (bid.buy, bid.auction_cost, bid.selected_creative);
        let spot = &spots[&bid.spot];
        budget.add_winner_budget_totals(buy, spot, cost);
        if let Some(creative) = creative {
            budget.add_winner_content_totals(buy, spot, creative);
        }
    }

    /// Reverses a provisional application. Unrolling a bid that never had
    /// totals applied is a consistency violation.
    pub(crate) fn unroll_provisional_strict(&mut self, id: BidId) {
        if !self.data.arena.get(id).conditional_totals {
            self.reporter
                .report("unroll of a bid without conditional totals", Some(id));
            return;
        }
        self.unroll_inner(id);
    }

    /// Idempotent rollback: a no-op when the bid carries no provisional
    /// totals. The mirror path unrolls unconditionally regardless of the
    /// partner outcome, which may already have cleaned up.
    pub(crate) fn rollback_provisional(&mut self, id: BidId) {
        if self.data.arena.get(id).conditional_totals {
            self.unroll_inner(id);
        }
    }

    fn unroll_inner(&mut self, id: BidId) {
        let Run { data, budget, journal, reporter, .. } = self;
        let AuctionData { arena, spots, .. } = &mut **data;
        if !journal.note_unroll(id) {
            reporter.report("journal lost track of an applied bid", Some(id));
        }
        let bid = arena.get_mut(id);
        bid.conditional_totals = false;
        let (buy, cost, creative) = (bid.buy, bid.auction_cost, bid.selected_creative);
        let spot = &spots[&bid.spot];
        budget.unroll_winner_budget_totals(buy, spot, cost);
        if let Some(creative) = creative {
            budget.unroll_winner_content_totals(buy, spot, creative);
        }
    }

    /// Winnability plus provisional application, mirror partner included.
    /// When `mark` is set a failure records the losing status (the combo
    /// search wants failed members out of play); otherwise the bid is left
    /// untouched (the bundling scan merely skips unusable helpers).
    pub(crate) fn provisional_win(&mut self, id: BidId, mark: bool) -> bool {
        let creative = match self.can_be_winner(id, None) {
            Ok(creative) => creative,
            Err(status) => {
                if mark {
                    self.mark_lost(id, status);
                }
                return false;
            }
        };
        self.data.arena.get_mut(id).selected_creative = Some(creative);

        if let Some(partner) = self.data.arena.get(id).mirror_partner {
            if !self.data.arena.get(partner).is_in_play() {
                if mark {
                    self.mark_lost(id, BidStatus::MirrorPartnerLost);
                }
                return false;
            }
            // the partner must air the same creative, judged with the
            // candidate's effect applied
            self.apply_provisional(id);
            match self.can_be_winner(partner, Some(creative)) {
                Ok(_) => {
                    self.data.arena.get_mut(partner).selected_creative = Some(creative);
                    true
                }
                Err(status) => {
                    self.rollback_provisional(id);
                    if mark {
                        self.mark_lost(partner, status);
                        self.mark_lost(id, BidStatus::MirrorPartnerLost);
                    }
                    false
                }
            }
        } else if self.spot_of(id).is_mirrored() {
            // the paired avail exists but carries no bid from this buy
            if mark {
                self.mark_lost(id, BidStatus::MirrorOrphaned);
            }
            false
        } else {
            self.apply_provisional(id);
            true
        }
    }

    /// Commits one bid as a winner: terminal status, avail ownership,
    /// permanent budget totals, rotation bookkeeping and the lost-out
    /// cascade for the avail's other bidders.
    pub(crate) fn commit_single(&mut self, id: BidId, win: WinType) {
        if self.data.arena.get(id).conditional_totals {
            // a winner must never carry provisional totals into its
            // terminal state
            self.reporter
                .report("winner committed while conditional totals applied", Some(id));
            self.unroll_inner(id);
        }
        let Run { data, budget, creative_wins, .. } = self;
        let AuctionData { arena, spots, auction_spots, .. } = &mut **data;
        let bid = arena.get_mut(id);
        bid.status = BidStatus::Winner;
        bid.win_type = Some(win);
        let (buy, spot_id, cost, creative) =
            (bid.buy, bid.spot, bid.auction_cost, bid.selected_creative);
        let spot = &spots[&spot_id];
        budget.add_winner_budget_totals(buy, spot, cost);
        if let Some(creative) = creative {
            budget.add_winner_content_totals(buy, spot, creative);
            *creative_wins.entry((buy, creative)).or_insert(0) += 1;
        }
        tracing::debug!(bid = id.0, spot = spot_id.0, buy = buy.0, ?win, "bid won");

        let Some(auction_spot) = auction_spots.get_mut(&spot_id) else {
            return;
        };
        auction_spot.winner = Some(id);
        if auction_spot.segment.is_none() {
            // segment families cascade their own losses; bids whose priority
            // sat this pass out keep their never-participated audit trail
            for other in auction_spot.bidders.clone() {
                let rival = arena.get(other);
                if other != id && rival.is_in_play() && rival.qualified {
                    arena.get_mut(other).status = BidStatus::LostToHigherBid;
                }
            }
        }
    }

    /// Commits the bid and, when it is mirrored, its partner with the same
    /// creative. The two sides win together or not at all.
    pub(crate) fn commit_with_mirror(&mut self, id: BidId, win: WinType) {
        match self.data.arena.get(id).mirror_partner {
            Some(partner) => {
                if !self.data.arena.get(partner).is_in_play() {
                    self.reporter.report(
                        "mirror partner fell out of play between verification and commit",
                        Some(partner),
                    );
                    self.mark_lost(id, BidStatus::MirrorPartnerLost);
                    return;
                }
                let creative = self.data.arena.get(id).selected_creative;
                self.data.arena.get_mut(partner).selected_creative = creative;
                self.commit_single(id, win);
                self.commit_single(partner, WinType::MirrorPartner);
            }
            None => self.commit_single(id, win),
        }
    }

    pub(crate) fn mark_lost(&mut self, id: BidId, status: BidStatus) {
        let bid = self.data.arena.get_mut(id);
        if bid.conditional_totals {
            self.reporter
                .report("bid reached a terminal loss with conditional totals", Some(id));
            self.unroll_inner(id);
        }
        let bid = self.data.arena.get_mut(id);
        bid.status = status;
        tracing::trace!(bid = id.0, ?status, "bid lost");
    }
}

/// The segment subsystem drives its resolution through these callbacks; the
/// journal and reporter stay owned by the run.
impl<B: BudgetBook> AuctionHooks for Run<'_, B> {
    fn is_in_play(&self, bid: BidId) -> bool {
        let bid = self.data.arena.get(bid);
        bid.is_in_play() && bid.qualified
    }

    fn rank_of(&self, bid: BidId) -> i64 {
        self.data.arena.get(bid).rank
    }

    fn cost_of(&self, bid: BidId) -> money::Money {
        self.data.arena.get(bid).auction_cost
    }

    fn seconds_of(&self, bid: BidId) -> u32 {
        self.spot_of(bid).length.seconds()
    }

    fn compare_bids(&self, a: BidId, b: BidId) -> Ordering {
        crate::domain::ranking::compare(self.data.arena.get(a), self.data.arena.get(b))
    }

    fn try_provisional_win(&mut self, bid: BidId) -> bool {
        self.provisional_win(bid, true)
    }

    fn unroll_provisional(&mut self, bid: BidId) {
        self.unroll_provisional_strict(bid);
    }

    fn commit_winner(&mut self, bid: BidId, win: WinType) {
        self.commit_with_mirror(bid, win);
    }

    fn mark_lost(&mut self, bid: BidId, status: BidStatus) {
        Run::mark_lost(self, bid, status);
    }

    fn begin_scope(&mut self) -> bool {
        self.journal.enter_scope()
    }

    fn end_scope(&mut self, context: &str) {
        for leaked in self.journal.exit_scope() {
            self.reporter.report(context, Some(leaked));
            // the journal already dropped the entry; clear the flag and
            // reverse the budget effect directly
            if self.data.arena.get(leaked).conditional_totals {
                let Run { data, budget, .. } = self;
                let bid = data.arena.get_mut(leaked);
                bid.conditional_totals = false;
                let (buy, cost, creative) = (bid.buy, bid.auction_cost, bid.selected_creative);
                let spot = &data.spots[&bid.spot];
                budget.unroll_winner_budget_totals(buy, spot, cost);
                if let Some(creative) = creative {
                    budget.unroll_winner_content_totals(buy, spot, creative);
                }
            }
        }
    }

    fn report_consistency(&mut self, context: &str, bid: Option<BidId>) {
        self.reporter.report(context, bid);
    }
}
