//! The auctioneer: builds the per-run auction objects from the pool and
//! client, then drives the multi-pass auction to a winner assignment.
//!
//! A run is a synchronous, single-threaded pure function of
//! (pool, client, settings): there is no parallelism inside a run, no
//! cancellation, and no state that survives a rebuild except the last
//! result snapshot. Replacing the auctioneer instance is the serialization
//! point for whole-grid recalculation.

mod build;
mod bundling;
mod cpm;
mod mirror;
mod outcome;
pub mod preassigned;
mod winner;

pub use outcome::{AuctionOutcome, BidRecord, WinnerRecord};

use {
    crate::{
        domain::{
            AuctionKind, DateRange,
            bid::{BidArena, BidId, BidStatus},
            buy::{BuyId, CampaignBuy, CreativeId},
            journal::{ConsistencyReporter, Journal},
            pass::AuctionPass,
            ranking,
            segments::{SegmentSet, SegmentSetId, resolve},
            spot::{Spot, SpotId},
        },
        infra::{AuctionClient, AuctionConfig, AuctionPool, AuctionSettings, BudgetBook},
    },
    chrono::NaiveDate,
    indexmap::IndexMap,
    itertools::Itertools,
    preassigned::PreassignedWinner,
    std::{
        collections::{BTreeMap, HashMap},
        sync::atomic::{AtomicBool, Ordering},
    },
};

/// Caller-misuse failures. Everything that can go wrong *inside* a healthy
/// run is a bid status or a logged consistency violation, never an error.
#[derive(Debug, thiserror::Error)]
pub enum AuctionError {
    /// A run is already in progress on this instance. Concurrent attempts
    /// are rejected, not queued; the caller decides whether to retry.
    #[error("an auction run is already in progress on this auctioneer")]
    RunInProgress,
    #[error("invalid auction date range: {end} ends before {start}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },
    #[error("the pool supplied no auction passes")]
    NoPasses,
}

/// The auction-time view of one avail: its bidders, its winner and, when
/// the avail is segmented, the segment family it belongs to.
#[derive(Debug)]
pub struct AuctionSpot {
    pub spot: SpotId,
    pub bidders: Vec<BidId>,
    pub winner: Option<BidId>,
    pub segment: Option<SegmentSetId>,
}

/// Everything `create_auction_objects` builds for one run. Discarded and
/// rebuilt on the next date-range or data refresh.
pub(crate) struct AuctionData {
    pub range: DateRange,
    pub settings: AuctionSettings,
    pub passes: Vec<AuctionPass>,
    pub spots: IndexMap<SpotId, Spot>,
    pub auction_spots: IndexMap<SpotId, AuctionSpot>,
    pub arena: BidArena,
    pub segments: Vec<SegmentSet>,
    pub buys: BTreeMap<BuyId, CampaignBuy>,
    pub preassigned: Vec<PreassignedWinner>,
}

pub struct Auctioneer<P, C, B> {
    pool: P,
    client: C,
    budget: B,
    config: AuctionConfig,
    running: AtomicBool,
    data: Option<AuctionData>,
    last: Option<AuctionOutcome>,
}

impl<P, C, B> Auctioneer<P, C, B>
where
    P: AuctionPool,
    C: AuctionClient,
    B: BudgetBook,
{
    pub fn new(pool: P, client: C, budget: B, config: AuctionConfig) -> Self {
        Self {
            pool,
            client,
            budget,
            config,
            running: AtomicBool::new(false),
            data: None,
            last: None,
        }
    }

    /// Runs the full multi-pass auction. Builds the auction objects first
    /// if no build happened yet.
    pub fn run_auction(&mut self, kind: AuctionKind) -> Result<&AuctionOutcome, AuctionError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(AuctionError::RunInProgress);
        }
        let result = self.run_auction_locked(kind);
        self.running.store(false, Ordering::Release);
        result?;
        Ok(self.last.as_ref().expect("run stored an outcome"))
    }

    fn run_auction_locked(&mut self, kind: AuctionKind) -> Result<(), AuctionError> {
        if self.data.is_none() {
            self.create_auction_objects()?;
        }
        let client_buy = self.client.ad_buy_id();
        let data = self.data.as_mut().expect("auction objects were built");
        let mut run = Run {
            kind,
            client_buy,
            data,
            budget: &mut self.budget,
            journal: Journal::new(self.config.max_provisional_depth),
            reporter: ConsistencyReporter::new(self.config.consistency_log_cap),
            creative_wins: HashMap::new(),
            config: &self.config,
        };
        run.reset();
        if kind == AuctionKind::Real {
            run.apply_preassigned();
        }
        run.run_passes();
        run.finish();
        let outcome = run.snapshot();
        tracing::info!(
            winners = outcome.winners.len(),
            cost = %outcome.total_cost,
            violations = outcome.consistency_violations,
            "auction run complete"
        );
        self.last = Some(outcome);
        Ok(())
    }

    pub fn last_auction_winners(&self) -> &[WinnerRecord] {
        self.last.as_ref().map(|o| o.winners.as_slice()).unwrap_or_default()
    }

    pub fn last_auction_bids(&self) -> &[BidRecord] {
        self.last.as_ref().map(|o| o.bids.as_slice()).unwrap_or_default()
    }

    pub fn last_auction_cost(&self) -> money::Money {
        self.last.as_ref().map(|o| o.total_cost).unwrap_or_default()
    }

    pub fn last_auction_cpm(&self) -> money::Money {
        self.last.as_ref().map(|o| o.cpm).unwrap_or_default()
    }

    pub fn last_auction_efficiency(&self) -> f64 {
        self.last.as_ref().map(|o| o.efficiency).unwrap_or_default()
    }

    pub fn last_auction_outcome(&self) -> Option<&AuctionOutcome> {
        self.last.as_ref()
    }

    /// The resolution decisions taken for one segment family in the last
    /// run, for diagnostics.
    pub fn segment_action_log(&self, root: SpotId) -> Option<&[String]> {
        self.data
            .as_ref()?
            .segments
            .iter()
            .find(|set| set.root_spot == root)
            .map(|set| set.action_log.as_slice())
    }
}

/// Mutable working state of one run in progress. Everything the winnability
/// chain, the mirror/bundling handlers and the segment subsystem touch goes
/// through this struct so the provisional accounting stays in one place.
pub(crate) struct Run<'a, B> {
    pub kind: AuctionKind,
    pub client_buy: BuyId,
    pub data: &'a mut AuctionData,
    pub budget: &'a mut B,
    pub journal: Journal,
    pub reporter: ConsistencyReporter,
    /// Wins per (buy, creative) this run; drives rotation selection.
    pub creative_wins: HashMap<(BuyId, CreativeId), u32>,
    pub config: &'a AuctionConfig,
}

impl<B: BudgetBook> Run<'_, B> {
    /// Step 1: every bid back in play (permanently disqualified ones
    /// excepted), all accumulators cleared.
    fn reset(&mut self) {
        let Run { data, budget, creative_wins, reporter, .. } = self;
        for id in data.arena.ids().collect_vec() {
            let eligible = data
                .buys
                .get(&data.arena.get(id).buy)
                .map(CampaignBuy::creative_ids)
                .unwrap_or_default();
            let bid = data.arena.get_mut(id);
            if bid.conditional_totals {
                reporter.report("bid carried conditional totals across runs", Some(id));
                bid.conditional_totals = false;
            }
            if bid.disqualified {
                continue;
            }
            bid.status = BidStatus::InPlay;
            bid.win_type = None;
            bid.assigned_cpm = money::Money::ZERO;
            bid.auction_cost = money::Money::ZERO;
            bid.selected_creative = None;
            bid.eligible_creatives = eligible;
            bid.seen = false;
            bid.qualified = false;
        }
        for auction_spot in data.auction_spots.values_mut() {
            auction_spot.winner = None;
        }
        for set in &mut data.segments {
            set.resolved = false;
            set.occupied = 0;
            set.won_seconds = 0;
            set.action_log.clear();
        }
        budget.init_budget(&data.buys, &data.range);
        budget.reset_run_values();
        creative_wins.clear();
    }

    /// Step 3: the pass loop.
    fn run_passes(&mut self) {
        let passes = self.data.passes.clone();
        for pass in &passes {
            let participating = !pass.is_empty()
                && self.data.buys.values().any(|buy| pass.admits(buy.priority));
            if !participating {
                tracing::debug!(pass = pass.number, "skipping pass without participants");
                continue;
            }
            tracing::debug!(pass = pass.number, "starting auction pass");
            self.requalify(pass);
            self.assign_cpms(pass);
            self.assign_winners();
            self.end_of_pass();
        }
    }

    /// Step 3a: bids on still-unsold avails eligible for this pass go back
    /// in play. Permanently disqualified bids, bids out of creatives and
    /// bids whose segment already found a winner stay untouched.
    fn requalify(&mut self, pass: &AuctionPass) {
        let Run { data, .. } = self;
        for id in data.arena.ids().collect_vec() {
            let bid = data.arena.get(id);
            if bid.disqualified || bid.is_winner() {
                continue;
            }
            let Some(buy) = data.buys.get(&bid.buy) else {
                continue;
            };
            let admitted = pass.admits(buy.priority);
            let spot_sold = data
                .auction_spots
                .get(&bid.spot)
                .is_none_or(|s| s.winner.is_some());
            let segment_sold = data
                .auction_spots
                .get(&bid.spot)
                .and_then(|s| s.segment)
                .map(|SegmentSetId(i)| {
                    let set = &data.segments[i];
                    set.resolved || set.has_winner()
                })
                .unwrap_or(false);
            let out_of_creatives = bid.eligible_creatives.is_empty();
            let bid = data.arena.get_mut(id);
            bid.qualified = admitted && !spot_sold && !segment_sold;
            if admitted && !spot_sold && !segment_sold && !out_of_creatives {
                bid.status = BidStatus::InPlay;
            }
        }
    }

    /// Step 3c: rank everything globally and walk the ranking. The global
    /// ordering, not avail-by-avail, is what fills a client's higher-value
    /// avails before its budget runs out on lower ones.
    fn assign_winners(&mut self) {
        let mut ranked: Vec<BidId> = self
            .data
            .arena
            .iter()
            .filter(|(_, bid)| bid.is_in_play() && bid.qualified)
            .map(|(id, _)| id)
            .collect();
        ranked.sort_by(|&a, &b| {
            ranking::compare(self.data.arena.get(a), self.data.arena.get(b))
        });

        for index in 0..ranked.len() {
            let id = ranked[index];
            let bid = self.data.arena.get(id);
            if bid.is_winner() || !bid.is_in_play() {
                continue;
            }
            self.data.arena.get_mut(id).seen = true;

            let creative = match self.can_be_winner(id, None) {
                Ok(creative) => creative,
                Err(status) => {
                    self.mark_lost(id, status);
                    continue;
                }
            };
            self.data.arena.get_mut(id).selected_creative = Some(creative);

            // exactly one of four mutually exclusive resolution paths
            if let Some(segment) = self.segment_of(id) {
                self.resolve_segment(segment, id);
            } else if self.needs_bundling(id) {
                bundling::resolve(self, id, &ranked, index);
            } else if self.data.arena.get(id).mirror_partner.is_some()
                || self.spot_of(id).is_mirrored()
            {
                mirror::resolve(self, id);
            } else {
                self.commit_with_mirror(id, crate::domain::bid::WinType::Normal);
            }
        }
    }

    /// Step 3d: last-resort partial resolution over unresolved segment
    /// families in day order, then residual marking for every family.
    fn end_of_pass(&mut self) {
        let order: Vec<usize> = (0..self.data.segments.len())
            .sorted_by_key(|&i| {
                let set = &self.data.segments[i];
                (set.day_index, set.root_spot)
            })
            .collect();
        for index in order {
            let mut set = std::mem::take(&mut self.data.segments[index]);
            resolve::partial_fill(&mut set, self);
            self.data.segments[index] = set;
        }

        for index in 0..self.data.segments.len() {
            let sold = {
                let set = &self.data.segments[index];
                set.resolved || set.has_winner()
            };
            let members: Vec<BidId> = self.data.segments[index].all_bids().collect();
            for id in members {
                let status = self.data.arena.get(id).status;
                if matches!(status, BidStatus::InPlay | BidStatus::NoSegmentComboFound) {
                    let outcome = if sold {
                        BidStatus::HasSegmentedWinner
                    } else {
                        BidStatus::NoSegmentComboFound
                    };
                    self.data.arena.get_mut(id).status = outcome;
                }
            }
        }
    }

    /// Steps 4 and 5 prep: residual statuses and invariant sweep.
    fn finish(&mut self) {
        let Run { data, budget, journal, reporter, .. } = self;
        for id in data.arena.ids().collect_vec() {
            let bid = data.arena.get(id);
            if bid.is_in_play() && !bid.seen {
                data.arena.get_mut(id).status = BidStatus::NeverParticipated;
                continue;
            }
            if bid.conditional_totals {
                reporter.report(
                    "bid finished the run with conditional totals applied",
                    Some(id),
                );
                let (buy, cost, creative) = {
                    let bid = data.arena.get(id);
                    (bid.buy, bid.auction_cost, bid.selected_creative)
                };
                if let Some(spot) = data.spots.get(&data.arena.get(id).spot) {
                    budget.unroll_winner_budget_totals(buy, spot, cost);
                    if let Some(creative) = creative {
                        budget.unroll_winner_content_totals(buy, spot, creative);
                    }
                }
                let _ = journal.note_unroll(id);
                data.arena.get_mut(id).conditional_totals = false;
            }
        }
        for set in &data.segments {
            if set.won_seconds > set.root_length.seconds() {
                reporter.report("segment won duration exceeds root duration", None);
            }
        }
    }

    fn resolve_segment(&mut self, segment: SegmentSetId, linchpin: BidId) {
        let algorithm = self.config.win_algorithm;
        let mut set = std::mem::take(&mut self.data.segments[segment.0]);
        let outcome = resolve::resolve_with_linchpin(&mut set, linchpin, self, algorithm);
        tracing::trace!(?outcome, root = set.root_spot.0, "segment resolution");
        self.data.segments[segment.0] = set;
    }

    fn needs_bundling(&self, id: BidId) -> bool {
        let bid = self.data.arena.get(id);
        let Some(buy) = self.data.buys.get(&bid.buy) else {
            return false;
        };
        let Some(required) = buy.min_channels_per_owner else {
            return false;
        };
        let owner = self.spot_of(id).owner;
        let have = self.channels_won(bid.buy, owner);
        have.len() < required as usize
    }

    pub(crate) fn spot_of(&self, id: BidId) -> &Spot {
        let spot = self.data.arena.get(id).spot;
        &self.data.spots[&spot]
    }

    pub(crate) fn segment_of(&self, id: BidId) -> Option<SegmentSetId> {
        let spot = self.data.arena.get(id).spot;
        self.data.auction_spots.get(&spot).and_then(|s| s.segment)
    }

    /// Channels this buy already won with this owner, committed wins of the
    /// current run included.
    pub(crate) fn channels_won(
        &self,
        buy: BuyId,
        owner: crate::domain::spot::OwnerId,
    ) -> std::collections::BTreeSet<crate::domain::spot::ChannelId> {
        let mut channels = self.budget.won_channels(buy, owner);
        for (_, bid) in self.data.arena.iter() {
            if bid.is_winner() && bid.buy == buy {
                let spot = &self.data.spots[&bid.spot];
                if spot.owner == owner {
                    channels.insert(spot.channel);
                }
            }
        }
        channels
    }
}
