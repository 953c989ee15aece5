//! The queryable result of a run: the winner set, the full bid audit trail
//! and the aggregate statistics. Snapshotted at the end of `run_auction`
//! and kept until the next run overwrites it.

use {
    super::{Run, preassigned::PreassignedWinner},
    crate::{
        domain::{
            AuctionKind,
            bid::{BidStatus, WinType},
            buy::{BuyId, CreativeId},
            spot::SpotId,
        },
        infra::BudgetBook,
    },
    money::Money,
    serde::Serialize,
    std::collections::BTreeMap,
};

#[derive(Clone, Debug, Serialize)]
pub struct WinnerRecord {
    pub buy: BuyId,
    pub spot: SpotId,
    pub creative: Option<CreativeId>,
    pub win_type: WinType,
    pub cpm: Money,
    pub cost: Money,
    pub impressions: u64,
    pub week_index: u32,
}

/// One line of the audit trail: every bid's final status and pricing.
#[derive(Clone, Debug, Serialize)]
pub struct BidRecord {
    pub buy: BuyId,
    pub spot: SpotId,
    pub status: BidStatus,
    pub win_type: Option<WinType>,
    pub rank: i64,
    pub cpm: Money,
    pub cost: Money,
}

#[derive(Clone, Debug, Serialize)]
pub struct AuctionOutcome {
    pub kind: AuctionKind,
    pub winners: Vec<WinnerRecord>,
    pub bids: Vec<BidRecord>,
    pub total_cost: Money,
    pub total_impressions: u64,
    /// Overall cost per thousand delivered views.
    pub cpm: Money,
    /// Delivered views per whole currency unit spent.
    pub efficiency: f64,
    pub status_tally: BTreeMap<&'static str, u32>,
    pub consistency_violations: u32,
    pub preassigned: Vec<PreassignedWinner>,
}

impl<B: BudgetBook> Run<'_, B> {
    /// Step 5: snapshot everything external callers may query.
    pub(crate) fn snapshot(&self) -> AuctionOutcome {
        let mut winners = Vec::new();
        let mut bids = Vec::new();
        let mut status_tally: BTreeMap<&'static str, u32> = BTreeMap::new();
        let mut total_cost = Money::ZERO;
        let mut total_impressions = 0u64;

        for (_, bid) in self.data.arena.iter() {
            *status_tally.entry(bid.status.name()).or_insert(0) += 1;
            bids.push(BidRecord {
                buy: bid.buy,
                spot: bid.spot,
                status: bid.status,
                win_type: bid.win_type,
                rank: bid.rank,
                cpm: bid.assigned_cpm,
                cost: bid.auction_cost,
            });
            if !bid.is_winner() {
                continue;
            }
            let impressions = self
                .data
                .spots
                .get(&bid.spot)
                .map(|spot| spot.audience)
                .unwrap_or(0);
            total_cost = total_cost.saturating_add(bid.auction_cost);
            total_impressions += impressions;
            winners.push(WinnerRecord {
                buy: bid.buy,
                spot: bid.spot,
                creative: bid.selected_creative,
                win_type: bid.win_type.unwrap_or(WinType::Normal),
                cpm: bid.assigned_cpm,
                cost: bid.auction_cost,
                impressions,
                week_index: bid.week_index,
            });
        }

        let efficiency = if total_cost.is_zero() {
            0.0
        } else {
            total_impressions as f64 / total_cost.as_major_f64()
        };
        AuctionOutcome {
            kind: self.kind,
            winners,
            bids,
            total_cost,
            total_impressions,
            cpm: total_cost.per_mille(total_impressions),
            efficiency,
            status_tally,
            consistency_violations: self.reporter.total(),
            preassigned: self.data.preassigned.clone(),
        }
    }
}
