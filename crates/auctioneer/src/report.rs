//! Plain-text diagnostics over a run's outcome. Reporting only: nothing
//! here feeds back into the algorithm, and the underlying data stays
//! queryable through the outcome itself.

use {
    crate::domain::auctioneer::AuctionOutcome,
    itertools::Itertools,
    std::fmt::Write,
};

/// One line per bid: the full audit trail of who won and why everyone else
/// lost.
pub fn bid_detail_report(outcome: &AuctionOutcome) -> String {
    let mut out = String::new();
    writeln!(out, "auction bids ({:?} run)", outcome.kind).ok();
    for bid in outcome
        .bids
        .iter()
        .sorted_by_key(|bid| (bid.spot, bid.buy))
    {
        writeln!(
            out,
            "  spot {:>6}  buy {:>6}  rank {:>8}  cpm {:>10}  cost {:>12}  {}",
            bid.spot.0,
            bid.buy.0,
            bid.rank,
            bid.cpm.to_string(),
            bid.cost.to_string(),
            bid.status.name(),
        )
        .ok();
    }
    out
}

/// Aggregate statistics: totals and the per-status tally.
pub fn statistics_report(outcome: &AuctionOutcome) -> String {
    let mut out = String::new();
    writeln!(out, "winners:          {}", outcome.winners.len()).ok();
    writeln!(out, "total cost:       {}", outcome.total_cost).ok();
    writeln!(out, "total views:      {}", outcome.total_impressions).ok();
    writeln!(out, "overall cpm:      {}", outcome.cpm).ok();
    writeln!(out, "efficiency:       {:.2}", outcome.efficiency).ok();
    if outcome.consistency_violations > 0 {
        writeln!(
            out,
            "consistency violations: {}",
            outcome.consistency_violations
        )
        .ok();
    }
    writeln!(out, "by status:").ok();
    for (status, count) in &outcome.status_tally {
        writeln!(out, "  {status:<28} {count}").ok();
    }
    out
}
