//! Channel-bundling resolution: a buy that requires wins on a minimum
//! number of distinct channels per inventory owner before any single win
//! unlocks.

use {
    super::Run,
    crate::{
        domain::{
            bid::{BidId, BidStatus, WinType},
            segments::AuctionHooks,
        },
        infra::BudgetBook,
    },
};

/// Tries to unlock a winning candidate by provisionally committing it and
/// searching forward in the same globally-ranked list for enough same-buy
/// wins on further distinct channels. Every provisional commit made during
/// the search is unrolled unconditionally; only a fully met requirement
/// commits anything, and then commits everything found.
pub(crate) fn resolve<B: BudgetBook>(
    run: &mut Run<'_, B>,
    id: BidId,
    ranked: &[BidId],
    index: usize,
) {
    let (buy, owner, channel) = {
        let bid = run.data.arena.get(id);
        let spot = &run.data.spots[&bid.spot];
        (bid.buy, spot.owner, spot.channel)
    };
    let required = run
        .data
        .buys
        .get(&buy)
        .and_then(|buy| buy.min_channels_per_owner)
        .unwrap_or(0) as usize;

    if !run.begin_scope() {
        run.reporter
            .report("provisional nesting limit reached in bundling resolution", Some(id));
        run.mark_lost(id, BidStatus::ChannelBundlingReqNotMet);
        return;
    }

    let mut used = run.channels_won(buy, owner);
    let mut found: Vec<BidId> = Vec::new();

    // the candidate itself is the first provisional commit
    if !run.provisional_win(id, true) {
        run.end_scope("channel bundling");
        return;
    }
    found.push(id);
    used.insert(channel);

    let mut scan = index + 1;
    while used.len() < required && scan < ranked.len() {
        let other = ranked[scan];
        scan += 1;
        let eligible = {
            let bid = run.data.arena.get(other);
            if !bid.is_in_play() || !bid.qualified || bid.buy != buy {
                false
            } else {
                let spot = &run.data.spots[&bid.spot];
                let open = run
                    .data
                    .auction_spots
                    .get(&bid.spot)
                    .is_some_and(|s| s.winner.is_none() && s.segment.is_none());
                open && spot.owner == owner
                    && !used.contains(&spot.channel)
                    && !bid.auction_cost.is_zero()
            }
        };
        if !eligible {
            continue;
        }
        // the helper is probed, not judged: a failure here must not mark it
        if run.provisional_win(other, false) {
            let channel = run.data.spots[&run.data.arena.get(other).spot].channel;
            used.insert(channel);
            found.push(other);
        }
    }

    // unconditionally unroll everything the search committed
    for &bid in found.iter().rev() {
        run.rollback_provisional(bid);
    }
    run.end_scope("channel bundling");

    if used.len() >= required {
        run.commit_with_mirror(id, WinType::Normal);
        for &helper in &found[1..] {
            run.commit_with_mirror(helper, WinType::BundlingRequirement);
        }
    } else {
        run.mark_lost(id, BidStatus::ChannelBundlingReqNotMet);
        tracing::debug!(
            bid = id.0,
            have = used.len(),
            required,
            "channel bundling requirement not met"
        );
    }
}
