//! Mirrored-avail resolution: a pair of avails that must be won together by
//! the same buy, airing the same creative.

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

/// Resolves a winning candidate whose avail is mirrored. The candidate's
/// budget effect is applied provisionally, the partner is re-judged with the
/// candidate's creative forced, and the provisional effect is unrolled
/// unconditionally before anything commits. The rollback is idempotent, so
/// a partner failure that already cleaned up is fine.
pub(crate) fn resolve<B: BudgetBook>(run: &mut Run<'_, B>, id: BidId) {
    let Some(partner) = run.data.arena.get(id).mirror_partner else {
        // the paired avail has no bid from this buy to pair with
        run.mark_lost(id, BidStatus::MirrorOrphaned);
        return;
    };
    if !run.data.arena.get(partner).is_in_play() {
        run.mark_lost(id, BidStatus::MirrorPartnerLost);
        return;
    }

    if !run.begin_scope() {
        run.reporter
            .report("provisional nesting limit reached in mirror resolution", Some(id));
        run.mark_lost(id, BidStatus::MirrorPartnerLost);
        return;
    }
    let both_win = run.provisional_win(id, true);
    run.rollback_provisional(id);
    run.end_scope("mirror resolution");

    if both_win {
        run.commit_with_mirror(id, WinType::Normal);
    }
}
