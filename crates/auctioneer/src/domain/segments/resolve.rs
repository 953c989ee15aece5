//! Resolution of segmented avails: find the highest-value composite of
//! in-play bids that can jointly win the family, or fill it greedily at the
//! end of a pass where the owner allows partial sales.

use {
    super::{
        AuctionHooks, SegmentSet, WinAlgorithm,
        combo::{Combo, ComboShape},
    },
    crate::domain::bid::{BidId, BidStatus, WinType},
};

/// Outcome of one linchpin resolution attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SegmentOutcome {
    /// A composite containing the linchpin won; the whole family is sold.
    Won,
    /// The best composite is valid but belongs to other bids; nothing was
    /// marked, the linchpin simply doesn't own the family.
    OwnedByOther,
    /// No composite could win.
    NoCombo,
}

/// Resolves a segment family for one individually-winnable candidate bid.
pub fn resolve_with_linchpin(
    set: &mut SegmentSet,
    linchpin: BidId,
    hooks: &mut impl AuctionHooks,
    algorithm: WinAlgorithm,
) -> SegmentOutcome {
    if set.resolved {
        return SegmentOutcome::NoCombo;
    }
    if set.has_winner() && algorithm != WinAlgorithm::SimplePartial {
        // a partially sold family never completes through the combo search;
        // only the end-of-pass fill (or further simple partial wins) may add
        // to it
        return SegmentOutcome::NoCombo;
    }
    match algorithm {
        WinAlgorithm::Complex => combinatorial(set, linchpin, hooks, false),
        WinAlgorithm::TopRankedOnly => combinatorial(set, linchpin, hooks, true),
        WinAlgorithm::LinchpinSiloOnly => linchpin_silo_only(set, linchpin, hooks),
        WinAlgorithm::SimplePartial => simple_partial(set, linchpin, hooks),
    }
}

/// The default full search. Builds every legal combo for the linchpin,
/// repeatedly evaluates the best-ranked one and, on failure, swaps only the
/// losing member for the next bid of its silo.
fn combinatorial(
    set: &mut SegmentSet,
    linchpin: BidId,
    hooks: &mut impl AuctionHooks,
    single_attempt: bool,
) -> SegmentOutcome {
    let shapes = ComboShape::shapes_for(set.root_length);
    run_combo_loop(set, linchpin, hooks, shapes, single_attempt)
}

/// Reduced search: only combos containing the linchpin's own silo.
fn linchpin_silo_only(
    set: &mut SegmentSet,
    linchpin: BidId,
    hooks: &mut impl AuctionHooks,
) -> SegmentOutcome {
    let Some(silo) = set.silo_containing(linchpin) else {
        hooks.report_consistency("linchpin not present in any silo", Some(linchpin));
        return SegmentOutcome::NoCombo;
    };
    let shapes: Vec<ComboShape> = ComboShape::shapes_for(set.root_length)
        .iter()
        .copied()
        .filter(|shape| shape.required_silos().contains(&silo))
        .collect();
    run_combo_loop(set, linchpin, hooks, &shapes, false)
}

/// Non-combinatorial variant: the linchpin alone takes its slice of the
/// family when the owner sells partially.
fn simple_partial(
    set: &mut SegmentSet,
    linchpin: BidId,
    hooks: &mut impl AuctionHooks,
) -> SegmentOutcome {
    if !set.partial_sales_allowed {
        return SegmentOutcome::NoCombo;
    }
    let Some(silo) = set.silo_containing(linchpin) else {
        hooks.report_consistency("linchpin not present in any silo", Some(linchpin));
        return SegmentOutcome::NoCombo;
    };
    if !set.fits(silo) {
        return SegmentOutcome::NoCombo;
    }
    if !hooks.try_provisional_win(linchpin) {
        return SegmentOutcome::NoCombo;
    }
    hooks.unroll_provisional(linchpin);
    hooks.commit_winner(linchpin, WinType::Normal);
    let seconds = hooks.seconds_of(linchpin);
    set.record_win(silo, seconds);
    set.note(format!("partial win: bid {} took {seconds}s", linchpin.0));
    if set.resolved {
        cascade_losses(set, hooks);
    }
    SegmentOutcome::Won
}

fn run_combo_loop(
    set: &mut SegmentSet,
    linchpin: BidId,
    hooks: &mut impl AuctionHooks,
    shapes: &[ComboShape],
    single_attempt: bool,
) -> SegmentOutcome {
    let mut combos: Vec<Combo> = shapes
        .iter()
        .filter_map(|&shape| Combo::build(shape, Some(linchpin), set, hooks))
        .collect();
    if combos.is_empty() {
        set.note(format!("no viable combo for bid {}", linchpin.0));
        return SegmentOutcome::NoCombo;
    }

    loop {
        // best summed rank first, summed cost breaking ties
        let Some(best) = combos
            .iter()
            .enumerate()
            .max_by_key(|(_, combo)| (combo.summed_rank(hooks), combo.summed_cost(hooks)))
            .map(|(index, _)| index)
        else {
            return SegmentOutcome::NoCombo;
        };

        match evaluate(&combos[best], linchpin, hooks) {
            Evaluation::AllWin => {
                let combo = combos.swap_remove(best);
                if !combo.contains(linchpin) {
                    // another candidate owns the top combo; this one fails
                    // without marking anything
                    set.note(format!(
                        "top combo excludes bid {}; left for its owner",
                        linchpin.0
                    ));
                    return SegmentOutcome::OwnedByOther;
                }
                for &member in combo.members() {
                    hooks.commit_winner(member, WinType::Normal);
                    let silo = set
                        .silo_containing(member)
                        .expect("combo members come from this set's silos");
                    set.record_win(silo, hooks.seconds_of(member));
                }
                set.note(format!(
                    "combo won: {:?} ({} members)",
                    combo.shape,
                    combo.members().len()
                ));
                cascade_losses(set, hooks);
                return SegmentOutcome::Won;
            }
            Evaluation::Declined => return SegmentOutcome::NoCombo,
            Evaluation::MemberLost(failing) => {
                set.note(format!("bid {} cannot win; substituting", failing.0));
                if single_attempt {
                    return SegmentOutcome::NoCombo;
                }
                if !combos[best].replace_member(failing, set, hooks, Some(linchpin)) {
                    combos.swap_remove(best);
                }
                // other combos may also hold the failed bid
                combos.retain_mut(|combo| combo.revalidate(set, hooks, Some(linchpin)));
                if combos.is_empty() {
                    set.note(format!("combos exhausted for bid {}", linchpin.0));
                    return SegmentOutcome::NoCombo;
                }
            }
        }
    }
}

enum Evaluation {
    AllWin,
    /// This member failed its winnability chain (its status is already set).
    MemberLost(BidId),
    /// The provisional nesting limit was hit; resolution gives up.
    Declined,
}

/// Walks the combo's bids linchpin-first, provisionally committing each;
/// aborts at the first member that cannot win. Every provisional effect is
/// unrolled before returning, success included: the caller commits winners
/// through the normal path.
fn evaluate(combo: &Combo, linchpin: BidId, hooks: &mut impl AuctionHooks) -> Evaluation {
    if !hooks.begin_scope() {
        hooks.report_consistency("provisional nesting limit reached in combo evaluation", None);
        return Evaluation::Declined;
    }
    let order = combo.evaluation_order(Some(linchpin));
    let mut applied = Vec::with_capacity(order.len());
    let mut failed = None;
    for bid in order {
        if !hooks.is_in_play(bid) || !hooks.try_provisional_win(bid) {
            failed = Some(bid);
            break;
        }
        applied.push(bid);
    }
    for &bid in applied.iter().rev() {
        hooks.unroll_provisional(bid);
    }
    hooks.end_scope("combo evaluation");
    match failed {
        Some(bid) => Evaluation::MemberLost(bid),
        None => Evaluation::AllWin,
    }
}

/// Every other bid of a sold family lost to the composite.
fn cascade_losses(set: &SegmentSet, hooks: &mut impl AuctionHooks) {
    for bid in set.all_bids() {
        if hooks.is_in_play(bid) {
            hooks.mark_lost(bid, BidStatus::HasSegmentedWinner);
        }
    }
}

/// End-of-pass last resort: greedily award any individually winnable bid of
/// an unresolved family, best-ranked first, until the root duration is
/// filled or the list is exhausted. Only runs where the owner sells
/// partially.
pub fn partial_fill(set: &mut SegmentSet, hooks: &mut impl AuctionHooks) {
    if set.resolved || !set.partial_sales_allowed {
        return;
    }
    let mut candidates: Vec<BidId> = set.all_bids().filter(|&bid| hooks.is_in_play(bid)).collect();
    candidates.sort_by(|&a, &b| hooks.compare_bids(a, b));

    for bid in candidates {
        if set.resolved {
            break;
        }
        let Some(silo) = set.silo_containing(bid) else {
            continue;
        };
        if !set.fits(silo) || !hooks.is_in_play(bid) {
            continue;
        }
        if !hooks.try_provisional_win(bid) {
            continue;
        }
        hooks.unroll_provisional(bid);
        hooks.commit_winner(bid, WinType::Normal);
        let seconds = hooks.seconds_of(bid);
        set.record_win(silo, seconds);
        set.note(format!("last-resort win: bid {} took {seconds}s", bid.0));
    }
    if set.won_seconds > set.root_length.seconds() {
        hooks.report_consistency("segment won duration exceeds root duration", None);
    }
}
