//! The per-pass CPM assignment sub-pass: prices every contested avail's
//! bidders and filters out the ones that cannot pay.

use {
    super::Run,
    crate::{
        domain::{
            AuctionKind,
            bid::{BidId, BidStatus},
            pass::AuctionPass,
            ranking,
        },
        infra::BudgetBook,
    },
    money::Money,
};

impl<B: BudgetBook> Run<'_, B> {
    /// Step 3b. For every winnerless avail with at least one viewer, walk
    /// its bidders in ascending rank order and assign each an actual CPM:
    /// pricing-override flags first, otherwise the previous bidder's CPM
    /// plus the win margin, never below the pass-adjusted floor. Candidates
    /// failing the CPM threshold, the efficiency threshold or creative
    /// pruning take their precise losing status here.
    pub(crate) fn assign_cpms(&mut self, pass: &AuctionPass) {
        let spot_ids: Vec<_> = self.data.auction_spots.keys().copied().collect();
        for spot_id in spot_ids {
            let auction_spot = &self.data.auction_spots[&spot_id];
            if auction_spot.winner.is_some() {
                continue;
            }
            let bidders = auction_spot.bidders.clone();
            let spot = self.data.spots[&spot_id].clone();

            if spot.audience == 0 {
                // nobody can buy views that don't exist
                for id in bidders {
                    let bid = self.data.arena.get_mut(id);
                    if bid.is_in_play() {
                        bid.status = BidStatus::NoViewers;
                        bid.seen = true;
                    }
                }
                continue;
            }

            let mut contenders: Vec<BidId> = bidders
                .into_iter()
                .filter(|&id| {
                    let bid = self.data.arena.get(id);
                    bid.is_in_play() && bid.qualified
                })
                .collect();
            // ascending: the weakest bidder prices first
            contenders.sort_by(|&a, &b| {
                ranking::compare(self.data.arena.get(b), self.data.arena.get(a))
            });

            let floor = spot
                .policy_price
                .percent_of(pass.price_adjustment.markup())
                .per_mille(spot.audience);
            let sole_bidder = contenders.len() == 1;
            let mut previous_cpm: Option<Money> = None;

            for id in contenders {
                let (buy_id, rank) = {
                    let bid = self.data.arena.get(id);
                    (bid.buy, bid.rank)
                };
                self.data.arena.get_mut(id).seen = true;
                let Some(buy) = self.data.buys.get(&buy_id) else {
                    self.data.arena.get_mut(id).status = BidStatus::NotInProgram;
                    continue;
                };

                let mut cpm = if buy.pays_minimum_rate {
                    floor
                } else if buy.pays_adjusted_rate
                    && let Some(adjusted) = buy.adjusted_cpm
                {
                    adjusted
                } else {
                    match previous_cpm {
                        Some(previous) => previous + self.data.settings.win_margin,
                        None => floor,
                    }
                };
                if cpm < floor {
                    cpm = floor;
                }

                if buy.cpm_limit < cpm {
                    // a sole bidder on a rate-card-eligible avail is offered
                    // the discounted floor before being turned away
                    let discount = self.data.settings.rate_card_discount;
                    let discounted = (sole_bidder
                        && spot.rate_card_eligible
                        && !discount.is_zero())
                    .then(|| floor.percent_of(discount.discount()));
                    match discounted {
                        Some(discounted) if buy.cpm_limit >= discounted => cpm = discounted,
                        _ => {
                            self.data.arena.get_mut(id).status = BidStatus::CpmExceeded;
                            continue;
                        }
                    }
                }

                let cost = cpm.times_mille(spot.audience);
                if !cost.is_zero() {
                    let efficiency = spot.audience as f64 / cost.as_major_f64();
                    if efficiency < buy.min_efficiency {
                        self.data.arena.get_mut(id).status =
                            BidStatus::EfficiencyBelowThreshold;
                        continue;
                    }
                }

                // creative pruning: only copies of the right duration, and
                // approved propagated copies unless this is a simulated run
                // pricing the client's own buy
                let relaxed = self.kind == AuctionKind::Simulated && buy_id == self.client_buy;
                let eligible: Vec<_> = buy
                    .creatives
                    .iter()
                    .filter(|creative| {
                        creative.length == spot.length
                            && (relaxed
                                || (creative.approved
                                    && creative.propagated_spots.contains(&spot.id)))
                    })
                    .map(|creative| creative.id)
                    .collect();
                if eligible.is_empty() {
                    self.data.arena.get_mut(id).status = BidStatus::NoEligibleCreative;
                    continue;
                }

                let bid = self.data.arena.get_mut(id);
                bid.eligible_creatives = eligible;
                bid.assigned_cpm = cpm;
                bid.auction_cost = cost;
                previous_cpm = Some(cpm);
                tracing::trace!(bid = id.0, spot = spot_id.0, %cpm, rank, "cpm assigned");
            }
        }
    }
}
