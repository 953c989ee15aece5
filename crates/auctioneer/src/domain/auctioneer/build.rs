//! Building the per-run auction objects: spots, the bid arena, segment
//! families and mirror links. Everything here is discarded and rebuilt on
//! the next date-range or data refresh.

use {
    super::{AuctionData, AuctionError, AuctionSpot, Auctioneer},
    crate::{
        domain::{
            bid::{Bid, BidArena, BidId, BidStatus},
            buy::BuyId,
            ranking,
            segments::{SegmentSet, SegmentSetId},
            spot::SpotId,
        },
        infra::{AuctionClient, AuctionPool, BudgetBook},
    },
    indexmap::IndexMap,
    std::collections::HashMap,
};

impl<P, C, B> Auctioneer<P, C, B>
where
    P: AuctionPool,
    C: AuctionClient,
    B: BudgetBook,
{
    /// Builds the auction objects for the client's current date range.
    /// Fails fast on caller misuse (inverted date range, empty pass list);
    /// defective individual pairings are disqualified, not errors.
    pub fn create_auction_objects(&mut self) -> Result<(), AuctionError> {
        let range = self.client.auction_date_range();
        if range.end < range.start {
            return Err(AuctionError::InvalidDateRange {
                start: range.start,
                end: range.end,
            });
        }
        let passes = self.pool.auction_passes();
        if passes.is_empty() {
            return Err(AuctionError::NoPasses);
        }
        let settings = self.pool.auction_settings();
        let constraints = self.client.auction_constraints();

        let mut spots = self.client.spot_map();
        if !constraints.include_zero_audience {
            spots.retain(|_, spot| spot.audience > 0);
        }
        // the far side of a mirror pair may live outside the client's map
        let mirror_targets: Vec<SpotId> = spots
            .values()
            .filter_map(|spot| spot.mirror_of)
            .filter(|id| !spots.contains_key(id))
            .collect();
        for id in mirror_targets {
            if let Some(spot) = self.pool.spot_by_id(id) {
                spots.insert(id, spot);
            }
        }

        let mut buys = self.pool.active_buys();
        // the client's own buy competes even when the pool snapshot lags
        buys.entry(self.client.ad_buy_id())
            .or_insert_with(|| self.client.auction_info());

        // seeds become arena bids; unknown spots or buys are dropped loudly
        let mut arena = BidArena::default();
        let mut by_key: HashMap<(SpotId, BuyId), BidId> = HashMap::new();
        for seed in self.pool.auction_bidders(&range) {
            let Some(spot) = spots.get(&seed.spot) else {
                tracing::warn!(spot = seed.spot.0, buy = seed.buy.0, "bid on unknown avail");
                continue;
            };
            if !buys.contains_key(&seed.buy) {
                tracing::warn!(spot = seed.spot.0, buy = seed.buy.0, "bid from unknown buy");
                continue;
            }
            let mut bid = Bid::new(seed.buy, seed.spot, seed.rank, seed.alt_rank);
            bid.week_index = spot.week_index;
            if let Some(segmentation) = spot.segmentation {
                bid.segment_root = Some(segmentation.root);
                bid.segment_offset = segmentation.offset;
            }
            let id = arena.push(bid);
            by_key.insert((seed.spot, seed.buy), id);
        }

        // mirror partner links; a bid whose paired avail is missing from the
        // pool entirely can never resolve and is permanently disqualified
        for id in arena.ids().collect::<Vec<_>>() {
            let (spot_id, buy) = {
                let bid = arena.get(id);
                (bid.spot, bid.buy)
            };
            let Some(paired) = spots.get(&spot_id).and_then(|spot| spot.mirror_of) else {
                continue;
            };
            if !spots.contains_key(&paired) {
                let bid = arena.get_mut(id);
                bid.disqualified = true;
                bid.status = BidStatus::MirrorOrphaned;
                tracing::warn!(
                    spot = spot_id.0,
                    paired = paired.0,
                    "mirrored avail missing from pool; bid disqualified"
                );
                continue;
            }
            arena.get_mut(id).mirror_partner = by_key.get(&(paired, buy)).copied();
        }

        // segment families, rooted wherever a segmentation points
        let mut segments: Vec<SegmentSet> = Vec::new();
        let mut segment_index: HashMap<SpotId, SegmentSetId> = HashMap::new();
        for spot in spots.values() {
            let Some(segmentation) = spot.segmentation else {
                continue;
            };
            let root = segmentation.root;
            if segment_index.contains_key(&root) {
                continue;
            }
            let Some(root_spot) = spots.get(&root) else {
                tracing::warn!(root = root.0, "segment root missing from pool");
                continue;
            };
            let partial = self.pool.owner_allows_partial_sales(root_spot.owner);
            segment_index.insert(root, SegmentSetId(segments.len()));
            segments.push(SegmentSet::new(root_spot, partial));
        }

        // bids on a family's root avail belong to the family too, so the
        // ranking comparator groups them with their sub-duration rivals
        for id in arena.ids().collect::<Vec<_>>() {
            let spot_id = arena.get(id).spot;
            if arena.get(id).segment_root.is_none() && segment_index.contains_key(&spot_id) {
                arena.get_mut(id).segment_root = Some(spot_id);
            }
        }

        // auction spots: one per avail, with bidders and segment membership
        let mut auction_spots: IndexMap<SpotId, AuctionSpot> = spots
            .keys()
            .map(|&id| {
                let family = spots[&id]
                    .segmentation
                    .map(|s| s.root)
                    .or_else(|| segment_index.contains_key(&id).then_some(id));
                (
                    id,
                    AuctionSpot {
                        spot: id,
                        bidders: Vec::new(),
                        winner: None,
                        segment: family.and_then(|root| segment_index.get(&root)).copied(),
                    },
                )
            })
            .collect();
        for (id, bid) in arena.iter() {
            if let Some(auction_spot) = auction_spots.get_mut(&bid.spot) {
                auction_spot.bidders.push(id);
            }
        }

        // silo membership, ordered best-first
        for (id, bid) in arena.iter() {
            let Some(spot) = spots.get(&bid.spot) else {
                continue;
            };
            let Some(&segment) = bid
                .segment_root
                .or_else(|| segment_index.contains_key(&bid.spot).then_some(bid.spot))
                .and_then(|root| segment_index.get(&root))
            else {
                continue;
            };
            let set = &mut segments[segment.0];
            match set.silo_of(spot) {
                Some(silo) => set.add_bid(silo, id),
                None => tracing::warn!(
                    spot = spot.id.0,
                    root = set.root_spot.0,
                    "spot duration does not fit its segment family"
                ),
            }
        }
        for set in &mut segments {
            set.sort_silos(|a, b| ranking::compare(arena.get(a), arena.get(b)));
        }

        let preassigned = self.pool.preassigned_winners();
        tracing::debug!(
            spots = spots.len(),
            bids = arena.len(),
            segments = segments.len(),
            buys = buys.len(),
            "auction objects built"
        );

        self.data = Some(AuctionData {
            range,
            settings,
            passes,
            spots,
            auction_spots,
            arena,
            segments,
            buys,
            preassigned,
        });
        Ok(())
    }
}
