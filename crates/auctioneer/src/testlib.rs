//! Shared test fixtures: fake pool/client/budget collaborators and
//! deterministic builders for spots, buys and seeds.

use {
    crate::{
        domain::{
            DateRange,
            auctioneer::{Auctioneer, preassigned::PreassignedWinner},
            buy::{BuyId, CampaignBuy, Creative, CreativeId},
            pass::AuctionPass,
            spot::{BreakId, ChannelId, OwnerId, Segmentation, Spot, SpotId, SpotLength},
        },
        infra::{
            AuctionClient, AuctionConfig, AuctionConstraints, AuctionPool, AuctionSettings,
            BudgetBook, BidSeed,
        },
    },
    chrono::NaiveDate,
    indexmap::IndexMap,
    money::{Money, Percent},
    std::collections::{BTreeMap, BTreeSet},
};

pub(crate) fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, day).unwrap()
}

pub(crate) fn settings() -> AuctionSettings {
    AuctionSettings {
        win_margin: Money::from_minor(10),
        rate_card_discount: Percent::from_whole(20),
    }
}

pub(crate) fn single_pass() -> Vec<AuctionPass> {
    vec![AuctionPass {
        number: 1,
        price_adjustment: Percent::ZERO,
        eligible_priorities: BTreeSet::from([1]),
    }]
}

/// A 30 second avail with a $100.00 policy price unless overridden.
pub(crate) fn spot(id: u64, channel: u64, audience: u64) -> Spot {
    Spot {
        id: SpotId(id),
        channel: ChannelId(channel),
        break_id: BreakId(id),
        owner: OwnerId(1),
        length: SpotLength::Thirty,
        day_index: 0,
        week_index: 0,
        audience,
        policy_price: Money::from_major(100),
        rate_card_eligible: false,
        segmentation: None,
        mirror_of: None,
    }
}

pub(crate) fn segmented(mut spot: Spot, root: u64, offset: u8, length: SpotLength) -> Spot {
    spot.segmentation = Some(Segmentation {
        root: SpotId(root),
        offset,
    });
    spot.length = length;
    spot
}

/// One creative per duration, approved and propagated to the given spots,
/// so length pruning never eliminates a buy by accident.
pub(crate) fn full_creatives(buy: u64, spots: &[u64]) -> Vec<Creative> {
    let propagated: BTreeSet<SpotId> = spots.iter().map(|&id| SpotId(id)).collect();
    [SpotLength::Fifteen, SpotLength::Thirty, SpotLength::Sixty]
        .into_iter()
        .enumerate()
        .map(|(index, length)| Creative {
            id: CreativeId(buy * 10 + index as u64),
            length,
            approved: true,
            propagated_spots: propagated.clone(),
        })
        .collect()
}

pub(crate) fn buy(id: u64, cpm_limit_major: i64, spots: &[u64]) -> CampaignBuy {
    CampaignBuy {
        id: BuyId(id),
        priority: 1,
        cpm_limit: Money::from_major(cpm_limit_major),
        min_efficiency: 0.0,
        pays_minimum_rate: false,
        pays_adjusted_rate: false,
        adjusted_cpm: None,
        min_channels_per_owner: None,
        creatives: full_creatives(id, spots),
    }
}

pub(crate) fn seed(buy: u64, spot: u64, rank: i64) -> BidSeed {
    BidSeed {
        buy: BuyId(buy),
        spot: SpotId(spot),
        rank,
        alt_rank: 0,
    }
}

#[derive(Default)]
pub(crate) struct FakePool {
    pub passes: Vec<AuctionPass>,
    pub seeds: Vec<BidSeed>,
    pub buys: BTreeMap<BuyId, CampaignBuy>,
    pub extra_spots: IndexMap<SpotId, Spot>,
    pub preassigned: Vec<PreassignedWinner>,
    pub partial_owners: BTreeSet<OwnerId>,
}

impl AuctionPool for FakePool {
    fn auction_settings(&self) -> AuctionSettings {
        settings()
    }

    fn auction_passes(&self) -> Vec<AuctionPass> {
        self.passes.clone()
    }

    fn preassigned_winners(&self) -> Vec<PreassignedWinner> {
        self.preassigned.clone()
    }

    fn auction_bidders(&self, _range: &DateRange) -> Vec<BidSeed> {
        self.seeds.clone()
    }

    fn active_buys(&self) -> BTreeMap<BuyId, CampaignBuy> {
        self.buys.clone()
    }

    fn spot_by_id(&self, id: SpotId) -> Option<Spot> {
        self.extra_spots.get(&id).cloned()
    }

    fn owner_allows_partial_sales(&self, owner: OwnerId) -> bool {
        self.partial_owners.contains(&owner)
    }
}

pub(crate) struct FakeClient {
    pub buy: CampaignBuy,
    pub range: DateRange,
    pub spots: IndexMap<SpotId, Spot>,
}

impl FakeClient {
    pub(crate) fn new(buy: CampaignBuy, spots: Vec<Spot>) -> Self {
        Self {
            buy,
            range: DateRange {
                start: date(1),
                end: date(7),
            },
            spots: spots.into_iter().map(|spot| (spot.id, spot)).collect(),
        }
    }
}

impl AuctionClient for FakeClient {
    fn ad_buy_id(&self) -> BuyId {
        self.buy.id
    }

    fn auction_date_range(&self) -> DateRange {
        self.range
    }

    fn auction_constraints(&self) -> AuctionConstraints {
        AuctionConstraints {
            include_zero_audience: true,
        }
    }

    fn auction_info(&self) -> CampaignBuy {
        self.buy.clone()
    }

    fn spot_map(&self) -> IndexMap<SpotId, Spot> {
        self.spots.clone()
    }
}

/// In-memory budget book. Budget limits are a per-buy spend cap; adjacency
/// outcomes are forced through explicit reject sets.
#[derive(Default)]
pub(crate) struct FakeBudget {
    pub spend: BTreeMap<BuyId, Money>,
    pub caps: BTreeMap<BuyId, Money>,
    pub reject_auto_adjacency: BTreeSet<(BuyId, SpotId)>,
    pub reject_advertiser_adjacency: BTreeSet<(BuyId, SpotId)>,
    pub reject_proximity: BTreeSet<(BuyId, SpotId)>,
    pub reject_product: BTreeSet<(BuyId, SpotId)>,
    pub banned_creatives: BTreeSet<CreativeId>,
    pub prior_channel_wins: BTreeMap<(BuyId, OwnerId), BTreeSet<ChannelId>>,
    pub content: Vec<(BuyId, SpotId, CreativeId)>,
}

impl BudgetBook for FakeBudget {
    fn init_budget(&mut self, _buys: &BTreeMap<BuyId, CampaignBuy>, _range: &DateRange) {}

    fn reset_run_values(&mut self) {
        self.spend.clear();
        self.content.clear();
    }

    fn add_winner_budget_totals(&mut self, buy: BuyId, _spot: &Spot, cost: Money) {
        *self.spend.entry(buy).or_default() += cost;
    }

    fn unroll_winner_budget_totals(&mut self, buy: BuyId, _spot: &Spot, cost: Money) {
        *self.spend.entry(buy).or_default() -= cost;
    }

    fn add_winner_content_totals(&mut self, buy: BuyId, spot: &Spot, creative: CreativeId) {
        self.content.push((buy, spot.id, creative));
    }

    fn unroll_winner_content_totals(&mut self, buy: BuyId, spot: &Spot, creative: CreativeId) {
        let entry = (buy, spot.id, creative);
        if let Some(index) = self.content.iter().rposition(|&e| e == entry) {
            self.content.remove(index);
        }
    }

    fn auto_adjacency_passes(&self, buy: &CampaignBuy, spot: &Spot) -> bool {
        !self.reject_auto_adjacency.contains(&(buy.id, spot.id))
    }

    fn advertiser_adjacency_passes(&self, buy: &CampaignBuy, spot: &Spot) -> bool {
        !self.reject_advertiser_adjacency.contains(&(buy.id, spot.id))
    }

    fn proximity_restriction_passes(&self, buy: &CampaignBuy, spot: &Spot) -> bool {
        !self.reject_proximity.contains(&(buy.id, spot.id))
    }

    fn budget_limits_pass(&self, buy: &CampaignBuy, _spot: &Spot, cost: Money) -> bool {
        match self.caps.get(&buy.id) {
            Some(&cap) => {
                let spent = self.spend.get(&buy.id).copied().unwrap_or_default();
                spent.saturating_add(cost) <= cap
            }
            None => true,
        }
    }

    fn product_attributes_pass(
        &self,
        buy: &CampaignBuy,
        spot: &Spot,
        creatives: &mut Vec<CreativeId>,
    ) -> bool {
        creatives.retain(|creative| !self.banned_creatives.contains(creative));
        !self.reject_product.contains(&(buy.id, spot.id))
    }

    fn won_channels(&self, buy: BuyId, owner: OwnerId) -> BTreeSet<ChannelId> {
        self.prior_channel_wins
            .get(&(buy, owner))
            .cloned()
            .unwrap_or_default()
    }

    fn daily_spend(&self, _buy: BuyId, _day_index: u32) -> Money {
        Money::ZERO
    }

    fn campaign_spend(&self, buy: BuyId) -> Money {
        self.spend.get(&buy).copied().unwrap_or_default()
    }
}

pub(crate) type TestAuctioneer = Auctioneer<FakePool, FakeClient, FakeBudget>;

/// An auctioneer over the given fixtures with default config and a budget
/// book with no restrictions.
pub(crate) fn auctioneer(pool: FakePool, client: FakeClient) -> TestAuctioneer {
    auctioneer_with_budget(pool, client, FakeBudget::default())
}

pub(crate) fn auctioneer_with_budget(
    pool: FakePool,
    client: FakeClient,
    budget: FakeBudget,
) -> TestAuctioneer {
    observe::tracing::initialize_reentrant("auctioneer=debug");
    Auctioneer::new(pool, client, budget, AuctionConfig::default())
}
