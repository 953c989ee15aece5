//! Budget, impression and adjacency bookkeeping. The engine consults this
//! collaborator for every winnability decision and reports every committed
//! or provisional win into it; the implementation owns the actual tallies.

use {
    crate::domain::{
        DateRange,
        buy::{BuyId, CampaignBuy, CreativeId},
        spot::{ChannelId, OwnerId, Spot},
    },
    money::Money,
    std::collections::{BTreeMap, BTreeSet},
};

/// The winnability checks run in a fixed order; each method is one link of
/// the chain and must be free of side effects except where documented.
///
/// `add_*`/`unroll_*` pairs must be exact inverses: the engine applies them
/// provisionally during mirror, bundling and combo resolution and relies on
/// an unroll restoring the previous state bit for bit.
pub trait BudgetBook {
    fn init_budget(&mut self, buys: &BTreeMap<BuyId, CampaignBuy>, range: &DateRange);
    /// Clears all per-run accumulators at the start of a run.
    fn reset_run_values(&mut self);

    fn add_winner_budget_totals(&mut self, buy: BuyId, spot: &Spot, cost: Money);
    fn unroll_winner_budget_totals(&mut self, buy: BuyId, spot: &Spot, cost: Money);
    fn add_winner_content_totals(&mut self, buy: BuyId, spot: &Spot, creative: CreativeId);
    fn unroll_winner_content_totals(&mut self, buy: BuyId, spot: &Spot, creative: CreativeId);

    /// Built-in adjacency rules (same break, back to back slots).
    fn auto_adjacency_passes(&self, buy: &CampaignBuy, spot: &Spot) -> bool;
    /// Advertiser-level adjacency rules.
    fn advertiser_adjacency_passes(&self, buy: &CampaignBuy, spot: &Spot) -> bool;
    /// Channel proximity restrictions.
    fn proximity_restriction_passes(&self, buy: &CampaignBuy, spot: &Spot) -> bool;
    /// Whether the buy's budget limits allow this additional cost.
    fn budget_limits_pass(&self, buy: &CampaignBuy, spot: &Spot, cost: Money) -> bool;
    /// Product attribute rules. May prune `creatives` as a side effect;
    /// returns false only when the placement is rejected outright.
    fn product_attributes_pass(
        &self,
        buy: &CampaignBuy,
        spot: &Spot,
        creatives: &mut Vec<CreativeId>,
    ) -> bool;

    /// Channels on which the buy already holds wins with this owner,
    /// counting toward channel bundling requirements.
    fn won_channels(&self, buy: BuyId, owner: OwnerId) -> BTreeSet<ChannelId>;

    /// Per-day spend tally for diagnostics.
    fn daily_spend(&self, buy: BuyId, day_index: u32) -> Money;
    /// Whole-campaign spend tally for diagnostics.
    fn campaign_spend(&self, buy: BuyId) -> Money;
}
