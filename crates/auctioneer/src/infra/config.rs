//! Engine configuration. Passed explicitly into the auctioneer constructor;
//! nothing here is process-global.

use crate::domain::segments::WinAlgorithm;

#[derive(Clone, Debug)]
pub struct AuctionConfig {
    /// Which segment win algorithm resolution uses.
    pub win_algorithm: WinAlgorithm,
    /// How deeply provisional scopes (mirror, bundling, combo evaluation)
    /// may nest before resolution declines.
    pub max_provisional_depth: usize,
    /// How many internal-consistency violations are logged in full before
    /// the reporter falls back to counting.
    pub consistency_log_cap: u32,
}

impl Default for AuctionConfig {
    fn default() -> Self {
        Self {
            win_algorithm: WinAlgorithm::default(),
            max_provisional_depth: 3,
            consistency_log_cap: 32,
        }
    }
}
