//! The engine's seams to the rest of the system: the pool that supplies
//! avails and bids, the client whose grid is being auctioned, the budget
//! and adjacency bookkeeper, and the run configuration. Everything here is
//! an in-process collaborator; there is no wire format.

pub mod budget;
pub mod client;
pub mod config;
pub mod pool;

pub use {
    budget::BudgetBook,
    client::{AuctionClient, AuctionConstraints},
    config::AuctionConfig,
    pool::{AuctionPool, AuctionSettings, BidSeed},
};
