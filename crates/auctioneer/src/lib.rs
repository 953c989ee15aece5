//! Simulated spot-auction engine.
//!
//! Given a pool of avails, a set of competing campaign bids and the layered
//! business constraints (budgets, creative rotation, channel bundling,
//! mirrored and segmented avails, adjacency rules), the engine determines a
//! maximal-value, constraint-satisfying assignment of winning bids to
//! avails across ranked priority passes, with deterministic tie-breaking
//! and a precise losing status on every bid it turns away.
//!
//! The [`domain`] module holds the algorithmic core; [`infra`] the traits
//! the embedding system implements to supply avails, bids and budget
//! bookkeeping.

pub mod domain;
pub mod infra;
pub mod report;

#[cfg(test)]
mod testlib;

pub use {
    domain::{
        AuctionKind, DateRange,
        auctioneer::{AuctionError, AuctionOutcome, Auctioneer, BidRecord, WinnerRecord},
        bid::{BidStatus, WinType},
        segments::WinAlgorithm,
    },
    infra::{AuctionClient, AuctionConfig, AuctionPool, AuctionSettings, BudgetBook},
};
