//! The algorithmic core of the auction engine: the data model for avails,
//! bids and passes, the ranking comparator, the segment/combo subsystem and
//! the auctioneer itself.

pub mod auctioneer;
pub mod bid;
pub mod buy;
pub mod journal;
pub mod pass;
pub mod ranking;
pub mod segments;
pub mod spot;

use {
    chrono::NaiveDate,
    serde::{Deserialize, Serialize},
};

/// Which flavor of auction to run. Real auctions honor preassigned winners
/// and enforce creative propagation strictly; simulated runs relax the
/// propagation requirement for the client's own buy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuctionKind {
    Simulated,
    Real,
}

/// Inclusive date range an auction run covers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        (end >= start).then_some(Self { start, end })
    }
}
