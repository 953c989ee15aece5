//! Accounting for provisional ("conditional totals") budget effects.
//!
//! Mirror resolution, channel bundling and combo evaluation all apply a
//! bid's budget effect provisionally, probe further, and unroll. The journal
//! records every apply/unroll pair so double-application, leaked totals and
//! runaway nesting are detected mechanically instead of corrupting budget
//! state silently.

use crate::domain::bid::BidId;

/// Tracks which bids currently have provisional totals applied and how
/// deeply resolution scopes are nested.
#[derive(Debug)]
pub struct Journal {
    open: Vec<BidId>,
    scope_marks: Vec<usize>,
    max_depth: usize,
}

impl Journal {
    pub fn new(max_depth: usize) -> Self {
        Self {
            open: Vec::new(),
            scope_marks: Vec::new(),
            max_depth,
        }
    }

    pub fn depth(&self) -> usize {
        self.scope_marks.len()
    }

    /// Opens a resolution scope. Returns false when the configured nesting
    /// depth is exceeded; the caller must decline the resolution.
    #[must_use]
    pub fn enter_scope(&mut self) -> bool {
        if self.scope_marks.len() >= self.max_depth {
            return false;
        }
        self.scope_marks.push(self.open.len());
        true
    }

    /// Closes the innermost scope, returning the bids still carrying
    /// provisional totals that were applied inside it. A correct resolution
    /// path always returns an empty list.
    pub fn exit_scope(&mut self) -> Vec<BidId> {
        let mark = self.scope_marks.pop().unwrap_or(0);
        self.open.split_off(mark.min(self.open.len()))
    }

    /// Records a provisional apply. Returns false if the bid already has
    /// totals applied.
    #[must_use]
    pub fn note_apply(&mut self, bid: BidId) -> bool {
        if self.open.contains(&bid) {
            return false;
        }
        self.open.push(bid);
        true
    }

    /// Records an unroll. Returns false if the bid had no totals applied.
    #[must_use]
    pub fn note_unroll(&mut self, bid: BidId) -> bool {
        match self.open.iter().rposition(|open| *open == bid) {
            Some(index) => {
                self.open.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn is_open(&self, bid: BidId) -> bool {
        self.open.contains(&bid)
    }

    pub fn open_count(&self) -> usize {
        self.open.len()
    }
}

/// Counts internal-consistency violations, logging the first few loudly and
/// only counting the rest. Violations are programming-error-class faults: a
/// production auction run continues past them on a best-effort basis.
#[derive(Debug, Default)]
pub struct ConsistencyReporter {
    logged: u32,
    total: u32,
    cap: u32,
}

impl ConsistencyReporter {
    pub fn new(cap: u32) -> Self {
        Self {
            logged: 0,
            total: 0,
            cap,
        }
    }

    pub fn report(&mut self, context: &str, bid: Option<BidId>) {
        self.total += 1;
        if self.logged < self.cap {
            self.logged += 1;
            tracing::error!(
                ?bid,
                occurrence = self.total,
                "auction internal consistency violation: {context}"
            );
        }
    }

    pub fn total(&self) -> u32 {
        self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_unroll_pairing() {
        let mut journal = Journal::new(3);
        assert!(journal.note_apply(BidId(1)));
        // double apply is rejected
        assert!(!journal.note_apply(BidId(1)));
        assert!(journal.note_unroll(BidId(1)));
        // unrolling a clean bid is rejected
        assert!(!journal.note_unroll(BidId(1)));
    }

    #[test]
    fn scopes_surface_leaked_totals() {
        let mut journal = Journal::new(3);
        assert!(journal.enter_scope());
        assert!(journal.note_apply(BidId(1)));
        assert!(journal.note_apply(BidId(2)));
        assert!(journal.note_unroll(BidId(2)));
        assert_eq!(journal.exit_scope(), vec![BidId(1)]);
    }

    #[test]
    fn depth_limit() {
        let mut journal = Journal::new(2);
        assert!(journal.enter_scope());
        assert!(journal.enter_scope());
        assert!(!journal.enter_scope());
    }
}
