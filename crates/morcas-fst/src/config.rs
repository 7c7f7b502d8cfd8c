// Search options and the per-query budget.

use std::time::{Duration, Instant};

use log::warn;

use crate::MAX_EXPLORED;

/// Options for one analysis or generation query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    /// Keep only the best `n` results. `None` keeps all.
    pub nbest: Option<usize>,
    /// Maximum number of arcs explored before giving up.
    pub max_explored: usize,
    /// Wall-clock limit for one query.
    pub time_limit: Option<Duration>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            nbest: None,
            max_explored: MAX_EXPLORED,
            time_limit: None,
        }
    }
}

impl SearchOptions {
    pub fn with_nbest(mut self, n: usize) -> Self {
        self.nbest = Some(n);
        self
    }

    pub fn with_max_explored(mut self, limit: usize) -> Self {
        self.max_explored = limit;
        self
    }

    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }
}

/// Clock reads are amortized over this many arcs.
const CLOCK_INTERVAL: usize = 1024;

/// Counts explored arcs for one query and stops the search when the limit
/// or the deadline is reached.
#[derive(Debug)]
pub struct SearchBudget {
    limit: usize,
    explored: usize,
    deadline: Option<Instant>,
    exhausted: bool,
}

impl SearchBudget {
    pub fn new(options: &SearchOptions) -> Self {
        Self {
            limit: options.max_explored,
            explored: 0,
            deadline: options.time_limit.map(|limit| Instant::now() + limit),
            exhausted: false,
        }
    }

    /// Account for one arc. Returns `false` once the budget is spent.
    #[inline]
    pub fn tick(&mut self) -> bool {
        if self.exhausted {
            return false;
        }
        self.explored += 1;
        if self.explored > self.limit {
            self.exhaust("arc limit");
        } else if self.explored % CLOCK_INTERVAL == 0
            && self.deadline.is_some_and(|d| Instant::now() >= d)
        {
            self.exhaust("time limit");
        }
        !self.exhausted
    }

    fn exhaust(&mut self, what: &str) {
        self.exhausted = true;
        warn!(
            "search stopped after {} arcs ({what} reached); results may be incomplete",
            self.explored
        );
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    pub fn explored(&self) -> usize {
        self.explored
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let o = SearchOptions::default();
        assert_eq!(o.nbest, None);
        assert_eq!(o.max_explored, MAX_EXPLORED);
        assert_eq!(o.time_limit, None);
        assert_eq!(o.with_nbest(3).nbest, Some(3));
    }

    #[test]
    fn arc_limit_exhausts_budget() {
        let mut b = SearchBudget::new(&SearchOptions::default().with_max_explored(2));
        assert!(b.tick());
        assert!(b.tick());
        assert!(!b.tick());
        assert!(b.is_exhausted());
        assert!(!b.tick());
        assert_eq!(b.explored(), 3);
    }

    #[test]
    fn zero_time_limit_exhausts_at_first_clock_read() {
        let mut b = SearchBudget::new(&SearchOptions::default().with_time_limit(Duration::ZERO));
        let ticks = (0..2 * CLOCK_INTERVAL).take_while(|_| b.tick()).count();
        assert_eq!(ticks, CLOCK_INTERVAL - 1);
    }
}
