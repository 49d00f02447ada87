//! Coarse-to-fine bracket search.
//!
//! An exhaustive local refinement, not gradient descent: each pass
//! evaluates a fixed fan-out of equally spaced candidates across the
//! bracket, narrows the bracket to one step either side of the best value
//! seen so far, and stops once the step reaches the terminal granularity.
//! Being derivative-free it is indifferent to the kink `|cos|` puts in the
//! residual surface.

/// Best candidate seen so far across one or more passes.
#[derive(Debug, Clone, Copy)]
pub struct Candidate {
    pub value: i64,
    pub error: f64,
}

impl Candidate {
    /// A candidate any real evaluation beats.
    pub fn unset() -> Self {
        Self {
            value: 0,
            error: f64::INFINITY,
        }
    }

    /// Whether any evaluation has ever won; stays false when every cost in
    /// range was non-finite.
    pub fn is_set(&self) -> bool {
        self.error.is_finite()
    }
}

/// One shrinking bracket over an integer parameter.
#[derive(Debug, Clone)]
pub struct Bracket {
    lo: i64,
    hi: i64,
    fan_out: i64,
    terminal: i64,
    converged: bool,
}

impl Bracket {
    pub fn new(min: i64, max: i64, fan_out: i64, terminal: i64) -> Self {
        Self {
            lo: min,
            hi: max,
            fan_out,
            terminal,
            converged: false,
        }
    }

    pub fn converged(&self) -> bool {
        self.converged
    }

    /// Current bracket width. Each pass leaves a width of twice the step,
    /// so the width strictly decreases while `fan_out > 2`. That is the
    /// termination guarantee.
    pub fn width(&self) -> i64 {
        self.hi - self.lo
    }

    /// Runs one grid pass: evaluates candidates from `lo` (inclusive) to
    /// `hi` (exclusive), updates `best` on strict improvement, and narrows
    /// the bracket around the winning value. Once the computed step falls
    /// below the terminal granularity the pass runs at the terminal step
    /// and latches convergence.
    pub fn pass<F>(&mut self, best: &mut Candidate, mut cost: F)
    where
        F: FnMut(i64) -> f64,
    {
        let mut step = (self.hi - self.lo) / self.fan_out;
        if step < self.terminal {
            self.converged = true;
            step = self.terminal;
        }
        let mut at = self.lo;
        while at < self.hi {
            let error = cost(at);
            if error < best.error {
                best.error = error;
                best.value = at;
            }
            at += step;
        }
        self.lo = best.value - step;
        self.hi = best.value + step;
    }

    /// Repeats passes until converged.
    pub fn minimize<F>(&mut self, best: &mut Candidate, mut cost: F)
    where
        F: FnMut(i64) -> f64,
    {
        while !self.converged {
            self.pass(best, &mut cost);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parabola(center: i64) -> impl FnMut(i64) -> f64 {
        move |x| {
            let d = (x - center) as f64;
            d * d
        }
    }

    #[test]
    fn test_finds_minimum_to_unit_granularity() {
        let mut bracket = Bracket::new(15_000, 25_000, 10, 1);
        let mut best = Candidate::unset();
        bracket.minimize(&mut best, parabola(20_137));
        assert_eq!(best.value, 20_137);
        assert_eq!(best.error, 0.0);
    }

    #[test]
    fn test_coarse_terminal_lands_within_one_step() {
        let mut bracket = Bracket::new(1, 409_500, 10, 100);
        let mut best = Candidate::unset();
        bracket.minimize(&mut best, parabola(120_000));
        assert!((best.value - 120_000).abs() <= 100);
    }

    #[test]
    fn test_bracket_width_strictly_decreases() {
        let mut bracket = Bracket::new(0, 10_000, 10, 1);
        let mut best = Candidate::unset();
        let mut widths = Vec::new();
        while !bracket.converged() {
            widths.push(bracket.width());
            bracket.pass(&mut best, parabola(7_321));
        }
        for pair in widths.windows(2) {
            assert!(pair[1] < pair[0], "width did not shrink: {pair:?}");
        }
    }

    #[test]
    fn test_minimum_at_range_start_is_reachable() {
        let mut bracket = Bracket::new(0, 10_000, 10, 1);
        let mut best = Candidate::unset();
        bracket.minimize(&mut best, parabola(0));
        assert_eq!(best.value, 0);
    }

    #[test]
    fn test_first_found_minimum_wins_ties() {
        // Symmetric two-well cost: strict `<` keeps the earlier winner.
        let mut bracket = Bracket::new(0, 10_000, 10, 1);
        let mut best = Candidate::unset();
        bracket.minimize(&mut best, |x| {
            let a = (x - 2_500).abs();
            let b = (x - 7_500).abs();
            a.min(b) as f64
        });
        assert_eq!(best.value, 2_500);
    }

    #[test]
    fn test_all_infinite_costs_leave_candidate_unset() {
        let mut bracket = Bracket::new(0, 1_000, 10, 1);
        let mut best = Candidate::unset();
        bracket.minimize(&mut best, |_| f64::INFINITY);
        assert!(!best.is_set());
    }
}
