//! Move-time allocation. A soft limit the main thread checks once per completed iterative-
//! deepening depth, and a hard limit every worker checks periodically mid-search.

use std::time::{Duration, Instant};

use crate::types::pieces::Color;

/// Average plies per side left in a game with no stated `movestogo`, trimmed down from the
/// true mean so the engine keeps a margin for games that run long.
const AVG_NUMBER_MOVES: i32 = 30;

/// Wiggle room for GUI/engine communication latency, subtracted off the hard limit.
const TIME_BUFFER: Duration = Duration::from_millis(30);

#[derive(Copy, Clone, Debug, Default)]
pub struct TimeManager {
    /// Depth loop stops once a completed iteration has taken this long: the next one is very
    /// unlikely to finish inside the budget, so starting it is wasted work.
    soft_limit: Option<Duration>,
    /// Mid-search hard stop, checked every `NODE_BATCH` nodes regardless of depth.
    hard_limit: Option<Duration>,
}

impl TimeManager {
    pub fn infinite() -> Self {
        TimeManager { soft_limit: None, hard_limit: None }
    }

    pub fn fixed_movetime(movetime: Duration) -> Self {
        let hard = movetime.saturating_sub(TIME_BUFFER);
        TimeManager { soft_limit: Some(hard), hard_limit: Some(hard) }
    }

    /// Builds a budget from the clock state reported by a `go` command: remaining time,
    /// increment, and (if the time control specifies one) moves left until the next control.
    pub fn from_clock(time_remaining: [Duration; 2], time_inc: [Duration; 2], movestogo: i32, side: Color, plies_played: usize) -> Self {
        let clock = time_remaining[side.idx()];
        if clock.is_zero() {
            return TimeManager { soft_limit: Some(Duration::ZERO), hard_limit: Some(Duration::ZERO) };
        }
        let est_moves_left = if movestogo > 0 { movestogo } else { (AVG_NUMBER_MOVES - plies_played as i32 / 2).max(1) };
        let increment = time_inc[side.idx()];
        let base = clock.as_millis() / est_moves_left as u128 + increment.as_millis();
        let soft = Duration::from_millis(base as u64);
        let hard = (soft * 4).min(clock.saturating_sub(TIME_BUFFER));
        TimeManager { soft_limit: Some(soft), hard_limit: Some(hard) }
    }

    /// True once an iteration has run long enough that starting another is not worthwhile.
    pub fn soft_termination(&self, search_start: Instant) -> bool {
        match self.soft_limit {
            Some(limit) => search_start.elapsed() >= limit,
            None => false,
        }
    }

    /// True once the search has exceeded the time it must not exceed, mid-iteration.
    pub fn hard_termination(&self, search_start: Instant) -> bool {
        match self.hard_limit {
            Some(limit) => search_start.elapsed() >= limit,
            None => false,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn infinite_never_terminates() {
        let tm = TimeManager::infinite();
        assert!(!tm.soft_termination(Instant::now()));
        assert!(!tm.hard_termination(Instant::now()));
    }

    #[test]
    fn fixed_movetime_hard_limit_respects_buffer() {
        let tm = TimeManager::fixed_movetime(Duration::from_millis(1000));
        assert!(!tm.hard_termination(Instant::now()));
    }

    #[test]
    fn zero_clock_terminates_immediately() {
        let tm = TimeManager::from_clock([Duration::ZERO, Duration::ZERO], [Duration::ZERO; 2], 0, Color::Black, 0);
        assert!(tm.hard_termination(Instant::now()));
    }
}
