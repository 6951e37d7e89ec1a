//! Tunable margins and thresholds for the main search, gathered in one place so the pruning
//! and reduction logic in `negamax` reads as formulas rather than a wall of magic numbers.

use super::score::ONE_PLY;

pub const RAZORING_MARGIN: i32 = 531;
pub const RAZORING_DEPTH: i32 = ONE_PLY;

pub const FUTILITY_MARGIN_PER_PLY: i32 = 217;
pub const FUTILITY_MAX_DEPTH: i32 = 6 * ONE_PLY;

pub const NULL_MOVE_EVAL_MARGIN: i32 = 292;
pub const NULL_MOVE_DEPTH_SCALE: i32 = 32;
pub const NULL_MOVE_IMPROVING_SCALE: i32 = 30;
pub const NULL_MOVE_TT_PV_BONUS: i32 = 120;
pub const NULL_MOVE_STAT_SCORE_THRESHOLD: i32 = 23397;
pub const NULL_MOVE_VERIFY_DEPTH: i32 = 13 * ONE_PLY;

pub const PROBCUT_MIN_DEPTH: i32 = 5 * ONE_PLY;
pub const PROBCUT_MARGIN: i32 = 189;
pub const PROBCUT_IMPROVING_SCALE: i32 = 45;
pub const PROBCUT_DEPTH_REDUCTION: i32 = 4 * ONE_PLY;

pub const IID_MIN_DEPTH: i32 = 7 * ONE_PLY;
pub const IID_DEPTH_REDUCTION: i32 = 7 * ONE_PLY;

pub const SINGULAR_MIN_DEPTH: i32 = 6 * ONE_PLY;
pub const SINGULAR_TT_DEPTH_MARGIN: i32 = 3 * ONE_PLY;

pub const LMR_MIN_DEPTH: i32 = 3 * ONE_PLY;

pub const COUNTER_MOVE_PRUNE_THRESHOLD: i32 = 0;

pub const STAT_SCORE_OFFSET: i32 = 4926;
pub const STAT_SCORE_DIVISOR: i32 = 16434;

pub const MAX_QUIETS_TRIED: usize = 64;
pub const MAX_CAPTURES_TRIED: usize = 32;

/// Every this many nodes, a worker polls the clock/stop flag instead of on every node.
pub const TIME_CHECK_INTERVAL: u64 = 1024;
