//! Per-worker history statistics: butterfly, low-ply, counter-move, capture, and
//! continuation histories, all bounded through the same gravity-update rule.

use crate::position::moves::{Move, FROM_OR_DROP_NB};
use crate::types::pieces::{Color, PieceType, NUM_PIECE_TYPES};
use crate::types::square::{Square, NUM_SQUARES};

use super::score::ONE_PLY;
use super::SearchStack;

const FROM_TO_NB: usize = FROM_OR_DROP_NB * NUM_SQUARES;
const LOW_PLY_COUNT: usize = 4;
pub const LOW_PLY_DEPTH_THRESHOLD: i32 = 12;

const MAIN_HISTORY_D: i32 = 10692;
const CONT_HISTORY_D: i32 = 29952;

/// `v <- v + bonus - v * |bonus| / D`, self-bounded at `+-D` for any `|bonus| <= D`.
/// Uses a 32-bit intermediate for `v * |bonus|`, which would overflow an i16 accumulator.
fn gravity_update(v: &mut i16, bonus: i32, d: i32) {
    let value = *v as i32;
    let updated = value + bonus - value * bonus.abs() / d;
    *v = updated.clamp(-d, d) as i16;
}

/// `stat_bonus(depth)`: grows quadratically with depth, capped low for overlong depths where
/// the update would otherwise dominate unrelated statistics.
pub fn stat_bonus(depth: i32) -> i32 {
    if depth > 15 * ONE_PLY {
        -8
    } else {
        let d = depth / ONE_PLY;
        19 * d * d + 155 * d - 132
    }
}

/// A `[PieceType][Square] -> i16` table, the unit the continuation histories are built from.
#[derive(Clone)]
struct PieceToHistory {
    table: Vec<[i16; NUM_SQUARES]>,
}

impl Default for PieceToHistory {
    fn default() -> Self {
        PieceToHistory { table: vec![[0; NUM_SQUARES]; NUM_PIECE_TYPES] }
    }
}

impl PieceToHistory {
    fn get(&self, piece_type: PieceType, to: Square) -> i32 {
        self.table[piece_type.idx()][to.idx()] as i32
    }

    fn update(&mut self, piece_type: PieceType, to: Square, bonus: i32) {
        gravity_update(&mut self.table[piece_type.idx()][to.idx()], bonus, CONT_HISTORY_D);
    }
}

/// Indexed by the previous move's `(to, piece_type)`; a continuation history axis keyed on
/// `[in_check][is_capture]` of the ply the previous move belonged to.
#[derive(Clone)]
struct ContinuationHistory {
    table: Vec<Vec<PieceToHistory>>,
}

impl Default for ContinuationHistory {
    fn default() -> Self {
        ContinuationHistory { table: vec![vec![PieceToHistory::default(); NUM_PIECE_TYPES]; NUM_SQUARES] }
    }
}

impl ContinuationHistory {
    fn entry(&self, to: Square, piece_type: PieceType) -> &PieceToHistory {
        &self.table[to.idx()][piece_type.idx()]
    }

    fn entry_mut(&mut self, to: Square, piece_type: PieceType) -> &mut PieceToHistory {
        &mut self.table[to.idx()][piece_type.idx()]
    }
}

pub struct HistoryTable {
    main_history: Vec<[i16; FROM_TO_NB]>,
    low_ply_history: Vec<[i16; FROM_TO_NB]>,
    counter_moves: Vec<Vec<Move>>,
    capture_history: Vec<Vec<[i16; NUM_PIECE_TYPES]>>,
    /// `[in_check][is_capture]`, matching the source's continuation-history axes.
    continuation_history: [[ContinuationHistory; 2]; 2],
}

impl Default for HistoryTable {
    fn default() -> Self {
        HistoryTable {
            main_history: vec![[0; FROM_TO_NB]; 2],
            low_ply_history: vec![[0; FROM_TO_NB]; LOW_PLY_COUNT],
            counter_moves: vec![vec![Move::NONE; NUM_PIECE_TYPES]; NUM_SQUARES],
            capture_history: vec![vec![[0; NUM_PIECE_TYPES]; NUM_PIECE_TYPES]; NUM_SQUARES],
            continuation_history: Default::default(),
        }
    }
}

impl HistoryTable {
    pub fn main_history(&self, m: Move, us: Color) -> i32 {
        self.main_history[us.idx()][m.from_to_index()] as i32
    }

    fn add_main_history(&mut self, m: Move, us: Color, bonus: i32) {
        gravity_update(&mut self.main_history[us.idx()][m.from_to_index()], bonus, MAIN_HISTORY_D);
    }

    pub fn low_ply_history(&self, ply: i32, m: Move) -> i32 {
        if (ply as usize) < LOW_PLY_COUNT {
            self.low_ply_history[ply as usize][m.from_to_index()] as i32
        } else {
            0
        }
    }

    fn add_low_ply_history(&mut self, ply: i32, m: Move, bonus: i32) {
        if (ply as usize) < LOW_PLY_COUNT {
            gravity_update(&mut self.low_ply_history[ply as usize][m.from_to_index()], bonus, MAIN_HISTORY_D);
        }
    }

    pub fn counter_move(&self, prev_to: Square, prev_piece: PieceType) -> Move {
        self.counter_moves[prev_to.idx()][prev_piece.idx()]
    }

    fn set_counter_move(&mut self, prev_to: Square, prev_piece: PieceType, m: Move) {
        self.counter_moves[prev_to.idx()][prev_piece.idx()] = m;
    }

    pub fn capture_history(&self, to: Square, piece: PieceType, captured: PieceType) -> i32 {
        self.capture_history[to.idx()][piece.idx()][captured.idx()] as i32
    }

    fn add_capture_history(&mut self, to: Square, piece: PieceType, captured: PieceType, bonus: i32) {
        gravity_update(&mut self.capture_history[to.idx()][piece.idx()][captured.idx()], bonus, MAIN_HISTORY_D);
    }

    fn continuation_history_mut(&mut self, in_check: bool, is_capture: bool) -> &mut ContinuationHistory {
        &mut self.continuation_history[in_check as usize][is_capture as usize]
    }
}

/// Applies the gravity update to the continuation history keyed by each of
/// `stack.at(ply - i)` for `i in {1, 2, 4, 6}`, skipping indices whose move doesn't exist or,
/// while in check, lie beyond `i = 2` (a check response rarely shares structure with a move
/// two-plus plies back).
pub fn update_continuation_histories(history: &mut HistoryTable, stack: &SearchStack, ply: i32, piece: PieceType, to: Square, bonus: i32) {
    let in_check = stack.get(ply).in_check;
    for &i in &[1, 2, 4, 6] {
        if in_check && i > 2 {
            continue;
        }
        let Some(entry) = stack.at(ply - i) else { continue };
        if entry.current_move.is_none() {
            continue;
        }
        let grandparent_in_check = stack.at(ply - i - 1).map(|e| e.in_check).unwrap_or(false);
        let table = history.continuation_history_mut(grandparent_in_check, entry.current_move.is_capture());
        table.entry_mut(entry.current_move.to(), entry.current_move.piece_type_from()).update(piece, to, bonus);
    }
}

/// Looks up the `[ply-1, ply-2, ply-4, ply-6]` continuation-history entries for `(piece, to)`,
/// handing each to `weight` so callers can combine them per their own formula.
fn continuation_history_terms(history: &HistoryTable, stack: &SearchStack, ply: i32, piece: PieceType, to: Square) -> [i32; 4] {
    let mut terms = [0; 4];
    let in_check = stack.get(ply).in_check;
    for (slot, &i) in terms.iter_mut().zip(&[1, 2, 4, 6]) {
        if in_check && i > 2 {
            continue;
        }
        let Some(entry) = stack.at(ply - i) else { continue };
        if entry.current_move.is_none() {
            continue;
        }
        let grandparent_in_check = stack.at(ply - i - 1).map(|e| e.in_check).unwrap_or(false);
        let table = &history.continuation_history[grandparent_in_check as usize][entry.current_move.is_capture() as usize];
        *slot = table.entry(entry.current_move.to(), entry.current_move.piece_type_from()).get(piece, to);
    }
    terms
}

/// Move-ordering weighting used to score quiets/evasions: `2*[ply-1] + 2*[ply-2] + 2*[ply-4] + [ply-6]`.
pub fn continuation_history_score(history: &HistoryTable, stack: &SearchStack, ply: i32, piece: PieceType, to: Square) -> i32 {
    let [h1, h2, h4, h6] = continuation_history_terms(history, stack, ply, piece, to);
    2 * h1 + 2 * h2 + 2 * h4 + h6
}

/// statScore weighting used by the null-move threshold gate and the LMR reduction formula:
/// `[ply-1] + [ply-2] + [ply-4]`, unweighted and without the `ply-6` term.
pub fn continuation_history_stat_score(history: &HistoryTable, stack: &SearchStack, ply: i32, piece: PieceType, to: Square) -> i32 {
    let [h1, h2, h4, _] = continuation_history_terms(history, stack, ply, piece, to);
    h1 + h2 + h4
}

pub fn update_quiet_stats(history: &mut HistoryTable, stack: &mut SearchStack, ply: i32, us: Color, m: Move, bonus: i32, depth: i32) {
    if let Some(entry) = stack.at_mut(ply) {
        if entry.killers[0] != m {
            entry.killers[1] = entry.killers[0];
            entry.killers[0] = m;
        }
    }
    history.add_main_history(m, us, bonus);
    update_continuation_histories(history, stack, ply, m.piece_type_from(), m.to(), bonus);
    if let Some(prev) = stack.at(ply - 1) {
        if !prev.current_move.is_none() {
            history.set_counter_move(prev.current_move.to(), prev.current_move.piece_type_from(), m);
        }
    }
    if depth > LOW_PLY_DEPTH_THRESHOLD * ONE_PLY && ply < 4 {
        history.add_low_ply_history(ply, m, stat_bonus(depth - 7 * ONE_PLY));
    }
}

/// On a cutoff or terminal node with a best move, applies the full stat-update protocol:
/// reward the best move, penalize every quiet/capture tried before it, and (for quiets)
/// optionally penalize the previous ply's move when it looked unusually forcing.
#[allow(clippy::too_many_arguments)]
pub fn update_all_stats(
    history: &mut HistoryTable,
    stack: &mut SearchStack,
    ply: i32,
    us: Color,
    best_move: Move,
    best_value: i32,
    beta: i32,
    depth: i32,
    quiets_tried: &[Move],
    captures_tried: &[Move],
) {
    let bonus1 = stat_bonus(depth + ONE_PLY);
    let bonus2 = if best_value > beta + 128 { bonus1 } else { stat_bonus(depth) };

    if !best_move.is_capture_or_pawn_promotion() {
        update_quiet_stats(history, stack, ply, us, best_move, bonus2, depth);
        for &q in quiets_tried {
            if q == best_move {
                continue;
            }
            history.add_main_history(q, us, -bonus2);
            update_continuation_histories(history, stack, ply, q.piece_type_from(), q.to(), -bonus2);
        }
    } else {
        history.add_capture_history(best_move.to(), best_move.piece_type_from(), best_move.captured_piece_type(), bonus1);
    }

    for &c in captures_tried {
        if c == best_move {
            continue;
        }
        history.add_capture_history(c.to(), c.piece_type_from(), c.captured_piece_type(), -bonus1);
    }

    if let Some(prev) = stack.at(ply - 1) {
        let prev_move_count_was_one = prev.move_count == 1;
        let prev_was_killer = prev.killers[0] == prev.current_move;
        if (prev_move_count_was_one || prev_was_killer) && !prev.current_move.is_capture() && !prev.current_move.is_none() {
            let prev_move = prev.current_move;
            update_continuation_histories(history, stack, ply - 1, prev_move.piece_type_from(), prev_move.to(), -bonus1);
        }
    }
}

/// Non-PV, no-best-move node: a small reward to whatever move led into this subtree, since
/// failing to improve on alpha after a real effort is still mild evidence it's reasonable.
pub fn update_all_node_bonus(history: &mut HistoryTable, stack: &mut SearchStack, ply: i32, depth: i32, is_pv: bool) {
    if depth < 3 * ONE_PLY && !is_pv {
        return;
    }
    let Some(prev) = stack.at(ply - 1) else { return };
    if prev.current_move.is_none() || prev.current_move.is_capture() {
        return;
    }
    let prev_move = prev.current_move;
    update_continuation_histories(history, stack, ply - 1, prev_move.piece_type_from(), prev_move.to(), stat_bonus(depth));
}

pub fn clear_killers(stack: &mut SearchStack, ply: i32) {
    if let Some(entry) = stack.at_mut(ply + 1) {
        entry.killers = [Move::NONE, Move::NONE];
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn gravity_update_stays_bounded() {
        let mut v: i16 = 0;
        for _ in 0..10_000 {
            gravity_update(&mut v, 300, MAIN_HISTORY_D);
        }
        assert!((v as i32).abs() <= MAIN_HISTORY_D);
    }

    #[test]
    fn gravity_update_handles_negative_bonus() {
        let mut v: i16 = 5000;
        gravity_update(&mut v, -200, MAIN_HISTORY_D);
        assert!((v as i32).abs() <= MAIN_HISTORY_D);
        assert!((v as i32) < 5000);
    }

    #[test]
    fn update_quiet_stats_seeds_killer() {
        let mut history = HistoryTable::default();
        let mut stack = SearchStack::default();
        let m = Move::new_drop(PieceType::Pawn, Square::new(10));
        update_quiet_stats(&mut history, &mut stack, 0, Color::Black, m, stat_bonus(6), 6);
        assert_eq!(stack.get(0).killers[0], m);
        assert!(history.main_history(m, Color::Black) > 0);
    }
}
