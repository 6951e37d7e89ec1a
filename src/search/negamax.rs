//! The main search: negamax alpha-beta with null-move pruning, probcut, internal iterative
//! deepening, singular extensions, late-move reductions, futility and late-move pruning, all
//! monomorphized over the PV/non-PV distinction so the branch is decided at compile time.

use arrayvec::ArrayVec;

use crate::eval::evaluate;
use crate::position::moves::Move;
use crate::position::position::{Position, Repetition};
use crate::position::see::see_ge;
use crate::types::pieces::PieceType;

use super::history::{stat_bonus, update_all_node_bonus, update_all_stats, update_continuation_histories};
use super::move_picker::MovePicker;
use super::params::*;
use super::quiescence::qsearch;
use super::score::{self, Bound, KNOWN_WIN, MATE_IN_MAX_PLY};
use super::thread_pool::Worker;
use super::{SearchStack, PV};

/// Returns `true` if the caller should unwind immediately with a meaningless score: the
/// search was stopped mid-flight and its result must never be committed.
fn check_time(worker: &mut Worker) -> bool {
    worker.nodes.increment();
    worker.should_stop()
}

#[allow(clippy::too_many_arguments)]
pub fn negamax<const IS_PV: bool>(
    worker: &mut Worker,
    pos: &mut Position,
    stack: &mut SearchStack,
    pv: &mut PV,
    mut alpha: i32,
    mut beta: i32,
    depth: i32,
    ply: i32,
    cut_node: bool,
) -> i32 {
    debug_assert!(alpha < beta);
    debug_assert!(!IS_PV || !cut_node);

    pv.clear();

    if depth <= 0 {
        return qsearch::<IS_PV>(worker, pos, stack, alpha, beta, ply, 0);
    }

    if check_time(worker) {
        return score::ZERO;
    }

    let is_root = ply == 0;
    let us = pos.turn();

    if !is_root {
        match pos.is_draw(16, ply) {
            Repetition::Draw => return score::DRAW,
            Repetition::Win => return score::mate_in(ply),
            Repetition::Lose => return score::mated_in(ply),
            Repetition::Superior if ply != 2 => return MATE_IN_MAX_PLY,
            Repetition::Inferior if ply != 2 => return -MATE_IN_MAX_PLY,
            _ => {}
        }

        alpha = alpha.max(score::mated_in(ply));
        beta = beta.min(score::mate_in(ply + 1));
        if alpha >= beta {
            return alpha;
        }
    }

    super::history::clear_killers(stack, ply);
    let excluded_move = stack.get(ply).excluded_move;

    let tt_key = pos.key() ^ (if excluded_move.is_none() { 0 } else { (excluded_move.0 as u64) << 1 });
    let tt_entry = worker.tt.probe(tt_key, ply);
    let tt_move = tt_entry.map(|e| super::tt::decode_move(e.move16, pos)).unwrap_or(Move::NONE);
    let tt_pv = IS_PV || tt_entry.map(|e| e.is_pv).unwrap_or(false);

    if !IS_PV && excluded_move.is_none() {
        if let Some(e) = tt_entry {
            if e.depth >= depth {
                let cutoff = match e.bound {
                    Bound::Exact => true,
                    Bound::Lower => e.value >= beta,
                    Bound::Upper => e.value <= alpha,
                    Bound::None => false,
                };
                if cutoff {
                    if !tt_move.is_none() && e.value >= beta && !tt_move.is_capture_or_pawn_promotion() {
                        let bonus = stat_bonus(depth);
                        super::history::update_quiet_stats(&mut worker.history, stack, ply, us, tt_move, bonus, depth);
                    }
                    return e.value;
                }
            }
        }
    }

    let in_check = pos.in_check();
    let static_eval;
    let eval;

    if in_check {
        static_eval = score::NONE;
        eval = score::NONE;
    } else {
        static_eval = match tt_entry {
            Some(e) if e.eval != score::NOT_EVALUATED => e.eval,
            _ => evaluate(pos),
        };
        eval = match tt_entry {
            Some(e) if e.value != score::NONE => match e.bound {
                Bound::Exact => e.value,
                Bound::Lower if e.value > static_eval => e.value,
                Bound::Upper if e.value < static_eval => e.value,
                _ => static_eval,
            },
            _ => static_eval,
        };
    }
    if let Some(entry) = stack.at_mut(ply) {
        entry.static_eval = static_eval;
        entry.in_check = in_check;
    }

    if !in_check {
        if !is_root && depth == RAZORING_DEPTH && eval + RAZORING_MARGIN <= alpha {
            return qsearch::<false>(worker, pos, stack, alpha, alpha + 1, ply, 0);
        }
    }

    let improving = if in_check {
        false
    } else {
        let two_back = stack.at(ply - 2).map(|e| e.static_eval);
        match two_back {
            Some(e) if e != score::NOT_EVALUATED && e != score::NONE => static_eval > e,
            _ => {
                let four_back = stack.at(ply - 4).map(|e| e.static_eval);
                match four_back {
                    Some(e) if e != score::NOT_EVALUATED && e != score::NONE => static_eval > e,
                    _ => true,
                }
            }
        }
    };

    if !IS_PV && !in_check && depth < FUTILITY_MAX_DEPTH {
        let margin = FUTILITY_MARGIN_PER_PLY * (depth - improving as i32);
        if eval - margin >= beta && eval < KNOWN_WIN {
            return eval;
        }
    }

    let prev_move_was_null = stack.at(ply - 1).map(|e| e.current_move.is_none()).unwrap_or(true);
    let prev_stat_score = stack.at(ply - 1).map(|e| e.stat_score).unwrap_or(0);

    if !IS_PV
        && !in_check
        && excluded_move.is_none()
        && !prev_move_was_null
        && prev_stat_score < NULL_MOVE_STAT_SCORE_THRESHOLD
        && eval >= beta
        && eval >= static_eval
        && static_eval >= beta - NULL_MOVE_DEPTH_SCALE * depth - NULL_MOVE_IMPROVING_SCALE * (improving as i32)
            + NULL_MOVE_TT_PV_BONUS * (tt_pv as i32)
            + NULL_MOVE_EVAL_MARGIN
    {
        let r = (854 + 68 * depth) / 258 + ((eval - beta) / 192).min(3);
        let reduced = (depth - r).max(0);

        if let Some(entry) = stack.at_mut(ply) {
            entry.current_move = Move::NONE;
        }
        pos.do_null_move();
        let mut null_pv = PV::default();
        let null_score = -negamax::<false>(worker, pos, stack, &mut null_pv, -beta, -beta + 1, reduced, ply + 1, !cut_node);
        pos.undo_null_move();

        if null_score >= beta {
            if null_score >= MATE_IN_MAX_PLY {
                return beta;
            }
            if reduced < NULL_MOVE_VERIFY_DEPTH {
                return null_score;
            }
            let verify = negamax::<false>(worker, pos, stack, &mut PV::default(), beta - 1, beta, reduced, ply, false);
            if verify >= beta {
                return null_score;
            }
        }
    }

    if !IS_PV
        && !in_check
        && depth >= PROBCUT_MIN_DEPTH
        && beta.abs() < score::MATE_IN_MAX_PLY
    {
        let r_beta = beta + PROBCUT_MARGIN - PROBCUT_IMPROVING_SCALE * (improving as i32);
        let threshold = r_beta - static_eval;
        let tries = 2 + 2 * (cut_node as i32);
        let mut picker = MovePicker::new_probcut(pos, tt_move, threshold);
        let mut attempts = 0;
        while attempts < tries {
            let Some(m) = picker.next(pos, &worker.history, stack) else { break };
            if !pos.legality_check(m) {
                continue;
            }
            attempts += 1;
            if let Some(entry) = stack.at_mut(ply) {
                entry.current_move = m;
            }
            pos.do_move(m);
            let mut qscore = -qsearch::<false>(worker, pos, stack, -r_beta, -r_beta + 1, ply + 1, 0);
            if qscore >= r_beta {
                qscore = -negamax::<false>(
                    worker,
                    pos,
                    stack,
                    &mut PV::default(),
                    -r_beta,
                    -r_beta + 1,
                    depth - PROBCUT_DEPTH_REDUCTION,
                    ply + 1,
                    !cut_node,
                );
            }
            pos.undo_move(m);
            if qscore >= r_beta {
                return qscore;
            }
        }
    }

    let mut tt_move = tt_move;
    if depth >= IID_MIN_DEPTH && tt_move.is_none() {
        let mut iid_pv = PV::default();
        negamax::<IS_PV>(worker, pos, stack, &mut iid_pv, alpha, beta, depth - IID_DEPTH_REDUCTION, ply, cut_node);
        if let Some(e) = worker.tt.probe(tt_key, ply) {
            tt_move = super::tt::decode_move(e.move16, pos);
        }
    }

    let (prev_to, prev_piece) = counter_key(stack, ply);
    let counter_move = worker.history.counter_move(prev_to, prev_piece);
    let mut picker = MovePicker::new_main_search(pos, tt_move, counter_move, stack, ply, depth);

    let mut move_count = 0;
    let mut best_score = -score::INFINITE;
    let mut best_move = Move::NONE;
    let original_alpha = alpha;
    let mut quiets_tried: ArrayVec<Move, MAX_QUIETS_TRIED> = ArrayVec::new();
    let mut captures_tried: ArrayVec<Move, MAX_CAPTURES_TRIED> = ArrayVec::new();
    let mut singular_lmr = false;

    while let Some(m) = picker.next(pos, &worker.history, stack) {
        if m == excluded_move {
            continue;
        }
        if !pos.legality_check(m) {
            continue;
        }

        move_count += 1;
        if let Some(entry) = stack.at_mut(ply) {
            entry.move_count = move_count;
        }

        let gives_check = pos.gives_check(m);
        let capture_or_promo = m.is_capture_or_pawn_promotion();
        let new_depth = depth - score::ONE_PLY;

        let d = (depth / score::ONE_PLY) as i64;
        let move_count_pruning = !is_root
            && best_score > score::MATED_IN_MAX_PLY
            && (move_count as i64) >= (4 + d * d) / (2 - improving as i64);

        if !is_root && best_score > score::MATED_IN_MAX_PLY && !m.is_capture() {
            let base_reduction = worker.lmr.raw(move_count);
            let lmr_depth = (new_depth - base_reduction / score::ONE_PLY).max(0);

            if move_count_pruning && !gives_check {
                continue;
            }
            if lmr_depth < 6 * score::ONE_PLY
                && static_eval + 235 + 172 * lmr_depth <= alpha
                && !gives_check
            {
                continue;
            }
            let see_margin = -(32 - lmr_depth.min(18)) * lmr_depth * lmr_depth;
            if !gives_check && !see_ge(pos, m, see_margin) {
                continue;
            }
        } else if !is_root && best_score > score::MATED_IN_MAX_PLY && m.is_capture() {
            if !gives_check && !see_ge(pos, m, -51 * (d * d) as i32) {
                continue;
            }
        }

        let mut extension = 0;
        singular_lmr = false;

        if depth >= SINGULAR_MIN_DEPTH && m == tt_move && !is_root && excluded_move.is_none() {
            if let Some(e) = tt_entry {
                if e.value.abs() < KNOWN_WIN && e.bound == Bound::Lower && e.depth >= depth - SINGULAR_TT_DEPTH_MARGIN {
                    let former_pv = tt_pv as i32;
                    let singular_beta = e.value - (former_pv + 4) * depth / 2;
                    let singular_depth = (depth - score::ONE_PLY + 3 * former_pv * score::ONE_PLY) / 2;

                    if let Some(entry) = stack.at_mut(ply) {
                        entry.excluded_move = m;
                    }
                    let singular_score = negamax::<false>(
                        worker,
                        pos,
                        stack,
                        &mut PV::default(),
                        singular_beta - 1,
                        singular_beta,
                        singular_depth,
                        ply,
                        cut_node,
                    );
                    if let Some(entry) = stack.at_mut(ply) {
                        entry.excluded_move = Move::NONE;
                    }

                    if singular_score < singular_beta {
                        extension = score::ONE_PLY;
                        singular_lmr = true;
                    } else if singular_beta >= beta {
                        return singular_beta;
                    } else if e.value >= beta {
                        let re_search = negamax::<false>(
                            worker,
                            pos,
                            stack,
                            &mut PV::default(),
                            beta - 1,
                            beta,
                            (depth + 3 * score::ONE_PLY) / 2,
                            ply,
                            cut_node,
                        );
                        if re_search >= beta {
                            return beta;
                        }
                    }
                }
            }
        }
        if extension == 0 && gives_check && see_ge(pos, m, 0) {
            extension = score::ONE_PLY;
        }
        // Folded in before the LMR/full-depth searches below, so singular and check
        // extensions apply regardless of which branch a move's search takes.
        let new_depth = new_depth + extension;

        let breadcrumb = worker.breadcrumbs.hold(pos.key(), worker.id, ply);
        let marked = breadcrumb.marked();

        let quiet_stat_score = if m.is_capture() {
            0
        } else {
            worker.history.main_history(m, us) + super::history::continuation_history_stat_score(&worker.history, stack, ply, m.piece_type_from(), m.to()) - STAT_SCORE_OFFSET
        };
        if let Some(entry) = stack.at_mut(ply) {
            entry.current_move = m;
            entry.stat_score = quiet_stat_score;
        }
        pos.do_move(m);

        let mut child_pv = PV::default();
        let mut score;
        let mut did_lmr = false;

        if depth >= LMR_MIN_DEPTH && move_count > 1 + 2 * (is_root as i32) {
            let i = move_count.max(1);
            let r_base = worker.lmr.raw(i);
            let r_depth = worker.lmr.raw((d.max(1)) as i32);
            let mut r = ((r_depth * r_base + 511) / 1024 + ((!improving && r_depth * r_base > 1007) as i32)) * score::ONE_PLY;

            if tt_pv {
                r -= 2;
            }
            if marked {
                r += 1;
            }
            if move_count as i64 >= (4 + d * d) / (2 - improving as i64) {
                r += 1;
            }
            if singular_lmr {
                r -= 1 + tt_pv as i32;
            }

            if !m.is_capture() {
                if tt_move.is_capture() {
                    r += 1;
                }
                if cut_node {
                    r += 2;
                }
                r -= quiet_stat_score / STAT_SCORE_DIVISOR;
            } else {
                if (d as i32) < 8 && move_count > 2 {
                    r += 1;
                }
            }

            let reduced_depth = (new_depth - r).clamp(score::ONE_PLY, new_depth);
            score = -negamax::<false>(worker, pos, stack, &mut child_pv, -(alpha + 1), -alpha, reduced_depth, ply + 1, true);

            if score > alpha && reduced_depth != new_depth {
                did_lmr = true;
                score = -negamax::<false>(worker, pos, stack, &mut child_pv, -(alpha + 1), -alpha, new_depth, ply + 1, !cut_node);
            }
        } else if !IS_PV || move_count > 1 {
            let search_depth = new_depth;
            if search_depth < score::ONE_PLY {
                score = -qsearch::<false>(worker, pos, stack, -(alpha + 1), -alpha, ply + 1, 0);
            } else {
                score = -negamax::<false>(worker, pos, stack, &mut child_pv, -(alpha + 1), -alpha, search_depth, ply + 1, !cut_node);
            }
        } else {
            score = alpha + 1;
        }

        if IS_PV && (move_count == 1 || (score > alpha && score < beta)) {
            score = -negamax::<true>(worker, pos, stack, &mut child_pv, -beta, -alpha, new_depth, ply + 1, false);
        }

        if did_lmr && !m.is_capture() {
            let bonus = if score > alpha { stat_bonus(new_depth) } else { -stat_bonus(new_depth) };
            update_continuation_histories(&mut worker.history, stack, ply, m.piece_type_from(), m.to(), bonus);
        }

        pos.undo_move(m);
        drop(breadcrumb);
        if worker.halted() {
            return score::ZERO;
        }

        if !m.is_capture_or_pawn_promotion() && quiets_tried.len() < MAX_QUIETS_TRIED {
            quiets_tried.push(m);
        } else if capture_or_promo && captures_tried.len() < MAX_CAPTURES_TRIED {
            captures_tried.push(m);
        }

        if is_root {
            worker.best_score = worker.best_score.max(score);
        }

        if score > best_score {
            best_score = score;
            if score > alpha {
                best_move = m;
                if IS_PV {
                    pv.update(m, &child_pv);
                }
                if IS_PV && score < beta {
                    alpha = score;
                } else {
                    debug_assert!(score >= beta);
                    break;
                }
            }
        }
    }

    if move_count == 0 {
        return if !excluded_move.is_none() { alpha } else { score::mated_in(ply) };
    }

    if !best_move.is_none() {
        update_all_stats(
            &mut worker.history,
            stack,
            ply,
            us,
            best_move,
            best_score,
            beta,
            depth,
            &quiets_tried,
            &captures_tried,
        );
    } else if depth >= 3 * score::ONE_PLY || IS_PV {
        update_all_node_bonus(&mut worker.history, stack, ply, depth, IS_PV);
    }

    if excluded_move.is_none() {
        let bound = if best_score >= beta {
            Bound::Lower
        } else if IS_PV && best_score > original_alpha {
            Bound::Exact
        } else {
            Bound::Upper
        };
        worker.tt.store(pos.key(), best_move, best_score, static_eval, depth, bound, tt_pv, ply);
    }

    if is_root {
        worker.best_move = best_move;
    }

    best_score
}

/// The `(to, piece)` of the previous ply's move, the key `counterMoves` is indexed by.
fn counter_key(stack: &SearchStack, ply: i32) -> (crate::types::square::Square, PieceType) {
    match stack.at(ply - 1) {
        Some(e) if !e.current_move.is_none() => (e.current_move.to(), e.current_move.piece_type_from()),
        _ => (crate::types::square::Square::new(0), PieceType::None),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::position::position::Position;
    use crate::search::breadcrumbs::Breadcrumbs;
    use crate::search::lmr_table::LmrTable;
    use crate::search::tt::TranspositionTable;
    use crate::search::SearchType;
    use crate::search::time_manager::TimeManager;
    use std::sync::atomic::{AtomicBool, AtomicU64};

    #[test]
    fn negamax_finds_a_move_at_shallow_depth() {
        let tt = TranspositionTable::new(1);
        let lmr = LmrTable::new(1);
        let breadcrumbs = Breadcrumbs::new();
        let global_nodes = AtomicU64::new(0);
        let halt = AtomicBool::new(false);
        let mut worker = Worker::new(0, &tt, &lmr, &breadcrumbs, &global_nodes, &halt, SearchType::Depth, TimeManager::infinite());
        let mut pos = Position::startpos();
        let mut stack = SearchStack::default();
        let mut pv = PV::default();

        let score = negamax::<true>(&mut worker, &mut pos, &mut stack, &mut pv, -score::INFINITE, score::INFINITE, 2 * score::ONE_PLY, 0, false);
        assert!(score.abs() < score::INFINITE);
        assert!(!pv.best_move().is_none());
    }
}
