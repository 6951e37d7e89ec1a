//! The iterative-deepening driver: walks each worker from depth 1 upward with aspiration
//! windows around the previous iteration's score, applies the Lazy-SMP depth-skip schedule
//! to every worker but the main one, and (once every worker has returned) lets the main
//! thread vote for the best root move across workers.

use std::thread;

use crate::position::position::Position;
use crate::position::moves::Move;

use super::score::{self, MATE_IN_MAX_PLY};
use super::thread_pool::{ThreadPool, Worker};
use super::{SearchStack, SearchType, PV};

/// Lazy-SMP depth-skip schedule (worker index modulo 20): a worker whose `(depth + game_ply +
/// skip_phase[i]) / skip_size[i]` is odd sits out that depth entirely, spreading workers
/// across a range of depths instead of all plowing through the same one.
const SKIP_SIZE: [i32; 20] = [1, 1, 2, 2, 2, 2, 3, 3, 3, 3, 3, 3, 4, 4, 4, 4, 4, 4, 4, 4];
const SKIP_PHASE: [i32; 20] = [0, 1, 0, 1, 2, 3, 0, 1, 2, 3, 4, 5, 0, 1, 2, 3, 4, 5, 6, 7];

const ASPIRATION_MIN_DEPTH: i32 = 5 * score::ONE_PLY;
const ASPIRATION_INITIAL_DELTA: i32 = 21;

fn skip_this_depth(worker_idx: usize, root_depth: i32, game_ply: u32) -> bool {
    if worker_idx == 0 {
        return false;
    }
    let i = (worker_idx - 1) % 20;
    let phase = (root_depth / score::ONE_PLY + game_ply as i32 + SKIP_PHASE[i]) / SKIP_SIZE[i];
    phase % 2 == 1
}

/// The result of one worker's iterative-deepening run, enough for the best-thread vote.
pub struct SearchResult {
    pub best_move: Move,
    pub score: i32,
    pub completed_depth: i32,
}

/// Drives a single worker from depth 1 to `max_depth`, widening an aspiration window around
/// each depth's previous score once the search is deep enough for the window to pay for
/// itself. Returns the deepest completed iteration's move and score.
pub fn run(worker: &mut Worker, pos: &mut Position, max_depth: i32) -> SearchResult {
    let mut stack = SearchStack::default();
    let mut pv = PV::default();
    let mut previous_score = -score::INFINITE;
    let mut best_move = Move::NONE;
    let mut best_score = -score::INFINITE;
    let mut completed_depth = 0;

    let mut root_depth = score::ONE_PLY;
    while root_depth <= max_depth * score::ONE_PLY {
        if worker.halted() {
            break;
        }
        if skip_this_depth(worker.id, root_depth, pos.game_ply()) {
            root_depth += score::ONE_PLY;
            continue;
        }
        worker.root_depth = root_depth;
        worker.sel_depth = 0;

        let score = if root_depth >= ASPIRATION_MIN_DEPTH {
            aspiration_search(worker, pos, &mut stack, &mut pv, root_depth, previous_score)
        } else {
            super::negamax::negamax::<true>(worker, pos, &mut stack, &mut pv, -score::INFINITE, score::INFINITE, root_depth, 0, false)
        };

        if worker.halted() && root_depth > score::ONE_PLY {
            break;
        }

        previous_score = score;
        best_score = score;
        if !pv.best_move().is_none() {
            best_move = pv.best_move();
        }
        completed_depth = root_depth / score::ONE_PLY;

        if worker.is_main() {
            log::info!(
                "depth {} nodes {} score {} pv {}",
                completed_depth,
                worker.nodes.global_count(),
                format_score(best_score),
                format_pv(&pv),
            );
        }

        root_depth += score::ONE_PLY;
    }

    worker.best_move = best_move;
    worker.best_score = best_score;
    SearchResult { best_move, score: best_score, completed_depth }
}

/// Searches one depth with a narrow window around `previous_score`, widening on fail-high or
/// fail-low until the true score is bracketed, per the usual aspiration-window protocol.
fn aspiration_search(worker: &mut Worker, pos: &mut Position, stack: &mut SearchStack, pv: &mut PV, root_depth: i32, previous_score: i32) -> i32 {
    let mut delta = ASPIRATION_INITIAL_DELTA;
    let mut alpha = (previous_score - delta).max(-score::INFINITE);
    let mut beta = (previous_score + delta).min(score::INFINITE);
    let mut depth = root_depth;

    loop {
        let score = super::negamax::negamax::<true>(worker, pos, stack, pv, alpha, beta, depth, 0, false);

        if worker.halted() {
            return score;
        }

        if score <= alpha {
            beta = (alpha + beta) / 2;
            alpha = (score - delta).max(-score::INFINITE);
            depth = root_depth;
        } else if score >= beta {
            beta = (score + delta).min(score::INFINITE);
            depth = (depth - score::ONE_PLY).max(root_depth - 4 * score::ONE_PLY);
        } else {
            return score;
        }

        delta += delta / 4 + 5;
    }
}

fn format_score(score: i32) -> String {
    if score >= MATE_IN_MAX_PLY {
        format!("mate {}", (super::score::MATE_0_PLY - score + 1) / 2)
    } else if score <= -MATE_IN_MAX_PLY {
        format!("mate {}", -(super::score::MATE_0_PLY + score) / 2)
    } else {
        format!("cp {score}")
    }
}

fn format_pv(pv: &PV) -> String {
    pv.line.iter().map(|m| format!("{m:?}")).collect::<Vec<_>>().join(" ")
}

/// Runs every worker's iterative-deepening loop to completion (or until `halt` is set) and
/// picks the winner. Workers other than the main one search silently; only the main thread's
/// progress is logged.
pub fn start_thinking(pool: &mut ThreadPool, pos: &Position, max_depth: i32, search_type: SearchType, time_manager: super::time_manager::TimeManager) -> Move {
    pool.new_search();

    let results: Vec<SearchResult> = thread::scope(|scope| {
        let handles: Vec<_> = (0..pool.num_threads)
            .map(|id| {
                let tt = &pool.tt;
                let lmr = &pool.lmr;
                let breadcrumbs = &pool.breadcrumbs;
                let global_nodes = &pool.global_nodes;
                let halt = &pool.halt;
                let mut worker_pos = pos.clone();
                let tm = time_manager;
                scope.spawn(move || {
                    let mut worker = Worker::new(id, tt, lmr, breadcrumbs, global_nodes, halt, search_type, tm);
                    run(&mut worker, &mut worker_pos, max_depth)
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().expect("worker thread panicked")).collect()
    });

    pool.halt.store(true, std::sync::atomic::Ordering::Relaxed);
    pick_best_thread(&results)
}

/// Best-thread voting: prefer the shortest mate found by any worker; failing that, the move
/// with the highest `(score - min_score + 14) * completed_depth` vote total across workers
/// that agree on it.
fn pick_best_thread(results: &[SearchResult]) -> Move {
    if let Some(mate) = results
        .iter()
        .filter(|r| r.score >= MATE_IN_MAX_PLY)
        .max_by_key(|r| r.score)
    {
        return mate.best_move;
    }

    let min_score = results.iter().map(|r| r.score).min().unwrap_or(-score::INFINITE);
    let mut votes: std::collections::HashMap<u32, i64> = std::collections::HashMap::new();
    for r in results {
        if r.best_move.is_none() {
            continue;
        }
        let vote = (r.score - min_score + 14) as i64 * r.completed_depth as i64;
        *votes.entry(r.best_move.0).or_insert(0) += vote;
    }
    votes
        .into_iter()
        .max_by_key(|&(_, v)| v)
        .map(|(bits, _)| Move(bits))
        .unwrap_or(Move::NONE)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn skip_schedule_lets_main_thread_always_search() {
        for depth in 1..30 {
            assert!(!skip_this_depth(0, depth, 0));
        }
    }

    #[test]
    fn best_thread_prefers_shorter_mate() {
        let short_mate = SearchResult { best_move: Move::new_drop(crate::types::pieces::PieceType::Pawn, crate::types::square::Square::new(5)), score: score::mate_in(3), completed_depth: 10 };
        let long_mate = SearchResult { best_move: Move::new_drop(crate::types::pieces::PieceType::Pawn, crate::types::square::Square::new(6)), score: score::mate_in(7), completed_depth: 10 };
        let chosen = pick_best_thread(&[long_mate, short_mate]);
        assert_eq!(chosen, Move::new_drop(crate::types::pieces::PieceType::Pawn, crate::types::square::Square::new(5)));
    }
}
