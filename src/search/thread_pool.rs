//! Lazy-SMP worker coordination: one `Worker` per search thread, sharing a transposition
//! table, reduction table, and breadcrumb table, but each keeping its own history statistics
//! and node count.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;

use crate::position::moves::Move;
use crate::position::position::Position;

use super::breadcrumbs::Breadcrumbs;
use super::history::HistoryTable;
use super::lmr_table::LmrTable;
use super::time_manager::TimeManager;
use super::tt::TranspositionTable;
use super::SearchType;

/// How many nodes a worker counts locally before folding them into the shared total. Cuts
/// contention on the global counter to one fetch_add per batch instead of one per node.
const NODE_BATCH: u64 = 1024;

/// A node counter that batches its contribution to a shared atomic total, so every worker
/// isn't hammering the same cache line on every leaf.
pub struct AtomicCounter<'a> {
    local: u64,
    global: &'a AtomicU64,
}

impl<'a> AtomicCounter<'a> {
    pub fn new(global: &'a AtomicU64) -> Self {
        AtomicCounter { local: 0, global }
    }

    pub fn increment(&mut self) {
        self.local += 1;
        if self.local >= NODE_BATCH {
            self.flush();
        }
    }

    fn flush(&mut self) {
        self.global.fetch_add(self.local, Ordering::Relaxed);
        self.local = 0;
    }

    /// Total nodes searched across every worker, including this one's unflushed batch.
    pub fn global_count(&self) -> u64 {
        self.global.load(Ordering::Relaxed) + self.local
    }

    /// True every `NODE_BATCH` nodes, the natural point to also check the clock and the halt
    /// flag without paying for a syscall on every node.
    pub fn at_check_interval(&self) -> bool {
        self.local == 0
    }
}

impl Drop for AtomicCounter<'_> {
    fn drop(&mut self) {
        self.flush();
    }
}

/// Per-thread search state: history tables, node counter, and the handful of scalars
/// `iterative_deepening` reads back after each completed depth.
pub struct Worker<'a> {
    pub id: usize,
    pub tt: &'a TranspositionTable,
    pub lmr: &'a LmrTable,
    pub breadcrumbs: &'a Breadcrumbs,
    pub history: HistoryTable,
    pub nodes: AtomicCounter<'a>,

    pub sel_depth: i32,
    pub root_depth: i32,
    pub best_move: Move,
    pub best_score: i32,

    pub search_type: SearchType,
    pub time_manager: TimeManager,
    pub search_start: Instant,
    halt: &'a AtomicBool,
}

impl<'a> Worker<'a> {
    pub fn new(
        id: usize,
        tt: &'a TranspositionTable,
        lmr: &'a LmrTable,
        breadcrumbs: &'a Breadcrumbs,
        global_nodes: &'a AtomicU64,
        halt: &'a AtomicBool,
        search_type: SearchType,
        time_manager: TimeManager,
    ) -> Self {
        Worker {
            id,
            tt,
            lmr,
            breadcrumbs,
            history: HistoryTable::default(),
            nodes: AtomicCounter::new(global_nodes),
            sel_depth: 0,
            root_depth: 0,
            best_move: Move::NONE,
            best_score: super::score::NONE,
            search_type,
            time_manager,
            search_start: Instant::now(),
            halt,
        }
    }

    pub fn is_main(&self) -> bool {
        self.id == 0
    }

    pub fn halted(&self) -> bool {
        self.halt.load(Ordering::Relaxed)
    }

    pub fn set_halt(&self, value: bool) {
        self.halt.store(value, Ordering::Relaxed);
    }

    /// Called periodically from inside the search, at `NODE_BATCH` granularity, to decide
    /// whether this thread should unwind. Only the main thread evaluates soft time limits;
    /// every thread honors a hard stop or the externally-set halt flag.
    pub fn should_stop(&mut self) -> bool {
        if self.halted() {
            return true;
        }
        if !self.nodes.at_check_interval() {
            return false;
        }
        match self.search_type {
            SearchType::Depth => false,
            SearchType::Infinite => false,
            SearchType::Time => {
                let stop = self.time_manager.hard_termination(self.search_start);
                if stop {
                    self.set_halt(true);
                }
                stop
            }
        }
    }

    pub fn reset_for_new_search(&mut self, search_type: SearchType, time_manager: TimeManager) {
        self.sel_depth = 0;
        self.best_move = Move::NONE;
        self.best_score = super::score::NONE;
        self.search_type = search_type;
        self.time_manager = time_manager;
        self.search_start = Instant::now();
        self.set_halt(false);
    }
}

/// Owns the shared tables (TT, reduction table, breadcrumbs) and the per-worker state for a
/// Lazy-SMP search. Thread spawning itself lives in `iterative_deepening`, which drives each
/// `Worker` to a common depth policy (`skip_size`/`skip_phase`); this struct only owns what
/// must outlive and be shared across those threads.
pub struct ThreadPool {
    pub tt: TranspositionTable,
    pub lmr: LmrTable,
    pub breadcrumbs: Breadcrumbs,
    pub global_nodes: AtomicU64,
    pub halt: AtomicBool,
    pub num_threads: usize,
}

impl ThreadPool {
    pub fn new(hash_mb: usize, num_threads: usize) -> Self {
        ThreadPool {
            tt: TranspositionTable::new(hash_mb),
            lmr: LmrTable::new(num_threads),
            breadcrumbs: Breadcrumbs::new(),
            global_nodes: AtomicU64::new(0),
            halt: AtomicBool::new(false),
            num_threads,
        }
    }

    pub fn resize_threads(&mut self, num_threads: usize) {
        self.num_threads = num_threads.max(1);
        self.lmr = LmrTable::new(self.num_threads);
    }

    pub fn new_search(&self) {
        self.tt.new_search();
        self.global_nodes.store(0, Ordering::Relaxed);
        self.halt.store(false, Ordering::Relaxed);
    }

    pub fn stop(&self) {
        self.halt.store(true, Ordering::Relaxed);
    }

    pub fn nodes_searched(&self) -> u64 {
        self.global_nodes.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn counter_flushes_in_batches() {
        let global = AtomicU64::new(0);
        {
            let mut counter = AtomicCounter::new(&global);
            for _ in 0..NODE_BATCH {
                counter.increment();
            }
        }
        assert_eq!(global.load(Ordering::Relaxed), NODE_BATCH);
    }

    #[test]
    fn worker_halts_when_flag_set() {
        let pool = ThreadPool::new(1, 1);
        let tm = TimeManager::infinite();
        let mut worker = Worker::new(0, &pool.tt, &pool.lmr, &pool.breadcrumbs, &pool.global_nodes, &pool.halt, SearchType::Infinite, tm);
        pool.stop();
        assert!(worker.should_stop());
    }
}
