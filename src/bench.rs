//! A fixed-depth benchmark: searches the starting position to a set depth with a single
//! thread and reports nodes searched and nodes-per-second, for comparing runs across changes.

use std::time::Instant;

use crate::position::position::Position;
use crate::search::thread_pool::ThreadPool;
use crate::search::time_manager::TimeManager;
use crate::search::{iterative_deepening, SearchType};

const BENCH_DEPTH: i32 = 12;
const BENCH_HASH_MB: usize = 16;

pub fn bench() {
    let pos = Position::startpos();
    let mut pool = ThreadPool::new(BENCH_HASH_MB, 1);

    let start = Instant::now();
    let best = iterative_deepening::start_thinking(&mut pool, &pos, BENCH_DEPTH, SearchType::Depth, TimeManager::infinite());
    let elapsed = start.elapsed();

    let nodes = pool.nodes_searched();
    let nps = if elapsed.as_secs_f64() > 0.0 { (nodes as f64 / elapsed.as_secs_f64()) as u64 } else { 0 };

    println!("bestmove {best:?}");
    println!("depth {BENCH_DEPTH}");
    println!("nodes {nodes}");
    println!("time {}ms", elapsed.as_millis());
    println!("nps {nps}");
}
