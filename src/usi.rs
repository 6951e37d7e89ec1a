//! The USI (Universal Shogi Interface) front-end: a stdin/stdout loop that speaks the
//! protocol a GUI drives an engine with. Board setup, move notation, and move generation
//! are handled here only as thin glue around `Position`; the engine proper lives in `search`.

use std::io;
use std::sync::atomic::Ordering;
use std::time::Duration;

use itertools::Itertools;

use crate::position::moves::Move;
use crate::position::position::Position;
use crate::search::thread_pool::ThreadPool;
use crate::search::time_manager::TimeManager;
use crate::search::{iterative_deepening, SearchType};
use crate::types::pieces::{Color, PieceType};
use crate::types::square::Square;

const DEFAULT_HASH_MB: usize = 16;
const DEFAULT_THREADS: usize = 1;
const DEFAULT_MAX_DEPTH: i32 = 64;

/// Renders a move the way a USI GUI expects to read it: `7g7f`, `7g7f+`, or `P*5e`.
fn move_to_usi(m: Move) -> String {
    if m.is_none() {
        return "resign".to_string();
    }
    if m.is_drop() {
        let letter = match m.piece_type_from() {
            PieceType::Pawn => 'P',
            PieceType::Lance => 'L',
            PieceType::Knight => 'N',
            PieceType::Silver => 'S',
            PieceType::Gold => 'G',
            PieceType::Bishop => 'B',
            PieceType::Rook => 'R',
            other => unreachable!("undroppable piece type in drop move: {other:?}"),
        };
        format!("{letter}*{}", m.to())
    } else {
        format!("{}{}{}", m.from(), m.to(), if m.is_promotion() { "+" } else { "" })
    }
}

/// Parses a USI square token (`"5e"`) into the board's internal square numbering.
fn parse_usi_square(token: &str) -> Option<Square> {
    let bytes = token.as_bytes();
    if bytes.len() != 2 {
        return None;
    }
    let file_digit = (bytes[0] as char).to_digit(10)?;
    if !(1..=9).contains(&file_digit) {
        return None;
    }
    let rank_letter = bytes[1];
    if !(b'a'..=b'i').contains(&rank_letter) {
        return None;
    }
    let file = 9 - file_digit as u8;
    let rank = rank_letter - b'a';
    Some(Square::from_file_rank(file, rank))
}

/// Matches a USI move token against the position's legal moves. Generates every pseudo-legal
/// move reachable from the current position (evasions if in check, else captures/promotions
/// and quiets) and keeps the one whose own USI rendering matches, filtering through
/// `legality_check` so only a genuinely legal move is returned.
fn parse_usi_move(pos: &mut Position, token: &str) -> Option<Move> {
    let candidates: Vec<Move> = if pos.in_check() {
        pos.generate_evasions().iter().map(|e| e.m).collect()
    } else {
        pos.generate_captures_and_promotions()
            .iter()
            .chain(pos.generate_quiets().iter())
            .map(|e| e.m)
            .collect()
    };
    candidates
        .into_iter()
        .find(|&m| move_to_usi(m) == token && pos.legality_check(m))
}

fn apply_usi_moves(pos: &mut Position, tokens: &[&str]) {
    for token in tokens {
        match parse_usi_move(pos, token) {
            Some(m) => pos.do_move(m),
            None => {
                log::warn!("ignoring unrecognized or illegal move token: {token}");
                return;
            }
        }
    }
}

struct Engine {
    pool: ThreadPool,
    pos: Position,
}

impl Engine {
    fn new() -> Self {
        Engine { pool: ThreadPool::new(DEFAULT_HASH_MB, DEFAULT_THREADS), pos: Position::startpos() }
    }

    fn handle_position(&mut self, tokens: &[&str]) {
        if tokens.is_empty() {
            return;
        }
        let (mut pos, rest) = match tokens[0] {
            "startpos" => (Position::startpos(), &tokens[1..]),
            "sfen" => {
                log::warn!("sfen board setup is not implemented; keeping current position");
                (self.pos.clone(), &tokens[tokens.len()..])
            }
            _ => return,
        };
        if let Some(idx) = rest.iter().position(|&t| t == "moves") {
            apply_usi_moves(&mut pos, &rest[idx + 1..]);
        }
        self.pos = pos;
    }

    fn handle_go(&mut self, tokens: &[&str]) {
        let mut max_depth = DEFAULT_MAX_DEPTH;
        let mut movetime: Option<Duration> = None;
        let mut time_remaining = [Duration::ZERO, Duration::ZERO];
        let mut time_inc = [Duration::ZERO, Duration::ZERO];
        let mut movestogo = 0;
        let mut search_type = SearchType::Time;

        for (key, value) in tokens.iter().tuple_windows::<(_, _)>() {
            match *key {
                "depth" => {
                    if let Ok(d) = value.parse() {
                        max_depth = d;
                        search_type = SearchType::Depth;
                    }
                }
                "movetime" => {
                    if let Ok(ms) = value.parse() {
                        movetime = Some(Duration::from_millis(ms));
                        search_type = SearchType::Time;
                    }
                }
                "btime" => {
                    if let Ok(ms) = value.parse() {
                        time_remaining[Color::Black.idx()] = Duration::from_millis(ms);
                    }
                }
                "wtime" => {
                    if let Ok(ms) = value.parse() {
                        time_remaining[Color::White.idx()] = Duration::from_millis(ms);
                    }
                }
                "binc" => {
                    if let Ok(ms) = value.parse() {
                        time_inc[Color::Black.idx()] = Duration::from_millis(ms);
                    }
                }
                "winc" => {
                    if let Ok(ms) = value.parse() {
                        time_inc[Color::White.idx()] = Duration::from_millis(ms);
                    }
                }
                "movestogo" => {
                    if let Ok(n) = value.parse() {
                        movestogo = n;
                    }
                }
                _ => {}
            }
        }
        if tokens.iter().any(|&t| t == "infinite") {
            search_type = SearchType::Infinite;
        }

        let time_manager = match search_type {
            SearchType::Infinite | SearchType::Depth => TimeManager::infinite(),
            SearchType::Time => match movetime {
                Some(mt) => TimeManager::fixed_movetime(mt),
                None => TimeManager::from_clock(time_remaining, time_inc, movestogo, self.pos.turn(), self.pos.game_ply() as usize),
            },
        };

        let best = iterative_deepening::start_thinking(&mut self.pool, &self.pos, max_depth, search_type, time_manager);
        println!("bestmove {}", move_to_usi(best));
    }
}

/// Runs the USI protocol loop to completion; returns only on `quit` or end of input.
pub fn main_loop() {
    let mut engine = Engine::new();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        if io::stdin().read_line(&mut buffer).unwrap_or(0) == 0 {
            return;
        }
        let line = buffer.trim();
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some(&command) = tokens.first() else { continue };

        match command {
            "usi" => {
                println!("id name Gyokuza");
                println!("id author the gyokuza authors");
                println!("option name Hash type spin default {DEFAULT_HASH_MB} min 1 max 33554432");
                println!("option name Threads type spin default {DEFAULT_THREADS} min 1 max 512");
                println!("usiok");
            }
            "isready" => println!("readyok"),
            "setoption" => {
                if tokens.len() >= 5 && tokens[1] == "name" {
                    let name = tokens[2];
                    let value = tokens[4];
                    match name {
                        "Hash" => {
                            if let Ok(mb) = value.parse() {
                                engine.pool = ThreadPool::new(mb, engine.pool.num_threads);
                            }
                        }
                        "Threads" => {
                            if let Ok(n) = value.parse::<usize>() {
                                engine.pool.resize_threads(n);
                            }
                        }
                        _ => {}
                    }
                }
            }
            "usinewgame" => {
                engine.pos = Position::startpos();
                engine.pool.new_search();
            }
            "position" => engine.handle_position(&tokens[1..]),
            "go" => engine.handle_go(&tokens[1..]),
            "stop" => engine.pool.halt.store(true, Ordering::Relaxed),
            "quit" => return,
            _ => log::debug!("unhandled command: {line}"),
        }
    }
}
