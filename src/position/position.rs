use crate::types::bitboard::Bitboard;
use crate::types::pieces::{Color, Piece, PieceType};
use crate::types::square::{Square, NUM_SQUARES};

use super::attacks::{has_further_moves, in_promotion_zone, piece_destinations};
use super::hand::Hand;
use super::moves::Move;
use super::movelist::MoveList;
use super::zobrist::ZOBRIST;

#[derive(Clone, Copy)]
struct HistoryEntry {
    m: Move,
    key: u64,
    board_key: u64,
    hands: [Hand; 2],
    gave_check: bool,
}

/// The board collaborator: mailbox + per-color occupancy bitboards, pieces in hand, and the
/// make/unmake, legality, and repetition machinery the search core treats as a black box.
#[derive(Clone)]
pub struct Position {
    board: [Piece; NUM_SQUARES],
    occupancy: [Bitboard; 2],
    hands: [Hand; 2],
    turn: Color,
    game_ply: u32,
    key: u64,
    board_key: u64,
    history: Vec<HistoryEntry>,
}

/// Outcome of a repetition check, mirroring the source's six-way classification.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Repetition {
    NotRepetition,
    Draw,
    Win,
    Lose,
    Superior,
    Inferior,
}

impl Position {
    pub fn empty() -> Self {
        Position {
            board: [Piece::NONE; NUM_SQUARES],
            occupancy: [Bitboard::EMPTY; 2],
            hands: [Hand::default(); 2],
            turn: Color::Black,
            game_ply: 0,
            key: ZOBRIST.turn(),
            board_key: ZOBRIST.turn(),
            history: Vec::with_capacity(256),
        }
    }

    /// The standard shogi starting array.
    pub fn startpos() -> Self {
        let mut pos = Position::empty();
        let back_rank = [
            PieceType::Lance,
            PieceType::Knight,
            PieceType::Silver,
            PieceType::Gold,
            PieceType::King,
            PieceType::Gold,
            PieceType::Silver,
            PieceType::Knight,
            PieceType::Lance,
        ];
        for (file, &pt) in back_rank.iter().enumerate() {
            pos.place(Square::from_file_rank(file as u8, 0), Piece::new(pt, Color::White));
            pos.place(Square::from_file_rank(file as u8, 8), Piece::new(pt, Color::Black));
        }
        pos.place(Square::from_file_rank(1, 1), Piece::new(PieceType::Rook, Color::White));
        pos.place(Square::from_file_rank(7, 1), Piece::new(PieceType::Bishop, Color::White));
        pos.place(Square::from_file_rank(1, 7), Piece::new(PieceType::Bishop, Color::Black));
        pos.place(Square::from_file_rank(7, 7), Piece::new(PieceType::Rook, Color::Black));
        for file in 0..9 {
            pos.place(Square::from_file_rank(file, 2), Piece::new(PieceType::Pawn, Color::White));
            pos.place(Square::from_file_rank(file, 6), Piece::new(PieceType::Pawn, Color::Black));
        }
        pos.turn = Color::Black;
        pos.key = pos.recompute_key();
        pos.board_key = pos.recompute_board_key();
        pos
    }

    fn place(&mut self, sq: Square, piece: Piece) {
        self.board[sq] = piece;
        self.occupancy[piece.color().idx()].set_bit(sq);
    }

    fn recompute_key(&self) -> u64 {
        let mut key = if self.turn == Color::White { ZOBRIST.turn() } else { 0 };
        for sq in Square::iter() {
            let p = self.board[sq];
            if p != Piece::NONE {
                key ^= ZOBRIST.piece_on_square(p, sq);
            }
        }
        for color in Color::iter() {
            key ^= ZOBRIST.full_hand_hash(color, self.hands[color.idx()]);
        }
        key
    }

    fn recompute_board_key(&self) -> u64 {
        let mut key = if self.turn == Color::White { ZOBRIST.turn() } else { 0 };
        for sq in Square::iter() {
            let p = self.board[sq];
            if p != Piece::NONE {
                key ^= ZOBRIST.piece_on_square(p, sq);
            }
        }
        key
    }

    pub fn key(&self) -> u64 {
        self.key
    }

    pub fn turn(&self) -> Color {
        self.turn
    }

    pub fn game_ply(&self) -> u32 {
        self.game_ply
    }

    pub fn piece(&self, sq: Square) -> Piece {
        self.board[sq]
    }

    pub fn hand(&self, color: Color) -> Hand {
        self.hands[color.idx()]
    }

    pub fn moved_piece(&self) -> PieceType {
        self.history.last().map_or(PieceType::None, |h| h.m.piece_type_from())
    }

    pub fn captured_piece(&self) -> PieceType {
        self.history.last().map_or(PieceType::None, |h| h.m.captured_piece_type())
    }

    fn king_square(&self, color: Color) -> Square {
        Square::iter()
            .find(|&sq| self.board[sq] == Piece::new(PieceType::King, color))
            .expect("every legal position has both kings on the board")
    }

    /// Whether `attacker`'s side attacks `sq`, scanning the mailbox directly rather than
    /// maintaining attack bitboards (the board representation is out of this engine's scope).
    pub fn attacked_by(&self, sq: Square, attacker: Color) -> bool {
        for from in Square::iter() {
            let p = self.board[from];
            if p == Piece::NONE || p.color() != attacker {
                continue;
            }
            let dests = piece_destinations(p.piece_type(), attacker, from, |s| self.board[s] != Piece::NONE);
            if dests.contains(&sq) {
                return true;
            }
        }
        false
    }

    pub fn in_check(&self) -> bool {
        self.attacked_by(self.king_square(self.turn), !self.turn)
    }

    pub fn gives_check(&mut self, m: Move) -> bool {
        self.do_move(m);
        let check = self.in_check();
        self.undo_move(m);
        check
    }

    /// Always false: the entering-king declaration rule is an external collaborator.
    pub fn nyugyoku(&self) -> bool {
        false
    }

    /// Always `None`: the mate-in-one solver is an external collaborator.
    pub fn mate_move_in_1_ply(&self) -> Option<Move> {
        None
    }

    fn generate_board_moves(&self, captures_and_promotions: bool) -> MoveList {
        let mut list = MoveList::default();
        for from in Square::iter() {
            let p = self.board[from];
            if p == Piece::NONE || p.color() != self.turn {
                continue;
            }
            let dests = piece_destinations(p.piece_type(), self.turn, from, |s| self.board[s] != Piece::NONE);
            for to in dests {
                let occupant = self.board[to];
                if occupant != Piece::NONE && occupant.color() == self.turn {
                    continue;
                }
                let captured = if occupant == Piece::NONE { PieceType::None } else { occupant.piece_type() };
                let is_cap = captured != PieceType::None;
                let can_promote = p.piece_type().can_promote()
                    && (in_promotion_zone(self.turn, from) || in_promotion_zone(self.turn, to));
                let must_promote = p.piece_type().can_promote() && !has_further_moves(p.piece_type(), self.turn, to);

                if must_promote {
                    if is_cap == captures_and_promotions {
                        list.push(Move::new_board(from, to, p.piece_type(), captured, true));
                    }
                    continue;
                }
                if can_promote && (is_cap || captures_and_promotions) {
                    list.push(Move::new_board(from, to, p.piece_type(), captured, true));
                }
                if is_cap == captures_and_promotions {
                    list.push(Move::new_board(from, to, p.piece_type(), captured, false));
                }
            }
        }
        list
    }

    fn generate_drops(&self) -> MoveList {
        let mut list = MoveList::default();
        for pt in self.hands[self.turn.idx()].iter() {
            for to in Square::iter() {
                if self.board[to] != Piece::NONE {
                    continue;
                }
                if !has_further_moves(pt, self.turn, to) {
                    continue;
                }
                if pt == PieceType::Pawn && self.nifu_violation(to.file()) {
                    continue;
                }
                list.push(Move::new_drop(pt, to));
            }
        }
        list
    }

    fn nifu_violation(&self, file: u8) -> bool {
        Square::iter().any(|sq| {
            sq.file() == file && self.board[sq] == Piece::new(PieceType::Pawn, self.turn)
        })
    }

    /// Captures plus promotions (including quiet promotions), the move-picker's "noisy" stage.
    pub fn generate_captures_and_promotions(&self) -> MoveList {
        self.generate_board_moves(true)
    }

    /// Non-capture, non-promotion board moves plus drops, the move-picker's "quiet" stage.
    pub fn generate_quiets(&self) -> MoveList {
        let mut list = self.generate_board_moves(false);
        for entry in self.generate_drops().iter() {
            list.push(entry.m);
        }
        list
    }

    pub fn generate_evasions(&self) -> MoveList {
        let mut all = self.generate_captures_and_promotions();
        for e in self.generate_quiets().iter() {
            all.push(e.m);
        }
        all
    }

    /// Cheap structural check for whether a TT-cached move could still apply here; does not
    /// verify the mover is left in check.
    pub fn move_is_pseudo_legal(&self, m: Move) -> bool {
        if m.is_none() {
            return false;
        }
        if m.is_drop() {
            if self.board[m.to()] != Piece::NONE || !self.hands[self.turn.idx()].has(m.drop_piece_type()) {
                return false;
            }
            return has_further_moves(m.drop_piece_type(), self.turn, m.to())
                && !(m.drop_piece_type() == PieceType::Pawn && self.nifu_violation(m.to().file()));
        }
        let p = self.board[m.from()];
        if p == Piece::NONE || p.color() != self.turn || p.piece_type() != m.piece_type_from() {
            return false;
        }
        let occupant = self.board[m.to()];
        if occupant != Piece::NONE && occupant.color() == self.turn {
            return false;
        }
        let dests = piece_destinations(p.piece_type(), self.turn, m.from(), |s| self.board[s] != Piece::NONE);
        dests.contains(&m.to())
    }

    pub fn legality_check(&mut self, m: Move) -> bool {
        if !self.move_is_pseudo_legal(m) {
            return false;
        }
        self.do_move(m);
        let illegal = self.attacked_by(self.king_square(!self.turn), self.turn);
        self.undo_move(m);
        !illegal
    }

    pub fn do_move(&mut self, m: Move) {
        let mover = self.turn;
        let mut key = self.key;
        let mut board_key = self.board_key;
        let hands_before = self.hands;

        if m.is_drop() {
            let pt = m.drop_piece_type();
            let piece = Piece::new(pt, mover);
            self.place(m.to(), piece);
            key ^= ZOBRIST.piece_on_square(piece, m.to());
            board_key ^= ZOBRIST.piece_on_square(piece, m.to());
            let old = self.hands[mover.idx()].count(pt);
            self.hands[mover.idx()].remove(pt);
            key ^= ZOBRIST.hand_delta(mover, pt, old, old - 1);
        } else {
            let from_piece = self.board[m.from()];
            key ^= ZOBRIST.piece_on_square(from_piece, m.from());
            board_key ^= ZOBRIST.piece_on_square(from_piece, m.from());
            self.board[m.from()] = Piece::NONE;
            self.occupancy[mover.idx()].clear_bit(m.from());

            let captured = self.board[m.to()];
            if captured != Piece::NONE {
                key ^= ZOBRIST.piece_on_square(captured, m.to());
                board_key ^= ZOBRIST.piece_on_square(captured, m.to());
                self.occupancy[captured.color().idx()].clear_bit(m.to());
                let base = captured.piece_type().demoted();
                let old = self.hands[mover.idx()].count(base);
                self.hands[mover.idx()].add(base);
                key ^= ZOBRIST.hand_delta(mover, base, old, old + 1);
            }

            let new_type = if m.is_promotion() { m.piece_type_from().promoted() } else { m.piece_type_from() };
            let new_piece = Piece::new(new_type, mover);
            self.place(m.to(), new_piece);
            key ^= ZOBRIST.piece_on_square(new_piece, m.to());
            board_key ^= ZOBRIST.piece_on_square(new_piece, m.to());
        }

        self.turn = !self.turn;
        key ^= ZOBRIST.turn();
        board_key ^= ZOBRIST.turn();

        let prev_key = self.key;
        let prev_board_key = self.board_key;
        self.key = key;
        self.board_key = board_key;
        let gave_check = self.attacked_by(self.king_square(self.turn), mover);

        self.history.push(HistoryEntry { m, key: prev_key, board_key: prev_board_key, hands: hands_before, gave_check });
        self.game_ply += 1;
    }

    pub fn undo_move(&mut self, m: Move) {
        let entry = self.history.pop().expect("undo_move without matching do_move");
        self.turn = !self.turn;
        let mover = self.turn;

        if m.is_drop() {
            self.board[m.to()] = Piece::NONE;
            self.occupancy[mover.idx()].clear_bit(m.to());
        } else {
            self.board[m.to()] = Piece::NONE;
            self.occupancy[mover.idx()].clear_bit(m.to());
            let original = Piece::new(m.piece_type_from(), mover);
            self.place(m.from(), original);

            let captured = m.captured_piece_type();
            if captured != PieceType::None {
                self.place(m.to(), Piece::new(captured, !mover));
            }
        }

        self.hands = entry.hands;
        self.key = entry.key;
        self.board_key = entry.board_key;
        self.game_ply -= 1;
    }

    pub fn do_null_move(&mut self) {
        self.turn = !self.turn;
        self.key ^= ZOBRIST.turn();
        self.board_key ^= ZOBRIST.turn();
        self.game_ply += 1;
    }

    pub fn undo_null_move(&mut self) {
        self.turn = !self.turn;
        self.key ^= ZOBRIST.turn();
        self.board_key ^= ZOBRIST.turn();
        self.game_ply -= 1;
    }

    /// Classifies the current position against its own history, mirroring the source's
    /// `NotRepetition / Draw / Win / Lose / Superior / Inferior` outcomes. `max_ply` bounds
    /// how far back the scan runs, matching the source's small fixed `MaxPly` guard.
    pub fn is_draw(&self, max_ply: i32, ply: i32) -> Repetition {
        if ply > max_ply {
            return Repetition::NotRepetition;
        }
        let mut exact_occurrences = 1; // the current position counts as one occurrence
        for (i, entry) in self.history.iter().enumerate().rev() {
            if entry.board_key != self.board_key {
                continue;
            }
            if entry.key != self.key {
                let earlier_hand = entry.hands[self.turn.idx()];
                let now_hand = self.hands[self.turn.idx()];
                if dominates(now_hand, earlier_hand) {
                    return Repetition::Superior;
                }
                if dominates(earlier_hand, now_hand) {
                    return Repetition::Inferior;
                }
                continue;
            }
            if let Some(winner) = self.perpetual_checker(i) {
                return if winner == self.turn { Repetition::Lose } else { Repetition::Win };
            }
            exact_occurrences += 1;
            if exact_occurrences >= 4 {
                return Repetition::Draw;
            }
        }
        Repetition::NotRepetition
    }

    /// If every move made by one color since `since_idx` gave check, that color is executing
    /// an illegal perpetual check and loses; returns that color, if any.
    ///
    /// `history[j].m` was made by whoever was on move entering ply `j`; since `self.turn` is
    /// on move now (after `history.len()` moves), the mover at index `j` is `self.turn` when
    /// `(history.len() - j)` is even, and `!self.turn` when it is odd.
    fn perpetual_checker(&self, since_idx: usize) -> Option<Color> {
        let mut all_check = [true, true];
        let mut moved = [false, false];
        for (j, entry) in self.history.iter().enumerate().skip(since_idx) {
            let mover = if (self.history.len() - j) % 2 == 0 { self.turn } else { !self.turn };
            moved[mover.idx()] = true;
            all_check[mover.idx()] &= entry.gave_check;
        }
        Color::iter().find(|&c| moved[c.idx()] && all_check[c.idx()])
    }
}

fn dominates(a: Hand, b: Hand) -> bool {
    let mut strictly_more = false;
    for pt in PieceType::DROPPABLE {
        if a.count(pt) < b.count(pt) {
            return false;
        }
        if a.count(pt) > b.count(pt) {
            strictly_more = true;
        }
    }
    strictly_more
}

impl Default for Position {
    fn default() -> Self {
        Position::startpos()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn startpos_has_no_side_in_check() {
        let pos = Position::startpos();
        assert!(!pos.in_check());
    }

    #[test]
    fn do_undo_move_restores_key() {
        let mut pos = Position::startpos();
        let key_before = pos.key();
        let m = pos
            .generate_quiets()
            .iter()
            .map(|e| e.m)
            .find(|&m| !m.is_drop())
            .expect("startpos has quiet board moves");
        pos.do_move(m);
        assert_ne!(pos.key(), key_before);
        pos.undo_move(m);
        assert_eq!(pos.key(), key_before);
    }

    #[test]
    fn do_undo_null_move_restores_key() {
        let mut pos = Position::startpos();
        let key_before = pos.key();
        pos.do_null_move();
        assert_ne!(pos.key(), key_before);
        pos.undo_null_move();
        assert_eq!(pos.key(), key_before);
    }

    #[test]
    fn dominates_requires_strict_improvement() {
        let mut a = Hand::default();
        let b = Hand::default();
        assert!(!dominates(a, b));
        a.add(PieceType::Pawn);
        assert!(dominates(a, b));
        assert!(!dominates(b, a));
    }
}
