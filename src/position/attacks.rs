//! Piece movement geometry. Movegen here is a loop-based ray walk over the mailbox rather
//! than magic bitboards: with the board representation itself out of this engine's scope,
//! clarity over raw speed is the right tradeoff.

use crate::types::pieces::{Color, PieceType};
use crate::types::square::Square;

type Delta = (i8, i8);

const KNIGHT_STEPS: [Delta; 2] = [(1, 2), (-1, 2)];
const SILVER_STEPS: [Delta; 5] = [(0, 1), (1, 1), (-1, 1), (1, -1), (-1, -1)];
const GOLD_STEPS: [Delta; 6] = [(0, 1), (1, 1), (-1, 1), (1, 0), (-1, 0), (0, -1)];
const KING_STEPS: [Delta; 8] = [(0, 1), (1, 1), (-1, 1), (1, 0), (-1, 0), (0, -1), (1, -1), (-1, -1)];
const BISHOP_RAYS: [Delta; 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];
const ROOK_RAYS: [Delta; 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

/// Deltas are given in Black's forward frame (`fwd = +1`); mirror the rank delta for White.
fn oriented(steps: &[Delta], color: Color) -> Vec<Delta> {
    let mirror = if color == Color::Black { 1 } else { -1 };
    steps.iter().map(|&(df, dr)| (df, dr * mirror)).collect()
}

fn in_bounds(file: i8, rank: i8) -> bool {
    (0..9).contains(&file) && (0..9).contains(&rank)
}

/// Squares a piece of `piece_type`/`color` standing on `from` could step to or slide along,
/// stopping rays at the first occupied square (inclusive, caller filters own-piece captures).
pub fn piece_destinations(piece_type: PieceType, color: Color, from: Square, occupied: impl Fn(Square) -> bool) -> Vec<Square> {
    let mut out = Vec::new();
    let (file, rank) = (from.file() as i8, from.rank() as i8);

    let mut step = |steps: &[Delta]| {
        for &(df, dr) in steps {
            let (nf, nr) = (file + df, rank + dr);
            if in_bounds(nf, nr) {
                out.push(Square::from_file_rank(nf as u8, nr as u8));
            }
        }
    };

    let mut slide = |rays: &[Delta]| {
        for &(df, dr) in rays {
            let (mut nf, mut nr) = (file + df, rank + dr);
            while in_bounds(nf, nr) {
                let sq = Square::from_file_rank(nf as u8, nr as u8);
                out.push(sq);
                if occupied(sq) {
                    break;
                }
                nf += df;
                nr += dr;
            }
        }
    };

    match piece_type {
        PieceType::Pawn => step(&oriented(&[(0, 1)], color)),
        PieceType::Knight => step(&oriented(&KNIGHT_STEPS, color)),
        PieceType::Silver => step(&oriented(&SILVER_STEPS, color)),
        PieceType::Gold | PieceType::ProPawn | PieceType::ProLance | PieceType::ProKnight | PieceType::ProSilver => {
            step(&oriented(&GOLD_STEPS, color));
        }
        PieceType::King => step(&KING_STEPS),
        PieceType::Lance => slide(&oriented(&[(0, 1)], color)),
        PieceType::Bishop => slide(&BISHOP_RAYS),
        PieceType::Rook => slide(&ROOK_RAYS),
        PieceType::Horse => {
            slide(&BISHOP_RAYS);
            step(&ROOK_RAYS);
        }
        PieceType::Dragon => {
            slide(&ROOK_RAYS);
            step(&BISHOP_RAYS);
        }
        PieceType::None => {}
    }
    out
}

/// Far ranks (of 3) counted from the opponent's edge, the drop/move promotion zone.
pub fn in_promotion_zone(color: Color, sq: Square) -> bool {
    match color {
        Color::Black => sq.rank() <= 2,
        Color::White => sq.rank() >= 6,
    }
}

/// A piece dropped or moved to `sq` with no legal follow-up move would be dead weight;
/// this also gates forced promotion for pawns/lances (last rank) and knights (last two).
pub fn has_further_moves(piece_type: PieceType, color: Color, sq: Square) -> bool {
    let rank = sq.rank() as i8;
    let last = if color == Color::Black { 0 } else { 8 };
    let second_last = if color == Color::Black { 1 } else { 7 };
    match piece_type {
        PieceType::Pawn | PieceType::Lance => rank != last,
        PieceType::Knight => rank != last && rank != second_last,
        _ => true,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn pawn_moves_one_step_forward_for_each_color() {
        let from = Square::from_file_rank(4, 4);
        let black = piece_destinations(PieceType::Pawn, Color::Black, from, |_| false);
        let white = piece_destinations(PieceType::Pawn, Color::White, from, |_| false);
        assert_eq!(black, vec![Square::from_file_rank(4, 3)]);
        assert_eq!(white, vec![Square::from_file_rank(4, 5)]);
    }

    #[test]
    fn rook_slide_stops_at_first_occupant() {
        let from = Square::from_file_rank(4, 4);
        let blocker = Square::from_file_rank(4, 6);
        let dests = piece_destinations(PieceType::Rook, Color::Black, from, |sq| sq == blocker);
        assert!(dests.contains(&blocker));
        assert!(!dests.contains(&Square::from_file_rank(4, 7)));
    }
}
