//! The static evaluator. Out of this engine's scope as a *design* (this is a classical
//! material + piece-square function standing in for the source's NNUE network), but it must
//! exist as a real, callable `evaluate(pos) -> Score` for the search core to drive.

use crate::position::position::Position;
use crate::types::pieces::{Color, PieceType};
use crate::types::square::Square;

/// Centralization bonus, same shape for every piece: a simple distance-from-center taper.
/// Stands in for the source's tuned PeSTO-style tables without claiming to be tuned data.
fn centrality_bonus(sq: Square) -> i32 {
    let df = (sq.file() as i32 - 4).abs();
    let dr = (sq.rank() as i32 - 4).abs();
    8 - df - dr
}

fn piece_square_value(piece_type: PieceType, color: Color, sq: Square) -> i32 {
    let sq = if color == Color::Black { sq } else { sq.flip() };
    match piece_type {
        PieceType::King => 0,
        PieceType::Pawn => 0,
        _ => centrality_bonus(sq),
    }
}

/// A pure function of the position: no mutable evaluator state survives between calls. The
/// differential-update hook the search core expects (`stack.staticEvalRaw`) is therefore a
/// no-op cache here; a real NNUE collaborator would thread an accumulator through it instead.
pub fn evaluate(pos: &Position) -> i32 {
    let mut score = 0;
    for sq in Square::iter() {
        let piece = pos.piece(sq);
        if piece.piece_type() == PieceType::None {
            continue;
        }
        let value = piece.value() + piece_square_value(piece.piece_type(), piece.color(), sq);
        score += if piece.color() == Color::Black { value } else { -value };
    }
    for color in Color::iter() {
        let hand = pos.hand(color);
        let hand_value: i32 = PieceType::DROPPABLE.iter().map(|&pt| pt.value() * hand.count(pt) as i32).sum();
        score += if color == Color::Black { hand_value } else { -hand_value };
    }
    if pos.turn() == Color::Black {
        score
    } else {
        -score
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn startpos_is_symmetric() {
        let pos = Position::startpos();
        assert_eq!(evaluate(&pos), 0);
    }
}
