use crate::types::pieces::{Color, Piece, PieceType};
use crate::types::square::Square;

use super::attacks::piece_destinations;
use super::moves::Move;
use super::position::Position;

/// Static exchange evaluation: `see_ge(pos, m, threshold)` answers "is the net material gain
/// of the capture sequence on `m.to()` at least `threshold`?" without playing the moves out.
pub fn see_ge(pos: &Position, m: Move, threshold: i32) -> bool {
    if m.is_drop() {
        return 0 >= threshold;
    }

    let to = m.to();
    let captured = m.captured_piece_type();
    let mut gain = vec![if captured == PieceType::None { 0 } else { captured.value() }];
    let mut last_attacker_value = pos.piece(m.from()).piece_type().value();

    let mut side = !pos.turn();
    let mut occupied: Vec<Square> = Square::iter().filter(|&sq| pos.piece(sq) != Piece::NONE).collect();
    occupied.retain(|&sq| sq != m.from());

    while let Some((attacker_sq, attacker_type)) = least_valuable_attacker(pos, &occupied, to, side) {
        gain.push(last_attacker_value - gain.last().copied().unwrap());
        last_attacker_value = attacker_type.value();
        occupied.retain(|&sq| sq != attacker_sq);
        side = !side;
        if attacker_type == PieceType::King {
            break;
        }
    }

    for i in (1..gain.len()).rev() {
        gain[i - 1] = -(-gain[i - 1]).max(gain[i]);
    }

    gain[0] >= threshold
}

fn least_valuable_attacker(
    pos: &Position,
    occupied: &[Square],
    to: Square,
    side: Color,
) -> Option<(Square, PieceType)> {
    let mut best: Option<(Square, PieceType)> = None;
    for &from in occupied {
        let piece = pos.piece(from);
        if piece == Piece::NONE || piece.color() != side {
            continue;
        }
        let dests = piece_destinations(piece.piece_type(), side, from, |sq| occupied.contains(&sq));
        if !dests.contains(&to) {
            continue;
        }
        if best.is_none_or(|(_, pt)| piece.piece_type().lva_value() < pt.lva_value()) {
            best = Some((from, piece.piece_type()));
        }
    }
    best
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::position::position::Position;

    #[test]
    fn non_capturing_move_sees_as_zero() {
        let pos = Position::startpos();
        let m = pos.generate_quiets().iter().map(|e| e.m).find(|m| !m.is_drop()).unwrap();
        assert!(see_ge(&pos, m, 0));
        assert!(!see_ge(&pos, m, 1));
    }
}
