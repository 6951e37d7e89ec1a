use crate::types::pieces::PieceType;

use super::moves::NUM_DROP_TYPES;

/// Captured pieces held off-board, ready to be dropped. Counts are small (at most 18 pawns)
/// so a flat array indexed by drop-type slot is cheaper than a map.
#[derive(Copy, Clone, Default, Debug, PartialEq, Eq)]
pub struct Hand {
    counts: [u8; NUM_DROP_TYPES],
}

impl Hand {
    pub fn count(self, piece_type: PieceType) -> u8 {
        self.counts[slot(piece_type)]
    }

    pub fn has(self, piece_type: PieceType) -> bool {
        self.count(piece_type) > 0
    }

    pub fn add(&mut self, piece_type: PieceType) {
        self.counts[slot(piece_type)] += 1;
    }

    pub fn remove(&mut self, piece_type: PieceType) {
        debug_assert!(self.has(piece_type));
        self.counts[slot(piece_type)] -= 1;
    }

    pub fn is_empty(self) -> bool {
        self.counts.iter().all(|&c| c == 0)
    }

    pub fn iter(self) -> impl Iterator<Item = PieceType> {
        PieceType::DROPPABLE.into_iter().filter(move |&pt| self.has(pt))
    }
}

fn slot(piece_type: PieceType) -> usize {
    PieceType::DROPPABLE
        .iter()
        .position(|&pt| pt == piece_type.demoted())
        .expect("only droppable piece types are held in hand")
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn add_remove_round_trips() {
        let mut hand = Hand::default();
        hand.add(PieceType::Rook);
        assert!(hand.has(PieceType::Rook));
        hand.remove(PieceType::Rook);
        assert!(!hand.has(PieceType::Rook));
    }

    #[test]
    fn captured_promoted_piece_returns_to_base_type() {
        let mut hand = Hand::default();
        hand.add(PieceType::Dragon);
        assert!(hand.has(PieceType::Rook));
    }
}
