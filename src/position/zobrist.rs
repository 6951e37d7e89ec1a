use lazy_static::lazy_static;

use crate::types::pieces::{Color, Piece, PieceType, NUM_PIECES};
use crate::types::square::{Square, NUM_SQUARES};

use super::hand::Hand;
use super::moves::NUM_DROP_TYPES;

const MAX_HAND_COUNT: usize = 19;

/// A simple xorshift64* generator, seeded once at startup; mirrors the source's
/// throwaway-PRNG-for-zobrist-keys idiom rather than pulling in a full `rand` dependency
/// for the handful of constants this table needs.
struct Rng(u64);

impl Rng {
    fn new(seed: u64) -> Self {
        Rng(seed)
    }

    fn next_u64(&mut self) -> u64 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
        self.0
    }
}

pub struct Zobrist {
    piece_square_hashes: [[u64; NUM_SQUARES]; NUM_PIECES],
    hand_hashes: [[[u64; MAX_HAND_COUNT]; NUM_DROP_TYPES]; 2],
    turn_hash: u64,
}

lazy_static! {
    pub static ref ZOBRIST: Zobrist = Zobrist::new();
}

impl Zobrist {
    fn new() -> Self {
        let mut rng = Rng::new(0x9E3779B97F4A7C15);
        let mut piece_square_hashes = [[0u64; NUM_SQUARES]; NUM_PIECES];
        for piece in Piece::iter() {
            for sq in 0..NUM_SQUARES {
                piece_square_hashes[piece.idx()][sq] = rng.next_u64();
            }
        }
        let mut hand_hashes = [[[0u64; MAX_HAND_COUNT]; NUM_DROP_TYPES]; 2];
        for color in 0..2 {
            for pt in 0..NUM_DROP_TYPES {
                for count in 0..MAX_HAND_COUNT {
                    hand_hashes[color][pt][count] = rng.next_u64();
                }
            }
        }
        Zobrist { piece_square_hashes, hand_hashes, turn_hash: rng.next_u64() }
    }

    pub fn piece_on_square(&self, piece: Piece, sq: Square) -> u64 {
        self.piece_square_hashes[piece.idx()][sq.idx()]
    }

    pub fn turn(&self) -> u64 {
        self.turn_hash
    }

    fn hand_count_hash(&self, color: Color, piece_type: PieceType, count: u8) -> u64 {
        if count == 0 {
            return 0;
        }
        let slot = PieceType::DROPPABLE.iter().position(|&pt| pt == piece_type).unwrap();
        self.hand_hashes[color.idx()][slot][count as usize]
    }

    pub fn hand_delta(&self, color: Color, piece_type: PieceType, old_count: u8, new_count: u8) -> u64 {
        self.hand_count_hash(color, piece_type, old_count) ^ self.hand_count_hash(color, piece_type, new_count)
    }

    pub fn full_hand_hash(&self, color: Color, hand: Hand) -> u64 {
        let mut h = 0;
        for pt in PieceType::DROPPABLE {
            h ^= self.hand_count_hash(color, pt, hand.count(pt));
        }
        h
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn piece_square_hashes_are_distinct() {
        let a = ZOBRIST.piece_on_square(Piece::new(PieceType::Pawn, Color::Black), Square::new(0));
        let b = ZOBRIST.piece_on_square(Piece::new(PieceType::Pawn, Color::Black), Square::new(1));
        assert_ne!(a, b);
    }

    #[test]
    fn hand_delta_is_its_own_inverse() {
        let delta = ZOBRIST.hand_delta(Color::Black, PieceType::Rook, 0, 1);
        let back = ZOBRIST.hand_delta(Color::Black, PieceType::Rook, 1, 0);
        assert_eq!(delta, back);
    }
}
