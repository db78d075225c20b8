//! Zobrist hashing keys.
//!
//! One 64-bit key per (color, piece, square), one per castling right, one
//! per en-passant file, and one for the side to move. The table follows the
//! polyglot layout (768 piece keys, 4 castle keys, 8 EP-file keys, 1 turn
//! key) and is generated from a fixed seed so hashes are reproducible
//! across runs.

use crate::bitboard::{Color, Piece, COLOR_COUNT, PIECE_COUNT};
use crate::board;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::OnceLock;

pub struct ZobristKeys {
    pub piece_keys: [[[u64; 64]; PIECE_COUNT]; COLOR_COUNT],
    /// Indexed WK, WQ, BK, BQ — one key per castling right.
    pub castle_keys: [u64; 4],
    /// Indexed by en-passant file (0-7).
    pub ep_keys: [u64; 8],
    /// XORed in when it is black's turn.
    pub side_key: u64,
}

static ZOBRIST: OnceLock<ZobristKeys> = OnceLock::new();

/// Initialize the key table. Must be called once at startup.
pub fn init() {
    ZOBRIST.get_or_init(|| {
        let mut rng = StdRng::seed_from_u64(0x9D39_247E_3377_6D41);

        let mut keys = ZobristKeys {
            piece_keys: [[[0u64; 64]; PIECE_COUNT]; COLOR_COUNT],
            castle_keys: [0u64; 4],
            ep_keys: [0u64; 8],
            side_key: 0,
        };

        for color in 0..COLOR_COUNT {
            for piece in 0..PIECE_COUNT {
                for sq in 0..64 {
                    keys.piece_keys[color][piece][sq] = rng.gen();
                }
            }
        }

        for key in keys.castle_keys.iter_mut() {
            *key = rng.gen();
        }

        for key in keys.ep_keys.iter_mut() {
            *key = rng.gen();
        }

        keys.side_key = rng.gen();

        keys
    });
}

/// Get a reference to the global key table.
#[inline]
pub fn keys() -> &'static ZobristKeys {
    ZOBRIST
        .get()
        .expect("Zobrist keys not initialized! Call zobrist::init() first.")
}

/// Key for a piece of a color on a square.
#[inline]
pub fn piece_key(color: Color, piece: Piece, sq: u8) -> u64 {
    keys().piece_keys[color.index()][piece.index()][sq as usize]
}

/// Key for an en-passant file.
#[inline]
pub fn ep_key(file: u8) -> u64 {
    keys().ep_keys[file as usize]
}

/// XOR of the keys for every right set in a castling-rights bitfield.
/// Passing `old ^ new` yields the incremental update for a rights change.
pub fn castle_keys_for(rights: u8) -> u64 {
    let k = keys();
    let mut hash = 0u64;
    if rights & board::WK_CASTLE != 0 {
        hash ^= k.castle_keys[0];
    }
    if rights & board::WQ_CASTLE != 0 {
        hash ^= k.castle_keys[1];
    }
    if rights & board::BK_CASTLE != 0 {
        hash ^= k.castle_keys[2];
    }
    if rights & board::BQ_CASTLE != 0 {
        hash ^= k.castle_keys[3];
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{ALL_CASTLES, WK_CASTLE, WQ_CASTLE};

    #[test]
    fn test_keys_are_distinct() {
        init();
        let k = keys();
        assert_ne!(k.side_key, 0);
        assert_ne!(k.piece_keys[0][0][0], k.piece_keys[0][0][1]);
        assert_ne!(k.piece_keys[0][0][0], k.piece_keys[1][0][0]);
        assert_ne!(k.castle_keys[0], k.castle_keys[3]);
    }

    #[test]
    fn test_keys_are_stable() {
        init();
        // Same table no matter how many times init runs
        let a = piece_key(Color::White, Piece::Pawn, 12);
        init();
        assert_eq!(piece_key(Color::White, Piece::Pawn, 12), a);
    }

    #[test]
    fn test_castle_key_composition() {
        init();
        let k = keys();
        assert_eq!(castle_keys_for(0), 0);
        assert_eq!(
            castle_keys_for(WK_CASTLE | WQ_CASTLE),
            k.castle_keys[0] ^ k.castle_keys[1]
        );
        // XOR of a difference is the incremental update
        let before = castle_keys_for(ALL_CASTLES);
        let after = castle_keys_for(ALL_CASTLES & !WK_CASTLE);
        assert_eq!(before ^ after, castle_keys_for(WK_CASTLE));
    }
}
