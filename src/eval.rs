//! Static evaluation: material, piece-square tables, king safety.
//! Scores are centipawns from the perspective of the side to move.

use crate::bitboard::*;
use crate::board::Board;
use crate::movegen;

// ============================================================
// Material values (centipawns)
// ============================================================
pub const PAWN_VALUE: i32 = 100;
pub const KNIGHT_VALUE: i32 = 320;
pub const BISHOP_VALUE: i32 = 330;
pub const ROOK_VALUE: i32 = 500;
pub const QUEEN_VALUE: i32 = 975;

pub const INFINITY: i32 = 30000;
pub const MATE_SCORE: i32 = 29000;
pub const MATE_THRESHOLD: i32 = 28000;

/// At or below this many pieces on the whole board, the endgame king
/// table applies: the king should centralize once material is gone.
pub const ENDGAME_PIECE_THRESHOLD: u32 = 12;

/// Piece value for exchange and ordering arithmetic. The king is priced
/// so that "captures" by it always sort as losing everything.
pub fn piece_value(piece: Piece) -> i32 {
    match piece {
        Piece::Pawn => PAWN_VALUE,
        Piece::Knight => KNIGHT_VALUE,
        Piece::Bishop => BISHOP_VALUE,
        Piece::Rook => ROOK_VALUE,
        Piece::Queen => QUEEN_VALUE,
        Piece::King => INFINITY,
    }
}

/// Danger weights for enemy pieces adjacent to our king, indexed by kind.
const KING_SAFETY_WEIGHTS: [i32; PIECE_COUNT] = [8, 12, 12, 16, 88, 4];

// ============================================================
// Piece-square tables, white's perspective, a1 = index 0.
// Black uses the vertically mirrored square.
// ============================================================

#[rustfmt::skip]
const PAWN_PST: [i32; 64] = [
      0,   0,   0,   0,   0,   0,   0,   0,
      0,   0,   0,   0,   0,   0,   0,   0,
    -15,   2,   5,   5,   5,   5,   2, -15,
    -15,  -2,   3,  15,  15,   3,  -2, -15,
     -5,  -5,  -5,  -5,  -5,  -5,  -5,  -5,
      0,   0,   0,   0,   0,   0,   0,   0,
      0,   0,   0,   0,   0,   0,   0,   0,
     25,  25,  25,  25,  25,  25,  25,  25,
];

#[rustfmt::skip]
const KNIGHT_PST: [i32; 64] = [
    -15, -15, -15, -15, -15, -15, -15, -15,
     -2,  -2,  -2,  -2,  -2,  -2,  -2,  -2,
     -5,   0,  25,  25,  25,  25,   0,  -5,
     -5,   0,  15,  25,  25,  15,   0,  -5,
     -5,   0,  15,  25,  25,  15,   0,  -5,
     -5,   0,   2,   2,   2,   2,   0,  -5,
     -2,  -2,  -2,  -2,  -2,  -2,  -2,  -2,
    -15, -15, -15, -15, -15, -15, -15, -15,
];

#[rustfmt::skip]
const BISHOP_PST: [i32; 64] = [
      2,  -5, -25,   0,   0, -25,  -5,   2,
      2,  15,   5,   0,   0,   5,  15,   2,
      2,   5,   5,   0,   0,   5,   5,   2,
      0,   0,   0,   0,   0,   0,   0,   0,
      0,   0,   0,   0,   0,   0,   0,   0,
      0,   0,   0,   0,   0,   0,   0,   0,
      0,   0,   0,   0,   0,   0,   0,   0,
      0,   0,   0,   0,   0,   0,   0,   0,
];

#[rustfmt::skip]
const KING_MG_PST: [i32; 64] = [
     75,  50,   0,   0,   0,   0,  50,  75,
     25,  25, -10, -50, -50, -10,  25,  25,
    -75, -75, -75, -75, -75, -75, -75, -75,
    -75, -75, -75, -75, -75, -75, -75, -75,
    -75, -75, -75, -75, -75, -75, -75, -75,
    -75, -75, -75, -75, -75, -75, -75, -75,
    -75, -75, -75, -75, -75, -75, -75, -75,
    -75, -75, -75, -75, -75, -75, -75, -75,
];

#[rustfmt::skip]
const KING_EG_PST: [i32; 64] = [
    -10, -10, -10, -10, -10, -10, -10, -10,
    -10,  -5,  -5,  -5,  -5,  -5,  -5, -10,
    -10,   2,   5,   5,   5,   5,   2, -10,
    -10,   2,   5,  25,  25,   5,   2, -10,
    -10,   2,   5,  25,  25,   5,   2, -10,
    -10,   2,   5,   5,   5,   5,   2, -10,
    -10,  -5,  -5,  -5,  -5,  -5,  -5, -10,
    -10, -10, -10, -10, -10, -10, -10, -10,
];

/// Few pieces left on the board means the endgame has been reached.
pub fn is_endgame(board: &Board) -> bool {
    popcount(board.all_occupancy) <= ENDGAME_PIECE_THRESHOLD
}

/// PST index for a color: black reads the board vertically mirrored.
#[inline]
fn relative_sq(sq: u8, color: Color) -> u8 {
    match color {
        Color::White => sq,
        Color::Black => sq ^ 56,
    }
}

/// Evaluate the position for the side to move: positive means that side
/// is better.
pub fn evaluate(board: &Board) -> i32 {
    let us = board.side;
    side_score(board, us) - side_score(board, us.flip())
}

fn side_score(board: &Board, us: Color) -> i32 {
    material(board, us) + placement(board, us) + king_safety(board, us)
}

fn material(board: &Board, us: Color) -> i32 {
    let u = us.index();
    popcount(board.pieces[u][Piece::Pawn.index()]) as i32 * PAWN_VALUE
        + popcount(board.pieces[u][Piece::Knight.index()]) as i32 * KNIGHT_VALUE
        + popcount(board.pieces[u][Piece::Bishop.index()]) as i32 * BISHOP_VALUE
        + popcount(board.pieces[u][Piece::Rook.index()]) as i32 * ROOK_VALUE
        + popcount(board.pieces[u][Piece::Queen.index()]) as i32 * QUEEN_VALUE
}

fn placement(board: &Board, us: Color) -> i32 {
    let u = us.index();
    let mut score = 0;

    let king_table = if is_endgame(board) {
        &KING_EG_PST
    } else {
        &KING_MG_PST
    };
    score += king_table[relative_sq(board.king_sq(us), us) as usize];

    let tables: [(Piece, &[i32; 64]); 3] = [
        (Piece::Pawn, &PAWN_PST),
        (Piece::Knight, &KNIGHT_PST),
        (Piece::Bishop, &BISHOP_PST),
    ];
    for (piece, table) in tables {
        let mut bb = board.pieces[u][piece.index()];
        while bb != 0 {
            score += table[relative_sq(pop_lsb(&mut bb), us) as usize];
        }
    }
    score
}

/// Penalty per enemy piece sitting on one of the 8 squares around our king.
fn king_safety(board: &Board, us: Color) -> i32 {
    let them = us.flip();
    let ring = movegen::king_attacks(board.king_sq(us));
    let mut enemies = ring & board.occupancy[them.index()];
    let mut score = 0;
    while enemies != 0 {
        let sq = pop_lsb(&mut enemies);
        let (piece, _) = board.piece_at(sq).expect("occupancy disagrees with mailbox");
        score -= KING_SAFETY_WEIGHTS[piece.index()];
    }
    score
}

// ============================================================
// Mate score helpers
// ============================================================

#[inline]
pub fn is_mate_score(score: i32) -> bool {
    score.abs() > MATE_THRESHOLD
}

/// Convert a ply-shifted mate score into "mate in N" full moves, negative
/// when we are the one being mated.
pub fn mate_in(score: i32) -> i32 {
    if score > MATE_THRESHOLD {
        (MATE_SCORE - score + 1) / 2
    } else if score < -MATE_THRESHOLD {
        -(MATE_SCORE + score + 1) / 2
    } else {
        0
    }
}
