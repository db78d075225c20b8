//! Attack tables and legal move generation.
//! - Knight, king and pawn attacks: precomputed lookup tables
//! - Sliding pieces: hyperbola quintessence over file/rank/diagonal masks
//! - Generation is fully legal: pins, check evasion, castling legality and
//!   en-passant discovered checks are all resolved here, never by making
//!   the move and testing afterwards.

use crate::bitboard::*;
use crate::board::*;
use crate::moves::*;
use std::sync::OnceLock;

// ============================================================
// Precomputed tables
// ============================================================

struct AttackTables {
    knight: [Bitboard; 64],
    king: [Bitboard; 64],
    /// Pawn capture targets, per color.
    pawn_attacks: [[Bitboard; 64]; 2],
    /// Single-push targets, per color. Empty on the back ranks.
    pawn_pushes: [[Bitboard; 64]; 2],
    /// `between[a][b]`: the squares a slider on `a` crosses to reach `b`,
    /// including `b` itself and excluding `a`. Zero when the squares do not
    /// share a rank, file or diagonal.
    between: [[Bitboard; 64]; 64],
}

static TABLES: OnceLock<AttackTables> = OnceLock::new();

/// Initialize all attack tables. Must be called once at startup.
pub fn init() {
    TABLES.get_or_init(|| AttackTables {
        knight: init_knight_attacks(),
        king: init_king_attacks(),
        pawn_attacks: init_pawn_attacks(),
        pawn_pushes: init_pawn_pushes(),
        between: init_between(),
    });
}

fn tables() -> &'static AttackTables {
    TABLES
        .get()
        .expect("Attack tables not initialized! Call movegen::init() first.")
}

fn init_knight_attacks() -> [Bitboard; 64] {
    let mut attacks = [0u64; 64];
    for sq in 0..64u8 {
        let bb = square_bb(sq);
        let mut a: Bitboard = 0;
        a |= (bb << 17) & NOT_FILE_A; // up 2, right 1
        a |= (bb << 15) & NOT_FILE_H; // up 2, left 1
        a |= (bb << 10) & NOT_FILE_AB; // up 1, right 2
        a |= (bb << 6) & NOT_FILE_GH; // up 1, left 2
        a |= (bb >> 6) & NOT_FILE_AB; // down 1, right 2
        a |= (bb >> 10) & NOT_FILE_GH; // down 1, left 2
        a |= (bb >> 15) & NOT_FILE_A; // down 2, right 1
        a |= (bb >> 17) & NOT_FILE_H; // down 2, left 1
        attacks[sq as usize] = a;
    }
    attacks
}

fn init_king_attacks() -> [Bitboard; 64] {
    let mut attacks = [0u64; 64];
    for sq in 0..64u8 {
        let bb = square_bb(sq);
        attacks[sq as usize] = north(bb)
            | south(bb)
            | east(bb)
            | west(bb)
            | north_east(bb)
            | north_west(bb)
            | south_east(bb)
            | south_west(bb);
    }
    attacks
}

fn init_pawn_attacks() -> [[Bitboard; 64]; 2] {
    let mut attacks = [[0u64; 64]; 2];
    for sq in 0..64u8 {
        let bb = square_bb(sq);
        attacks[Color::White.index()][sq as usize] = north_east(bb) | north_west(bb);
        attacks[Color::Black.index()][sq as usize] = south_east(bb) | south_west(bb);
    }
    attacks
}

fn init_pawn_pushes() -> [[Bitboard; 64]; 2] {
    let mut pushes = [[0u64; 64]; 2];
    for sq in 0..64u8 {
        let bb = square_bb(sq);
        pushes[Color::White.index()][sq as usize] = north(bb);
        pushes[Color::Black.index()][sq as usize] = south(bb);
    }
    pushes
}

fn init_between() -> [[Bitboard; 64]; 64] {
    const DIRS: [(i8, i8); 8] = [
        (1, 0),
        (-1, 0),
        (0, 1),
        (0, -1),
        (1, 1),
        (1, -1),
        (-1, 1),
        (-1, -1),
    ];
    let mut between = [[0u64; 64]; 64];
    for a in 0..64u8 {
        for (dr, df) in DIRS {
            let mut path: Bitboard = 0;
            let mut r = rank_of(a) as i8 + dr;
            let mut f = file_of(a) as i8 + df;
            while (0..8).contains(&r) && (0..8).contains(&f) {
                let cur = make_square(f as u8, r as u8);
                between[a as usize][cur as usize] = path | square_bb(cur);
                path |= square_bb(cur);
                r += dr;
                f += df;
            }
        }
    }
    between
}

/// Squares a slider on `a` crosses to reach `b`, including `b`, excluding `a`.
#[inline]
pub fn between(a: u8, b: u8) -> Bitboard {
    tables().between[a as usize][b as usize]
}

// ============================================================
// Attack lookups
// ============================================================

#[inline]
pub fn knight_attacks(sq: u8) -> Bitboard {
    tables().knight[sq as usize]
}

#[inline]
pub fn king_attacks(sq: u8) -> Bitboard {
    tables().king[sq as usize]
}

/// Capture targets of a pawn of `color` on `sq`.
#[inline]
pub fn pawn_attacks(sq: u8, color: Color) -> Bitboard {
    tables().pawn_attacks[color.index()][sq as usize]
}

/// Single-push target of a pawn of `color` on `sq`.
#[inline]
pub fn pawn_push(sq: u8, color: Color) -> Bitboard {
    tables().pawn_pushes[color.index()][sq as usize]
}

/// Hyperbola quintessence: sliding attacks along one masked line. The
/// occupancy may or may not contain the slider's own square; the result is
/// the same either way.
#[inline]
fn line_attacks(occ: Bitboard, mask: Bitboard, slider: Bitboard) -> Bitboard {
    let o = occ & mask;
    let forward = o.wrapping_sub(slider.wrapping_mul(2));
    let reverse = o
        .reverse_bits()
        .wrapping_sub(slider.reverse_bits().wrapping_mul(2))
        .reverse_bits();
    (forward ^ reverse) & mask
}

#[inline]
pub fn bishop_attacks(sq: u8, occ: Bitboard) -> Bitboard {
    let s = square_bb(sq);
    line_attacks(occ, diagonal_mask(sq), s) | line_attacks(occ, anti_diagonal_mask(sq), s)
}

#[inline]
pub fn rook_attacks(sq: u8, occ: Bitboard) -> Bitboard {
    let s = square_bb(sq);
    line_attacks(occ, file_mask(sq), s) | line_attacks(occ, rank_mask(sq), s)
}

#[inline]
pub fn queen_attacks(sq: u8, occ: Bitboard) -> Bitboard {
    bishop_attacks(sq, occ) | rook_attacks(sq, occ)
}

/// All pieces of `by` that attack `sq`, given an explicit occupancy.
/// A super-piece sits on `sq` and each of its rays is intersected with the
/// matching enemy piece set.
pub fn attackers_to(board: &Board, sq: u8, by: Color, occ: Bitboard) -> Bitboard {
    let e = by.index();
    let mut attackers: Bitboard = 0;
    attackers |= bishop_attacks(sq, occ)
        & (board.pieces[e][Piece::Bishop.index()] | board.pieces[e][Piece::Queen.index()]);
    attackers |= rook_attacks(sq, occ)
        & (board.pieces[e][Piece::Rook.index()] | board.pieces[e][Piece::Queen.index()]);
    attackers |= knight_attacks(sq) & board.pieces[e][Piece::Knight.index()];
    attackers |= king_attacks(sq) & board.pieces[e][Piece::King.index()];
    // Reverse-color pawn rays: our pawn would capture from where theirs do
    attackers |= pawn_attacks(sq, by.flip()) & board.pieces[e][Piece::Pawn.index()];
    attackers
}

/// Short-circuit variant of [`attackers_to`] for hot paths.
pub fn is_attacked(board: &Board, sq: u8, by: Color, occ: Bitboard) -> bool {
    let e = by.index();
    if bishop_attacks(sq, occ)
        & (board.pieces[e][Piece::Bishop.index()] | board.pieces[e][Piece::Queen.index()])
        != 0
    {
        return true;
    }
    if rook_attacks(sq, occ)
        & (board.pieces[e][Piece::Rook.index()] | board.pieces[e][Piece::Queen.index()])
        != 0
    {
        return true;
    }
    if knight_attacks(sq) & board.pieces[e][Piece::Knight.index()] != 0 {
        return true;
    }
    if king_attacks(sq) & board.pieces[e][Piece::King.index()] != 0 {
        return true;
    }
    pawn_attacks(sq, by.flip()) & board.pieces[e][Piece::Pawn.index()] != 0
}

// ============================================================
// Legal move generation
// ============================================================

/// Generate every legal move for the side to move. No pseudo-legal
/// leakage: a move in the list can always be made.
pub fn generate_moves(board: &Board, list: &mut MoveList) {
    list.clear();
    let us = board.side;
    let them = us.flip();
    let king_sq = board.king_sq(us);

    let checkers = attackers_to(board, king_sq, them, board.all_occupancy);
    let pinned = gen_pinned_moves(board, us, list);

    if checkers == 0 {
        let free = !pinned;
        let u = us.index();
        gen_pawn_moves(board, us, board.pieces[u][Piece::Pawn.index()] & free, list);
        gen_knight_moves(board, us, board.pieces[u][Piece::Knight.index()] & free, list);
        gen_slider_moves(board, us, board.pieces[u][Piece::Bishop.index()] & free, bishop_attacks, list);
        gen_slider_moves(board, us, board.pieces[u][Piece::Rook.index()] & free, rook_attacks, list);
        gen_slider_moves(board, us, board.pieces[u][Piece::Queen.index()] & free, queen_attacks, list);
        gen_king_moves(board, us, board.all_occupancy, list);
        gen_castles(board, us, list);
    } else {
        // Pinned pieces can never resolve a check: their pin ray does not
        // contain the checker.
        list.clear();
        gen_evasions(board, us, king_sq, checkers, pinned, list);
    }
}

/// Find pinned pieces, emit the moves they may still play along their pin
/// ray (capture of the pinner included), and return the pinned set so the
/// other generators skip them.
fn gen_pinned_moves(board: &Board, us: Color, list: &mut MoveList) -> Bitboard {
    let them = us.flip();
    let e = them.index();
    let king_sq = board.king_sq(us);
    let our_occ = board.occupancy[us.index()];
    let enemy_occ = board.occupancy[e];

    let diag_sliders = board.pieces[e][Piece::Bishop.index()] | board.pieces[e][Piece::Queen.index()];
    let card_sliders = board.pieces[e][Piece::Rook.index()] | board.pieces[e][Piece::Queen.index()];

    // Sliders the king can "see" through any number of friendly pieces:
    // computing rays against enemy-only occupancy lets friendly blockers be
    // counted afterwards.
    let mut pinners = (bishop_attacks(king_sq, enemy_occ) & diag_sliders)
        | (rook_attacks(king_sq, enemy_occ) & card_sliders);

    let mut pinned: Bitboard = 0;
    while pinners != 0 {
        let pinner_sq = pop_lsb(&mut pinners);
        let ray = between(king_sq, pinner_sq);
        let candidates = ray & our_occ;
        if popcount(candidates) != 1 {
            continue;
        }
        pinned |= candidates;
        let pinned_sq = lsb(candidates);
        let (piece, _) = board
            .piece_at(pinned_sq)
            .expect("pinned square disagrees with mailbox");
        let slide = ray & !candidates;

        match piece {
            Piece::Queen => emit_ray_moves(board, them, pinned_sq, slide, list),
            Piece::Bishop if diagonal_line(king_sq, pinner_sq) => {
                emit_ray_moves(board, them, pinned_sq, slide, list)
            }
            Piece::Rook if cardinal_line(king_sq, pinner_sq) => {
                emit_ray_moves(board, them, pinned_sq, slide, list)
            }
            Piece::Pawn => gen_pinned_pawn_moves(board, us, pinned_sq, pinner_sq, king_sq, list),
            _ => {}
        }
    }
    pinned
}

fn emit_ray_moves(board: &Board, them: Color, from: u8, targets: Bitboard, list: &mut MoveList) {
    let enemy_occ = board.occupancy[them.index()];
    let mut t = targets;
    while t != 0 {
        let to = pop_lsb(&mut t);
        let kind = if square_bb(to) & enemy_occ != 0 {
            MoveKind::Attack
        } else {
            MoveKind::Quiet
        };
        list.push(Move::new(from, to, kind));
    }
}

/// A pinned pawn may push only when the pin runs along its file, and may
/// capture only the pinner itself, and only when the pin is diagonal.
fn gen_pinned_pawn_moves(
    board: &Board,
    us: Color,
    pawn_sq: u8,
    pinner_sq: u8,
    king_sq: u8,
    list: &mut MoveList,
) {
    if file_of(king_sq) == file_of(pinner_sq) {
        let empty = !board.all_occupancy;
        let single = pawn_push(pawn_sq, us) & empty;
        let double = match us {
            Color::White => north(single & RANK_3) & empty,
            Color::Black => south(single & RANK_6) & empty,
        };
        let mut pushes = single | double;
        while pushes != 0 {
            let to = pop_lsb(&mut pushes);
            list.push(Move::new(pawn_sq, to, MoveKind::Quiet));
        }
    } else if diagonal_line(king_sq, pinner_sq) && pawn_attacks(pawn_sq, us) & square_bb(pinner_sq) != 0
    {
        if square_bb(pinner_sq) & promo_rank(us) != 0 {
            push_promotions(pawn_sq, pinner_sq, list);
        } else {
            list.push(Move::new(pawn_sq, pinner_sq, MoveKind::Attack));
        }
    }
}

#[inline]
fn cardinal_line(a: u8, b: u8) -> bool {
    file_of(a) == file_of(b) || rank_of(a) == rank_of(b)
}

#[inline]
fn diagonal_line(a: u8, b: u8) -> bool {
    let dr = (rank_of(a) as i8 - rank_of(b) as i8).abs();
    let df = (file_of(a) as i8 - file_of(b) as i8).abs();
    dr == df && dr != 0
}

#[inline]
fn promo_rank(us: Color) -> Bitboard {
    match us {
        Color::White => RANK_8,
        Color::Black => RANK_1,
    }
}

fn push_promotions(from: u8, to: u8, list: &mut MoveList) {
    list.push(Move::new(from, to, MoveKind::PromoQueen));
    list.push(Move::new(from, to, MoveKind::PromoRook));
    list.push(Move::new(from, to, MoveKind::PromoBishop));
    list.push(Move::new(from, to, MoveKind::PromoKnight));
}

fn gen_pawn_moves(board: &Board, us: Color, pawns: Bitboard, list: &mut MoveList) {
    let them = us.flip();
    let empty = !board.all_occupancy;
    let their_occ = board.occupancy[them.index()];
    let promo = promo_rank(us);

    let (single, double, attack_left, attack_right, left_off, right_off): (
        Bitboard,
        Bitboard,
        Bitboard,
        Bitboard,
        i8,
        i8,
    ) = match us {
        Color::White => {
            let single = north(pawns) & empty;
            (
                single,
                north(single & RANK_3) & empty,
                north_west(pawns),
                north_east(pawns),
                -7,
                -9,
            )
        }
        Color::Black => {
            let single = south(pawns) & empty;
            (
                single,
                south(single & RANK_6) & empty,
                south_west(pawns),
                south_east(pawns),
                9,
                7,
            )
        }
    };

    let mut quiet = single & !promo;
    while quiet != 0 {
        let to = pop_lsb(&mut quiet);
        let from = match us {
            Color::White => to - 8,
            Color::Black => to + 8,
        };
        list.push(Move::new(from, to, MoveKind::Quiet));
    }

    let mut doubles = double;
    while doubles != 0 {
        let to = pop_lsb(&mut doubles);
        let from = match us {
            Color::White => to - 16,
            Color::Black => to + 16,
        };
        list.push(Move::new(from, to, MoveKind::Quiet));
    }

    let mut promo_push = single & promo;
    while promo_push != 0 {
        let to = pop_lsb(&mut promo_push);
        let from = match us {
            Color::White => to - 8,
            Color::Black => to + 8,
        };
        push_promotions(from, to, list);
    }

    for (attacks, off) in [(attack_left, left_off), (attack_right, right_off)] {
        let mut caps = attacks & their_occ;
        while caps != 0 {
            let to = pop_lsb(&mut caps);
            let from = (to as i8 + off) as u8;
            if square_bb(to) & promo != 0 {
                push_promotions(from, to, list);
            } else {
                list.push(Move::new(from, to, MoveKind::Attack));
            }
        }
    }

    // En passant, guarding the discovered-check edge case
    if let Some(ep) = board.ep_square {
        let mut attackers = pawn_attacks(ep, them) & pawns;
        while attackers != 0 {
            let from = pop_lsb(&mut attackers);
            if !ep_discovered_check(board, from, ep) {
                list.push(Move::new(from, ep, MoveKind::AttackEp));
            }
        }
    }
}

/// Would capturing en passant leave our own king attacked by a slider?
/// Tested on occupancy alone: both pawns leave their squares at once, which
/// can open a rank ("horizontal pin" through king and rook) or a diagonal.
fn ep_discovered_check(board: &Board, from: u8, to: u8) -> bool {
    let us = board.side;
    let them = us.flip();
    let e = them.index();
    let cap_sq = match us {
        Color::White => to - 8,
        Color::Black => to + 8,
    };
    let occ =
        (board.all_occupancy & !square_bb(from) & !square_bb(cap_sq)) | square_bb(to);
    let king_sq = board.king_sq(us);
    let diag = board.pieces[e][Piece::Bishop.index()] | board.pieces[e][Piece::Queen.index()];
    let card = board.pieces[e][Piece::Rook.index()] | board.pieces[e][Piece::Queen.index()];
    bishop_attacks(king_sq, occ) & diag != 0 || rook_attacks(king_sq, occ) & card != 0
}

fn gen_knight_moves(board: &Board, us: Color, knights: Bitboard, list: &mut MoveList) {
    let our_occ = board.occupancy[us.index()];
    let their_occ = board.occupancy[us.flip().index()];
    let mut pieces = knights;
    while pieces != 0 {
        let from = pop_lsb(&mut pieces);
        let attacks = knight_attacks(from) & !our_occ;

        let mut quiet = attacks & !their_occ;
        while quiet != 0 {
            list.push(Move::new(from, pop_lsb(&mut quiet), MoveKind::Quiet));
        }
        let mut caps = attacks & their_occ;
        while caps != 0 {
            list.push(Move::new(from, pop_lsb(&mut caps), MoveKind::Attack));
        }
    }
}

fn gen_slider_moves(
    board: &Board,
    us: Color,
    sliders: Bitboard,
    attacks_fn: fn(u8, Bitboard) -> Bitboard,
    list: &mut MoveList,
) {
    let our_occ = board.occupancy[us.index()];
    let their_occ = board.occupancy[us.flip().index()];
    let mut pieces = sliders;
    while pieces != 0 {
        let from = pop_lsb(&mut pieces);
        let attacks = attacks_fn(from, board.all_occupancy) & !our_occ;

        let mut quiet = attacks & !their_occ;
        while quiet != 0 {
            list.push(Move::new(from, pop_lsb(&mut quiet), MoveKind::Quiet));
        }
        let mut caps = attacks & their_occ;
        while caps != 0 {
            list.push(Move::new(from, pop_lsb(&mut caps), MoveKind::Attack));
        }
    }
}

/// King steps to squares the enemy does not attack. `occ` is the occupancy
/// used for the enemy attack test: check evasion passes it without the king
/// so sliders x-ray through and the king cannot back away along the ray it
/// is checked on.
fn gen_king_moves(board: &Board, us: Color, occ: Bitboard, list: &mut MoveList) {
    let them = us.flip();
    let from = board.king_sq(us);
    let our_occ = board.occupancy[us.index()];
    let their_occ = board.occupancy[them.index()];

    let mut targets = king_attacks(from) & !our_occ;
    while targets != 0 {
        let to = pop_lsb(&mut targets);
        if is_attacked(board, to, them, occ) {
            continue;
        }
        let kind = if square_bb(to) & their_occ != 0 {
            MoveKind::Attack
        } else {
            MoveKind::Quiet
        };
        list.push(Move::new(from, to, kind));
    }
}

/// Only called when not in check, so the king's own square needs no test;
/// the squares it crosses and lands on do.
fn gen_castles(board: &Board, us: Color, list: &mut MoveList) {
    let them = us.flip();
    let occ = board.all_occupancy;

    match us {
        Color::White => {
            if board.castling & WK_CASTLE != 0
                && occ & (square_bb(sq::F1) | square_bb(sq::G1)) == 0
                && !is_attacked(board, sq::F1, them, occ)
                && !is_attacked(board, sq::G1, them, occ)
            {
                list.push(Move::new(sq::E1, sq::G1, MoveKind::CastleWk));
            }
            if board.castling & WQ_CASTLE != 0
                && occ & (square_bb(sq::B1) | square_bb(sq::C1) | square_bb(sq::D1)) == 0
                && !is_attacked(board, sq::D1, them, occ)
                && !is_attacked(board, sq::C1, them, occ)
            {
                list.push(Move::new(sq::E1, sq::C1, MoveKind::CastleWq));
            }
        }
        Color::Black => {
            if board.castling & BK_CASTLE != 0
                && occ & (square_bb(sq::F8) | square_bb(sq::G8)) == 0
                && !is_attacked(board, sq::F8, them, occ)
                && !is_attacked(board, sq::G8, them, occ)
            {
                list.push(Move::new(sq::E8, sq::G8, MoveKind::CastleBk));
            }
            if board.castling & BQ_CASTLE != 0
                && occ & (square_bb(sq::B8) | square_bb(sq::C8) | square_bb(sq::D8)) == 0
                && !is_attacked(board, sq::D8, them, occ)
                && !is_attacked(board, sq::C8, them, occ)
            {
                list.push(Move::new(sq::E8, sq::C8, MoveKind::CastleBq));
            }
        }
    }
}

/// The side to move is in check. King moves are always tried; with a single
/// checker the checker may also be captured, and a sliding checker may be
/// blocked on any square between it and the king.
fn gen_evasions(
    board: &Board,
    us: Color,
    king_sq: u8,
    checkers: Bitboard,
    pinned: Bitboard,
    list: &mut MoveList,
) {
    let them = us.flip();
    let u = us.index();

    let occ_no_king = board.all_occupancy & !square_bb(king_sq);
    gen_king_moves(board, us, occ_no_king, list);

    if popcount(checkers) > 1 {
        return;
    }

    let checker_sq = lsb(checkers);
    let (checker, _) = board
        .piece_at(checker_sq)
        .expect("checker square disagrees with mailbox");

    // Captures of the checker by anything unpinned except the king
    let mut capturers = attackers_to(board, checker_sq, us, board.all_occupancy)
        & !pinned
        & !board.pieces[u][Piece::King.index()];
    while capturers != 0 {
        let from = pop_lsb(&mut capturers);
        let (piece, _) = board
            .piece_at(from)
            .expect("attacker square disagrees with mailbox");
        if piece == Piece::Pawn && square_bb(checker_sq) & promo_rank(us) != 0 {
            push_promotions(from, checker_sq, list);
        } else {
            list.push(Move::new(from, checker_sq, MoveKind::Attack));
        }
    }

    // En passant can capture a checking pawn, or drop a pawn onto the
    // blocking square of a sliding checker.
    if let Some(ep) = board.ep_square {
        let cap_sq = match us {
            Color::White => ep - 8,
            Color::Black => ep + 8,
        };
        let resolves = cap_sq == checker_sq || square_bb(ep) & between(king_sq, checker_sq) != 0;
        if resolves {
            let mut attackers =
                pawn_attacks(ep, them) & board.pieces[u][Piece::Pawn.index()] & !pinned;
            while attackers != 0 {
                let from = pop_lsb(&mut attackers);
                if !ep_discovered_check(board, from, ep) {
                    list.push(Move::new(from, ep, MoveKind::AttackEp));
                }
            }
        }
    }

    // Interpositions, only possible against a slider
    if matches!(checker, Piece::Bishop | Piece::Rook | Piece::Queen) {
        let mut blocks = between(king_sq, checker_sq) & !checkers;
        while blocks != 0 {
            let to = pop_lsb(&mut blocks);

            // Knights and sliders block where they attack; pawns and the
            // king are handled separately
            let mut blockers = attackers_to(board, to, us, board.all_occupancy)
                & !pinned
                & !board.pieces[u][Piece::Pawn.index()]
                & !board.pieces[u][Piece::King.index()];
            while blockers != 0 {
                list.push(Move::new(pop_lsb(&mut blockers), to, MoveKind::Quiet));
            }

            // Pawn blocks are pushes, not attacks
            let from_single = match us {
                Color::White => to as i16 - 8,
                Color::Black => to as i16 + 8,
            };
            if (0..64).contains(&from_single) {
                let from_single = from_single as u8;
                if board.pieces[u][Piece::Pawn.index()] & !pinned & square_bb(from_single) != 0 {
                    if square_bb(to) & promo_rank(us) != 0 {
                        push_promotions(from_single, to, list);
                    } else {
                        list.push(Move::new(from_single, to, MoveKind::Quiet));
                    }
                }
            }

            let on_double_rank = match us {
                Color::White => square_bb(to) & RANK_4 != 0,
                Color::Black => square_bb(to) & RANK_5 != 0,
            };
            if on_double_rank {
                let (from_double, mid) = match us {
                    Color::White => (to - 16, to - 8),
                    Color::Black => (to + 16, to + 8),
                };
                if board.pieces[u][Piece::Pawn.index()] & !pinned & square_bb(from_double) != 0
                    && board.all_occupancy & square_bb(mid) == 0
                {
                    list.push(Move::new(from_double, to, MoveKind::Quiet));
                }
            }
        }
    }
}

// ============================================================
// Perft
// ============================================================

/// Count leaf nodes of the legal move tree at the given depth. Used to
/// validate move generation against known reference counts.
pub fn perft(board: &mut Board, depth: u32) -> u64 {
    if depth == 0 {
        return 1;
    }
    let mut list = MoveList::new();
    generate_moves(board, &mut list);
    if depth == 1 {
        return list.len() as u64;
    }

    let mut nodes: u64 = 0;
    for i in 0..list.len() {
        let m = list.moves[i];
        board.make(m);
        nodes += perft(board, depth - 1);
        board.unmake(m);
    }
    nodes
}

/// Hash-keyed memo of perft node counts, so deep runs reuse transposed
/// subtrees. Always-replace on collision.
pub struct PerftCache {
    entries: Vec<PerftCacheEntry>,
}

#[derive(Clone, Copy, Default)]
struct PerftCacheEntry {
    hash: u64,
    depth: u32,
    nodes: u64,
}

impl PerftCache {
    pub fn new(size: usize) -> Self {
        PerftCache {
            entries: vec![PerftCacheEntry::default(); size],
        }
    }

    fn probe(&self, hash: u64, depth: u32) -> Option<u64> {
        let e = &self.entries[(hash as usize) % self.entries.len()];
        (e.hash == hash && e.depth == depth).then_some(e.nodes)
    }

    fn store(&mut self, hash: u64, depth: u32, nodes: u64) {
        let idx = (hash as usize) % self.entries.len();
        self.entries[idx] = PerftCacheEntry { hash, depth, nodes };
    }
}

/// [`perft`] with a transposition cache.
pub fn perft_cached(board: &mut Board, depth: u32, cache: &mut PerftCache) -> u64 {
    if depth == 0 {
        return 1;
    }
    let mut list = MoveList::new();
    generate_moves(board, &mut list);
    if depth == 1 {
        return list.len() as u64;
    }
    if let Some(nodes) = cache.probe(board.hash, depth) {
        return nodes;
    }

    let mut nodes: u64 = 0;
    for i in 0..list.len() {
        let m = list.moves[i];
        board.make(m);
        nodes += perft_cached(board, depth - 1, cache);
        board.unmake(m);
    }
    cache.store(board.hash, depth, nodes);
    nodes
}

/// Perft with per-root-move counts. The practical debugging tool: compare
/// against another engine and descend into the move that disagrees.
pub fn perft_divide(board: &mut Board, depth: u32) -> u64 {
    let mut list = MoveList::new();
    generate_moves(board, &mut list);

    let mut total: u64 = 0;
    for i in 0..list.len() {
        let m = list.moves[i];
        board.make(m);
        let count = if depth > 1 { perft(board, depth - 1) } else { 1 };
        board.unmake(m);
        println!("{}: {}", m.to_uci(), count);
        total += count;
    }
    println!("\nTotal: {}", total);
    total
}
