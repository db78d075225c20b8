//! End-to-end scenarios across the driver boundary: hashing along move
//! sequences, make/unmake restoration, search outcomes, error surfacing.

use mutsu::bitboard::{Piece, COLOR_COUNT, PIECE_COUNT};
use mutsu::board::Board;
use mutsu::moves::{Move, MoveList};
use mutsu::search::ReportedScore;
use mutsu::{movegen, Engine, EngineError};

/// Bitboards, mailbox and hash must agree after any exposed operation.
fn assert_consistent(board: &Board, context: &str) {
    let mut union: u64 = 0;
    for sq in 0..64u8 {
        let bit = 1u64 << sq;
        match board.piece_at(sq) {
            Some((piece, color)) => {
                union |= bit;
                for ci in 0..COLOR_COUNT {
                    for pi in 0..PIECE_COUNT {
                        let expected = ci == color.index() && pi == piece.index();
                        assert_eq!(
                            board.pieces[ci][pi] & bit != 0,
                            expected,
                            "{context}: bitboard/mailbox desync on square {sq}"
                        );
                    }
                }
            }
            None => {
                assert_eq!(
                    board.all_occupancy & bit,
                    0,
                    "{context}: occupancy set on empty square {sq}"
                );
            }
        }
    }
    assert_eq!(union, board.all_occupancy, "{context}: occupancy union");
    assert_eq!(
        board.occupancy[0] | board.occupancy[1],
        board.all_occupancy,
        "{context}: color occupancy union"
    );
    assert_eq!(
        board.hash,
        board.compute_hash(),
        "{context}: incremental hash drifted from scratch recomputation"
    );
}

/// Apply a coordinate-move sequence, checking every intermediate position,
/// then unwind it and require bit-for-bit restoration.
fn roundtrip_sequence(fen: &str, sequence: &[&str]) {
    let mut board = Board::from_fen(fen).unwrap();
    assert_consistent(&board, fen);

    let mut made: Vec<(Move, String, u64)> = Vec::new();
    for text in sequence {
        let fen_before = board.to_fen();
        let hash_before = board.hash;
        let m = board
            .coordinate_move(text)
            .unwrap_or_else(|e| panic!("move {} illegal in {}: {}", text, fen_before, e));
        board.make(m);
        made.push((m, fen_before, hash_before));
        assert_consistent(&board, text);
    }

    for (m, fen_before, hash_before) in made.into_iter().rev() {
        board.unmake(m);
        assert_eq!(board.to_fen(), fen_before, "unmake of {} drifted", m);
        assert_eq!(board.hash, hash_before, "unmake of {} drifted the hash", m);
        assert_consistent(&board, "after unmake");
    }
}

#[test]
fn hash_stays_incremental_along_book_lines() {
    mutsu::init();
    // The classic en-passant and king-move exercise lines
    roundtrip_sequence(
        mutsu::board::START_FEN,
        &["e2e4", "d7d5", "e4e5", "f7f5", "e1e2", "e8f7"],
    );
    roundtrip_sequence(
        mutsu::board::START_FEN,
        &["a2a4", "b7b5", "h2h4", "b5b4", "c2c4", "b4c3", "a1a3"],
    );
}

#[test]
fn hash_stays_incremental_through_castling() {
    mutsu::init();
    roundtrip_sequence(
        mutsu::board::START_FEN,
        &["g1f3", "g8f6", "g2g3", "g7g6", "f1g2", "f8g7", "e1g1", "e8g8"],
    );
}

#[test]
fn hash_stays_incremental_through_promotion_and_ep() {
    mutsu::init();
    roundtrip_sequence("8/P6k/8/8/8/8/p6K/8 w - - 0 1", &["a7a8q", "a2a1q"]);
    roundtrip_sequence(
        mutsu::board::START_FEN,
        &["e2e4", "a7a6", "e4e5", "d7d5", "e5d6"],
    );
}

#[test]
fn transpositions_share_a_hash() {
    mutsu::init();
    // Nf3/Nf6 then e3/e6 reaches the same position as e3/e6 then Nf3/Nf6
    let mut a = Board::start_pos();
    for m in ["g1f3", "g8f6", "e2e3", "e7e6"] {
        let mv = a.coordinate_move(m).unwrap();
        a.make(mv);
    }
    let mut b = Board::start_pos();
    for m in ["e2e3", "e7e6", "g1f3", "g8f6"] {
        let mv = b.coordinate_move(m).unwrap();
        b.make(mv);
    }
    assert_eq!(a.hash, b.hash);
}

#[test]
fn mate_in_one_is_found_and_reported() {
    mutsu::init();
    let mut engine = Engine::new();
    engine
        .load_position("6k1/5ppp/8/8/8/8/5PPP/R5K1 w - - 0 1")
        .unwrap();
    let mut last_score = None;
    let result = engine.search_best_move(1_000, |r| last_score = Some(r.score));

    let best = result.best_move.expect("a best move exists");
    assert_eq!(last_score, Some(ReportedScore::Mate(1)));

    // Playing the move really mates: the opponent has no legal replies
    // and stands in check
    engine.apply_coordinate_move(&best.to_uci()).unwrap();
    let mut replies = MoveList::new();
    movegen::generate_moves(&engine.board, &mut replies);
    assert!(replies.is_empty());
    assert!(engine.board.in_check());
}

#[test]
fn stalemate_has_no_moves_and_scores_zero() {
    mutsu::init();
    let mut engine = Engine::new();
    engine.load_position("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1").unwrap();

    let mut list = MoveList::new();
    movegen::generate_moves(&engine.board, &mut list);
    assert!(list.is_empty());
    assert!(!engine.board.in_check());

    let result = engine.search_best_move(1_000, |_| {});
    assert!(result.best_move.is_none());
    assert_eq!(result.score, 0);
}

#[test]
fn en_passant_discovered_check_trap() {
    mutsu::init();
    let board = Board::from_fen("8/8/8/KPp4r/8/8/8/4k3 w - c6 0 1").unwrap();
    let mut list = MoveList::new();
    movegen::generate_moves(&board, &mut list);
    assert!(
        list.as_slice().iter().all(|m| !m.is_en_passant()),
        "b5c6 exposes the a5 king along the fifth rank and must be rejected"
    );
}

#[test]
fn errors_surface_and_preserve_state() {
    mutsu::init();
    let mut engine = Engine::new();
    engine.apply_coordinate_move("e2e4").unwrap();
    let fen = engine.board.to_fen();
    let hash = engine.board.hash;

    assert!(matches!(
        engine.load_position("rnbqkbnr/pppppppp/8/8"),
        Err(EngineError::MalformedPosition(_))
    ));
    assert!(matches!(
        engine.apply_coordinate_move("e4e6"),
        Err(EngineError::IllegalCoordinateMove(_))
    ));
    assert!(matches!(
        engine.apply_coordinate_move("king to e5 please"),
        Err(EngineError::IllegalCoordinateMove(_))
    ));

    assert_eq!(engine.board.to_fen(), fen);
    assert_eq!(engine.board.hash, hash);
}

#[test]
fn legal_moves_match_attack_definition() {
    mutsu::init();
    // Every generated move, once made, leaves the mover's king unattacked
    let fens = [
        mutsu::board::START_FEN,
        "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
        "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
        "4r2k/8/8/8/1b6/8/8/R3K2R w KQ - 0 1",
    ];
    for fen in fens {
        let mut board = Board::from_fen(fen).unwrap();
        let us = board.side;
        let mut list = MoveList::new();
        movegen::generate_moves(&board, &mut list);
        for &m in list.as_slice() {
            board.make(m);
            assert!(
                !board.is_square_attacked(board.king_sq(us), board.side),
                "{} leaves the king in check in {}",
                m,
                fen
            );
            board.unmake(m);
        }
        // And no pseudo-legal move outside the list is actually legal:
        // spot-check that king captures never appear
        for &m in list.as_slice() {
            if let Some((piece, _)) = board.piece_at(m.to_sq()) {
                assert_ne!(piece, Piece::King);
            }
        }
    }
}
