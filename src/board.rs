//! Board state: bitboards plus a mailbox, kept in lockstep.
//! The bitboards drive move generation; the mailbox answers "what sits on
//! this square" during make/unmake without scanning. Every mutation goes
//! through put/remove/move_piece, which also fold the Zobrist keys into the
//! incrementally maintained hash.

use crate::bitboard::*;
use crate::error::EngineError;
use crate::movegen;
use crate::moves::{Move, MoveKind, MoveList};
use crate::zobrist;

/// Castling rights encoded as 4 bits
pub const WK_CASTLE: u8 = 0b0001; // White kingside
pub const WQ_CASTLE: u8 = 0b0010; // White queenside
pub const BK_CASTLE: u8 = 0b0100; // Black kingside
pub const BQ_CASTLE: u8 = 0b1000; // Black queenside
pub const ALL_CASTLES: u8 = 0b1111;

pub const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Saved per-ply state that a move alone cannot restore.
#[derive(Clone, Copy)]
pub struct UndoInfo {
    pub castling: u8,
    pub ep_square: Option<u8>,
    pub halfmove: u16,
    pub fullmove: u16,
    pub captured: Option<(Piece, Color)>,
    pub moved: Piece,
}

/// The complete chess position.
#[derive(Clone)]
pub struct Board {
    /// Bitboards per piece kind per color: pieces[color][kind]
    pub pieces: [[Bitboard; PIECE_COUNT]; COLOR_COUNT],
    /// Combined occupancy per color
    pub occupancy: [Bitboard; COLOR_COUNT],
    /// All occupied squares
    pub all_occupancy: Bitboard,

    /// Square -> occupant, agreeing with the bitboards at all times
    mailbox: [Option<(Piece, Color)>; 64],

    /// Side to move
    pub side: Color,
    /// Castling rights
    pub castling: u8,
    /// En passant target square, if any
    pub ep_square: Option<u8>,
    /// Halfmove clock (fifty-move rule)
    pub halfmove: u16,
    /// Fullmove number
    pub fullmove: u16,

    /// Zobrist hash, maintained incrementally by make/unmake
    pub hash: u64,

    /// Undo stack, one entry per made move
    history: Vec<UndoInfo>,
}

impl Board {
    /// An empty board, no pieces, white to move.
    pub fn empty() -> Self {
        Board {
            pieces: [[0; PIECE_COUNT]; COLOR_COUNT],
            occupancy: [0; COLOR_COUNT],
            all_occupancy: 0,
            mailbox: [None; 64],
            side: Color::White,
            castling: 0,
            ep_square: None,
            halfmove: 0,
            fullmove: 1,
            hash: 0,
            history: Vec::with_capacity(256),
        }
    }

    pub fn start_pos() -> Self {
        Self::from_fen(START_FEN).expect("start FEN must parse")
    }

    /// Parse a six-field FEN string. Errors never touch an existing
    /// position: a board is only handed out on success.
    pub fn from_fen(fen: &str) -> Result<Self, EngineError> {
        let bad = |what: &str| EngineError::MalformedPosition(format!("{what} in {fen:?}"));

        let fields: Vec<&str> = fen.split_whitespace().collect();
        if fields.len() != 6 {
            return Err(bad("expected six fields"));
        }

        let mut board = Board::empty();

        // 1. Piece placement, ranks 8 down to 1
        let ranks: Vec<&str> = fields[0].split('/').collect();
        if ranks.len() != 8 {
            return Err(bad("expected eight ranks"));
        }
        for (i, rank_text) in ranks.iter().enumerate() {
            let rank = 7 - i as u8;
            let mut file: u8 = 0;
            for ch in rank_text.chars() {
                if let Some(d) = ch.to_digit(10) {
                    if !(1..=8).contains(&d) {
                        return Err(bad("bad empty-square digit"));
                    }
                    file += d as u8;
                } else {
                    let piece = Piece::from_char(ch).ok_or_else(|| bad("bad piece letter"))?;
                    if file >= 8 {
                        return Err(bad("rank overflow"));
                    }
                    let color = if ch.is_ascii_uppercase() {
                        Color::White
                    } else {
                        Color::Black
                    };
                    board.put_piece(piece, color, make_square(file, rank));
                    file += 1;
                }
                if file > 8 {
                    return Err(bad("rank overflow"));
                }
            }
            if file != 8 {
                return Err(bad("rank underfull"));
            }
        }

        // 2. Side to move
        board.side = match fields[1] {
            "w" => Color::White,
            "b" => Color::Black,
            _ => return Err(bad("bad side to move")),
        };

        // 3. Castling rights
        if fields[2] != "-" {
            for ch in fields[2].chars() {
                match ch {
                    'K' => board.castling |= WK_CASTLE,
                    'Q' => board.castling |= WQ_CASTLE,
                    'k' => board.castling |= BK_CASTLE,
                    'q' => board.castling |= BQ_CASTLE,
                    _ => return Err(bad("bad castling rights")),
                }
            }
        }

        // 4. En passant square
        if fields[3] != "-" {
            let ep = parse_square(fields[3]).ok_or_else(|| bad("bad en passant square"))?;
            let expected_rank = match board.side {
                Color::White => 5,
                Color::Black => 2,
            };
            if rank_of(ep) != expected_rank {
                return Err(bad("en passant square on impossible rank"));
            }
            board.ep_square = Some(ep);
        }

        // 5/6. Clocks
        board.halfmove = fields[4]
            .parse()
            .map_err(|_| bad("bad halfmove clock"))?;
        board.fullmove = fields[5]
            .parse()
            .map_err(|_| bad("bad fullmove number"))?;

        for color in [Color::White, Color::Black] {
            if popcount(board.pieces[color.index()][Piece::King.index()]) != 1 {
                return Err(bad("expected exactly one king per side"));
            }
        }

        // Rights only survive with king and rook on their home squares
        board.update_castling_rights();
        board.hash = board.compute_hash();
        Ok(board)
    }

    /// Serialize back to FEN.
    pub fn to_fen(&self) -> String {
        let mut fen = String::new();

        for rank in (0..8).rev() {
            let mut empty = 0;
            for file in 0..8 {
                let sq = make_square(file, rank);
                if let Some((piece, color)) = self.piece_at(sq) {
                    if empty > 0 {
                        fen.push(char::from_digit(empty, 10).unwrap());
                        empty = 0;
                    }
                    fen.push(piece.to_char(color));
                } else {
                    empty += 1;
                }
            }
            if empty > 0 {
                fen.push(char::from_digit(empty, 10).unwrap());
            }
            if rank > 0 {
                fen.push('/');
            }
        }

        fen.push(' ');
        fen.push(match self.side {
            Color::White => 'w',
            Color::Black => 'b',
        });

        fen.push(' ');
        if self.castling == 0 {
            fen.push('-');
        } else {
            if self.castling & WK_CASTLE != 0 {
                fen.push('K');
            }
            if self.castling & WQ_CASTLE != 0 {
                fen.push('Q');
            }
            if self.castling & BK_CASTLE != 0 {
                fen.push('k');
            }
            if self.castling & BQ_CASTLE != 0 {
                fen.push('q');
            }
        }

        fen.push(' ');
        match self.ep_square {
            Some(sq) => fen.push_str(square_name(sq)),
            None => fen.push('-'),
        }

        fen.push_str(&format!(" {} {}", self.halfmove, self.fullmove));
        fen
    }

    /// What occupies a square?
    #[inline]
    pub fn piece_at(&self, sq: u8) -> Option<(Piece, Color)> {
        self.mailbox[sq as usize]
    }

    /// The king square for a color.
    #[inline]
    pub fn king_sq(&self, color: Color) -> u8 {
        lsb(self.pieces[color.index()][Piece::King.index()])
    }

    /// Number of plies made and not yet unmade.
    pub fn ply(&self) -> usize {
        self.history.len()
    }

    fn put_piece(&mut self, piece: Piece, color: Color, sq: u8) {
        let bb = square_bb(sq);
        self.pieces[color.index()][piece.index()] |= bb;
        self.occupancy[color.index()] |= bb;
        self.all_occupancy |= bb;
        self.mailbox[sq as usize] = Some((piece, color));
        self.hash ^= zobrist::piece_key(color, piece, sq);
    }

    fn remove_piece(&mut self, sq: u8) {
        let (piece, color) = self.mailbox[sq as usize].expect("remove_piece: empty square");
        let bb = square_bb(sq);
        self.pieces[color.index()][piece.index()] &= !bb;
        self.occupancy[color.index()] &= !bb;
        self.all_occupancy &= !bb;
        self.mailbox[sq as usize] = None;
        self.hash ^= zobrist::piece_key(color, piece, sq);
    }

    fn move_piece(&mut self, from: u8, to: u8) {
        let (piece, color) = self.mailbox[from as usize].expect("move_piece: empty from-square");
        debug_assert!(self.mailbox[to as usize].is_none(), "move_piece: occupied to-square");
        let from_to = square_bb(from) | square_bb(to);
        self.pieces[color.index()][piece.index()] ^= from_to;
        self.occupancy[color.index()] ^= from_to;
        self.all_occupancy ^= from_to;
        self.mailbox[from as usize] = None;
        self.mailbox[to as usize] = Some((piece, color));
        self.hash ^= zobrist::piece_key(color, piece, from);
        self.hash ^= zobrist::piece_key(color, piece, to);
    }

    /// Can a pawn of the side to move actually capture on the EP square?
    /// Only then does the EP file participate in the hash, so positions
    /// that transpose with dead EP squares hash identically.
    pub fn ep_capture_possible(&self) -> bool {
        match self.ep_square {
            None => false,
            Some(ep) => {
                let us = self.side;
                movegen::pawn_attacks(ep, us.flip())
                    & self.pieces[us.index()][Piece::Pawn.index()]
                    != 0
            }
        }
    }

    /// Recompute the hash from scratch. `hash` must always equal this.
    pub fn compute_hash(&self) -> u64 {
        let keys = zobrist::keys();
        let mut h: u64 = 0;

        for color in 0..COLOR_COUNT {
            for piece in 0..PIECE_COUNT {
                let mut bb = self.pieces[color][piece];
                while bb != 0 {
                    let sq = pop_lsb(&mut bb);
                    h ^= keys.piece_keys[color][piece][sq as usize];
                }
            }
        }

        h ^= zobrist::castle_keys_for(self.castling);

        if let Some(ep) = self.ep_square {
            if self.ep_capture_possible() {
                h ^= zobrist::ep_key(file_of(ep));
            }
        }

        if self.side == Color::Black {
            h ^= keys.side_key;
        }

        h
    }

    /// Clear any right whose king or rook has left its home square.
    fn update_castling_rights(&mut self) {
        if self.mailbox[sq::E1 as usize] != Some((Piece::King, Color::White)) {
            self.castling &= !(WK_CASTLE | WQ_CASTLE);
        }
        if self.mailbox[sq::H1 as usize] != Some((Piece::Rook, Color::White)) {
            self.castling &= !WK_CASTLE;
        }
        if self.mailbox[sq::A1 as usize] != Some((Piece::Rook, Color::White)) {
            self.castling &= !WQ_CASTLE;
        }
        if self.mailbox[sq::E8 as usize] != Some((Piece::King, Color::Black)) {
            self.castling &= !(BK_CASTLE | BQ_CASTLE);
        }
        if self.mailbox[sq::H8 as usize] != Some((Piece::Rook, Color::Black)) {
            self.castling &= !BK_CASTLE;
        }
        if self.mailbox[sq::A8 as usize] != Some((Piece::Rook, Color::Black)) {
            self.castling &= !BQ_CASTLE;
        }
    }

    /// Apply a legal move. Pushes an undo record; every field including the
    /// hash is restored bit-for-bit by the matching [`Board::unmake`].
    pub fn make(&mut self, m: Move) {
        let from = m.from_sq();
        let to = m.to_sq();
        let us = self.side;
        let them = us.flip();
        let kind = m.kind();

        let moved = self.mailbox[from as usize]
            .expect("make: no piece on from-square")
            .0;

        let captured = match kind {
            MoveKind::Attack => {
                let victim = self.mailbox[to as usize].expect("make: attack on empty square");
                if victim.0 == Piece::King {
                    panic!("make: illegal king capture {m}");
                }
                Some(victim)
            }
            MoveKind::AttackEp => Some((Piece::Pawn, them)),
            _ if m.is_promotion() => self.mailbox[to as usize],
            _ => None,
        };

        self.history.push(UndoInfo {
            castling: self.castling,
            ep_square: self.ep_square,
            halfmove: self.halfmove,
            fullmove: self.fullmove,
            captured,
            moved,
        });

        // Retire the old EP key, if it was hashed
        if let Some(ep) = self.ep_square {
            if self.ep_capture_possible() {
                self.hash ^= zobrist::ep_key(file_of(ep));
            }
        }
        self.ep_square = None;

        match kind {
            MoveKind::CastleWk => {
                self.move_piece(sq::E1, sq::G1);
                self.move_piece(sq::H1, sq::F1);
            }
            MoveKind::CastleWq => {
                self.move_piece(sq::E1, sq::C1);
                self.move_piece(sq::A1, sq::D1);
            }
            MoveKind::CastleBk => {
                self.move_piece(sq::E8, sq::G8);
                self.move_piece(sq::H8, sq::F8);
            }
            MoveKind::CastleBq => {
                self.move_piece(sq::E8, sq::C8);
                self.move_piece(sq::A8, sq::D8);
            }
            MoveKind::AttackEp => {
                let cap_sq = match us {
                    Color::White => to - 8,
                    Color::Black => to + 8,
                };
                self.remove_piece(cap_sq);
                self.move_piece(from, to);
            }
            MoveKind::Attack => {
                self.remove_piece(to);
                self.move_piece(from, to);
            }
            MoveKind::Quiet => self.move_piece(from, to),
            MoveKind::PromoKnight
            | MoveKind::PromoBishop
            | MoveKind::PromoRook
            | MoveKind::PromoQueen => {
                let promo = m.promotion_piece().expect("promotion piece");
                self.remove_piece(from);
                if self.mailbox[to as usize].is_some() {
                    self.remove_piece(to);
                }
                self.put_piece(promo, us, to);
            }
        }

        self.halfmove += 1;
        if moved == Piece::Pawn || m.is_capture() {
            self.halfmove = 0;
        }

        // Double pawn push opens an EP square behind the pawn
        if moved == Piece::Pawn && (from as i8 - to as i8).abs() == 16 {
            self.ep_square = Some(match us {
                Color::White => from + 8,
                Color::Black => from - 8,
            });
        }

        let old_rights = self.castling;
        self.update_castling_rights();
        if self.castling != old_rights {
            self.hash ^= zobrist::castle_keys_for(old_rights ^ self.castling);
        }

        if us == Color::Black {
            self.fullmove += 1;
        }
        self.side = them;
        self.hash ^= zobrist::keys().side_key;

        if let Some(ep) = self.ep_square {
            if self.ep_capture_possible() {
                self.hash ^= zobrist::ep_key(file_of(ep));
            }
        }
    }

    /// Reverse the last made move, restoring every field bit-for-bit.
    /// Steps run in the exact inverse order of [`Board::make`].
    pub fn unmake(&mut self, m: Move) {
        let undo = self.history.pop().expect("unmake: empty undo stack");

        if let Some(ep) = self.ep_square {
            if self.ep_capture_possible() {
                self.hash ^= zobrist::ep_key(file_of(ep));
            }
        }

        self.side = self.side.flip();
        self.hash ^= zobrist::keys().side_key;
        let us = self.side;
        let them = us.flip();

        if self.castling != undo.castling {
            self.hash ^= zobrist::castle_keys_for(self.castling ^ undo.castling);
        }
        self.castling = undo.castling;
        self.halfmove = undo.halfmove;
        self.fullmove = undo.fullmove;

        let from = m.from_sq();
        let to = m.to_sq();

        match m.kind() {
            MoveKind::CastleWk => {
                self.move_piece(sq::G1, sq::E1);
                self.move_piece(sq::F1, sq::H1);
            }
            MoveKind::CastleWq => {
                self.move_piece(sq::C1, sq::E1);
                self.move_piece(sq::D1, sq::A1);
            }
            MoveKind::CastleBk => {
                self.move_piece(sq::G8, sq::E8);
                self.move_piece(sq::F8, sq::H8);
            }
            MoveKind::CastleBq => {
                self.move_piece(sq::C8, sq::E8);
                self.move_piece(sq::D8, sq::A8);
            }
            MoveKind::AttackEp => {
                self.move_piece(to, from);
                let cap_sq = match us {
                    Color::White => to - 8,
                    Color::Black => to + 8,
                };
                self.put_piece(Piece::Pawn, them, cap_sq);
            }
            MoveKind::Attack => {
                self.move_piece(to, from);
                let (piece, color) = undo.captured.expect("unmake: attack without capture");
                self.put_piece(piece, color, to);
            }
            MoveKind::Quiet => self.move_piece(to, from),
            MoveKind::PromoKnight
            | MoveKind::PromoBishop
            | MoveKind::PromoRook
            | MoveKind::PromoQueen => {
                self.remove_piece(to);
                if let Some((piece, color)) = undo.captured {
                    self.put_piece(piece, color, to);
                }
                self.put_piece(Piece::Pawn, us, from);
            }
        }

        self.ep_square = undo.ep_square;
        if let Some(ep) = self.ep_square {
            if self.ep_capture_possible() {
                self.hash ^= zobrist::ep_key(file_of(ep));
            }
        }
    }

    /// Is a square attacked by the given color?
    pub fn is_square_attacked(&self, sq: u8, by: Color) -> bool {
        movegen::is_attacked(self, sq, by, self.all_occupancy)
    }

    /// Is the side to move in check?
    pub fn in_check(&self) -> bool {
        self.is_square_attacked(self.king_sq(self.side), self.side.flip())
    }

    /// Build a move from coordinate text ("e2e4", "e7e8q", castling as the
    /// king's two-square move) and verify it against the legal move set.
    pub fn coordinate_move(&self, text: &str) -> Result<Move, EngineError> {
        let illegal = || EngineError::IllegalCoordinateMove(text.to_string());

        if !text.is_ascii() || (text.len() != 4 && text.len() != 5) {
            return Err(illegal());
        }
        let from = parse_square(&text[0..2]).ok_or_else(illegal)?;
        let to = parse_square(&text[2..4]).ok_or_else(illegal)?;
        let (moved, _) = self.piece_at(from).ok_or_else(illegal)?;

        let kind = if text.len() == 5 {
            match text.as_bytes()[4] {
                b'n' => MoveKind::PromoKnight,
                b'b' => MoveKind::PromoBishop,
                b'r' => MoveKind::PromoRook,
                b'q' => MoveKind::PromoQueen,
                _ => return Err(illegal()),
            }
        } else if moved == Piece::King && text == "e1g1" {
            MoveKind::CastleWk
        } else if moved == Piece::King && text == "e1c1" {
            MoveKind::CastleWq
        } else if moved == Piece::King && text == "e8g8" {
            MoveKind::CastleBk
        } else if moved == Piece::King && text == "e8c8" {
            MoveKind::CastleBq
        } else if moved == Piece::Pawn && self.ep_square == Some(to) {
            MoveKind::AttackEp
        } else if self.piece_at(to).is_some() {
            MoveKind::Attack
        } else {
            MoveKind::Quiet
        };

        let m = Move::new(from, to, kind);
        let mut list = MoveList::new();
        movegen::generate_moves(self, &mut list);
        if !list.contains(m) {
            return Err(illegal());
        }
        Ok(m)
    }

    /// Pretty-print the board for the `d` debug command.
    pub fn print(&self) {
        println!();
        for rank in (0..8).rev() {
            print!("  {} ", rank + 1);
            for file in 0..8 {
                match self.piece_at(make_square(file, rank)) {
                    Some((piece, color)) => print!("{} ", piece.to_char(color)),
                    None => print!(". "),
                }
            }
            println!();
        }
        println!("    a b c d e f g h");
        println!();
        println!("  FEN:  {}", self.to_fen());
        println!("  Hash: 0x{:016X}", self.hash);
    }
}
