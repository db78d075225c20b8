//! The boundary a driver talks to: load a position, apply coordinate
//! moves, request a best move under a time budget, ask for a stop.

use crate::board::Board;
use crate::error::EngineError;
use crate::moves::Move;
use crate::search::{SearchReport, SearchResult, Searcher, MAX_DEPTH};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

const DEFAULT_TT_SIZE_MB: usize = 16;

pub struct Engine {
    pub board: Board,
    pub searcher: Searcher,
}

impl Engine {
    pub fn new() -> Self {
        Engine {
            board: Board::start_pos(),
            searcher: Searcher::new(DEFAULT_TT_SIZE_MB),
        }
    }

    /// Start a fresh game: starting position, cleared transposition table.
    pub fn new_game(&mut self) {
        self.board = Board::start_pos();
        self.searcher.tt.clear();
    }

    /// Replace the current position with one parsed from FEN. On error the
    /// current position is left untouched.
    pub fn load_position(&mut self, fen: &str) -> Result<(), EngineError> {
        self.board = Board::from_fen(fen)?;
        Ok(())
    }

    /// Apply a driver-supplied coordinate move ("e2e4", "e7e8q", castling
    /// as the king's two-square move). Rejected unless it is in the legal
    /// move set; the position is untouched on error.
    pub fn apply_coordinate_move(&mut self, text: &str) -> Result<Move, EngineError> {
        let m = self.board.coordinate_move(text)?;
        self.board.make(m);
        Ok(m)
    }

    /// Search for the best move under the given remaining-time budget,
    /// streaming one progress report per completed depth.
    pub fn search_best_move(
        &mut self,
        time_budget_ms: u64,
        report: impl FnMut(&SearchReport),
    ) -> SearchResult {
        self.searcher
            .search(&mut self.board, time_budget_ms, MAX_DEPTH, report)
    }

    /// Cooperative stop flag: setting it makes the search return after the
    /// depth iteration in progress.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.searcher.stop_handle()
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::START_FEN;
    use crate::error::EngineError;

    fn setup() {
        crate::init();
    }

    #[test]
    fn test_load_and_apply_moves() {
        setup();
        let mut engine = Engine::new();
        engine.apply_coordinate_move("e2e4").unwrap();
        engine.apply_coordinate_move("c7c5").unwrap();
        engine.apply_coordinate_move("g1f3").unwrap();
        assert_eq!(
            engine.board.to_fen(),
            "rnbqkbnr/pp1ppppp/8/2p5/4P3/5N2/PPPP1PPP/RNBQKB1R b KQkq - 1 2"
        );
    }

    #[test]
    fn test_illegal_move_leaves_position_untouched() {
        setup();
        let mut engine = Engine::new();
        let before = engine.board.to_fen();
        let err = engine.apply_coordinate_move("e2e5").unwrap_err();
        assert!(matches!(err, EngineError::IllegalCoordinateMove(_)));
        assert_eq!(engine.board.to_fen(), before);
    }

    #[test]
    fn test_bad_fen_leaves_position_untouched() {
        setup();
        let mut engine = Engine::new();
        engine.apply_coordinate_move("d2d4").unwrap();
        let before = engine.board.to_fen();
        let err = engine.load_position("not a fen").unwrap_err();
        assert!(matches!(err, EngineError::MalformedPosition(_)));
        assert_eq!(engine.board.to_fen(), before);
    }

    #[test]
    fn test_new_game_resets() {
        setup();
        let mut engine = Engine::new();
        engine.apply_coordinate_move("e2e4").unwrap();
        engine.new_game();
        assert_eq!(engine.board.to_fen(), START_FEN);
    }

    #[test]
    fn test_search_best_move_streams_progress() {
        setup();
        let mut engine = Engine::new();
        engine
            .load_position("6k1/5ppp/8/8/8/8/5PPP/R5K1 w - - 0 1")
            .unwrap();
        let mut depths = Vec::new();
        // Tight budget keeps the test quick: the per-move cap kicks in
        let result = engine.search_best_move(1_000, |r| depths.push(r.depth));
        assert_eq!(result.best_move.unwrap().to_uci(), "a1a8");
        assert!(!depths.is_empty());
        assert!(depths.windows(2).all(|w| w[1] == w[0] + 1));
    }
}
