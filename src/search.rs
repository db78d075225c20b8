//! Iterative-deepening negamax search with alpha-beta pruning, a
//! transposition table, quiescence extension, and killer/history move
//! ordering. All mutable search state lives in [`Searcher`]; nothing is
//! process-global.

use crate::board::Board;
use crate::eval::{self, INFINITY, MATE_SCORE};
use crate::movegen;
use crate::moves::{Move, MoveKind, MoveList, MOVE_NONE};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Maximum iterative-deepening depth.
pub const MAX_DEPTH: i32 = 8;
/// Fixed quiescence extension depth.
pub const QUIESCENCE_DEPTH: i32 = 3;
/// Killer slots are tracked this many plies deep.
const MAX_PLY: usize = 64;

const CAPTURE_BONUS: i32 = 1000;
const FIRST_KILLER_BONUS: i32 = 150;
const SECOND_KILLER_BONUS: i32 = 100;

/// With this much game time or less remaining, every move is capped.
pub const TIGHT_TIME_THRESHOLD_MS: u64 = 180_000;
/// Per-move cap applied under tight time control.
pub const TIME_PER_MOVE_MS: u64 = 2_000;

// ============================================================
// Transposition table
// ============================================================

/// What a stored score means relative to the search window it came from.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TTFlag {
    Exact,
    /// Upper bound: the true score is at most this (search failed low).
    Alpha,
    /// Lower bound: the true score is at least this (search failed high).
    Beta,
}

#[derive(Clone, Copy)]
pub struct TTEntry {
    pub hash: u64,
    pub depth: i32,
    pub score: i32,
    pub flag: TTFlag,
    pub best_move: Move,
}

/// Fixed-size, open-addressed by `hash % capacity`, always-replace.
pub struct TranspositionTable {
    entries: Vec<Option<TTEntry>>,
}

impl TranspositionTable {
    pub fn new(size_mb: usize) -> Self {
        let entry_size = std::mem::size_of::<Option<TTEntry>>();
        let size = (size_mb * 1024 * 1024 / entry_size).max(1);
        TranspositionTable {
            entries: vec![None; size],
        }
    }

    #[inline]
    pub fn probe(&self, hash: u64) -> Option<&TTEntry> {
        let idx = (hash as usize) % self.entries.len();
        self.entries[idx].as_ref().filter(|e| e.hash == hash)
    }

    #[inline]
    pub fn store(&mut self, hash: u64, depth: i32, score: i32, flag: TTFlag, best_move: Move) {
        let idx = (hash as usize) % self.entries.len();
        self.entries[idx] = Some(TTEntry {
            hash,
            depth,
            score,
            flag,
            best_move,
        });
    }

    pub fn clear(&mut self) {
        self.entries.fill(None);
    }
}

// ============================================================
// Progress reporting
// ============================================================

/// Score as reported to the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportedScore {
    /// Centipawns for the side to move.
    Cp(i32),
    /// Forced mate in this many full moves; negative when we are mated.
    Mate(i32),
}

/// One progress event, emitted after each completed depth iteration.
#[derive(Debug, Clone, Copy)]
pub struct SearchReport {
    pub depth: i32,
    pub score: ReportedScore,
    pub time_ms: u64,
    pub nodes: u64,
}

/// Final result of an iterative-deepening run.
#[derive(Debug, Clone, Copy)]
pub struct SearchResult {
    /// None only when the root position has no legal moves.
    pub best_move: Option<Move>,
    pub score: i32,
    pub depth: i32,
    pub nodes: u64,
    pub time_ms: u64,
}

// ============================================================
// Searcher
// ============================================================

/// Owning container for all search state: transposition table, killer and
/// history tables, node counter, and the cooperative stop flag.
pub struct Searcher {
    pub tt: TranspositionTable,
    killers: [[Move; 2]; MAX_PLY],
    history: [[i32; 64]; 64],
    nodes: u64,
    stop: Arc<AtomicBool>,
}

impl Searcher {
    pub fn new(tt_size_mb: usize) -> Self {
        Searcher {
            tt: TranspositionTable::new(tt_size_mb),
            killers: [[MOVE_NONE; 2]; MAX_PLY],
            history: [[0; 64]; 64],
            nodes: 0,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Handle the driver may use to request a cooperative stop. The flag is
    /// checked between depth iterations, never inside one.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// Reset per-round state. The transposition table survives rounds; it
    /// is cleared only for a new game.
    fn reinit(&mut self) {
        self.killers = [[MOVE_NONE; 2]; MAX_PLY];
        self.history = [[0; 64]; 64];
        self.nodes = 0;
    }

    /// Iterative deepening to `max_depth`, honoring the stop flag and the
    /// tight-time per-move cap. `time_left_ms` is the remaining game time;
    /// one report is emitted per completed depth, in increasing order.
    pub fn search(
        &mut self,
        board: &mut Board,
        time_left_ms: u64,
        max_depth: i32,
        mut report: impl FnMut(&SearchReport),
    ) -> SearchResult {
        self.reinit();
        let start = Instant::now();

        let mut best_move = None;
        let mut best_score = 0;
        let mut depth_reached = 0;
        let mut total_nodes: u64 = 0;

        for depth in 1..=max_depth.min(MAX_DEPTH) {
            let iter_start = Instant::now();
            let (mv, score) = self.root_negamax(board, depth);

            best_move = mv;
            best_score = score;
            depth_reached = depth;
            total_nodes += self.nodes;

            let score_report = if eval::is_mate_score(score) {
                ReportedScore::Mate(eval::mate_in(score))
            } else {
                ReportedScore::Cp(score)
            };
            report(&SearchReport {
                depth,
                score: score_report,
                time_ms: iter_start.elapsed().as_millis() as u64,
                nodes: self.nodes,
            });
            self.nodes = 0;

            // A mated or stalemated root has nothing more to deepen
            if mv.is_none() {
                break;
            }

            // Cooperative stop: the current iteration always completes
            if self.stop.swap(false, Ordering::Relaxed) {
                break;
            }

            // Under tight time control, cap the total time per move
            if time_left_ms <= TIGHT_TIME_THRESHOLD_MS
                && start.elapsed().as_millis() as u64 >= TIME_PER_MOVE_MS
            {
                break;
            }
        }

        SearchResult {
            best_move,
            score: best_score,
            depth: depth_reached,
            nodes: total_nodes,
            time_ms: start.elapsed().as_millis() as u64,
        }
    }

    fn root_negamax(&mut self, board: &mut Board, depth: i32) -> (Option<Move>, i32) {
        let mut list = MoveList::new();
        movegen::generate_moves(board, &mut list);

        if list.is_empty() {
            let score = if board.in_check() { -MATE_SCORE } else { 0 };
            return (None, score);
        }

        let moves = self.order_moves(board, &list, 0);
        let mut alpha = -INFINITY;
        let beta = INFINITY - 1;
        let mut best_move = None;
        let mut best_score = -INFINITY;

        for m in moves {
            board.make(m);
            let score = -self.negamax(board, depth - 1, -beta, -alpha, 1);
            board.unmake(m);

            if score > best_score {
                best_score = score;
            }
            if score > alpha {
                alpha = score;
                best_move = Some(m);
            }
            if score >= beta {
                break;
            }
        }
        (best_move, best_score)
    }

    fn negamax(&mut self, board: &mut Board, depth: i32, mut alpha: i32, beta: i32, ply: i32) -> i32 {
        if let Some(score) = self.probe_tt(board.hash, depth, alpha, beta) {
            return score;
        }

        if depth == 0 {
            return self.quiescence(board, QUIESCENCE_DEPTH, alpha, beta, ply);
        }

        self.nodes += 1;

        let mut list = MoveList::new();
        movegen::generate_moves(board, &mut list);

        if list.is_empty() {
            // Shift mate scores by ply so nearer mates score higher
            return if board.in_check() {
                -(MATE_SCORE - ply)
            } else {
                0
            };
        }

        let moves = self.order_moves(board, &list, ply);
        let mut flag = TTFlag::Alpha;
        let mut best_move = MOVE_NONE;

        for m in moves {
            board.make(m);
            let score = -self.negamax(board, depth - 1, -beta, -alpha, ply + 1);
            board.unmake(m);

            if score >= beta {
                self.tt.store(board.hash, depth, beta, TTFlag::Beta, m);
                if !m.is_capture() {
                    let p = ply as usize;
                    if p < MAX_PLY {
                        self.killers[p][1] = self.killers[p][0];
                        self.killers[p][0] = m;
                    }
                }
                return beta;
            }
            if score > alpha {
                flag = TTFlag::Exact;
                alpha = score;
                best_move = m;
                if !m.is_capture() {
                    self.history[m.from_sq() as usize][m.to_sq() as usize] += depth * depth;
                }
            }
        }

        self.tt.store(board.hash, depth, alpha, flag, best_move);
        alpha
    }

    /// Capture-only extension of the leaves, bounded by a fixed depth.
    fn quiescence(&mut self, board: &mut Board, qdepth: i32, mut alpha: i32, beta: i32, ply: i32) -> i32 {
        self.nodes += 1;

        let stand_pat = eval::evaluate(board);
        if qdepth == 0 {
            return stand_pat;
        }
        if stand_pat >= beta {
            return beta;
        }
        if alpha < stand_pat {
            alpha = stand_pat;
        }

        let mut list = MoveList::new();
        movegen::generate_moves(board, &mut list);
        let moves = self.order_moves(board, &list, ply);

        for m in moves {
            if !matches!(m.kind(), MoveKind::Attack | MoveKind::AttackEp) {
                continue;
            }
            board.make(m);
            let score = -self.quiescence(board, qdepth - 1, -beta, -alpha, ply + 1);
            board.unmake(m);

            if score >= beta {
                return beta;
            }
            if score > alpha {
                alpha = score;
            }
        }
        alpha
    }

    fn probe_tt(&mut self, hash: u64, depth: i32, alpha: i32, beta: i32) -> Option<i32> {
        let entry = self.tt.probe(hash)?;
        if entry.depth < depth {
            return None;
        }
        match entry.flag {
            TTFlag::Exact => Some(entry.score),
            TTFlag::Alpha if entry.score <= alpha => Some(alpha),
            TTFlag::Beta if entry.score >= beta => Some(beta),
            _ => None,
        }
    }

    /// Score and sort moves, best first. Ties keep insertion order, so
    /// ordering is deterministic for a given position.
    fn order_moves(&self, board: &Board, list: &MoveList, ply: i32) -> Vec<Move> {
        let mut scored: Vec<(i32, Move)> = list
            .as_slice()
            .iter()
            .map(|&m| (self.score_move(board, m, ply), m))
            .collect();
        scored.sort_by_key(|&(score, _)| std::cmp::Reverse(score));
        scored.into_iter().map(|(_, m)| m).collect()
    }

    fn score_move(&self, board: &Board, m: Move, ply: i32) -> i32 {
        let victim_value = |sq: u8| board.piece_at(sq).map_or(0, |(p, _)| eval::piece_value(p));

        match m.kind() {
            MoveKind::Attack => {
                let attacker = board
                    .piece_at(m.from_sq())
                    .map_or(0, |(p, _)| eval::piece_value(p));
                victim_value(m.to_sq()) - attacker + CAPTURE_BONUS
            }
            // Pawn takes pawn, scored like any even capture
            MoveKind::AttackEp => CAPTURE_BONUS,
            MoveKind::PromoKnight => eval::KNIGHT_VALUE + victim_value(m.to_sq()),
            MoveKind::PromoBishop => eval::BISHOP_VALUE + victim_value(m.to_sq()),
            MoveKind::PromoRook => eval::ROOK_VALUE + victim_value(m.to_sq()),
            MoveKind::PromoQueen => eval::QUEEN_VALUE + victim_value(m.to_sq()),
            _ => {
                let p = ply as usize;
                if p < MAX_PLY && m == self.killers[p][0] {
                    FIRST_KILLER_BONUS
                } else if p < MAX_PLY && m == self.killers[p][1] {
                    SECOND_KILLER_BONUS
                } else {
                    self.history[m.from_sq() as usize][m.to_sq() as usize]
                }
            }
        }
    }
}
