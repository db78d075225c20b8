//! UCI (Universal Chess Interface) front-end.
//!
//! The command loop owns the position; each `go` clones the board and
//! hands the searcher to a worker thread, so `stop` can be read and acted
//! on while the search runs. The searcher travels back through the join
//! handle when the search ends.

use crate::bitboard::Color;
use crate::board::Board;
use crate::movegen;
use crate::search::{ReportedScore, SearchReport, Searcher};
use crate::{eval, Engine};
use std::io::{self, BufRead};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

const ENGINE_NAME: &str = "Mutsu";
const ENGINE_AUTHOR: &str = "Mutsu developers";

/// Remaining-time default when the GUI gives no clock: large enough that
/// the per-move cap stays off and the search runs to full depth.
const NO_CLOCK_BUDGET_MS: u64 = u64::MAX;

pub fn uci_loop() {
    let stdin = io::stdin();
    let mut engine = Engine::new();
    let stop: Arc<AtomicBool> = engine.stop_handle();
    let mut pending: Option<JoinHandle<Searcher>> = None;

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(_) => break,
        };
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.is_empty() {
            continue;
        }

        match tokens[0] {
            "uci" => {
                println!("id name {}", ENGINE_NAME);
                println!("id author {}", ENGINE_AUTHOR);
                println!("uciok");
            }
            "isready" => {
                println!("readyok");
            }
            "ucinewgame" => {
                reclaim(&mut engine, &mut pending);
                engine.new_game();
            }
            "position" => {
                reclaim(&mut engine, &mut pending);
                parse_position(&tokens, &mut engine);
            }
            "go" => {
                reclaim(&mut engine, &mut pending);
                let budget = parse_time_budget(&tokens, engine.board.side);
                pending = Some(spawn_search(&mut engine, budget));
            }
            "stop" => {
                stop.store(true, Ordering::Relaxed);
            }
            "quit" => {
                stop.store(true, Ordering::Relaxed);
                reclaim(&mut engine, &mut pending);
                break;
            }
            "d" | "display" => {
                reclaim(&mut engine, &mut pending);
                engine.board.print();
            }
            "perft" => {
                reclaim(&mut engine, &mut pending);
                if let Some(depth) = tokens.get(1).and_then(|t| t.parse::<u32>().ok()) {
                    let start = std::time::Instant::now();
                    let nodes = movegen::perft_divide(&mut engine.board, depth);
                    let elapsed = start.elapsed().as_millis();
                    println!("nodes {} time {}ms", nodes, elapsed);
                }
            }
            "eval" => {
                reclaim(&mut engine, &mut pending);
                println!("eval {} cp (side to move)", eval::evaluate(&engine.board));
            }
            _ => {
                // Unknown commands are ignored, per the UCI protocol
            }
        }
    }
}

/// Wait for a running search and take the searcher back.
fn reclaim(engine: &mut Engine, pending: &mut Option<JoinHandle<Searcher>>) {
    if let Some(handle) = pending.take() {
        engine.searcher = handle.join().expect("search worker panicked");
    }
}

/// Run the search on a worker thread against a copy of the position;
/// progress and the final bestmove are printed from the worker.
fn spawn_search(engine: &mut Engine, budget_ms: u64) -> JoinHandle<Searcher> {
    let mut board = engine.board.clone();
    // Leave a fresh placeholder; the real searcher comes back via join
    let mut searcher = std::mem::replace(&mut engine.searcher, Searcher::new(1));

    std::thread::spawn(move || {
        let result = searcher.search(&mut board, budget_ms, crate::search::MAX_DEPTH, print_info);
        match result.best_move {
            Some(m) => println!("bestmove {}", m),
            // No legal moves: the UCI null move
            None => println!("bestmove 0000"),
        }
        searcher
    })
}

fn print_info(report: &SearchReport) {
    let score = match report.score {
        ReportedScore::Cp(v) => format!("cp {}", v),
        ReportedScore::Mate(n) => format!("mate {}", n),
    };
    println!(
        "info depth {} score {} time {} nodes {}",
        report.depth, score, report.time_ms, report.nodes
    );
}

fn parse_position(tokens: &[&str], engine: &mut Engine) {
    let mut idx = 1;
    if idx >= tokens.len() {
        return;
    }

    if tokens[idx] == "startpos" {
        engine.board = Board::start_pos();
        idx += 1;
    } else if tokens[idx] == "fen" {
        idx += 1;
        let mut fen_parts = Vec::new();
        while idx < tokens.len() && tokens[idx] != "moves" {
            fen_parts.push(tokens[idx]);
            idx += 1;
        }
        if let Err(err) = engine.load_position(&fen_parts.join(" ")) {
            eprintln!("{}", err);
            return;
        }
    }

    if idx < tokens.len() && tokens[idx] == "moves" {
        for text in &tokens[idx + 1..] {
            if let Err(err) = engine.apply_coordinate_move(text) {
                eprintln!("{}", err);
                return;
            }
        }
    }
}

/// Extract the remaining game time for the side to move. "movetime" is
/// treated as a whole-move budget by pretending the clock is that low.
fn parse_time_budget(tokens: &[&str], side: Color) -> u64 {
    let want = match side {
        Color::White => "wtime",
        Color::Black => "btime",
    };
    let mut iter = tokens.iter();
    while let Some(tok) = iter.next() {
        if *tok == want || *tok == "movetime" {
            if let Some(ms) = iter.next().and_then(|t| t.parse::<u64>().ok()) {
                return ms;
            }
        }
    }
    NO_CLOCK_BUDGET_MS
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::START_FEN;

    fn setup() {
        crate::init();
    }

    #[test]
    fn test_parse_position_startpos_moves() {
        setup();
        let mut engine = Engine::new();
        let tokens: Vec<&str> = "position startpos moves e2e4 e7e5"
            .split_whitespace()
            .collect();
        parse_position(&tokens, &mut engine);
        assert_eq!(
            engine.board.to_fen(),
            "rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w KQkq e6 0 2"
        );
    }

    #[test]
    fn test_parse_position_fen() {
        setup();
        let mut engine = Engine::new();
        let fen = "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1";
        let line = format!("position fen {}", fen);
        let tokens: Vec<&str> = line.split_whitespace().collect();
        parse_position(&tokens, &mut engine);
        assert_eq!(engine.board.to_fen(), fen);
    }

    #[test]
    fn test_parse_position_bad_move_stops_cleanly() {
        setup();
        let mut engine = Engine::new();
        let tokens: Vec<&str> = "position startpos moves e2e4 e7e6 zz99"
            .split_whitespace()
            .collect();
        parse_position(&tokens, &mut engine);
        // The two legal moves applied, the junk was rejected
        assert_eq!(
            engine.board.to_fen(),
            "rnbqkbnr/pppp1ppp/4p3/8/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 0 2"
        );
    }

    #[test]
    fn test_parse_time_budget() {
        setup();
        let tokens: Vec<&str> = "go wtime 53000 btime 61000 winc 1000 binc 1000"
            .split_whitespace()
            .collect();
        assert_eq!(parse_time_budget(&tokens, Color::White), 53000);
        assert_eq!(parse_time_budget(&tokens, Color::Black), 61000);

        let tokens: Vec<&str> = "go movetime 1500".split_whitespace().collect();
        assert_eq!(parse_time_budget(&tokens, Color::White), 1500);

        let tokens: Vec<&str> = "go infinite".split_whitespace().collect();
        assert_eq!(parse_time_budget(&tokens, Color::White), NO_CLOCK_BUDGET_MS);
    }

    #[test]
    fn test_position_startpos_resets(){
        setup();
        let mut engine = Engine::new();
        engine.apply_coordinate_move("e2e4").unwrap();
        let tokens: Vec<&str> = "position startpos".split_whitespace().collect();
        parse_position(&tokens, &mut engine);
        assert_eq!(engine.board.to_fen(), START_FEN);
    }
}
