//! Criterion benchmarks for move generation and perft.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use mutsu::board::Board;
use mutsu::movegen::{generate_moves, perft};
use mutsu::moves::MoveList;

const STARTPOS: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";
const KIWIPETE: &str = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";

fn bench_generate_moves(c: &mut Criterion) {
    mutsu::init();
    let start = Board::from_fen(STARTPOS).unwrap();
    let kiwipete = Board::from_fen(KIWIPETE).unwrap();

    c.bench_function("generate_moves_startpos", |b| {
        b.iter(|| {
            let mut list = MoveList::new();
            generate_moves(black_box(&start), &mut list);
            black_box(list.len())
        })
    });
    c.bench_function("generate_moves_kiwipete", |b| {
        b.iter(|| {
            let mut list = MoveList::new();
            generate_moves(black_box(&kiwipete), &mut list);
            black_box(list.len())
        })
    });
}

fn bench_perft(c: &mut Criterion) {
    mutsu::init();
    let cases: [(&str, &str, u32, u64); 3] = [
        ("startpos", STARTPOS, 4, 197_281),
        ("kiwipete", KIWIPETE, 3, 97_862),
        ("position3", "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1", 4, 43_238),
    ];

    let mut group = c.benchmark_group("perft");
    group.sample_size(10);
    for (name, fen, depth, expected) in cases {
        group.bench_function(format!("{name}_d{depth}"), |b| {
            b.iter(|| {
                let mut board = Board::from_fen(fen).unwrap();
                let nodes = perft(&mut board, depth);
                assert_eq!(nodes, expected);
                black_box(nodes)
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_generate_moves, bench_perft);
criterion_main!(benches);
