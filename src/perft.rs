use std::time::Instant;

use log::{error, info};
use num_format::{Locale, ToFormattedString};

use crate::{
    board::Board,
    moves::{Move, MoveKind, MoveRollback},
};

/// This option is slow
const ENABLE_PERFT_STATS_CHECKS: bool = true;
/// This option is very slow
const ENABLE_PERFT_STATS_CHECKMATES: bool = false;

impl Board {
    /// Counts the leaf nodes of the legal move tree `depth` plies deep. With `divide` the count below each
    /// root move is printed as well.
    pub fn start_perft(&mut self, depth: u8, divide: bool) -> u64 {
        let stats = self.perft_with_stats(depth, divide);

        if divide {
            println!("\n{}", stats.nodes);
        }

        stats.nodes
    }

    pub fn perft_with_stats(&mut self, depth: u8, divide: bool) -> PerftStats {
        let mut rollback = MoveRollback::default();
        let mut stats = PerftStats::default();

        let start_time = Instant::now();
        do_perft(depth, 1, self, &mut rollback, &mut stats, divide);
        let elapsed = start_time.elapsed();

        let nps = stats.nodes as f64 / elapsed.as_secs_f64();
        info!(
            "depth {depth} in {elapsed:#?}. Nodes: {}. Nodes per second: {}",
            stats.nodes.to_formatted_string(&Locale::en),
            (nps as u64).to_formatted_string(&Locale::en)
        );
        info!("{:?}", stats);
        debug_assert!(rollback.is_empty());

        stats
    }
}

/// Counts of the moves that lead to the leaves, in the usual perft table layout.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PerftStats {
    pub nodes: u64,
    pub captures: u64,
    pub eps: u64,
    pub castles: u64,
    pub promotions: u64,
    pub checks: u64,
    pub checkmates: u64,
}

// Code referenced from https://www.chessprogramming.org/Perft
fn do_perft(draft: u8, ply: u8, board: &mut Board, rollback: &mut MoveRollback, stats: &mut PerftStats, divide: bool) {
    if draft == 0 {
        stats.nodes += 1;
        return;
    }

    for r#move in board.legal_moves() {
        if let Err(e) = board.make_move_with_rollback(&r#move, rollback) {
            error!("Legal move {} could not be made in {}: {e}", r#move, board.to_fen());
            continue;
        }

        if draft == 1 {
            check_perft_stats(&r#move, board, stats);
        }

        let start_nodes = stats.nodes;
        do_perft(draft - 1, ply + 1, board, rollback, stats, divide);

        if divide && ply == 1 {
            println!(
                "{} {}",
                r#move.simple_long_algebraic_notation(),
                stats.nodes - start_nodes
            )
        }

        board.unmake_move_with_rollback(rollback);
    }
}

/// Called with `move` already made.
fn check_perft_stats(r#move: &Move, board: &mut Board, stats: &mut PerftStats) {
    if r#move.is_capture() {
        stats.captures += 1;

        if r#move.kind == MoveKind::EnPassant {
            stats.eps += 1;
        }
    } else if r#move.is_castle() {
        stats.castles += 1;
    }

    if r#move.is_promotion() {
        stats.promotions += 1;
    }

    if ENABLE_PERFT_STATS_CHECKS && board.is_in_check(board.side_to_move()) {
        stats.checks += 1;

        // slow as all heck
        if ENABLE_PERFT_STATS_CHECKMATES && board.legal_moves().is_empty() {
            stats.checkmates += 1;
        }
    }
}
