use std::{process::ExitCode, time::Instant};

use clap::{Parser, Subcommand};
use log::{LevelFilter, error, info};
use num_format::{Locale, ToFormattedString};

use mailbox_chess::{Board, Result, STARTING_FEN, Square};

const BENCH_FENS: [&str; 6] = [
    "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
    "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
    "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
    "r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1",
    "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8",
    "r4rk1/1pp1qppp/p1np1n2/2b1p1B1/2B1P1b1/P1NP1N2/1PP1QPPP/R4RK1 w - - 0 10",
];

#[derive(Parser, Debug)]
#[command(version, about = "Chess position and legal move generation core")]
struct Cli {
    /// Minimum level written to stderr
    #[arg(long, global = true, default_value_t = LevelFilter::Info)]
    log_level: LevelFilter,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Count leaf nodes of the legal move tree
    Perft {
        #[arg(long, default_value = STARTING_FEN)]
        fen: String,
        #[arg(long, default_value_t = 4)]
        depth: u8,
        /// Print the node count below each root move
        #[arg(long)]
        divide: bool,
    },
    /// List the legal moves of a position
    Moves {
        #[arg(long, default_value = STARTING_FEN)]
        fen: String,
    },
    /// Play moves in coordinate notation or SAN and print the result
    Play {
        #[arg(long, default_value = STARTING_FEN)]
        fen: String,
        moves: Vec<String>,
    },
    /// Time perft over a fixed set of positions
    Bench {
        #[arg(long, default_value_t = 3)]
        depth: u8,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = setup_logger(cli.log_level) {
        eprintln!("Failed to set up logging: {e}");
        return ExitCode::FAILURE;
    }
    log_panics::init();

    let result = match cli.command {
        Command::Perft { fen, depth, divide } => perft(&fen, depth, divide),
        Command::Moves { fen } => print_moves(&fen),
        Command::Play { fen, moves } => play(&fen, &moves),
        Command::Bench { depth } => bench(depth),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn setup_logger(level: LevelFilter) -> std::result::Result<(), log::SetLoggerError> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {} {}] {}",
                humantime::format_rfc3339_millis(std::time::SystemTime::now()),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stderr())
        .apply()
}

fn perft(fen: &str, depth: u8, divide: bool) -> Result<()> {
    let mut board = Board::from_fen(fen)?;
    let nodes = board.start_perft(depth, divide);
    if !divide {
        println!("{nodes}");
    }

    Ok(())
}

fn print_moves(fen: &str) -> Result<()> {
    let mut board = Board::from_fen(fen)?;
    for r#move in board.legal_moves() {
        println!("{} {}", r#move, board.to_san(&r#move)?);
    }

    Ok(())
}

fn play(fen: &str, moves: &[String]) -> Result<()> {
    let mut board = Board::from_fen(fen)?;

    for text in moves {
        let r#move = board.parse_move(text)?;
        let san = board.to_san(&r#move)?;
        board.play(&r#move)?;
        info!("{} {}", board.fullmove_number(), san);
    }

    println!("{}", render(&board));
    println!("{}", board.to_fen());
    println!("{}", board.status());

    Ok(())
}

fn bench(depth: u8) -> Result<()> {
    let start_time = Instant::now();
    let mut nodes = 0u64;

    for fen in BENCH_FENS {
        let mut board = Board::from_fen(fen)?;
        nodes += board.start_perft(depth, false);
    }

    let elapsed = start_time.elapsed();
    let nps = nodes as f64 / elapsed.as_secs_f64();
    println!(
        "{} nodes {} nps",
        nodes.to_formatted_string(&Locale::en),
        (nps as u64).to_formatted_string(&Locale::en)
    );

    Ok(())
}

/// Diagram with rank 8 at the top, as White sees it.
fn render(board: &Board) -> String {
    let mut diagram = String::new();
    for rank in (0..8).rev() {
        diagram.push((b'1' + rank) as char);
        for file in 0..8 {
            let piece = Square::new(file, rank).and_then(|square| board.piece_at(square));
            diagram.push(' ');
            diagram.push(piece.map_or('.', |p| p.to_fen_char()));
        }
        diagram.push('\n');
    }
    diagram.push_str("  a b c d e f g h");

    diagram
}
