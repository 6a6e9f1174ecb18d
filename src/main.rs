//! Quarto-Engine: play Quarto between AI strategies.
//!
//! ## Usage
//!
//! - `quarto-engine` - Show a demo
//! - `quarto-engine play --first minimax --second mcts` - Play AI vs AI games
//! - `quarto-engine demo` - Run the MCTS demo
//!
//! Set `RUST_LOG=debug` to see every decision the strategies make.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use flexi_logger::Logger;

use quarto_engine::constants::{GENERATIONS, MINIMAX_DEPTH, POPULATION_SIZE};
use quarto_engine::evolution::EvolutionConfig;
use quarto_engine::mcts::{Budget, MctsConfig, MonteCarlo};
use quarto_engine::new_game;
use quarto_engine::player::{AiPlayer, PlayerConfig, Strategy, play_game};
use quarto_engine::trace::{EventSink, LogSink};

/// Quarto-Engine: Quarto rules with minimax, MCTS and evolved AI players
#[derive(Parser)]
#[command(name = "quarto-engine")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Seed for reproducible decisions
    #[arg(long, global = true)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Play games between two AI strategies
    Play(PlayArgs),
    /// Run a simple demo of the engine
    Demo,
}

#[derive(Args)]
struct PlayArgs {
    /// Strategy that places while player 0 is on move (MCTS plays for this seat)
    #[arg(long, value_enum, default_value_t = Strategy::Simple)]
    first: Strategy,

    /// Strategy that places while player 1 is on move (MCTS still plays for seat 0)
    #[arg(long, value_enum, default_value_t = Strategy::Minimax)]
    second: Strategy,

    /// Number of games to play
    #[arg(long, default_value_t = 1)]
    games: usize,

    /// Minimax search depth
    #[arg(long, default_value_t = MINIMAX_DEPTH)]
    depth: usize,

    /// MCTS time budget per placement, in milliseconds
    #[arg(long, default_value_t = 1000)]
    mcts_millis: u64,

    /// Evolutionary population size
    #[arg(long, default_value_t = POPULATION_SIZE)]
    population: usize,

    /// Evolutionary generations trained at startup
    #[arg(long, default_value_t = GENERATIONS)]
    generations: usize,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let _logger = Logger::try_with_env_or_str("info")?
        .format(flexi_logger::colored_default_format)
        .start()?;

    match cli.command {
        Some(Commands::Play(args)) => run_match(&args, cli.seed),
        Some(Commands::Demo) | None => run_demo(cli.seed),
    }
}

fn player_config(args: &PlayArgs, seed: Option<u64>) -> PlayerConfig {
    PlayerConfig {
        minimax_depth: args.depth,
        mcts: MctsConfig {
            budget: Budget::Time(Duration::from_millis(args.mcts_millis)),
            ..Default::default()
        },
        evolution: EvolutionConfig {
            population_size: args.population,
            generations: args.generations,
            ..Default::default()
        },
        seed,
    }
}

fn run_match(args: &PlayArgs, seed: Option<u64>) -> Result<()> {
    let sink: Arc<dyn EventSink> = Arc::new(LogSink);

    log::info!("building players: {} vs {}", args.first, args.second);
    let mut first = AiPlayer::with_sink(args.first, player_config(args, seed), Some(sink.clone()))
        .with_context(|| format!("building {} player", args.first))?;
    let mut second = AiPlayer::with_sink(
        args.second,
        player_config(args, seed.map(|s| s.wrapping_add(1))),
        Some(sink),
    )
    .with_context(|| format!("building {} player", args.second))?;

    let names = [args.first, args.second];
    let mut wins = [0usize; 2];
    let mut draws = 0;

    for game in 1..=args.games {
        let record = play_game([&mut first, &mut second])
            .with_context(|| format!("playing game {game}"))?;

        println!("=== Game {game} ===");
        print!("{}", record.final_state.board());
        match record.winner {
            Some(player) => {
                wins[player] += 1;
                println!(
                    "Winner: player {player} ({}) after {} placements",
                    names[player], record.placements
                );
                if let Some(line) = record.final_state.board().winning_line() {
                    println!("Winning line: {line:?}");
                }
            }
            None => {
                draws += 1;
                println!("Draw after {} placements", record.placements);
            }
        }
        println!();
    }

    println!(
        "{}: {} wins, {}: {} wins, {draws} draws",
        names[0], wins[0], names[1], wins[1]
    );
    Ok(())
}

fn run_demo(seed: Option<u64>) -> Result<()> {
    println!("Quarto-Engine: Quarto rules and AI strategies\n");

    // Demo 1: a few hand-played turns
    println!("=== Board Demo ===");
    let mut game = new_game();
    game.select_piece(0)?;
    game.place_piece(1, 2)?;
    game.select_piece(5)?;
    game.place_piece(2, 1)?;
    print!("{}", game.board());
    println!("Pieces left: {}", game.available_pieces().len());
    println!("Player on move: {}", game.current_player());

    // Demo 2: MCTS placement
    println!("\n=== MCTS Demo ===");
    game.select_piece(0)?;
    if let Some(piece) = game.selected_piece() {
        println!("Piece to place: {piece}");
    }

    let mc = MonteCarlo::new(MctsConfig::with_iterations(2000))?;
    let mut rng = seed.map_or_else(fastrand::Rng::new, fastrand::Rng::with_seed);
    println!("Running 2000 MCTS iterations...");
    let (best, stats) = mc.best_move(&game, &mut rng);
    println!(
        "Root visits: {} across {} nodes",
        stats.root_visits, stats.tree_size
    );
    match best {
        Some((row, col)) => println!("Best move: ({row}, {col})"),
        None => println!("No move found"),
    }
    Ok(())
}
