use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::{filter::LevelFilter, prelude::*};

use self::{
    auto_play::AutoPlayArg, best_move::BestMoveArg, default_config::DefaultConfigArg,
    simulate::SimulateArg,
};

mod auto_play;
mod best_move;
mod bot_config;
mod default_config;
mod simulate;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    /// What mode to run the program in
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Let the bot play one game, following its search as it runs
    #[command(name = "auto-play")]
    AutoPlay(#[clap(flatten)] AutoPlayArg),
    /// Play seeded games without pacing and report their statistics
    Simulate(#[clap(flatten)] SimulateArg),
    /// Find the best move on a board read from a file
    BestMove(#[clap(flatten)] BestMoveArg),
    /// Print the default bot configuration
    DefaultConfig(#[clap(flatten)] DefaultConfigArg),
}

fn log_level(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

pub fn run() -> anyhow::Result<()> {
    let args = CommandArgs::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(log_level(args.verbose))
        .init();

    match args.mode {
        Mode::AutoPlay(arg) => auto_play::run(&arg)?,
        Mode::Simulate(arg) => simulate::run(&arg)?,
        Mode::BestMove(arg) => best_move::run(&arg)?,
        Mode::DefaultConfig(arg) => default_config::run(&arg)?,
    }
    Ok(())
}
