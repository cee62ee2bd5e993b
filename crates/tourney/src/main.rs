use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::error;

use tourney::config::{ConfigError, TourConfig, TournamentType};
use tourney::tournament::{render_standings, Tournament, TournamentError};

#[derive(Parser)]
#[command(name = "tourney")]
#[command(about = "Chess engine tournament controller")]
struct Cli {
    /// Verbose logging (engine I/O included)
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a full tournament
    Tour {
        /// Configuration file
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Run a single match between the first two players
    Bench {
        /// Configuration file
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Write a starter configuration file
    Sample {
        /// Destination path
        #[arg(short, long)]
        config: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{}", err);
            eprintln!("error: {}", err);
            match err {
                TournamentError::Config(_) | TournamentError::Book(_) => ExitCode::from(1),
                TournamentError::Io(source)
                    if source.kind() == std::io::ErrorKind::Interrupted =>
                {
                    ExitCode::from(3)
                }
                TournamentError::Io(_) => ExitCode::from(2),
            }
        }
    }
}

fn run(cli: Cli) -> Result<(), TournamentError> {
    match cli.command {
        Commands::Sample { config } => {
            init_logging(cli.verbose, None);
            let sample = TourConfig::sample();
            let text = serde_json::to_string_pretty(&sample)
                .map_err(ConfigError::Parse)?;
            std::fs::write(&config, text + "\n")?;
            println!("wrote starter config to {}", config.display());
            Ok(())
        }
        Commands::Tour { config } => {
            let config = TourConfig::load(&config)?;
            init_logging(cli.verbose, config.log_file.as_ref());
            run_event(config)
        }
        Commands::Bench { config } => {
            let mut config = TourConfig::load(&config)?;
            init_logging(cli.verbose, config.log_file.as_ref());
            // A bench is the smallest event: the first two participants,
            // one game, no colour reversal.
            let participants = config.participants();
            config.players = participants
                .iter()
                .take(2)
                .map(|&i| config.engines[i].name.clone())
                .collect();
            config.tournament_type = TournamentType::RoundRobin;
            config.games_per_pair = 1;
            run_event(config)
        }
    }
}

fn run_event(config: TourConfig) -> Result<(), TournamentError> {
    let result_file = config.result_file.clone();
    let mut tournament = Tournament::new(config)?;
    let records = tournament.run()?;

    let table = render_standings(&tournament.standings());
    println!("\n{} games played\n", records.len());
    println!("{}", table);
    if let Some(path) = result_file {
        std::fs::write(path, table)?;
    }
    Ok(())
}

fn init_logging(verbose: bool, log_file: Option<&PathBuf>) {
    let level = if verbose { "debug" } else { "info" };
    let builder = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_target(false);

    match log_file.and_then(|path| std::fs::File::create(path).ok()) {
        Some(file) => builder
            .with_ansi(false)
            .with_writer(std::sync::Mutex::new(file))
            .init(),
        None => builder.with_writer(std::io::stderr).init(),
    }
}
