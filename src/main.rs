//! Binary entrypoint for the idlerpg CLI.
//!
//! Commands:
//! - `start` - run the tick loop, printing narration to stdout until Ctrl-C
//! - `init` - write a starter `config.toml` plus the monster and event tables
//! - `status [--json]` - print the top players and store summary
//! - `simulate --ticks <n> [--seed <s>] [--players <n>] [--in-memory]` - headless run on a synthetic clock
//!
//! See the library crate docs for module-level details: `idlerpg::`.
use anyhow::Result;
use clap::{Parser, Subcommand};
use log::{error, info};
use std::path::Path;

use idlerpg::config::Config;
use idlerpg::engine::{format_duration, Engine};
use idlerpg::logutil::init_logging;
use idlerpg::metrics;
use idlerpg::server::{load_flavor, load_monsters, open_engine, GameServer};
use idlerpg::storage::{CharacterQuery, CharacterStore, MemoryStore};

const DEFAULT_MONSTERS: &str = include_str!("../data/monsters.txt");
const DEFAULT_EVENTS: &str = include_str!("../data/events.txt");

#[derive(Parser)]
#[command(name = "idlerpg")]
#[command(about = "A tick-driven idle RPG simulation server")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the game server
    Start,
    /// Write a default configuration and lookup tables
    Init,
    /// Show the top players and store summary
    Status {
        /// Print the top players as JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Run ticks back to back on a synthetic clock
    Simulate {
        /// Number of ticks to run
        #[arg(short, long, default_value_t = 1000)]
        ticks: u64,
        /// RNG seed (overrides the config file)
        #[arg(short, long)]
        seed: Option<u64>,
        /// Make sure this many synthetic characters exist and are online
        #[arg(short, long, default_value_t = 0)]
        players: u64,
        /// Use a throwaway in-memory store instead of the configured one
        #[arg(long)]
        in_memory: bool,
        /// Print narration as it happens
        #[arg(long)]
        narrate: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let command = match cli.command {
        Commands::Init => {
            init_logging(None, cli.verbose);
            return init(&cli.config).await;
        }
        other => other,
    };

    let config = match Config::load(&cli.config).await {
        Ok(config) => config,
        Err(e) => {
            init_logging(None, cli.verbose);
            error!("{}", e);
            return Err(e);
        }
    };
    init_logging(Some(&config.logging), cli.verbose);

    match command {
        Commands::Start => start(config).await?,
        Commands::Status { json } => status(&config, json)?,
        Commands::Simulate {
            ticks,
            seed,
            players,
            in_memory,
            narrate,
        } => {
            let mut config = config;
            if seed.is_some() {
                config.game.seed = seed;
            }
            if in_memory {
                let engine = Engine::new(config.game.clone(), MemoryStore::new())?.with_tables(
                    load_monsters(&config.tables.monsters_file),
                    load_flavor(&config.tables.events_file),
                );
                simulate(engine, &config, ticks, players, narrate)?;
            } else {
                let engine = open_engine(&config)?;
                simulate(engine, &config, ticks, players, narrate)?;
            }
        }
        Commands::Init => {}
    }

    Ok(())
}

async fn init(config_path: &str) -> Result<()> {
    info!("Initializing new idlerpg configuration");
    Config::create_default(config_path).await?;
    info!("Configuration file created at {}", config_path);

    let cfg = Config::default();
    tokio::fs::create_dir_all(&cfg.storage.data_dir).await?;
    for (path, contents) in [
        (&cfg.tables.monsters_file, DEFAULT_MONSTERS),
        (&cfg.tables.events_file, DEFAULT_EVENTS),
    ] {
        if Path::new(path).exists() {
            info!("Keeping existing {}", path);
            continue;
        }
        if let Some(parent) = Path::new(path).parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, contents).await?;
        info!("Wrote {}", path);
    }
    Ok(())
}

async fn start(config: Config) -> Result<()> {
    info!("Starting idlerpg v{}", env!("CARGO_PKG_VERSION"));
    let engine = open_engine(&config)?;
    let (announce_tx, mut announce_rx) = tokio::sync::mpsc::unbounded_channel::<String>();
    let (stop_tx, stop_rx) = tokio::sync::watch::channel(false);
    let server = GameServer::new(engine, config.game.tick_interval_secs, announce_tx);

    tokio::spawn(async move {
        while let Some(line) = announce_rx.recv().await {
            println!("{}", line);
        }
    });
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received shutdown signal");
            let _ = stop_tx.send(true);
        }
    });

    server.run(stop_rx).await
}

fn status(config: &Config, json: bool) -> Result<()> {
    let engine = open_engine(config)?;
    if json {
        let top = engine.top_players(5)?;
        println!("{}", serde_json::to_string_pretty(&top)?);
        return Ok(());
    }
    let total = engine.store().query(&CharacterQuery::all())?.len();
    let online = engine.store().query(&CharacterQuery::online())?.len();
    println!("Characters: {} registered, {} online", total, online);
    print_top(&engine)?;
    let stats = metrics::snapshot();
    println!(
        "This process: {} ticks, {} level-ups, {} duels",
        stats.ticks, stats.level_ups, stats.duels
    );
    Ok(())
}

fn print_top<S: CharacterStore>(engine: &Engine<S>) -> Result<()> {
    for (rank, c) in engine.top_players(5)?.iter().enumerate() {
        println!(
            "#{} {} level {} {} ({}), next level in {}",
            rank + 1,
            c.username,
            c.level,
            c.charclass,
            c.alignment,
            format_duration(c.next_ttl)
        );
    }
    Ok(())
}

fn simulate<S: CharacterStore>(
    mut engine: Engine<S>,
    config: &Config,
    ticks: u64,
    players: u64,
    narrate: bool,
) -> Result<()> {
    for id in 1..=players {
        engine.register(id, &format!("idler{}", id))?;
        engine.set_online(id, true)?;
    }
    if !narrate {
        engine.drain_narration();
    }
    let step = config.game.tick_interval_secs as i64;
    let start = chrono::Utc::now().timestamp();
    let mut level_ups = 0;
    let mut events = 0;
    for n in 0..ticks as i64 {
        let report = engine.tick_at(start + n * step);
        level_ups += report.level_ups;
        events += report.events.len();
        let lines = engine.drain_narration();
        if narrate {
            for line in lines {
                println!("{}", line);
            }
        }
    }
    println!(
        "Simulated {} ticks ({}): {} world events, {} level-ups",
        ticks,
        format_duration(ticks as i64 * step),
        events,
        level_ups
    );
    print_top(&engine)?;
    let stats = metrics::snapshot();
    println!(
        "Duels: {}, critical strikes: {}, items dropped: {}",
        stats.duels, stats.critical_strikes, stats.item_drops
    );
    Ok(())
}
