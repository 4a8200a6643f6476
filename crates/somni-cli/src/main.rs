use clap::{Parser, Subcommand};
use rand::Rng;
use somni_core::{Config, SleepEngine};
use somni_store::HistoryStore;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "somni")]
struct Cli {
    /// Optional TOML config file with threshold / window overrides.
    #[arg(long, global = true)]
    config: Option<String>,
    /// History file written by `simulate` and read by `history` / `report`.
    #[arg(long, global = true, default_value = "sleep_history.json")]
    history: String,
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a synthetic session through the engine and print the report.
    Simulate {
        /// Simulated session length in minutes.
        #[arg(long, default_value_t = 90)]
        minutes: u64,
    },
    /// List recent stored sessions, newest first.
    History {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Print the full stored report for one session id.
    Report { session: Uuid },
}

fn load_config(path: Option<&str>) -> Result<Config, Box<dyn std::error::Error>> {
    match path {
        Some(p) => Ok(Config::load(p)?),
        None => Ok(Config::default()),
    }
}

/// Synthetic motion trace: quiet breathing with jittered peak spacing, a
/// restless stretch in the middle, and the occasional spike.
fn simulate(engine: &mut SleepEngine, minutes: u64) {
    const SEC: i64 = 1_000_000;
    let mut rng = rand::thread_rng();
    let total_ticks = minutes as i64 * 60 * 10;
    let mut next_peak = 0i64;

    engine.start_session_at(0);
    for t in 0..total_ticks {
        let ts = t * SEC / 10;
        let restless = (total_ticks / 3..total_ticks / 3 + 1200).contains(&t);
        let score = if restless {
            rng.gen_range(4_000_000.0..9_000_000.0)
        } else if t >= next_peak {
            next_peak = t + rng.gen_range(15..30); // 1.5s..3.0s apart
            rng.gen_range(80_000.0..150_000.0)
        } else if rng.gen_bool(0.001) {
            rng.gen_range(11_000_000.0..15_000_000.0) // isolated spike
        } else {
            rng.gen_range(12_000.0..30_000.0)
        };
        engine.update_at(score, ts);
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = Cli::parse();
    let store = HistoryStore::open(&cli.history);

    match cli.cmd {
        Commands::Simulate { minutes } => {
            let cfg = load_config(cli.config.as_deref())?;
            let mut engine =
                SleepEngine::with_history(cfg, Box::new(HistoryStore::open(&cli.history)));
            simulate(&mut engine, minutes);
            let end_us = minutes as i64 * 60 * 1_000_000;
            let report = engine.report_at(end_us);
            match engine.stop_session_at(end_us) {
                Some(entry) => log::info!("session {} stored", entry.id),
                None => log::warn!("session too short to store"),
            }
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::History { limit } => {
            for s in store.recent(limit) {
                println!(
                    "{}  {}  {}  {} ({})",
                    s.id, s.started_at, s.duration_formatted, s.quality_score, s.quality_rating
                );
            }
        }
        Commands::Report { session } => match store.report_for(session) {
            Some(report) => println!("{}", serde_json::to_string_pretty(&report)?),
            None => return Err(format!("no stored session {}", session).into()),
        },
    }
    Ok(())
}
