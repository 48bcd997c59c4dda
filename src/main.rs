//! Zone Key CLI
//!
//! Privacy-first focus-state data collection agent.

use chrono::Utc;
use clap::{Parser, Subcommand};
use crossbeam_channel::RecvTimeoutError;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use zonekey::{
    agent::{control_queue, Agent, ControlMsg},
    config::Config,
    context::NoWindowSource,
    core::Aggregator,
    environment::NoSensor,
    pvt::{random_position, ConsoleSurface, PvtSession, SessionEffect, StimulusSurface},
    storage::Storage,
    transparency::create_shared_log_with_persistence,
    PRIVACY_DECLARATION, VERSION,
};

#[derive(Parser)]
#[command(name = "zonekey")]
#[command(version = VERSION)]
#[command(about = "Privacy-first focus-state data collection", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start collecting behavioral data with scheduled reaction tests
    Start,

    /// Run one reaction-test session now
    Pvt,

    /// Show current collection status
    Status,

    /// Export the labeled training set as CSV
    Export {
        /// Output file (defaults to the configured export directory)
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Export every feature row unlabeled instead of the joined set
        #[arg(long)]
        raw: bool,
    },

    /// Show configuration
    Config,

    /// Display privacy declaration
    Privacy,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Start => cmd_start(),
        Commands::Pvt => cmd_pvt(),
        Commands::Status => cmd_status(),
        Commands::Export { output, raw } => cmd_export(output, raw),
        Commands::Config => cmd_config(),
        Commands::Privacy => cmd_privacy(),
    }
}

fn load_config() -> Config {
    match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading config: {e}");
            std::process::exit(1);
        }
    }
}

fn cmd_start() {
    println!("Zone Key Agent v{VERSION}");
    println!();

    let config = load_config();
    if let Err(e) = config.validate() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
    if let Err(e) = config.ensure_directories() {
        eprintln!("Warning: Could not create directories: {e}");
    }

    let storage = match Storage::open(&config.db_path()) {
        Ok(storage) => storage,
        Err(e) => {
            eprintln!("Error opening database: {e}");
            std::process::exit(1);
        }
    };

    let transparency = create_shared_log_with_persistence(config.transparency_path());

    println!("Starting collection...");
    println!(
        "  Keyboard: {}",
        if config.sources.capture_keyboard {
            "enabled"
        } else {
            "disabled"
        }
    );
    println!(
        "  Pointer: {}",
        if config.sources.capture_pointer {
            "enabled"
        } else {
            "disabled"
        }
    );
    println!("  Aggregation period: {}s", config.aggregate_period_secs);
    println!(
        "  Reaction test every: {}s ({} trials)",
        config.pvt.session_interval_secs, config.pvt.trials_per_session
    );
    println!();
    println!("During a reaction test, press Enter when the prompt appears.");
    println!("Press Ctrl+C to stop");
    println!();

    let aggregator = Aggregator::new(
        config.key_buffer_capacity,
        config.categories.clone(),
        NoWindowSource,
        NoSensor,
        Utc::now(),
    );

    let (tx, rx) = control_queue();
    let running = Arc::new(AtomicBool::new(true));

    {
        let running = running.clone();
        let tx = tx.clone();
        if let Err(e) = ctrlc::set_handler(move || {
            running.store(false, Ordering::SeqCst);
            let _ = tx.try_send(ControlMsg::Shutdown);
        }) {
            eprintln!("Error setting Ctrl+C handler: {e}");
            std::process::exit(1);
        }
    }

    spawn_stdin_reader(tx);

    let mut agent = Agent::new(
        config,
        aggregator,
        storage,
        ConsoleSurface,
        transparency.clone(),
        Instant::now(),
    );
    println!("Run ID: {}", agent.run_id());
    println!();

    agent.run(rx, running);

    println!();
    println!("{}", transparency.summary());
}

/// Forward terminal input to the control loop: a bare Enter is a reaction,
/// "abort" tears down the active session.
fn spawn_stdin_reader(tx: crossbeam_channel::Sender<ControlMsg>) {
    thread::spawn(move || {
        let stdin = std::io::stdin();
        let mut line = String::new();
        loop {
            line.clear();
            match stdin.read_line(&mut line) {
                Ok(0) => break,
                Ok(_) => {
                    let msg = match line.trim() {
                        "abort" => ControlMsg::AbortSession,
                        "quit" => ControlMsg::Shutdown,
                        _ => ControlMsg::React,
                    };
                    if tx.send(msg).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        }
    });
}

fn cmd_pvt() {
    let config = load_config();
    if let Err(e) = config.validate() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
    if let Err(e) = config.ensure_directories() {
        eprintln!("Warning: Could not create directories: {e}");
    }

    let storage = match Storage::open(&config.db_path()) {
        Ok(storage) => storage,
        Err(e) => {
            eprintln!("Error opening database: {e}");
            std::process::exit(1);
        }
    };

    println!("Reaction test: {} trials.", config.pvt.trials_per_session);
    println!("Press Enter as soon as the prompt appears.");
    println!();

    let (tx, rx) = crossbeam_channel::unbounded::<()>();
    thread::spawn(move || {
        let stdin = std::io::stdin();
        let mut line = String::new();
        loop {
            line.clear();
            match stdin.read_line(&mut line) {
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    if tx.send(()).is_err() {
                        break;
                    }
                }
            }
        }
    });

    let mut rng = StdRng::from_entropy();
    let mut surface = ConsoleSurface;
    let screen = config.screen;
    let mut session = PvtSession::start(config.pvt.clone(), &mut rng, Instant::now());

    let result = loop {
        let timeout = session
            .next_deadline()
            .map(|at| at.saturating_duration_since(Instant::now()))
            .unwrap_or(Duration::from_secs(3600));

        let effect = match rx.recv_timeout(timeout) {
            Ok(()) => session.on_react(&mut rng, Instant::now(), Utc::now()),
            Err(RecvTimeoutError::Timeout) => {
                session.on_deadline(&mut rng, Instant::now(), Utc::now())
            }
            Err(RecvTimeoutError::Disconnected) => {
                eprintln!("Input closed, aborting session.");
                return;
            }
        };

        match effect {
            SessionEffect::Pending => {}
            SessionEffect::Present => surface.present(random_position(
                &mut rng,
                screen.width,
                screen.height,
                screen.stimulus_size,
                screen.margin,
            )),
            SessionEffect::Clear => surface.clear(),
            SessionEffect::Finished(result) => break result,
        }
    };

    println!();
    match result {
        Some(result) => {
            println!("Mean reaction time: {:.1} ms", result.reaction_time_ms);
            println!("Focus score: {:.2}", result.focus_score);
            println!("Alertness: {}", result.alertness_level);
            if result.is_lapse {
                println!("Lapse detected.");
            }
            if result.false_start {
                println!("False start(s) suppressed.");
            }

            match storage.insert_pvt_result(&result) {
                Ok(_) => {
                    if let Err(e) = storage.backfill_latest_feature_label(result.focus_score) {
                        eprintln!("Warning: label backfill failed: {e}");
                    }
                    println!("Result saved.");
                }
                Err(e) => eprintln!("Error saving result: {e}"),
            }
        }
        None => println!("No reactions captured; session discarded."),
    }
}

fn cmd_status() {
    let config = load_config();

    println!("Zone Key Agent Status");
    println!("=====================");
    println!();

    println!("Configuration:");
    println!(
        "  Keyboard capture: {}",
        if config.sources.capture_keyboard {
            "enabled"
        } else {
            "disabled"
        }
    );
    println!(
        "  Pointer capture: {}",
        if config.sources.capture_pointer {
            "enabled"
        } else {
            "disabled"
        }
    );
    println!("  Aggregation period: {}s", config.aggregate_period_secs);
    println!(
        "  Reaction test interval: {}s",
        config.pvt.session_interval_secs
    );
    println!("  Database: {:?}", config.db_path());
    println!();

    match Storage::open(&config.db_path()) {
        Ok(storage) => match storage.stats() {
            Ok(stats) => {
                println!("Stored Data:");
                println!("  Feature records: {}", stats.feature_records);
                println!("  Labeled records: {}", stats.labeled_records);
                println!("  Reaction-test results: {}", stats.pvt_results);
                if let Some(mean) = stats.mean_reaction_ms {
                    println!("  Mean reaction time: {mean:.1} ms");
                }
            }
            Err(e) => eprintln!("Error reading database stats: {e}"),
        },
        Err(e) => eprintln!("Error opening database: {e}"),
    }
    println!();

    // Cumulative transparency stats from previous runs, if any.
    let stats_path = config.transparency_path();
    if stats_path.exists() {
        if let Ok(content) = std::fs::read_to_string(&stats_path) {
            if let Ok(stats) = serde_json::from_str::<serde_json::Value>(&content) {
                println!("Cumulative Statistics:");
                if let Some(keys) = stats.get("key_events") {
                    println!("  Keyboard events: {keys}");
                }
                if let Some(pointer) = stats.get("pointer_events") {
                    println!("  Pointer events: {pointer}");
                }
                if let Some(records) = stats.get("feature_records") {
                    println!("  Feature records: {records}");
                }
                if let Some(sessions) = stats.get("pvt_sessions") {
                    println!("  Reaction-test sessions: {sessions}");
                }
            }
        }
    } else {
        println!("No previous collection data found.");
    }
}

fn cmd_export(output: Option<PathBuf>, raw: bool) {
    let config = load_config();
    if let Err(e) = config.ensure_directories() {
        eprintln!("Warning: Could not create directories: {e}");
    }

    let storage = match Storage::open(&config.db_path()) {
        Ok(storage) => storage,
        Err(e) => {
            eprintln!("Error opening database: {e}");
            std::process::exit(1);
        }
    };

    let stem = if raw { "raw" } else { "dataset" };
    let output_path = output.unwrap_or_else(|| {
        config.export_path.join(format!(
            "{stem}_{}.csv",
            Utc::now().format("%Y%m%d_%H%M%S")
        ))
    });

    let categories: Vec<String> = config
        .categories
        .iter()
        .map(|rule| rule.category.clone())
        .collect();

    let result = if raw {
        storage.export_raw(&output_path)
    } else {
        storage.export_dataset(&output_path, &categories)
    };

    match result {
        Ok(0) if !raw => {
            println!("No labeled rows to export yet.");
            println!("Feature rows only join once a reaction test ran in the same hour.");
        }
        Ok(rows) => println!("Exported {rows} rows to {output_path:?}"),
        Err(e) => {
            eprintln!("Error exporting: {e}");
            std::process::exit(1);
        }
    }
}

fn cmd_config() {
    let config = load_config();

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!(
        "{}",
        serde_json::to_string_pretty(&config).unwrap_or_else(|_| "Error".to_string())
    );
}

fn cmd_privacy() {
    println!("{PRIVACY_DECLARATION}");
}
