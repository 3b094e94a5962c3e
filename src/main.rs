//! Varbit Recorder CLI
//!
//! Drives a simulated host through the recorder and forwards detected
//! changes to a collector.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use varbit_recorder::{
    config::Config,
    dispatch::{DispatchConfig, HttpDispatcher},
    host::{FieldDescriptor, FieldName, HostEvent, SimulatedHost},
    recorder::{CommitPolicy, Recorder},
    session::{validate_session_id, SessionControl},
    stats::create_shared_stats_with_persistence,
    VERSION,
};

#[derive(Parser)]
#[command(name = "varbit-recorder")]
#[command(version = VERSION)]
#[command(about = "Record bit-packed state changes and forward them to a collector", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record changes from a simulated host
    Record {
        /// Collector URL (overrides config)
        #[arg(long)]
        endpoint: Option<String>,

        /// JSON array of field definitions ({id, container_key, start_bit, end_bit})
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// JSON array of field names ({id, name})
        #[arg(long)]
        names: Option<PathBuf>,

        /// Stop after this many ticks (runs until Ctrl+C if omitted)
        #[arg(long)]
        ticks: Option<u32>,

        /// Tick interval in milliseconds (overrides config)
        #[arg(long)]
        tick_ms: Option<u64>,

        /// Random field writes per tick
        #[arg(long, default_value = "3")]
        writes_per_tick: usize,

        /// Session id for this recording (overrides config)
        #[arg(long)]
        session_id: Option<String>,

        /// Commit each field as soon as its change is recorded
        #[arg(long)]
        eager: bool,

        /// Serve the control API on this port (requires server feature)
        #[arg(long)]
        serve: Option<u16>,
    },

    /// Show cumulative recorder statistics
    Status,

    /// Show configuration
    Config,

    /// Use a fixed session id for future recordings
    SetSession {
        /// Session id
        id: String,
    },

    /// Go back to random session ids
    ClearSession,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("varbit_recorder=info")),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Record {
            endpoint,
            catalog,
            names,
            ticks,
            tick_ms,
            writes_per_tick,
            session_id,
            eager,
            serve,
        } => cmd_record(RecordArgs {
            endpoint,
            catalog,
            names,
            ticks,
            tick_ms,
            writes_per_tick,
            session_id,
            eager,
            serve,
        }),
        Commands::Status => {
            cmd_status();
            Ok(())
        }
        Commands::Config => {
            cmd_config();
            Ok(())
        }
        Commands::SetSession { id } => cmd_set_session(Some(id)),
        Commands::ClearSession => cmd_set_session(None),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

struct RecordArgs {
    endpoint: Option<String>,
    catalog: Option<PathBuf>,
    names: Option<PathBuf>,
    ticks: Option<u32>,
    tick_ms: Option<u64>,
    writes_per_tick: usize,
    session_id: Option<String>,
    eager: bool,
    serve: Option<u16>,
}

fn cmd_record(args: RecordArgs) -> anyhow::Result<()> {
    println!("Varbit Recorder v{VERSION}");
    println!();

    let mut config = Config::load().unwrap_or_default();
    if let Some(endpoint) = args.endpoint {
        config.endpoint = endpoint;
    }
    if let Some(tick_ms) = args.tick_ms {
        config.tick_interval_ms = tick_ms;
    }
    if let Some(session_id) = args.session_id {
        config.manual_session_id = Some(session_id);
    }
    if args.eager {
        config.commit_policy = CommitPolicy::Eager;
    }
    if let Err(e) = config.ensure_directories() {
        eprintln!("Warning: Could not create directories: {e}");
    }

    let catalog = match args.catalog {
        Some(path) => read_json::<Vec<FieldDescriptor>>(&path)?,
        None => default_catalog(),
    };
    let names = match args.names {
        Some(path) => read_json::<Vec<FieldName>>(&path)?,
        None => Vec::new(),
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to create runtime")?;

    let stats = create_shared_stats_with_persistence(config.stats_path());
    let dispatcher = HttpDispatcher::new(
        DispatchConfig::from_config(&config),
        runtime.handle().clone(),
    )?
    .with_stats(stats.clone());

    let host = Arc::new(SimulatedHost::from_catalog(catalog, names));
    let recorder = Arc::new(
        Recorder::from_config(Arc::clone(&host), dispatcher, &config).with_stats(stats.clone()),
    );

    println!("  Collector: {}", config.endpoint);
    println!("  Fields: {}", host.catalog().len());
    println!("  Tick interval: {}ms", config.tick_interval_ms);
    println!("  Commit policy: {:?}", config.commit_policy);

    #[cfg(feature = "server")]
    let _server = match args.serve {
        Some(port) => {
            let control: Arc<dyn SessionControl> = recorder.clone();
            let (addr, shutdown) = runtime.block_on(varbit_recorder::server::run(
                varbit_recorder::server::ServerConfig::new(port),
                control,
            ))?;
            println!("  Control API: http://{addr}");
            Some(shutdown)
        }
        None => None,
    };
    #[cfg(not(feature = "server"))]
    if args.serve.is_some() {
        eprintln!("Warning: --serve ignored (server feature not enabled at compile time)");
    }

    recorder.start()?;
    println!("  Session: {}", recorder.session_id());
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let running = Arc::new(AtomicBool::new(true));
    ctrlc_handler(running.clone())?;

    // Host loop: every write and time step reaches the recorder while it is
    // still the live state, the way a host raises its callbacks.
    let mut rng = rand::thread_rng();
    let interval = config.tick_interval();
    let mut ticks_seen = 0u32;
    while running.load(Ordering::SeqCst) {
        thread::sleep(interval);
        host.run_tick(&mut rng, args.writes_per_tick, |event| {
            if let HostEvent::TimeStep(tick) = event {
                let pending = recorder.pending_events();
                if pending > 0 {
                    println!("[tick {tick}] flushing {pending} change(s)");
                }
            }
            recorder.handle_event(event);
        });

        ticks_seen += 1;
        if args.ticks.is_some_and(|limit| ticks_seen >= limit) {
            break;
        }
    }

    println!();
    println!("Stopping recording...");
    recorder.stop();

    // Let in-flight deliveries finish before the runtime goes away.
    runtime.block_on(tokio::time::sleep(Duration::from_millis(500)));

    if let Err(e) = stats.save() {
        eprintln!("Warning: Could not save stats: {e}");
    }

    println!();
    println!("{}", stats.summary());
    Ok(())
}

fn cmd_status() {
    let config = Config::load().unwrap_or_default();

    println!("Varbit Recorder Status");
    println!("======================");
    println!();
    println!("Configuration:");
    println!("  Collector: {}", config.endpoint);
    println!("  Commit policy: {:?}", config.commit_policy);
    println!(
        "  Session id: {}",
        config
            .manual_session_id
            .as_deref()
            .unwrap_or("random per recording")
    );
    println!();

    let stats_path = config.stats_path();
    if stats_path.exists() {
        if let Ok(content) = std::fs::read_to_string(&stats_path) {
            if let Ok(stats) = serde_json::from_str::<serde_json::Value>(&content) {
                println!("Cumulative Statistics:");
                for key in [
                    "sessions_started",
                    "notifications",
                    "changes_detected",
                    "batches_dispatched",
                    "events_dispatched",
                    "transport_failures",
                ] {
                    if let Some(value) = stats.get(key) {
                        println!("  {key}: {value}");
                    }
                }
            }
        }
    } else {
        println!("No previous recording data found.");
    }
}

fn cmd_config() {
    let config = Config::load().unwrap_or_default();

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

fn cmd_set_session(id: Option<String>) -> anyhow::Result<()> {
    let mut config = Config::load().unwrap_or_default();
    config.manual_session_id = id.as_deref().map(validate_session_id).transpose()?;
    config.save()?;

    match config.manual_session_id {
        Some(id) => println!("Future recordings will use session id {id}."),
        None => println!("Future recordings will use random session ids."),
    }
    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {path:?}"))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {path:?}"))
}

/// Eight containers of four byte-wide fields each.
fn default_catalog() -> Vec<FieldDescriptor> {
    (0..8u32)
        .flat_map(|container| {
            (0..4u8).map(move |slot| {
                FieldDescriptor::new(container * 4 + u32::from(slot), container, slot * 8, slot * 8 + 7)
            })
        })
        .collect()
}

/// Set up Ctrl+C handler.
fn ctrlc_handler(running: Arc<AtomicBool>) -> anyhow::Result<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .context("Error setting Ctrl+C handler")
}
