//! ---
//! amon_section: "04-binary"
//! amon_subsection: "binary"
//! amon_type: "source"
//! amon_scope: "code"
//! amon_description: "Binary entrypoint for the machine monitor."
//! amon_version: "v0.1.0"
//! amon_owner: "tbd"
//! ---
use std::path::PathBuf;
use std::time::Duration;

use amon_common::config::AppConfig;
use amon_common::logging::init_tracing;
use amon_common::time::TimeScale;
use amon_core::{Activation, Alert, MonitorSession, ShutdownRequest};
use amon_sim::{default_fleet, Extension, MachineRecord, Severity};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use futures::StreamExt;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::signal;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::{sleep, Instant};
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(author, version, about = "Machine telemetry monitor", long_about = None)]
struct Cli {
    #[arg(long, value_name = "FILE", help = "Path to configuration file")]
    config: Option<PathBuf>,

    #[arg(long, value_name = "MS", help = "Override the length of one time-unit")]
    time_unit_ms: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Show the fleet with current readings")]
    List,
    #[command(about = "Print the event log of a machine")]
    Log {
        #[arg(value_name = "CODE")]
        code: String,
    },
    #[command(about = "Stream snapshots of a machine")]
    Watch {
        machine_id: String,
        #[command(flatten)]
        watch: WatchArgs,
    },
    #[command(about = "Turn a machine on and stream its snapshots")]
    Activate {
        machine_id: String,
        #[command(flatten)]
        watch: WatchArgs,
    },
}

#[derive(Debug, Clone, Args)]
struct WatchArgs {
    #[arg(long, value_name = "UNITS", help = "Request an emergency stop after this many time-units")]
    stop_after: Option<f64>,

    #[arg(long, help = "Request an emergency stop when a high temperature alert arrives")]
    auto_stop: bool,

    #[arg(long, value_name = "UNITS", default_value_t = 60.0, help = "Stop watching after this many time-units")]
    max_units: f64,

    #[arg(long, help = "Print snapshots and alerts as JSON lines")]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut candidates = Vec::new();
    if let Some(path) = &cli.config {
        candidates.push(path.clone());
    }
    candidates.push(PathBuf::from("configs/amond.toml"));

    let loaded = AppConfig::load_with_source(&candidates)?;
    let mut config = loaded.config;
    if let Some(ms) = cli.time_unit_ms {
        config.simulation.time_unit = Duration::from_millis(ms);
        config
            .validate()
            .context("invalid --time-unit-ms override")?;
    }
    init_tracing("amond", &config.logging)?;
    match &loaded.source {
        Some(path) => info!(config_path = %path.display(), "configuration loaded"),
        None => info!("no configuration file found; running with defaults"),
    }

    let mut rng = StdRng::seed_from_u64(config.simulation.random_seed);
    let session = MonitorSession::start(default_fleet(&mut rng), &config.simulation)
        .context("failed to start monitor session")?;
    let scale = config.simulation.time_scale();

    let outcome = match cli.command {
        Commands::List => {
            render_fleet(&session);
            Ok(())
        }
        Commands::Log { code } => render_log(&session, &code),
        Commands::Watch { machine_id, watch } => {
            watch_machine(&session, scale, &machine_id, &watch).await
        }
        Commands::Activate { machine_id, watch } => {
            match session.activate(&machine_id).await? {
                Activation::Started => info!(machine_id = %machine_id, "machine activated"),
                Activation::AlreadyRunning => {
                    info!(machine_id = %machine_id, "machine already running")
                }
                Activation::Refused => {
                    warn!(machine_id = %machine_id, "activation refused after emergency stop")
                }
            }
            watch_machine(&session, scale, &machine_id, &watch).await
        }
    };
    session.close().await;
    outcome
}

fn render_fleet(session: &MonitorSession) {
    let menu = session.menu();
    println!(
        "  {:<6} {:<22} {:<9} {:<4} {:>12} {:>12}  {}",
        "ID", "NAME", "KIND", "ON", "TEMP", "RATE", "LOCATION"
    );
    for record in session.snapshots() {
        let pinned = if menu.contains(&record.id) { "*" } else { " " };
        println!(
            "{} {:<6} {:<22} {:<9} {:<4} {:>12} {:>12}  {}",
            pinned,
            record.id.as_str(),
            record.name,
            record.kind().to_string(),
            if record.is_on() { "yes" } else { "no" },
            format!("{} {:?}", record.temperature, Severity::temperature(&record)),
            format!("{} {:?}", record.rate, Severity::rate(&record)),
            record.location,
        );
    }
}

fn render_log(session: &MonitorSession, code: &str) -> Result<()> {
    let record = session.lookup(code)?;
    println!("{} ({}, {})", record.name, record.id, record.location);
    for entry in session.event_log(record.id.as_str())? {
        println!("  {entry}");
    }
    Ok(())
}

async fn watch_machine(
    session: &MonitorSession,
    scale: TimeScale,
    machine_id: &str,
    args: &WatchArgs,
) -> Result<()> {
    let mut snapshots = session.subscribe(machine_id)?;
    let mut alerts = session.alerts();
    let started = Instant::now();
    let (watch_window, stop_delay) = watch_timings(scale, args)?;
    let deadline = sleep(watch_window);
    let stop_timer = sleep(stop_delay);
    let ctrl_c = signal::ctrl_c();
    tokio::pin!(deadline, stop_timer, ctrl_c);
    let mut stop_pending = args.stop_after.is_some();
    let mut stop_requested = false;

    loop {
        tokio::select! {
            _ = &mut deadline => {
                info!(machine_id, max_units = args.max_units, "watch window elapsed");
                break;
            }
            _ = &mut ctrl_c => {
                info!("ctrl-c received; leaving watch");
                break;
            }
            _ = &mut stop_timer, if stop_pending => {
                stop_pending = false;
                stop_requested |= request_stop(session, machine_id).await?;
            }
            alert = alerts.recv() => match alert {
                Ok(alert) if alert.machine_id().as_str() == machine_id => {
                    render_alert(&alert, args.json)?;
                    if args.auto_stop && matches!(alert, Alert::HighTemperature { .. }) {
                        stop_requested |= request_stop(session, machine_id).await?;
                    }
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "alert receiver lagged"),
                Err(RecvError::Closed) => break,
            },
            snapshot = snapshots.next() => {
                let Some(record) = snapshot else { break };
                render_snapshot(&record, scale.to_units(started.elapsed()), args.json)?;
                if stop_requested && !record.is_on() {
                    break;
                }
            }
        }
    }
    Ok(())
}

/// Watch window and stop delay of `args` on the wall clock.
fn watch_timings(scale: TimeScale, args: &WatchArgs) -> Result<(Duration, Duration)> {
    let window = scale
        .try_units(args.max_units)
        .context("invalid --max-units")?;
    let stop_delay = scale
        .try_units(args.stop_after.unwrap_or_default())
        .context("invalid --stop-after")?;
    Ok((window, stop_delay))
}

async fn request_stop(session: &MonitorSession, machine_id: &str) -> Result<bool> {
    let outcome = session.request_shutdown(machine_id).await?;
    info!(machine_id, outcome = ?outcome, "emergency stop requested");
    Ok(matches!(
        outcome,
        ShutdownRequest::Initiated | ShutdownRequest::AlreadyInProgress
    ))
}

fn render_alert(alert: &Alert, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(alert)?);
        return Ok(());
    }
    match alert {
        Alert::HighTemperature {
            machine_id,
            temperature,
        } => println!(
            "!! {machine_id}: temperature {temperature}, emergency stop advised"
        ),
        Alert::EmergencyStop { machine_id } => println!("!! {machine_id}: emergency stop"),
        Alert::Stopped { machine_id } => println!("!! {machine_id}: stopped"),
    }
    Ok(())
}

fn render_snapshot(record: &MachineRecord, elapsed_units: f64, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(record)?);
        return Ok(());
    }
    let extension = match &record.extension {
        Extension::Conveyor(c) => format!(
            "load={:?} tension={:?} vibration={:?} hours={:?}",
            c.load_capacity,
            c.belt_tension,
            c.vibration.map(|v| (v * 10.0).round() / 10.0),
            c.operating_time
        ),
        Extension::Boiler(b) => format!(
            "pressure={:?} water={:?} heat={:?} co2={:?} maintenance={:?}",
            b.pressure, b.water_level, b.heat_output, b.co2_emission, b.maintenance_cycles
        ),
    };
    println!(
        "{:>7.1}u {} {:?} temp={} ({:?}) rate={} ({:?}) {}",
        elapsed_units,
        record.id,
        record.status,
        record.temperature,
        Severity::temperature(record),
        record.rate,
        Severity::rate(record),
        extension
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> WatchArgs {
        let cli = Cli::try_parse_from(["amond", "watch", "id01"].iter().chain(args))
            .expect("arguments parse");
        match cli.command {
            Commands::Watch { watch, .. } => watch,
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn watch_timings_scale_units() {
        let scale = TimeScale::new(Duration::from_millis(100));
        let args = parse(&["--stop-after", "8", "--max-units", "20"]);
        assert_eq!(
            watch_timings(scale, &args).expect("valid timings"),
            (Duration::from_secs(2), Duration::from_millis(800))
        );
    }

    #[test]
    fn oversized_watch_timings_are_errors() {
        let scale = TimeScale::default();
        let err = watch_timings(scale, &parse(&["--max-units", "1e30"]))
            .expect_err("window too long");
        assert!(err.to_string().contains("--max-units"));
        let err = watch_timings(scale, &parse(&["--stop-after", "1e30"]))
            .expect_err("delay too long");
        assert!(err.to_string().contains("--stop-after"));
    }
}
