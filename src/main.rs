//! Landslide Early-Warning Service - Main Daemon
//!
//! A server-side daemon that continuously:
//! 1. Refreshes weather-station telemetry (JSON API, CSV sheet fallback)
//! 2. Classifies every station into a warning tier with 20 km buffers
//! 3. Correlates susceptibility zones, stations and recorded landslides
//! 4. Drives the 10-day rainfall forecast animation
//! 5. Serves render instructions and reports to the browser front end
//!
//! Usage:
//!   cargo run --release                              # Daemon only
//!   cargo run --release -- --endpoint 8080           # With HTTP endpoint on port 8080
//!   cargo run --release -- --config other.toml       # Alternate config file
//!
//! Environment:
//!   RUST_LOG               - log filter (default: info)
//!   LSMON_CONFIG           - config file path (default: dashboard.toml)
//!   LSMON_TELEMETRY_URL    - primary telemetry JSON endpoint
//!   LSMON_FALLBACK_CSV_URL - published sheet CSV export

use lsmon_service::config;
use lsmon_service::daemon::Daemon;
use lsmon_service::endpoint;
use std::env;
use std::error::Error;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn main() {
    init_tracing();

    println!("⛰️  Landslide Early-Warning Service");
    println!("==================================\n");

    // Parse command-line arguments
    let args: Vec<String> = env::args().collect();
    let mut endpoint_port: Option<u16> = None;
    let mut config_path: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--endpoint" => {
                if i + 1 < args.len() {
                    endpoint_port = args[i + 1].parse().ok();
                    i += 2;
                } else {
                    eprintln!("Error: --endpoint requires a port number");
                    std::process::exit(1);
                }
            }
            "--config" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 2;
                } else {
                    eprintln!("Error: --config requires a file path");
                    std::process::exit(1);
                }
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                eprintln!("Usage: {} [--endpoint PORT] [--config PATH]", args[0]);
                std::process::exit(1);
            }
        }
    }

    if let Err(e) = run(endpoint_port, config_path) {
        eprintln!("\n❌ {}\n", e);
        std::process::exit(1);
    }
}

fn run(endpoint_port: Option<u16>, config_path: Option<PathBuf>) -> Result<(), Box<dyn Error>> {
    println!("⚙️  Loading configuration...");
    let config = config::load_from_env(config_path.as_deref())?;
    match &config.telemetry.primary_url {
        Some(url) => println!("   Primary telemetry: {}", url),
        None => println!("   Primary telemetry: not configured (CSV only)"),
    }
    if config.telemetry.fallback_csv_url.is_none() {
        println!("   ⚠️  No CSV fallback configured");
    }
    println!();

    let mut daemon = Daemon::new(config)?;

    // Load hazard layers once
    println!("🗺️  Loading hazard layers...");
    daemon.initialize()?;
    {
        let state = daemon.state();
        let state = lsmon_service::daemon::read_state(&state);
        println!("   Recorded landslides: {}", state.hazards.events.len());
        for (class, zones) in &state.hazards.zones {
            println!("   {}: {} zones", class.layer_name(), zones.len());
        }
    }
    println!("✓ Daemon initialized\n");

    // Start HTTP endpoint if requested (in background thread)
    if let Some(port) = endpoint_port {
        println!("🚀 Starting HTTP endpoint server...");
        let state = daemon.state();
        let commands = daemon.command_sender();
        std::thread::spawn(move || {
            if let Err(e) = endpoint::start_endpoint_server(port, state, commands) {
                eprintln!("❌ Endpoint server error: {}", e);
            }
        });
        println!("   Endpoint running on http://0.0.0.0:{}\n", port);
    }

    println!("🔄 Starting continuous monitoring loop...");
    println!("   Press Ctrl+C to stop\n");
    daemon.run()?;
    Ok(())
}
