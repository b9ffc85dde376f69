// src/main.rs

//! The main entry point for the docgate server application.

use anyhow::Result;
use docgate::config::{Config, Overrides};
use docgate::server;
use std::env;
use std::sync::Arc;
use tracing::error;
use tracing_subscriber::{filter::EnvFilter, prelude::*, reload};

#[tokio::main]
async fn main() -> Result<()> {
    run_app().await
}

fn usage() {
    eprintln!("Usage: docgate [--config <path>] [--port <port>] [--backends host:port,...] [--xorigin]");
    eprintln!("       docgate --version");
}

/// Returns the value following `flag`, exiting if the flag is present without one.
fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    let index = args.iter().position(|arg| arg == flag)?;
    match args.get(index + 1) {
        Some(value) => Some(value.as_str()),
        None => {
            eprintln!("{flag} flag requires a value");
            usage();
            std::process::exit(1);
        }
    }
}

async fn run_app() -> Result<()> {
    const VERSION: &str = env!("CARGO_PKG_VERSION");

    let args: Vec<String> = env::args().collect();

    if args.contains(&"--version".to_string()) {
        println!("docgate version {VERSION}");
        return Ok(());
    }
    if args.iter().any(|arg| arg == "--help" || arg == "-h") {
        usage();
        return Ok(());
    }

    // Logging starts from RUST_LOG (or `info`); the configured level is applied
    // through the reload handle once the configuration is loaded.
    let initial_log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let (filter, reload_handle) = reload::Layer::new(EnvFilter::new(initial_log_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().compact().with_ansi(true))
        .init();
    let reload_handle = Arc::new(reload_handle);

    let port = match flag_value(&args, "--port") {
        Some(port_str) => match port_str.parse::<u16>() {
            Ok(port) => Some(port),
            Err(_) => {
                eprintln!("Invalid port number: {port_str}");
                std::process::exit(1);
            }
        },
        None => None,
    };
    let overrides = Overrides {
        port,
        backends: flag_value(&args, "--backends").map(|list| {
            list.split(',')
                .map(str::trim)
                .filter(|b| !b.is_empty())
                .map(str::to_string)
                .collect()
        }),
        cross_origin: args.iter().any(|arg| arg == "--xorigin"),
    };

    let config_path = flag_value(&args, "--config");
    let config = match Config::load(config_path).and_then(|c| c.apply(overrides)) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load configuration: {e:#}");
            std::process::exit(1);
        }
    };

    if let Err(e) = server::run(config, reload_handle).await {
        error!("Server runtime error: {:#}", e);
        return Err(e);
    }
    Ok(())
}
