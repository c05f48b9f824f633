// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::fs::OpenOptions;
use std::sync::Mutex;

use clap::Parser;
use tracing::error;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

use poxmcp::config::ServerConfig;

#[tokio::main]
async fn main() {
    let config = ServerConfig::parse();

    if let Err(e) = config.validate() {
        eprintln!("error: {e:#}");
        std::process::exit(2);
    }

    if let Err(e) = init_tracing(&config) {
        eprintln!("error: failed to initialize logging: {e:#}");
        std::process::exit(2);
    }

    if let Err(e) = poxmcp::run(config).await {
        error!("fatal: {e:#}");
        std::process::exit(1);
    }
}

/// Log to stderr (stdout belongs to the stdio transport) or to `--log-file`.
fn init_tracing(config: &ServerConfig) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_new(config.log_filter()).unwrap_or_else(|_| EnvFilter::new("info"));

    let (writer, ansi) = match config.log_file {
        Some(ref path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            (BoxMakeWriter::new(Mutex::new(file)), false)
        }
        None => (BoxMakeWriter::new(std::io::stderr), true),
    };

    match config.log_format.as_str() {
        "json" => {
            fmt::fmt().with_env_filter(filter).with_writer(writer).json().init();
        }
        _ => {
            fmt::fmt().with_env_filter(filter).with_writer(writer).with_ansi(ansi).init();
        }
    }
    Ok(())
}
