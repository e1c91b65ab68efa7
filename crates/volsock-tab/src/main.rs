mod cli;
mod surface;

use std::path::Path;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;
use volsock_client::{ConnectionState, MemoryHost, SurfaceId, SyncHandle, VideoSurface};
use volsock_config::VolsockConfig;

use crate::surface::ConsoleSurface;

fn load_config(args: &cli::Args) -> volsock_common::Result<VolsockConfig> {
    let mut config = match &args.config {
        Some(path) => volsock_config::load_config_from(Path::new(path))?,
        None => volsock_config::load_config()?,
    };
    if let Some(url) = &args.url {
        config.relay.url = url.clone();
    }
    if let Some(group) = &args.group {
        config.sync.group = Some(group.clone());
    }
    Ok(config)
}

/// Parse one stdin line as a volume in `[0.0, 1.0]`.
fn parse_volume(line: &str) -> Option<f64> {
    line.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| (0.0..=1.0).contains(v))
}

fn state_label(state: ConnectionState) -> &'static str {
    match state {
        ConnectionState::Disconnected => "disconnected",
        ConnectionState::Connecting => "connecting",
        ConnectionState::Connected => "connected",
    }
}

/// `RUST_LOG` when set and valid, otherwise `fallback`, otherwise `info`.
fn log_filter(from_env: Option<String>, fallback: &str) -> EnvFilter {
    from_env
        .and_then(|spec| EnvFilter::try_new(spec).ok())
        .or_else(|| EnvFilter::try_new(fallback).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

#[tokio::main]
async fn main() -> volsock_common::Result<()> {
    let args = cli::parse();
    let config = load_config(&args)?;
    if args.print_config {
        println!("{}", volsock_config::config_to_json(&config));
        return Ok(());
    }

    let default_level = config.logging.level.as_directive();
    let log_directive = args
        .log_level
        .clone()
        .unwrap_or_else(|| format!("volsock={default_level}"));
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(
            std::env::var(EnvFilter::DEFAULT_ENV).ok(),
            &log_directive,
        ))
        .init();

    let host = MemoryHost::new();
    let surface = ConsoleSurface::new(SurfaceId(1), 1.0);
    host.add(surface.clone());

    let handle = SyncHandle::start(&config, host);
    tracing::info!(group = %handle.group(), url = %config.relay.url, "Tab started");

    let mut state_rx = handle.subscribe_state();
    tokio::spawn(async move {
        while state_rx.changed().await.is_ok() {
            let state = *state_rx.borrow_and_update();
            eprintln!("relay: {}", state_label(state));
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) if line.trim().is_empty() => {}
                Some(line) => match parse_volume(&line) {
                    Some(volume) => surface.user_set_volume(volume),
                    None => eprintln!("expected a volume between 0.0 and 1.0, got {line:?}"),
                },
                None => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    tracing::info!(state = ?handle.state(), volume = surface.volume(), "Tab closing");
    Ok(())
}
