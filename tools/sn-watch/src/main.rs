//! sn-watch: follow a broadcast hub from the terminal.
//!
//! Connects with an access token, subscribes to the given topics and prints
//! every inbound frame as one JSON line. Reconnects like the dashboard does.

use anyhow::{Context, Result};
use clap::Parser;
use shared_types::{events, Envelope, Topic};
use sn_02_ws_client::{ClientConfig, ConnectionState, ListenerHandle, RealtimeClient};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Every message type the hub sends.
const WATCHED: [&str; 12] = [
    events::SECURITY_OVERVIEW,
    events::ALERTS_RECENT,
    events::SECURITY_METRICS_UPDATE,
    events::THREATS_UPDATE,
    events::FRAUD_UPDATE,
    events::BLOCKCHAIN_UPDATE,
    events::BIOMETRIC_UPDATE,
    events::THREAT_ALERT,
    events::FRAUD_ALERT,
    events::SYSTEM_ALERT,
    events::PONG,
    events::ERROR,
];

#[derive(Parser, Debug)]
#[command(name = "sn-watch")]
#[command(about = "Print real-time events from a Sentinel broadcast hub")]
struct Args {
    /// Hub WebSocket URL
    #[arg(short, long, default_value = "ws://127.0.0.1:3001/ws")]
    url: String,

    /// Access token issued by the REST API
    #[arg(short, long, env = "SN_TOKEN")]
    token: String,

    /// Topics to subscribe to (threats, fraud, blockchain, biometric, alerts)
    #[arg(short = 's', long = "subscribe", value_parser = parse_topic)]
    topics: Vec<Topic>,

    /// Extra rooms to join
    #[arg(long = "room", value_parser = parse_topic)]
    rooms: Vec<Topic>,

    /// Seconds between reconnection attempts
    #[arg(long, default_value = "5")]
    retry_delay: u64,

    /// Consecutive failures before giving up
    #[arg(long, default_value = "5")]
    max_attempts: u32,
}

fn parse_topic(raw: &str) -> Result<Topic, String> {
    let topic: Topic = raw.parse().map_err(|e| format!("{e}"))?;
    if topic.is_implicit() {
        return Err(format!("{topic} is assigned by the hub and cannot be requested"));
    }
    Ok(topic)
}

fn print_frame(envelope: &Envelope) {
    match serde_json::to_string(envelope) {
        Ok(line) => println!("{line}"),
        Err(e) => warn!(kind = %envelope.kind, error = %e, "Unprintable frame"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .context("invalid log filter")?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let args = Args::parse();

    let mut config = ClientConfig::new(args.url.clone(), args.token);
    config.reconnect_delay = Duration::from_secs(args.retry_delay);
    config.max_attempts = args.max_attempts;

    let client = RealtimeClient::new(config);
    let _listeners: Vec<ListenerHandle> = WATCHED
        .iter()
        .map(|kind| {
            client.on(*kind, |envelope| {
                print_frame(envelope);
                Ok(())
            })
        })
        .collect();

    for room in args.rooms {
        client.join_room(room);
    }
    for topic in args.topics {
        client.subscribe(topic);
    }

    let mut states = client.watch_state();
    tokio::spawn(async move {
        while states.changed().await.is_ok() {
            let state = *states.borrow_and_update();
            match state {
                ConnectionState::Connected => info!(%state, "Connected"),
                ConnectionState::Failed => warn!(%state, "Giving up"),
                _ => info!(%state, "Connection state changed"),
            }
        }
    });

    info!(url = %args.url, "Watching hub. Press Ctrl+C to stop.");
    client.connect();

    let stopper = Arc::clone(&client);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Disconnecting");
            stopper.disconnect();
        }
    });

    client.wait().await.context("connection lost for good")?;
    Ok(())
}
