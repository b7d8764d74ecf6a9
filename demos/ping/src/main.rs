//! Signal Relay ping demo
//!
//! Connects to a signaling server, sends an offer every time the channel
//! (re)connects and logs every message that comes back. Kill the server while
//! it runs to watch the backoff.
//!
//! ```text
//! RUST_LOG=signal_relay=debug cargo run -p signal-relay-ping -- ws://127.0.0.1:8080
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use signal_relay::prelude::*;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(name = "signal-relay-ping")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Signaling server URL
    #[arg(env = "SIGNAL_RELAY_ADDRESS", default_value = "ws://127.0.0.1:8080")]
    address: String,

    /// First retry delay in milliseconds
    #[arg(long, default_value = "1000")]
    min_delay_ms: u64,

    /// Retry delay ceiling in milliseconds
    #[arg(long)]
    max_delay_ms: Option<u64>,

    /// Restrict TLS to version 1.2
    #[arg(long)]
    tls12: bool,

    /// Connection id placed in the offers
    #[arg(long, default_value = "ping")]
    connection_id: String,
}

/// One-line summary of a received frame.
fn describe(frame: &[u8]) -> String {
    match SignalingMessage::from_slice(frame) {
        Ok(msg) => format!("{} for {}", msg.kind(), msg.connection_id()),
        Err(_) => format!("{} bytes of non-signaling data", frame.len()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();

    let mut builder = ChannelConfigBuilder::new()
        .address(&args.address)
        .min_delay(Duration::from_millis(args.min_delay_ms));
    if let Some(max) = args.max_delay_ms {
        builder = builder.max_delay(Duration::from_millis(max));
    }
    if args.tls12 {
        builder = builder.secure_transport(SecureTransport::Tls12Only);
    }
    let config = builder.build().context("invalid channel configuration")?;

    let (connected_tx, mut connected_rx) = mpsc::unbounded_channel();
    let handlers = Handlers::new()
        .on_connected(move || {
            let _ = connected_tx.send(());
        })
        .on_message(|frame| info!("received {}", describe(&frame)))
        .on_error(|reason| warn!(%reason, "signaling connection failed"))
        .on_close(|code| warn!(code, "signaling connection closed"));

    let (dispatcher, mut queue) = dispatcher();
    let channel = SignalingChannel::websocket(config, Arc::new(dispatcher), handlers);
    channel.start()?;

    let offer = SignalingMessage::offer(&args.connection_id, "v=0\r\n");
    loop {
        tokio::select! {
            more = queue.run_next() => {
                if !more {
                    break;
                }
            }
            Some(()) = connected_rx.recv() => {
                info!(address = %args.address, "connected, sending offer");
                if let Err(e) = channel.send_message(&offer) {
                    warn!(error = %e, "offer not sent");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                channel.stop();
                break;
            }
        }
    }

    Ok(())
}
