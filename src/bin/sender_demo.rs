//! Standalone sender demo: joins a UDPv4 multicast group, publishes a
//! steady stream of timestamped payloads, and logs ACK/NACK traffic as it
//! arrives. Exercises the CORE [`relmcast::Sender`] engine against the
//! reference [`relmcast::UdpMulticastTransport`] — not part of the
//! protocol's correctness surface, just a runnable demonstration of the
//! public API.

use std::net::Ipv4Addr;
use std::thread;
use std::time::Duration;

use bytes::Bytes;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use relmcast::{SenderConfig, SenderEvent, SenderHandle, UdpMulticastTransport};

/// relmcast sender demo — publishes payloads onto a UDPv4 multicast group.
#[derive(Parser, Debug)]
#[command(name = "relmcast-sender-demo", about = "Publish payloads over reliable multicast")]
struct Cli {
    /// Multicast group address to join.
    #[arg(long, default_value = "239.1.1.1")]
    group: Ipv4Addr,

    /// UDP port for the multicast group.
    #[arg(long, default_value_t = 9000)]
    port: u16,

    /// Local interface to join the group on.
    #[arg(long, default_value = "0.0.0.0")]
    interface: Ipv4Addr,

    /// Identifier this sender stamps into DATA/REPAIR frames (unused on the
    /// wire today, reserved for future multi-sender support).
    #[arg(long, default_value_t = 0)]
    node_id: u32,

    /// Milliseconds between published payloads.
    #[arg(long, default_value_t = 100)]
    interval_ms: u64,

    /// Number of payloads to publish before exiting. 0 means run forever.
    #[arg(long, default_value_t = 0)]
    count: u64,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .compact()
        .init();

    let cli = Cli::parse();

    tracing::info!(
        group = %cli.group,
        port = cli.port,
        interface = %cli.interface,
        "relmcast-sender-demo starting"
    );

    let transport = UdpMulticastTransport::join(cli.group, cli.port, cli.interface)?;
    let mut handle = SenderHandle::spawn(
        transport,
        cli.node_id,
        SenderConfig::default(),
        Some(Box::new(|event: SenderEvent| {
            tracing::warn!(?event, "sender event");
        })),
    );

    let mut published: u64 = 0;
    loop {
        if cli.count != 0 && published >= cli.count {
            break;
        }
        let payload = Bytes::from(format!("seq-payload-{published}"));
        if !handle.send_message(payload) {
            tracing::warn!(published, "send_message rejected payload");
        }
        published += 1;
        thread::sleep(Duration::from_millis(cli.interval_ms));
    }

    tracing::info!(published, "demo publish loop finished, stopping");
    handle.stop();
    Ok(())
}
