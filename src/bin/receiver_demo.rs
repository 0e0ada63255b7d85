//! Standalone receiver demo: joins the same UDPv4 multicast group as
//! `relmcast-sender-demo`, drains delivered payloads, and logs loss-recovery
//! events (NACK emission, stale-repair rejection) as they happen.

use std::net::Ipv4Addr;
use std::thread;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use relmcast::{ReceiverConfig, ReceiverEvent, ReceiverHandle, UdpMulticastTransport};

/// relmcast receiver demo — joins a multicast group and prints delivered payloads.
#[derive(Parser, Debug)]
#[command(name = "relmcast-receiver-demo", about = "Receive payloads over reliable multicast")]
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

    /// Identifier this receiver stamps into ACK/NACK frames.
    #[arg(long, default_value_t = 1)]
    receiver_id: u32,

    /// How often (ms) to poll for newly delivered payloads.
    #[arg(long, default_value_t = 50)]
    poll_interval_ms: u64,
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
        receiver_id = cli.receiver_id,
        "relmcast-receiver-demo starting"
    );

    let transport = UdpMulticastTransport::join(cli.group, cli.port, cli.interface)?;
    let handle = ReceiverHandle::spawn(
        transport,
        cli.receiver_id,
        ReceiverConfig::default(),
        Some(Box::new(|event: ReceiverEvent| {
            if let ReceiverEvent::NackError { start, end } = event {
                tracing::warn!(start, end, "gap recovery stalled, repair never arrived");
            }
        })),
    );

    loop {
        while let Some(msg) = handle.get_data() {
            tracing::info!(
                sequence_number = msg.sequence_number,
                bytes = msg.content.len(),
                "delivered"
            );
        }
        thread::sleep(Duration::from_millis(cli.poll_interval_ms));
    }
}
