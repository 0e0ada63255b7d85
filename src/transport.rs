//! `Transport` is the external collaborator the CORE depends on but does not
//! implement: sending and receiving raw frames over whatever unreliable
//! multicast substrate the deployment uses. [`UdpMulticastTransport`] is a
//! reference adapter over `std::net::UdpSocket`, provided so the demo
//! binaries and integration tests have something real to run against — it
//! is not part of the protocol's correctness surface.

use std::io;
use std::net::{Ipv4Addr, SocketAddrV4, UdpSocket};
use std::time::Duration;

use bytes::Bytes;

use crate::wire::Message;

/// Everything the worker loop needs from the network layer: send a frame,
/// try to receive one without blocking, and wait (bounded) until one is
/// likely available.
pub trait Transport: Send {
    fn send(&self, msg: &Message) -> anyhow::Result<()>;

    /// Non-blocking receive. `Ok(None)` means nothing was available.
    fn recv(&self) -> anyhow::Result<Option<Message>>;

    /// Blocks until a frame is likely readable or `deadline` elapses,
    /// returning `Ok(false)` on timeout. Workers use a bounded deadline here
    /// (rather than blocking indefinitely, as the original's `select()`
    /// does) so the stop flag can be polled between waits.
    fn wait_readable(&self, deadline: Option<Duration>) -> anyhow::Result<bool>;
}

/// UDPv4 multicast transport: binds to `0.0.0.0:port`, joins
/// `multicast_addr` on `interface`, and sends frames back out to the
/// multicast group.
pub struct UdpMulticastTransport {
    socket: UdpSocket,
    group: SocketAddrV4,
}

impl UdpMulticastTransport {
    pub fn join(
        multicast_addr: Ipv4Addr,
        port: u16,
        interface: Ipv4Addr,
    ) -> anyhow::Result<Self> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, port))?;
        match socket.join_multicast_v4(&multicast_addr, &interface) {
            Ok(()) => {}
            // EADDRINUSE: already joined on this interface, e.g. a sender and
            // receiver sharing one process and one socket group. Non-fatal.
            Err(e) if e.raw_os_error() == Some(98) => {}
            Err(e) => return Err(e.into()),
        }
        socket.set_nonblocking(true)?;
        Ok(Self {
            socket,
            group: SocketAddrV4::new(multicast_addr, port),
        })
    }
}

impl Transport for UdpMulticastTransport {
    fn send(&self, msg: &Message) -> anyhow::Result<()> {
        let encoded = msg.encode();
        self.socket.send_to(&encoded, self.group)?;
        Ok(())
    }

    fn recv(&self) -> anyhow::Result<Option<Message>> {
        let mut buf = [0u8; 4096];
        match self.socket.recv_from(&mut buf) {
            Ok((n, _from)) => Ok(Message::decode(&mut Bytes::copy_from_slice(&buf[..n]))),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn wait_readable(&self, deadline: Option<Duration>) -> anyhow::Result<bool> {
        self.socket.set_read_timeout(deadline)?;
        let mut probe = [0u8; 1];
        match self.socket.peek_from(&mut probe) {
            Ok(_) => Ok(true),
            Err(e)
                if e.kind() == io::ErrorKind::WouldBlock
                    || e.kind() == io::ErrorKind::TimedOut =>
            {
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }
}
