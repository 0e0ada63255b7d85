//! Reliable multicast transport: a sender/receiver pair that adds
//! loss-detection and NACK-driven recovery on top of an unreliable UDP
//! multicast substrate.
//!
//! The CORE state machines — [`wire`], [`pending`], [`receiver`], and
//! [`sender`] — are pure logic: no I/O, no logging, no threads. Everything
//! that touches the network or a clock lives in [`transport`], [`clock`],
//! and [`worker`], which assemble the CORE into a running pair of threads.

pub mod clock;
pub mod pending;
pub mod receiver;
pub mod sender;
pub mod stats;
pub mod transport;
pub mod wire;
pub mod worker;

pub use receiver::{NackState, Receiver, ReceiverConfig, ReceiverEvent};
pub use sender::{Sender, SenderConfig, SenderEvent};
pub use transport::{Transport, UdpMulticastTransport};
pub use wire::{Message, MessageKind, CONTENT_MAX};
pub use worker::{ReceiverHandle, SenderHandle};
