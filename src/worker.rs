//! Concurrency harness: each side owns a background worker thread driving a
//! `Transport`, plus a lock-guarded core state machine the application
//! thread calls into directly (`publish`/`get_data`). Mirrors the original's
//! `start()/stop()/set_callback()` lifecycle, but replaces its indefinitely
//! blocking `select()` with a bounded wait so shutdown is checked regularly
//! — the "wakeable wait" the design notes recommend in place of an
//! unbounded block. `stop()` signals the worker over a `crossbeam_channel`
//! shutdown channel rather than an atomic flag, the same pattern
//! `BondingRuntime`'s worker loop uses for its own `Shutdown` message.

use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use bytes::Bytes;
use crossbeam_channel::{bounded, Receiver as ChanReceiver, Sender as ChanSender};

use crate::receiver::{Receiver, ReceiverConfig, ReceiverEvent};
use crate::sender::{Sender, SenderConfig, SenderEvent};
use crate::transport::Transport;
use crate::wire::{Message, MessageKind};

/// How long a worker blocks in `wait_readable` before re-checking the
/// shutdown channel. Bounds shutdown latency without busy-polling.
const POLL_INTERVAL: Duration = Duration::from_millis(200);

pub type ReceiverCallback = Box<dyn Fn(ReceiverEvent) + Send + 'static>;
pub type SenderCallback = Box<dyn Fn(SenderEvent) + Send + 'static>;

/// Owns a [`Receiver`] and the thread driving it against a `Transport`.
pub struct ReceiverHandle {
    core: Arc<Mutex<Receiver>>,
    stop_tx: ChanSender<()>,
    thread: Option<JoinHandle<()>>,
}

impl ReceiverHandle {
    pub fn spawn<T>(
        transport: T,
        receiver_id: u32,
        config: ReceiverConfig,
        callback: Option<ReceiverCallback>,
    ) -> Self
    where
        T: Transport + 'static,
    {
        let core = Arc::new(Mutex::new(Receiver::new(receiver_id, config)));
        let (stop_tx, stop_rx) = bounded(1);

        let thread_core = core.clone();
        let thread = thread::spawn(move || {
            Self::run(transport, thread_core, stop_rx, callback);
        });

        tracing::info!(receiver_id, "receiver worker started");
        Self {
            core,
            stop_tx,
            thread: Some(thread),
        }
    }

    fn run<T: Transport>(
        transport: T,
        core: Arc<Mutex<Receiver>>,
        stop_rx: ChanReceiver<()>,
        callback: Option<ReceiverCallback>,
    ) {
        while stop_rx.try_recv().is_err() {
            match transport.wait_readable(Some(POLL_INTERVAL)) {
                Ok(true) => match transport.recv() {
                    Ok(Some(msg)) => {
                        let events = {
                            let mut rx = core.lock().expect("receiver core mutex poisoned");
                            rx.receive_message(msg);
                            rx.drain_events()
                        };
                        for event in events {
                            if let ReceiverEvent::SendAck(ref m) | ReceiverEvent::SendNack(ref m) =
                                event
                            {
                                if let Err(e) = transport.send(m) {
                                    tracing::warn!(error = %e, "receiver failed to send reply frame");
                                }
                            }
                            if let Some(cb) = &callback {
                                cb(event);
                            }
                        }
                    }
                    Ok(None) => {}
                    Err(e) => tracing::warn!(error = %e, "receiver transport recv failed"),
                },
                Ok(false) => {}
                Err(e) => tracing::warn!(error = %e, "receiver transport wait_readable failed"),
            }
        }
    }

    /// Pops the next in-order delivered message, if any.
    pub fn get_data(&self) -> Option<Message> {
        self.core
            .lock()
            .expect("receiver core mutex poisoned")
            .get_data()
    }

    pub fn stop(&mut self) {
        // `try_send` rather than `send`: a repeated call to `stop()` after
        // the channel already holds a pending shutdown (or the worker has
        // already exited and dropped its receiver) must not block or panic.
        let _ = self.stop_tx.try_send(());
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
        tracing::info!("receiver worker stopped");
    }
}

impl Drop for ReceiverHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Owns a [`Sender`] and the thread driving it against a `Transport`.
pub struct SenderHandle {
    core: Arc<Mutex<Sender>>,
    stop_tx: ChanSender<()>,
    thread: Option<JoinHandle<()>>,
}

impl SenderHandle {
    pub fn spawn<T>(
        transport: T,
        node_id: u32,
        config: SenderConfig,
        callback: Option<SenderCallback>,
    ) -> Self
    where
        T: Transport + 'static,
    {
        let core = Arc::new(Mutex::new(Sender::new(node_id, config)));
        let (stop_tx, stop_rx) = bounded(1);

        let thread_core = core.clone();
        let thread = thread::spawn(move || {
            Self::run(transport, thread_core, stop_rx, callback);
        });

        tracing::info!(node_id, "sender worker started");
        Self {
            core,
            stop_tx,
            thread: Some(thread),
        }
    }

    fn run<T: Transport>(
        transport: T,
        core: Arc<Mutex<Sender>>,
        stop_rx: ChanReceiver<()>,
        callback: Option<SenderCallback>,
    ) {
        while stop_rx.try_recv().is_err() {
            match transport.wait_readable(Some(POLL_INTERVAL)) {
                Ok(true) => match transport.recv() {
                    Ok(Some(msg)) => {
                        let was_ack_or_nack =
                            matches!(msg.kind, MessageKind::Ack | MessageKind::Nack);
                        let (outbound, events) = {
                            let mut tx = core.lock().expect("sender core mutex poisoned");
                            tx.receive_message(msg);
                            // Pacing runs on idle wakeups, or after any
                            // frame that wasn't itself an ACK/NACK — not
                            // after ACK/NACK, which are already fully
                            // handled by receive_message.
                            if !was_ack_or_nack {
                                tx.tick();
                            }
                            (tx.drain_output(), tx.drain_events())
                        };
                        Self::flush(&transport, outbound);
                        Self::notify(&callback, events);
                    }
                    Ok(None) => {}
                    Err(e) => tracing::warn!(error = %e, "sender transport recv failed"),
                },
                Ok(false) => {
                    let (outbound, events) = {
                        let mut tx = core.lock().expect("sender core mutex poisoned");
                        tx.tick();
                        (tx.drain_output(), tx.drain_events())
                    };
                    Self::flush(&transport, outbound);
                    Self::notify(&callback, events);
                }
                Err(e) => tracing::warn!(error = %e, "sender transport wait_readable failed"),
            }
        }
    }

    fn flush<T: Transport>(transport: &T, outbound: Vec<Message>) {
        for msg in outbound {
            if let Err(e) = transport.send(&msg) {
                tracing::warn!(error = %e, "sender failed to transmit frame");
            }
        }
    }

    fn notify(callback: &Option<SenderCallback>, events: Vec<SenderEvent>) {
        if let Some(cb) = callback {
            for event in events {
                cb(event);
            }
        }
    }

    /// Publishes a payload for transmission. Returns `false` if the payload
    /// exceeds the wire content ceiling.
    pub fn send_message(&self, payload: Bytes) -> bool {
        self.core
            .lock()
            .expect("sender core mutex poisoned")
            .send_message(payload)
    }

    pub fn stop(&mut self) {
        let _ = self.stop_tx.try_send(());
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
        tracing::info!("sender worker stopped");
    }
}

impl Drop for SenderHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
