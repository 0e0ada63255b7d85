//! Sender-side send-window, ACK-solicitation, and NACK-driven retransmit
//! state machine.
//!
//! `send_message` / `tick` (pacing) / `request_ack` / `handle_ack` /
//! `handle_nack`. `receiver_table` is a `HashMap<node_id, ack_seq>` rather
//! than a set keyed on node identity alone, which would risk silently
//! merging distinct receivers that share a comparison key.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use bytes::Bytes;

use crate::clock::{Clock, SystemClock};
use crate::stats::SenderStats;
use crate::wire::{Message, MessageKind, CONTENT_MAX};

#[derive(Debug, Clone)]
pub struct SenderConfig {
    /// Number of unacknowledged sends before an ACK is solicited proactively.
    pub send_ack_count: u32,
    /// Longest a sender waits between ACK solicitations regardless of volume.
    pub ack_timeout: Duration,
    /// Messages transmitted per pacing tick.
    pub send_count: usize,
    /// Sequence lag tolerated past a receiver's last ACK before it is
    /// evicted from `receiver_table` as a straggler.
    pub delete_count: u32,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            send_ack_count: 32,
            ack_timeout: Duration::from_secs(2),
            send_count: 50,
            delete_count: 1000,
        }
    }
}

/// Error/status events surfaced through `set_callback`. Analogous to the
/// original's `INQUEUE_ERROR` / `NACK_OUT_QUEUE` event kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SenderEvent {
    /// A NACK named a range this sender can no longer (or never could)
    /// satisfy: below the send window's floor or beyond what has been sent.
    NackOutOfQueue { start: u32, end: u32 },
}

/// A contiguous, sequence-addressed log of sent DATA messages, indexed by
/// `sequence_number - head_seq` in O(1). This is the "ring buffer keyed by
/// seq - head_seq" the design notes suggest in place of the original's
/// plain `deque` + linear/binary search.
#[derive(Debug, Default)]
struct SendLog {
    messages: VecDeque<Message>,
    head_seq: u32,
}

impl SendLog {
    fn new() -> Self {
        Self {
            messages: VecDeque::new(),
            head_seq: 0,
        }
    }

    fn push(&mut self, msg: Message) {
        if self.messages.is_empty() {
            self.head_seq = msg.sequence_number;
        }
        self.messages.push_back(msg);
    }

    fn front_seq(&self) -> Option<u32> {
        if self.messages.is_empty() {
            None
        } else {
            Some(self.head_seq)
        }
    }

    fn get(&self, seq: u32) -> Option<&Message> {
        let offset = seq.checked_sub(self.head_seq)?;
        self.messages.get(offset as usize)
    }

    /// Drops every entry with `sequence_number <= floor`.
    fn trim_to(&mut self, floor: u32) {
        while let Some(front) = self.messages.front() {
            if front.sequence_number <= floor {
                self.messages.pop_front();
                self.head_seq = self.head_seq.wrapping_add(1);
            } else {
                break;
            }
        }
    }

    fn len(&self) -> usize {
        self.messages.len()
    }
}

pub struct Sender {
    node_id: u32,
    config: SenderConfig,
    clock: Box<dyn Clock>,

    next_seq: u32,
    send_queue: SendLog,
    send_pointer_seq: u32,
    last_ack_exchange: u32,
    last_ack_solicit: quanta::Instant,

    receiver_table: HashMap<u32, u32>,

    output: VecDeque<Message>,
    events: Vec<SenderEvent>,
    stats: SenderStats,
}

impl Sender {
    pub fn new(node_id: u32, config: SenderConfig) -> Self {
        Self::with_clock(node_id, config, Box::new(SystemClock))
    }

    pub fn with_clock(node_id: u32, config: SenderConfig, clock: Box<dyn Clock>) -> Self {
        let last_ack_solicit = clock.now();
        Self {
            node_id,
            config,
            clock,
            next_seq: 0,
            send_queue: SendLog::new(),
            send_pointer_seq: 0,
            last_ack_exchange: 0,
            last_ack_solicit,
            receiver_table: HashMap::new(),
            output: VecDeque::new(),
            events: Vec::new(),
            stats: SenderStats::default(),
        }
    }

    pub fn stats(&self) -> &SenderStats {
        &self.stats
    }

    pub fn receiver_count(&self) -> usize {
        self.receiver_table.len()
    }

    /// Enqueues `payload` for transmission as the next DATA message.
    /// Returns `false` (no state change) if `payload` exceeds
    /// [`CONTENT_MAX`] — the queue itself is unbounded, matching the
    /// original's `std::deque`.
    pub fn send_message(&mut self, payload: Bytes) -> bool {
        if payload.len() > CONTENT_MAX {
            return false;
        }
        let msg = Message::data(self.next_seq, self.node_id, payload);
        self.next_seq = self.next_seq.wrapping_add(1);
        self.send_queue.push(msg);
        true
    }

    /// Dispatches an inbound ACK or NACK. Any other kind is ignored — a
    /// sender has no use for DATA/REPAIR/ACK_REQUEST/INIT frames.
    pub fn receive_message(&mut self, msg: Message) {
        match msg.kind {
            MessageKind::Ack => self.handle_ack(&msg),
            MessageKind::Nack => self.handle_nack(&msg),
            _ => {}
        }
    }

    fn handle_ack(&mut self, msg: &Message) {
        self.stats.acks_processed += 1;
        self.receiver_table
            .entry(msg.node_id)
            .and_modify(|ack| *ack = (*ack).max(msg.sequence_number))
            .or_insert(msg.sequence_number);
    }

    /// Selective retransmit: relabels every buffered DATA in `[start, end]`
    /// as REPAIR and queues it for immediate output, without moving
    /// `send_pointer_seq`.
    fn handle_nack(&mut self, msg: &Message) {
        let Some((start, end)) = msg.nack_range() else {
            return;
        };
        let satisfiable = match self.send_queue.front_seq() {
            Some(front) => start >= front && end < self.next_seq,
            None => false,
        };
        if !satisfiable {
            self.stats.nack_out_of_queue += 1;
            self.events
                .push(SenderEvent::NackOutOfQueue { start, end });
            return;
        }
        for seq in start..=end {
            if let Some(original) = self.send_queue.get(seq) {
                let repair = Message::repair(seq, self.node_id, original.content.clone());
                self.output.push_back(repair);
                self.stats.retransmissions += 1;
            }
        }
    }

    /// Runs the ACK-solicitation + window-maintenance step. Trim and
    /// straggler-eviction are mutually exclusive: a receiver table entry
    /// either anchors a trim of the send window, or — if nothing in the
    /// window is covered even by the slowest receiver — is evicted once its
    /// lag exceeds `delete_count`. Never both in the same call.
    pub fn request_ack(&mut self) {
        self.last_ack_solicit = self.clock.now();

        if let Some((&slow_node, &slow_ack)) =
            self.receiver_table.iter().min_by_key(|(_, ack)| **ack)
        {
            self.last_ack_exchange = slow_ack;
            let front_covers_slowest = match self.send_queue.front_seq() {
                Some(front) => front <= slow_ack,
                None => false,
            };
            if front_covers_slowest {
                self.send_queue.trim_to(slow_ack);
            } else if self.send_pointer_seq > slow_ack.saturating_add(self.config.delete_count) {
                self.receiver_table.remove(&slow_node);
                self.stats.stragglers_evicted += 1;
            }
        }

        self.output.push_back(Message::ack_request());
    }

    /// Transmits up to `send_count` not-yet-sent messages starting at
    /// `send_pointer_seq`, advancing the pointer as it goes. The pointer is
    /// an absolute sequence number, not an index or iterator, so it stays
    /// meaningful across `trim_to` calls that shift the underlying buffer.
    fn transmit_pending(&mut self) {
        let mut sent = 0;
        while sent < self.config.send_count {
            match self.send_queue.get(self.send_pointer_seq).cloned() {
                Some(msg) => {
                    self.output.push_back(msg);
                    self.stats.packets_sent += 1;
                    self.send_pointer_seq = self.send_pointer_seq.wrapping_add(1);
                    sent += 1;
                }
                None => break,
            }
        }
    }

    /// One iteration of the pacing loop: solicits an ACK if enough unacked
    /// volume has accumulated or the ACK timeout has elapsed, then
    /// transmits pending messages. Intended to run on every idle wakeup of
    /// the worker loop, and after any received frame that wasn't itself an
    /// ACK or NACK.
    pub fn tick(&mut self) {
        let unacked = self.next_seq.wrapping_sub(self.last_ack_exchange);
        let elapsed = self.clock.now() - self.last_ack_solicit;
        if unacked + 1 >= self.config.send_ack_count || elapsed >= self.config.ack_timeout {
            self.request_ack();
        }
        self.transmit_pending();
    }

    pub fn drain_output(&mut self) -> Vec<Message> {
        self.output.drain(..).collect()
    }

    pub fn drain_events(&mut self) -> Vec<SenderEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn queue_len(&self) -> usize {
        self.send_queue.len()
    }
}
