//! Lightweight counters for observability. Not part of the protocol's
//! correctness surface — safe to ignore, serialize for a status endpoint, or
//! log periodically.

use serde::Serialize;

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReceiverStats {
    pub delivered: u64,
    pub duplicates: u64,
    pub nacks_sent: u64,
    pub repairs_accepted: u64,
    pub repairs_rejected: u64,
    pub highest_delivered_seq: Option<u32>,
}

impl ReceiverStats {
    /// Fraction of delivered frames that arrived via REPAIR rather than the
    /// original DATA frame. `None` before anything has been delivered.
    pub fn repair_ratio(&self) -> Option<f64> {
        if self.delivered == 0 {
            return None;
        }
        Some(self.repairs_accepted as f64 / self.delivered as f64)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SenderStats {
    pub packets_sent: u64,
    pub retransmissions: u64,
    pub acks_processed: u64,
    pub nack_out_of_queue: u64,
    pub stragglers_evicted: u64,
}

impl SenderStats {
    pub fn retransmit_ratio(&self) -> f64 {
        if self.packets_sent == 0 {
            return 0.0;
        }
        self.retransmissions as f64 / self.packets_sent as f64
    }
}
