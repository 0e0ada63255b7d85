#![no_main]

use bytes::Bytes;
use libfuzzer_sys::fuzz_target;
use relmcast::receiver::{Receiver, ReceiverConfig};

/// Fuzz the receiver state machine with arbitrary wire-format bytes fed in
/// two chunks, exercising gap detection, NACK timeout, repair admission,
/// and duplicate suppression together. Must never panic.
fuzz_target!(|data: &[u8]| {
    let mut rx = Receiver::new(1, ReceiverConfig::default());
    rx.receive(Bytes::copy_from_slice(data));
    rx.drain_events();

    if data.len() >= 16 {
        let mut rx2 = Receiver::new(1, ReceiverConfig::default());
        let mid = data.len() / 2;
        rx2.receive(Bytes::copy_from_slice(&data[..mid]));
        rx2.receive(Bytes::copy_from_slice(&data[mid..]));
        rx2.drain_events();
        while rx2.get_data().is_some() {}
    }
});
