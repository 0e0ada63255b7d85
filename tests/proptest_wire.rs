//! Property-based tests for the wire format and the ordered pending set:
//! roundtrip properties over the full value range of each field, plus a
//! check that the decoder never panics on arbitrary bytes.

use bytes::Bytes;
use proptest::prelude::*;

use relmcast::pending::OrderedPendingSet;
use relmcast::wire::{Message, CONTENT_MAX};

fn arb_payload() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=CONTENT_MAX)
}

proptest! {
    #[test]
    fn data_message_roundtrips_for_any_sequence_node_and_payload(
        seq in any::<u32>(),
        node in any::<u32>(),
        payload in arb_payload(),
    ) {
        let msg = Message::data(seq, node, Bytes::from(payload.clone()));
        let encoded = msg.encode();
        let decoded = Message::decode(&mut encoded.freeze()).unwrap();
        prop_assert_eq!(decoded.sequence_number, seq);
        prop_assert_eq!(decoded.node_id, node);
        prop_assert_eq!(&decoded.content[..], &payload[..]);
    }

    #[test]
    fn nack_range_roundtrips_for_any_start_end(start in any::<u32>(), end in any::<u32>()) {
        let msg = Message::nack(7, start, end);
        let encoded = msg.encode();
        let decoded = Message::decode(&mut encoded.freeze()).unwrap();
        prop_assert_eq!(decoded.nack_range(), Some((start, end)));
    }

    #[test]
    fn decode_never_panics_on_arbitrary_bytes(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
        let mut buf = &bytes[..];
        let _ = Message::decode(&mut buf);
    }

    #[test]
    fn oversized_payload_always_truncates_to_content_max(
        extra in 1usize..512,
    ) {
        let payload = vec![0xAB_u8; CONTENT_MAX + extra];
        let msg = Message::data(0, 0, Bytes::from(payload));
        prop_assert_eq!(msg.content.len(), CONTENT_MAX);
    }

    #[test]
    fn pending_set_pops_in_ascending_sequence_order(
        mut seqs in prop::collection::vec(any::<u32>(), 0..64),
    ) {
        let mut set = OrderedPendingSet::new();
        for &seq in &seqs {
            set.insert(Message::data(seq, 0, Bytes::new()));
        }
        seqs.sort_unstable();
        seqs.dedup();

        let mut popped = Vec::new();
        while let Some(m) = set.pop_min() {
            popped.push(m.sequence_number);
        }
        prop_assert_eq!(popped, seqs);
    }
}
