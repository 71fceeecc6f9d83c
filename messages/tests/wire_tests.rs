use proptest::prelude::*;
use safenode_crypto::keypair_from_seed;
use safenode_messages::{
    decode_batch_hex, decode_message, encode_batch_hex, encode_message, BroadcastMessage,
    CodecError, CreateContext, VerificationMessage, WireMessage,
};
use safenode_types::{
    BlockHash, NetworkId, NodeParams, Outpoint, ServiceAddr, Timestamp, TxHash,
};

// ---- Helpers ----

fn broadcast(seed: u8, now: u64) -> BroadcastMessage {
    let ctx = CreateContext {
        network: NetworkId::Dev,
        protocol_version: NodeParams::PROTOCOL_VERSION,
        tip: BlockHash::new([seed; 32]),
        now: Timestamp::new(now),
    };
    BroadcastMessage::create(
        Outpoint::new(TxHash::new([seed; 32]), seed as u32),
        ServiceAddr::parse(&format!("10.0.0.{seed}:25565")).unwrap(),
        &keypair_from_seed(&[seed; 32]),
        &keypair_from_seed(&[seed.wrapping_add(100); 32]),
        &ctx,
    )
    .unwrap()
}

// ---- Batches ----

#[test]
fn batch_survives_hex_transport() {
    let batch = vec![broadcast(1, 1_000), broadcast(2, 2_000), broadcast(3, 3_000)];
    let text = encode_batch_hex(&batch);
    let decoded = decode_batch_hex(&text).unwrap();
    assert_eq!(decoded, batch);
    for b in &decoded {
        assert!(b.check_signature().is_ok());
    }
}

#[test]
fn uppercase_hex_and_whitespace_are_accepted() {
    let batch = vec![broadcast(4, 1_000)];
    let text = format!("  {}\n", encode_batch_hex(&batch).to_uppercase());
    assert_eq!(decode_batch_hex(&text).unwrap(), batch);
}

#[test]
fn one_bad_entry_fails_the_whole_batch() {
    let batch = vec![broadcast(1, 1_000), broadcast(2, 2_000)];
    let mut text = encode_batch_hex(&batch);
    // Drop the final byte of the second entry.
    text.truncate(text.len() - 2);
    assert!(matches!(decode_batch_hex(&text), Err(CodecError::Malformed(_))));
}

#[test]
fn trailing_bytes_are_rejected() {
    let mut text = encode_batch_hex(&[broadcast(1, 1_000)]);
    text.push_str("00");
    assert!(decode_batch_hex(&text).is_err());
}

// ---- Single messages ----

#[test]
fn wire_messages_decode_to_the_same_value() {
    let b = broadcast(5, 9_000);
    let ping = b.ping.clone();
    let verify = VerificationMessage::request(b.addr, 7, 100);

    for msg in [
        WireMessage::Broadcast(b),
        WireMessage::Ping(ping),
        WireMessage::Verification(verify),
    ] {
        let bytes = encode_message(&msg);
        assert_eq!(decode_message(&bytes).unwrap(), msg);
    }
}

#[test]
fn broadcast_hash_is_stable_across_encoding() {
    let b = broadcast(6, 1_234);
    let bytes = encode_message(&WireMessage::Broadcast(b.clone()));
    let WireMessage::Broadcast(decoded) = decode_message(&bytes).unwrap() else {
        panic!("expected a broadcast");
    };
    assert_eq!(decoded.hash(), b.hash());
}

proptest! {
    #[test]
    fn arbitrary_bytes_never_panic(bytes in proptest::collection::vec(any::<u8>(), 0..512)) {
        let _ = decode_message(&bytes);
        let _ = decode_batch_hex(&hex::encode(&bytes));
    }

    #[test]
    fn arbitrary_text_never_panics(text in ".{0,64}") {
        let _ = decode_batch_hex(&text);
    }
}
