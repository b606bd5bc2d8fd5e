//! Codec laws: round-trip fidelity, framing robustness under arbitrary
//! splits, and byte-exact consumed counts.

use coral::input::MessageReader;
use coral::resp::RespValue;
use tokio::io::AsyncWriteExt;

fn command_corpus() -> Vec<RespValue> {
    vec![
        RespValue::command(&["PING"]),
        RespValue::command(&["ECHO", "hello world"]),
        RespValue::command(&["SET", "foo", "bar"]),
        RespValue::command(&["SET", "key", "value", "PX", "100"]),
        RespValue::command(&["GET", ""]),
        RespValue::command(&["REPLCONF", "listening-port", "6380"]),
        RespValue::command(&["PSYNC", "?", "-1"]),
    ]
}

#[test]
fn test_round_trip_preserves_commands() {
    for original in command_corpus() {
        let encoded = original.encode();
        let (decoded, consumed) = RespValue::decode(encoded.as_bytes())
            .unwrap()
            .expect("complete frame should decode");

        assert_eq!(decoded, original);
        assert_eq!(consumed, encoded.len());
    }
}

#[test]
fn test_consumed_bytes_equal_wire_length() {
    // A concatenated stream of frames is consumed frame by frame, each
    // decode reporting exactly its own wire length.
    let corpus = command_corpus();
    let stream: String = corpus.iter().map(|value| value.encode()).collect();
    let mut remaining = stream.as_bytes();

    for original in &corpus {
        let (decoded, consumed) = RespValue::decode(remaining).unwrap().unwrap();
        assert_eq!(&decoded, original);
        assert_eq!(consumed, original.encode().len());
        remaining = &remaining[consumed..];
    }

    assert!(remaining.is_empty());
}

#[tokio::test]
async fn test_framing_is_robust_to_arbitrary_splits() {
    let corpus = command_corpus();
    let stream: Vec<u8> = corpus
        .iter()
        .flat_map(|value| value.encode().into_bytes())
        .collect();

    for chunk_size in [1, 2, 3, 7, 16] {
        let (client, server) = tokio::io::duplex(1024);
        let stream_clone = stream.clone();

        let writer = tokio::spawn(async move {
            let mut client = client;
            for chunk in stream_clone.chunks(chunk_size) {
                client.write_all(chunk).await.unwrap();
                client.flush().await.unwrap();
            }
        });

        let mut reader = MessageReader::new(server);
        for original in &corpus {
            let (decoded, consumed) = reader.read_message().await.unwrap();
            assert_eq!(&decoded, original, "chunk size {}", chunk_size);
            assert_eq!(consumed, original.encode().len(), "chunk size {}", chunk_size);
        }

        writer.await.unwrap();
    }
}
