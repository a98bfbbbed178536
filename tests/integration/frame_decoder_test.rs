//! Frame decoder reassembly properties.

use conviction_advisor::FrameDecoder;
use conviction_core::streaming::StreamEvent;

fn feed_in_pieces(stream: &[u8], piece_len: usize) -> Vec<StreamEvent> {
    let mut decoder = FrameDecoder::new();
    let mut events = Vec::new();
    for piece in stream.chunks(piece_len.max(1)) {
        events.extend(decoder.feed(piece));
    }
    decoder.finish();
    events
}

/// A realistic stream: multi-byte text, follow-ups, metadata, terminal.
fn sample_stream() -> Vec<u8> {
    let frames = [
        r#"data: {"choices":[{"delta":{"content":"Cameco ist Kazatomproms "}}]}"#,
        ": keep-alive",
        r#"data: {"choices":[{"delta":{"content":"größter westlicher Rivale."}}]}"#,
        r#"data: {"type":"follow_ups","options":[{"label":"Show news","type":"news","ticker":"CCJ"}]}"#,
        r#"data: {"type":"advisor_metadata","suggested_questions":["What are the contract terms?"]}"#,
        "data: [DONE]",
    ];
    let mut bytes = Vec::new();
    for frame in frames {
        bytes.extend_from_slice(frame.as_bytes());
        bytes.push(b'\n');
    }
    bytes
}

#[test]
fn test_reassembly_idempotent_for_every_piece_size() {
    let stream = sample_stream();

    let mut whole = FrameDecoder::new();
    let expected = whole.feed(&stream);
    assert_eq!(expected.len(), 5); // two deltas, follow-ups, metadata, terminal

    for piece_len in 1..=stream.len() {
        let events = feed_in_pieces(&stream, piece_len);
        assert_eq!(events, expected, "piece length {}", piece_len);
    }
}

#[test]
fn test_reassembly_idempotent_for_every_split_point() {
    let stream = sample_stream();
    let mut whole = FrameDecoder::new();
    let expected = whole.feed(&stream);

    for split in 0..=stream.len() {
        let mut decoder = FrameDecoder::new();
        let mut events = decoder.feed(&stream[..split]);
        events.extend(decoder.feed(&stream[split..]));
        assert_eq!(events, expected, "split at byte {}", split);
    }
}

#[test]
fn test_no_content_loss() {
    let stream = sample_stream();
    let expected_text = "Cameco ist Kazatomproms größter westlicher Rivale.";

    for piece_len in [1, 2, 3, 7, 16, 64] {
        let text: String = feed_in_pieces(&stream, piece_len)
            .into_iter()
            .filter_map(|e| match e {
                StreamEvent::ContentDelta { text } => Some(text),
                _ => None,
            })
            .collect();
        assert_eq!(text, expected_text, "piece length {}", piece_len);
    }
}

#[test]
fn test_partial_save_across_chunks_scenario() {
    let mut decoder = FrameDecoder::new();
    let mut events = decoder.feed(b"data: {\"choices\":[{\"delta\":{\"content\":\"Hel");
    events.extend(decoder.feed(b"lo\"}}]}\n"));
    events.extend(decoder.feed(b"data: [DONE]\n"));

    assert_eq!(
        events,
        vec![
            StreamEvent::ContentDelta {
                text: "Hello".to_string()
            },
            StreamEvent::Terminal,
        ]
    );
}

#[test]
fn test_trailing_partial_frame_discarded_not_guessed() {
    let mut decoder = FrameDecoder::new();
    let events = decoder.feed(b"data: {\"choices\":[{\"delta\":{\"content\":\"half");
    assert!(events.is_empty());
    decoder.finish();
    // Nothing was emitted for the incomplete frame.
}

#[test]
fn test_multiline_payload_recovers_across_chunks() {
    // One logical payload serialized over two physical lines; the decoder
    // rejoins them with the restored delimiter.
    let stream =
        b"data: {\"type\":\"advisor_metadata\",\n \"suggested_questions\":[\"q\"]}\ndata: [DONE]\n";
    let mut whole = FrameDecoder::new();
    let expected = whole.feed(stream);
    assert_eq!(expected.len(), 2);
    assert!(matches!(expected[0], StreamEvent::Metadata { .. }));

    for piece_len in 1..=24 {
        let events = feed_in_pieces(stream, piece_len);
        assert_eq!(events, expected, "piece length {}", piece_len);
    }
}
