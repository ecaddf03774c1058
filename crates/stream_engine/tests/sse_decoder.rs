use futures_util::{stream, StreamExt};
use pretty_assertions::assert_eq;
use stream_engine::{
    frames_from_bytes, SseDecoder, SseFrame, StreamItem, TransportError, TransportFailure,
};

fn data_of(frames: &[SseFrame]) -> Vec<&str> {
    frames.iter().map(|frame| frame.data.as_str()).collect()
}

#[test]
fn decodes_single_event() {
    let mut decoder = SseDecoder::new();
    let frames = decoder.feed(b"data: {\"type\":\"signal\",\"data\":{}}\n\n");

    assert_eq!(data_of(&frames), vec![r#"{"type":"signal","data":{}}"#]);
    assert_eq!(frames[0].event, None);
    assert_eq!(frames[0].id, None);
}

#[test]
fn joins_multiline_data_and_skips_comments() {
    let mut decoder = SseDecoder::new();
    let frames = decoder.feed(b": keep-alive\ndata: first\ndata:second\n\n: ping\n\n");

    assert_eq!(data_of(&frames), vec!["first\nsecond"]);
}

#[test]
fn handles_lines_split_across_chunks() {
    let mut decoder = SseDecoder::new();
    assert!(decoder.feed(b"da").is_empty());
    assert!(decoder.feed(b"ta: hel").is_empty());
    assert!(decoder.feed(b"lo\r").is_empty());
    assert!(decoder.feed(b"\n").is_empty());
    let frames = decoder.feed(b"\r\ndata: again\r\r");

    assert_eq!(data_of(&frames), vec!["hello", "again"]);
}

#[test]
fn carries_event_name_and_last_id() {
    let mut decoder = SseDecoder::new();
    let frames = decoder.feed(b"event: update\nid: 7\ndata: a\n\ndata: b\n\n");

    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0].event.as_deref(), Some("update"));
    assert_eq!(frames[0].id.as_deref(), Some("7"));
    assert_eq!(frames[1].event, None);
    assert_eq!(frames[1].id.as_deref(), Some("7"));
}

#[test]
fn event_without_data_is_not_dispatched() {
    let mut decoder = SseDecoder::new();
    assert!(decoder.feed(b"event: noop\nretry: 100\n\n").is_empty());
}

#[test]
fn strips_leading_bom() {
    let mut decoder = SseDecoder::new();
    assert!(decoder.feed(b"\xEF\xBB").is_empty());
    let frames = decoder.feed(b"\xBFdata: x\n\n");
    assert_eq!(data_of(&frames), vec!["x"]);
}

#[test]
fn incomplete_trailing_event_is_held_back() {
    let mut decoder = SseDecoder::new();
    assert!(decoder.feed(b"data: partial\n").is_empty());
}

#[tokio::test]
async fn byte_stream_yields_frames_then_error() {
    let chunks: Vec<Result<bytes::Bytes, std::io::Error>> = vec![
        Ok(bytes::Bytes::from_static(b"data: one\n\nda")),
        Ok(bytes::Bytes::from_static(b"ta: two\n\n")),
        Err(std::io::Error::other("reset")),
    ];
    let mut frames = frames_from_bytes(stream::iter(chunks), None, network_error);

    assert_eq!(frame_data(frames.next().await), "one");
    assert_eq!(frame_data(frames.next().await), "two");
    let err = frames.next().await.unwrap().unwrap_err();
    assert_eq!(err.kind, TransportFailure::Network);
}

#[tokio::test]
async fn comment_only_chunks_are_keepalives() {
    let chunks: Vec<Result<bytes::Bytes, std::io::Error>> = vec![
        Ok(bytes::Bytes::from_static(b": ping\n\n")),
        Ok(bytes::Bytes::from_static(b": ping\n\n")),
    ];
    let frames = frames_from_bytes(stream::iter(chunks), None, network_error);

    let items: Vec<StreamItem> = frames.map(|item| item.unwrap()).collect().await;
    assert_eq!(items, vec![StreamItem::KeepAlive, StreamItem::KeepAlive]);
}

#[test]
fn empty_id_resets_last_event_id() {
    let mut decoder = SseDecoder::new();
    let frames = decoder.feed(b"id: 7\ndata: a\n\ndata: b\n\nid\ndata: c\n\nid:\ndata: d\n\n");

    let ids: Vec<Option<&str>> = frames.iter().map(|frame| frame.id.as_deref()).collect();
    assert_eq!(ids, vec![Some("7"), Some("7"), None, None]);
}

#[test]
fn resuming_decoder_starts_from_the_given_id() {
    let mut decoder = SseDecoder::resuming(Some("41".to_string()));
    let frames = decoder.feed(b"data: a\n\nid:\ndata: b\n\n");

    assert_eq!(frames[0].id.as_deref(), Some("41"));
    assert_eq!(frames[1].id, None);
}

fn network_error(err: std::io::Error) -> TransportError {
    TransportError::new(TransportFailure::Network, err.to_string())
}

fn frame_data(item: Option<Result<StreamItem, TransportError>>) -> String {
    match item {
        Some(Ok(StreamItem::Frame(frame))) => frame.data,
        other => panic!("expected a frame, got {other:?}"),
    }
}
