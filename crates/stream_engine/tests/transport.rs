use futures_util::StreamExt;
use std::time::Duration;

use stream_engine::{
    OpenRequest, ReqwestTransport, SseFrame, StreamItem, Transport, TransportFailure,
};
use url::Url;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BODY: &str = "data: {\"type\":\"signal\",\"data\":{\"symbol\":\"AAPL\"}}\n\n\
                    : heartbeat\n\n\
                    id: 42\n\
                    data: {\"type\":\"trade\",\"data\":{}}\n\n";

fn transport() -> ReqwestTransport {
    ReqwestTransport::new(Duration::from_secs(10)).expect("http client")
}

fn frames_only(items: Vec<StreamItem>) -> Vec<SseFrame> {
    items
        .into_iter()
        .filter_map(|item| match item {
            StreamItem::Frame(frame) => Some(frame),
            StreamItem::KeepAlive => None,
        })
        .collect()
}

#[tokio::test]
async fn opens_event_stream_and_yields_frames() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/stream/signals/1"))
        .and(header("accept", "text/event-stream"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(BODY, "text/event-stream"))
        .mount(&server)
        .await;

    let transport = transport();
    let url = Url::parse(&format!("{}/api/stream/signals/1", server.uri())).unwrap();
    let frames = transport
        .open(OpenRequest {
            url: &url,
            last_event_id: None,
        })
        .await
        .expect("open ok");

    let items: Vec<StreamItem> = frames.map(|item| item.expect("no error")).collect().await;
    let frames = frames_only(items);
    assert_eq!(frames.len(), 2);
    assert!(frames[0].data.contains("AAPL"));
    assert_eq!(frames[1].id.as_deref(), Some("42"));
}

#[tokio::test]
async fn sends_last_event_id_when_resuming() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/stream/trades"))
        .and(header("last-event-id", "41"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(BODY, "text/event-stream"))
        .expect(1)
        .mount(&server)
        .await;

    let transport = transport();
    let url = Url::parse(&format!("{}/api/stream/trades", server.uri())).unwrap();
    let result = transport
        .open(OpenRequest {
            url: &url,
            last_event_id: Some("41"),
        })
        .await;

    assert!(result.is_ok());
}

#[tokio::test]
async fn resumed_frames_carry_the_resume_id_until_replaced() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/stream/trades"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(BODY, "text/event-stream"))
        .mount(&server)
        .await;

    let url = Url::parse(&format!("{}/api/stream/trades", server.uri())).unwrap();
    let frames = transport()
        .open(OpenRequest {
            url: &url,
            last_event_id: Some("41"),
        })
        .await
        .expect("open ok");

    let items: Vec<StreamItem> = frames.map(|item| item.expect("no error")).collect().await;
    let ids: Vec<Option<String>> = frames_only(items).into_iter().map(|frame| frame.id).collect();
    assert_eq!(ids, vec![Some("41".to_string()), Some("42".to_string())]);
}

#[tokio::test]
async fn reconnects_reuse_one_transport() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/stream/signals"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(BODY, "text/event-stream"))
        .expect(2)
        .mount(&server)
        .await;

    let transport = transport();
    let url = Url::parse(&format!("{}/api/stream/signals", server.uri())).unwrap();
    for last_event_id in [None, Some("42")] {
        let frames = transport
            .open(OpenRequest {
                url: &url,
                last_event_id,
            })
            .await
            .expect("open ok");
        let items: Vec<_> = frames.collect().await;
        assert!(items.iter().all(Result::is_ok));
    }
}

#[tokio::test]
async fn fails_on_http_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/stream/portfolio/9"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let transport = transport();
    let url = Url::parse(&format!("{}/api/stream/portfolio/9", server.uri())).unwrap();
    let err = transport
        .open(OpenRequest {
            url: &url,
            last_event_id: None,
        })
        .await
        .err()
        .expect("status error");

    assert_eq!(err.kind, TransportFailure::HttpStatus(503));
}

#[tokio::test]
async fn rejects_non_event_stream_content() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/stream/signals"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<html></html>", "text/html"))
        .mount(&server)
        .await;

    let transport = transport();
    let url = Url::parse(&format!("{}/api/stream/signals", server.uri())).unwrap();
    let err = transport
        .open(OpenRequest {
            url: &url,
            last_event_id: None,
        })
        .await
        .err()
        .expect("content type error");

    assert_eq!(
        err.kind,
        TransportFailure::UnsupportedContentType {
            content_type: "text/html".to_string()
        }
    );
}
