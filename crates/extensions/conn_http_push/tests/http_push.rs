//! Exercises `HttpPushTransport` end-to-end against a real local server: `Incoming` cannot be
//! constructed any other way, so the three `PublishTransport` methods are driven through an
//! actual request/response round-trip here rather than as unit tests in `src/response.rs`.

use bytes::Bytes;
use conn_http_push::HttpPushTarget;
use conn_http_push::HttpPushTransport;
use conn_model::connection::DittoHeaders;
use conn_model::signal::AutoAckTarget;
use conn_model::signal::ExternalMessage;
use conn_model::signal::ExternalPayload;
use conn_model::signal::PublishTarget;
use conn_model::signal::Signal;
use conn_publisher::PublishTransport;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use tokio::net::TcpListener;

/// Binds an ephemeral server that always replies with `status` and `body` under the given
/// content-type, and returns the URI clients should target.
async fn spawn_server(status: u16, content_type: &'static str, body: &'static str) -> http::Uri {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let local_addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let (stream, _) = listener.accept().await.unwrap();
            let io = TokioIo::new(stream);
            tokio::spawn(async move {
                let service = service_fn(move |_request: http::Request<Incoming>| async move {
                    Ok::<_, Infallible>(
                        http::Response::builder()
                            .status(status)
                            .header(http::header::CONTENT_TYPE, content_type)
                            .body(Full::new(Bytes::from(body)))
                            .unwrap(),
                    )
                });
                let _ = http1::Builder::new().serve_connection(io, service).await;
            });
        }
    });

    format!("http://{local_addr}/ack").parse().unwrap()
}

fn event_signal() -> Signal {
    Signal::Event {
        ditto_headers: DittoHeaders::new(),
    }
}

async fn publish_once(transport: &HttpPushTransport, signal: &Signal) -> conn_model::signal::CommandResponseOrAck {
    let external_message = ExternalMessage {
        headers: DittoHeaders::new(),
        payload: ExternalPayload::Text("hi".to_string()),
    };
    let publish_target = PublishTarget {
        address: "/ack".to_string(),
    };
    let auto_ack_target: Option<AutoAckTarget> = None;

    let request = transport
        .build_request(signal, auto_ack_target.as_ref(), &publish_target, &external_message)
        .await
        .unwrap();
    let response = transport.send(request).await.unwrap();
    transport
        .to_outcome(signal, auto_ack_target.as_ref(), response, 64 * 1024, 64 * 1024)
        .await
        .unwrap()
}

#[tokio::test]
async fn a_json_response_is_parsed_into_the_acknowledgement_payload() {
    let uri = spawn_server(200, "application/json", r#"{"ok":true}"#).await;
    let transport = HttpPushTransport::new(HttpPushTarget::new(http::Method::POST, uri));

    let outcome = publish_once(&transport, &event_signal()).await;

    assert_eq!(outcome.acknowledgement.status_code, 200);
    assert_eq!(outcome.acknowledgement.payload, serde_json::json!({"ok": true}));
    assert!(outcome.command_response.is_none());
}

#[tokio::test]
async fn a_message_command_also_produces_a_matching_command_response() {
    let uri = spawn_server(200, "text/plain", "done").await;
    let transport = HttpPushTransport::new(HttpPushTarget::new(http::Method::POST, uri));
    let signal = Signal::MessageCommand {
        ditto_headers: DittoHeaders::new(),
        entity_id: "thing:1".to_string(),
    };

    let outcome = publish_once(&transport, &signal).await;

    let command_response = outcome.command_response.expect("message command must produce a response");
    assert_eq!(command_response.entity_id, "thing:1");
    assert_eq!(command_response.status_code, 200);
    assert_eq!(command_response.payload, serde_json::json!("done"));
}

#[tokio::test]
async fn an_unknown_status_code_fails_the_publish() {
    let uri = spawn_server(799, "text/plain", "").await;
    let transport = HttpPushTransport::new(HttpPushTarget::new(http::Method::POST, uri));

    let external_message = ExternalMessage {
        headers: DittoHeaders::new(),
        payload: ExternalPayload::Text("hi".to_string()),
    };
    let publish_target = PublishTarget {
        address: "/ack".to_string(),
    };
    let signal = event_signal();

    let request = transport.build_request(&signal, None, &publish_target, &external_message).await.unwrap();
    let response = transport.send(request).await.unwrap();
    let outcome = transport.to_outcome(&signal, None, response, 64 * 1024, 64 * 1024).await;

    assert!(outcome.is_err());
}

#[tokio::test]
async fn a_binary_response_is_base64_encoded_in_the_payload() {
    let uri = spawn_server(200, "application/octet-stream", "\u{FFFD}\u{FFFD}").await;
    let transport = HttpPushTransport::new(HttpPushTarget::new(http::Method::POST, uri));

    let outcome = publish_once(&transport, &event_signal()).await;

    assert_eq!(outcome.acknowledgement.status_code, 200);
    assert!(outcome.acknowledgement.payload.is_string());
}

#[tokio::test]
async fn do_test_connection_sends_a_head_request() {
    let uri = spawn_server(200, "text/plain", "").await;
    let transport = HttpPushTransport::new(HttpPushTarget::new(http::Method::POST, uri));

    let connection = sample_connection();
    conn_client::ConnectionTransport::do_test_connection(&transport, &connection).await.unwrap();
}

fn sample_connection() -> conn_model::connection::Connection {
    conn_model::connection::Connection {
        id: "http-push-test".to_string(),
        uri: conn_model::connection::Uri {
            host: "127.0.0.1".to_string(),
            port: 1,
        },
        desired_status: conn_model::connection::DesiredStatus::Open,
        sources: Vec::new(),
        targets: Vec::new(),
        mapping_context: None,
        processor_pool_size: 1,
    }
}
