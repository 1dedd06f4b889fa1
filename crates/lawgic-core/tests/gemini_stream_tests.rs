use futures::StreamExt;
use lawgic_core::chat::ControllerOptions;
use lawgic_core::context::StoreOptions;
use lawgic_core::llm::{CitationRecord, SessionConfig};
use lawgic_core::{
    ChatController, ChatSession, ConversationStore, GeminiClient, LawgicError, MemoryStore,
    ModelBackend, Part, StreamEvent, TurnOutcome,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};

// ========================================================================
// Scripted SSE server
// ========================================================================

enum Step {
    Send(Vec<u8>),
    /// Keep the connection open until the test releases it.
    Wait(oneshot::Receiver<()>),
}

struct Reply {
    status: &'static str,
    steps: Vec<Step>,
}

impl Reply {
    fn ok(steps: Vec<Step>) -> Self {
        Self {
            status: "200 OK",
            steps,
        }
    }
}

fn sse(payload: Value) -> Vec<u8> {
    format!("data: {payload}\r\n\r\n").into_bytes()
}

fn text_chunk(text: &str) -> Value {
    json!({ "candidates": [{ "content": { "role": "model", "parts": [{ "text": text }] } }] })
}

/// Serve one scripted reply per connection, in order, and hand back every
/// request body the client sent.
async fn spawn_server(replies: Vec<Reply>) -> (String, mpsc::UnboundedReceiver<Value>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    let (body_tx, body_rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        for reply in replies {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            let body = read_request_body(&mut socket).await;
            let _ = body_tx.send(serde_json::from_slice(&body).unwrap_or(Value::Null));

            let head = format!(
                "HTTP/1.1 {}\r\ncontent-type: text/event-stream\r\nconnection: close\r\n\r\n",
                reply.status
            );
            if socket.write_all(head.as_bytes()).await.is_err() {
                continue;
            }
            for step in reply.steps {
                match step {
                    Step::Send(bytes) => {
                        if socket.write_all(&bytes).await.is_err() {
                            break;
                        }
                        let _ = socket.flush().await;
                        tokio::time::sleep(Duration::from_millis(20)).await;
                    }
                    Step::Wait(gate) => {
                        let _ = gate.await;
                    }
                }
            }
            let _ = socket.shutdown().await;
        }
    });

    (base_url, body_rx)
}

async fn read_request_body(socket: &mut TcpStream) -> Vec<u8> {
    let mut data = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        if let Some(end) = data.windows(4).position(|w| w == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&data[..end]).to_lowercase();
            let length = head
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            let start = end + 4;
            while data.len() < start + length {
                match socket.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => data.extend_from_slice(&buf[..n]),
                }
            }
            let stop = (start + length).min(data.len());
            return data[start..stop].to_vec();
        }
        match socket.read(&mut buf).await {
            Ok(0) | Err(_) => return data,
            Ok(n) => data.extend_from_slice(&buf[..n]),
        }
    }
}

fn client(base_url: &str) -> GeminiClient {
    GeminiClient::new("test-key").unwrap().with_base_url(base_url)
}

fn config() -> SessionConfig {
    SessionConfig::new("gemini-2.5-flash")
}

async fn collect(
    mut rx: futures::channel::mpsc::UnboundedReceiver<StreamEvent>,
) -> Vec<StreamEvent> {
    let mut events = Vec::new();
    while let Some(event) = rx.next().await {
        events.push(event);
    }
    events
}

async fn controller(base_url: &str, max_response_chars: Option<usize>) -> ChatController {
    let store = ConversationStore::initialize(Box::new(MemoryStore::new()), StoreOptions::default());
    ChatController::from_parts(
        Arc::new(client(base_url)),
        config(),
        store,
        ControllerOptions {
            max_response_chars,
            suggestions: Vec::new(),
        },
    )
    .await
    .unwrap()
}

fn contents(body: &Value) -> Vec<(String, String)> {
    body["contents"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| {
            (
                c["role"].as_str().unwrap_or_default().to_string(),
                c["parts"][0]["text"].as_str().unwrap_or_default().to_string(),
            )
        })
        .collect()
}

fn turn(role: &str, text: &str) -> (String, String) {
    (role.to_string(), text.to_string())
}

// ========================================================================
// Session streaming
// ========================================================================

#[tokio::test]
async fn test_stream_yields_partials_and_grows_history() {
    let (base_url, mut bodies) = spawn_server(vec![
        Reply::ok(vec![
            Step::Send(sse(text_chunk("Hi"))),
            Step::Send(sse(json!({
                "candidates": [{
                    "content": { "role": "model", "parts": [{ "text": " there" }] },
                    "groundingMetadata": {
                        "groundingChunks": [{ "web": { "uri": "https://a.example", "title": "A" } }]
                    }
                }]
            }))),
        ]),
        Reply::ok(vec![Step::Send(sse(text_chunk("ok")))]),
    ])
    .await;

    let mut session = client(&base_url).create_session(&config(), Vec::new()).await.unwrap();

    let events = collect(session.stream_turn(vec![Part::text("q1")]).await.unwrap()).await;
    let mut text = String::new();
    let mut citations = Vec::new();
    for event in &events {
        if let StreamEvent::Partial(partial) = event {
            text.push_str(partial.text.as_deref().unwrap_or_default());
            citations.extend(partial.citations.clone());
        }
    }
    assert_eq!(text, "Hi there");
    assert_eq!(
        citations,
        vec![CitationRecord::new("https://a.example").with_title("A")]
    );
    assert!(matches!(events.last(), Some(StreamEvent::Done)));

    let first = bodies.recv().await.unwrap();
    assert_eq!(contents(&first), vec![turn("user", "q1")]);

    collect(session.stream_turn(vec![Part::text("q2")]).await.unwrap()).await;
    let second = bodies.recv().await.unwrap();
    assert_eq!(
        contents(&second),
        vec![
            turn("user", "q1"),
            turn("model", "Hi there"),
            turn("user", "q2"),
        ]
    );
}

#[tokio::test]
async fn test_error_object_mid_stream_leaves_history_untouched() {
    let (base_url, mut bodies) = spawn_server(vec![
        Reply::ok(vec![
            Step::Send(sse(text_chunk("Partial"))),
            Step::Send(sse(json!({
                "error": { "code": 429, "message": "quota", "status": "RESOURCE_EXHAUSTED" }
            }))),
        ]),
        Reply::ok(vec![Step::Send(sse(text_chunk("ok")))]),
    ])
    .await;

    let mut session = client(&base_url).create_session(&config(), Vec::new()).await.unwrap();

    let events = collect(session.stream_turn(vec![Part::text("q1")]).await.unwrap()).await;
    assert!(matches!(events.first(), Some(StreamEvent::Partial(_))));
    match events.last() {
        Some(StreamEvent::Error(e)) => assert_eq!(e, "RESOURCE_EXHAUSTED: quota"),
        other => panic!("expected stream error, got {other:?}"),
    }
    assert!(!events.iter().any(|e| matches!(e, StreamEvent::Done)));

    bodies.recv().await.unwrap();
    collect(session.stream_turn(vec![Part::text("q2")]).await.unwrap()).await;
    let second = bodies.recv().await.unwrap();
    assert_eq!(contents(&second), vec![turn("user", "q2")]);
}

#[tokio::test]
async fn test_http_error_status_maps_to_model_error() {
    let body = json!({
        "error": { "code": 400, "message": "API key not valid", "status": "INVALID_ARGUMENT" }
    });
    let (base_url, _bodies) = spawn_server(vec![Reply {
        status: "400 Bad Request",
        steps: vec![Step::Send(body.to_string().into_bytes())],
    }])
    .await;

    let mut session = client(&base_url).create_session(&config(), Vec::new()).await.unwrap();
    let err = session.stream_turn(vec![Part::text("q1")]).await.unwrap_err();
    match err {
        LawgicError::Model(message) => {
            assert!(message.contains("400"), "{message}");
            assert!(message.contains("INVALID_ARGUMENT: API key not valid"), "{message}");
        }
        other => panic!("expected model error, got {other:?}"),
    }
}

// ========================================================================
// Controller over a real stream
// ========================================================================

#[tokio::test]
async fn test_character_split_across_network_chunks_is_preserved() {
    let line = sse(text_chunk("আইন"));
    let split = line.iter().position(|&b| b >= 0x80).unwrap() + 1;
    let (base_url, _bodies) = spawn_server(vec![Reply::ok(vec![
        Step::Send(line[..split].to_vec()),
        Step::Send(line[split..].to_vec()),
    ])])
    .await;

    let controller = controller(&base_url, None).await;
    match controller.send_turn("What is law?", None).await {
        TurnOutcome::Completed(message) => assert_eq!(message.text, "আইন"),
        other => panic!("expected completed turn, got {other:?}"),
    }
    assert_eq!(controller.messages().await.last().unwrap().text, "আইন");
}

#[tokio::test]
async fn test_response_cap_abandons_stream_without_polluting_context() {
    let (release, gate) = oneshot::channel();
    let (base_url, mut bodies) = spawn_server(vec![
        Reply::ok(vec![
            Step::Send(sse(text_chunk("Hello"))),
            Step::Send(sse(text_chunk(" world"))),
            Step::Wait(gate),
            Step::Send(sse(text_chunk(" and more"))),
        ]),
        Reply::ok(vec![Step::Send(sse(text_chunk("Hi")))]),
    ])
    .await;

    let controller = controller(&base_url, Some(6)).await;
    let outcome = controller.send_turn("q1", None).await;
    assert!(matches!(outcome, TurnOutcome::Failed(_)), "{outcome:?}");
    let _ = release.send(());
    bodies.recv().await.unwrap();
    // Let the abandoned reader observe the end of its stream.
    tokio::time::sleep(Duration::from_millis(100)).await;

    let outcome = controller.send_turn("q2", None).await;
    assert!(matches!(outcome, TurnOutcome::Completed(_)), "{outcome:?}");
    let second = bodies.recv().await.unwrap();
    assert_eq!(contents(&second), vec![turn("user", "q2")]);
}
