use futures::StreamExt;
use strand_llm::{
    HttpReplyClient, ReplyClient, ReplyError, ReplyRequest, StreamEvent, StreamStart,
};
use strand_types::Citation;

fn request() -> ReplyRequest {
    ReplyRequest::new("gpt-4o-mini", 1000).with_system("Be helpful.")
}

#[tokio::test]
async fn test_chat_success() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/chat")
        .match_body(mockito::Matcher::PartialJsonString(
            r#"{"model":"gpt-4o-mini","max_tokens":1000}"#.to_string(),
        ))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"reply":"Hello!","citations":[{"title":"Docs","url":"https://docs"}]}"#)
        .create_async()
        .await;

    let client = HttpReplyClient::new(server.url()).unwrap();
    let reply = client.chat(&request()).await.unwrap();

    mock.assert_async().await;
    assert_eq!(reply.reply, "Hello!");
    assert_eq!(reply.citations, vec![Citation::new("Docs", "https://docs")]);
}

#[tokio::test]
async fn test_chat_json_error_message() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/chat")
        .with_status(401)
        .with_header("content-type", "application/json")
        .with_body(r#"{"error":"No API key configured"}"#)
        .create_async()
        .await;

    let client = HttpReplyClient::new(server.url()).unwrap();
    let err = client.chat(&request()).await.unwrap_err();

    match err {
        ReplyError::Http { status, message } => {
            assert_eq!(status, 401);
            assert_eq!(message, "No API key configured");
        }
        other => panic!("expected HTTP error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_chat_html_error_truncated() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/chat")
        .with_status(502)
        .with_header("content-type", "text/html")
        .with_body("<html>Bad Gateway</html>")
        .create_async()
        .await;

    let client = HttpReplyClient::new(server.url()).unwrap();
    let err = client.chat(&request()).await.unwrap_err();
    assert_eq!(err.to_string(), "HTTP 502: <html>Bad Gateway</html>");
}

#[tokio::test]
async fn test_chat_non_json_success_is_unexpected() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/chat")
        .with_status(200)
        .with_header("content-type", "text/plain")
        .with_body("hello")
        .create_async()
        .await;

    let client = HttpReplyClient::new(server.url()).unwrap();
    let err = client.chat(&request()).await.unwrap_err();
    assert!(matches!(err, ReplyError::UnexpectedContent));
}

#[tokio::test]
async fn test_stream_ndjson_events() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/chat/stream")
        .with_status(200)
        .with_header("content-type", "application/x-ndjson")
        .with_body(concat!(
            "{\"type\":\"meta\",\"note\":\"started\"}\n",
            "{\"type\":\"delta\",\"delta\":\"Hel\"}\n",
            "garbage line\n",
            "{\"type\":\"delta\",\"delta\":\"lo\"}\n",
            "{\"type\":\"done\"}\n",
        ))
        .create_async()
        .await;

    let client = HttpReplyClient::new(server.url()).unwrap();
    let events = match client.chat_stream(&request()).await.unwrap() {
        StreamStart::Events(events) => events,
        other => panic!("expected event stream, got {:?}", other),
    };
    let events: Vec<StreamEvent> = events.map(|e| e.unwrap()).collect().await;

    assert_eq!(events.len(), 4);
    assert_eq!(events[1], StreamEvent::delta("Hel"));
    assert_eq!(events[2], StreamEvent::delta("lo"));
    assert_eq!(events[3], StreamEvent::done());
}

#[tokio::test]
async fn test_stream_json_body_means_no_stream() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/chat/stream")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"reply":"sync only"}"#)
        .create_async()
        .await;

    let client = HttpReplyClient::new(server.url()).unwrap();
    match client.chat_stream(&request()).await.unwrap() {
        StreamStart::NoStream { content_type } => assert!(content_type.contains("json")),
        other => panic!("expected no stream, got {:?}", other),
    }
}

#[tokio::test]
async fn test_key_status() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/key-status")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"hasKey":true}"#)
        .create_async()
        .await;

    let client = HttpReplyClient::new(format!("{}/", server.url())).unwrap();
    assert!(client.key_status().await.unwrap());
}
