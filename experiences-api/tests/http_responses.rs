//! Client behaviour against canned HTTP responses from a local listener.

use chrono::Utc;
use experiences_api::{
    ActionRequest, ClaimRequest, Client, ClientConfig, Error, SessionPayload,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Serve one request with the given status line and body.
///
/// Resolves to the raw request text the client sent.
async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let request = read_request(&mut socket).await;

        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
        request
    });

    (base_url, handle)
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);

        let text = String::from_utf8_lossy(&buf);
        if let Some(end) = text.find("\r\n\r\n") {
            let content_length = text[..end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if buf.len() >= end + 4 + content_length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

fn client(base_url: &str) -> Client {
    Client::new(ClientConfig::new("learner-7").with_base_url(base_url))
}

fn action() -> ActionRequest {
    ActionRequest {
        action_type: "pattern_discovery".to_string(),
        action_data: serde_json::json!({ "numbers": [5, 10, 15] }),
        world_id: "rio_cincos".to_string(),
        timestamp: Utc::now(),
    }
}

#[tokio::test]
async fn test_not_found_maps_to_api_error() {
    let (base_url, server) =
        serve_once("404 Not Found", r#"{"success":false,"error":"Session not found"}"#).await;

    let result = client(&base_url).load_session("missing").await;

    assert_eq!(
        result,
        Err(Error::Api {
            status: 404,
            message: "Session not found".to_string()
        })
    );
    let request = server.await.unwrap();
    assert!(request.starts_with("GET /api/experiences/discovery-path/missing "));
}

#[tokio::test]
async fn test_server_error_keeps_raw_body() {
    let (base_url, server) = serve_once("500 Internal Server Error", "database offline").await;

    let result = client(&base_url).post_action("s-1", &action()).await;

    assert_eq!(
        result,
        Err(Error::Api {
            status: 500,
            message: "database offline".to_string()
        })
    );
    server.await.unwrap();
}

#[tokio::test]
async fn test_unsuccessful_envelope_is_rejected() {
    let (base_url, server) = serve_once(
        "200 OK",
        r#"{"success":false,"error":"Reward already claimed"}"#,
    )
    .await;

    let result = client(&base_url)
        .claim_reward(
            "s-1",
            &ClaimRequest {
                reward_id: "first_pattern".to_string(),
                reward_type: "achievement".to_string(),
                claim_time: Utc::now(),
            },
        )
        .await;

    assert_eq!(
        result,
        Err(Error::Rejected("Reward already claimed".to_string()))
    );
    let request = server.await.unwrap();
    assert!(request.starts_with("POST /api/experiences/discovery-path/s-1/claim-reward "));
    assert!(request.contains(r#""reward_type":"achievement""#));
}

#[tokio::test]
async fn test_success_sends_headers_and_body() {
    let (base_url, server) = serve_once(
        "200 OK",
        r#"{"success":true,"data":{"valid":true,"points":5,"rewards":["first_pattern"]}}"#,
    )
    .await;

    let delta = client(&base_url).post_action("s-2", &action()).await.unwrap();

    assert!(delta.valid);
    assert_eq!(delta.points, 5);
    assert_eq!(delta.rewards, vec!["first_pattern".to_string()]);

    let request = server.await.unwrap().to_lowercase();
    assert!(request.starts_with("post /api/experiences/discovery-path/s-2/action "));
    assert!(request.contains("user-id: learner-7"));
    assert!(request.contains("content-type: application/json"));
    assert!(request.contains(r#""action_type":"pattern_discovery""#));
}

#[tokio::test]
async fn test_malformed_body_is_a_parse_error() {
    let (base_url, server) = serve_once("200 OK", "not json").await;

    let result: Result<SessionPayload, Error> = client(&base_url).load_session("s-3").await;

    assert!(matches!(result, Err(Error::Parse(_))));
    server.await.unwrap();
}
