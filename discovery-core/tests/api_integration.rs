//! Integration tests that call a live experiences backend.
//!
//! These tests require EXPERIENCES_USER_ID to be set (via .env file or environment),
//! and optionally EXPERIENCES_API_URL and EXPERIENCES_SESSION_ID.
//! Run with: `cargo test -p discovery-core --test api_integration -- --ignored`

use discovery_core::{Action, ExperienceSession, SessionConfig};
use experiences_api::Client;

/// Load environment variables from .env file
fn setup() {
    let _ = dotenvy::dotenv();
}

/// Check if a user id is available
fn has_user_id() -> bool {
    std::env::var("EXPERIENCES_USER_ID").is_ok()
}

fn session_id() -> String {
    std::env::var("EXPERIENCES_SESSION_ID").unwrap_or_else(|_| "integration-test".to_string())
}

#[tokio::test]
#[ignore] // Run with: cargo test -p discovery-core --test api_integration -- --ignored
async fn test_load_and_discover_pattern() {
    setup();
    if !has_user_id() {
        eprintln!("Skipping test: EXPERIENCES_USER_ID not set");
        return;
    }

    let client = Client::from_env().expect("Failed to create client");
    let mut session = ExperienceSession::load(client, SessionConfig::new(session_id()))
        .await
        .expect("Session should load");

    println!("Loaded state: {:?}", session.state());
    let actions_before = session.state().hypotheses.len();

    let report = session
        .dispatch(Action::PatternDiscovery {
            numbers: vec![5, 10, 15, 20],
        })
        .await
        .expect("Action should be accepted");

    println!("Feedback: {} - {}", report.feedback.title, report.feedback.message);
    assert_eq!(session.state().hypotheses.len(), actions_before + 1);
}
