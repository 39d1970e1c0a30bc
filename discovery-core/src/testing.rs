//! Testing utilities for discovery sessions.
//!
//! This module provides tools for integration testing:
//! - `MockBackend` for deterministic testing without HTTP calls
//! - `TestHarness` for scripted session scenarios
//! - Assertion helpers for verifying session state and feedback

use crate::action::Action;
use crate::backend::ExperienceBackend;
use crate::feedback::{FeedbackKind, FeedbackMessage};
use crate::session::{DispatchError, DispatchReport, ExperienceSession, SessionConfig};
use crate::state::{RewardId, SessionState};
use async_trait::async_trait;
use experiences_api::{
    ActionDelta, ActionRequest, ChallengeRequest, ChallengeResult, ClaimRequest, ClaimResult,
    Error, SessionPayload,
};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

/// A scripted backend reply.
#[derive(Debug, Clone)]
pub enum MockReply<T> {
    Ok(T),
    Fail(Error),
}

impl<T> MockReply<T> {
    fn into_result(self) -> Result<T, Error> {
        match self {
            MockReply::Ok(value) => Ok(value),
            MockReply::Fail(error) => Err(error),
        }
    }
}

/// A request the mock received.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    /// `load`, `action`, `complete-challenge` or `claim-reward`.
    pub operation: String,
    pub session_id: String,
    /// The request body as JSON (`null` for loads).
    pub body: serde_json::Value,
}

#[derive(Default)]
struct Script {
    session: Option<MockReply<SessionPayload>>,
    actions: VecDeque<MockReply<ActionDelta>>,
    challenges: VecDeque<MockReply<ChallengeResult>>,
    claims: VecDeque<MockReply<ClaimResult>>,
    calls: Vec<RecordedCall>,
}

/// A backend that returns scripted replies.
///
/// Clones share the same script, so a test can keep a handle after
/// moving the backend into a session. When a script runs out, actions
/// are accepted and the other endpoints return empty results.
#[derive(Clone, Default)]
pub struct MockBackend {
    script: Arc<Mutex<Script>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve this payload when the session is loaded.
    pub fn with_session(self, payload: SessionPayload) -> Self {
        self.script().session = Some(MockReply::Ok(payload));
        self
    }

    /// Fail the session load.
    pub fn fail_session(&self, error: Error) {
        self.script().session = Some(MockReply::Fail(error));
    }

    pub fn push_action(&self, reply: MockReply<ActionDelta>) {
        self.script().actions.push_back(reply);
    }

    pub fn push_challenge(&self, reply: MockReply<ChallengeResult>) {
        self.script().challenges.push_back(reply);
    }

    pub fn push_claim(&self, reply: MockReply<ClaimResult>) {
        self.script().claims.push_back(reply);
    }

    /// Every request received so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.script().calls.clone()
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        // A panicking test must not hide the script from the next assertion.
        self.script.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record<B: Serialize>(&self, operation: &str, session_id: &str, body: Option<&B>) {
        let body = body
            .and_then(|b| serde_json::to_value(b).ok())
            .unwrap_or(serde_json::Value::Null);
        self.script().calls.push(RecordedCall {
            operation: operation.to_string(),
            session_id: session_id.to_string(),
            body,
        });
    }
}

/// An action delta the server accepted.
pub fn accepted() -> ActionDelta {
    ActionDelta {
        valid: true,
        ..ActionDelta::default()
    }
}

/// An action delta the server judged incorrect.
pub fn rejected() -> ActionDelta {
    ActionDelta::default()
}

#[async_trait]
impl ExperienceBackend for MockBackend {
    async fn load_session(&self, session_id: &str) -> Result<SessionPayload, Error> {
        self.record::<()>("load", session_id, None);
        let reply = self.script().session.clone();
        reply
            .unwrap_or(MockReply::Ok(SessionPayload::default()))
            .into_result()
    }

    async fn post_action(
        &self,
        session_id: &str,
        request: &ActionRequest,
    ) -> Result<ActionDelta, Error> {
        self.record("action", session_id, Some(request));
        let reply = self.script().actions.pop_front();
        reply.unwrap_or_else(|| MockReply::Ok(accepted())).into_result()
    }

    async fn complete_challenge(
        &self,
        session_id: &str,
        request: &ChallengeRequest,
    ) -> Result<ChallengeResult, Error> {
        self.record("complete-challenge", session_id, Some(request));
        let reply = self.script().challenges.pop_front();
        reply
            .unwrap_or(MockReply::Ok(ChallengeResult::default()))
            .into_result()
    }

    async fn claim_reward(
        &self,
        session_id: &str,
        request: &ClaimRequest,
    ) -> Result<ClaimResult, Error> {
        self.record("claim-reward", session_id, Some(request));
        let reply = self.script().claims.pop_front();
        reply
            .unwrap_or(MockReply::Ok(ClaimResult::default()))
            .into_result()
    }
}

/// Test harness for running session scenarios.
pub struct TestHarness {
    /// Handle to the backend the session talks to.
    pub backend: MockBackend,
    /// The session under test.
    pub session: ExperienceSession<MockBackend>,
}

impl TestHarness {
    /// Create a harness with a fresh session in the first world.
    ///
    /// Unknown actions are rejected regardless of build profile.
    pub fn new() -> Self {
        Self::with_state(SessionState::new("bosque_decenas"))
    }

    /// Create a harness starting from a custom state.
    pub fn with_state(state: SessionState) -> Self {
        Self::with_config(SessionConfig::new("test-session").with_strict_actions(true), state)
    }

    pub fn with_config(config: SessionConfig, state: SessionState) -> Self {
        let backend = MockBackend::new();
        let session = ExperienceSession::with_state(backend.clone(), config, state);
        Self { backend, session }
    }

    /// Queue the reply for the next action.
    pub fn expect_action(&mut self, delta: ActionDelta) -> &mut Self {
        self.backend.push_action(MockReply::Ok(delta));
        self
    }

    pub fn expect_challenge(&mut self, result: ChallengeResult) -> &mut Self {
        self.backend.push_challenge(MockReply::Ok(result));
        self
    }

    pub fn expect_claim(&mut self, result: ClaimResult) -> &mut Self {
        self.backend.push_claim(MockReply::Ok(result));
        self
    }

    /// Make the next action fail with a network error.
    pub fn fail_next_action(&mut self) -> &mut Self {
        self.backend.push_action(MockReply::Fail(Error::Network(
            "simulated network failure".to_string(),
        )));
        self
    }

    pub async fn dispatch(&mut self, action: Action) -> Result<DispatchReport, DispatchError> {
        self.session.dispatch(action).await
    }

    pub fn state(&self) -> &SessionState {
        self.session.state()
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.backend.calls()
    }

    /// Messages waiting to be shown, oldest first.
    pub fn pending_feedback(&self) -> Vec<FeedbackMessage> {
        self.session.feedback().pending().cloned().collect()
    }

    pub fn has_reward(&self, id: &str) -> bool {
        self.state().has_reward(&RewardId::from(id))
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Assertion Helpers
// ============================================================================

/// Assert the queued feedback has exactly these kinds, in order.
#[track_caller]
pub fn assert_feedback_kinds(harness: &TestHarness, expected: &[FeedbackKind]) {
    let actual: Vec<FeedbackKind> = harness.pending_feedback().iter().map(|m| m.kind).collect();
    assert_eq!(actual, expected, "Unexpected feedback queue");
}

/// Assert the learner holds a reward with the given claim status.
#[track_caller]
pub fn assert_reward(harness: &TestHarness, id: &str, claimed: bool) {
    let reward = harness.state().reward(&RewardId::from(id));
    match reward {
        Some(reward) => assert_eq!(
            reward.claimed, claimed,
            "Expected reward '{id}' claimed={claimed}, got claimed={}",
            reward.claimed
        ),
        None => panic!("Expected reward '{id}' to exist"),
    }
}

/// Assert the session score.
#[track_caller]
pub fn assert_score(harness: &TestHarness, score: u64) {
    assert_eq!(
        harness.state().score,
        score,
        "Expected score {score}, got {}",
        harness.state().score
    );
}
