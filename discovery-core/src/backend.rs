//! The seam between a session and the experiences API.

use async_trait::async_trait;
use experiences_api::{
    ActionDelta, ActionRequest, ChallengeRequest, ChallengeResult, ClaimRequest, ClaimResult,
    Client, Error, SessionPayload,
};

/// Anything that can serve a play session's four endpoints.
///
/// Implemented by [`experiences_api::Client`] for real use and by
/// [`MockBackend`](crate::testing::MockBackend) for tests.
#[async_trait]
pub trait ExperienceBackend: Send + Sync {
    async fn load_session(&self, session_id: &str) -> Result<SessionPayload, Error>;

    async fn post_action(
        &self,
        session_id: &str,
        request: &ActionRequest,
    ) -> Result<ActionDelta, Error>;

    async fn complete_challenge(
        &self,
        session_id: &str,
        request: &ChallengeRequest,
    ) -> Result<ChallengeResult, Error>;

    async fn claim_reward(
        &self,
        session_id: &str,
        request: &ClaimRequest,
    ) -> Result<ClaimResult, Error>;
}

#[async_trait]
impl ExperienceBackend for Client {
    async fn load_session(&self, session_id: &str) -> Result<SessionPayload, Error> {
        Client::load_session(self, session_id).await
    }

    async fn post_action(
        &self,
        session_id: &str,
        request: &ActionRequest,
    ) -> Result<ActionDelta, Error> {
        Client::post_action(self, session_id, request).await
    }

    async fn complete_challenge(
        &self,
        session_id: &str,
        request: &ChallengeRequest,
    ) -> Result<ChallengeResult, Error> {
        Client::complete_challenge(self, session_id, request).await
    }

    async fn claim_reward(
        &self,
        session_id: &str,
        request: &ClaimRequest,
    ) -> Result<ClaimResult, Error> {
        Client::claim_reward(self, session_id, request).await
    }
}
