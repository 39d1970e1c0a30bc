//! Minimal client for the gamified experiences session API.
//!
//! This crate talks to the four endpoints a play session needs:
//! - `GET  /api/experiences/<experience>/<sessionId>` - initial session state
//! - `POST /api/experiences/<experience>/<sessionId>/action` - report an action
//! - `POST /api/experiences/<experience>/<sessionId>/complete-challenge`
//! - `POST /api/experiences/<experience>/<sessionId>/claim-reward`
//!
//! Every request carries a `user-id` header and a JSON body; every response is
//! wrapped in a `{success, data}` envelope.

use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

const DEFAULT_BASE_URL: &str = "http://localhost:5000";
const DEFAULT_EXPERIENCE: &str = "discovery-path";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
const USER_ID_HEADER: &str = "user-id";

/// Errors that can occur when talking to the experiences API.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum Error {
    #[error("User id not configured - set EXPERIENCES_USER_ID")]
    NoUserId,

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Request rejected by server: {0}")]
    Rejected(String),

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

// ============================================================================
// Configuration
// ============================================================================

/// Connection settings for [`Client`].
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Origin of the backend, without the `/api` prefix.
    pub base_url: String,
    /// Value sent in the `user-id` header.
    pub user_id: String,
    /// Experience slug used in the URL path (e.g. `discovery-path`).
    pub experience: String,
    /// Whole-request timeout.
    pub timeout: Duration,
    /// Connection establishment timeout.
    pub connect_timeout: Duration,
}

impl ClientConfig {
    /// Create a config for the given user against the default local backend.
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_id: user_id.into(),
            experience: DEFAULT_EXPERIENCE.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }

    /// Read the config from `EXPERIENCES_*` environment variables.
    ///
    /// `EXPERIENCES_USER_ID` is required; `EXPERIENCES_API_URL`,
    /// `EXPERIENCES_SLUG` and `EXPERIENCES_TIMEOUT_SECS` are optional.
    pub fn from_env() -> Result<Self, Error> {
        let user_id = std::env::var("EXPERIENCES_USER_ID").map_err(|_| Error::NoUserId)?;
        let mut config = Self::new(user_id);

        if let Ok(url) = std::env::var("EXPERIENCES_API_URL") {
            config = config.with_base_url(url);
        }
        if let Ok(slug) = std::env::var("EXPERIENCES_SLUG") {
            config = config.with_experience(slug);
        }
        if let Ok(secs) = std::env::var("EXPERIENCES_TIMEOUT_SECS") {
            let secs: u64 = secs
                .parse()
                .map_err(|_| Error::Config(format!("Invalid EXPERIENCES_TIMEOUT_SECS: {secs}")))?;
            config = config.with_timeout(Duration::from_secs(secs));
        }

        Ok(config)
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_experience(mut self, experience: impl Into<String>) -> Self {
        self.experience = experience.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

// ============================================================================
// Client
// ============================================================================

/// Experiences API client.
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    config: ClientConfig,
}

impl Client {
    /// Create a new client with the given configuration.
    pub fn new(config: ClientConfig) -> Self {
        Self::try_new(config).expect("Failed to build HTTP client")
    }

    /// Create a new client, reporting HTTP backend setup failures.
    pub fn try_new(config: ClientConfig) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { http, config })
    }

    /// Create a client from the `EXPERIENCES_*` environment variables.
    pub fn from_env() -> Result<Self, Error> {
        Self::try_new(ClientConfig::from_env()?)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// URL of a session resource, optionally with a trailing operation.
    pub fn session_url(&self, session_id: &str, operation: Option<&str>) -> String {
        let base = format!(
            "{}/api/experiences/{}/{}",
            self.config.base_url, self.config.experience, session_id
        );
        match operation {
            Some(op) => format!("{base}/{op}"),
            None => base,
        }
    }

    /// Load the initial state of a session.
    pub async fn load_session(&self, session_id: &str) -> Result<SessionPayload, Error> {
        let url = self.session_url(session_id, None);
        tracing::debug!(%url, "loading session");

        let response = self
            .http
            .get(&url)
            .headers(self.build_headers()?)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        read_envelope(response).await
    }

    /// Report a learner action and receive the resulting delta.
    pub async fn post_action(
        &self,
        session_id: &str,
        request: &ActionRequest,
    ) -> Result<ActionDelta, Error> {
        self.post(session_id, "action", request).await
    }

    /// Mark a challenge as completed.
    pub async fn complete_challenge(
        &self,
        session_id: &str,
        request: &ChallengeRequest,
    ) -> Result<ChallengeResult, Error> {
        self.post(session_id, "complete-challenge", request).await
    }

    /// Claim an earned reward.
    pub async fn claim_reward(
        &self,
        session_id: &str,
        request: &ClaimRequest,
    ) -> Result<ClaimResult, Error> {
        self.post(session_id, "claim-reward", request).await
    }

    async fn post<B, T>(&self, session_id: &str, operation: &str, body: &B) -> Result<T, Error>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.session_url(session_id, Some(operation));
        tracing::debug!(%url, "posting to experiences api");

        let response = self
            .http
            .post(&url)
            .headers(self.build_headers()?)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        read_envelope(response).await
    }

    fn build_headers(&self) -> Result<HeaderMap, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            USER_ID_HEADER,
            HeaderValue::from_str(&self.config.user_id)
                .map_err(|e| Error::Config(format!("Invalid user id: {e}")))?,
        );
        Ok(headers)
    }
}

async fn read_envelope<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, Error> {
    if !response.status().is_success() {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        return Err(Error::Api {
            status,
            message: error_message(&body),
        });
    }

    let envelope: Envelope<T> = response
        .json()
        .await
        .map_err(|e| Error::Parse(e.to_string()))?;

    envelope.into_result()
}

/// Pull the `error` field out of a JSON error body, falling back to the raw text.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

// ============================================================================
// Request bodies
// ============================================================================

/// Body of `POST …/action`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRequest {
    pub action_type: String,
    pub action_data: serde_json::Value,
    pub world_id: String,
    pub timestamp: DateTime<Utc>,
}

/// Body of `POST …/complete-challenge`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChallengeRequest {
    pub challenge_id: String,
    pub performance_metrics: serde_json::Value,
    pub world_id: String,
    pub completion_time: DateTime<Utc>,
}

/// Body of `POST …/claim-reward`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimRequest {
    pub reward_id: String,
    pub reward_type: String,
    pub claim_time: DateTime<Utc>,
}

// ============================================================================
// Response payloads
// ============================================================================

/// The `{success, data}` wrapper around every response.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(default)]
    pub error: Option<String>,
}

impl<T> Envelope<T> {
    /// Unwrap the payload, turning `success: false` into [`Error::Rejected`].
    pub fn into_result(self) -> Result<T, Error> {
        if !self.success {
            return Err(Error::Rejected(
                self.error.unwrap_or_else(|| "unspecified error".to_string()),
            ));
        }
        self.data
            .ok_or_else(|| Error::Parse("response envelope has no data".to_string()))
    }
}

/// Initial session state returned by `GET …/<sessionId>`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SessionPayload {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub current_world: Option<String>,
    #[serde(default)]
    pub unlocked_worlds: Vec<String>,
    #[serde(default)]
    pub completed_challenges: Vec<String>,
    #[serde(default)]
    pub unlocked_tools: Vec<String>,
    #[serde(default)]
    pub rewards: Option<RewardsPayload>,
    #[serde(default)]
    pub score: Option<u64>,
    #[serde(default)]
    pub status: Option<String>,
}

impl SessionPayload {
    /// The reward records regardless of how the server wrapped them.
    pub fn reward_records(&self) -> &[RewardRecord] {
        match &self.rewards {
            Some(RewardsPayload::List(list)) => list,
            Some(RewardsPayload::Wrapped { user_rewards }) => user_rewards,
            None => &[],
        }
    }
}

/// Rewards arrive either as a bare list or as `{user_rewards: [...]}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RewardsPayload {
    List(Vec<RewardRecord>),
    Wrapped {
        #[serde(default)]
        user_rewards: Vec<RewardRecord>,
    },
}

/// A reward as the server stores it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardRecord {
    pub id: String,
    #[serde(default, alias = "name")]
    pub title: Option<String>,
    #[serde(default)]
    pub points: Option<u32>,
    #[serde(default)]
    pub claimed: bool,
    #[serde(default)]
    pub claimed_at: Option<String>,
}

impl RewardRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: None,
            points: None,
            claimed: false,
            claimed_at: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_points(mut self, points: u32) -> Self {
        self.points = Some(points);
        self
    }

    /// A record counts as claimed if flagged or if it carries a claim time.
    pub fn is_claimed(&self) -> bool {
        self.claimed || self.claimed_at.is_some()
    }
}

/// Delta returned by `POST …/action`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionDelta {
    #[serde(default)]
    pub valid: bool,
    #[serde(default)]
    pub feedback: Option<String>,
    #[serde(default)]
    pub progress_update: Option<serde_json::Value>,
    /// Ids of rewards earned by the action.
    #[serde(default)]
    pub rewards: Vec<String>,
    #[serde(default)]
    pub points: u32,
}

/// Result of `POST …/complete-challenge`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChallengeResult {
    #[serde(default)]
    pub points: Option<u32>,
    #[serde(default)]
    pub reward: Option<RewardRecord>,
    /// Ids of further rewards granted with the completion.
    #[serde(default)]
    pub rewards: Vec<String>,
    #[serde(
        default,
        rename = "unlocksWorld",
        alias = "unlocks_world",
        alias = "next_world"
    )]
    pub unlocks_world: Option<String>,
}

/// Result of `POST …/claim-reward`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClaimResult {
    #[serde(default, rename = "rewardName", alias = "reward_name")]
    pub reward_name: Option<String>,
    #[serde(default)]
    pub points: Option<u32>,
}
