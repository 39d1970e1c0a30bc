//! ExperienceSession - the primary public API for a discovery play session.
//!
//! This module ties together the backend, the session store and the
//! feedback renderer. Every learner action goes through [`ExperienceSession`]:
//! it is reported to the backend, the response is folded into the state as a
//! single patch, and exactly one feedback message is queued.

use crate::action::{analyze_pattern, Action};
use crate::backend::ExperienceBackend;
use crate::catalog;
use crate::feedback::{feedback_for, FeedbackKind, FeedbackMessage, FeedbackRenderer};
use crate::state::{
    metadata_keys, ChallengeId, Hypothesis, Reward, RewardId, SessionState, StateError,
    StatePatch, ToolId, WorldId,
};
use crate::store::{SessionStats, SessionStore, DEFAULT_RECENT_HYPOTHESES, DEFAULT_TOTAL_CHALLENGES};
use chrono::Utc;
use experiences_api::{ActionDelta, ActionRequest, ChallengeRequest, ClaimRequest};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

/// Points for a completed challenge when the server does not say.
pub const DEFAULT_CHALLENGE_POINTS: u32 = 25;

/// Pattern name recorded for a discovery that formed no pattern.
const NO_PATTERN: &str = "sin patrón";

/// Errors from ExperienceSession operations.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Backend error: {0}")]
    Backend(#[from] experiences_api::Error),

    #[error("State error: {0}")]
    State(#[from] StateError),

    #[error("Unknown action type: {0}")]
    UnknownAction(String),

    #[error("Reward already claimed: {0}")]
    AlreadyClaimed(RewardId),
}

/// Configuration for an experience session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Session id used in every request path.
    pub session_id: String,

    /// Reject unknown action types locally instead of forwarding them.
    pub strict_actions: bool,

    /// Challenges in a full run, for the progress percentage.
    pub total_challenges: usize,

    /// World a new or reset session starts in.
    pub starting_world: WorldId,

    /// How many hypotheses the stats list as recent.
    pub recent_hypotheses: usize,
}

impl SessionConfig {
    /// Create a config for the given session.
    ///
    /// Unknown actions are rejected in debug builds and forwarded in
    /// release builds.
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            strict_actions: cfg!(debug_assertions),
            total_challenges: DEFAULT_TOTAL_CHALLENGES,
            starting_world: WorldId::from("bosque_decenas"),
            recent_hypotheses: DEFAULT_RECENT_HYPOTHESES,
        }
    }

    pub fn with_strict_actions(mut self, strict: bool) -> Self {
        self.strict_actions = strict;
        self
    }

    pub fn with_total_challenges(mut self, total: usize) -> Self {
        self.total_challenges = total;
        self
    }

    pub fn with_starting_world(mut self, world: impl Into<WorldId>) -> Self {
        self.starting_world = world.into();
        self
    }

    pub fn with_recent_hypotheses(mut self, count: usize) -> Self {
        self.recent_hypotheses = count;
        self
    }
}

/// Result of a dispatched action.
#[derive(Debug, Clone)]
pub struct DispatchReport {
    /// Whether the action was judged correct.
    pub valid: bool,

    /// The message queued for the learner.
    pub feedback: FeedbackMessage,

    /// Achievement earned by this action, if it is new.
    pub achievement: Option<Reward>,

    /// Rewards the server granted for the action.
    pub rewards: Vec<RewardId>,

    /// State after the action was applied.
    pub state: Arc<SessionState>,
}

/// Result of completing a challenge.
#[derive(Debug, Clone)]
pub struct ChallengeOutcome {
    pub challenge_id: ChallengeId,
    pub points: u32,
    pub rewards: Vec<Reward>,
    pub unlocked_world: Option<WorldId>,
    pub state: Arc<SessionState>,
}

/// Result of claiming a reward.
#[derive(Debug, Clone)]
pub struct ClaimOutcome {
    pub reward_id: RewardId,
    pub title: String,
    pub points: u32,
    pub state: Arc<SessionState>,
}

/// A learner's play session against an experiences backend.
pub struct ExperienceSession<B> {
    backend: B,
    config: SessionConfig,
    store: SessionStore,
    feedback: FeedbackRenderer,
}

impl<B: ExperienceBackend> ExperienceSession<B> {
    /// Load a session from the backend.
    pub async fn load(backend: B, config: SessionConfig) -> Result<Self, DispatchError> {
        let payload = backend.load_session(&config.session_id).await?;
        let state = SessionState::from_payload(&payload, &config.starting_world);

        tracing::info!(
            session = %config.session_id,
            world = %state.current_world,
            challenges = state.completed_challenges.len(),
            rewards = state.rewards.len(),
            "session loaded"
        );

        Ok(Self::with_state(backend, config, state))
    }

    /// Start from a known state without contacting the backend.
    pub fn with_state(backend: B, config: SessionConfig, state: SessionState) -> Self {
        let store = SessionStore::new(state)
            .with_total_challenges(config.total_challenges)
            .with_recent_hypotheses(config.recent_hypotheses);
        Self {
            backend,
            config,
            store,
            feedback: FeedbackRenderer::new(),
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn state(&self) -> &SessionState {
        self.store.state()
    }

    pub fn snapshot(&self) -> Arc<SessionState> {
        self.store.snapshot()
    }

    pub fn stats(&self) -> SessionStats {
        self.store.stats()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn feedback(&self) -> &FeedbackRenderer {
        &self.feedback
    }

    pub fn feedback_mut(&mut self) -> &mut FeedbackRenderer {
        &mut self.feedback
    }

    // ========================================================================
    // Backend operations
    // ========================================================================

    /// Report an action and fold the server's response into the state.
    ///
    /// On any failure the state is left as it was and one error message
    /// is queued.
    pub async fn dispatch(&mut self, action: Action) -> Result<DispatchReport, DispatchError> {
        if !action.is_known() {
            if self.config.strict_actions {
                return Err(
                    self.fail(DispatchError::UnknownAction(action.action_type().to_string()))
                );
            }
            tracing::warn!(action = action.action_type(), "forwarding unknown action type");
        }

        let request = ActionRequest {
            action_type: action.action_type().to_string(),
            action_data: action.action_data(),
            world_id: self.state().current_world.to_string(),
            timestamp: Utc::now(),
        };

        let result = self
            .backend
            .post_action(&self.config.session_id, &request)
            .await;
        let delta = match result {
            Ok(delta) => delta,
            Err(e) => return Err(self.fail(e.into())),
        };

        let valid = delta.valid && action.locally_valid() && !self.is_repeat_unlock(&action);
        let feedback = feedback_for(&action, valid);
        let achievement = feedback
            .achievement
            .filter(|a| !self.state().has_reward(&a.id));

        let patch = match self.action_patch(&action, &delta, valid, achievement.as_ref()) {
            Ok(patch) => patch,
            Err(e) => return Err(self.fail(e.into())),
        };
        let state = match self.store.apply(&patch) {
            Ok(state) => state,
            Err(e) => return Err(self.fail(e.into())),
        };

        let mut message = feedback.message;
        if message.kind == FeedbackKind::Info {
            if let Some(text) = delta.feedback.as_deref().filter(|t| !t.trim().is_empty()) {
                message = message.with_message(text);
            }
        }
        self.feedback.enqueue(message.clone());

        tracing::info!(action = action.action_type(), valid, "action dispatched");

        Ok(DispatchReport {
            valid,
            feedback: message,
            achievement,
            rewards: delta.rewards.iter().map(|id| RewardId::from(id.as_str())).collect(),
            state,
        })
    }

    /// Mark a challenge completed.
    pub async fn complete_challenge(
        &mut self,
        challenge_id: impl Into<ChallengeId>,
        name: &str,
        performance_metrics: serde_json::Value,
    ) -> Result<ChallengeOutcome, DispatchError> {
        let challenge_id = challenge_id.into();
        let request = ChallengeRequest {
            challenge_id: challenge_id.to_string(),
            performance_metrics,
            world_id: self.state().current_world.to_string(),
            completion_time: Utc::now(),
        };

        let response = self
            .backend
            .complete_challenge(&self.config.session_id, &request)
            .await;
        let result = match response {
            Ok(result) => result,
            Err(e) => return Err(self.fail(e.into())),
        };

        let points = result.points.unwrap_or(DEFAULT_CHALLENGE_POINTS);
        let mut patch = StatePatch::new().complete_challenge(challenge_id.clone());
        if !self.state().has_completed(&challenge_id) {
            patch = patch.add_score(u64::from(points));
        }

        let rewards: Vec<Reward> = result
            .reward
            .iter()
            .map(Reward::from_record)
            .chain(result.rewards.iter().map(|id| catalog::resolve_reward(id)))
            .collect();
        for reward in &rewards {
            patch = patch.reward(reward.clone());
        }

        let unlocked_world = result
            .unlocks_world
            .as_deref()
            .filter(|w| !w.trim().is_empty())
            .map(WorldId::from);
        if let Some(world) = &unlocked_world {
            patch = patch.enter_world(world.clone());
        }

        let state = match self.store.apply(&patch) {
            Ok(state) => state,
            Err(e) => return Err(self.fail(e.into())),
        };
        self.feedback
            .enqueue(FeedbackMessage::challenge_completed(name));

        Ok(ChallengeOutcome {
            challenge_id,
            points,
            rewards,
            unlocked_world,
            state,
        })
    }

    /// Claim a reward the learner holds.
    ///
    /// Unknown and already-claimed rewards are refused without contacting
    /// the backend.
    pub async fn claim_reward(
        &mut self,
        reward_id: impl Into<RewardId>,
    ) -> Result<ClaimOutcome, DispatchError> {
        let reward_id = reward_id.into();
        let reward = match self.state().reward(&reward_id).cloned() {
            None => {
                return Err(self.fail(StateError::UnknownReward(reward_id).into()));
            }
            Some(reward) if reward.claimed => {
                tracing::warn!(reward = %reward_id, "reward already claimed");
                self.feedback.enqueue(FeedbackMessage::warning(
                    "Ya Reclamada",
                    format!("Ya reclamaste {}", reward.title),
                ));
                return Err(DispatchError::AlreadyClaimed(reward_id));
            }
            Some(reward) => reward,
        };

        let reward_type = catalog::category_of(reward_id.as_str())
            .map(|c| c.name())
            .unwrap_or("achievement");
        let request = ClaimRequest {
            reward_id: reward_id.to_string(),
            reward_type: reward_type.to_string(),
            claim_time: Utc::now(),
        };

        let response = self
            .backend
            .claim_reward(&self.config.session_id, &request)
            .await;
        let result = match response {
            Ok(result) => result,
            Err(e) => return Err(self.fail(e.into())),
        };

        let points = result.points.unwrap_or(reward.points);
        let title = result.reward_name.unwrap_or(reward.title.clone());

        // Claiming adds the reward's listed points; top up if the server granted more.
        let patch = StatePatch::new()
            .claim(reward_id.clone())
            .add_score(u64::from(points.saturating_sub(reward.points)));
        let state = match self.store.apply(&patch) {
            Ok(state) => state,
            Err(e) => return Err(self.fail(e.into())),
        };
        self.feedback
            .enqueue(FeedbackMessage::reward_claimed(&title, points));

        Ok(ClaimOutcome {
            reward_id,
            title,
            points,
            state,
        })
    }

    // ========================================================================
    // Local updates
    // ========================================================================

    pub fn update_progress(&mut self, patch: StatePatch) -> Result<Arc<SessionState>, StateError> {
        let result = self.store.update_progress(patch);
        self.local(result)
    }

    pub fn add_reward(&mut self, reward: Reward) -> Result<Arc<SessionState>, StateError> {
        let result = self.store.add_reward(reward);
        self.local(result)
    }

    pub fn record_hypothesis(
        &mut self,
        hypothesis: Hypothesis,
    ) -> Result<Arc<SessionState>, StateError> {
        let result = self.store.record_hypothesis(hypothesis);
        self.local(result)
    }

    pub fn update_metadata(
        &mut self,
        values: BTreeMap<String, f64>,
    ) -> Result<Arc<SessionState>, StateError> {
        let result = self.store.update_metadata(values);
        self.local(result)
    }

    pub fn unlock_tool(&mut self, tool: impl Into<ToolId>) -> Result<Arc<SessionState>, StateError> {
        let result = self.store.unlock_tool(tool);
        self.local(result)
    }

    pub fn update_world(
        &mut self,
        world: impl Into<WorldId>,
    ) -> Result<Arc<SessionState>, StateError> {
        let result = self.store.update_world(world);
        self.local(result)
    }

    pub fn select_world(
        &mut self,
        world: impl Into<WorldId>,
    ) -> Result<Arc<SessionState>, StateError> {
        let result = self.store.select_world(world);
        self.local(result)
    }

    /// Drop all progress and return to the starting world.
    pub fn reset(&mut self) -> Arc<SessionState> {
        self.store.reset()
    }

    // ========================================================================
    // Internals
    // ========================================================================

    /// A tool the learner already has is not a new unlock.
    fn is_repeat_unlock(&self, action: &Action) -> bool {
        match action {
            Action::ToolUse { tool_id } => self.state().is_tool_unlocked(tool_id),
            _ => false,
        }
    }

    /// Build the single patch for an action and the server's delta.
    fn action_patch(
        &self,
        action: &Action,
        delta: &ActionDelta,
        valid: bool,
        achievement: Option<&Reward>,
    ) -> Result<StatePatch, StateError> {
        let mut patch = StatePatch::new().increment(metadata_keys::TOTAL_ACTIONS, 1.0);

        match action {
            Action::PatternDiscovery { numbers } => {
                let hypothesis = match analyze_pattern(numbers) {
                    Ok(pattern) => Hypothesis::new(pattern.name, pattern.numbers, valid),
                    Err(e) => Hypothesis::new(NO_PATTERN, numbers.clone(), false)
                        .with_description(e.to_string()),
                };
                patch = patch.hypothesis(hypothesis);
            }
            Action::HypothesisTest { pattern, numbers } => {
                patch = patch.hypothesis(Hypothesis::new(pattern.clone(), numbers.clone(), valid));
            }
            Action::ToolUse { tool_id } if valid => {
                patch = patch
                    .unlock_tool(tool_id.clone())
                    .increment(metadata_keys::TOOLS_USED, 1.0);
            }
            Action::FamilyActivity { .. } => {
                patch = patch.increment(metadata_keys::FAMILY_ACTIVITIES, 1.0);
            }
            _ => {}
        }

        if valid
            && matches!(
                action,
                Action::PatternDiscovery { .. } | Action::HypothesisTest { .. }
            )
        {
            patch = patch.increment(metadata_keys::PATTERNS_DISCOVERED, 1.0);
        }

        if let Some(progress) = &delta.progress_update {
            patch = patch.merge(StatePatch::from_progress_json(progress)?);
        }

        for id in &delta.rewards {
            patch = patch.reward(catalog::resolve_reward(id));
        }
        patch = patch.add_score(u64::from(delta.points));

        if let Some(achievement) = achievement {
            patch = patch
                .reward(achievement.clone())
                .increment(metadata_keys::ACHIEVEMENTS_EARNED, 1.0);
        }

        Ok(patch)
    }

    /// Report a failed operation to the learner and hand the error back.
    fn fail(&mut self, error: DispatchError) -> DispatchError {
        tracing::warn!(error = %error, "session operation failed");
        self.feedback.enqueue(FeedbackMessage::error(error.to_string()));
        error
    }

    fn local(
        &mut self,
        result: Result<Arc<SessionState>, StateError>,
    ) -> Result<Arc<SessionState>, StateError> {
        if let Err(e) = &result {
            self.feedback.enqueue(FeedbackMessage::error(e.to_string()));
        }
        result
    }
}
