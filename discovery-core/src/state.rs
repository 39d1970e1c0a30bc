//! Session state and the patches that update it.
//!
//! `SessionState` is a monotonic accumulator: worlds, tools, challenges and
//! rewards are only ever added, rewards only go from unclaimed to claimed,
//! and the score never decreases. Every change goes through a [`StatePatch`]
//! merged by [`SessionState::merged`], which either produces a complete new
//! state or rejects the patch and leaves the current state untouched.

use crate::catalog;
use crate::worlds;
use chrono::{DateTime, Utc};
use experiences_api::{RewardRecord, SessionPayload};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Blank ids are never valid in a patch.
            pub fn is_blank(&self) -> bool {
                self.0.trim().is_empty()
            }

            const KIND: &'static str = $kind;
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(
    /// Identifier of a world (e.g. `bosque_decenas`).
    WorldId,
    "world"
);
string_id!(
    /// Identifier of an unlockable tool.
    ToolId,
    "tool"
);
string_id!(
    /// Identifier of a challenge inside a world.
    ChallengeId,
    "challenge"
);
string_id!(
    /// Identifier of a reward or achievement.
    RewardId,
    "reward"
);

/// Well-known counters kept in [`SessionState::metadata`].
pub mod metadata_keys {
    pub const TOTAL_ACTIONS: &str = "totalActions";
    pub const PATTERNS_DISCOVERED: &str = "patternsDiscovered";
    pub const TOOLS_USED: &str = "toolsUsed";
    pub const FAMILY_ACTIVITIES: &str = "familyActivities";
    pub const ACHIEVEMENTS_EARNED: &str = "achievementsEarned";

    pub const ALL: [&str; 5] = [
        TOTAL_ACTIONS,
        PATTERNS_DISCOVERED,
        TOOLS_USED,
        FAMILY_ACTIVITIES,
        ACHIEVEMENTS_EARNED,
    ];
}

/// Errors from merging a patch into the session state.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StateError {
    #[error("Empty {0} id")]
    EmptyId(&'static str),

    #[error("World {0} is locked")]
    WorldLocked(WorldId),

    #[error("Score cannot decrease from {current} to {proposed}")]
    ScoreRegression { current: u64, proposed: u64 },

    #[error("Unknown reward: {0}")]
    UnknownReward(RewardId),

    #[error("Metadata value for {0} is not finite")]
    NonFiniteMetadata(String),

    #[error("Malformed patch: {0}")]
    Malformed(String),
}

/// A learner-proposed numeric pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hypothesis {
    pub id: String,
    pub pattern: String,
    pub description: String,
    pub numbers: Vec<i64>,
    pub is_valid: bool,
    pub recorded_at: DateTime<Utc>,
}

impl Hypothesis {
    /// Create a hypothesis recorded now with a fresh id.
    pub fn new(pattern: impl Into<String>, numbers: Vec<i64>, is_valid: bool) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            pattern: pattern.into(),
            description: String::new(),
            numbers,
            is_valid,
            recorded_at: Utc::now(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_recorded_at(mut self, at: DateTime<Utc>) -> Self {
        self.recorded_at = at;
        self
    }
}

/// A reward held by the learner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reward {
    pub id: RewardId,
    pub title: String,
    pub points: u32,
    pub claimed: bool,
}

impl Reward {
    /// Create an unclaimed reward.
    pub fn new(id: impl Into<RewardId>, title: impl Into<String>, points: u32) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            points,
            claimed: false,
        }
    }

    /// Build a reward from a server record, filling gaps from the catalog.
    pub fn from_record(record: &RewardRecord) -> Self {
        let resolved = catalog::resolve_reward(&record.id);
        Self {
            id: RewardId::new(record.id.clone()),
            title: record.title.clone().unwrap_or(resolved.title),
            points: record.points.unwrap_or(resolved.points),
            claimed: record.is_claimed(),
        }
    }
}

/// The mutable state of one learner's play session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub current_world: WorldId,
    pub unlocked_worlds: Vec<WorldId>,
    pub unlocked_tools: Vec<ToolId>,
    pub completed_challenges: Vec<ChallengeId>,
    pub hypotheses: Vec<Hypothesis>,
    pub rewards: Vec<Reward>,
    pub score: u64,
    pub metadata: BTreeMap<String, f64>,
}

impl SessionState {
    /// A fresh session standing in `starting_world`.
    pub fn new(starting_world: impl Into<WorldId>) -> Self {
        let world = starting_world.into();
        Self {
            current_world: world.clone(),
            unlocked_worlds: vec![world],
            unlocked_tools: Vec::new(),
            completed_challenges: Vec::new(),
            hypotheses: Vec::new(),
            rewards: Vec::new(),
            score: 0,
            metadata: metadata_keys::ALL
                .iter()
                .map(|key| (key.to_string(), 0.0))
                .collect(),
        }
    }

    /// Build the initial state from a session loaded from the backend.
    ///
    /// Every catalog world up to the current one is treated as unlocked,
    /// since worlds unlock in order.
    pub fn from_payload(payload: &SessionPayload, starting_world: &WorldId) -> Self {
        let current = payload
            .current_world
            .as_deref()
            .filter(|w| !w.trim().is_empty())
            .map(WorldId::from)
            .unwrap_or_else(|| starting_world.clone());

        let mut state = Self::new(starting_world.clone());
        for world in worlds::worlds_through(&current) {
            push_unique(&mut state.unlocked_worlds, world.id.clone());
        }
        push_unique(&mut state.unlocked_worlds, current.clone());
        for world in &payload.unlocked_worlds {
            push_unique(&mut state.unlocked_worlds, WorldId::from(world.as_str()));
        }
        state.current_world = current;

        for tool in &payload.unlocked_tools {
            push_unique(&mut state.unlocked_tools, ToolId::from(tool.as_str()));
        }
        for challenge in &payload.completed_challenges {
            push_unique(
                &mut state.completed_challenges,
                ChallengeId::from(challenge.as_str()),
            );
        }
        for record in payload.reward_records() {
            merge_reward(&mut state.rewards, Reward::from_record(record));
        }
        state.score = payload.score.unwrap_or(0);
        state
    }

    pub fn is_world_unlocked(&self, world: &WorldId) -> bool {
        self.unlocked_worlds.contains(world)
    }

    pub fn is_tool_unlocked(&self, tool: &ToolId) -> bool {
        self.unlocked_tools.contains(tool)
    }

    pub fn has_completed(&self, challenge: &ChallengeId) -> bool {
        self.completed_challenges.contains(challenge)
    }

    pub fn reward(&self, id: &RewardId) -> Option<&Reward> {
        self.rewards.iter().find(|r| &r.id == id)
    }

    pub fn has_reward(&self, id: &RewardId) -> bool {
        self.reward(id).is_some()
    }

    /// Read a metadata counter, treating missing keys as zero.
    pub fn metadata_value(&self, key: &str) -> f64 {
        self.metadata.get(key).copied().unwrap_or(0.0)
    }

    /// Merge a patch, producing the next state.
    ///
    /// Array fields append with de-duplication by id (hypotheses always
    /// append). The patch is applied all-or-nothing.
    pub fn merged(&self, patch: &StatePatch) -> Result<SessionState, StateError> {
        patch.validate()?;

        let mut next = self.clone();

        for world in &patch.unlock_worlds {
            push_unique(&mut next.unlocked_worlds, world.clone());
        }
        if let Some(world) = &patch.current_world {
            if !next.unlocked_worlds.contains(world) {
                return Err(StateError::WorldLocked(world.clone()));
            }
            next.current_world = world.clone();
        }

        for tool in &patch.unlock_tools {
            push_unique(&mut next.unlocked_tools, tool.clone());
        }
        for challenge in &patch.complete_challenges {
            push_unique(&mut next.completed_challenges, challenge.clone());
        }

        next.hypotheses.extend(patch.hypotheses.iter().cloned());

        for reward in &patch.rewards {
            merge_reward(&mut next.rewards, reward.clone());
        }
        if let Some(score) = patch.score {
            if score < self.score {
                return Err(StateError::ScoreRegression {
                    current: self.score,
                    proposed: score,
                });
            }
            next.score = score;
        }
        next.score = next.score.saturating_add(patch.score_delta);

        for id in &patch.claim_rewards {
            let reward = next
                .rewards
                .iter_mut()
                .find(|r| &r.id == id)
                .ok_or_else(|| StateError::UnknownReward(id.clone()))?;
            if !reward.claimed {
                reward.claimed = true;
                next.score = next.score.saturating_add(u64::from(reward.points));
            }
        }

        for (key, value) in &patch.metadata {
            next.metadata.insert(key.clone(), *value);
        }
        for (key, amount) in &patch.metadata_increments {
            let value = next.metadata.entry(key.clone()).or_insert(0.0);
            *value += amount;
            if !value.is_finite() {
                return Err(StateError::NonFiniteMetadata(key.clone()));
            }
        }

        Ok(next)
    }
}

fn push_unique<T: PartialEq>(items: &mut Vec<T>, item: T) {
    if !items.contains(&item) {
        items.push(item);
    }
}

/// Insert a reward, or fold it into the existing entry with the same id.
/// A claimed reward stays claimed.
fn merge_reward(rewards: &mut Vec<Reward>, reward: Reward) {
    match rewards.iter_mut().find(|r| r.id == reward.id) {
        Some(existing) => existing.claimed |= reward.claimed,
        None => rewards.push(reward),
    }
}

/// A partial update to [`SessionState`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatePatch {
    pub current_world: Option<WorldId>,
    pub unlock_worlds: Vec<WorldId>,
    pub unlock_tools: Vec<ToolId>,
    pub complete_challenges: Vec<ChallengeId>,
    pub hypotheses: Vec<Hypothesis>,
    pub rewards: Vec<Reward>,
    pub claim_rewards: Vec<RewardId>,
    /// Absolute score; must not be lower than the current score.
    pub score: Option<u64>,
    pub score_delta: u64,
    pub metadata: BTreeMap<String, f64>,
    pub metadata_increments: BTreeMap<String, f64>,
}

/// Shape of the `progress_update` object the server sends back.
#[derive(Debug, Deserialize)]
struct ProgressUpdate {
    #[serde(default, alias = "currentWorld")]
    current_world: Option<String>,
    #[serde(default, alias = "unlockedWorlds")]
    unlocked_worlds: Vec<String>,
    #[serde(default, alias = "unlockedTools")]
    unlocked_tools: Vec<String>,
    #[serde(default, alias = "completedChallenges")]
    completed_challenges: Vec<String>,
    #[serde(default)]
    score: Option<u64>,
    #[serde(default)]
    rewards: Vec<RewardRecord>,
}

impl StatePatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a server `progress_update` object.
    ///
    /// `null` yields an empty patch. A world named by the server is
    /// unlocked as well as entered.
    pub fn from_progress_json(value: &serde_json::Value) -> Result<Self, StateError> {
        if value.is_null() {
            return Ok(Self::default());
        }
        let update: ProgressUpdate = serde_json::from_value(value.clone())
            .map_err(|e| StateError::Malformed(e.to_string()))?;

        let mut patch = Self::new();
        if let Some(world) = update.current_world {
            patch = patch.enter_world(world.as_str());
        }
        for world in update.unlocked_worlds {
            patch = patch.unlock_world(world);
        }
        for tool in update.unlocked_tools {
            patch = patch.unlock_tool(tool);
        }
        for challenge in update.completed_challenges {
            patch = patch.complete_challenge(challenge);
        }
        for record in &update.rewards {
            patch = patch.reward(Reward::from_record(record));
        }
        patch.score = update.score;
        Ok(patch)
    }

    /// Move to a world that must already be unlocked.
    pub fn with_world(mut self, world: impl Into<WorldId>) -> Self {
        self.current_world = Some(world.into());
        self
    }

    /// Unlock a world and move to it.
    pub fn enter_world(self, world: impl Into<WorldId>) -> Self {
        let world = world.into();
        self.unlock_world(world.clone()).with_world(world)
    }

    pub fn unlock_world(mut self, world: impl Into<WorldId>) -> Self {
        self.unlock_worlds.push(world.into());
        self
    }

    pub fn unlock_tool(mut self, tool: impl Into<ToolId>) -> Self {
        self.unlock_tools.push(tool.into());
        self
    }

    pub fn complete_challenge(mut self, challenge: impl Into<ChallengeId>) -> Self {
        self.complete_challenges.push(challenge.into());
        self
    }

    pub fn hypothesis(mut self, hypothesis: Hypothesis) -> Self {
        self.hypotheses.push(hypothesis);
        self
    }

    pub fn reward(mut self, reward: Reward) -> Self {
        self.rewards.push(reward);
        self
    }

    pub fn claim(mut self, reward: impl Into<RewardId>) -> Self {
        self.claim_rewards.push(reward.into());
        self
    }

    pub fn with_score(mut self, score: u64) -> Self {
        self.score = Some(score);
        self
    }

    pub fn add_score(mut self, points: u64) -> Self {
        self.score_delta = self.score_delta.saturating_add(points);
        self
    }

    pub fn set_metadata(mut self, key: impl Into<String>, value: f64) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn increment(mut self, key: impl Into<String>, amount: f64) -> Self {
        *self.metadata_increments.entry(key.into()).or_insert(0.0) += amount;
        self
    }

    /// Fold another patch into this one. Later world and score settings win.
    pub fn merge(mut self, other: StatePatch) -> Self {
        if other.current_world.is_some() {
            self.current_world = other.current_world;
        }
        self.unlock_worlds.extend(other.unlock_worlds);
        self.unlock_tools.extend(other.unlock_tools);
        self.complete_challenges.extend(other.complete_challenges);
        self.hypotheses.extend(other.hypotheses);
        self.rewards.extend(other.rewards);
        self.claim_rewards.extend(other.claim_rewards);
        if other.score.is_some() {
            self.score = other.score;
        }
        self.score_delta = self.score_delta.saturating_add(other.score_delta);
        self.metadata.extend(other.metadata);
        for (key, amount) in other.metadata_increments {
            *self.metadata_increments.entry(key).or_insert(0.0) += amount;
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    fn validate(&self) -> Result<(), StateError> {
        check_ids(self.current_world.iter())?;
        check_ids(self.unlock_worlds.iter())?;
        check_ids(self.unlock_tools.iter())?;
        check_ids(self.complete_challenges.iter())?;
        check_ids(self.rewards.iter().map(|r| &r.id))?;
        check_ids(self.claim_rewards.iter())?;

        for (key, value) in self.metadata.iter().chain(self.metadata_increments.iter()) {
            if !value.is_finite() {
                return Err(StateError::NonFiniteMetadata(key.clone()));
            }
        }
        Ok(())
    }
}

trait BlankCheck {
    fn blank_kind(&self) -> Option<&'static str>;
}

macro_rules! blank_check {
    ($($name:ident),*) => {
        $(impl BlankCheck for $name {
            fn blank_kind(&self) -> Option<&'static str> {
                self.is_blank().then_some(Self::KIND)
            }
        })*
    };
}

blank_check!(WorldId, ToolId, ChallengeId, RewardId);

fn check_ids<'a, T: BlankCheck + 'a>(ids: impl Iterator<Item = &'a T>) -> Result<(), StateError> {
    for id in ids {
        if let Some(kind) = id.blank_kind() {
            return Err(StateError::EmptyId(kind));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base() -> SessionState {
        SessionState::new("bosque_decenas")
    }

    #[test]
    fn test_new_state_invariants() {
        let state = base();
        assert!(state.is_world_unlocked(&state.current_world));
        assert_eq!(state.score, 0);
        assert_eq!(state.metadata_value(metadata_keys::TOTAL_ACTIONS), 0.0);
    }

    #[test]
    fn test_merge_appends_with_dedup() {
        let state = base();
        let patch = StatePatch::new()
            .unlock_tool("calculadora_patrones")
            .unlock_tool("calculadora_patrones")
            .complete_challenge("c1")
            .complete_challenge("c1");

        let next = state.merged(&patch).unwrap();
        assert_eq!(next.unlocked_tools.len(), 1);
        assert_eq!(next.completed_challenges.len(), 1);

        let again = next.merged(&patch).unwrap();
        assert_eq!(again, next);
    }

    #[test]
    fn test_hypotheses_always_append() {
        let h = Hypothesis::new("de 2 en 2", vec![2, 4, 6], true);
        let patch = StatePatch::new().hypothesis(h.clone()).hypothesis(h);

        let next = base().merged(&patch).unwrap();
        assert_eq!(next.hypotheses.len(), 2);
    }

    #[test]
    fn test_locked_world_rejected() {
        let state = base();
        let patch = StatePatch::new().with_world("rio_cincos");

        assert_eq!(
            state.merged(&patch),
            Err(StateError::WorldLocked(WorldId::from("rio_cincos")))
        );
    }

    #[test]
    fn test_enter_world_unlocks() {
        let next = base()
            .merged(&StatePatch::new().enter_world("rio_cincos"))
            .unwrap();
        assert_eq!(next.current_world.as_str(), "rio_cincos");
        assert!(next.is_world_unlocked(&WorldId::from("bosque_decenas")));
        assert!(next.is_world_unlocked(&WorldId::from("rio_cincos")));
    }

    #[test]
    fn test_score_regression_rejected() {
        let state = base().merged(&StatePatch::new().add_score(30)).unwrap();

        let err = state.merged(&StatePatch::new().with_score(10)).unwrap_err();
        assert_eq!(
            err,
            StateError::ScoreRegression {
                current: 30,
                proposed: 10
            }
        );

        let raised = state.merged(&StatePatch::new().with_score(40)).unwrap();
        assert_eq!(raised.score, 40);
    }

    #[test]
    fn test_claimed_reward_never_reverts() {
        let state = base()
            .merged(&StatePatch::new().reward(Reward::new("r1", "First Win", 25)))
            .unwrap()
            .merged(&StatePatch::new().claim("r1"))
            .unwrap();
        assert!(state.reward(&RewardId::from("r1")).unwrap().claimed);
        assert_eq!(state.score, 25);

        let claimed_twice = state.merged(&StatePatch::new().claim("r1")).unwrap();
        assert_eq!(claimed_twice.score, 25);

        let re_added = state
            .merged(&StatePatch::new().reward(Reward::new("r1", "First Win", 25)))
            .unwrap();
        assert_eq!(re_added.rewards.len(), 1);
        assert!(re_added.rewards[0].claimed);
    }

    #[test]
    fn test_claim_unknown_reward() {
        let err = base().merged(&StatePatch::new().claim("missing")).unwrap_err();
        assert_eq!(err, StateError::UnknownReward(RewardId::from("missing")));
    }

    #[test]
    fn test_empty_ids_rejected() {
        assert_eq!(
            base().merged(&StatePatch::new().unlock_tool("  ")),
            Err(StateError::EmptyId("tool"))
        );
        assert_eq!(
            base().merged(&StatePatch::new().reward(Reward::new("", "x", 1))),
            Err(StateError::EmptyId("reward"))
        );
    }

    #[test]
    fn test_non_finite_metadata_rejected() {
        let err = base()
            .merged(&StatePatch::new().set_metadata("toolsUsed", f64::NAN))
            .unwrap_err();
        assert_eq!(err, StateError::NonFiniteMetadata("toolsUsed".to_string()));
    }

    #[test]
    fn test_increment_past_finite_range_rejected() {
        let state = base()
            .merged(&StatePatch::new().set_metadata("custom", f64::MAX))
            .unwrap();

        let err = state
            .merged(&StatePatch::new().increment("custom", f64::MAX))
            .unwrap_err();

        assert_eq!(err, StateError::NonFiniteMetadata("custom".to_string()));
        assert_eq!(state.metadata_value("custom"), f64::MAX);
    }

    #[test]
    fn test_rejected_patch_is_all_or_nothing() {
        let state = base();
        let patch = StatePatch::new()
            .unlock_tool("calculadora_patrones")
            .add_score(10)
            .claim("missing");

        assert!(state.merged(&patch).is_err());
        assert!(state.unlocked_tools.is_empty());
        assert_eq!(state.score, 0);
    }

    #[test]
    fn test_metadata_increments() {
        let next = base()
            .merged(
                &StatePatch::new()
                    .increment(metadata_keys::TOTAL_ACTIONS, 1.0)
                    .increment(metadata_keys::TOTAL_ACTIONS, 1.0)
                    .increment("custom", 2.5),
            )
            .unwrap();
        assert_eq!(next.metadata_value(metadata_keys::TOTAL_ACTIONS), 2.0);
        assert_eq!(next.metadata_value("custom"), 2.5);
    }

    #[test]
    fn test_patch_merge() {
        let combined = StatePatch::new()
            .add_score(5)
            .increment("a", 1.0)
            .merge(StatePatch::new().add_score(7).increment("a", 2.0).with_score(3));

        assert_eq!(combined.score_delta, 12);
        assert_eq!(combined.score, Some(3));
        assert_eq!(combined.metadata_increments["a"], 3.0);
    }

    #[test]
    fn test_progress_json() {
        let patch = StatePatch::from_progress_json(&json!({
            "current_world": "rio_cincos",
            "unlocked_tools": ["microscopio_numerico"],
            "rewards": [{"id": "pattern_5_5"}],
            "last_action": {"type": "drag_drop"}
        }))
        .unwrap();

        let next = base().merged(&patch).unwrap();
        assert_eq!(next.current_world.as_str(), "rio_cincos");
        assert_eq!(next.unlocked_tools, vec![ToolId::from("microscopio_numerico")]);
        assert_eq!(next.rewards[0].points, 25);
        assert!(!next.rewards[0].claimed);
    }

    #[test]
    fn test_progress_json_null_and_malformed() {
        assert!(StatePatch::from_progress_json(&serde_json::Value::Null)
            .unwrap()
            .is_empty());

        let missing_id = StatePatch::from_progress_json(&json!({"rewards": [{"title": "x"}]}));
        assert!(matches!(missing_id, Err(StateError::Malformed(_))));

        let not_object = StatePatch::from_progress_json(&json!("oops"));
        assert!(matches!(not_object, Err(StateError::Malformed(_))));
    }

    #[test]
    fn test_from_payload() {
        let payload: SessionPayload = serde_json::from_value(json!({
            "current_world": "montana_cientos",
            "completed_challenges": ["c1", "c1", "c2"],
            "unlocked_tools": ["calculadora_patrones"],
            "rewards": {"user_rewards": [
                {"id": "first_pattern", "claimed_at": "2024-01-01T00:00:00Z"},
                {"id": "first_pattern"}
            ]}
        }))
        .unwrap();

        let state = SessionState::from_payload(&payload, &WorldId::from("bosque_decenas"));
        assert_eq!(state.current_world.as_str(), "montana_cientos");
        assert_eq!(state.unlocked_worlds.len(), 3);
        assert_eq!(state.completed_challenges.len(), 2);
        assert_eq!(state.rewards.len(), 1);
        assert!(state.rewards[0].claimed);
        assert_eq!(state.rewards[0].points, 20);
    }

    #[test]
    fn test_from_empty_payload_defaults_world() {
        let state =
            SessionState::from_payload(&SessionPayload::default(), &WorldId::from("bosque_decenas"));
        assert_eq!(state, SessionState::new("bosque_decenas"));
    }
}
