//! The session state store.
//!
//! Holds the current [`SessionState`] behind an `Arc`. Each successful
//! update swaps in a new snapshot, so readers holding an older snapshot
//! keep a consistent view. A rejected update leaves the current snapshot
//! in place.

use crate::state::{
    metadata_keys, ChallengeId, Hypothesis, Reward, RewardId, SessionState, StateError,
    StatePatch, ToolId, WorldId,
};
use crate::worlds::{self, ToolInfo, WorldInfo};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Challenges in a full run, used for the progress percentage.
pub const DEFAULT_TOTAL_CHALLENGES: usize = 15;

/// How many hypotheses [`SessionStats::recent_hypotheses`] keeps.
pub const DEFAULT_RECENT_HYPOTHESES: usize = 5;

pub struct SessionStore {
    current: Arc<SessionState>,
    starting_world: WorldId,
    total_challenges: usize,
    recent_hypotheses: usize,
}

impl SessionStore {
    /// Create a store seeded with `initial`. The first unlocked world is
    /// where a reset returns to.
    pub fn new(initial: SessionState) -> Self {
        let starting_world = initial
            .unlocked_worlds
            .first()
            .cloned()
            .unwrap_or_else(|| initial.current_world.clone());
        Self {
            current: Arc::new(initial),
            starting_world,
            total_challenges: DEFAULT_TOTAL_CHALLENGES,
            recent_hypotheses: DEFAULT_RECENT_HYPOTHESES,
        }
    }

    pub fn with_total_challenges(mut self, total: usize) -> Self {
        self.total_challenges = total;
        self
    }

    pub fn with_recent_hypotheses(mut self, count: usize) -> Self {
        self.recent_hypotheses = count;
        self
    }

    /// A shared handle to the current state.
    pub fn snapshot(&self) -> Arc<SessionState> {
        Arc::clone(&self.current)
    }

    pub fn state(&self) -> &SessionState {
        &self.current
    }

    /// Merge a patch and publish the result as the new snapshot.
    pub fn apply(&mut self, patch: &StatePatch) -> Result<Arc<SessionState>, StateError> {
        match self.current.merged(patch) {
            Ok(next) => {
                tracing::info!(
                    world = %next.current_world,
                    score = next.score,
                    rewards = next.rewards.len(),
                    "session state updated"
                );
                self.current = Arc::new(next);
                Ok(self.snapshot())
            }
            Err(e) => {
                tracing::warn!(error = %e, "rejected state patch");
                Err(e)
            }
        }
    }

    /// Apply a progress patch, counting it as one learner action.
    pub fn update_progress(&mut self, patch: StatePatch) -> Result<Arc<SessionState>, StateError> {
        self.apply(&patch.increment(metadata_keys::TOTAL_ACTIONS, 1.0))
    }

    /// Add a reward. Earning a reward does not change the score; claiming it does.
    pub fn add_reward(&mut self, reward: Reward) -> Result<Arc<SessionState>, StateError> {
        self.apply(&StatePatch::new().reward(reward))
    }

    pub fn record_hypothesis(
        &mut self,
        hypothesis: Hypothesis,
    ) -> Result<Arc<SessionState>, StateError> {
        let mut patch = StatePatch::new();
        if hypothesis.is_valid {
            patch = patch.increment(metadata_keys::PATTERNS_DISCOVERED, 1.0);
        }
        self.apply(&patch.hypothesis(hypothesis))
    }

    pub fn update_metadata(
        &mut self,
        values: BTreeMap<String, f64>,
    ) -> Result<Arc<SessionState>, StateError> {
        let patch = StatePatch {
            metadata: values,
            ..StatePatch::default()
        };
        self.apply(&patch)
    }

    pub fn unlock_tool(&mut self, tool: impl Into<ToolId>) -> Result<Arc<SessionState>, StateError> {
        let tool = tool.into();
        let mut patch = StatePatch::new();
        if !self.current.is_tool_unlocked(&tool) {
            patch = patch.increment(metadata_keys::TOOLS_USED, 1.0);
        }
        self.apply(&patch.unlock_tool(tool))
    }

    /// Unlock a world and move there.
    pub fn update_world(
        &mut self,
        world: impl Into<WorldId>,
    ) -> Result<Arc<SessionState>, StateError> {
        self.apply(&StatePatch::new().enter_world(world))
    }

    /// Move to a world the learner has already unlocked.
    pub fn select_world(
        &mut self,
        world: impl Into<WorldId>,
    ) -> Result<Arc<SessionState>, StateError> {
        self.apply(&StatePatch::new().with_world(world))
    }

    /// Mark a challenge completed. Points are only granted the first time.
    pub fn complete_challenge(
        &mut self,
        challenge: impl Into<ChallengeId>,
        points: u32,
    ) -> Result<Arc<SessionState>, StateError> {
        let challenge = challenge.into();
        let mut patch = StatePatch::new();
        if !self.current.has_completed(&challenge) {
            patch = patch.add_score(u64::from(points));
        }
        self.apply(&patch.complete_challenge(challenge))
    }

    pub fn claim_reward(
        &mut self,
        reward: impl Into<RewardId>,
    ) -> Result<Arc<SessionState>, StateError> {
        self.apply(&StatePatch::new().claim(reward))
    }

    /// Drop all progress and return to the starting world.
    pub fn reset(&mut self) -> Arc<SessionState> {
        tracing::info!(world = %self.starting_world, "session state reset");
        self.current = Arc::new(SessionState::new(self.starting_world.clone()));
        self.snapshot()
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats::from_state(&self.current, self.total_challenges, self.recent_hypotheses)
    }
}

/// Summary of a session for progress displays.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionStats {
    pub total_challenges: usize,
    pub completed_challenges: usize,
    pub total_rewards: usize,
    pub claimed_rewards: usize,
    pub total_hypotheses: usize,
    pub valid_hypotheses: usize,
    pub progress_percentage: u8,
    pub current_world: Option<WorldInfo>,
    pub unlocked_tools: Vec<ToolInfo>,
    pub recent_hypotheses: Vec<Hypothesis>,
    pub score: u64,
    pub claimed_points: u64,
    pub unclaimed_points: u64,
}

impl SessionStats {
    pub fn from_state(state: &SessionState, total_challenges: usize, recent: usize) -> Self {
        let completed = state.completed_challenges.len();
        let progress_percentage = if total_challenges == 0 {
            0
        } else {
            let pct = (completed as f64 / total_challenges as f64 * 100.0).round();
            pct.min(100.0) as u8
        };

        // Newest first; on equal timestamps the later-recorded one wins.
        let mut recent_hypotheses: Vec<Hypothesis> =
            state.hypotheses.iter().rev().cloned().collect();
        recent_hypotheses.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
        recent_hypotheses.truncate(recent);

        let (claimed, unclaimed): (Vec<&Reward>, Vec<&Reward>) =
            state.rewards.iter().partition(|r| r.claimed);

        Self {
            total_challenges,
            completed_challenges: completed,
            total_rewards: state.rewards.len(),
            claimed_rewards: claimed.len(),
            total_hypotheses: state.hypotheses.len(),
            valid_hypotheses: state.hypotheses.iter().filter(|h| h.is_valid).count(),
            progress_percentage,
            current_world: worlds::get_world(&state.current_world).cloned(),
            unlocked_tools: state
                .unlocked_tools
                .iter()
                .filter_map(|t| worlds::get_tool(t).cloned())
                .collect(),
            recent_hypotheses,
            score: state.score,
            claimed_points: total_points(&claimed),
            unclaimed_points: total_points(&unclaimed),
        }
    }
}

fn total_points(rewards: &[&Reward]) -> u64 {
    rewards.iter().map(|r| u64::from(r.points)).sum()
}
