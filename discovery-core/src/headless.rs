//! Headless session interface for programmatic use.
//!
//! A line-oriented protocol for driving a session without a UI. It is meant
//! for scripted sessions, smoke tests against a live backend and agents.
//!
//! # Example
//!
//! ```ignore
//! use discovery_core::headless::HeadlessSession;
//!
//! let mut headless = HeadlessSession::new(session);
//! let reply = headless.send("pattern 2 4 6 8").await;
//! for line in &reply.lines {
//!     println!("{line}");
//! }
//! ```

use crate::action::Action;
use crate::backend::ExperienceBackend;
use crate::catalog::{category_progress, RewardCategory};
use crate::feedback::FeedbackMessage;
use crate::session::ExperienceSession;
use crate::state::{ChallengeId, RewardId, SessionState, ToolId, WorldId};
use crate::supervisor::{GameCategory, GameFormat};
use thiserror::Error;

/// Drag-and-drop source used by `order`.
pub const ORDER_SOURCE: &str = "number_bank";

/// Drag-and-drop target used by `order`.
pub const ORDER_TARGET: &str = "sequence";

/// Errors from parsing a headless input line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Empty input")]
    Empty,

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("'{command}' needs {argument}")]
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },

    #[error("Not a number: {0}")]
    InvalidNumber(String),

    #[error("'say' needs '<command> / <expected>'")]
    MissingExpected,
}

/// One parsed input line.
#[derive(Debug, Clone, PartialEq)]
pub enum HeadlessCommand {
    /// A learner action sent to the backend.
    Act(Action),
    Challenge { id: ChallengeId, name: String },
    Claim(RewardId),
    World(WorldId),
    Status,
    Stats,
    Rewards,
    Games,
    Help,
    Quit,
}

impl HeadlessCommand {
    /// Parse a line such as `pattern 5 10 15` or `#status`.
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let line = line.trim();
        if line.is_empty() {
            return Err(ParseError::Empty);
        }

        if let Some(meta) = line.strip_prefix('#') {
            return match meta.split_whitespace().next() {
                Some("status") => Ok(HeadlessCommand::Status),
                Some("stats") => Ok(HeadlessCommand::Stats),
                Some("rewards") => Ok(HeadlessCommand::Rewards),
                Some("games") => Ok(HeadlessCommand::Games),
                Some("help") => Ok(HeadlessCommand::Help),
                Some("quit") | Some("exit") => Ok(HeadlessCommand::Quit),
                Some(other) => Err(ParseError::UnknownCommand(format!("#{other}"))),
                None => Err(ParseError::UnknownCommand("#".to_string())),
            };
        }

        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };

        match verb.to_lowercase().as_str() {
            "pattern" => Ok(HeadlessCommand::Act(Action::PatternDiscovery {
                numbers: parse_numbers("pattern", rest)?,
            })),
            "hypothesis" => {
                let (pattern, numbers) = match rest.split_once(':') {
                    Some((pattern, numbers)) => (pattern.trim(), numbers),
                    None => match rest.split_once(char::is_whitespace) {
                        Some((pattern, numbers)) => (pattern, numbers),
                        None => (rest, ""),
                    },
                };
                if pattern.is_empty() {
                    return Err(ParseError::MissingArgument {
                        command: "hypothesis",
                        argument: "a pattern",
                    });
                }
                Ok(HeadlessCommand::Act(Action::HypothesisTest {
                    pattern: pattern.to_string(),
                    numbers: parse_numbers("hypothesis", numbers)?,
                }))
            }
            "order" => Ok(HeadlessCommand::Act(Action::DragDrop {
                source: ORDER_SOURCE.to_string(),
                target: ORDER_TARGET.to_string(),
                numbers: parse_numbers("order", rest)?,
            })),
            "say" => {
                let (command, expected) =
                    rest.split_once('/').ok_or(ParseError::MissingExpected)?;
                let (command, expected) = (command.trim(), expected.trim());
                if command.is_empty() || expected.is_empty() {
                    return Err(ParseError::MissingExpected);
                }
                Ok(HeadlessCommand::Act(Action::VoiceCommand {
                    command: command.to_string(),
                    expected: expected.to_string(),
                }))
            }
            "tool" => Ok(HeadlessCommand::Act(Action::ToolUse {
                tool_id: ToolId::from(required("tool", "a tool id", rest)?),
            })),
            "family" => Ok(HeadlessCommand::Act(Action::FamilyActivity {
                activity: required("family", "an activity", rest)?.to_string(),
            })),
            "challenge" => {
                let rest = required("challenge", "a challenge id", rest)?;
                let (id, name) = match rest.split_once(char::is_whitespace) {
                    Some((id, name)) => (id, name.trim()),
                    None => (rest, rest),
                };
                Ok(HeadlessCommand::Challenge {
                    id: ChallengeId::from(id),
                    name: name.to_string(),
                })
            }
            "claim" => Ok(HeadlessCommand::Claim(RewardId::from(required(
                "claim",
                "a reward id",
                rest,
            )?))),
            "world" => Ok(HeadlessCommand::World(WorldId::from(required(
                "world",
                "a world id",
                rest,
            )?))),
            _ => Err(ParseError::UnknownCommand(verb.to_string())),
        }
    }
}

fn required<'a>(
    command: &'static str,
    argument: &'static str,
    rest: &'a str,
) -> Result<&'a str, ParseError> {
    if rest.is_empty() {
        Err(ParseError::MissingArgument { command, argument })
    } else {
        Ok(rest)
    }
}

/// Numbers separated by spaces or commas.
fn parse_numbers(command: &'static str, input: &str) -> Result<Vec<i64>, ParseError> {
    let numbers = input
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|token| !token.is_empty())
        .map(|token| {
            token
                .parse::<i64>()
                .map_err(|_| ParseError::InvalidNumber(token.to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    if numbers.is_empty() {
        return Err(ParseError::MissingArgument {
            command,
            argument: "numbers",
        });
    }
    Ok(numbers)
}

/// The command reference printed by `#help`.
pub fn help_text() -> Vec<String> {
    [
        "Actions:",
        "  pattern <n...>              - Discover a pattern, e.g. pattern 5 10 15",
        "  hypothesis <name> <n...>    - Test a hypothesis (use ':' before the numbers if the name has spaces)",
        "  order <n...>                - Drop numbers onto the sequence line",
        "  say <command> / <expected>  - Voice command",
        "  tool <id>                   - Use a tool",
        "  family <activity>           - Log a family activity",
        "  challenge <id> [name]       - Complete a challenge",
        "  claim <reward_id>           - Claim a reward",
        "  world <id>                  - Move to an unlocked world",
        "Commands:",
        "  #status                     - Show the session state",
        "  #stats                      - Show progress statistics",
        "  #rewards                    - Show rewards by category",
        "  #games                      - List game formats",
        "  #help                       - Show this help",
        "  #quit                       - Exit",
    ]
    .iter()
    .map(|line| line.to_string())
    .collect()
}

/// One line describing a feedback message.
pub fn format_feedback(message: &FeedbackMessage) -> String {
    format!(
        "[FEEDBACK] {} {}: {}",
        message.kind.name(),
        message.title,
        message.message
    )
}

/// One line describing the session state.
pub fn format_state(state: &SessionState) -> String {
    format!(
        "[STATE] world={} worlds={} tools={} challenges={} hypotheses={} rewards={} score={}",
        state.current_world,
        state.unlocked_worlds.len(),
        state.unlocked_tools.len(),
        state.completed_challenges.len(),
        state.hypotheses.len(),
        state.rewards.len(),
        state.score
    )
}

/// The output of one input line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reply {
    pub lines: Vec<String>,
    pub quit: bool,
}

impl Reply {
    fn from_lines(lines: Vec<String>) -> Self {
        Self { lines, quit: false }
    }

    fn error(error: impl std::fmt::Display) -> Self {
        Self::from_lines(vec![format!("[ERROR] {error}")])
    }
}

/// A session driven by text commands.
pub struct HeadlessSession<B> {
    session: ExperienceSession<B>,
}

impl<B: ExperienceBackend> HeadlessSession<B> {
    pub fn new(session: ExperienceSession<B>) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &ExperienceSession<B> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut ExperienceSession<B> {
        &mut self.session
    }

    pub fn into_session(self) -> ExperienceSession<B> {
        self.session
    }

    /// Parse and run one input line.
    pub async fn send(&mut self, line: &str) -> Reply {
        match HeadlessCommand::parse(line) {
            Ok(command) => self.execute(command).await,
            Err(ParseError::Empty) => Reply::default(),
            Err(e) => Reply::error(e),
        }
    }

    pub async fn execute(&mut self, command: HeadlessCommand) -> Reply {
        match command {
            HeadlessCommand::Act(action) => match self.session.dispatch(action).await {
                Ok(report) => {
                    let mut lines = vec![format!(
                        "[RESULT] valid={} {}",
                        report.valid, report.feedback.title
                    )];
                    if let Some(achievement) = &report.achievement {
                        lines.push(format!(
                            "[REWARD] {} {} (+{})",
                            achievement.id, achievement.title, achievement.points
                        ));
                    }
                    for id in &report.rewards {
                        lines.push(format!("[REWARD] {id}"));
                    }
                    lines.push(format_state(&report.state));
                    Reply::from_lines(lines)
                }
                Err(e) => Reply::error(e),
            },
            HeadlessCommand::Challenge { id, name } => {
                let result = self
                    .session
                    .complete_challenge(id, &name, serde_json::json!({}))
                    .await;
                match result {
                    Ok(outcome) => {
                        let mut lines = vec![format!(
                            "[CHALLENGE] {} +{}",
                            outcome.challenge_id, outcome.points
                        )];
                        for reward in &outcome.rewards {
                            lines.push(format!("[REWARD] {} {}", reward.id, reward.title));
                        }
                        if let Some(world) = &outcome.unlocked_world {
                            lines.push(format!("[WORLD] unlocked {world}"));
                        }
                        lines.push(format_state(&outcome.state));
                        Reply::from_lines(lines)
                    }
                    Err(e) => Reply::error(e),
                }
            }
            HeadlessCommand::Claim(id) => match self.session.claim_reward(id).await {
                Ok(outcome) => Reply::from_lines(vec![
                    format!(
                        "[CLAIMED] {} {} (+{})",
                        outcome.reward_id, outcome.title, outcome.points
                    ),
                    format_state(&outcome.state),
                ]),
                Err(e) => Reply::error(e),
            },
            HeadlessCommand::World(world) => match self.session.select_world(world) {
                Ok(state) => Reply::from_lines(vec![format_state(&state)]),
                Err(e) => Reply::error(e),
            },
            HeadlessCommand::Status => Reply::from_lines(vec![format_state(self.session.state())]),
            HeadlessCommand::Stats => {
                let stats = self.session.stats();
                let world = stats
                    .current_world
                    .as_ref()
                    .map(|w| format!("{} ({})", w.name, w.pattern()))
                    .unwrap_or_else(|| "-".to_string());
                let mut lines = vec![
                    format!("[STATS] world={world}"),
                    format!(
                        "[STATS] progress={}% challenges={}/{}",
                        stats.progress_percentage,
                        stats.completed_challenges,
                        stats.total_challenges
                    ),
                    format!(
                        "[STATS] hypotheses={}/{} valid",
                        stats.valid_hypotheses, stats.total_hypotheses
                    ),
                    format!(
                        "[STATS] rewards={}/{} claimed points={} unclaimed={}",
                        stats.claimed_rewards,
                        stats.total_rewards,
                        stats.claimed_points,
                        stats.unclaimed_points
                    ),
                ];
                for hypothesis in &stats.recent_hypotheses {
                    lines.push(format!(
                        "[HYPOTHESIS] {} {:?} valid={}",
                        hypothesis.pattern, hypothesis.numbers, hypothesis.is_valid
                    ));
                }
                Reply::from_lines(lines)
            }
            HeadlessCommand::Rewards => {
                let state = self.session.state();
                let mut lines = Vec::new();
                for category in RewardCategory::ALL {
                    let progress = category_progress(category, state);
                    lines.push(format!(
                        "[REWARDS] {} {}/{} ({}%)",
                        category.name(),
                        progress.earned,
                        progress.total,
                        progress.percentage
                    ));
                }
                for reward in &state.rewards {
                    lines.push(format!(
                        "[REWARD] {} {} points={} claimed={}",
                        reward.id, reward.title, reward.points, reward.claimed
                    ));
                }
                Reply::from_lines(lines)
            }
            HeadlessCommand::Games => {
                let mut lines = Vec::new();
                for category in [GameCategory::Basic, GameCategory::Advanced, GameCategory::Expert]
                {
                    for game in GameFormat::ALL.iter().filter(|g| g.category() == category) {
                        lines.push(format!(
                            "[GAME] {} {} {} ({})",
                            game.code(),
                            game.slug(),
                            game.display_name(),
                            category.name()
                        ));
                    }
                }
                Reply::from_lines(lines)
            }
            HeadlessCommand::Help => Reply::from_lines(help_text()),
            HeadlessCommand::Quit => Reply {
                lines: vec!["Goodbye!".to_string()],
                quit: true,
            },
        }
    }

    /// Show queued feedback, waiting out each message.
    pub async fn play_feedback<F>(&mut self, mut on_line: F)
    where
        F: FnMut(String),
    {
        self.session
            .feedback_mut()
            .play_pending(|message| on_line(format_feedback(message)))
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionConfig;
    use crate::testing::{accepted, MockBackend};
    use experiences_api::ChallengeResult;

    fn headless() -> (MockBackend, HeadlessSession<MockBackend>) {
        let backend = MockBackend::new();
        let session = ExperienceSession::with_state(
            backend.clone(),
            SessionConfig::new("headless").with_strict_actions(true),
            SessionState::new("bosque_decenas"),
        );
        (backend, HeadlessSession::new(session))
    }

    #[test]
    fn test_parse_actions() {
        assert_eq!(
            HeadlessCommand::parse("pattern 5, 10, 15").unwrap(),
            HeadlessCommand::Act(Action::PatternDiscovery {
                numbers: vec![5, 10, 15]
            })
        );
        assert_eq!(
            HeadlessCommand::parse("hypothesis de 5 en 5 : 5 10 15").unwrap(),
            HeadlessCommand::Act(Action::HypothesisTest {
                pattern: "de 5 en 5".to_string(),
                numbers: vec![5, 10, 15]
            })
        );
        assert_eq!(
            HeadlessCommand::parse("hypothesis cincos 5 10").unwrap(),
            HeadlessCommand::Act(Action::HypothesisTest {
                pattern: "cincos".to_string(),
                numbers: vec![5, 10]
            })
        );
        assert_eq!(
            HeadlessCommand::parse("say de dos en dos / dos en dos").unwrap(),
            HeadlessCommand::Act(Action::VoiceCommand {
                command: "de dos en dos".to_string(),
                expected: "dos en dos".to_string()
            })
        );
        assert_eq!(
            HeadlessCommand::parse("order 3 1 2").unwrap(),
            HeadlessCommand::Act(Action::DragDrop {
                source: ORDER_SOURCE.to_string(),
                target: ORDER_TARGET.to_string(),
                numbers: vec![3, 1, 2]
            })
        );
        assert_eq!(
            HeadlessCommand::parse("family contar escalones").unwrap(),
            HeadlessCommand::Act(Action::FamilyActivity {
                activity: "contar escalones".to_string()
            })
        );
    }

    #[test]
    fn test_parse_other_commands() {
        assert_eq!(
            HeadlessCommand::parse("challenge c1 Primer Reto").unwrap(),
            HeadlessCommand::Challenge {
                id: ChallengeId::from("c1"),
                name: "Primer Reto".to_string()
            }
        );
        assert_eq!(
            HeadlessCommand::parse("challenge c2").unwrap(),
            HeadlessCommand::Challenge {
                id: ChallengeId::from("c2"),
                name: "c2".to_string()
            }
        );
        assert_eq!(
            HeadlessCommand::parse("claim first_pattern").unwrap(),
            HeadlessCommand::Claim(RewardId::from("first_pattern"))
        );
        assert_eq!(HeadlessCommand::parse("  #stats ").unwrap(), HeadlessCommand::Stats);
        assert_eq!(HeadlessCommand::parse("#exit").unwrap(), HeadlessCommand::Quit);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(HeadlessCommand::parse("   "), Err(ParseError::Empty));
        assert_eq!(
            HeadlessCommand::parse("dance"),
            Err(ParseError::UnknownCommand("dance".to_string()))
        );
        assert_eq!(
            HeadlessCommand::parse("#save"),
            Err(ParseError::UnknownCommand("#save".to_string()))
        );
        assert_eq!(
            HeadlessCommand::parse("pattern 1 dos 3"),
            Err(ParseError::InvalidNumber("dos".to_string()))
        );
        assert_eq!(
            HeadlessCommand::parse("pattern"),
            Err(ParseError::MissingArgument {
                command: "pattern",
                argument: "numbers"
            })
        );
        assert_eq!(
            HeadlessCommand::parse("say hola"),
            Err(ParseError::MissingExpected)
        );
        assert!(matches!(
            HeadlessCommand::parse("claim"),
            Err(ParseError::MissingArgument { command: "claim", .. })
        ));
    }

    #[tokio::test]
    async fn test_send_action_reports_state() {
        let (backend, mut headless) = headless();
        backend.push_action(crate::testing::MockReply::Ok(accepted()));

        let reply = headless.send("pattern 2 4 6").await;

        assert!(!reply.quit);
        assert!(reply.lines[0].starts_with("[RESULT] valid=true"));
        assert!(reply.lines.last().unwrap().starts_with("[STATE] world=bosque_decenas"));
        assert_eq!(headless.session().state().hypotheses.len(), 1);
    }

    #[tokio::test]
    async fn test_send_extreme_pattern() {
        let (_backend, mut headless) = headless();

        let reply = headless
            .send("pattern -9223372036854775808 0 9223372036854775807")
            .await;

        assert!(reply.lines[0].starts_with("[RESULT] valid=false"));
        assert_eq!(headless.session().state().hypotheses.len(), 1);
    }

    #[tokio::test]
    async fn test_send_reports_errors() {
        let (_backend, mut headless) = headless();

        let reply = headless.send("claim missing").await;
        assert_eq!(reply.lines.len(), 1);
        assert!(reply.lines[0].starts_with("[ERROR]"));

        let reply = headless.send("world montana_cientos").await;
        assert!(reply.lines[0].starts_with("[ERROR]"));

        let reply = headless.send("bogus").await;
        assert_eq!(reply.lines, vec!["[ERROR] Unknown command: bogus".to_string()]);
    }

    #[tokio::test]
    async fn test_send_challenge() {
        let (backend, mut headless) = headless();
        backend.push_challenge(crate::testing::MockReply::Ok(ChallengeResult {
            points: Some(30),
            ..ChallengeResult::default()
        }));

        let reply = headless.send("challenge c1 Primer Reto").await;
        assert_eq!(reply.lines[0], "[CHALLENGE] c1 +30");
        assert_eq!(headless.session().state().score, 30);
    }

    #[tokio::test]
    async fn test_meta_commands() {
        let (backend, mut headless) = headless();

        assert_eq!(headless.send("#games").await.lines.len(), 24);
        assert_eq!(headless.send("#rewards").await.lines.len(), 4);
        assert!(headless.send("#help").await.lines.len() > 10);
        assert!(headless.send("#quit").await.quit);
        assert!(backend.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_play_feedback_formats_lines() {
        let (_backend, mut headless) = headless();
        headless.send("pattern 1 2 3").await;

        let mut lines = Vec::new();
        headless.play_feedback(|line| lines.push(line)).await;

        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("[FEEDBACK] success"));
    }
}
