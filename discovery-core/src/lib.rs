//! Session engine for gamified number-pattern discovery experiences.
//!
//! This crate provides:
//! - An immutable session state with validated, atomic patches
//! - Action dispatch against the experiences API, one state update per action
//! - A FIFO feedback renderer driven by `tokio::time`
//! - Static world, tool and reward catalogs
//! - Supervised, cancellable loading of game formats with bounded retries
//! - A headless line protocol and a scripted mock backend for testing
//!
//! # Quick Start
//!
//! ```ignore
//! use discovery_core::{Action, ExperienceSession, SessionConfig};
//! use experiences_api::Client;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::from_env()?;
//!     let mut session = ExperienceSession::load(client, SessionConfig::new("session-1")).await?;
//!
//!     let report = session
//!         .dispatch(Action::PatternDiscovery { numbers: vec![5, 10, 15] })
//!         .await?;
//!     println!("{}: {}", report.feedback.title, report.feedback.message);
//!
//!     session.feedback_mut().play_pending(|m| println!("{}", m.message)).await;
//!     Ok(())
//! }
//! ```

pub mod action;
pub mod backend;
pub mod catalog;
pub mod feedback;
pub mod headless;
pub mod session;
pub mod state;
pub mod store;
pub mod supervisor;
pub mod testing;
pub mod worlds;

// Primary public API
pub use action::{analyze_pattern, Action, Pattern, PatternError};
pub use backend::ExperienceBackend;
pub use catalog::{RewardCategory, RewardDefinition};
pub use feedback::{FeedbackKind, FeedbackMessage, FeedbackRenderer};
pub use headless::{HeadlessCommand, HeadlessSession, ParseError};
pub use session::{
    ChallengeOutcome, ClaimOutcome, DispatchError, DispatchReport, ExperienceSession,
    SessionConfig,
};
pub use state::{
    ChallengeId, Hypothesis, Reward, RewardId, SessionState, StateError, StatePatch, ToolId,
    WorldId,
};
pub use store::{SessionStats, SessionStore};
pub use supervisor::{
    GameCategory, GameFormat, GameLoadError, LoadState, RecoveryOption, Severity,
    SupervisedGame, SupervisorError,
};
pub use testing::{MockBackend, MockReply, TestHarness};
