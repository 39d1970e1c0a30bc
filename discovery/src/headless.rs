//! Headless mode for discovery sessions.
//!
//! A line-oriented protocol over stdin/stdout, designed for scripted runs
//! and automated agents.

use discovery_core::headless::{format_state, help_text, HeadlessSession};
use discovery_core::{DispatchError, ExperienceSession, SessionConfig};
use experiences_api::{Client, ClientConfig};
use std::io::{self, BufRead, Write};

const DEFAULT_SESSION_ID: &str = "headless";

/// Options parsed from the command line.
#[derive(Debug, Clone, Default)]
pub struct HeadlessOptions {
    pub session_id: Option<String>,
    pub experience: Option<String>,
    /// `None` keeps the build-profile default.
    pub strict_actions: Option<bool>,
}

/// Run a session in headless mode.
///
/// Output lines are tagged: `[STATE]`, `[RESULT]`, `[REWARD]`,
/// `[FEEDBACK]`, `[ERROR]` and friends.
pub async fn run_headless(options: HeadlessOptions) -> Result<(), DispatchError> {
    let mut client_config = ClientConfig::from_env()?;
    if let Some(experience) = options.experience {
        client_config = client_config.with_experience(experience);
    }
    let client = Client::try_new(client_config)?;

    let session_id = options
        .session_id
        .or_else(|| std::env::var("EXPERIENCES_SESSION_ID").ok())
        .unwrap_or_else(|| DEFAULT_SESSION_ID.to_string());
    let mut session_config = SessionConfig::new(session_id);
    if let Some(strict) = options.strict_actions {
        session_config = session_config.with_strict_actions(strict);
    }

    let session = ExperienceSession::load(client, session_config).await?;
    tracing::info!(session = %session.config().session_id, "headless session started");
    let mut headless = HeadlessSession::new(session);

    println!("=== Discovery Headless Mode ===");
    println!("Session: {}", headless.session().config().session_id);
    println!("{}", format_state(headless.session().state()));
    println!();
    for line in help_text() {
        println!("{line}");
    }
    println!();
    println!("Enter your actions (one per line):");
    println!();

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                eprintln!("Error reading input: {e}");
                break;
            }
        };

        let reply = headless.send(&line).await;
        for out in &reply.lines {
            println!("{out}");
        }
        stdout.flush().ok();

        headless
            .play_feedback(|out| {
                println!("{out}");
                io::stdout().flush().ok();
            })
            .await;

        if reply.quit {
            break;
        }
    }

    let state = headless.session().state();
    tracing::info!(
        world = %state.current_world,
        score = state.score,
        challenges = state.completed_challenges.len(),
        "headless session ended"
    );
    Ok(())
}

/// Parse headless options from command line arguments.
pub fn parse_options_from_args(args: &[String]) -> HeadlessOptions {
    let mut options = HeadlessOptions::default();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--session" => {
                if let Some(id) = args.get(i + 1) {
                    options.session_id = Some(id.clone());
                    i += 1;
                }
            }
            "--experience" => {
                if let Some(slug) = args.get(i + 1) {
                    options.experience = Some(slug.clone());
                    i += 1;
                }
            }
            "--strict" => options.strict_actions = Some(true),
            "--lenient" => options.strict_actions = Some(false),
            _ => {}
        }
        i += 1;
    }

    options
}
