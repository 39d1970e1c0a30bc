//! Supervised loading of game formats.
//!
//! A [`SupervisedGame`] wraps the loader for one game format. Failures are
//! classified by severity, logged as structured [`ErrorReport`]s and turned
//! into a [`LoadState::Failed`] value the caller can inspect, retry a
//! bounded number of times, or abandon.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Retries allowed after the first failed load.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Reports kept by an [`ErrorLog`].
pub const MAX_ERROR_REPORTS: usize = 10;

// ============================================================================
// Game formats
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GameCategory {
    Basic,
    Advanced,
    Expert,
}

impl GameCategory {
    pub fn name(&self) -> &'static str {
        match self {
            GameCategory::Basic => "basic",
            GameCategory::Advanced => "advanced",
            GameCategory::Expert => "expert",
        }
    }
}

macro_rules! game_formats {
    ($($variant:ident => ($slug:literal, $display:literal, $category:ident)),* $(,)?) => {
        /// The playable game formats, G-01 through G-24.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
        #[serde(rename_all = "snake_case")]
        pub enum GameFormat {
            $($variant),*
        }

        impl GameFormat {
            pub const ALL: [GameFormat; 24] = [$(GameFormat::$variant),*];

            pub fn slug(&self) -> &'static str {
                match self {
                    $(GameFormat::$variant => $slug),*
                }
            }

            pub fn display_name(&self) -> &'static str {
                match self {
                    $(GameFormat::$variant => $display),*
                }
            }

            pub fn category(&self) -> GameCategory {
                match self {
                    $(GameFormat::$variant => GameCategory::$category),*
                }
            }
        }
    };
}

game_formats! {
    TriviaLightning => ("trivia_lightning", "Trivia Lightning", Basic),
    ColorMatch => ("color_match", "Color Match", Basic),
    MemoryFlip => ("memory_flip", "Memory Flip", Basic),
    PictureBingo => ("picture_bingo", "Picture Bingo", Basic),
    DragDropSorting => ("drag_drop_sorting", "Drag & Drop Sorting", Basic),
    NumberLineRace => ("number_line_race", "Número-Línea Race", Basic),
    WordBuilder => ("word_builder", "Word Builder", Basic),
    WordSearch => ("word_search", "Sopa de Letras", Basic),
    HangmanVisual => ("hangman_visual", "Hangman Visual", Basic),
    EscapeRoomMini => ("escape_room_mini", "Escape Room Mini", Advanced),
    StoryPath => ("story_path", "Story Path", Advanced),
    BoardRace => ("board_race", "Board Race", Advanced),
    Crossword => ("crossword", "Crossword", Advanced),
    WordSearchDuel => ("word_search_duel", "Word Search Duel", Advanced),
    TimedEquationDuel => ("timed_equation_duel", "Timed Equation Duel", Advanced),
    MysteryBoxReveal => ("mystery_box_reveal", "Mystery Box Reveal", Advanced),
    DebateCards => ("debate_cards", "Debate Cards", Expert),
    SimulationTycoon => ("simulation_tycoon", "Simulation Tycoon", Expert),
    CaseStudySprint => ("case_study_sprint", "Case Study Sprint", Expert),
    CodingPuzzle => ("coding_puzzle", "Coding Puzzle", Expert),
    DataLab => ("data_lab", "Data Lab", Expert),
    TimelineBuilder => ("timeline_builder", "Timeline Builder", Expert),
    ArgumentMap => ("argument_map", "Argument Map", Expert),
    AdvancedEscapeRoom => ("advanced_escape_room", "Advanced Escape Room", Expert),
}

impl GameFormat {
    pub fn from_slug(slug: &str) -> Option<GameFormat> {
        GameFormat::ALL.iter().copied().find(|g| g.slug() == slug)
    }

    /// Catalog code, e.g. `G-07`.
    pub fn code(&self) -> String {
        let index = GameFormat::ALL
            .iter()
            .position(|g| g == self)
            .unwrap_or_default();
        format!("G-{:02}", index + 1)
    }
}

impl fmt::Display for GameFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

// ============================================================================
// Errors and severity
// ============================================================================

/// A failed game load, named the way the loader reported it.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{kind}: {message}")]
pub struct GameLoadError {
    /// Error class, e.g. `TypeError` or `ChunkLoadError`.
    pub kind: String,
    pub message: String,
}

impl GameLoadError {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }

    pub fn severity(&self) -> Severity {
        let message = self.message.as_str();
        if self.kind == "ChunkLoadError"
            || self.kind == "NetworkError"
            || ["Loading chunk", "NetworkError", "Failed to fetch"]
                .iter()
                .any(|needle| message.contains(needle))
        {
            return Severity::Critical;
        }

        if self.kind == "TypeError"
            && ["Cannot read", "Cannot access", "is not a function"]
                .iter()
                .any(|needle| message.contains(needle))
        {
            return Severity::High;
        }

        if matches!(
            self.kind.as_str(),
            "ReferenceError" | "SyntaxError" | "RangeError"
        ) {
            return Severity::Medium;
        }

        Severity::Low
    }
}

impl From<experiences_api::Error> for GameLoadError {
    fn from(error: experiences_api::Error) -> Self {
        let kind = match &error {
            experiences_api::Error::Network(_) => "NetworkError",
            experiences_api::Error::Parse(_) => "SyntaxError",
            _ => "ApiError",
        };
        Self::new(kind, error.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn name(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }

    /// What to tell the learner about a failure in `game`.
    pub fn user_message(&self, game: &str) -> String {
        match self {
            Severity::Critical => format!(
                "Parece que hay un problema con la conexión o carga de {game}. \
                 Por favor, verifica tu conexión a internet y recarga la página."
            ),
            Severity::High => format!(
                "Ocurrió un error inesperado en {game}. \
                 Esto puede ser un problema temporal del navegador."
            ),
            Severity::Medium => format!(
                "Hubo un problema técnico menor con {game}. \
                 Puedes intentar nuevamente o cambiar de juego."
            ),
            Severity::Low => format!(
                "Algo salió mal con {game}, pero debería ser fácil de resolver. \
                 Intenta nuevamente."
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SupervisorError {
    #[error("Retry limit of {0} reached")]
    RetriesExhausted(u32),

    #[error("Game load was cancelled")]
    Cancelled,

    #[error("Nothing to retry: the game has not failed")]
    NotFailed,
}

// ============================================================================
// Error reports
// ============================================================================

/// Structured record of one failed load.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorReport {
    pub error_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub game_format: GameFormat,
    pub game_category: GameCategory,
    pub session_id: Option<String>,
    pub error: GameLoadError,
    pub severity: Severity,
    pub retry_count: u32,
}

/// The most recent error reports, oldest first.
#[derive(Debug, Clone)]
pub struct ErrorLog {
    reports: VecDeque<ErrorReport>,
    capacity: usize,
}

impl Default for ErrorLog {
    fn default() -> Self {
        Self::with_capacity(MAX_ERROR_REPORTS)
    }
}

impl ErrorLog {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            reports: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, report: ErrorReport) {
        if self.capacity == 0 {
            return;
        }
        while self.reports.len() >= self.capacity {
            self.reports.pop_front();
        }
        self.reports.push_back(report);
    }

    pub fn reports(&self) -> impl Iterator<Item = &ErrorReport> {
        self.reports.iter()
    }

    pub fn latest(&self) -> Option<&ErrorReport> {
        self.reports.back()
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }
}

// ============================================================================
// Supervised loading
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum LoadState<T> {
    Pending,
    Loaded(T),
    Failed {
        error: GameLoadError,
        retry_count: u32,
    },
    Cancelled,
}

impl<T> LoadState<T> {
    pub fn is_loaded(&self) -> bool {
        matches!(self, LoadState::Loaded(_))
    }

    pub fn loaded(&self) -> Option<&T> {
        match self {
            LoadState::Loaded(value) => Some(value),
            _ => None,
        }
    }
}

/// Ways out of a failed load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryOption {
    Retry { attempt: u32, max: u32 },
    Reload,
    BackToGames,
}

impl RecoveryOption {
    pub fn label(&self) -> String {
        match self {
            RecoveryOption::Retry { attempt: 0, .. } => "Intentar Nuevamente".to_string(),
            RecoveryOption::Retry { attempt, max } => {
                format!("Intentar Nuevamente ({attempt}/{max})")
            }
            RecoveryOption::Reload => "Recargar Página".to_string(),
            RecoveryOption::BackToGames => "Volver a Juegos".to_string(),
        }
    }
}

/// A game format whose loading is supervised.
pub struct SupervisedGame<T, F> {
    format: GameFormat,
    session_id: Option<String>,
    loader: F,
    state: LoadState<T>,
    retry_count: u32,
    max_retries: u32,
    cancel: CancellationToken,
    log: ErrorLog,
}

impl<T, F, Fut> SupervisedGame<T, F>
where
    F: Fn(GameFormat) -> Fut,
    Fut: Future<Output = Result<T, GameLoadError>>,
{
    pub fn new(format: GameFormat, loader: F) -> Self {
        Self {
            format,
            session_id: None,
            loader,
            state: LoadState::Pending,
            retry_count: 0,
            max_retries: DEFAULT_MAX_RETRIES,
            cancel: CancellationToken::new(),
            log: ErrorLog::default(),
        }
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn format(&self) -> GameFormat {
        self.format
    }

    pub fn state(&self) -> &LoadState<T> {
        &self.state
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn error_log(&self) -> &ErrorLog {
        &self.log
    }

    /// Token that aborts an in-flight load when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Stop the current load. A cancelled game stays cancelled.
    pub fn cancel(&mut self) {
        self.cancel.cancel();
        if !self.state.is_loaded() {
            self.state = LoadState::Cancelled;
        }
    }

    /// Run the loader.
    pub async fn load(&mut self) -> &LoadState<T> {
        if self.cancel.is_cancelled() {
            self.state = LoadState::Cancelled;
            return &self.state;
        }

        let token = self.cancel.clone();
        let result = tokio::select! {
            biased;
            _ = token.cancelled() => None,
            result = (self.loader)(self.format) => Some(result),
        };

        self.state = match result {
            None => {
                tracing::info!(game = self.format.slug(), "game load cancelled");
                LoadState::Cancelled
            }
            Some(Ok(value)) => {
                tracing::info!(
                    game = self.format.slug(),
                    retry_count = self.retry_count,
                    "game loaded"
                );
                LoadState::Loaded(value)
            }
            Some(Err(error)) => {
                self.report(&error);
                LoadState::Failed {
                    error,
                    retry_count: self.retry_count,
                }
            }
        };
        &self.state
    }

    /// Load again after a failure.
    pub async fn retry(&mut self) -> Result<&LoadState<T>, SupervisorError> {
        match &self.state {
            LoadState::Failed { .. } => {}
            LoadState::Cancelled => return Err(SupervisorError::Cancelled),
            _ => return Err(SupervisorError::NotFailed),
        }
        if self.retry_count >= self.max_retries {
            tracing::warn!(game = self.format.slug(), "max retry attempts reached");
            return Err(SupervisorError::RetriesExhausted(self.max_retries));
        }

        self.retry_count += 1;
        tracing::info!(
            game = self.format.slug(),
            "game recovery attempt {}/{}",
            self.retry_count,
            self.max_retries
        );
        Ok(self.load().await)
    }

    /// Options to offer the learner in the current state.
    pub fn recovery_options(&self) -> Vec<RecoveryOption> {
        let LoadState::Failed { error, .. } = &self.state else {
            return vec![RecoveryOption::BackToGames];
        };

        let critical = error.severity() == Severity::Critical;
        let can_retry = self.retry_count < self.max_retries;

        let mut options = Vec::new();
        if can_retry && !critical {
            options.push(RecoveryOption::Retry {
                attempt: self.retry_count,
                max: self.max_retries,
            });
        }
        if critical || !can_retry {
            options.push(RecoveryOption::Reload);
        }
        options.push(RecoveryOption::BackToGames);
        options
    }

    /// The learner-facing explanation of the current failure.
    pub fn error_message(&self) -> Option<String> {
        match &self.state {
            LoadState::Failed { error, .. } => {
                Some(error.severity().user_message(self.format.display_name()))
            }
            _ => None,
        }
    }

    fn report(&mut self, error: &GameLoadError) {
        let report = ErrorReport {
            error_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            game_format: self.format,
            game_category: self.format.category(),
            session_id: self.session_id.clone(),
            error: error.clone(),
            severity: error.severity(),
            retry_count: self.retry_count,
        };

        tracing::error!(
            error_id = %report.error_id,
            game = report.game_format.slug(),
            category = report.game_category.name(),
            session = report.session_id.as_deref().unwrap_or("-"),
            severity = report.severity.name(),
            retry_count = report.retry_count,
            error = %report.error,
            "game failed to load"
        );
        self.log.push(report);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_game_catalog() {
        assert_eq!(GameFormat::ALL.len(), 24);
        let count = |c| GameFormat::ALL.iter().filter(|g| g.category() == c).count();
        assert_eq!(count(GameCategory::Basic), 9);
        assert_eq!(count(GameCategory::Advanced), 7);
        assert_eq!(count(GameCategory::Expert), 8);

        assert_eq!(GameFormat::from_slug("word_search"), Some(GameFormat::WordSearch));
        assert_eq!(GameFormat::WordSearch.display_name(), "Sopa de Letras");
        assert_eq!(GameFormat::TriviaLightning.code(), "G-01");
        assert_eq!(GameFormat::AdvancedEscapeRoom.code(), "G-24");
        assert!(GameFormat::from_slug("chess").is_none());
    }

    #[test]
    fn test_severity_classification() {
        assert_eq!(
            GameLoadError::new("ChunkLoadError", "boom").severity(),
            Severity::Critical
        );
        assert_eq!(
            GameLoadError::new("Error", "Failed to fetch").severity(),
            Severity::Critical
        );
        assert_eq!(
            GameLoadError::new("TypeError", "Cannot read properties of undefined").severity(),
            Severity::High
        );
        assert_eq!(
            GameLoadError::new("TypeError", "x is weird").severity(),
            Severity::Low
        );
        assert_eq!(
            GameLoadError::new("RangeError", "too deep").severity(),
            Severity::Medium
        );
        assert_eq!(
            GameLoadError::from(experiences_api::Error::Network("refused".to_string()))
                .severity(),
            Severity::Critical
        );
    }

    fn report(message: String) -> ErrorReport {
        ErrorReport {
            error_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            game_format: GameFormat::Crossword,
            game_category: GameCategory::Advanced,
            session_id: None,
            error: GameLoadError::new("Error", message),
            severity: Severity::Low,
            retry_count: 0,
        }
    }

    #[test]
    fn test_error_log_without_capacity_stays_empty() {
        let mut log = ErrorLog::with_capacity(0);
        for i in 0..3 {
            log.push(report(format!("failure {i}")));
        }
        assert!(log.is_empty());
        assert!(log.latest().is_none());
    }

    #[test]
    fn test_error_log_keeps_last_ten() {
        let mut log = ErrorLog::default();
        for i in 0..12 {
            log.push(report(format!("failure {i}")));
        }
        assert_eq!(log.len(), MAX_ERROR_REPORTS);
        assert_eq!(log.reports().next().unwrap().error.message, "failure 2");
        assert_eq!(log.latest().unwrap().error.message, "failure 11");
    }

    #[tokio::test]
    async fn test_retry_until_loaded() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&attempts);
        let mut game = SupervisedGame::new(GameFormat::MemoryFlip, move |format| {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(GameLoadError::new("ReferenceError", "deck is not defined"))
                } else {
                    Ok(format.slug())
                }
            }
        })
        .with_session("s1");

        assert!(matches!(game.load().await, LoadState::Failed { retry_count: 0, .. }));
        assert_eq!(
            game.recovery_options(),
            vec![
                RecoveryOption::Retry { attempt: 0, max: 3 },
                RecoveryOption::BackToGames
            ]
        );
        assert!(game.error_message().unwrap().contains("Memory Flip"));

        game.retry().await.unwrap();
        let state = game.retry().await.unwrap();
        assert_eq!(state.loaded(), Some(&"memory_flip"));
        assert_eq!(game.retry_count(), 2);
        assert_eq!(game.error_log().len(), 2);
        assert_eq!(game.error_log().latest().unwrap().session_id.as_deref(), Some("s1"));
        assert_eq!(game.recovery_options(), vec![RecoveryOption::BackToGames]);

        assert_eq!(game.retry().await.unwrap_err(), SupervisorError::NotFailed);
    }

    #[tokio::test]
    async fn test_retries_exhausted() {
        let mut game = SupervisedGame::new(GameFormat::DataLab, |_| async {
            Err::<(), _>(GameLoadError::new("Error", "always broken"))
        });

        game.load().await;
        for _ in 0..DEFAULT_MAX_RETRIES {
            game.retry().await.unwrap();
        }

        assert_eq!(
            game.retry().await.unwrap_err(),
            SupervisorError::RetriesExhausted(DEFAULT_MAX_RETRIES)
        );
        assert_eq!(
            game.recovery_options(),
            vec![RecoveryOption::Reload, RecoveryOption::BackToGames]
        );
        assert_eq!(game.error_log().len(), 4);
    }

    #[tokio::test]
    async fn test_critical_failure_offers_reload() {
        let mut game = SupervisedGame::new(GameFormat::StoryPath, |_| async {
            Err::<(), _>(GameLoadError::new("ChunkLoadError", "Loading chunk 7 failed"))
        });

        game.load().await;
        assert_eq!(
            game.recovery_options(),
            vec![RecoveryOption::Reload, RecoveryOption::BackToGames]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_in_flight_load() {
        let mut game = SupervisedGame::new(GameFormat::BoardRace, |_| async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        });

        let token = game.cancellation_token();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            token.cancel();
        });

        assert_eq!(*game.load().await, LoadState::Cancelled);
        assert_eq!(game.retry().await.unwrap_err(), SupervisorError::Cancelled);
        assert!(game.error_log().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_before_load() {
        let mut game = SupervisedGame::new(GameFormat::ColorMatch, |_| async { Ok(1) });
        game.cancel();
        assert_eq!(*game.load().await, LoadState::Cancelled);
    }

    #[test]
    fn test_recovery_labels() {
        assert_eq!(
            RecoveryOption::Retry { attempt: 0, max: 3 }.label(),
            "Intentar Nuevamente"
        );
        assert_eq!(
            RecoveryOption::Retry { attempt: 2, max: 3 }.label(),
            "Intentar Nuevamente (2/3)"
        );
    }
}
