//! Feedback messages and the renderer that shows them one at a time.
//!
//! [`feedback_for`] maps an action outcome to the message the learner sees,
//! plus an achievement when the outcome earns one. [`FeedbackRenderer`]
//! queues messages and shows each for its full duration in FIFO order.

use crate::action::{analyze_pattern, Action};
use crate::catalog;
use crate::state::Reward;
use crate::worlds;
use serde::Serialize;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

/// Number of numbers in a discovery that earns `pattern_master`.
const PATTERN_MASTER_LENGTH: usize = 5;

/// Points for the achievement granted with a newly unlocked tool.
const TOOL_ACHIEVEMENT_POINTS: u32 = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackKind {
    Success,
    Error,
    Warning,
    Info,
    Achievement,
}

impl FeedbackKind {
    pub fn name(&self) -> &'static str {
        match self {
            FeedbackKind::Success => "success",
            FeedbackKind::Error => "error",
            FeedbackKind::Warning => "warning",
            FeedbackKind::Info => "info",
            FeedbackKind::Achievement => "achievement",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Waveform {
    Sine,
    Sawtooth,
    Square,
    Triangle,
}

/// A short synthesized tone played with a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SoundCue {
    pub frequency_hz: u32,
    pub duration: Duration,
    pub waveform: Waveform,
}

impl SoundCue {
    const fn new(frequency_hz: u32, millis: u64, waveform: Waveform) -> Self {
        Self {
            frequency_hz,
            duration: Duration::from_millis(millis),
            waveform,
        }
    }

    pub const SUCCESS: SoundCue = SoundCue::new(800, 300, Waveform::Sine);
    pub const ERROR: SoundCue = SoundCue::new(400, 200, Waveform::Sawtooth);
    pub const WARNING: SoundCue = SoundCue::new(600, 250, Waveform::Square);
    pub const ACHIEVEMENT: SoundCue = SoundCue::new(1000, 500, Waveform::Sine);
    pub const PATTERN: SoundCue = SoundCue::new(1200, 400, Waveform::Triangle);
}

/// A transient message shown to the learner.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedbackMessage {
    pub kind: FeedbackKind,
    pub title: String,
    pub message: String,
    pub duration: Duration,
    pub sound: Option<SoundCue>,
    pub celebrate: bool,
}

impl FeedbackMessage {
    pub fn new(
        kind: FeedbackKind,
        title: impl Into<String>,
        message: impl Into<String>,
        duration_ms: u64,
    ) -> Self {
        Self {
            kind,
            title: title.into(),
            message: message.into(),
            duration: Duration::from_millis(duration_ms),
            sound: None,
            celebrate: false,
        }
    }

    pub fn with_sound(mut self, sound: SoundCue) -> Self {
        self.sound = Some(sound);
        self
    }

    pub fn with_celebration(mut self) -> Self {
        self.celebrate = true;
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// A failure the learner should know about.
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(FeedbackKind::Error, "Algo salió mal", message, 3000).with_sound(SoundCue::ERROR)
    }

    pub fn warning(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(FeedbackKind::Warning, title, message, 3000).with_sound(SoundCue::WARNING)
    }

    pub fn challenge_completed(name: &str) -> Self {
        Self::new(
            FeedbackKind::Success,
            "¡Desafío Completado!",
            format!("Completaste: {name}"),
            4000,
        )
        .with_sound(SoundCue::ACHIEVEMENT)
        .with_celebration()
    }

    pub fn reward_claimed(title: &str, points: u32) -> Self {
        Self::new(
            FeedbackKind::Achievement,
            "¡Recompensa Reclamada!",
            format!("{title} (+{points} puntos)"),
            5000,
        )
        .with_sound(SoundCue::ACHIEVEMENT)
        .with_celebration()
    }
}

/// What the learner sees for one action, and what it earned.
#[derive(Debug, Clone, PartialEq)]
pub struct Feedback {
    pub message: FeedbackMessage,
    pub achievement: Option<Reward>,
}

impl Feedback {
    fn plain(message: FeedbackMessage) -> Self {
        Self {
            message,
            achievement: None,
        }
    }
}

/// Map an action outcome to the learner-facing feedback.
pub fn feedback_for(action: &Action, valid: bool) -> Feedback {
    match action {
        Action::PatternDiscovery { numbers } => {
            let pattern = analyze_pattern(numbers).ok().filter(|_| valid);
            match pattern {
                Some(pattern) => Feedback {
                    message: FeedbackMessage::new(
                        FeedbackKind::Success,
                        "¡Patrón Descubierto!",
                        format!("Has encontrado el patrón: {}", pattern.name),
                        4000,
                    )
                    .with_sound(SoundCue::PATTERN)
                    .with_celebration(),
                    achievement: (pattern.numbers.len() >= PATTERN_MASTER_LENGTH)
                        .then(|| catalog::resolve_reward("pattern_master")),
                },
                None => Feedback::plain(
                    FeedbackMessage::new(
                        FeedbackKind::Error,
                        "Intenta de Nuevo",
                        "Los números seleccionados no siguen un patrón claro",
                        3000,
                    )
                    .with_sound(SoundCue::ERROR),
                ),
            }
        }
        Action::VoiceCommand { expected, .. } => {
            if valid {
                Feedback::plain(
                    FeedbackMessage::new(
                        FeedbackKind::Success,
                        "¡Excelente Pronunciación!",
                        format!("Identificaste correctamente: {expected}"),
                        3500,
                    )
                    .with_sound(SoundCue::SUCCESS),
                )
            } else {
                Feedback::plain(FeedbackMessage::warning(
                    "No Te Entendí",
                    "Intenta decir \"uno en uno\", \"dos en dos\", etc.",
                ))
            }
        }
        Action::HypothesisTest { pattern, .. } => {
            if valid {
                Feedback::plain(
                    FeedbackMessage::new(
                        FeedbackKind::Success,
                        "¡Hipótesis Confirmada!",
                        format!("Tu regla \"{pattern}\" funciona"),
                        3500,
                    )
                    .with_sound(SoundCue::SUCCESS),
                )
            } else {
                Feedback::plain(FeedbackMessage::warning(
                    "Revisa tu Hipótesis",
                    format!("La regla \"{pattern}\" no encaja con los números"),
                ))
            }
        }
        Action::DragDrop { .. } => {
            if valid {
                Feedback::plain(
                    FeedbackMessage::new(
                        FeedbackKind::Success,
                        "¡Bien Ordenado!",
                        "Los números quedaron en su lugar",
                        3000,
                    )
                    .with_sound(SoundCue::SUCCESS),
                )
            } else {
                Feedback::plain(FeedbackMessage::warning(
                    "Casi Lo Logras",
                    "Revisa el orden de los números",
                ))
            }
        }
        Action::ToolUse { tool_id } if valid => {
            let tool_name = worlds::get_tool(tool_id)
                .map(|t| t.name.clone())
                .unwrap_or_else(|| tool_id.to_string());
            Feedback {
                message: FeedbackMessage::new(
                    FeedbackKind::Achievement,
                    "¡Nueva Herramienta!",
                    format!("Has desbloqueado: {tool_name}"),
                    5000,
                )
                .with_sound(SoundCue::ACHIEVEMENT)
                .with_celebration(),
                achievement: Some(Reward::new(
                    format!("tool_{tool_id}"),
                    "Herramienta Desbloqueada",
                    TOOL_ACHIEVEMENT_POINTS,
                )),
            }
        }
        Action::FamilyActivity { .. } => Feedback::plain(
            FeedbackMessage::new(
                FeedbackKind::Success,
                "¡Compartido con la Familia!",
                "Tu descubrimiento se compartió exitosamente",
                4000,
            )
            .with_sound(SoundCue::SUCCESS)
            .with_celebration(),
        ),
        Action::ToolUse { .. } | Action::Other { .. } => Feedback::plain(
            FeedbackMessage::new(
                FeedbackKind::Info,
                "Información",
                "Acción procesada correctamente",
                2000,
            )
            .with_sound(SoundCue::SUCCESS),
        ),
    }
}

// ============================================================================
// Renderer
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum RendererState {
    Idle,
    Showing {
        message: FeedbackMessage,
        until: Instant,
    },
}

/// FIFO queue of messages shown one at a time.
#[derive(Debug)]
pub struct FeedbackRenderer {
    state: RendererState,
    queue: VecDeque<FeedbackMessage>,
}

impl Default for FeedbackRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl FeedbackRenderer {
    pub fn new() -> Self {
        Self {
            state: RendererState::Idle,
            queue: VecDeque::new(),
        }
    }

    pub fn enqueue(&mut self, message: FeedbackMessage) {
        tracing::debug!(kind = message.kind.name(), title = %message.title, "feedback queued");
        self.queue.push_back(message);
    }

    /// Advance the renderer to `now`.
    ///
    /// Returns the message that started showing on this tick, if any. At
    /// most one message starts per tick so that none is skipped unseen.
    pub fn tick(&mut self, now: Instant) -> Option<FeedbackMessage> {
        if let Some(until) = self.next_deadline() {
            if now < until {
                return None;
            }
            self.state = RendererState::Idle;
        }

        let message = self.queue.pop_front()?;
        self.state = RendererState::Showing {
            message: message.clone(),
            until: now + message.duration,
        };
        Some(message)
    }

    /// The message on screen, if any.
    pub fn current(&self) -> Option<&FeedbackMessage> {
        match &self.state {
            RendererState::Showing { message, .. } => Some(message),
            RendererState::Idle => None,
        }
    }

    pub fn state(&self) -> &RendererState {
        &self.state
    }

    /// Messages waiting behind the current one.
    pub fn pending(&self) -> impl Iterator<Item = &FeedbackMessage> {
        self.queue.iter()
    }

    pub fn pending_len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_idle(&self) -> bool {
        self.state == RendererState::Idle && self.queue.is_empty()
    }

    /// When the current message ends.
    pub fn next_deadline(&self) -> Option<Instant> {
        match &self.state {
            RendererState::Showing { until, .. } => Some(*until),
            RendererState::Idle => None,
        }
    }

    /// Show every queued message in order, waiting out each duration.
    pub async fn play_pending<F>(&mut self, mut on_show: F)
    where
        F: FnMut(&FeedbackMessage),
    {
        loop {
            if let Some(message) = self.tick(Instant::now()) {
                on_show(&message);
            }
            match self.next_deadline() {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => break,
            }
        }
    }
}
