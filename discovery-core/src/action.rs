//! Learner actions and client-side pattern analysis.

use crate::state::ToolId;
use crate::worlds::pattern_name;
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

/// Minimum sequence length that can form a pattern.
pub const MIN_PATTERN_LENGTH: usize = 3;

/// Something the learner did that is reported to the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Selected numbers; the pattern is worked out locally.
    PatternDiscovery { numbers: Vec<i64> },
    HypothesisTest { pattern: String, numbers: Vec<i64> },
    DragDrop {
        source: String,
        target: String,
        numbers: Vec<i64>,
    },
    VoiceCommand { command: String, expected: String },
    ToolUse { tool_id: ToolId },
    FamilyActivity { activity: String },
    /// Any action type this client has no dedicated handling for.
    Other { action_type: String, data: Value },
}

impl Action {
    /// The `action_type` sent on the wire.
    pub fn action_type(&self) -> &str {
        match self {
            Action::PatternDiscovery { .. } => "pattern_discovery",
            Action::HypothesisTest { .. } => "hypothesis_test",
            Action::DragDrop { .. } => "drag_drop",
            Action::VoiceCommand { .. } => "voice_command",
            Action::ToolUse { .. } => "tool_use",
            Action::FamilyActivity { .. } => "family_activity",
            Action::Other { action_type, .. } => action_type,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Action::Other { .. })
    }

    /// The `action_data` object sent on the wire.
    pub fn action_data(&self) -> Value {
        match self {
            Action::PatternDiscovery { numbers } => match analyze_pattern(numbers) {
                Ok(pattern) => json!({
                    "numbers": pattern.numbers,
                    "difference": pattern.step,
                    "pattern": pattern.name,
                }),
                Err(_) => json!({ "numbers": numbers }),
            },
            Action::HypothesisTest { pattern, numbers } => {
                json!({ "pattern": pattern, "numbers": numbers })
            }
            Action::DragDrop {
                source,
                target,
                numbers,
            } => json!({ "source": source, "target": target, "numbers": numbers }),
            Action::VoiceCommand { command, expected } => {
                json!({ "command": command, "expected": expected })
            }
            Action::ToolUse { tool_id } => json!({ "tool_id": tool_id }),
            Action::FamilyActivity { activity } => json!({ "activity": activity }),
            Action::Other { data, .. } => data.clone(),
        }
    }

    /// Whether the action holds up before asking the server.
    ///
    /// Pattern discoveries must form a pattern and voice commands must
    /// contain the expected phrase; other actions are left to the server.
    pub fn locally_valid(&self) -> bool {
        match self {
            Action::PatternDiscovery { numbers } => analyze_pattern(numbers).is_ok(),
            Action::VoiceCommand { command, expected } => {
                !expected.trim().is_empty()
                    && command.to_lowercase().contains(&expected.to_lowercase())
            }
            _ => true,
        }
    }
}

/// A constant-step sequence found in the learner's numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pattern {
    /// The numbers in ascending order.
    pub numbers: Vec<i64>,
    pub step: i64,
    /// e.g. "de 2 en 2"
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("Select at least 3 numbers (got {0})")]
    TooFew(usize),

    #[error("Numbers repeat, so there is no step between them")]
    Repeated,

    #[error("Differences are not constant: {0:?}")]
    Inconsistent(Vec<i64>),

    #[error("Numbers are too far apart to compare")]
    Overflow,
}

/// Find the constant step in a set of numbers.
///
/// The numbers are sorted first, so selection order does not matter.
pub fn analyze_pattern(numbers: &[i64]) -> Result<Pattern, PatternError> {
    if numbers.len() < MIN_PATTERN_LENGTH {
        return Err(PatternError::TooFew(numbers.len()));
    }

    let mut sorted = numbers.to_vec();
    sorted.sort_unstable();

    let differences: Vec<i64> = sorted
        .windows(2)
        .map(|w| w[1].checked_sub(w[0]))
        .collect::<Option<_>>()
        .ok_or(PatternError::Overflow)?;
    let step = differences[0];
    if differences.iter().any(|d| *d != step) {
        return Err(PatternError::Inconsistent(differences));
    }
    if step == 0 {
        return Err(PatternError::Repeated);
    }

    Ok(Pattern {
        numbers: sorted,
        step,
        name: pattern_name(step),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analyze_sorted_pattern() {
        let pattern = analyze_pattern(&[6, 2, 4, 8]).unwrap();
        assert_eq!(pattern.numbers, vec![2, 4, 6, 8]);
        assert_eq!(pattern.step, 2);
        assert_eq!(pattern.name, "de 2 en 2");
    }

    #[test]
    fn test_analyze_extreme_numbers() {
        assert_eq!(
            analyze_pattern(&[i64::MIN, 0, i64::MAX]),
            Err(PatternError::Overflow)
        );
        assert!(!Action::PatternDiscovery {
            numbers: vec![i64::MIN, 0, i64::MAX]
        }
        .locally_valid());

        let pattern = analyze_pattern(&[i64::MAX - 2, i64::MAX - 1, i64::MAX]).unwrap();
        assert_eq!(pattern.step, 1);
    }

    #[test]
    fn test_analyze_rejects() {
        assert_eq!(analyze_pattern(&[5, 10]), Err(PatternError::TooFew(2)));
        assert_eq!(analyze_pattern(&[3, 3, 3]), Err(PatternError::Repeated));
        assert_eq!(
            analyze_pattern(&[1, 2, 4]),
            Err(PatternError::Inconsistent(vec![1, 2]))
        );
    }

    #[test]
    fn test_action_types() {
        assert_eq!(
            Action::PatternDiscovery { numbers: vec![] }.action_type(),
            "pattern_discovery"
        );
        assert_eq!(
            Action::ToolUse {
                tool_id: ToolId::from("calculadora_patrones")
            }
            .action_type(),
            "tool_use"
        );
        let other = Action::Other {
            action_type: "dance".to_string(),
            data: Value::Null,
        };
        assert_eq!(other.action_type(), "dance");
        assert!(!other.is_known());
    }

    #[test]
    fn test_pattern_action_data() {
        let data = Action::PatternDiscovery {
            numbers: vec![15, 5, 10],
        }
        .action_data();
        assert_eq!(data["numbers"], json!([5, 10, 15]));
        assert_eq!(data["difference"], 5);
        assert_eq!(data["pattern"], "de 5 en 5");

        let invalid = Action::PatternDiscovery {
            numbers: vec![1, 7],
        }
        .action_data();
        assert_eq!(invalid, json!({"numbers": [1, 7]}));
    }

    #[test]
    fn test_voice_command_local_check() {
        let ok = Action::VoiceCommand {
            command: "Dos en dos".to_string(),
            expected: "dos en dos".to_string(),
        };
        assert!(ok.locally_valid());

        let wrong = Action::VoiceCommand {
            command: "tres".to_string(),
            expected: "dos en dos".to_string(),
        };
        assert!(!wrong.locally_valid());
    }
}
