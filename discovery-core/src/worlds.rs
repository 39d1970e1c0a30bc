//! The worlds a learner travels through and the tools they can unlock.
//!
//! Worlds are ordered: reaching a world implies every earlier world has
//! been unlocked.

use crate::state::{ToolId, WorldId};
use serde::Serialize;

/// A world with its number range and counting pattern.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorldInfo {
    pub id: WorldId,
    pub name: String,
    pub min: i64,
    pub max: i64,
    /// Counting step practised in this world.
    pub step: i64,
}

impl WorldInfo {
    fn new(id: &str, name: &str, min: i64, max: i64, step: i64) -> Self {
        Self {
            id: WorldId::from(id),
            name: name.to_string(),
            min,
            max,
            step,
        }
    }

    /// The pattern name, e.g. "de 5 en 5".
    pub fn pattern(&self) -> String {
        pattern_name(self.step)
    }

    pub fn range(&self) -> String {
        format!("{}-{}", self.min, self.max)
    }

    pub fn contains(&self, n: i64) -> bool {
        (self.min..=self.max).contains(&n)
    }
}

/// An unlockable tool.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolInfo {
    pub id: ToolId,
    pub name: String,
    pub description: String,
}

impl ToolInfo {
    fn new(id: &str, name: &str, description: &str) -> Self {
        Self {
            id: ToolId::from(id),
            name: name.to_string(),
            description: description.to_string(),
        }
    }
}

lazy_static::lazy_static! {
    /// Worlds in unlock order.
    pub static ref WORLDS: Vec<WorldInfo> = vec![
        WorldInfo::new("bosque_decenas", "Bosque de las Decenas", 0, 20, 1),
        WorldInfo::new("rio_cincos", "Río de los Cincos", 0, 50, 5),
        WorldInfo::new("montana_cientos", "Montaña de los Cientos", 0, 100, 10),
    ];

    pub static ref TOOLS: Vec<ToolInfo> = vec![
        ToolInfo::new(
            "calculadora_patrones",
            "Calculadora de Patrones",
            "Herramienta para descubrir reglas numéricas",
        ),
        ToolInfo::new(
            "microscopio_numerico",
            "Microscopio Numérico",
            "Herramienta para analizar secuencias",
        ),
    ];
}

/// Name a constant-step pattern the way learners read it aloud.
pub fn pattern_name(step: i64) -> String {
    format!("de {step} en {step}")
}

pub fn get_world(id: &WorldId) -> Option<&'static WorldInfo> {
    WORLDS.iter().find(|w| &w.id == id)
}

pub fn get_tool(id: &ToolId) -> Option<&'static ToolInfo> {
    TOOLS.iter().find(|t| &t.id == id)
}

/// Position of a world in unlock order.
pub fn world_index(id: &WorldId) -> Option<usize> {
    WORLDS.iter().position(|w| &w.id == id)
}

/// Every world up to and including `id`. Unknown worlds yield nothing.
pub fn worlds_through(id: &WorldId) -> &'static [WorldInfo] {
    match world_index(id) {
        Some(index) => &WORLDS[..=index],
        None => &[],
    }
}

/// The world unlocked after `id`, if any.
pub fn next_world(id: &WorldId) -> Option<&'static WorldInfo> {
    world_index(id).and_then(|index| WORLDS.get(index + 1))
}
