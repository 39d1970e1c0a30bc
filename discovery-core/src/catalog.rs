//! Reward catalog.
//!
//! Static definitions of every reward a learner can earn, grouped by
//! category. Rewards the server mentions but the catalog does not know are
//! still accepted with a default value.

use crate::state::{Reward, RewardId, SessionState};
use serde::Serialize;

/// Points granted for a reward the catalog does not define.
pub const DEFAULT_REWARD_POINTS: u32 = 10;

/// Where a reward is shown in the rewards album.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RewardCategory {
    Album,
    Achievements,
    Tools,
    Family,
}

impl RewardCategory {
    pub const ALL: [RewardCategory; 4] = [
        RewardCategory::Album,
        RewardCategory::Achievements,
        RewardCategory::Tools,
        RewardCategory::Family,
    ];

    /// Wire name, also sent as `reward_type` when claiming.
    pub fn name(&self) -> &'static str {
        match self {
            RewardCategory::Album => "album",
            RewardCategory::Achievements => "achievement",
            RewardCategory::Tools => "tool",
            RewardCategory::Family => "family",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    Common,
    Rare,
    Epic,
    Legendary,
}

impl Rarity {
    pub fn stars(&self) -> usize {
        match self {
            Rarity::Common => 1,
            Rarity::Rare => 2,
            Rarity::Epic => 3,
            Rarity::Legendary => 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RewardDefinition {
    pub id: RewardId,
    pub name: String,
    pub description: String,
    pub category: RewardCategory,
    pub rarity: Rarity,
    pub points: u32,
}

impl RewardDefinition {
    fn new(
        id: &str,
        name: &str,
        description: &str,
        category: RewardCategory,
        rarity: Rarity,
        points: u32,
    ) -> Self {
        Self {
            id: RewardId::from(id),
            name: name.to_string(),
            description: description.to_string(),
            category,
            rarity,
            points,
        }
    }

    /// An unclaimed reward carrying this definition's title and points.
    pub fn to_reward(&self) -> Reward {
        Reward::new(self.id.clone(), self.name.clone(), self.points)
    }
}

lazy_static::lazy_static! {
    pub static ref REWARDS: Vec<RewardDefinition> = {
        use Rarity::*;
        use RewardCategory::*;
        vec![
            RewardDefinition::new("pattern_1_1", "Patrón de 1 en 1", "Descubriste el patrón más básico", Album, Common, 10),
            RewardDefinition::new("pattern_2_2", "Patrón de 2 en 2", "Dominaste el patrón de pares", Album, Common, 15),
            RewardDefinition::new("pattern_5_5", "Patrón de 5 en 5", "Descubriste el patrón de quintos", Album, Rare, 25),
            RewardDefinition::new("pattern_10_10", "Patrón de 10 en 10", "Maestro de las decenas", Album, Epic, 50),

            RewardDefinition::new("first_pattern", "Primer Descubrimiento", "Descubriste tu primer patrón", Achievements, Common, 20),
            RewardDefinition::new("pattern_master", "Maestro de Patrones", "Descubriste 5 patrones diferentes", Achievements, Epic, 100),
            RewardDefinition::new("voice_expert", "Experto en Voz", "Usaste comandos de voz exitosamente", Achievements, Rare, 30),
            RewardDefinition::new("family_champion", "Campeón Familiar", "Compartiste 10 descubrimientos", Achievements, Epic, 75),

            RewardDefinition::new("calculadora_patrones", "Calculadora de Patrones", "Herramienta para analizar secuencias", Tools, Rare, 40),
            RewardDefinition::new("microscopio_numerico", "Microscopio Numérico", "Amplía la vista de los números", Tools, Epic, 60),

            RewardDefinition::new("shared_discovery", "Descubrimiento Compartido", "Compartiste un patrón con la familia", Family, Common, 15),
            RewardDefinition::new("family_team", "Equipo Familiar", "Completaste una actividad familiar", Family, Rare, 25),
        ]
    };
}

/// Look up a reward definition by id.
pub fn get_reward(id: &str) -> Option<&'static RewardDefinition> {
    REWARDS.iter().find(|r| r.id.as_str() == id)
}

pub fn rewards_in(category: RewardCategory) -> impl Iterator<Item = &'static RewardDefinition> {
    REWARDS.iter().filter(move |r| r.category == category)
}

pub fn category_of(id: &str) -> Option<RewardCategory> {
    get_reward(id).map(|r| r.category)
}

/// Turn a reward id into a [`Reward`], falling back to the id as title
/// and [`DEFAULT_REWARD_POINTS`] for ids the catalog does not know.
pub fn resolve_reward(id: &str) -> Reward {
    match get_reward(id) {
        Some(definition) => definition.to_reward(),
        None => Reward::new(id, id, DEFAULT_REWARD_POINTS),
    }
}

/// How much of a category the learner has earned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CategoryProgress {
    pub total: usize,
    pub earned: usize,
    pub percentage: u8,
}

pub fn category_progress(category: RewardCategory, state: &SessionState) -> CategoryProgress {
    let total = rewards_in(category).count();
    let earned = rewards_in(category)
        .filter(|definition| state.has_reward(&definition.id))
        .count();
    let percentage = if total == 0 {
        0
    } else {
        ((earned as f64 / total as f64) * 100.0).round() as u8
    };

    CategoryProgress {
        total,
        earned,
        percentage,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::StatePatch;

    #[test]
    fn test_catalog_lookup() {
        let reward = get_reward("pattern_5_5").unwrap();
        assert_eq!(reward.points, 25);
        assert_eq!(reward.rarity, Rarity::Rare);
        assert_eq!(reward.rarity.stars(), 2);
        assert_eq!(category_of("voice_expert"), Some(RewardCategory::Achievements));
        assert!(get_reward("dragon_slayer").is_none());
    }

    #[test]
    fn test_catalog_ids_unique() {
        for (i, reward) in REWARDS.iter().enumerate() {
            assert!(
                REWARDS.iter().skip(i + 1).all(|other| other.id != reward.id),
                "duplicate reward id {}",
                reward.id
            );
        }
    }

    #[test]
    fn test_category_sizes() {
        assert_eq!(rewards_in(RewardCategory::Album).count(), 4);
        assert_eq!(rewards_in(RewardCategory::Achievements).count(), 4);
        assert_eq!(rewards_in(RewardCategory::Tools).count(), 2);
        assert_eq!(rewards_in(RewardCategory::Family).count(), 2);
    }

    #[test]
    fn test_resolve_unknown_reward() {
        let reward = resolve_reward("mystery_box");
        assert_eq!(reward.title, "mystery_box");
        assert_eq!(reward.points, DEFAULT_REWARD_POINTS);
        assert!(!reward.claimed);

        let known = resolve_reward("family_team");
        assert_eq!(known.title, "Equipo Familiar");
        assert_eq!(known.points, 25);
    }

    #[test]
    fn test_category_progress() {
        let state = SessionState::new("bosque_decenas")
            .merged(
                &StatePatch::new()
                    .reward(resolve_reward("shared_discovery"))
                    .reward(resolve_reward("mystery_box")),
            )
            .unwrap();

        let family = category_progress(RewardCategory::Family, &state);
        assert_eq!(family.total, 2);
        assert_eq!(family.earned, 1);
        assert_eq!(family.percentage, 50);

        let album = category_progress(RewardCategory::Album, &state);
        assert_eq!(album.earned, 0);
        assert_eq!(album.percentage, 0);
    }
}
