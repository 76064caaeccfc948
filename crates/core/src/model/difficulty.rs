use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Index, IndexMut};
use std::str::FromStr;
use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid difficulty {provided:?}, expected one of easy|medium|hard")]
pub struct DifficultyParseError {
    pub provided: String,
}

//
// ─── DIFFICULTY ────────────────────────────────────────────────────────────────
//

/// Question difficulty tier.
///
/// Tiers are ordered `Easy < Medium < Hard`. Adaptive transitions only ever
/// move one step at a time along this order.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[default]
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// All tiers from easiest to hardest.
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    /// The next tier up, or `None` at `Hard`.
    #[must_use]
    pub fn harder(self) -> Option<Self> {
        match self {
            Difficulty::Easy => Some(Difficulty::Medium),
            Difficulty::Medium => Some(Difficulty::Hard),
            Difficulty::Hard => None,
        }
    }

    /// The next tier down, or `None` at `Easy`.
    #[must_use]
    pub fn easier(self) -> Option<Self> {
        match self {
            Difficulty::Easy => None,
            Difficulty::Medium => Some(Difficulty::Easy),
            Difficulty::Hard => Some(Difficulty::Medium),
        }
    }

    /// This tier followed by every easier tier, e.g. `hard → medium → easy`.
    pub fn downgrade_chain(self) -> impl Iterator<Item = Difficulty> {
        std::iter::successors(Some(self), |d| d.easier())
    }

    /// Parse an untrusted stored value, returning `None` for anything outside the enum.
    #[must_use]
    pub fn parse_lenient(raw: Option<&str>) -> Option<Self> {
        raw.and_then(|value| value.parse().ok())
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = DifficultyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            _ => Err(DifficultyParseError {
                provided: s.to_owned(),
            }),
        }
    }
}

//
// ─── PER-DIFFICULTY TRIPLE ─────────────────────────────────────────────────────
//

/// One value per difficulty tier.
///
/// Serializes as `{ "easy": .., "medium": .., "hard": .. }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerDifficulty<T> {
    #[serde(default)]
    pub easy: T,
    #[serde(default)]
    pub medium: T,
    #[serde(default)]
    pub hard: T,
}

impl<T> PerDifficulty<T> {
    #[must_use]
    pub fn new(easy: T, medium: T, hard: T) -> Self {
        Self { easy, medium, hard }
    }

    #[must_use]
    pub fn get(&self, difficulty: Difficulty) -> &T {
        match difficulty {
            Difficulty::Easy => &self.easy,
            Difficulty::Medium => &self.medium,
            Difficulty::Hard => &self.hard,
        }
    }

    pub fn get_mut(&mut self, difficulty: Difficulty) -> &mut T {
        match difficulty {
            Difficulty::Easy => &mut self.easy,
            Difficulty::Medium => &mut self.medium,
            Difficulty::Hard => &mut self.hard,
        }
    }

    /// Iterate `(tier, value)` pairs from easiest to hardest.
    pub fn iter(&self) -> impl Iterator<Item = (Difficulty, &T)> {
        Difficulty::ALL.into_iter().map(move |d| (d, self.get(d)))
    }

    #[must_use]
    pub fn map<U>(&self, mut f: impl FnMut(Difficulty, &T) -> U) -> PerDifficulty<U> {
        PerDifficulty {
            easy: f(Difficulty::Easy, &self.easy),
            medium: f(Difficulty::Medium, &self.medium),
            hard: f(Difficulty::Hard, &self.hard),
        }
    }
}

impl<T> Index<Difficulty> for PerDifficulty<T> {
    type Output = T;

    fn index(&self, difficulty: Difficulty) -> &T {
        self.get(difficulty)
    }
}

impl<T> IndexMut<Difficulty> for PerDifficulty<T> {
    fn index_mut(&mut self, difficulty: Difficulty) -> &mut T {
        self.get_mut(difficulty)
    }
}

impl PerDifficulty<u32> {
    #[must_use]
    pub fn total(&self) -> u32 {
        self.easy
            .saturating_add(self.medium)
            .saturating_add(self.hard)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
