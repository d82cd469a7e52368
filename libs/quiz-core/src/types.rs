//! Core types shared by the scheduler and the on-device engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ScheduleError;

/// A recall grade supplied at review time, validated to 0..=5.
///
/// Grades below 3 count as failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quality(u8);

impl Quality {
    /// Validate a raw grade. Values outside 0..=5 are rejected.
    pub fn new(value: u8) -> Result<Self, ScheduleError> {
        if value > 5 {
            return Err(ScheduleError::InvalidQuality(value));
        }
        Ok(Self(value))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Whether this grade counts as a successful recall.
    pub fn is_pass(self) -> bool {
        self.0 >= 3
    }
}

/// Spaced repetition bookkeeping for one (learner, item) pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sm2State {
    /// Count of consecutive successful reviews.
    pub repetition: u32,
    /// Days until the next review, always >= 1.
    pub interval_days: u32,
    /// Ease factor, floored at 1.3.
    pub ease_factor: f64,
}

impl Default for Sm2State {
    fn default() -> Self {
        Self {
            repetition: 0,
            interval_days: 1,
            ease_factor: 2.5,
        }
    }
}

/// Item kind: how many answers are expected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    SingleChoice,
    MultipleChoice,
}

impl Default for ItemKind {
    fn default() -> Self {
        Self::SingleChoice
    }
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SingleChoice => "single_choice",
            Self::MultipleChoice => "multiple_choice",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "single_choice" => Some(Self::SingleChoice),
            "multiple_choice" => Some(Self::MultipleChoice),
            _ => None,
        }
    }
}

/// Difficulty tier of a catalog item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Beginner => "beginner",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "beginner" => Some(Self::Beginner),
            "intermediate" => Some(Self::Intermediate),
            "advanced" => Some(Self::Advanced),
            _ => None,
        }
    }
}

/// An external reference link attached to an item explanation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub title: String,
    pub url: String,
}

/// A catalog entry. Immutable from the learner's perspective; created and
/// updated only by the sync engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub kind: ItemKind,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Difficulty>,
    pub prompt: String,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub correct_answers: Vec<u32>,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub references: Vec<Reference>,
    #[serde(default = "default_pack")]
    pub pack: String,
    #[serde(default)]
    pub locked: bool,
    /// Server-side modification time, used as the sync watermark key.
    pub updated_at: DateTime<Utc>,
}

fn default_pack() -> String {
    "core".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_accepts_full_range() {
        for v in 0..=5 {
            assert_eq!(Quality::new(v).unwrap().value(), v);
        }
    }

    #[test]
    fn quality_rejects_out_of_range() {
        assert_eq!(
            Quality::new(6),
            Err(ScheduleError::InvalidQuality(6))
        );
    }

    #[test]
    fn pass_threshold_is_three() {
        assert!(!Quality::new(2).unwrap().is_pass());
        assert!(Quality::new(3).unwrap().is_pass());
    }
}
