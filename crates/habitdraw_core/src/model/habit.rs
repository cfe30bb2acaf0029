//! Habit domain model and request shapes.
//!
//! # Responsibility
//! - Define the persisted `Habit` record and its JSON shape.
//! - Define creation (`NewHabit`) and partial update (`HabitPatch`) inputs.
//! - Validate user-supplied text before it reaches the store.
//!
//! # Invariants
//! - `name` and `frequency` are never empty after trimming.
//! - `streak` and `completed_today` only change through completion and reset,
//!   never through `HabitPatch`.

use serde::{Deserialize, Deserializer, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Store-assigned habit identifier.
pub type HabitId = i64;

/// How often a habit is meant to be done.
///
/// Unknown tags are kept verbatim in [`Frequency::Other`] so they round-trip
/// unchanged through the store and the API.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Frequency {
    Daily,
    Weekly,
    Other(String),
}

impl Frequency {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Other(value) => value.as_str(),
        }
    }
}

impl From<String> for Frequency {
    fn from(value: String) -> Self {
        match value.as_str() {
            "daily" => Self::Daily,
            "weekly" => Self::Weekly,
            _ => Self::Other(value),
        }
    }
}

impl From<&str> for Frequency {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<Frequency> for String {
    fn from(value: Frequency) -> Self {
        match value {
            Frequency::Other(value) => value,
            known => known.as_str().to_string(),
        }
    }
}

impl Display for Frequency {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tracked habit as stored and as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Habit {
    pub id: HabitId,
    pub name: String,
    pub description: Option<String>,
    pub frequency: Frequency,
    /// Consecutive successful completions.
    pub streak: u32,
    /// Set by completion, cleared by the daily reset.
    pub completed_today: bool,
}

/// Validation errors for habit input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HabitValidationError {
    EmptyName,
    EmptyFrequency,
}

impl Display for HabitValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "habit name must not be empty"),
            Self::EmptyFrequency => write!(f, "habit frequency must not be empty"),
        }
    }
}

impl Error for HabitValidationError {}

/// Creation input. New habits always start with `streak = 0` and
/// `completed_today = false`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewHabit {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub frequency: String,
}

impl NewHabit {
    pub fn new(name: impl Into<String>, frequency: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            frequency: frequency.into(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Returns a trimmed copy, or the first validation failure.
    pub fn normalized(&self) -> Result<Self, HabitValidationError> {
        Ok(Self {
            name: normalize_name(&self.name)?,
            description: self.description.clone(),
            frequency: normalize_frequency(&self.frequency)?,
        })
    }
}

/// Partial update input.
///
/// `None` means "leave unchanged". For `description`, `Some(None)` clears the
/// value and `Some(Some(""))` stores an empty string; JSON `null` maps to the
/// former and an omitted key to `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct HabitPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "explicit_nullable")]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub frequency: Option<String>,
}

impl HabitPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.frequency.is_none()
    }

    /// Returns a trimmed copy, or the first validation failure.
    ///
    /// An explicitly supplied empty `name` or `frequency` is rejected rather
    /// than treated as omitted.
    pub fn normalized(&self) -> Result<Self, HabitValidationError> {
        Ok(Self {
            name: self.name.as_deref().map(normalize_name).transpose()?,
            description: self.description.clone(),
            frequency: self
                .frequency
                .as_deref()
                .map(normalize_frequency)
                .transpose()?,
        })
    }
}

fn normalize_name(value: &str) -> Result<String, HabitValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(HabitValidationError::EmptyName);
    }
    Ok(trimmed.to_string())
}

fn normalize_frequency(value: &str) -> Result<String, HabitValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(HabitValidationError::EmptyFrequency);
    }
    Ok(trimmed.to_string())
}

// Present-but-null deserializes to `Some(None)`; `#[serde(default)]` covers
// the absent case.
fn explicit_nullable<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}
