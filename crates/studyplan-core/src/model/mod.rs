//! Domain types threaded through the workflow: user level, plan stages and
//! book records.

pub mod state;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use state::StudySessionState;

use crate::scoring;

// ---------------------------------------------------------------------------
// UserLevel
// ---------------------------------------------------------------------------

/// Experience level of the learner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserLevel {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

impl fmt::Display for UserLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Beginner => "beginner",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
        };
        f.write_str(s)
    }
}

impl FromStr for UserLevel {
    type Err = UserLevelParseError;

    /// Case-insensitive; surrounding whitespace is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "beginner" => Ok(Self::Beginner),
            "intermediate" => Ok(Self::Intermediate),
            "advanced" => Ok(Self::Advanced),
            _ => Err(UserLevelParseError(s.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`UserLevel`] string.
#[derive(Debug, Clone)]
pub struct UserLevelParseError(pub String);

impl fmt::Display for UserLevelParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid level {:?} (expected beginner, intermediate, or advanced)",
            self.0
        )
    }
}

impl std::error::Error for UserLevelParseError {}

// ---------------------------------------------------------------------------
// Stages
// ---------------------------------------------------------------------------

/// One sequential phase of a study plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageDescriptor {
    pub description: String,
    /// Free-form, usually "N weeks" or "N months".
    pub duration: String,
    pub prerequisites: Vec<String>,
    pub objectives: Vec<String>,
}

impl StageDescriptor {
    /// Duration assigned to a parsed stage that never states one.
    pub const DEFAULT_DURATION: &'static str = "4 weeks";

    /// Number of objectives shown per stage in the rendered document.
    pub const MAX_DISPLAYED_OBJECTIVES: usize = 5;

    /// An empty descriptor with the default duration.
    pub fn empty() -> Self {
        Self {
            description: String::new(),
            duration: Self::DEFAULT_DURATION.to_string(),
            prerequisites: Vec::new(),
            objectives: Vec::new(),
        }
    }

    /// Duration expressed in weeks: the first integer in `duration`, times
    /// four when the text mentions months. `None` when no integer is present.
    pub fn duration_weeks(&self) -> Option<u32> {
        let digits: String = self
            .duration
            .chars()
            .skip_while(|c| !c.is_ascii_digit())
            .take_while(|c| c.is_ascii_digit())
            .collect();
        let n: u32 = digits.parse().ok()?;
        if self.duration.to_lowercase().contains("month") {
            Some(n.saturating_mul(4))
        } else {
            Some(n)
        }
    }
}

/// A named stage entry in a [`PlanStructure`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanStage {
    pub name: String,
    #[serde(flatten)]
    pub descriptor: StageDescriptor,
}

/// Ordered mapping from stage name to [`StageDescriptor`].
///
/// Insertion order is pedagogical order. Re-inserting an existing name
/// replaces its descriptor without moving it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlanStructure {
    stages: Vec<PlanStage>,
}

impl PlanStructure {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a stage. Returns the previous descriptor when the
    /// name was already present.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        descriptor: StageDescriptor,
    ) -> Option<StageDescriptor> {
        let name = name.into();
        if let Some(existing) = self.stages.iter_mut().find(|s| s.name == name) {
            return Some(std::mem::replace(&mut existing.descriptor, descriptor));
        }
        if let Some(similar) = self.near_duplicate_of(&name) {
            // Stage identity is the exact name; similar spellings stay separate.
            tracing::warn!(
                stage = %name,
                existing = %similar,
                "stage name differs from an existing stage only in spelling"
            );
        }
        self.stages.push(PlanStage { name, descriptor });
        None
    }

    pub fn get(&self, name: &str) -> Option<&StageDescriptor> {
        self.stages
            .iter()
            .find(|s| s.name == name)
            .map(|s| &s.descriptor)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.stages.iter().any(|s| s.name == name)
    }

    /// Stage names in plan order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.stages.iter().map(|s| s.name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &StageDescriptor)> {
        self.stages.iter().map(|s| (s.name.as_str(), &s.descriptor))
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Sum of all stage durations in weeks. Stages without a number count as
    /// zero.
    pub fn total_weeks(&self) -> u32 {
        self.stages
            .iter()
            .filter_map(|s| s.descriptor.duration_weeks())
            .sum()
    }

    /// Name of an existing stage that matches `name` once case, punctuation
    /// and whitespace are ignored, but is not spelled identically.
    pub fn near_duplicate_of(&self, name: &str) -> Option<&str> {
        let key = loose_key(name);
        self.stages
            .iter()
            .find(|s| s.name != name && loose_key(&s.name) == key)
            .map(|s| s.name.as_str())
    }
}

fn loose_key(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

// ---------------------------------------------------------------------------
// Books
// ---------------------------------------------------------------------------

/// A recommended book. The score is derived from `rating` and
/// `review_count` on every read, so it can never go stale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookRecord {
    pub title: String,
    pub author: String,
    pub year: Option<String>,
    /// 0.0 to 5.0.
    pub rating: f64,
    pub review_count: u64,
    pub reason: String,
}

impl BookRecord {
    pub const UNKNOWN_AUTHOR: &'static str = "Unknown";
    pub const DEFAULT_REASON: &'static str = "Highly recommended resource";

    /// A record with the given title and every other field at its default.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            author: Self::UNKNOWN_AUTHOR.to_string(),
            year: None,
            rating: 0.0,
            review_count: 0,
            reason: Self::DEFAULT_REASON.to_string(),
        }
    }

    /// Popularity-weighted quality score.
    pub fn score(&self) -> f64 {
        scoring::score(self.rating, self.review_count)
    }
}
