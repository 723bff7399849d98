use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Grade
// ---------------------------------------------------------------------------

/// Letter grade. Declaration order is the strictness order: `F < D < C < B < A`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Grade {
    F,
    D,
    C,
    B,
    A,
}

impl Grade {
    /// Best first, the order used in distribution tables.
    pub fn all() -> &'static [Grade] {
        &[Grade::A, Grade::B, Grade::C, Grade::D, Grade::F]
    }

    pub fn from_score(score: u32) -> Grade {
        match score {
            75.. => Grade::A,
            55.. => Grade::B,
            35.. => Grade::C,
            20.. => Grade::D,
            _ => Grade::F,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Grade {
    type Err = String;

    /// Accepts a bare letter or a "Prelim: X" label.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let base = s.strip_prefix(PRELIM_PREFIX).unwrap_or(s).trim();
        match base {
            "A" => Ok(Grade::A),
            "B" => Ok(Grade::B),
            "C" => Ok(Grade::C),
            "D" => Ok(Grade::D),
            "F" => Ok(Grade::F),
            _ => Err(format!("unknown grade: {s}")),
        }
    }
}

pub const PRELIM_PREFIX: &str = "Prelim: ";

// ---------------------------------------------------------------------------
// WorkItemType
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum WorkItemType {
    Feature,
    UserStory,
    /// Any other type string reported by the source, kept verbatim.
    Other(String),
}

impl WorkItemType {
    pub fn parse(s: &str) -> Self {
        match s.trim() {
            "Feature" => WorkItemType::Feature,
            "User Story" => WorkItemType::UserStory,
            other => WorkItemType::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            WorkItemType::Feature => "Feature",
            WorkItemType::UserStory => "User Story",
            WorkItemType::Other(s) => s,
        }
    }
}

impl fmt::Display for WorkItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for WorkItemType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for WorkItemType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(WorkItemType::parse(&s))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
