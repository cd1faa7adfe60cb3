use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::model::ids::NoteId;

/// Result of a tackle attempt. The set is closed; anything else is
/// rejected before it reaches the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Completed,
    Missed,
    Possible,
    Other,
}

impl Outcome {
    pub const ALL: [Self; 4] = [Self::Completed, Self::Missed, Self::Possible, Self::Other];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Missed => "missed",
            Self::Possible => "possible",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Outcome {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "completed" => Ok(Self::Completed),
            "missed" => Ok(Self::Missed),
            "possible" => Ok(Self::Possible),
            "other" => Ok(Self::Other),
            _ => Err(crate::Error::Validation(format!(
                "unknown tackle outcome {s:?} (expected completed, missed, possible or other)"
            ))),
        }
    }
}

/// A structured tackle event attached to a note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteTackle {
    pub player: String,
    pub team: Option<String>,
    pub attempt: u32,
    pub outcome: Outcome,
    pub followed: Option<String>,
}

/// One row of a tackle listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TackleRow {
    pub id: NoteId,
    pub start: f64,
    pub tackle: NoteTackle,
    pub starred: bool,
    pub zone: Option<String>,
    pub notes: Option<String>,
}

/// Optional filters for tackle listings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TackleFilter {
    pub player: Option<String>,
    pub outcome: Option<Outcome>,
    pub starred_only: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_parse_is_case_insensitive() {
        assert_eq!("Completed".parse::<Outcome>().unwrap(), Outcome::Completed);
        assert_eq!(" missed ".parse::<Outcome>().unwrap(), Outcome::Missed);
    }

    #[test]
    fn test_outcome_rejects_unknown() {
        let err = "dropped".parse::<Outcome>().unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("dropped"));
    }

    #[test]
    fn test_outcome_round_trips_through_str() {
        for outcome in Outcome::ALL {
            assert_eq!(outcome.as_str().parse::<Outcome>().unwrap(), outcome);
        }
    }
}
