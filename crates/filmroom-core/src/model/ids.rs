use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! define_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            #[must_use]
            pub const fn new(raw: i64) -> Self {
                Self(raw)
            }

            #[must_use]
            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = crate::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim()
                    .parse::<i64>()
                    .ok()
                    .filter(|v| *v > 0)
                    .map(Self)
                    .ok_or_else(|| crate::Error::Validation(format!("invalid id: {s:?}")))
            }
        }

        impl rusqlite::ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
                self.0.to_sql()
            }
        }
    };
}

define_id!(NoteId, "Row id of a note, the root of every annotation.");
define_id!(VideoId, "Row id of a canonical video record.");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_id_parse() {
        assert_eq!("42".parse::<NoteId>().unwrap(), NoteId::new(42));
        assert!("0".parse::<NoteId>().is_err());
        assert!("-1".parse::<NoteId>().is_err());
        assert!("abc".parse::<NoteId>().is_err());
    }

    #[test]
    fn test_note_id_display() {
        assert_eq!(NoteId::new(7).to_string(), "7");
    }
}
