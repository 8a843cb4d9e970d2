//! Targets of follows, reviews and ratings.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ParseEnumError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectKind {
    Performer,
    Venue,
    Business,
    Event,
}

impl SubjectKind {
    pub const ALL: [SubjectKind; 4] = [
        SubjectKind::Performer,
        SubjectKind::Venue,
        SubjectKind::Business,
        SubjectKind::Event,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Performer => "performer",
            Self::Venue => "venue",
            Self::Business => "business",
            Self::Event => "event",
        }
    }
}

impl fmt::Display for SubjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubjectKind {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "performer" => Ok(Self::Performer),
            "venue" => Ok(Self::Venue),
            "business" => Ok(Self::Business),
            "event" => Ok(Self::Event),
            other => Err(ParseEnumError::new("subject kind", other)),
        }
    }
}

/// A followable / reviewable / ratable entity, stored as a `(kind, id)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum Subject {
    Performer(Uuid),
    Venue(Uuid),
    Business(Uuid),
    Event(Uuid),
}

impl Subject {
    pub fn from_parts(kind: SubjectKind, id: Uuid) -> Self {
        match kind {
            SubjectKind::Performer => Self::Performer(id),
            SubjectKind::Venue => Self::Venue(id),
            SubjectKind::Business => Self::Business(id),
            SubjectKind::Event => Self::Event(id),
        }
    }

    pub fn parse_parts(kind: &str, id: Uuid) -> Result<Self, ParseEnumError> {
        Ok(Self::from_parts(kind.parse()?, id))
    }

    pub fn kind(&self) -> SubjectKind {
        match self {
            Self::Performer(_) => SubjectKind::Performer,
            Self::Venue(_) => SubjectKind::Venue,
            Self::Business(_) => SubjectKind::Business,
            Self::Event(_) => SubjectKind::Event,
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            Self::Performer(id) | Self::Venue(id) | Self::Business(id) | Self::Event(id) => *id,
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subject_rebuilds_from_stored_columns() {
        let id = Uuid::new_v4();
        let subject = Subject::Venue(id);
        let rebuilt = Subject::parse_parts(subject.kind().as_str(), subject.id()).unwrap();
        assert_eq!(rebuilt, subject);
        assert!(Subject::parse_parts("playlist", id).is_err());
    }

    #[test]
    fn subject_serializes_as_tagged_pair() {
        let id = Uuid::nil();
        let json = serde_json::to_value(Subject::Performer(id)).unwrap();
        assert_eq!(json["type"], "performer");
        assert_eq!(json["id"], id.to_string());
    }
}
