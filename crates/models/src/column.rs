use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::id::EntityId;

/// Wire id of the synthetic column holding athletes without an assignment.
pub const UNASSIGNED_COLUMN_ID: &str = "unassigned-athletes";

/// A drop target on the board: a program, or the unassigned bucket.
///
/// Travels as a plain string. Anything other than the sentinel is a
/// program id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ColumnId {
    Unassigned,
    Program(EntityId),
}

impl ColumnId {
    pub fn parse(raw: &str) -> Self {
        if raw == UNASSIGNED_COLUMN_ID {
            Self::Unassigned
        } else {
            Self::Program(EntityId::Text(raw.to_string()))
        }
    }
}

impl fmt::Display for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unassigned => f.write_str(UNASSIGNED_COLUMN_ID),
            Self::Program(id) => write!(f, "{id}"),
        }
    }
}

impl Serialize for ColumnId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ColumnId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}
