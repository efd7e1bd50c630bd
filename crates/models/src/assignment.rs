use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use ts_rs::TS;

use crate::id::EntityId;

/// `estado` written on every assignment the board creates.
pub const ACTIVE_STATUS: &str = "activo";

/// Persisted link between one athlete and one program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct Assignment {
    pub id: EntityId,
    pub atleta: EntityId,
    pub programa: EntityId,
    #[serde(default)]
    pub estado: String,
    /// Fields the board does not interpret. Kept so a full-object update
    /// sends back everything the server returned.
    #[serde(flatten)]
    #[ts(skip)]
    pub extra: Map<String, Value>,
}

impl Assignment {
    /// Copy of this assignment pointing at another program.
    pub fn moved_to(&self, programa: EntityId) -> Self {
        Self {
            programa,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct CreateAssignment {
    pub atleta: EntityId,
    pub programa: EntityId,
    pub estado: String,
}

impl CreateAssignment {
    pub fn active(atleta: EntityId, programa: EntityId) -> Self {
        Self {
            atleta,
            programa,
            estado: ACTIVE_STATUS.to_string(),
        }
    }
}
