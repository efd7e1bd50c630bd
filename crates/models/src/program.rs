use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use ts_rs::TS;

use crate::id::EntityId;

/// A training program; rendered as a board column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct Program {
    pub id: EntityId,
    #[serde(default)]
    pub nombre: String,
    #[serde(flatten)]
    #[ts(skip)]
    pub extra: Map<String, Value>,
}

impl Program {
    pub fn new(id: impl Into<EntityId>, nombre: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            nombre: nombre.into(),
            extra: Map::new(),
        }
    }
}
