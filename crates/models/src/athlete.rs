use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use ts_rs::TS;

use crate::id::EntityId;

/// An athlete card. Read-only from the board's perspective.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct Athlete {
    pub id: EntityId,
    #[serde(default)]
    pub nombre: String,
    #[serde(default)]
    pub ap_paterno: String,
    #[serde(default)]
    pub ap_materno: String,
    /// Remaining fields from the athlete record, passed through untouched.
    #[serde(flatten)]
    #[ts(skip)]
    pub extra: Map<String, Value>,
}

impl Athlete {
    pub fn new(
        id: impl Into<EntityId>,
        nombre: impl Into<String>,
        ap_paterno: impl Into<String>,
        ap_materno: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            nombre: nombre.into(),
            ap_paterno: ap_paterno.into(),
            ap_materno: ap_materno.into(),
            extra: Map::new(),
        }
    }

    /// Name as shown on the card and matched by the board search.
    pub fn full_name(&self) -> String {
        format!("{} {} {}", self.nombre, self.ap_paterno, self.ap_materno)
    }
}
