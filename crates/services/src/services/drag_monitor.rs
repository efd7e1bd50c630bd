//! Adapts pointer-drag drop events into board move commands.

use models::{ColumnId, EntityId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use super::{board::BoardCommand, move_resolver::MoveCommand};

pub const CARD_TYPE: &str = "card";
pub const COLUMN_TYPE: &str = "column";

const INSTANCE_ID_KEY: &str = "instanceId";
const TYPE_KEY: &str = "type";
const ITEM_ID_KEY: &str = "itemId";
const COLUMN_ID_KEY: &str = "columnId";

/// Free-form data attached to a draggable or a drop target.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DragData {
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl DragData {
    pub fn new(data: Value) -> Self {
        match data {
            Value::Object(data) => Self { data },
            _ => Self::default(),
        }
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DropLocation {
    /// Innermost target first, as reported by the drag library.
    #[serde(default)]
    pub drop_targets: Vec<DragData>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DragLocation {
    #[serde(default)]
    pub current: DropLocation,
}

/// The drop event as delivered by the drag library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DropEvent {
    pub source: DragData,
    #[serde(default)]
    pub location: DragLocation,
}

/// A drop payload that breaks the board's own tagging contract. Always a
/// bug in the code that tagged the draggable or the drop target.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DragPayloadError {
    #[error("itemId must be a string or an integer, got {0}")]
    ItemId(Value),
    #[error("source columnId must be a string, got {0}")]
    SourceColumn(Value),
    #[error("no drop target carries a string columnId")]
    TargetColumn,
}

#[derive(Debug, Clone)]
pub struct DragMonitor {
    instance_id: String,
    commands: mpsc::Sender<BoardCommand>,
}

impl DragMonitor {
    pub fn new(instance_id: impl Into<String>, commands: mpsc::Sender<BoardCommand>) -> Self {
        Self {
            instance_id: instance_id.into(),
            commands,
        }
    }

    /// Extract the move described by a drop.
    ///
    /// `Ok(None)` for drops this board does not care about: another board's
    /// drag, a drop outside any target, or a dragged item that is not a
    /// card. The column-tagged target wins over nested card targets.
    pub fn adapt(&self, event: &DropEvent) -> Result<Option<MoveCommand>, DragPayloadError> {
        let source = &event.source;
        if source.str_field(INSTANCE_ID_KEY) != Some(self.instance_id.as_str()) {
            return Ok(None);
        }

        let targets = &event.location.current.drop_targets;
        if targets.is_empty() {
            return Ok(None);
        }

        if source.str_field(TYPE_KEY) != Some(CARD_TYPE) {
            return Ok(None);
        }

        let athlete_id = match source.data.get(ITEM_ID_KEY) {
            Some(Value::String(id)) => EntityId::Text(id.clone()),
            Some(Value::Number(n)) => n
                .as_i64()
                .map(EntityId::Number)
                .ok_or_else(|| DragPayloadError::ItemId(Value::Number(n.clone())))?,
            other => {
                return Err(DragPayloadError::ItemId(
                    other.cloned().unwrap_or(Value::Null),
                ));
            }
        };

        let from = match source.data.get(COLUMN_ID_KEY) {
            Some(Value::String(column)) => ColumnId::parse(column),
            other => {
                return Err(DragPayloadError::SourceColumn(
                    other.cloned().unwrap_or(Value::Null),
                ));
            }
        };

        let to = targets
            .iter()
            .find(|target| {
                target.str_field(TYPE_KEY) == Some(COLUMN_TYPE)
                    && target.data.contains_key(COLUMN_ID_KEY)
            })
            .or_else(|| {
                targets
                    .iter()
                    .find(|target| target.data.contains_key(COLUMN_ID_KEY))
            })
            .and_then(|target| target.str_field(COLUMN_ID_KEY))
            .map(ColumnId::parse)
            .ok_or(DragPayloadError::TargetColumn)?;

        Ok(Some(MoveCommand { athlete_id, from, to }))
    }

    /// Handle a drop from the UI: adapt it and queue the move on the board.
    ///
    /// A malformed payload aborts in debug builds. Release builds log it and
    /// drop the event.
    pub async fn on_drop(&self, event: &DropEvent) -> Option<MoveCommand> {
        let command = match self.adapt(event) {
            Ok(Some(command)) => command,
            Ok(None) => {
                debug!(instance_id = %self.instance_id, "Drop ignored");
                return None;
            }
            Err(e) => {
                error!(instance_id = %self.instance_id, error = %e, "Invalid drag payload");
                if cfg!(debug_assertions) {
                    panic!("invalid drag payload: {e}");
                }
                return None;
            }
        };

        let message = BoardCommand::Move {
            command: command.clone(),
            reply: None,
        };
        if self.commands.send(message).await.is_err() {
            warn!(instance_id = %self.instance_id, "Board is shut down, drop discarded");
            return None;
        }
        Some(command)
    }
}

/// Data a card draggable should carry for this board.
pub fn card_data(instance_id: &str, athlete_id: &EntityId, column: &ColumnId) -> Value {
    serde_json::json!({
        INSTANCE_ID_KEY: instance_id,
        TYPE_KEY: CARD_TYPE,
        ITEM_ID_KEY: athlete_id,
        COLUMN_ID_KEY: column,
    })
}

/// Data a column drop target should carry for this board.
pub fn column_data(instance_id: &str, column: &ColumnId) -> Value {
    serde_json::json!({
        INSTANCE_ID_KEY: instance_id,
        TYPE_KEY: COLUMN_TYPE,
        COLUMN_ID_KEY: column,
    })
}
