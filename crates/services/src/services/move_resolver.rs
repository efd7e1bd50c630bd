//! Turns a card move into at most one assignment mutation.

use std::{collections::HashMap, sync::Arc};

use models::{Assignment, ColumnId, CreateAssignment, EntityId};
use serde::{Deserialize, Serialize};
use strum_macros::Display;
use tracing::{debug, info, warn};
use ts_rs::TS;

use super::{board_api::BoardApi, data_store::DataStore};

/// A card dropped on a column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct MoveCommand {
    pub athlete_id: EntityId,
    #[ts(type = "string")]
    pub from: ColumnId,
    #[ts(type = "string")]
    pub to: ColumnId,
}

impl MoveCommand {
    pub fn new(athlete_id: impl Into<EntityId>, from: ColumnId, to: ColumnId) -> Self {
        Self {
            athlete_id: athlete_id.into(),
            from,
            to,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NoOpReason {
    /// Dropped back onto the column it came from.
    SameColumn,
    /// Dropped on the unassigned column but no assignment exists.
    AlreadyUnassigned,
    /// Program-to-program move for an athlete without an assignment.
    NoAssignment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MutationKind {
    Create,
    Update,
    Delete,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MovePlan {
    NoOp(NoOpReason),
    Create(CreateAssignment),
    Delete { assignment_id: EntityId },
    Update(Assignment),
}

/// Decide what a move means for the backend.
///
/// Rules, first match wins:
/// 1. same column: nothing to do
/// 2. from the unassigned column: create an active assignment, or re-point
///    the athlete's dangling one (its program is gone) so an athlete never
///    holds two
/// 3. to the unassigned column: delete the current assignment, if any
/// 4. program to program: re-point the current assignment, if any
pub fn plan_move(command: &MoveCommand, assignments_map: &HashMap<EntityId, Assignment>) -> MovePlan {
    if command.from == command.to {
        return MovePlan::NoOp(NoOpReason::SameColumn);
    }

    match (&command.from, &command.to) {
        (ColumnId::Unassigned, ColumnId::Program(program_id)) => {
            match assignments_map.get(&command.athlete_id) {
                Some(dangling) => MovePlan::Update(dangling.moved_to(program_id.clone())),
                None => MovePlan::Create(CreateAssignment::active(
                    command.athlete_id.clone(),
                    program_id.clone(),
                )),
            }
        }
        (_, ColumnId::Unassigned) => match assignments_map.get(&command.athlete_id) {
            Some(current) => MovePlan::Delete {
                assignment_id: current.id.clone(),
            },
            None => MovePlan::NoOp(NoOpReason::AlreadyUnassigned),
        },
        (ColumnId::Program(_), ColumnId::Program(program_id)) => {
            match assignments_map.get(&command.athlete_id) {
                Some(current) => MovePlan::Update(current.moved_to(program_id.clone())),
                None => MovePlan::NoOp(NoOpReason::NoAssignment),
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MoveOutcome {
    Skipped { reason: NoOpReason },
    Applied { mutation: MutationKind },
    Failed { mutation: MutationKind, error: String },
}

pub struct MoveResolver {
    api: Arc<dyn BoardApi>,
    store: Arc<DataStore>,
}

impl MoveResolver {
    pub fn new(api: Arc<dyn BoardApi>, store: Arc<DataStore>) -> Self {
        Self { api, store }
    }

    /// Plan against the latest snapshot, issue the mutation, then refetch.
    ///
    /// Mutation failures are logged and reported in the outcome, never
    /// raised. The refetch runs whether or not the mutation succeeded; a
    /// no-op plan touches the backend not at all.
    pub async fn execute(&self, command: &MoveCommand) -> MoveOutcome {
        let snapshot = self.store.snapshot().await;
        let plan = plan_move(command, &snapshot.assignments_map);

        let (mutation, result) = match &plan {
            MovePlan::NoOp(reason) => {
                debug!(
                    athlete_id = %command.athlete_id,
                    from = %command.from,
                    to = %command.to,
                    reason = %reason,
                    "Move ignored"
                );
                return MoveOutcome::Skipped { reason: *reason };
            }
            MovePlan::Create(payload) => (
                MutationKind::Create,
                self.api.create_assignment(payload).await,
            ),
            MovePlan::Delete { assignment_id } => (
                MutationKind::Delete,
                self.api.delete_assignment(assignment_id).await,
            ),
            MovePlan::Update(assignment) => (
                MutationKind::Update,
                self.api.update_assignment(assignment).await,
            ),
        };

        let outcome = match result {
            Ok(()) => {
                info!(
                    athlete_id = %command.athlete_id,
                    from = %command.from,
                    to = %command.to,
                    mutation = %mutation,
                    "Assignment updated"
                );
                MoveOutcome::Applied { mutation }
            }
            Err(e) => {
                warn!(
                    athlete_id = %command.athlete_id,
                    from = %command.from,
                    to = %command.to,
                    mutation = %mutation,
                    error = %e,
                    "Assignment mutation failed"
                );
                MoveOutcome::Failed {
                    mutation,
                    error: e.to_string(),
                }
            }
        };

        // Errors are logged inside fetch_data and surface through the store status.
        let _ = self.store.fetch_data().await;

        outcome
    }
}
