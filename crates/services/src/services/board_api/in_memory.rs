//! In-process backend that records every call, for tests.

use std::{
    collections::HashSet,
    sync::{Mutex, MutexGuard, PoisonError},
};

use async_trait::async_trait;
use models::{Assignment, Athlete, CreateAssignment, EntityId, Program};
use serde_json::Map;

use super::{BoardApi, BoardApiError};

#[derive(Debug, Clone, PartialEq)]
pub enum ApiCall {
    ListPrograms,
    ListAthletes,
    ListAssignments,
    Create(CreateAssignment),
    Update(Assignment),
    Delete(EntityId),
}

impl ApiCall {
    pub fn is_mutation(&self) -> bool {
        matches!(self, Self::Create(_) | Self::Update(_) | Self::Delete(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailOn {
    ListPrograms,
    ListAthletes,
    ListAssignments,
    Create,
    Update,
    Delete,
}

#[derive(Debug, Default)]
struct State {
    programs: Vec<Program>,
    athletes: Vec<Athlete>,
    assignments: Vec<Assignment>,
    next_id: i64,
    calls: Vec<ApiCall>,
    failing: HashSet<FailOn>,
}

#[derive(Debug, Default)]
pub struct InMemoryBoardApi {
    state: Mutex<State>,
}

impl InMemoryBoardApi {
    pub fn new(programs: Vec<Program>, athletes: Vec<Athlete>, assignments: Vec<Assignment>) -> Self {
        Self {
            state: Mutex::new(State {
                programs,
                athletes,
                assignments,
                next_id: 1000,
                ..State::default()
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.state().calls.clone()
    }

    pub fn mutation_calls(&self) -> Vec<ApiCall> {
        self.state()
            .calls
            .iter()
            .filter(|c| c.is_mutation())
            .cloned()
            .collect()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    pub fn assignments(&self) -> Vec<Assignment> {
        self.state().assignments.clone()
    }

    pub fn set_failing(&self, op: FailOn, failing: bool) {
        let mut state = self.state();
        if failing {
            state.failing.insert(op);
        } else {
            state.failing.remove(&op);
        }
    }

    fn record(&self, call: ApiCall, op: FailOn) -> Result<MutexGuard<'_, State>, BoardApiError> {
        let mut state = self.state();
        state.calls.push(call);
        if state.failing.contains(&op) {
            return Err(BoardApiError::Http {
                status: 500,
                body: format!("{op:?} failed"),
            });
        }
        Ok(state)
    }
}

fn not_found(id: &EntityId) -> BoardApiError {
    BoardApiError::Http {
        status: 404,
        body: format!("assignment {id} not found"),
    }
}

#[async_trait]
impl BoardApi for InMemoryBoardApi {
    async fn list_programs(&self) -> Result<Vec<Program>, BoardApiError> {
        let state = self.record(ApiCall::ListPrograms, FailOn::ListPrograms)?;
        Ok(state.programs.clone())
    }

    async fn list_athletes(&self) -> Result<Vec<Athlete>, BoardApiError> {
        let state = self.record(ApiCall::ListAthletes, FailOn::ListAthletes)?;
        Ok(state.athletes.clone())
    }

    async fn list_assignments(&self) -> Result<Vec<Assignment>, BoardApiError> {
        let state = self.record(ApiCall::ListAssignments, FailOn::ListAssignments)?;
        Ok(state.assignments.clone())
    }

    async fn create_assignment(&self, payload: &CreateAssignment) -> Result<(), BoardApiError> {
        let mut state = self.record(ApiCall::Create(payload.clone()), FailOn::Create)?;
        let id = state.next_id;
        state.next_id += 1;
        state.assignments.push(Assignment {
            id: EntityId::Number(id),
            atleta: payload.atleta.clone(),
            programa: payload.programa.clone(),
            estado: payload.estado.clone(),
            extra: Map::new(),
        });
        Ok(())
    }

    async fn update_assignment(&self, assignment: &Assignment) -> Result<(), BoardApiError> {
        let mut state = self.record(ApiCall::Update(assignment.clone()), FailOn::Update)?;
        let existing = state
            .assignments
            .iter_mut()
            .find(|a| a.id == assignment.id)
            .ok_or_else(|| not_found(&assignment.id))?;
        *existing = assignment.clone();
        Ok(())
    }

    async fn delete_assignment(&self, id: &EntityId) -> Result<(), BoardApiError> {
        let mut state = self.record(ApiCall::Delete(id.clone()), FailOn::Delete)?;
        let before = state.assignments.len();
        state.assignments.retain(|a| &a.id != id);
        if state.assignments.len() == before {
            return Err(not_found(id));
        }
        Ok(())
    }
}
