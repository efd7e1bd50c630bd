//! Server-backed collections behind the board.

use std::{collections::HashMap, sync::Arc};

use models::{Assignment, Athlete, EntityId, Program};
use tokio::sync::RwLock;
use tracing::{debug, error};

use super::{board::BoardError, board_api::BoardApi};

/// Message shown in place of the board when loading fails.
pub const FETCH_ERROR_MESSAGE: &str = "Could not load the board data.";

/// One consistent view of the three collections plus the lookup maps
/// derived from them. Replaced wholesale on every successful fetch.
#[derive(Debug, Default)]
pub struct BoardSnapshot {
    /// Bumped on every successful fetch.
    pub generation: u64,
    pub programs: Vec<Program>,
    pub athletes: Vec<Athlete>,
    pub assignments: Vec<Assignment>,
    pub athletes_map: HashMap<EntityId, Athlete>,
    /// Keyed by athlete id. If the server reports more than one assignment
    /// for an athlete, the last one in collection order wins.
    pub assignments_map: HashMap<EntityId, Assignment>,
}

impl BoardSnapshot {
    pub fn new(
        generation: u64,
        programs: Vec<Program>,
        athletes: Vec<Athlete>,
        assignments: Vec<Assignment>,
    ) -> Self {
        let athletes_map = athletes
            .iter()
            .map(|athlete| (athlete.id.clone(), athlete.clone()))
            .collect();
        let assignments_map = assignments
            .iter()
            .map(|assignment| (assignment.atleta.clone(), assignment.clone()))
            .collect();

        Self {
            generation,
            programs,
            athletes,
            assignments,
            athletes_map,
            assignments_map,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StoreStatus {
    pub loading: bool,
    pub error: Option<String>,
}

#[derive(Debug, Default)]
struct StoreState {
    snapshot: Arc<BoardSnapshot>,
    in_flight: usize,
    error: Option<String>,
}

pub struct DataStore {
    api: Arc<dyn BoardApi>,
    state: RwLock<StoreState>,
}

impl DataStore {
    pub fn new(api: Arc<dyn BoardApi>) -> Self {
        Self {
            api,
            state: RwLock::new(StoreState::default()),
        }
    }

    pub async fn snapshot(&self) -> Arc<BoardSnapshot> {
        self.state.read().await.snapshot.clone()
    }

    pub async fn status(&self) -> StoreStatus {
        let state = self.state.read().await;
        StoreStatus {
            loading: state.in_flight > 0,
            error: state.error.clone(),
        }
    }

    /// Reload programs, athletes and assignments.
    ///
    /// The three reads run concurrently and are applied together. If any of
    /// them fails nothing is applied and the error flag is raised; the
    /// previous snapshot stays in place.
    pub async fn fetch_data(&self) -> Result<Arc<BoardSnapshot>, BoardError> {
        self.state.write().await.in_flight += 1;

        let result = tokio::try_join!(
            self.api.list_programs(),
            self.api.list_athletes(),
            self.api.list_assignments(),
        );

        let mut state = self.state.write().await;
        state.in_flight -= 1;

        match result {
            Ok((programs, athletes, assignments)) => {
                let generation = state.snapshot.generation + 1;
                debug!(
                    generation,
                    programs = programs.len(),
                    athletes = athletes.len(),
                    assignments = assignments.len(),
                    "Board data loaded"
                );
                state.snapshot = Arc::new(BoardSnapshot::new(
                    generation,
                    programs,
                    athletes,
                    assignments,
                ));
                state.error = None;
                Ok(state.snapshot.clone())
            }
            Err(e) => {
                error!(error = %e, "Failed to load board data");
                state.error = Some(FETCH_ERROR_MESSAGE.to_string());
                Err(BoardError::FetchFailed(e))
            }
        }
    }
}
