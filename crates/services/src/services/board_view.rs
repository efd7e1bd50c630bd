//! Pure projection from the store's collections to what the board renders.

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    sync::Arc,
};

use models::{Athlete, EntityId, Program};
use serde::Serialize;
use ts_rs::TS;

use super::data_store::{BoardSnapshot, StoreStatus};

/// A program column with the athletes currently assigned to it.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
pub struct ProgramColumn {
    #[serde(flatten)]
    #[ts(flatten)]
    pub program: Program,
    /// Athlete ids, in assignment collection order.
    pub tasks: Vec<EntityId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct BoardView {
    pub program_columns: Vec<ProgramColumn>,
    pub unassigned_athletes: Vec<Athlete>,
    pub athletes_map: BTreeMap<String, Athlete>,
    pub loading: bool,
    pub error: Option<String>,
    pub search_term: String,
}

/// Build the board view.
///
/// Every athlete lands in exactly one place. An athlete counts as placed
/// when its effective assignment (the one in `assignments_map`) points at a
/// program that exists; otherwise it is shown as unassigned. Assignments
/// for athletes the server did not list are not rendered.
///
/// A non-empty `search_term` filters the unassigned list and each column's
/// tasks by case-insensitive substring match on the full name. Columns left
/// without matches stay in the view.
pub fn build_view(snapshot: &BoardSnapshot, status: &StoreStatus, search_term: &str) -> BoardView {
    let program_ids: HashSet<&EntityId> = snapshot.programs.iter().map(|p| &p.id).collect();

    let mut tasks_by_program: HashMap<&EntityId, Vec<EntityId>> = HashMap::new();
    let mut placed: HashSet<&EntityId> = HashSet::new();

    let effective_index: HashMap<&EntityId, usize> = snapshot
        .assignments
        .iter()
        .enumerate()
        .map(|(index, assignment)| (&assignment.atleta, index))
        .collect();

    for (index, assignment) in snapshot.assignments.iter().enumerate() {
        let is_effective = effective_index.get(&assignment.atleta) == Some(&index);
        if !is_effective
            || !snapshot.athletes_map.contains_key(&assignment.atleta)
            || !program_ids.contains(&assignment.programa)
        {
            continue;
        }
        placed.insert(&assignment.atleta);
        tasks_by_program
            .entry(&assignment.programa)
            .or_default()
            .push(assignment.atleta.clone());
    }

    let matcher = NameMatcher::new(search_term);

    let program_columns = snapshot
        .programs
        .iter()
        .map(|program| {
            // Duplicate program ids: the first column takes the athletes.
            let tasks = tasks_by_program
                .remove(&program.id)
                .unwrap_or_default()
                .into_iter()
                .filter(|athlete_id| {
                    snapshot
                        .athletes_map
                        .get(athlete_id)
                        .is_some_and(|athlete| matcher.matches(athlete))
                })
                .collect();
            ProgramColumn {
                program: program.clone(),
                tasks,
            }
        })
        .collect();

    let unassigned_athletes = snapshot
        .athletes
        .iter()
        .filter(|athlete| !placed.contains(&athlete.id) && matcher.matches(athlete))
        .cloned()
        .collect();

    let athletes_map = snapshot
        .athletes_map
        .iter()
        .map(|(id, athlete)| (id.to_string(), athlete.clone()))
        .collect();

    BoardView {
        program_columns,
        unassigned_athletes,
        athletes_map,
        loading: status.loading,
        error: status.error.clone(),
        search_term: search_term.to_string(),
    }
}

struct NameMatcher {
    needle: Option<String>,
}

impl NameMatcher {
    fn new(search_term: &str) -> Self {
        Self {
            needle: (!search_term.is_empty()).then(|| search_term.to_lowercase()),
        }
    }

    fn matches(&self, athlete: &Athlete) -> bool {
        match &self.needle {
            None => true,
            Some(needle) => athlete.full_name().to_lowercase().contains(needle.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct ViewKey {
    generation: u64,
    status: StoreStatus,
    search_term: String,
}

/// Memoized `build_view`: rebuilds only when the snapshot generation, the
/// store status or the search term changed.
#[derive(Debug, Default)]
pub struct ViewCache {
    entry: Option<(ViewKey, Arc<BoardView>)>,
}

impl ViewCache {
    pub fn get_or_build(
        &mut self,
        snapshot: &BoardSnapshot,
        status: &StoreStatus,
        search_term: &str,
    ) -> Arc<BoardView> {
        let key = ViewKey {
            generation: snapshot.generation,
            status: status.clone(),
            search_term: search_term.to_string(),
        };

        if let Some((cached_key, view)) = &self.entry {
            if *cached_key == key {
                return view.clone();
            }
        }

        let view = Arc::new(build_view(snapshot, status, search_term));
        self.entry = Some((key, view.clone()));
        view
    }
}

#[cfg(test)]
mod tests {
    use models::Assignment;
    use proptest::prelude::*;

    use super::*;

    fn assignment(id: i64, atleta: i64, programa: impl Into<EntityId>) -> Assignment {
        Assignment {
            id: EntityId::from(id),
            atleta: EntityId::from(atleta),
            programa: programa.into(),
            estado: "activo".to_string(),
            extra: Default::default(),
        }
    }

    fn sample() -> BoardSnapshot {
        BoardSnapshot::new(
            3,
            vec![Program::new(1, "Fuerza"), Program::new(2, "Resistencia")],
            vec![
                Athlete::new(10, "Ana", "Lopez", "Diaz"),
                Athlete::new(11, "Beto", "Ruiz", "Paz"),
                Athlete::new(12, "Carla", "Diaz", "Mora"),
                Athlete::new(13, "Dario", "Vega", "Luna"),
            ],
            vec![
                assignment(5, 12, 2),
                assignment(6, 10, 1),
                assignment(7, 11, "2"),
            ],
        )
    }

    fn ids(raw: &[i64]) -> Vec<EntityId> {
        raw.iter().copied().map(EntityId::from).collect()
    }

    #[test]
    fn test_columns_follow_assignment_order() {
        let view = build_view(&sample(), &StoreStatus::default(), "");

        assert_eq!(view.program_columns[0].tasks, ids(&[10]));
        assert_eq!(view.program_columns[1].tasks, ids(&[12, 11]));
        assert_eq!(
            view.unassigned_athletes
                .iter()
                .map(|a| a.id.clone())
                .collect::<Vec<_>>(),
            ids(&[13])
        );
        assert_eq!(view.athletes_map.len(), 4);
    }

    #[test]
    fn test_search_is_case_insensitive_and_keeps_empty_columns() {
        let view = build_view(&sample(), &StoreStatus::default(), "DIAZ");

        assert_eq!(view.program_columns.len(), 2);
        assert_eq!(view.program_columns[0].tasks, ids(&[10]));
        assert_eq!(view.program_columns[1].tasks, ids(&[12]));
        assert!(view.unassigned_athletes.is_empty());
        assert_eq!(view.search_term, "DIAZ");

        let view = build_view(&sample(), &StoreStatus::default(), "luna");
        assert!(view.program_columns.iter().all(|c| c.tasks.is_empty()));
        assert_eq!(view.unassigned_athletes.len(), 1);
    }

    #[test]
    fn test_search_spans_name_parts() {
        let view = build_view(&sample(), &StoreStatus::default(), "ana lopez");
        assert_eq!(view.program_columns[0].tasks, ids(&[10]));
        assert!(view.program_columns[1].tasks.is_empty());
    }

    #[test]
    fn test_dangling_assignment_leaves_athlete_unassigned() {
        let snapshot = BoardSnapshot::new(
            1,
            vec![Program::new(1, "Fuerza")],
            vec![Athlete::new(10, "Ana", "Lopez", "Diaz")],
            vec![assignment(5, 10, 99), assignment(6, 77, 1)],
        );
        let view = build_view(&snapshot, &StoreStatus::default(), "");

        assert!(view.program_columns[0].tasks.is_empty());
        assert_eq!(view.unassigned_athletes.len(), 1);
    }

    #[test]
    fn test_status_is_carried_into_view() {
        let status = StoreStatus {
            loading: true,
            error: Some("down".to_string()),
        };
        let view = build_view(&BoardSnapshot::default(), &status, "");
        assert!(view.loading);
        assert_eq!(view.error.as_deref(), Some("down"));
    }

    #[test]
    fn test_view_serializes_for_the_frontend() {
        let view = build_view(&sample(), &StoreStatus::default(), "");
        let json = serde_json::to_value(&view).unwrap();

        assert_eq!(json["programColumns"][0]["nombre"], "Fuerza");
        assert_eq!(json["programColumns"][0]["tasks"], serde_json::json!([10]));
        assert_eq!(json["unassignedAthletes"][0]["apPaterno"], "Vega");
        assert_eq!(json["athletesMap"]["10"]["nombre"], "Ana");
    }

    #[test]
    fn test_cache_rebuilds_only_on_input_change() {
        let snapshot = sample();
        let status = StoreStatus::default();
        let mut cache = ViewCache::default();

        let first = cache.get_or_build(&snapshot, &status, "");
        let again = cache.get_or_build(&snapshot, &status, "");
        assert!(Arc::ptr_eq(&first, &again));

        let filtered = cache.get_or_build(&snapshot, &status, "ana");
        assert!(!Arc::ptr_eq(&first, &filtered));

        let loading = StoreStatus {
            loading: true,
            error: None,
        };
        let while_loading = cache.get_or_build(&snapshot, &loading, "ana");
        assert!(!Arc::ptr_eq(&filtered, &while_loading));
    }

    fn snapshot_strategy() -> impl Strategy<Value = BoardSnapshot> {
        (1usize..5, 0usize..12).prop_flat_map(|(program_count, athlete_count)| {
            let link = (0..athlete_count as i64 + 2, 0..program_count as i64 + 2);
            proptest::collection::vec(link, 0..20).prop_map(move |links| {
                let programs = (0..program_count as i64)
                    .map(|i| Program::new(i, format!("P{i}")))
                    .collect();
                let athletes = (0..athlete_count as i64)
                    .map(|i| Athlete::new(100 + i, format!("N{i}"), "Ap", "Am"))
                    .collect();
                let assignments = links
                    .into_iter()
                    .enumerate()
                    .map(|(n, (athlete, program))| {
                        let programa = if n % 2 == 0 {
                            EntityId::from(program)
                        } else {
                            EntityId::from(program.to_string())
                        };
                        assignment(n as i64, 100 + athlete, programa)
                    })
                    .collect();
                BoardSnapshot::new(1, programs, athletes, assignments)
            })
        })
    }

    proptest! {
        /// Property: each listed athlete appears exactly once across the
        /// unassigned list and all columns.
        #[test]
        fn prop_every_athlete_in_exactly_one_place(snapshot in snapshot_strategy()) {
            let view = build_view(&snapshot, &StoreStatus::default(), "");

            for athlete in &snapshot.athletes {
                let in_unassigned = view
                    .unassigned_athletes
                    .iter()
                    .filter(|a| a.id == athlete.id)
                    .count();
                let in_columns: usize = view
                    .program_columns
                    .iter()
                    .map(|c| c.tasks.iter().filter(|id| **id == athlete.id).count())
                    .sum();
                prop_assert_eq!(in_unassigned + in_columns, 1);
            }
        }

        /// Property: filtering then clearing the search gives back the
        /// unfiltered view and leaves the snapshot untouched.
        #[test]
        fn prop_clearing_search_restores_view(
            snapshot in snapshot_strategy(),
            term in "[a-zA-Z0-9 ]{1,4}",
        ) {
            let status = StoreStatus::default();
            let assignments_before = snapshot.assignments.clone();
            let before = build_view(&snapshot, &status, "");
            let _filtered = build_view(&snapshot, &status, &term);
            let after = build_view(&snapshot, &status, "");

            prop_assert_eq!(before, after);
            prop_assert_eq!(assignments_before, snapshot.assignments.clone());
        }
    }
}
