//! The six fixed task-type labels used to filter candidate game files.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One of the six task families a game file can belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum TaskType {
    PickAndPlaceSimple = 1,
    LookAtObjInLight = 2,
    PickCleanThenPlaceInRecep = 3,
    PickHeatThenPlaceInRecep = 4,
    PickCoolThenPlaceInRecep = 5,
    PickTwoObjAndPlace = 6,
}

impl TaskType {
    /// All task types in their fixed numeric order.
    pub const ALL: [TaskType; 6] = [
        TaskType::PickAndPlaceSimple,
        TaskType::LookAtObjInLight,
        TaskType::PickCleanThenPlaceInRecep,
        TaskType::PickHeatThenPlaceInRecep,
        TaskType::PickCoolThenPlaceInRecep,
        TaskType::PickTwoObjAndPlace,
    ];

    /// The label used both for `task_type` query matching and in the
    /// `/task-types` response.
    pub fn label(&self) -> &'static str {
        match self {
            TaskType::PickAndPlaceSimple => "pick_and_place_simple",
            TaskType::LookAtObjInLight => "look_at_obj_in_light",
            TaskType::PickCleanThenPlaceInRecep => "pick_clean_then_place_in_recep",
            TaskType::PickHeatThenPlaceInRecep => "pick_heat_then_place_in_recep",
            TaskType::PickCoolThenPlaceInRecep => "pick_cool_then_place_in_recep",
            TaskType::PickTwoObjAndPlace => "pick_two_obj_and_place",
        }
    }

    pub fn from_code(code: u8) -> Option<TaskType> {
        TaskType::ALL.into_iter().find(|t| *t as u8 == code)
    }

    /// Look up a task type by its wire label (the `task_type` query/body field).
    pub fn from_label(label: &str) -> Option<TaskType> {
        TaskType::ALL.into_iter().find(|t| t.label() == label)
    }

    /// The numeric-code → label map served verbatim by `GET /task-types`.
    pub fn label_map() -> BTreeMap<u8, &'static str> {
        TaskType::ALL.into_iter().map(|t| (t as u8, t.label())).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_contains_six_distinct_labels() {
        let labels: std::collections::HashSet<_> =
            TaskType::ALL.iter().map(|t| t.label()).collect();
        assert_eq!(labels.len(), 6);
    }

    #[test]
    fn from_code_round_trips() {
        for t in TaskType::ALL {
            assert_eq!(TaskType::from_code(t as u8), Some(t));
        }
        assert_eq!(TaskType::from_code(0), None);
        assert_eq!(TaskType::from_code(7), None);
    }

    #[test]
    fn from_label_round_trips() {
        for t in TaskType::ALL {
            assert_eq!(TaskType::from_label(t.label()), Some(t));
        }
        assert_eq!(TaskType::from_label("not_a_real_label"), None);
    }

    #[test]
    fn label_map_has_six_entries() {
        let map = TaskType::label_map();
        assert_eq!(map.len(), 6);
        assert_eq!(map.get(&1), Some(&"pick_and_place_simple"));
        assert_eq!(map.get(&6), Some(&"pick_two_obj_and_place"));
    }
}
