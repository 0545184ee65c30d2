use serde::{Deserialize, Deserializer, Serialize};
use time::OffsetDateTime;

use super::project::ProjectId;

/// Repository-assigned identifier. `0` marks an entity that was never saved.
pub type ToDoId = u32;

pub const MIN_PRIORITY: u8 = 1;
pub const MAX_PRIORITY: u8 = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToDo {
    pub id: ToDoId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_priority", deserialize_with = "deserialize_priority")]
    pub priority: u8,
    #[serde(default)]
    pub is_complete: bool,
    #[serde(default)]
    pub project_id: Option<ProjectId>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub due_date: Option<OffsetDateTime>,
}

impl ToDo {
    /// Builds an unsaved to-do (`id == 0`) with the lowest priority.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            description: None,
            priority: MIN_PRIORITY,
            is_complete: false,
            project_id: None,
            due_date: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = normalize_priority(priority);
        self
    }

    pub fn in_project(mut self, project_id: ProjectId) -> Self {
        self.project_id = Some(project_id);
        self
    }

    pub fn due(mut self, due_date: OffsetDateTime) -> Self {
        self.due_date = Some(due_date);
        self
    }

    pub fn is_new(&self) -> bool {
        self.id == 0
    }
}

/// Priorities outside `1..=3` collapse to `1`.
pub fn normalize_priority(priority: u8) -> u8 {
    if (MIN_PRIORITY..=MAX_PRIORITY).contains(&priority) {
        priority
    } else {
        MIN_PRIORITY
    }
}

fn default_priority() -> u8 {
    MIN_PRIORITY
}

/// Reads any integer so one stray value in a table file cannot fail the load.
fn deserialize_priority<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    let raw = i64::deserialize(deserializer)?;
    Ok(u8::try_from(raw).map_or(MIN_PRIORITY, normalize_priority))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_priority_becomes_one() {
        assert_eq!(normalize_priority(0), 1);
        assert_eq!(normalize_priority(2), 2);
        assert_eq!(normalize_priority(3), 3);
        assert_eq!(normalize_priority(9), 1);
        assert_eq!(ToDo::new("x").with_priority(7).priority, 1);
    }

    #[test]
    fn serializes_with_camel_case_field_names() {
        let todo = ToDo::new("Design").in_project(4);
        let json = serde_json::to_value(&todo).unwrap();
        assert_eq!(json["isComplete"], false);
        assert_eq!(json["projectId"], 4);
        assert!(json.get("dueDate").is_some());
        assert!(json.get("project_id").is_none());
    }

    #[test]
    fn due_date_is_stored_as_rfc3339() {
        let todo = ToDo::new("Ship").due(time::macros::datetime!(2026-10-24 9:30 UTC));
        let json = serde_json::to_string(&todo).unwrap();
        assert!(json.contains("\"dueDate\":\"2026-10-24T09:30:00Z\""));
        let back: ToDo = serde_json::from_str(&json).unwrap();
        assert_eq!(back, todo);
    }

    #[test]
    fn stored_priority_outside_range_is_normalized() {
        let todos: Vec<ToDo> = serde_json::from_str(
            r#"[
                {"id": 1, "name": "low", "priority": -1},
                {"id": 2, "name": "huge", "priority": 256},
                {"id": 3, "name": "fine", "priority": 3}
            ]"#,
        )
        .unwrap();
        let priorities: Vec<u8> = todos.iter().map(|t| t.priority).collect();
        assert_eq!(priorities, vec![1, 1, 3]);
    }

    #[test]
    fn missing_optional_fields_fall_back_to_defaults() {
        let todo: ToDo = serde_json::from_str(r#"{"id": 3, "name": "Ship"}"#).unwrap();
        assert_eq!(todo.id, 3);
        assert_eq!(todo.priority, 1);
        assert!(!todo.is_complete);
        assert_eq!(todo.project_id, None);
        assert_eq!(todo.due_date, None);
    }
}
