//! Repository API consumed by request handlers and front-ends.
//!
//! Expected negative outcomes are sentinels (`None`, `false`, empty `Vec`),
//! never errors. Every list accessor returns an owned snapshot.

use crate::domain::project::{Project, ProjectId, ProjectStatistics};
use crate::domain::todo::{ToDo, ToDoId};

pub mod memory;

pub trait ToDoRepository {
    /// Inserts when `todo.id == 0`, replaces in place when the id exists.
    ///
    /// Returns `None` for a blank name, an unknown non-zero id, or a
    /// `project_id` that names no live project.
    fn add_or_update_todo(&self, todo: ToDo) -> Option<ToDo>;
    fn todo_by_id(&self, id: ToDoId) -> Option<ToDo>;
    fn delete_todo(&self, id: ToDoId) -> Option<ToDo>;
    fn list_todos(&self) -> Vec<ToDo>;
    fn todos_by_project(&self, project_id: ProjectId) -> Vec<ToDo>;
    /// `None` or `Some(0)` clears the reference. Fails without mutation when
    /// either side is missing.
    fn assign_to_project(&self, todo_id: ToDoId, project_id: Option<ProjectId>) -> bool;
    fn toggle_complete(&self, id: ToDoId) -> Option<ToDo>;
    /// Clears the collection and inserts `todos`. Returns how many were kept.
    fn replace_todos(&self, todos: Vec<ToDo>) -> usize;
}

pub trait ProjectRepository {
    fn add_or_update_project(&self, project: Project) -> Option<Project>;
    fn project_by_id(&self, id: ProjectId) -> Option<Project>;
    /// Unassigns every to-do pointing at the project, then removes it.
    fn delete_project(&self, id: ProjectId) -> Option<Project>;
    fn list_projects(&self) -> Vec<Project>;
    fn projects_by_completion(&self, complete: bool) -> Vec<Project>;
    /// Recomputes `complete_percent` from the project's to-dos.
    fn refresh_completion(&self, id: ProjectId) -> Option<Project>;
    fn statistics(&self) -> ProjectStatistics;
    fn overall_progress(&self) -> f64;
    fn replace_projects(&self, projects: Vec<Project>) -> usize;
}
