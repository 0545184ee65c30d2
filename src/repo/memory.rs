use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use super::{ProjectRepository, ToDoRepository};
use crate::domain::project::{Project, ProjectId, ProjectStatistics, clamp_percent};
use crate::domain::todo::{ToDo, ToDoId, normalize_priority};
use crate::usecase::progress;

#[derive(Debug, Default)]
struct Tables {
    todos: Vec<ToDo>,
    projects: Vec<Project>,
}

impl Tables {
    fn has_project(&self, id: ProjectId) -> bool {
        self.projects.iter().any(|p| p.id == id)
    }

    /// Clears references to projects that are no longer present.
    fn drop_dangling_references(&mut self) -> usize {
        let live: HashSet<ProjectId> = self.projects.iter().map(|p| p.id).collect();
        let mut cleared = 0;
        for todo in &mut self.todos {
            if let Some(project_id) = todo.project_id
                && !live.contains(&project_id)
            {
                warn!(todo_id = todo.id, project_id, "clearing reference to missing project");
                todo.project_id = None;
                cleared += 1;
            }
        }
        cleared
    }
}

/// Both entity collections behind a single lock.
///
/// One critical section covers a project delete and the unassignment of its
/// to-dos, so readers never observe a dangling `project_id`.
#[derive(Debug, Default)]
pub struct InMemoryRepo {
    tables: Mutex<Tables>,
}

impl InMemoryRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_seed(
        projects: impl IntoIterator<Item = Project>,
        todos: impl IntoIterator<Item = ToDo>,
    ) -> Self {
        let repo = Self::default();
        repo.replace_projects(projects.into_iter().collect());
        repo.replace_todos(todos.into_iter().collect());
        repo
    }

    /// Fixed demonstration data set.
    pub fn demo() -> Self {
        let projects = vec![
            Project {
                id: 1,
                name: "Website Redesign".into(),
                description: Some("Complete redesign of company website with modern UI/UX".into()),
                complete_percent: 75,
            },
            Project {
                id: 2,
                name: "Mobile App Development".into(),
                description: Some("Develop cross-platform mobile application".into()),
                complete_percent: 30,
            },
            Project {
                id: 3,
                name: "Database Migration".into(),
                description: Some("Migrate legacy database to new cloud infrastructure".into()),
                complete_percent: 100,
            },
        ];
        let mut wireframes = ToDo::new("Draft wireframes").in_project(1).with_priority(2);
        wireframes.is_complete = true;
        let mut archive = ToDo::new("Archive legacy tables").in_project(3);
        archive.is_complete = true;
        let todos = vec![
            wireframes,
            ToDo::new("Review color palette").in_project(1),
            ToDo::new("Set up CI for mobile builds").in_project(2).with_priority(3),
            archive,
            ToDo::new("Write release notes")
                .with_description("Summarize changes for the next release"),
        ];
        Self::with_seed(projects, todos)
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// `None` once the id space is exhausted.
fn next_id(ids: impl Iterator<Item = u32>) -> Option<u32> {
    match ids.max() {
        Some(max) => max.checked_add(1),
        None => Some(1),
    }
}

impl ToDoRepository for InMemoryRepo {
    fn add_or_update_todo(&self, mut todo: ToDo) -> Option<ToDo> {
        if todo.name.trim().is_empty() {
            debug!(todo_id = todo.id, "rejected to-do without a name");
            return None;
        }
        todo.priority = normalize_priority(todo.priority);
        todo.project_id = todo.project_id.filter(|id| *id != 0);

        let mut tables = self.lock();
        if let Some(project_id) = todo.project_id
            && !tables.has_project(project_id)
        {
            debug!(todo_id = todo.id, project_id, "rejected to-do for missing project");
            return None;
        }

        if todo.is_new() {
            let Some(id) = next_id(tables.todos.iter().map(|t| t.id)) else {
                warn!("to-do ids exhausted, insert rejected");
                return None;
            };
            todo.id = id;
            tables.todos.push(todo.clone());
            debug!(todo_id = todo.id, "to-do inserted");
            return Some(todo);
        }

        let Some(slot) = tables.todos.iter_mut().find(|t| t.id == todo.id) else {
            debug!(todo_id = todo.id, "update rejected, no such to-do");
            return None;
        };
        *slot = todo.clone();
        debug!(todo_id = todo.id, "to-do updated");
        Some(todo)
    }

    fn todo_by_id(&self, id: ToDoId) -> Option<ToDo> {
        if id == 0 {
            return None;
        }
        self.lock().todos.iter().find(|t| t.id == id).cloned()
    }

    fn delete_todo(&self, id: ToDoId) -> Option<ToDo> {
        let mut tables = self.lock();
        let pos = tables.todos.iter().position(|t| t.id == id)?;
        let removed = tables.todos.remove(pos);
        debug!(todo_id = id, "to-do deleted");
        Some(removed)
    }

    fn list_todos(&self) -> Vec<ToDo> {
        self.lock().todos.clone()
    }

    fn todos_by_project(&self, project_id: ProjectId) -> Vec<ToDo> {
        self.lock()
            .todos
            .iter()
            .filter(|t| t.project_id == Some(project_id))
            .cloned()
            .collect()
    }

    fn assign_to_project(&self, todo_id: ToDoId, project_id: Option<ProjectId>) -> bool {
        let mut tables = self.lock();
        let target = project_id.filter(|id| *id != 0);
        if let Some(project_id) = target
            && !tables.has_project(project_id)
        {
            debug!(todo_id, project_id, "assignment rejected, no such project");
            return false;
        }
        let Some(todo) = tables.todos.iter_mut().find(|t| t.id == todo_id) else {
            debug!(todo_id, "assignment rejected, no such to-do");
            return false;
        };
        todo.project_id = target;
        true
    }

    fn toggle_complete(&self, id: ToDoId) -> Option<ToDo> {
        let mut tables = self.lock();
        let todo = tables.todos.iter_mut().find(|t| t.id == id)?;
        todo.is_complete = !todo.is_complete;
        Some(todo.clone())
    }

    fn replace_todos(&self, todos: Vec<ToDo>) -> usize {
        let mut tables = self.lock();
        tables.todos.clear();
        let mut seen = HashSet::new();
        for mut todo in todos {
            todo.priority = normalize_priority(todo.priority);
            todo.project_id = todo.project_id.filter(|id| *id != 0);
            if todo.is_new() {
                let Some(id) = next_id(tables.todos.iter().map(|t| t.id)) else {
                    warn!(name = %todo.name, "to-do ids exhausted, skipping row");
                    continue;
                };
                todo.id = id;
            }
            if !seen.insert(todo.id) {
                warn!(todo_id = todo.id, "skipping duplicate to-do id");
                continue;
            }
            tables.todos.push(todo);
        }
        tables.drop_dangling_references();
        info!(count = tables.todos.len(), "to-dos replaced");
        tables.todos.len()
    }
}

impl ProjectRepository for InMemoryRepo {
    fn add_or_update_project(&self, mut project: Project) -> Option<Project> {
        if project.name.trim().is_empty() {
            debug!(project_id = project.id, "rejected project without a name");
            return None;
        }
        project.complete_percent = clamp_percent(project.complete_percent);

        let mut tables = self.lock();
        if project.is_new() {
            let Some(id) = next_id(tables.projects.iter().map(|p| p.id)) else {
                warn!("project ids exhausted, insert rejected");
                return None;
            };
            project.id = id;
            tables.projects.push(project.clone());
            debug!(project_id = project.id, "project inserted");
            return Some(project);
        }

        let Some(slot) = tables.projects.iter_mut().find(|p| p.id == project.id) else {
            debug!(project_id = project.id, "update rejected, no such project");
            return None;
        };
        *slot = project.clone();
        debug!(project_id = project.id, "project updated");
        Some(project)
    }

    fn project_by_id(&self, id: ProjectId) -> Option<Project> {
        if id == 0 {
            return None;
        }
        self.lock().projects.iter().find(|p| p.id == id).cloned()
    }

    fn delete_project(&self, id: ProjectId) -> Option<Project> {
        let mut tables = self.lock();
        let pos = tables.projects.iter().position(|p| p.id == id)?;
        let mut unassigned = 0;
        for todo in tables.todos.iter_mut().filter(|t| t.project_id == Some(id)) {
            todo.project_id = None;
            unassigned += 1;
        }
        let removed = tables.projects.remove(pos);
        info!(project_id = id, unassigned, "project deleted");
        Some(removed)
    }

    fn list_projects(&self) -> Vec<Project> {
        self.lock().projects.clone()
    }

    fn projects_by_completion(&self, complete: bool) -> Vec<Project> {
        self.lock()
            .projects
            .iter()
            .filter(|p| p.is_complete() == complete)
            .cloned()
            .collect()
    }

    fn refresh_completion(&self, id: ProjectId) -> Option<Project> {
        let mut guard = self.lock();
        let tables = &mut *guard;
        let percent =
            progress::completion_percent(tables.todos.iter().filter(|t| t.project_id == Some(id)));
        let project = tables.projects.iter_mut().find(|p| p.id == id)?;
        project.complete_percent = percent;
        Some(project.clone())
    }

    fn statistics(&self) -> ProjectStatistics {
        progress::statistics(&self.lock().projects)
    }

    fn overall_progress(&self) -> f64 {
        progress::overall_progress(&self.lock().projects)
    }

    fn replace_projects(&self, projects: Vec<Project>) -> usize {
        let mut tables = self.lock();
        tables.projects.clear();
        let mut seen = HashSet::new();
        for mut project in projects {
            project.complete_percent = clamp_percent(project.complete_percent);
            if project.is_new() {
                let Some(id) = next_id(tables.projects.iter().map(|p| p.id)) else {
                    warn!(name = %project.name, "project ids exhausted, skipping row");
                    continue;
                };
                project.id = id;
            }
            if !seen.insert(project.id) {
                warn!(project_id = project.id, "skipping duplicate project id");
                continue;
            }
            tables.projects.push(project);
        }
        tables.drop_dangling_references();
        info!(count = tables.projects.len(), "projects replaced");
        tables.projects.len()
    }
}
