//! Keeps the document store and the in-memory repositories in step.
//!
//! Loading replaces repository contents wholesale; saving writes the full
//! collection. Failures are logged and swallowed so the process keeps running
//! on its in-memory state.

use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::project::Project;
use crate::domain::todo::ToDo;
use crate::repo::{ProjectRepository, ToDoRepository};
use crate::store::{DocumentStore, StoreResult};

pub const TODO_TABLE: &str = "todos";
pub const PROJECT_TABLE: &str = "projects";

pub struct Persistence<R> {
    store: DocumentStore,
    repo: Arc<R>,
}

impl<R: ToDoRepository + ProjectRepository> Persistence<R> {
    /// Wires `repo` to `store` and loads both tables into it.
    pub fn new(store: DocumentStore, repo: Arc<R>) -> Self {
        let persistence = Self::detached(store, repo);
        persistence.load_all();
        persistence
    }

    /// Wires without loading, for callers that seed the repository themselves.
    pub fn detached(store: DocumentStore, repo: Arc<R>) -> Self {
        Self { store, repo }
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    pub fn repo(&self) -> &Arc<R> {
        &self.repo
    }

    /// Reads projects, then to-dos. A table that is absent leaves the
    /// corresponding collection untouched.
    pub fn load_all(&self) {
        match self.store.load::<Vec<Project>>(PROJECT_TABLE) {
            Ok(Some(projects)) => {
                let count = self.repo.replace_projects(projects);
                info!(table = PROJECT_TABLE, count, "table loaded");
            }
            Ok(None) => info!(table = PROJECT_TABLE, "no saved table, starting empty"),
            Err(err) => warn!(table = PROJECT_TABLE, error = %err, "could not load table"),
        }
        match self.store.load::<Vec<ToDo>>(TODO_TABLE) {
            Ok(Some(todos)) => {
                let count = self.repo.replace_todos(todos);
                info!(table = TODO_TABLE, count, "table loaded");
            }
            Ok(None) => info!(table = TODO_TABLE, "no saved table, starting empty"),
            Err(err) => warn!(table = TODO_TABLE, error = %err, "could not load table"),
        }
    }

    pub fn save_todos(&self) -> bool {
        report(TODO_TABLE, self.store.save(TODO_TABLE, &self.repo.list_todos()))
    }

    pub fn save_projects(&self) -> bool {
        report(
            PROJECT_TABLE,
            self.store.save(PROJECT_TABLE, &self.repo.list_projects()),
        )
    }

    /// Saves both tables; returns `true` only when both writes succeeded.
    pub fn save_all(&self) -> bool {
        let projects = self.save_projects();
        let todos = self.save_todos();
        projects && todos
    }

    pub async fn save_todos_async(&self) -> bool {
        let todos = self.repo.list_todos();
        report(TODO_TABLE, self.store.save_async(TODO_TABLE, &todos).await)
    }

    pub async fn save_projects_async(&self) -> bool {
        let projects = self.repo.list_projects();
        report(
            PROJECT_TABLE,
            self.store.save_async(PROJECT_TABLE, &projects).await,
        )
    }

    pub async fn save_all_async(&self) -> bool {
        let projects = self.save_projects_async().await;
        let todos = self.save_todos_async().await;
        projects && todos
    }
}

fn report(table: &str, result: StoreResult<()>) -> bool {
    match result {
        Ok(()) => true,
        Err(err) => {
            warn!(table, error = %err, "could not save table");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::repo::memory::InMemoryRepo;

    fn open(dir: &std::path::Path) -> Persistence<InMemoryRepo> {
        let store = DocumentStore::open(dir).unwrap();
        Persistence::new(store, Arc::new(InMemoryRepo::new()))
    }

    #[test]
    fn starts_empty_without_tables() {
        let tmp = tempfile::tempdir().unwrap();
        let persistence = open(tmp.path());
        assert!(persistence.repo().list_todos().is_empty());
        assert!(persistence.repo().list_projects().is_empty());
    }

    #[test]
    fn saved_state_survives_restart() {
        let tmp = tempfile::tempdir().unwrap();
        let first = open(tmp.path());
        let project = first.repo().add_or_update_project(Project::new("Site")).unwrap();
        first
            .repo()
            .add_or_update_todo(ToDo::new("Design").in_project(project.id))
            .unwrap();
        assert!(first.save_all());

        let second = open(tmp.path());
        assert_eq!(second.repo().list_projects(), first.repo().list_projects());
        assert_eq!(second.repo().list_todos(), first.repo().list_todos());
        assert_eq!(second.repo().todos_by_project(project.id).len(), 1);
    }

    #[test]
    fn load_all_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let persistence = Persistence::detached(
            DocumentStore::open(tmp.path()).unwrap(),
            Arc::new(InMemoryRepo::demo()),
        );
        assert!(persistence.save_all());

        persistence.load_all();
        let todos = persistence.repo().list_todos();
        let projects = persistence.repo().list_projects();
        persistence.load_all();
        assert_eq!(persistence.repo().list_todos(), todos);
        assert_eq!(persistence.repo().list_projects(), projects);
        assert_eq!(todos.len(), 5);
    }

    #[test]
    fn load_replaces_rather_than_merges() {
        let tmp = tempfile::tempdir().unwrap();
        let persistence = open(tmp.path());
        persistence.repo().add_or_update_todo(ToDo::new("saved")).unwrap();
        assert!(persistence.save_todos());

        persistence.repo().add_or_update_todo(ToDo::new("unsaved")).unwrap();
        persistence.load_all();
        let names: Vec<_> = persistence
            .repo()
            .list_todos()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["saved"]);
    }

    #[test]
    fn malformed_table_is_not_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("todos.json"), "{ not json").unwrap();
        let store = DocumentStore::open(tmp.path()).unwrap();
        store
            .save(PROJECT_TABLE, &vec![Project {
                id: 4,
                name: "kept".into(),
                description: None,
                complete_percent: 10,
            }])
            .unwrap();

        let persistence = Persistence::new(store, Arc::new(InMemoryRepo::new()));
        assert!(persistence.repo().list_todos().is_empty());
        assert_eq!(persistence.repo().project_by_id(4).unwrap().name, "kept");
    }

    #[test]
    fn out_of_range_fields_do_not_drop_the_table() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(
            tmp.path().join("projects.json"),
            r#"[{"id": 1, "name": "Site", "completePercent": 300}]"#,
        )
        .unwrap();
        fs::write(
            tmp.path().join("todos.json"),
            r#"[
                {"id": 1, "name": "Design", "priority": -1, "projectId": 1},
                {"id": 2, "name": "Build", "priority": 2}
            ]"#,
        )
        .unwrap();

        let persistence = open(tmp.path());
        let todos = persistence.repo().list_todos();
        assert_eq!(todos.len(), 2);
        assert_eq!(todos[0].priority, 1);
        assert_eq!(todos[0].project_id, Some(1));
        assert_eq!(todos[1].priority, 2);
        assert_eq!(persistence.repo().project_by_id(1).unwrap().complete_percent, 100);
    }

    #[test]
    fn failed_save_keeps_memory_state() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("db");
        let persistence = open(&root);
        persistence.repo().add_or_update_todo(ToDo::new("t")).unwrap();
        fs::remove_dir_all(&root).unwrap();

        assert!(!persistence.save_todos());
        assert!(!persistence.save_all());
        assert_eq!(persistence.repo().list_todos().len(), 1);
    }

    #[test]
    fn table_file_uses_camel_case_fields() {
        let tmp = tempfile::tempdir().unwrap();
        let persistence = open(tmp.path());
        let project = persistence.repo().add_or_update_project(Project::new("p")).unwrap();
        persistence
            .repo()
            .add_or_update_todo(ToDo::new("t").in_project(project.id))
            .unwrap();
        assert!(persistence.save_all());

        let todos = fs::read_to_string(tmp.path().join("todos.json")).unwrap();
        assert!(todos.contains("\"projectId\": 1"));
        assert!(todos.contains("\"isComplete\": false"));
        let projects = fs::read_to_string(tmp.path().join("projects.json")).unwrap();
        assert!(projects.contains("\"completePercent\": 0"));
    }

    #[tokio::test]
    async fn async_save_round_trips() {
        let tmp = tempfile::tempdir().unwrap();
        let writer = Persistence::detached(
            DocumentStore::open(tmp.path()).unwrap(),
            Arc::new(InMemoryRepo::demo()),
        );
        assert!(writer.save_all_async().await);

        let reader = open(tmp.path());
        assert_eq!(reader.repo().list_todos(), writer.repo().list_todos());
        assert_eq!(reader.repo().list_projects(), writer.repo().list_projects());
    }
}
