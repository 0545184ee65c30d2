use anyhow::{Context, Result, bail};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime};

use crate::domain::project::{Project, ProjectId, ProjectStatistics, clamp_percent};
use crate::domain::todo::{ToDo, ToDoId, normalize_priority};
use crate::persistence::Persistence;
use crate::repo::{ProjectRepository, ToDoRepository};

pub const MAX_NAME_LEN: usize = 100;
pub const MAX_DESCRIPTION_LEN: usize = 500;

/// Fields supplied by a front-end. `None` means "leave as is" on update and
/// "use the default" on create.
#[derive(Debug, Clone, Default)]
pub struct ToDoFields {
    pub name: Option<String>,
    pub description: Option<String>,
    pub priority: Option<u8>,
    pub is_complete: Option<bool>,
    /// `Some(0)` clears the project reference.
    pub project_id: Option<ProjectId>,
    pub due_date: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, Default)]
pub struct ProjectFields {
    pub name: Option<String>,
    pub description: Option<String>,
    pub complete_percent: Option<u8>,
}

/// Front-end facing service: validates input, calls the repository, then
/// writes the touched tables back to disk.
pub struct App<R> {
    persistence: Persistence<R>,
    autosave: bool,
}

impl<R: ToDoRepository + ProjectRepository> App<R> {
    pub fn new(persistence: Persistence<R>) -> Self {
        Self {
            persistence,
            autosave: true,
        }
    }

    /// Keeps every change in memory only.
    pub fn without_autosave(persistence: Persistence<R>) -> Self {
        Self {
            persistence,
            autosave: false,
        }
    }

    pub fn persistence(&self) -> &Persistence<R> {
        &self.persistence
    }

    fn repo(&self) -> &R {
        self.persistence.repo()
    }

    pub fn todos(&self) -> Vec<ToDo> {
        self.repo().list_todos()
    }

    pub fn todo(&self, id: ToDoId) -> Result<ToDo> {
        self.repo()
            .todo_by_id(id)
            .with_context(|| format!("to-do {id} not found"))
    }

    pub fn todos_in_project(&self, project_id: ProjectId) -> Result<Vec<ToDo>> {
        self.project(project_id)?;
        Ok(self.repo().todos_by_project(project_id))
    }

    pub fn add_todo(&self, fields: ToDoFields) -> Result<ToDo> {
        let Some(name) = fields.name.as_deref() else {
            bail!("a to-do needs a name");
        };
        let mut todo = ToDo::new(check_name(name)?);
        apply_todo_fields(&mut todo, fields)?;
        let todo = self
            .repo()
            .add_or_update_todo(todo)
            .context("to-do rejected: its project does not exist")?;
        self.save_todos();
        Ok(todo)
    }

    pub fn update_todo(&self, id: ToDoId, fields: ToDoFields) -> Result<ToDo> {
        let mut todo = self.todo(id)?;
        apply_todo_fields(&mut todo, fields)?;
        let todo = self
            .repo()
            .add_or_update_todo(todo)
            .with_context(|| format!("update of to-do {id} rejected"))?;
        self.save_todos();
        Ok(todo)
    }

    pub fn delete_todo(&self, id: ToDoId) -> Result<ToDo> {
        let todo = self
            .repo()
            .delete_todo(id)
            .with_context(|| format!("to-do {id} not found"))?;
        self.save_todos();
        Ok(todo)
    }

    pub fn toggle_todo(&self, id: ToDoId) -> Result<ToDo> {
        let todo = self
            .repo()
            .toggle_complete(id)
            .with_context(|| format!("to-do {id} not found"))?;
        self.save_todos();
        Ok(todo)
    }

    pub fn assign_todo(&self, id: ToDoId, project_id: Option<ProjectId>) -> Result<ToDo> {
        if !self.repo().assign_to_project(id, project_id) {
            bail!("cannot assign to-do {id}: to-do or project not found");
        }
        self.save_todos();
        self.todo(id)
    }

    pub fn projects(&self) -> Vec<Project> {
        self.repo().list_projects()
    }

    pub fn projects_by_completion(&self, complete: bool) -> Vec<Project> {
        self.repo().projects_by_completion(complete)
    }

    pub fn project(&self, id: ProjectId) -> Result<Project> {
        self.repo()
            .project_by_id(id)
            .with_context(|| format!("project {id} not found"))
    }

    pub fn add_project(&self, fields: ProjectFields) -> Result<Project> {
        let Some(name) = fields.name.as_deref() else {
            bail!("a project needs a name");
        };
        let mut project = Project::new(check_name(name)?);
        apply_project_fields(&mut project, fields)?;
        let project = self
            .repo()
            .add_or_update_project(project)
            .context("project rejected")?;
        self.save_projects();
        Ok(project)
    }

    pub fn update_project(&self, id: ProjectId, fields: ProjectFields) -> Result<Project> {
        let mut project = self.project(id)?;
        apply_project_fields(&mut project, fields)?;
        let project = self
            .repo()
            .add_or_update_project(project)
            .with_context(|| format!("update of project {id} rejected"))?;
        self.save_projects();
        Ok(project)
    }

    /// Deleting a project rewrites both tables since its to-dos change too.
    pub fn delete_project(&self, id: ProjectId) -> Result<Project> {
        let project = self
            .repo()
            .delete_project(id)
            .with_context(|| format!("project {id} not found"))?;
        self.save_all();
        Ok(project)
    }

    pub fn refresh_project(&self, id: ProjectId) -> Result<Project> {
        let project = self
            .repo()
            .refresh_completion(id)
            .with_context(|| format!("project {id} not found"))?;
        self.save_projects();
        Ok(project)
    }

    pub fn statistics(&self) -> ProjectStatistics {
        self.repo().statistics()
    }

    fn save_todos(&self) {
        if self.autosave {
            self.persistence.save_todos();
        }
    }

    fn save_projects(&self) {
        if self.autosave {
            self.persistence.save_projects();
        }
    }

    fn save_all(&self) {
        if self.autosave {
            self.persistence.save_all();
        }
    }
}

fn check_name(name: &str) -> Result<&str> {
    let name = name.trim();
    if name.is_empty() {
        bail!("name cannot be empty");
    }
    if name.chars().count() > MAX_NAME_LEN {
        bail!("name cannot exceed {MAX_NAME_LEN} characters");
    }
    Ok(name)
}

fn check_description(description: String) -> Result<Option<String>> {
    if description.chars().count() > MAX_DESCRIPTION_LEN {
        bail!("description cannot exceed {MAX_DESCRIPTION_LEN} characters");
    }
    let trimmed = description.trim();
    Ok((!trimmed.is_empty()).then(|| trimmed.to_owned()))
}

fn apply_todo_fields(todo: &mut ToDo, fields: ToDoFields) -> Result<()> {
    if let Some(name) = fields.name.as_deref() {
        todo.name = check_name(name)?.to_owned();
    }
    if let Some(description) = fields.description {
        todo.description = check_description(description)?;
    }
    if let Some(priority) = fields.priority {
        todo.priority = normalize_priority(priority);
    }
    if let Some(done) = fields.is_complete {
        todo.is_complete = done;
    }
    if let Some(project_id) = fields.project_id {
        todo.project_id = (project_id != 0).then_some(project_id);
    }
    if let Some(due) = fields.due_date {
        todo.due_date = Some(due);
    }
    Ok(())
}

fn apply_project_fields(project: &mut Project, fields: ProjectFields) -> Result<()> {
    if let Some(name) = fields.name.as_deref() {
        project.name = check_name(name)?.to_owned();
    }
    if let Some(description) = fields.description {
        project.description = check_description(description)?;
    }
    if let Some(percent) = fields.complete_percent {
        project.complete_percent = clamp_percent(percent);
    }
    Ok(())
}

/// Accepts `YYYY-MM-DD` (midnight UTC) or a full RFC 3339 timestamp.
pub fn parse_due_date(raw: &str) -> Result<OffsetDateTime> {
    let raw = raw.trim();
    if let Ok(date) = Date::parse(raw, format_description!("[year]-[month]-[day]")) {
        return Ok(date.midnight().assume_utc());
    }
    OffsetDateTime::parse(raw, &Rfc3339)
        .with_context(|| format!("invalid due date `{raw}`, expected YYYY-MM-DD or RFC 3339"))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use time::macros::datetime;

    use super::*;
    use crate::repo::memory::InMemoryRepo;
    use crate::store::DocumentStore;

    fn app(dir: &std::path::Path) -> App<InMemoryRepo> {
        let store = DocumentStore::open(dir).unwrap();
        App::new(Persistence::new(store, Arc::new(InMemoryRepo::new())))
    }

    fn named(name: &str) -> ToDoFields {
        ToDoFields {
            name: Some(name.to_owned()),
            ..ToDoFields::default()
        }
    }

    #[test]
    fn mutations_are_written_through() {
        let tmp = tempfile::tempdir().unwrap();
        let app = app(tmp.path());
        let project = app
            .add_project(ProjectFields {
                name: Some("Site".into()),
                ..ProjectFields::default()
            })
            .unwrap();
        let todo = app
            .add_todo(ToDoFields {
                project_id: Some(project.id),
                ..named("Design")
            })
            .unwrap();
        app.toggle_todo(todo.id).unwrap();

        let reopened = self::app(tmp.path());
        assert!(reopened.todo(todo.id).unwrap().is_complete);
        assert_eq!(reopened.todos_in_project(project.id).unwrap().len(), 1);
    }

    #[test]
    fn deleting_a_project_persists_unassigned_todos() {
        let tmp = tempfile::tempdir().unwrap();
        let app = app(tmp.path());
        let project = app
            .add_project(ProjectFields {
                name: Some("Site".into()),
                ..ProjectFields::default()
            })
            .unwrap();
        let todo = app
            .add_todo(ToDoFields {
                project_id: Some(project.id),
                ..named("Design")
            })
            .unwrap();
        app.delete_project(project.id).unwrap();

        let reopened = self::app(tmp.path());
        assert_eq!(reopened.todo(todo.id).unwrap().project_id, None);
        assert!(reopened.projects().is_empty());
    }

    #[test]
    fn boundary_validation() {
        let tmp = tempfile::tempdir().unwrap();
        let app = app(tmp.path());
        assert!(app.add_todo(ToDoFields::default()).is_err());
        assert!(app.add_todo(named("   ")).is_err());
        assert!(app.add_todo(named(&"x".repeat(MAX_NAME_LEN + 1))).is_err());
        assert!(
            app.add_todo(ToDoFields {
                description: Some("d".repeat(MAX_DESCRIPTION_LEN + 1)),
                ..named("ok")
            })
            .is_err()
        );
        assert!(
            app.add_todo(ToDoFields {
                project_id: Some(12),
                ..named("orphan")
            })
            .is_err()
        );
        assert!(app.todos().is_empty());

        let todo = app
            .add_todo(ToDoFields {
                priority: Some(5),
                description: Some("  ".into()),
                ..named("  padded  ")
            })
            .unwrap();
        assert_eq!(todo.name, "padded");
        assert_eq!(todo.priority, 1);
        assert_eq!(todo.description, None);
    }

    #[test]
    fn update_keeps_unspecified_fields() {
        let tmp = tempfile::tempdir().unwrap();
        let app = app(tmp.path());
        let todo = app
            .add_todo(ToDoFields {
                description: Some("first".into()),
                priority: Some(3),
                ..named("task")
            })
            .unwrap();
        let updated = app
            .update_todo(
                todo.id,
                ToDoFields {
                    is_complete: Some(true),
                    ..ToDoFields::default()
                },
            )
            .unwrap();
        assert_eq!(updated.description.as_deref(), Some("first"));
        assert_eq!(updated.priority, 3);
        assert!(updated.is_complete);
        assert!(app.update_todo(99, ToDoFields::default()).is_err());
    }

    #[test]
    fn assign_reports_missing_targets() {
        let tmp = tempfile::tempdir().unwrap();
        let app = app(tmp.path());
        let todo = app.add_todo(named("t")).unwrap();
        assert!(app.assign_todo(todo.id, Some(5)).is_err());
        assert!(app.assign_todo(77, None).is_err());
        assert_eq!(app.assign_todo(todo.id, None).unwrap().project_id, None);
    }

    #[test]
    fn demo_mode_does_not_touch_disk() {
        let tmp = tempfile::tempdir().unwrap();
        let store = DocumentStore::open(tmp.path()).unwrap();
        let repo = Arc::new(InMemoryRepo::demo());
        let app = App::without_autosave(Persistence::detached(store, repo));
        app.add_todo(named("scratch")).unwrap();
        app.delete_project(1).unwrap();
        assert!(app.persistence().store().list_tables().unwrap().is_empty());
        assert_eq!(app.todos().len(), 6);
    }

    #[test]
    fn due_dates_parse_from_day_or_timestamp() {
        assert_eq!(
            parse_due_date("2026-10-24").unwrap(),
            datetime!(2026-10-24 0:00 UTC)
        );
        assert_eq!(
            parse_due_date("2026-10-24T09:30:00+02:00").unwrap(),
            datetime!(2026-10-24 9:30 +2)
        );
        assert!(parse_due_date("next tuesday").is_err());
    }
}
