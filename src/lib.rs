//! Data layer for a small to-do / project tracker.
//!
//! A [`DocumentStore`] persists named tables as JSON files; an
//! [`InMemoryRepo`] owns the `ToDo` and `Project` collections and their
//! referential integrity; [`Persistence`] moves state between the two.

pub mod app;
pub mod domain;
pub mod logging;
pub mod persistence;
pub mod repo;
pub mod store;
pub mod usecase;

pub use app::App;
pub use domain::project::{Project, ProjectId, ProjectStatistics};
pub use domain::todo::{ToDo, ToDoId};
pub use persistence::Persistence;
pub use repo::memory::InMemoryRepo;
pub use repo::{ProjectRepository, ToDoRepository};
pub use store::{DocumentStore, StoreError, StoreResult};
