use crate::domain::project::{Project, ProjectStatistics};
use crate::domain::todo::ToDo;

/// Share of completed to-dos as a whole percent, rounded down.
/// A project without to-dos is 0% complete.
pub fn completion_percent<'a>(todos: impl IntoIterator<Item = &'a ToDo>) -> u8 {
    let (done, total) = todos.into_iter().fold((0usize, 0usize), |(done, total), todo| {
        (done + usize::from(todo.is_complete), total + 1)
    });
    if total == 0 {
        return 0;
    }
    (done * 100 / total) as u8
}

/// Mean `complete_percent` across projects; 0 when there are none.
pub fn overall_progress(projects: &[Project]) -> f64 {
    if projects.is_empty() {
        return 0.0;
    }
    let sum: u32 = projects.iter().map(|p| u32::from(p.complete_percent)).sum();
    f64::from(sum) / projects.len() as f64
}

pub fn statistics(projects: &[Project]) -> ProjectStatistics {
    ProjectStatistics {
        total_projects: projects.len(),
        completed_projects: projects.iter().filter(|p| p.complete_percent == 100).count(),
        in_progress_projects: projects
            .iter()
            .filter(|p| (1..100).contains(&p.complete_percent))
            .count(),
        not_started_projects: projects.iter().filter(|p| p.complete_percent == 0).count(),
        average_completion: overall_progress(projects),
    }
}
