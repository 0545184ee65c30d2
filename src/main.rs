use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use time::OffsetDateTime;

use tracker::app::{App, ProjectFields, ToDoFields, parse_due_date};
use tracker::logging::{DEFAULT_LOG_LEVEL, init_logging};
use tracker::{DocumentStore, InMemoryRepo, Persistence, Project, ProjectId, ToDo, ToDoId};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "tracker: to-dos and projects kept in JSON tables",
    long_about = None
)]
struct Args {
    /// Directory holding the table files (default: OS temp dir)
    #[arg(long, env = "TRACKER_DATA_DIR", global = true)]
    data_dir: Option<PathBuf>,

    /// Start with demo data and keep every change in memory
    #[arg(long, default_value_t = false, global = true)]
    demo: bool,

    /// Log level when RUST_LOG is unset
    #[arg(long, default_value = DEFAULT_LOG_LEVEL, global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Manage to-dos
    #[command(subcommand)]
    Todo(TodoCommand),
    /// Manage projects
    #[command(subcommand)]
    Project(ProjectCommand),
    /// List the tables present in the data directory
    Tables,
}

#[derive(Subcommand, Debug)]
enum TodoCommand {
    Add {
        name: String,
        #[arg(long)]
        description: Option<String>,
        /// 1-3; anything else becomes 1
        #[arg(long)]
        priority: Option<u8>,
        #[arg(long)]
        project: Option<ProjectId>,
        /// YYYY-MM-DD or RFC 3339
        #[arg(long, value_parser = due_date)]
        due: Option<OffsetDateTime>,
    },
    Update {
        id: ToDoId,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        priority: Option<u8>,
        /// 0 clears the project
        #[arg(long)]
        project: Option<ProjectId>,
        #[arg(long, value_parser = due_date)]
        due: Option<OffsetDateTime>,
        #[arg(long)]
        complete: Option<bool>,
    },
    List,
    Show {
        id: ToDoId,
    },
    Delete {
        id: ToDoId,
    },
    /// Flip the completion flag
    Toggle {
        id: ToDoId,
    },
    /// Move a to-do into a project; omit the project to unassign
    Assign {
        id: ToDoId,
        project: Option<ProjectId>,
    },
    ByProject {
        project: ProjectId,
    },
}

#[derive(Subcommand, Debug)]
enum ProjectCommand {
    Add {
        name: String,
        #[arg(long)]
        description: Option<String>,
    },
    Update {
        id: ProjectId,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        percent: Option<u8>,
    },
    List {
        /// Only finished (true) or unfinished (false) projects
        #[arg(long)]
        complete: Option<bool>,
    },
    Show {
        id: ProjectId,
    },
    /// Delete a project and unassign its to-dos
    Delete {
        id: ProjectId,
    },
    /// Recompute the percent from the project's to-dos
    Refresh {
        id: ProjectId,
    },
    Stats,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);

    let store = match args.data_dir.as_ref() {
        Some(dir) => DocumentStore::open(dir),
        None => DocumentStore::open_default(),
    }
    .context("failed to open data directory")?;

    let app = if args.demo {
        let repo = Arc::new(InMemoryRepo::demo());
        App::without_autosave(Persistence::detached(store, repo))
    } else {
        App::new(Persistence::new(store, Arc::new(InMemoryRepo::new())))
    };

    match args.command {
        Command::Todo(cmd) => run_todo(&app, cmd),
        Command::Project(cmd) => run_project(&app, cmd),
        Command::Tables => {
            let store = app.persistence().store();
            println!("Tables in {}:", store.root().display());
            for table in store.list_tables()? {
                println!("  {table}");
            }
            Ok(())
        }
    }
}

fn run_todo(app: &App<InMemoryRepo>, cmd: TodoCommand) -> Result<()> {
    match cmd {
        TodoCommand::Add {
            name,
            description,
            priority,
            project,
            due,
        } => {
            let todo = app.add_todo(ToDoFields {
                name: Some(name),
                description,
                priority,
                is_complete: None,
                project_id: project,
                due_date: due,
            })?;
            println!("Created {}", format_todo(&todo));
        }
        TodoCommand::Update {
            id,
            name,
            description,
            priority,
            project,
            due,
            complete,
        } => {
            let todo = app.update_todo(
                id,
                ToDoFields {
                    name,
                    description,
                    priority,
                    is_complete: complete,
                    project_id: project,
                    due_date: due,
                },
            )?;
            println!("Updated {}", format_todo(&todo));
        }
        TodoCommand::List => print_todos(&app.todos()),
        TodoCommand::Show { id } => println!("{}", format_todo(&app.todo(id)?)),
        TodoCommand::Delete { id } => {
            let todo = app.delete_todo(id)?;
            println!("Deleted {}", format_todo(&todo));
        }
        TodoCommand::Toggle { id } => {
            let todo = app.toggle_todo(id)?;
            println!("Toggled {}", format_todo(&todo));
        }
        TodoCommand::Assign { id, project } => {
            let todo = app.assign_todo(id, project)?;
            println!("Assigned {}", format_todo(&todo));
        }
        TodoCommand::ByProject { project } => {
            let todos = app.todos_in_project(project)?;
            print_todos(&todos);
        }
    }
    Ok(())
}

fn run_project(app: &App<InMemoryRepo>, cmd: ProjectCommand) -> Result<()> {
    match cmd {
        ProjectCommand::Add { name, description } => {
            let project = app.add_project(ProjectFields {
                name: Some(name),
                description,
                complete_percent: None,
            })?;
            println!("Created {}", format_project(&project));
        }
        ProjectCommand::Update {
            id,
            name,
            description,
            percent,
        } => {
            let project = app.update_project(
                id,
                ProjectFields {
                    name,
                    description,
                    complete_percent: percent,
                },
            )?;
            println!("Updated {}", format_project(&project));
        }
        ProjectCommand::List { complete } => {
            let projects = match complete {
                Some(complete) => app.projects_by_completion(complete),
                None => app.projects(),
            };
            if projects.is_empty() {
                println!("No projects found.");
            }
            for project in &projects {
                println!("{}", format_project(project));
            }
        }
        ProjectCommand::Show { id } => println!("{}", format_project(&app.project(id)?)),
        ProjectCommand::Delete { id } => {
            let project = app.delete_project(id)?;
            println!("Deleted {}", format_project(&project));
        }
        ProjectCommand::Refresh { id } => {
            let project = app.refresh_project(id)?;
            println!("Refreshed {}", format_project(&project));
        }
        ProjectCommand::Stats => {
            let stats = app.statistics();
            println!("Projects:    {}", stats.total_projects);
            println!("Completed:   {}", stats.completed_projects);
            println!("In progress: {}", stats.in_progress_projects);
            println!("Not started: {}", stats.not_started_projects);
            println!("Average:     {:.1}%", stats.average_completion);
        }
    }
    Ok(())
}

fn due_date(raw: &str) -> Result<OffsetDateTime, String> {
    parse_due_date(raw).map_err(|err| err.to_string())
}

fn print_todos(todos: &[ToDo]) {
    if todos.is_empty() {
        println!("No to-dos found.");
    }
    for todo in todos {
        println!("{}", format_todo(todo));
    }
}

fn format_todo(todo: &ToDo) -> String {
    let mark = if todo.is_complete { "x" } else { " " };
    let mut line = format!("[{}] [{mark}] {} (priority {})", todo.id, todo.name, todo.priority);
    if let Some(description) = &todo.description {
        line.push_str(&format!(" - {description}"));
    }
    if let Some(due) = todo.due_date {
        line.push_str(&format!(" due {}", due.date()));
    }
    match todo.project_id {
        Some(project_id) => line.push_str(&format!(" (project {project_id})")),
        None => line.push_str(" (no project)"),
    }
    line
}

fn format_project(project: &Project) -> String {
    let mut line = format!("[{}] {} - {}%", project.id, project.name, project.complete_percent);
    if let Some(description) = &project.description {
        line.push_str(&format!(" - {description}"));
    }
    line
}
