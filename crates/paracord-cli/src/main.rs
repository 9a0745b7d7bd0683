mod version;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::json;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use paracord_core::check;
use paracord_core::config::{self, ParacordConfig};
use paracord_core::dates;
use paracord_core::index::VaultIndex;
use paracord_core::query::{self, Direction, QueryError, SortKey, TaskFilter};
use paracord_core::record::{Area, Kind, Project, Task, TaskStatus};
use paracord_core::scan::Warning;
use paracord_core::update::{self, FieldEdit, NewRecord, UpdateError};
use paracord_core::vault::{Vault, VaultPaths};

#[derive(Parser)]
#[command(name = "paracord", version = version::FULL, about = "Plain-text tasks, projects and areas")]
struct Cli {
    /// Vault root; defaults to searching upward from the current directory
    #[arg(long, global = true, value_name = "PATH")]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List tasks
    List(ListArgs),
    /// List projects
    Projects {
        /// Match a substring of the title, description or body
        #[arg(long)]
        search: Option<String>,
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// List areas
    Areas {
        /// Match a substring of the title, description or body
        #[arg(long)]
        search: Option<String>,
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Show a single record
    Show {
        name: String,
        /// Restrict the lookup to one kind
        #[arg(long, value_name = "KIND")]
        kind: Option<String>,
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Set or remove one metadata field
    Set {
        name: String,
        key: String,
        value: Option<String>,
        /// Remove the field instead of setting it
        #[arg(long)]
        remove: bool,
        /// Record kind the name refers to
        #[arg(long, value_name = "KIND", default_value = "task")]
        kind: String,
    },
    /// Mark a task done
    Done { name: String },
    /// Create a record
    New {
        kind: String,
        title: String,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        project: Option<String>,
        #[arg(long)]
        area: Option<String>,
        #[arg(long)]
        due: Option<String>,
        #[arg(long)]
        body: Option<String>,
    },
    /// Show a project with its tasks
    Project {
        name: String,
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Show an area with its projects and tasks
    Area {
        name: String,
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Validate the vault and report findings
    Check {
        /// Include archived records
        #[arg(long)]
        all: bool,
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Write a default config and create the record directories
    Init,
    /// Print version information
    Version,
}

#[derive(Args)]
struct ListArgs {
    /// Filter by status; repeat for several
    #[arg(long = "status", value_name = "STATUS")]
    statuses: Vec<String>,
    /// Only tasks under this project
    #[arg(long)]
    project: Option<String>,
    /// Only tasks under this area, directly or through a project
    #[arg(long)]
    area: Option<String>,
    /// Only tasks due on or before this date
    #[arg(long, value_name = "DATE")]
    due_before: Option<String>,
    /// Match a substring of the title or body
    #[arg(long)]
    search: Option<String>,
    /// Sort key: title, status, created, updated, due, scheduled or completed
    #[arg(long, value_name = "KEY")]
    sort: Option<String>,
    /// Reverse the sort order
    #[arg(long)]
    desc: bool,
    /// Keep at most this many rows
    #[arg(long, value_name = "N")]
    limit: Option<usize>,
    /// Include archived records
    #[arg(long)]
    all: bool,
    /// Emit JSON instead of text
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(2)
        }
    }
}

// Logging is opt-in via PARACORD_LOG; invalid filters fall back to warnings.
fn init_tracing() {
    let filter = std::env::var("PARACORD_LOG")
        .ok()
        .and_then(|raw| {
            let raw = raw.trim();
            if raw.is_empty() {
                return None;
            }
            EnvFilter::try_new(raw).ok()
        })
        .unwrap_or_else(|| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn run(cli: Cli) -> Result<ExitCode> {
    let root = cli.root.as_deref();
    match cli.command {
        Command::List(args) => cmd_list(root, args),
        Command::Projects { search, json } => cmd_projects(root, search, json),
        Command::Areas { search, json } => cmd_areas(root, search, json),
        Command::Show { name, kind, json } => cmd_show(root, &name, kind.as_deref(), json),
        Command::Set {
            name,
            key,
            value,
            remove,
            kind,
        } => cmd_set(root, &name, key, value, remove, &kind),
        Command::Done { name } => cmd_done(root, &name),
        Command::New {
            kind,
            title,
            status,
            project,
            area,
            due,
            body,
        } => cmd_new(root, &kind, title, status, project, area, due, body),
        Command::Project { name, json } => cmd_project(root, &name, json),
        Command::Area { name, json } => cmd_area(root, &name, json),
        Command::Check { all, json } => cmd_check(root, all, json),
        Command::Init => cmd_init(root),
        Command::Version => {
            println!("paracord {} (core {})", version::FULL, paracord_core::version());
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn open_vault(root: Option<&Path>, include_archive: bool) -> Result<Vault> {
    let paths = match root {
        Some(root) => VaultPaths::resolve(root)?,
        None => {
            let cwd = std::env::current_dir().context("cannot read the current directory")?;
            VaultPaths::locate(&cwd)?
        }
    };
    Ok(Vault::open(paths).with_archive(include_archive))
}

fn parse_kind(raw: &str) -> Result<Kind> {
    match Kind::parse(raw) {
        Some(kind) => Ok(kind),
        None => bail!("unknown kind `{raw}`, expected task, project or area"),
    }
}

fn cmd_list(root: Option<&Path>, args: ListArgs) -> Result<ExitCode> {
    let mut statuses = Vec::new();
    for raw in &args.statuses {
        match TaskStatus::parse(raw) {
            Some(status) => statuses.push(status),
            None => bail!("unknown status `{raw}`"),
        }
    }
    let due_before = match &args.due_before {
        Some(raw) => match dates::parse_cutoff_value(raw) {
            Some(cutoff) => Some(cutoff),
            None => bail!("cannot read `{raw}` as a date"),
        },
        None => None,
    };
    let sort = match &args.sort {
        Some(raw) => match SortKey::parse(raw) {
            Some(key) => Some(key),
            None => bail!("unknown sort key `{raw}`"),
        },
        None => None,
    };

    let vault = open_vault(root, args.all)?;
    let index = vault.index();
    let filter = TaskFilter {
        statuses,
        project: args.project,
        area: args.area,
        due_before,
        search: args.search,
    };
    let mut tasks = match query::filter_tasks(index, &filter) {
        Ok(tasks) => tasks,
        Err(err) => return fail_query(err),
    };
    if let Some(key) = sort {
        let direction = if args.desc {
            Direction::Descending
        } else {
            Direction::Ascending
        };
        query::sort_tasks(&mut tasks, key, direction);
    }
    query::limit(&mut tasks, args.limit);

    emit_warnings(index.warnings());
    if args.json {
        let rows: Vec<_> = tasks
            .iter()
            .map(|task| query::task_json(task, false))
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        for task in &tasks {
            println!("{}", render_task_line(task));
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_projects(root: Option<&Path>, search: Option<String>, json: bool) -> Result<ExitCode> {
    let vault = open_vault(root, false)?;
    let index = vault.index();
    let mut projects: Vec<&Project> = index.projects().iter().collect();
    if let Some(needle) = &search {
        projects.retain(|project| query::project_matches_text(project, needle));
    }
    projects.sort_by(|a, b| a.name.cmp(&b.name));

    emit_warnings(index.warnings());
    if json {
        let rows: Vec<_> = projects
            .iter()
            .map(|project| query::project_json(project, false))
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        for project in &projects {
            println!("{}", render_project_line(project));
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_areas(root: Option<&Path>, search: Option<String>, json: bool) -> Result<ExitCode> {
    let vault = open_vault(root, false)?;
    let index = vault.index();
    let mut areas: Vec<&Area> = index.areas().iter().collect();
    if let Some(needle) = &search {
        areas.retain(|area| query::area_matches_text(area, needle));
    }
    areas.sort_by(|a, b| a.name.cmp(&b.name));

    emit_warnings(index.warnings());
    if json {
        let rows: Vec<_> = areas
            .iter()
            .map(|area| query::area_json(area, false))
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        for area in &areas {
            println!("{}", render_area_line(area));
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_show(root: Option<&Path>, name: &str, kind: Option<&str>, json: bool) -> Result<ExitCode> {
    let kind = match kind {
        Some(raw) => Some(parse_kind(raw)?),
        None => None,
    };
    let vault = open_vault(root, false)?;
    let index = vault.index();

    let mut matches: Vec<(Kind, usize)> = Vec::new();
    if kind.is_none() || kind == Some(Kind::Task) {
        matches.extend(index.find_tasks(name).into_iter().map(|pos| (Kind::Task, pos)));
    }
    if kind.is_none() || kind == Some(Kind::Project) {
        matches.extend(
            index
                .find_projects(name)
                .into_iter()
                .map(|pos| (Kind::Project, pos)),
        );
    }
    if kind.is_none() || kind == Some(Kind::Area) {
        matches.extend(index.find_areas(name).into_iter().map(|pos| (Kind::Area, pos)));
    }

    // Exact name hits across kinds beat substring hits from another kind.
    let lowered = name.trim().to_lowercase();
    let exact: Vec<(Kind, usize)> = matches
        .iter()
        .copied()
        .filter(|&(kind, pos)| record_entry(index, kind, pos).0.to_lowercase() == lowered)
        .collect();
    let matches = if exact.is_empty() { matches } else { exact };

    match matches.len() {
        0 => {
            eprintln!("no record matches `{name}`");
            Ok(ExitCode::from(1))
        }
        1 => {
            let (kind, pos) = matches[0];
            if json {
                println!("{}", serde_json::to_string_pretty(&record_json_at(index, kind, pos))?);
            } else {
                print!("{}", render_record_detail(index, kind, pos));
            }
            Ok(ExitCode::SUCCESS)
        }
        _ => {
            eprintln!("`{name}` is ambiguous, matching:");
            for &(kind, pos) in &matches {
                let (record_name, path) = record_entry(index, kind, pos);
                eprintln!("  {kind} `{record_name}` ({})", path.display());
            }
            Ok(ExitCode::from(1))
        }
    }
}

fn cmd_set(
    root: Option<&Path>,
    name: &str,
    key: String,
    value: Option<String>,
    remove: bool,
    kind_raw: &str,
) -> Result<ExitCode> {
    let kind = parse_kind(kind_raw)?;
    let edit = match (value, remove) {
        (Some(_), true) => bail!("give either VALUE or --remove, not both"),
        (Some(value), false) => FieldEdit::set(key, value),
        (None, true) => FieldEdit::remove(key),
        (None, false) => bail!("missing VALUE (or use --remove)"),
    };
    let vault = open_vault(root, false)?;
    match update::update_by_name(&vault, kind, name, &[edit]) {
        Ok(record) => {
            println!("updated {}", record.path().display());
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => fail_update(err),
    }
}

fn cmd_done(root: Option<&Path>, name: &str) -> Result<ExitCode> {
    let vault = open_vault(root, false)?;
    let edits = [FieldEdit::set("status", "done")];
    match update::update_by_name(&vault, Kind::Task, name, &edits) {
        Ok(record) => {
            println!("done: {} ({})", record.title(), record.path().display());
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => fail_update(err),
    }
}

#[allow(clippy::too_many_arguments)]
fn cmd_new(
    root: Option<&Path>,
    kind_raw: &str,
    title: String,
    status: Option<String>,
    project: Option<String>,
    area: Option<String>,
    due: Option<String>,
    body: Option<String>,
) -> Result<ExitCode> {
    let kind = parse_kind(kind_raw)?;
    let vault = open_vault(root, false)?;
    let new = NewRecord {
        title,
        status,
        project,
        area,
        due,
        body,
    };
    let dir = vault.paths().dir_for(kind).to_path_buf();
    match update::create_record(&dir, kind, &new) {
        Ok(record) => {
            println!("created {}", record.path().display());
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => fail_update(err),
    }
}

fn cmd_project(root: Option<&Path>, name: &str, json: bool) -> Result<ExitCode> {
    let vault = open_vault(root, false)?;
    let index = vault.index();
    let context = match query::project_context(index, name) {
        Ok(context) => context,
        Err(err) => return fail_query(err),
    };
    if json {
        let value = json!({
            "project": query::project_json(context.project, true),
            "area": context.area.map(|area| query::area_json(area, false)),
            "tasks": context.tasks.iter().map(|task| query::task_json(task, false)).collect::<Vec<_>>(),
            "warnings": context.warnings.iter().map(query::warning_json).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        println!("{}", render_project_line(context.project));
        if let Some(area) = context.area {
            println!("  area: {}", area.title);
        }
        if !context.tasks.is_empty() {
            println!();
            for task in &context.tasks {
                println!("  {}", render_task_line(task));
            }
        }
        for warning in &context.warnings {
            println!("warning: {warning}");
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_area(root: Option<&Path>, name: &str, json: bool) -> Result<ExitCode> {
    let vault = open_vault(root, false)?;
    let index = vault.index();
    let context = match query::area_context(index, name) {
        Ok(context) => context,
        Err(err) => return fail_query(err),
    };
    if json {
        let value = json!({
            "area": query::area_json(context.area, true),
            "projects": context.projects.iter().map(|project| query::project_json(project, false)).collect::<Vec<_>>(),
            "tasks": context.tasks.iter().map(|task| query::task_json(task, false)).collect::<Vec<_>>(),
            "warnings": context.warnings.iter().map(query::warning_json).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        println!("{}", render_area_line(context.area));
        if !context.projects.is_empty() {
            println!();
            println!("projects:");
            for project in &context.projects {
                println!("  {}", render_project_line(project));
            }
        }
        if !context.tasks.is_empty() {
            println!();
            println!("tasks:");
            for task in &context.tasks {
                println!("  {}", render_task_line(task));
            }
        }
        for warning in &context.warnings {
            println!("warning: {warning}");
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_check(root: Option<&Path>, all: bool, json: bool) -> Result<ExitCode> {
    let vault = open_vault(root, all)?;
    let report = check::check_vault(vault.index());
    if json {
        println!("{}", serde_json::to_string_pretty(&report.to_json())?);
    } else {
        for error in &report.errors {
            println!("error: {error}");
        }
        for warning in &report.warnings {
            println!("warning: {warning}");
        }
        if report.is_clean() {
            println!("vault is clean");
        }
    }
    if report.is_clean() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(1))
    }
}

fn cmd_init(root: Option<&Path>) -> Result<ExitCode> {
    let root = match root {
        Some(root) => root.to_path_buf(),
        None => std::env::current_dir().context("cannot read the current directory")?,
    };
    fs::create_dir_all(&root).with_context(|| format!("cannot create {}", root.display()))?;
    if !config::config_path(&root).exists() {
        let defaults = ParacordConfig {
            tasks_dir: Some(config::DEFAULT_TASKS_DIR.to_string()),
            projects_dir: Some(config::DEFAULT_PROJECTS_DIR.to_string()),
            areas_dir: Some(config::DEFAULT_AREAS_DIR.to_string()),
        };
        config::write_config(&root, &defaults)?;
    }
    let paths = VaultPaths::resolve(&root)?;
    for dir in [&paths.tasks_dir, &paths.projects_dir, &paths.areas_dir] {
        fs::create_dir_all(dir).with_context(|| format!("cannot create {}", dir.display()))?;
    }
    println!("initialized vault at {}", root.display());
    Ok(ExitCode::SUCCESS)
}

fn fail_query(err: QueryError) -> Result<ExitCode> {
    eprintln!("{err}");
    Ok(ExitCode::from(1))
}

fn fail_update(err: UpdateError) -> Result<ExitCode> {
    match err {
        UpdateError::NoMatch { .. } | UpdateError::Ambiguous { .. } => {
            eprintln!("{err}");
            Ok(ExitCode::from(1))
        }
        other => Err(other.into()),
    }
}

fn emit_warnings(warnings: &[Warning]) {
    for warning in warnings {
        eprintln!("warning: {warning}");
    }
}

fn record_entry(index: &VaultIndex, kind: Kind, pos: usize) -> (&str, &Path) {
    match kind {
        Kind::Task => {
            let task = index.task(pos);
            (task.name.as_str(), task.path.as_path())
        }
        Kind::Project => {
            let project = index.project(pos);
            (project.name.as_str(), project.path.as_path())
        }
        Kind::Area => {
            let area = index.area(pos);
            (area.name.as_str(), area.path.as_path())
        }
    }
}

fn record_json_at(index: &VaultIndex, kind: Kind, pos: usize) -> serde_json::Value {
    match kind {
        Kind::Task => query::task_json(index.task(pos), true),
        Kind::Project => query::project_json(index.project(pos), true),
        Kind::Area => query::area_json(index.area(pos), true),
    }
}

fn render_record_detail(index: &VaultIndex, kind: Kind, pos: usize) -> String {
    match kind {
        Kind::Task => render_task_detail(index.task(pos)),
        Kind::Project => render_project_detail(index.project(pos)),
        Kind::Area => render_area_detail(index.area(pos)),
    }
}

fn render_task_line(task: &Task) -> String {
    let status = task.status.map(|status| status.as_str()).unwrap_or("none");
    let mut line = format!("[{status:<11}] {}  ({})", task.title, task.name);
    if let Some(due) = &task.due {
        line.push_str(&format!("  due {due}"));
    }
    line
}

fn render_project_line(project: &Project) -> String {
    let status = project
        .status
        .map(|status| status.as_str())
        .unwrap_or("none");
    format!("[{status:<9}] {}  ({})", project.title, project.name)
}

fn render_area_line(area: &Area) -> String {
    let status = area.status.map(|status| status.as_str()).unwrap_or("none");
    format!("[{status:<8}] {}  ({})", area.title, area.name)
}

fn render_task_detail(task: &Task) -> String {
    let mut out = format!("task {}\n", task.name);
    push_field(&mut out, "path", Some(task.path.display().to_string().as_str()));
    push_field(&mut out, "title", Some(task.title.as_str()));
    push_field(&mut out, "status", task.status.map(|status| status.as_str()));
    push_field(&mut out, "project", task.project.as_ref().map(|r| r.as_raw()));
    push_field(&mut out, "area", task.area.as_ref().map(|r| r.as_raw()));
    push_field(&mut out, "created", task.created.as_deref());
    push_field(&mut out, "updated", task.updated.as_deref());
    push_field(&mut out, "completed", task.completed.as_deref());
    push_field(&mut out, "due", task.due.as_deref());
    push_field(&mut out, "scheduled", task.scheduled.as_deref());
    push_field(&mut out, "defer", task.defer.as_deref());
    push_body(&mut out, &task.body);
    out
}

fn render_project_detail(project: &Project) -> String {
    let mut out = format!("project {}\n", project.name);
    push_field(&mut out, "path", Some(project.path.display().to_string().as_str()));
    push_field(&mut out, "title", Some(project.title.as_str()));
    push_field(&mut out, "status", project.status.map(|status| status.as_str()));
    push_field(&mut out, "area", project.area.as_ref().map(|r| r.as_raw()));
    push_field(&mut out, "description", project.description.as_deref());
    push_field(&mut out, "created", project.created.as_deref());
    push_field(&mut out, "updated", project.updated.as_deref());
    push_field(&mut out, "completed", project.completed.as_deref());
    push_field(&mut out, "due", project.due.as_deref());
    push_body(&mut out, &project.body);
    out
}

fn render_area_detail(area: &Area) -> String {
    let mut out = format!("area {}\n", area.name);
    push_field(&mut out, "path", Some(area.path.display().to_string().as_str()));
    push_field(&mut out, "title", Some(area.title.as_str()));
    push_field(&mut out, "status", area.status.map(|status| status.as_str()));
    push_field(&mut out, "description", area.description.as_deref());
    push_field(&mut out, "created", area.created.as_deref());
    push_field(&mut out, "updated", area.updated.as_deref());
    push_body(&mut out, &area.body);
    out
}

fn push_field(out: &mut String, name: &str, value: Option<&str>) {
    if let Some(value) = value {
        out.push_str(&format!("  {:<12} {value}\n", format!("{name}:")));
    }
}

fn push_body(out: &mut String, body: &str) {
    if !body.trim().is_empty() {
        out.push('\n');
        out.push_str(body.trim_end());
        out.push('\n');
    }
}
