use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde_yaml::{Mapping, Value};
use thiserror::Error;

use crate::frontmatter::{self, FrontMatterError};
use crate::reference::RecordRef;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error(transparent)]
    FrontMatter(#[from] FrontMatterError),
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error("unknown {kind} status `{value}`")]
    InvalidStatus { kind: Kind, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Task,
    Project,
    Area,
}

impl Kind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Task => "task",
            Kind::Project => "project",
            Kind::Area => "area",
        }
    }

    pub fn parse(value: &str) -> Option<Kind> {
        match value.trim().to_lowercase().as_str() {
            "task" => Some(Kind::Task),
            "project" => Some(Kind::Project),
            "area" => Some(Kind::Area),
            _ => None,
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Task workflow states, in workflow order so sorting by status follows the
/// pipeline rather than the alphabet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TaskStatus {
    Inbox,
    Ready,
    InProgress,
    Waiting,
    Done,
    Cancelled,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 6] = [
        TaskStatus::Inbox,
        TaskStatus::Ready,
        TaskStatus::InProgress,
        TaskStatus::Waiting,
        TaskStatus::Done,
        TaskStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Inbox => "inbox",
            TaskStatus::Ready => "ready",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::Waiting => "waiting",
            TaskStatus::Done => "done",
            TaskStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<TaskStatus> {
        match value.trim().to_lowercase().as_str() {
            "inbox" => Some(TaskStatus::Inbox),
            "ready" => Some(TaskStatus::Ready),
            "in-progress" => Some(TaskStatus::InProgress),
            "waiting" => Some(TaskStatus::Waiting),
            "done" => Some(TaskStatus::Done),
            "cancelled" => Some(TaskStatus::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Done | TaskStatus::Cancelled)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ProjectStatus {
    Planned,
    Active,
    OnHold,
    Done,
    Cancelled,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Planned => "planned",
            ProjectStatus::Active => "active",
            ProjectStatus::OnHold => "on-hold",
            ProjectStatus::Done => "done",
            ProjectStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<ProjectStatus> {
        match value.trim().to_lowercase().as_str() {
            "planned" => Some(ProjectStatus::Planned),
            "active" => Some(ProjectStatus::Active),
            "on-hold" => Some(ProjectStatus::OnHold),
            "done" => Some(ProjectStatus::Done),
            "cancelled" => Some(ProjectStatus::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ProjectStatus::Done | ProjectStatus::Cancelled)
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Areas are ongoing by nature; neither state is terminal and nothing ever
/// stamps `completed` on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AreaStatus {
    Active,
    Archived,
}

impl AreaStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AreaStatus::Active => "active",
            AreaStatus::Archived => "archived",
        }
    }

    pub fn parse(value: &str) -> Option<AreaStatus> {
        match value.trim().to_lowercase().as_str() {
            "active" => Some(AreaStatus::Active),
            "archived" => Some(AreaStatus::Archived),
            _ => None,
        }
    }
}

impl fmt::Display for AreaStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single actionable item. Date fields stay verbatim strings; the query
/// engine parses them only where ordering is needed.
#[derive(Debug, Clone)]
pub struct Task {
    pub path: PathBuf,
    pub name: String,
    pub title: String,
    pub status: Option<TaskStatus>,
    pub project: Option<RecordRef>,
    pub area: Option<RecordRef>,
    pub created: Option<String>,
    pub updated: Option<String>,
    pub completed: Option<String>,
    pub due: Option<String>,
    pub scheduled: Option<String>,
    pub defer: Option<String>,
    pub extra: HashMap<String, Value>,
    pub body: String,
}

#[derive(Debug, Clone)]
pub struct Project {
    pub path: PathBuf,
    pub name: String,
    pub title: String,
    pub status: Option<ProjectStatus>,
    pub area: Option<RecordRef>,
    pub description: Option<String>,
    pub created: Option<String>,
    pub updated: Option<String>,
    pub completed: Option<String>,
    pub due: Option<String>,
    pub extra: HashMap<String, Value>,
    pub body: String,
}

#[derive(Debug, Clone)]
pub struct Area {
    pub path: PathBuf,
    pub name: String,
    pub title: String,
    pub status: Option<AreaStatus>,
    pub description: Option<String>,
    pub created: Option<String>,
    pub updated: Option<String>,
    pub extra: HashMap<String, Value>,
    pub body: String,
}

#[derive(Debug, Clone)]
pub enum Record {
    Task(Task),
    Project(Project),
    Area(Area),
}

impl Record {
    pub fn kind(&self) -> Kind {
        match self {
            Record::Task(_) => Kind::Task,
            Record::Project(_) => Kind::Project,
            Record::Area(_) => Kind::Area,
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Record::Task(task) => &task.path,
            Record::Project(project) => &project.path,
            Record::Area(area) => &area.path,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Record::Task(task) => &task.name,
            Record::Project(project) => &project.name,
            Record::Area(area) => &area.name,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Record::Task(task) => &task.title,
            Record::Project(project) => &project.title,
            Record::Area(area) => &area.title,
        }
    }
}

/// A record's name is its file stem; matching on it is case-insensitive.
pub fn record_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Parse a record of the given kind. Pure function of the content; the path
/// is carried only as the record's identity.
pub fn parse_record(kind: Kind, path: &Path, content: &str) -> Result<Record, ParseError> {
    match kind {
        Kind::Task => parse_task(path, content).map(Record::Task),
        Kind::Project => parse_project(path, content).map(Record::Project),
        Kind::Area => parse_area(path, content).map(Record::Area),
    }
}

pub fn parse_task(path: &Path, content: &str) -> Result<Task, ParseError> {
    const KNOWN_KEYS: [&str; 10] = [
        "title",
        "status",
        "project",
        "area",
        "created",
        "updated",
        "completed",
        "due",
        "scheduled",
        "defer",
    ];
    let (front_src, body) = frontmatter::split_front_matter(content)?;
    let front = frontmatter::parse_mapping(front_src)?;
    let title = get_string(&front, "title").ok_or(ParseError::MissingField("title"))?;
    let status = match get_string(&front, "status") {
        Some(raw) => match TaskStatus::parse(&raw) {
            Some(status) => Some(status),
            None => {
                return Err(ParseError::InvalidStatus {
                    kind: Kind::Task,
                    value: raw,
                })
            }
        },
        None => None,
    };
    Ok(Task {
        path: path.to_path_buf(),
        name: record_name(path),
        title,
        status,
        project: get_reference(&front, "project"),
        area: get_reference(&front, "area"),
        created: get_string(&front, "created"),
        updated: get_string(&front, "updated"),
        completed: get_string(&front, "completed"),
        due: get_string(&front, "due"),
        scheduled: get_string(&front, "scheduled"),
        defer: get_string(&front, "defer"),
        extra: collect_extra(&front, &KNOWN_KEYS),
        body: body.to_string(),
    })
}

pub fn parse_project(path: &Path, content: &str) -> Result<Project, ParseError> {
    const KNOWN_KEYS: [&str; 8] = [
        "title",
        "status",
        "area",
        "description",
        "created",
        "updated",
        "completed",
        "due",
    ];
    let (front_src, body) = frontmatter::split_front_matter(content)?;
    let front = frontmatter::parse_mapping(front_src)?;
    let title = get_string(&front, "title").ok_or(ParseError::MissingField("title"))?;
    let status = match get_string(&front, "status") {
        Some(raw) => match ProjectStatus::parse(&raw) {
            Some(status) => Some(status),
            None => {
                return Err(ParseError::InvalidStatus {
                    kind: Kind::Project,
                    value: raw,
                })
            }
        },
        None => None,
    };
    Ok(Project {
        path: path.to_path_buf(),
        name: record_name(path),
        title,
        status,
        area: get_reference(&front, "area"),
        description: get_string(&front, "description"),
        created: get_string(&front, "created"),
        updated: get_string(&front, "updated"),
        completed: get_string(&front, "completed"),
        due: get_string(&front, "due"),
        extra: collect_extra(&front, &KNOWN_KEYS),
        body: body.to_string(),
    })
}

pub fn parse_area(path: &Path, content: &str) -> Result<Area, ParseError> {
    const KNOWN_KEYS: [&str; 5] = ["title", "status", "description", "created", "updated"];
    let (front_src, body) = frontmatter::split_front_matter(content)?;
    let front = frontmatter::parse_mapping(front_src)?;
    let title = get_string(&front, "title").ok_or(ParseError::MissingField("title"))?;
    let status = match get_string(&front, "status") {
        Some(raw) => match AreaStatus::parse(&raw) {
            Some(status) => Some(status),
            None => {
                return Err(ParseError::InvalidStatus {
                    kind: Kind::Area,
                    value: raw,
                })
            }
        },
        None => None,
    };
    Ok(Area {
        path: path.to_path_buf(),
        name: record_name(path),
        title,
        status,
        description: get_string(&front, "description"),
        created: get_string(&front, "created"),
        updated: get_string(&front, "updated"),
        extra: collect_extra(&front, &KNOWN_KEYS),
        body: body.to_string(),
    })
}

fn get_string(front: &Mapping, key: &str) -> Option<String> {
    front
        .get(key)
        .and_then(frontmatter::scalar_to_string)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Reference fields are scalar by convention; when someone has written a
/// list anyway, the first readable entry wins and the validation layer
/// reports the rest.
fn get_reference(front: &Mapping, key: &str) -> Option<RecordRef> {
    match front.get(key) {
        Some(Value::Sequence(items)) => items
            .iter()
            .find_map(|item| frontmatter::scalar_to_string(item).and_then(|raw| RecordRef::parse(&raw))),
        Some(value) => frontmatter::scalar_to_string(value).and_then(|raw| RecordRef::parse(&raw)),
        None => None,
    }
}

fn collect_extra(front: &Mapping, known_keys: &[&str]) -> HashMap<String, Value> {
    let mut extra = HashMap::new();
    for (key, value) in front {
        if let Some(name) = frontmatter::scalar_to_string(key) {
            if !known_keys.contains(&name.as_str()) {
                extra.insert(name, value.clone());
            }
        }
    }
    extra
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn task_content() -> &'static str {
        concat!(
            "---\n",
            "title: Write quarterly report\n",
            "status: in-progress\n",
            "project: \"[[Q1 Planning]]\"\n",
            "due: 2025-01-15\n",
            "priority: high\n",
            "---\n",
            "Draft the numbers section first.\n",
        )
    }

    #[test]
    fn parses_a_full_task() {
        let task = parse_task(Path::new("tasks/write-quarterly-report.md"), task_content())
            .expect("parse");
        assert_eq!(task.name, "write-quarterly-report");
        assert_eq!(task.title, "Write quarterly report");
        assert_eq!(task.status, Some(TaskStatus::InProgress));
        assert_eq!(
            task.project.as_ref().and_then(|r| r.target_name()),
            Some("Q1 Planning")
        );
        assert_eq!(task.due.as_deref(), Some("2025-01-15"));
        assert_eq!(task.body, "Draft the numbers section first.\n");
    }

    #[test]
    fn unknown_fields_land_in_extra() {
        let task = parse_task(Path::new("tasks/t.md"), task_content()).expect("parse");
        assert_eq!(task.extra.len(), 1);
        assert!(matches!(task.extra.get("priority"), Some(Value::String(_))));
    }

    #[test]
    fn missing_title_is_a_parse_failure() {
        let err = parse_task(Path::new("tasks/t.md"), "---\nstatus: ready\n---\n").unwrap_err();
        assert!(matches!(err, ParseError::MissingField("title")));
    }

    #[test]
    fn status_outside_the_enumeration_is_rejected() {
        let content = "---\ntitle: T\nstatus: someday\n---\n";
        let err = parse_task(Path::new("tasks/t.md"), content).unwrap_err();
        match err {
            ParseError::InvalidStatus { kind, value } => {
                assert_eq!(kind, Kind::Task);
                assert_eq!(value, "someday");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn status_is_optional() {
        let task = parse_task(Path::new("tasks/t.md"), "---\ntitle: T\n---\n").expect("parse");
        assert_eq!(task.status, None);
    }

    #[test]
    fn missing_front_matter_is_a_parse_failure() {
        let err = parse_task(Path::new("tasks/t.md"), "just a body\n").unwrap_err();
        assert!(matches!(err, ParseError::FrontMatter(_)));
    }

    #[test]
    fn task_statuses_round_trip_through_parse() {
        for status in TaskStatus::ALL {
            assert_eq!(TaskStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(TaskStatus::parse("DONE"), Some(TaskStatus::Done));
        assert_eq!(TaskStatus::parse("bogus"), None);
    }

    #[test]
    fn terminal_statuses_are_done_and_cancelled() {
        assert!(TaskStatus::Done.is_terminal());
        assert!(TaskStatus::Cancelled.is_terminal());
        assert!(!TaskStatus::InProgress.is_terminal());
        assert!(ProjectStatus::Done.is_terminal());
        assert!(!ProjectStatus::OnHold.is_terminal());
    }

    #[test]
    fn parses_a_project_with_area_reference() {
        let content = concat!(
            "---\n",
            "title: Q1 Planning\n",
            "status: active\n",
            "area: \"[[Work]]\"\n",
            "description: Quarterly goals and reviews\n",
            "---\n",
        );
        let project =
            parse_project(Path::new("projects/Q1 Planning.md"), content).expect("parse");
        assert_eq!(project.name, "Q1 Planning");
        assert_eq!(project.status, Some(ProjectStatus::Active));
        assert_eq!(
            project.area.as_ref().and_then(|r| r.target_name()),
            Some("Work")
        );
        assert_eq!(
            project.description.as_deref(),
            Some("Quarterly goals and reviews")
        );
    }

    #[test]
    fn parses_an_area() {
        let content = "---\ntitle: Work\nstatus: active\n---\nStanding context.\n";
        let area = parse_area(Path::new("areas/Work.md"), content).expect("parse");
        assert_eq!(area.name, "Work");
        assert_eq!(area.status, Some(AreaStatus::Active));
    }

    #[test]
    fn list_valued_reference_takes_the_first_entry() {
        let content = concat!(
            "---\n",
            "title: T\n",
            "project:\n",
            "  - \"[[Alpha]]\"\n",
            "  - \"[[Beta]]\"\n",
            "---\n",
        );
        let task = parse_task(Path::new("tasks/t.md"), content).expect("parse");
        assert_eq!(
            task.project.as_ref().and_then(|r| r.target_name()),
            Some("Alpha")
        );
    }

    #[test]
    fn path_shaped_reference_is_kept_without_a_name() {
        let content = "---\ntitle: T\nproject: projects/Q1 Planning.md\n---\n";
        let task = parse_task(Path::new("tasks/t.md"), content).expect("parse");
        let reference = task.project.expect("reference");
        assert_eq!(reference.target_name(), None);
        assert_eq!(reference.target_path(), Some("projects/Q1 Planning.md"));
    }
}
