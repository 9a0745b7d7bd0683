use std::cmp::Ordering;
use std::collections::HashSet;
use std::path::Path;

use chrono::NaiveDateTime;
use serde_json::json;
use thiserror::Error;

use crate::dates;
use crate::index::VaultIndex;
use crate::record::{Area, Kind, Project, Task, TaskStatus};
use crate::scan::Warning;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("no {kind} matches `{query}`")]
    NoMatch { kind: Kind, query: String },
    #[error("`{query}` is ambiguous, matching {kind}s: {}", .candidates.join(", "))]
    Ambiguous {
        kind: Kind,
        query: String,
        candidates: Vec<String>,
    },
}

/// Criteria AND together; the status list ORs within itself.
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub statuses: Vec<TaskStatus>,
    pub project: Option<String>,
    pub area: Option<String>,
    pub due_before: Option<NaiveDateTime>,
    pub search: Option<String>,
}

/// Filter the indexed tasks. Name-valued criteria resolve through the
/// hybrid matcher and must land on exactly one record.
pub fn filter_tasks<'a>(
    index: &'a VaultIndex,
    filter: &TaskFilter,
) -> Result<Vec<&'a Task>, QueryError> {
    let mut allowed: Option<HashSet<usize>> = None;
    if let Some(project_query) = &filter.project {
        let project = resolve_project(index, project_query)?;
        allowed = Some(index.tasks_in_project(project).iter().copied().collect());
    }
    if let Some(area_query) = &filter.area {
        let area = resolve_area(index, area_query)?;
        let set: HashSet<usize> = index.tasks_in_area(area).into_iter().collect();
        allowed = Some(match allowed {
            Some(prev) => prev.intersection(&set).copied().collect(),
            None => set,
        });
    }
    let mut result = Vec::new();
    for (pos, task) in index.tasks().iter().enumerate() {
        if let Some(allowed) = &allowed {
            if !allowed.contains(&pos) {
                continue;
            }
        }
        if !filter.statuses.is_empty() {
            match task.status {
                Some(status) if filter.statuses.contains(&status) => {}
                _ => continue,
            }
        }
        if let Some(cutoff) = filter.due_before {
            match task.due.as_deref().and_then(dates::parse_date_value) {
                Some(due) if due <= cutoff => {}
                _ => continue,
            }
        }
        if let Some(needle) = &filter.search {
            if !task_matches_text(task, needle) {
                continue;
            }
        }
        result.push(task);
    }
    Ok(result)
}

/// Resolve a query to exactly one project position or explain why not.
pub fn resolve_project(index: &VaultIndex, query: &str) -> Result<usize, QueryError> {
    one_match(Kind::Project, query, index.find_projects(query), |pos| {
        index.project(pos).name.clone()
    })
}

pub fn resolve_area(index: &VaultIndex, query: &str) -> Result<usize, QueryError> {
    one_match(Kind::Area, query, index.find_areas(query), |pos| {
        index.area(pos).name.clone()
    })
}

pub fn resolve_task(index: &VaultIndex, query: &str) -> Result<usize, QueryError> {
    one_match(Kind::Task, query, index.find_tasks(query), |pos| {
        index.task(pos).name.clone()
    })
}

fn one_match(
    kind: Kind,
    query: &str,
    matches: Vec<usize>,
    name_of: impl Fn(usize) -> String,
) -> Result<usize, QueryError> {
    match matches.len() {
        0 => Err(QueryError::NoMatch {
            kind,
            query: query.to_string(),
        }),
        1 => Ok(matches[0]),
        _ => Err(QueryError::Ambiguous {
            kind,
            query: query.to_string(),
            candidates: matches.into_iter().map(name_of).collect(),
        }),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Title,
    Status,
    Created,
    Updated,
    Due,
    Scheduled,
    Completed,
}

impl SortKey {
    pub fn parse(value: &str) -> Option<SortKey> {
        match value.trim().to_lowercase().as_str() {
            "title" => Some(SortKey::Title),
            "status" => Some(SortKey::Status),
            "created" => Some(SortKey::Created),
            "updated" => Some(SortKey::Updated),
            "due" => Some(SortKey::Due),
            "scheduled" => Some(SortKey::Scheduled),
            "completed" => Some(SortKey::Completed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Ascending,
    Descending,
}

/// Sort tasks by one key. Records missing the key (or holding a date the
/// lenient parser cannot read) go after all records that have it, in both
/// directions. Ties break by title, then path.
pub fn sort_tasks(tasks: &mut [&Task], key: SortKey, direction: Direction) {
    tasks.sort_by(|a, b| {
        let ordering = match (sort_value(a, key), sort_value(b, key)) {
            (Some(left), Some(right)) => {
                let ordering = left.cmp(&right);
                if direction == Direction::Descending {
                    ordering.reverse()
                } else {
                    ordering
                }
            }
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        ordering
            .then_with(|| a.title.to_lowercase().cmp(&b.title.to_lowercase()))
            .then_with(|| a.path.cmp(&b.path))
    });
}

pub fn limit<T>(items: &mut Vec<T>, n: Option<usize>) {
    if let Some(n) = n {
        items.truncate(n);
    }
}

#[derive(PartialEq, Eq, PartialOrd, Ord)]
enum SortValue {
    Rank(u8),
    Text(String),
    Time(NaiveDateTime),
}

fn sort_value(task: &Task, key: SortKey) -> Option<SortValue> {
    match key {
        SortKey::Title => Some(SortValue::Text(task.title.to_lowercase())),
        SortKey::Status => task.status.map(|status| SortValue::Rank(status as u8)),
        SortKey::Created => time_value(task.created.as_deref()),
        SortKey::Updated => time_value(task.updated.as_deref()),
        SortKey::Due => time_value(task.due.as_deref()),
        SortKey::Scheduled => time_value(task.scheduled.as_deref()),
        SortKey::Completed => time_value(task.completed.as_deref()),
    }
}

fn time_value(value: Option<&str>) -> Option<SortValue> {
    value.and_then(dates::parse_date_value).map(SortValue::Time)
}

pub fn task_matches_text(task: &Task, needle: &str) -> bool {
    let needle = needle.to_lowercase();
    task.title.to_lowercase().contains(&needle) || task.body.to_lowercase().contains(&needle)
}

pub fn project_matches_text(project: &Project, needle: &str) -> bool {
    let needle = needle.to_lowercase();
    project.title.to_lowercase().contains(&needle)
        || project
            .description
            .as_ref()
            .map(|text| text.to_lowercase().contains(&needle))
            .unwrap_or(false)
        || project.body.to_lowercase().contains(&needle)
}

pub fn area_matches_text(area: &Area, needle: &str) -> bool {
    let needle = needle.to_lowercase();
    area.title.to_lowercase().contains(&needle)
        || area
            .description
            .as_ref()
            .map(|text| text.to_lowercase().contains(&needle))
            .unwrap_or(false)
        || area.body.to_lowercase().contains(&needle)
}

/// One project with everything that belongs to it, plus the index warnings
/// whose source file lies inside this subgraph.
#[derive(Debug)]
pub struct ProjectContext<'a> {
    pub project: &'a Project,
    pub area: Option<&'a Area>,
    pub tasks: Vec<&'a Task>,
    pub warnings: Vec<Warning>,
}

pub fn project_context<'a>(
    index: &'a VaultIndex,
    query: &str,
) -> Result<ProjectContext<'a>, QueryError> {
    let pos = resolve_project(index, query)?;
    let project = index.project(pos);
    let tasks: Vec<&Task> = index
        .tasks_in_project(pos)
        .iter()
        .map(|&task| index.task(task))
        .collect();
    let mut paths: HashSet<&Path> = HashSet::new();
    paths.insert(project.path.as_path());
    paths.extend(tasks.iter().map(|task| task.path.as_path()));
    Ok(ProjectContext {
        project,
        area: index.area_for_project(pos).map(|area| index.area(area)),
        tasks,
        warnings: subgraph_warnings(index, &paths),
    })
}

#[derive(Debug)]
pub struct AreaContext<'a> {
    pub area: &'a Area,
    pub projects: Vec<&'a Project>,
    pub tasks: Vec<&'a Task>,
    pub warnings: Vec<Warning>,
}

pub fn area_context<'a>(index: &'a VaultIndex, query: &str) -> Result<AreaContext<'a>, QueryError> {
    let pos = resolve_area(index, query)?;
    let area = index.area(pos);
    let projects: Vec<&Project> = index
        .projects_in_area(pos)
        .iter()
        .map(|&project| index.project(project))
        .collect();
    let tasks: Vec<&Task> = index
        .tasks_in_area(pos)
        .into_iter()
        .map(|task| index.task(task))
        .collect();
    let mut paths: HashSet<&Path> = HashSet::new();
    paths.insert(area.path.as_path());
    paths.extend(projects.iter().map(|project| project.path.as_path()));
    paths.extend(tasks.iter().map(|task| task.path.as_path()));
    Ok(AreaContext {
        area,
        projects,
        tasks,
        warnings: subgraph_warnings(index, &paths),
    })
}

fn subgraph_warnings(index: &VaultIndex, paths: &HashSet<&Path>) -> Vec<Warning> {
    index
        .warnings()
        .iter()
        .filter(|warning| paths.contains(warning.source.as_path()))
        .cloned()
        .collect()
}

pub fn task_json(task: &Task, include_body: bool) -> serde_json::Value {
    let mut map = serde_json::Map::new();
    map.insert("path".into(), json!(task.path.display().to_string()));
    map.insert("name".into(), json!(task.name));
    map.insert("title".into(), json!(task.title));
    map.insert("status".into(), json!(task.status.map(|s| s.as_str())));
    map.insert(
        "project".into(),
        json!(task.project.as_ref().map(|r| r.as_raw())),
    );
    map.insert("area".into(), json!(task.area.as_ref().map(|r| r.as_raw())));
    map.insert("created".into(), json!(task.created));
    map.insert("updated".into(), json!(task.updated));
    map.insert("completed".into(), json!(task.completed));
    map.insert("due".into(), json!(task.due));
    map.insert("scheduled".into(), json!(task.scheduled));
    map.insert("defer".into(), json!(task.defer));
    map.insert(
        "extra".into(),
        serde_json::to_value(&task.extra).unwrap_or(serde_json::Value::Null),
    );
    if include_body {
        map.insert("body".into(), json!(task.body));
    }
    serde_json::Value::Object(map)
}

pub fn project_json(project: &Project, include_body: bool) -> serde_json::Value {
    let mut map = serde_json::Map::new();
    map.insert("path".into(), json!(project.path.display().to_string()));
    map.insert("name".into(), json!(project.name));
    map.insert("title".into(), json!(project.title));
    map.insert("status".into(), json!(project.status.map(|s| s.as_str())));
    map.insert(
        "area".into(),
        json!(project.area.as_ref().map(|r| r.as_raw())),
    );
    map.insert("description".into(), json!(project.description));
    map.insert("created".into(), json!(project.created));
    map.insert("updated".into(), json!(project.updated));
    map.insert("completed".into(), json!(project.completed));
    map.insert("due".into(), json!(project.due));
    map.insert(
        "extra".into(),
        serde_json::to_value(&project.extra).unwrap_or(serde_json::Value::Null),
    );
    if include_body {
        map.insert("body".into(), json!(project.body));
    }
    serde_json::Value::Object(map)
}

pub fn area_json(area: &Area, include_body: bool) -> serde_json::Value {
    let mut map = serde_json::Map::new();
    map.insert("path".into(), json!(area.path.display().to_string()));
    map.insert("name".into(), json!(area.name));
    map.insert("title".into(), json!(area.title));
    map.insert("status".into(), json!(area.status.map(|s| s.as_str())));
    map.insert("description".into(), json!(area.description));
    map.insert("created".into(), json!(area.created));
    map.insert("updated".into(), json!(area.updated));
    map.insert(
        "extra".into(),
        serde_json::to_value(&area.extra).unwrap_or(serde_json::Value::Null),
    );
    if include_body {
        map.insert("body".into(), json!(area.body));
    }
    serde_json::Value::Object(map)
}

pub fn warning_json(warning: &Warning) -> serde_json::Value {
    json!({
        "source": warning.source.display().to_string(),
        "message": warning.message,
    })
}
