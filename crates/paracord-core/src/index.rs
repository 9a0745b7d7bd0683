use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::record::{Area, Kind, Project, Record, Task};
use crate::reference::RecordRef;
use crate::scan::{self, ScanOutcome, Warning};
use crate::vault::VaultPaths;

/// Scan-once, query-many view of the whole vault.
///
/// Records live in flat arenas; every relationship is a `usize` position
/// into them, so nothing here owns a reference to anything else. The index
/// is immutable after `build`.
#[derive(Debug)]
pub struct VaultIndex {
    tasks: Vec<Task>,
    projects: Vec<Project>,
    areas: Vec<Area>,
    task_names: HashMap<String, Vec<usize>>,
    project_names: HashMap<String, Vec<usize>>,
    area_names: HashMap<String, Vec<usize>>,
    task_project: Vec<Option<usize>>,
    task_area: Vec<Option<usize>>,
    project_area: Vec<Option<usize>>,
    tasks_by_project: Vec<Vec<usize>>,
    tasks_by_area: Vec<Vec<usize>>,
    projects_by_area: Vec<Vec<usize>>,
    warnings: Vec<Warning>,
}

impl VaultIndex {
    /// Scan the three kind directories once and resolve every reference.
    ///
    /// Build never fails: unreadable or unparsable files and references to
    /// records that do not exist are all contained as warnings, and the
    /// referring record stays in the index.
    pub fn build(paths: &VaultPaths, include_archive: bool) -> VaultIndex {
        let mut warnings = Vec::new();
        let tasks = collect_kind(
            scan::scan_dir(&paths.tasks_dir, Kind::Task, include_archive),
            &mut warnings,
            |record| match record {
                Record::Task(task) => Some(task),
                _ => None,
            },
        );
        let projects = collect_kind(
            scan::scan_dir(&paths.projects_dir, Kind::Project, include_archive),
            &mut warnings,
            |record| match record {
                Record::Project(project) => Some(project),
                _ => None,
            },
        );
        let areas = collect_kind(
            scan::scan_dir(&paths.areas_dir, Kind::Area, include_archive),
            &mut warnings,
            |record| match record {
                Record::Area(area) => Some(area),
                _ => None,
            },
        );

        let task_entries: Vec<(&str, &Path)> = tasks
            .iter()
            .map(|task| (task.name.as_str(), task.path.as_path()))
            .collect();
        let task_names = name_table(&task_entries, Kind::Task, &mut warnings);
        let project_entries: Vec<(&str, &Path)> = projects
            .iter()
            .map(|project| (project.name.as_str(), project.path.as_path()))
            .collect();
        let project_names = name_table(&project_entries, Kind::Project, &mut warnings);
        let area_entries: Vec<(&str, &Path)> = areas
            .iter()
            .map(|area| (area.name.as_str(), area.path.as_path()))
            .collect();
        let area_names = name_table(&area_entries, Kind::Area, &mut warnings);

        let project_paths: Vec<PathBuf> =
            projects.iter().map(|project| project.path.clone()).collect();
        let area_paths: Vec<PathBuf> = areas.iter().map(|area| area.path.clone()).collect();

        let mut project_area = vec![None; projects.len()];
        let mut projects_by_area = vec![Vec::new(); areas.len()];
        for (pos, project) in projects.iter().enumerate() {
            if let Some(reference) = &project.area {
                match resolve_reference(reference, &area_names, &area_paths) {
                    Some(area) => {
                        project_area[pos] = Some(area);
                        projects_by_area[area].push(pos);
                    }
                    None => warnings.push(Warning::new(
                        &project.path,
                        format!(
                            "project `{}` references unknown area `{}`",
                            project.name,
                            reference_label(reference)
                        ),
                    )),
                }
            }
        }

        let mut task_project = vec![None; tasks.len()];
        let mut task_area = vec![None; tasks.len()];
        let mut tasks_by_project = vec![Vec::new(); projects.len()];
        let mut tasks_by_area = vec![Vec::new(); areas.len()];
        for (pos, task) in tasks.iter().enumerate() {
            if let Some(reference) = &task.project {
                match resolve_reference(reference, &project_names, &project_paths) {
                    Some(project) => {
                        task_project[pos] = Some(project);
                        tasks_by_project[project].push(pos);
                    }
                    None => warnings.push(Warning::new(
                        &task.path,
                        format!(
                            "task `{}` references unknown project `{}`",
                            task.name,
                            reference_label(reference)
                        ),
                    )),
                }
            }
            if let Some(reference) = &task.area {
                match resolve_reference(reference, &area_names, &area_paths) {
                    Some(area) => {
                        task_area[pos] = Some(area);
                        tasks_by_area[area].push(pos);
                    }
                    None => warnings.push(Warning::new(
                        &task.path,
                        format!(
                            "task `{}` references unknown area `{}`",
                            task.name,
                            reference_label(reference)
                        ),
                    )),
                }
            }
        }

        debug!(
            tasks = tasks.len(),
            projects = projects.len(),
            areas = areas.len(),
            warnings = warnings.len(),
            "index built"
        );
        VaultIndex {
            tasks,
            projects,
            areas,
            task_names,
            project_names,
            area_names,
            task_project,
            task_area,
            project_area,
            tasks_by_project,
            tasks_by_area,
            projects_by_area,
            warnings,
        }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn areas(&self) -> &[Area] {
        &self.areas
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn task(&self, pos: usize) -> &Task {
        &self.tasks[pos]
    }

    pub fn project(&self, pos: usize) -> &Project {
        &self.projects[pos]
    }

    pub fn area(&self, pos: usize) -> &Area {
        &self.areas[pos]
    }

    /// Exact case-insensitive name lookup. When several records share the
    /// name the scan-order first one wins.
    pub fn task_position(&self, name: &str) -> Option<usize> {
        first_position(&self.task_names, name)
    }

    pub fn project_position(&self, name: &str) -> Option<usize> {
        first_position(&self.project_names, name)
    }

    pub fn area_position(&self, name: &str) -> Option<usize> {
        first_position(&self.area_names, name)
    }

    pub fn project_for_task(&self, task: usize) -> Option<usize> {
        self.task_project[task]
    }

    pub fn area_for_project(&self, project: usize) -> Option<usize> {
        self.project_area[project]
    }

    /// The task's own area reference wins; otherwise the task belongs to its
    /// project's area; otherwise it has none.
    pub fn area_for_task(&self, task: usize) -> Option<usize> {
        self.task_area[task]
            .or_else(|| self.task_project[task].and_then(|project| self.project_area[project]))
    }

    pub fn tasks_in_project(&self, project: usize) -> &[usize] {
        &self.tasks_by_project[project]
    }

    pub fn projects_in_area(&self, area: usize) -> &[usize] {
        &self.projects_by_area[area]
    }

    /// All tasks belonging to an area: direct references first, then the
    /// tasks of every project in the area, deduplicated by file path.
    pub fn tasks_in_area(&self, area: usize) -> Vec<usize> {
        let mut seen: HashSet<&Path> = HashSet::new();
        let mut result = Vec::new();
        for &task in &self.tasks_by_area[area] {
            if seen.insert(self.tasks[task].path.as_path()) {
                result.push(task);
            }
        }
        for &project in &self.projects_by_area[area] {
            for &task in &self.tasks_by_project[project] {
                if seen.insert(self.tasks[task].path.as_path()) {
                    result.push(task);
                }
            }
        }
        result
    }

    /// Hybrid name match: an exact case-insensitive hit against the name
    /// table returns exactly those records; only when that comes up empty
    /// does a substring scan over names and titles run. The full match set
    /// comes back either way; picking one is the caller's concern.
    pub fn find_tasks(&self, query: &str) -> Vec<usize> {
        find_positions(
            query,
            &self.task_names,
            self.tasks.iter().map(|task| (&task.name, &task.title)),
        )
    }

    pub fn find_projects(&self, query: &str) -> Vec<usize> {
        find_positions(
            query,
            &self.project_names,
            self.projects.iter().map(|project| (&project.name, &project.title)),
        )
    }

    pub fn find_areas(&self, query: &str) -> Vec<usize> {
        find_positions(
            query,
            &self.area_names,
            self.areas.iter().map(|area| (&area.name, &area.title)),
        )
    }
}

fn collect_kind<T>(
    outcome: ScanOutcome,
    warnings: &mut Vec<Warning>,
    pick: impl Fn(Record) -> Option<T>,
) -> Vec<T> {
    warnings.extend(outcome.warnings);
    outcome.records.into_iter().filter_map(pick).collect()
}

fn name_table(
    entries: &[(&str, &Path)],
    kind: Kind,
    warnings: &mut Vec<Warning>,
) -> HashMap<String, Vec<usize>> {
    let mut table: HashMap<String, Vec<usize>> = HashMap::new();
    for (pos, (name, path)) in entries.iter().enumerate() {
        let positions = table.entry(name.to_lowercase()).or_default();
        if let Some(&first) = positions.first() {
            let (_, first_path) = entries[first];
            warnings.push(Warning::new(
                *path,
                format!(
                    "duplicate {kind} name `{name}` also used by {}",
                    first_path.display()
                ),
            ));
        }
        positions.push(pos);
    }
    table
}

fn first_position(names: &HashMap<String, Vec<usize>>, name: &str) -> Option<usize> {
    names
        .get(&name.trim().to_lowercase())
        .and_then(|positions| positions.first().copied())
}

/// Named references resolve through the case-insensitive table; path-shaped
/// references resolve by component suffix against the records' actual paths.
fn resolve_reference(
    reference: &RecordRef,
    names: &HashMap<String, Vec<usize>>,
    paths: &[PathBuf],
) -> Option<usize> {
    if let Some(name) = reference.target_name() {
        return first_position(names, name);
    }
    let target = Path::new(reference.target_path()?);
    paths.iter().position(|candidate| candidate.ends_with(target))
}

fn reference_label(reference: &RecordRef) -> &str {
    reference.target_name().unwrap_or_else(|| reference.as_raw())
}

fn find_positions<'a>(
    query: &str,
    names: &HashMap<String, Vec<usize>>,
    entries: impl Iterator<Item = (&'a String, &'a String)>,
) -> Vec<usize> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }
    if let Some(exact) = names.get(&needle) {
        return exact.clone();
    }
    entries
        .enumerate()
        .filter(|(_, (name, title))| {
            name.to_lowercase().contains(&needle) || title.to_lowercase().contains(&needle)
        })
        .map(|(pos, _)| pos)
        .collect()
}
