use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde_json::json;
use serde_yaml::Value;

use crate::frontmatter;
use crate::index::VaultIndex;
use crate::record::Kind;

/// Findings over a built index. Errors are structural problems worth fixing;
/// warnings restate what the scan and reference resolution already contained.
/// Checking never mutates anything.
#[derive(Debug, Default)]
pub struct CheckReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl CheckReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "errors": self.errors,
            "warnings": self.warnings,
        })
    }
}

pub fn check_vault(index: &VaultIndex) -> CheckReport {
    let mut report = CheckReport::default();
    duplicate_name_errors(
        index.tasks().iter().map(|task| (task.name.as_str(), task.path.as_path())),
        Kind::Task,
        &mut report.errors,
    );
    duplicate_name_errors(
        index
            .projects()
            .iter()
            .map(|project| (project.name.as_str(), project.path.as_path())),
        Kind::Project,
        &mut report.errors,
    );
    duplicate_name_errors(
        index.areas().iter().map(|area| (area.name.as_str(), area.path.as_path())),
        Kind::Area,
        &mut report.errors,
    );
    multiple_project_reference_errors(index, &mut report.errors);
    for warning in index.warnings() {
        report.warnings.push(warning.to_string());
    }
    report
}

fn duplicate_name_errors<'a>(
    names: impl Iterator<Item = (&'a str, &'a Path)>,
    kind: Kind,
    errors: &mut Vec<String>,
) {
    let mut by_name: HashMap<String, Vec<&Path>> = HashMap::new();
    for (name, path) in names {
        by_name.entry(name.to_lowercase()).or_default().push(path);
    }
    let mut duplicates: Vec<(String, Vec<&Path>)> = by_name
        .into_iter()
        .filter(|(_, paths)| paths.len() > 1)
        .collect();
    duplicates.sort_by(|a, b| a.0.cmp(&b.0));
    for (name, mut paths) in duplicates {
        paths.sort();
        let list = paths
            .iter()
            .map(|path| path.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        errors.push(format!("duplicate {kind} name `{name}`: {list}"));
    }
}

/// A task takes at most one project. The typed schema keeps the first entry
/// of a list-valued field, so this looks at the raw tree again.
fn multiple_project_reference_errors(index: &VaultIndex, errors: &mut Vec<String>) {
    for task in index.tasks() {
        let Ok(content) = fs::read_to_string(&task.path) else {
            continue;
        };
        let Ok((front_src, _)) = frontmatter::split_front_matter(&content) else {
            continue;
        };
        let Ok(front) = frontmatter::parse_mapping(front_src) else {
            continue;
        };
        if let Some(Value::Sequence(items)) = front.get("project") {
            if items.len() > 1 {
                errors.push(format!(
                    "task `{}` carries {} project references; a task takes at most one",
                    task.name,
                    items.len()
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::VaultPaths;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn vault(tmp: &TempDir) -> VaultPaths {
        VaultPaths {
            root: tmp.path().to_path_buf(),
            tasks_dir: tmp.path().join("tasks"),
            projects_dir: tmp.path().join("projects"),
            areas_dir: tmp.path().join("areas"),
        }
    }

    fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
        fs::create_dir_all(dir).expect("create dir");
        let path = dir.join(name);
        fs::write(&path, content).expect("write file");
        path
    }

    #[test]
    fn clean_vault_reports_nothing() {
        let tmp = TempDir::new().expect("tempdir");
        let paths = vault(&tmp);
        write_file(&paths.tasks_dir, "t.md", "---\ntitle: T\n---\n");
        let index = VaultIndex::build(&paths, false);
        let report = check_vault(&index);
        assert!(report.is_clean());
    }

    #[test]
    fn duplicate_names_within_a_kind_are_errors() {
        let tmp = TempDir::new().expect("tempdir");
        let paths = vault(&tmp);
        write_file(&paths.projects_dir, "Plan.md", "---\ntitle: Plan\n---\n");
        write_file(
            &paths.projects_dir.join("archive"),
            "plan.md",
            "---\ntitle: Old plan\n---\n",
        );
        let index = VaultIndex::build(&paths, true);
        let report = check_vault(&index);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("duplicate project name `plan`"));
    }

    #[test]
    fn same_name_across_kinds_is_fine() {
        let tmp = TempDir::new().expect("tempdir");
        let paths = vault(&tmp);
        write_file(&paths.projects_dir, "Ops.md", "---\ntitle: Ops project\n---\n");
        write_file(&paths.areas_dir, "Ops.md", "---\ntitle: Ops area\n---\n");
        let index = VaultIndex::build(&paths, false);
        let report = check_vault(&index);
        assert!(report.errors.is_empty());
    }

    #[test]
    fn multiple_project_references_are_an_error() {
        let tmp = TempDir::new().expect("tempdir");
        let paths = vault(&tmp);
        write_file(&paths.projects_dir, "Alpha.md", "---\ntitle: Alpha\n---\n");
        write_file(&paths.projects_dir, "Beta.md", "---\ntitle: Beta\n---\n");
        write_file(
            &paths.tasks_dir,
            "torn.md",
            concat!(
                "---\n",
                "title: Torn between projects\n",
                "project:\n",
                "  - \"[[Alpha]]\"\n",
                "  - \"[[Beta]]\"\n",
                "---\n",
            ),
        );
        let index = VaultIndex::build(&paths, false);
        let report = check_vault(&index);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("at most one"));
    }

    #[test]
    fn unresolved_references_surface_as_warnings() {
        let tmp = TempDir::new().expect("tempdir");
        let paths = vault(&tmp);
        write_file(
            &paths.tasks_dir,
            "t.md",
            "---\ntitle: T\nproject: \"[[Ghost]]\"\n---\n",
        );
        let index = VaultIndex::build(&paths, false);
        let report = check_vault(&index);
        assert!(report.errors.is_empty());
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("unknown project"));
    }
}
