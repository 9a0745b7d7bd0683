use std::collections::HashSet;
use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde_yaml::{Mapping, Value};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::debug;
use ulid::Ulid;

use crate::dates;
use crate::frontmatter;
use crate::query::{self, QueryError};
use crate::record::{self, AreaStatus, Kind, ParseError, ProjectStatus, Record, TaskStatus};
use crate::reference::RecordRef;
use crate::vault::Vault;

/// Numeric collision suffixes stop here; after that a ULID takes over.
const MAX_SLUG_ATTEMPTS: usize = 50;

#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("record not found: {0}")]
    NotFound(PathBuf),
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("invalid value for `{field}`: {reason}")]
    InvalidValue { field: String, reason: String },
    #[error("cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("no {kind} matches `{query}`")]
    NoMatch { kind: Kind, query: String },
    #[error("`{query}` is ambiguous, matching {kind}s: {}", .candidates.join(", "))]
    Ambiguous {
        kind: Kind,
        query: String,
        candidates: Vec<String>,
    },
}

impl From<QueryError> for UpdateError {
    fn from(err: QueryError) -> UpdateError {
        match err {
            QueryError::NoMatch { kind, query } => UpdateError::NoMatch { kind, query },
            QueryError::Ambiguous {
                kind,
                query,
                candidates,
            } => UpdateError::Ambiguous {
                kind,
                query,
                candidates,
            },
        }
    }
}

/// One field-level change: set a key to a string value, or drop the key.
#[derive(Debug, Clone)]
pub struct FieldEdit {
    pub key: String,
    pub value: EditValue,
}

#[derive(Debug, Clone)]
pub enum EditValue {
    Set(String),
    Remove,
}

impl FieldEdit {
    pub fn set(key: impl Into<String>, value: impl Into<String>) -> FieldEdit {
        FieldEdit {
            key: key.into(),
            value: EditValue::Set(value.into()),
        }
    }

    pub fn remove(key: impl Into<String>) -> FieldEdit {
        FieldEdit {
            key: key.into(),
            value: EditValue::Remove,
        }
    }
}

/// Apply an edit set to one record, preserving everything the edits do not
/// name.
///
/// The file is re-read every time and edited through the raw front matter
/// tree, never the typed schema, so unknown fields, stored date formats and
/// untouched reference encodings come through byte-identical. The body is
/// reattached untouched. The write goes to a temp file in the same
/// directory, is flushed and fsynced, then renamed over the target; on any
/// failure the original file stays as it was.
pub fn apply_edits(path: &Path, kind: Kind, edits: &[FieldEdit]) -> Result<Record, UpdateError> {
    let content = read_existing(path)?;
    let (front_src, body) = frontmatter::split_front_matter(&content).map_err(ParseError::from)?;
    let mut front = frontmatter::parse_mapping(front_src).map_err(ParseError::from)?;

    let was_terminal = status_is_terminal(kind, &front);
    for edit in edits {
        apply_one(&mut front, kind, edit)?;
    }

    let touched: HashSet<&str> = edits.iter().map(|edit| edit.key.trim()).collect();
    if kind != Kind::Area && touched.contains("status") && !touched.contains("completed") {
        let is_terminal = status_is_terminal(kind, &front);
        if is_terminal && !was_terminal {
            set_value(&mut front, "completed", Value::String(dates::now_stamp()));
        } else if !is_terminal && was_terminal {
            remove_value(&mut front, "completed");
        }
    }
    if !touched.contains("updated") {
        set_value(&mut front, "updated", Value::String(dates::now_stamp()));
    }

    let rendered = frontmatter::render_document(&front, body).map_err(ParseError::from)?;
    write_atomic(path, &rendered)?;
    debug!(path = %path.display(), edits = edits.len(), "record updated");
    Ok(record::parse_record(kind, path, &rendered)?)
}

/// Apply the same edit set to several records. Each file succeeds or fails
/// on its own; one failure never aborts the rest.
pub fn apply_edits_batch(
    paths: &[PathBuf],
    kind: Kind,
    edits: &[FieldEdit],
) -> Vec<(PathBuf, Result<Record, UpdateError>)> {
    paths
        .iter()
        .map(|path| (path.clone(), apply_edits(path, kind, edits)))
        .collect()
}

/// Resolve a name through the hybrid matcher, then edit the single record it
/// lands on. Zero matches and several matches are distinct failures; the
/// ambiguous case carries the candidate names.
pub fn update_by_name(
    vault: &Vault,
    kind: Kind,
    query: &str,
    edits: &[FieldEdit],
) -> Result<Record, UpdateError> {
    let index = vault.index();
    let pos = match kind {
        Kind::Task => query::resolve_task(index, query),
        Kind::Project => query::resolve_project(index, query),
        Kind::Area => query::resolve_area(index, query),
    }?;
    let path = match kind {
        Kind::Task => index.task(pos).path.clone(),
        Kind::Project => index.project(pos).path.clone(),
        Kind::Area => index.area(pos).path.clone(),
    };
    apply_edits(&path, kind, edits)
}

/// Initial fields for a new record. References may be bare names; they are
/// normalized to the symbolic link form on write.
#[derive(Debug, Clone, Default)]
pub struct NewRecord {
    pub title: String,
    pub status: Option<String>,
    pub project: Option<String>,
    pub area: Option<String>,
    pub due: Option<String>,
    pub body: Option<String>,
}

/// Create a record under `dir`. The filename is the slugged title; on
/// collision a numeric suffix counts up, and past the suffix bound a ULID
/// takes over, which cannot collide. Collisions are detected by the
/// no-clobber rename itself, never by a lookahead existence check.
pub fn create_record(dir: &Path, kind: Kind, new: &NewRecord) -> Result<Record, UpdateError> {
    let title = new.title.trim();
    if title.is_empty() {
        return Err(UpdateError::InvalidValue {
            field: "title".to_string(),
            reason: "must not be empty".to_string(),
        });
    }
    let mut front = Mapping::new();
    set_value(&mut front, "title", Value::String(title.to_string()));
    if let Some(raw) = &new.status {
        set_value(&mut front, "status", validated_value(kind, "status", raw)?);
    }
    if let Some(raw) = &new.project {
        if kind != Kind::Task {
            return Err(UpdateError::InvalidValue {
                field: "project".to_string(),
                reason: format!("a {kind} does not take a project reference"),
            });
        }
        set_value(&mut front, "project", validated_value(kind, "project", raw)?);
    }
    if let Some(raw) = &new.area {
        if kind == Kind::Area {
            return Err(UpdateError::InvalidValue {
                field: "area".to_string(),
                reason: "an area does not take an area reference".to_string(),
            });
        }
        set_value(&mut front, "area", validated_value(kind, "area", raw)?);
    }
    if let Some(raw) = &new.due {
        if kind == Kind::Area {
            return Err(UpdateError::InvalidValue {
                field: "due".to_string(),
                reason: "an area does not take a due date".to_string(),
            });
        }
        set_value(&mut front, "due", validated_value(kind, "due", raw)?);
    }
    let stamp = dates::now_stamp();
    set_value(&mut front, "created", Value::String(stamp.clone()));
    set_value(&mut front, "updated", Value::String(stamp));

    let body = match &new.body {
        Some(text) => format!("\n{}\n", text.trim_end()),
        None => String::new(),
    };
    let content = frontmatter::render_document(&front, &body).map_err(ParseError::from)?;

    fs::create_dir_all(dir).map_err(|err| write_error(dir, err))?;
    let mut tmp = NamedTempFile::new_in(dir).map_err(|err| write_error(dir, err))?;
    tmp.write_all(content.as_bytes())
        .map_err(|err| write_error(dir, err))?;
    tmp.as_file()
        .sync_all()
        .map_err(|err| write_error(dir, err))?;

    let slug = slug_title(title);
    let mut attempt = 1;
    loop {
        let filename = if attempt == 1 {
            format!("{slug}.md")
        } else if attempt <= MAX_SLUG_ATTEMPTS {
            format!("{slug}-{attempt}.md")
        } else {
            format!("{slug}-{}.md", Ulid::new().to_string().to_lowercase())
        };
        let target = dir.join(filename);
        match tmp.persist_noclobber(&target) {
            Ok(_) => {
                debug!(path = %target.display(), kind = %kind, "record created");
                return Ok(record::parse_record(kind, &target, &content)?);
            }
            Err(err) if err.error.kind() == std::io::ErrorKind::AlreadyExists => {
                tmp = err.file;
                attempt += 1;
            }
            Err(err) => return Err(write_error(&target, err.error)),
        }
    }
}

/// Lowercase the title and keep `[a-z0-9-]`, the way record names are spelled
/// on disk.
pub fn slug_title(title: &str) -> String {
    let re = Regex::new(r"[^a-zA-Z0-9\s\-]").expect("regex");
    let cleaned = re.replace_all(title, "");
    let cleaned = cleaned.trim().to_lowercase();
    let slug = Regex::new(r"[\s\-]+")
        .expect("regex")
        .replace_all(&cleaned, "-")
        .trim_matches('-')
        .to_string();
    if slug.is_empty() {
        "untitled".to_string()
    } else {
        slug
    }
}

fn apply_one(front: &mut Mapping, kind: Kind, edit: &FieldEdit) -> Result<(), UpdateError> {
    let key = edit.key.trim();
    if key.is_empty() {
        return Err(UpdateError::InvalidValue {
            field: edit.key.clone(),
            reason: "empty field name".to_string(),
        });
    }
    match &edit.value {
        EditValue::Remove => {
            if key == "title" {
                return Err(UpdateError::InvalidValue {
                    field: "title".to_string(),
                    reason: "title is required and cannot be removed".to_string(),
                });
            }
            remove_value(front, key);
        }
        EditValue::Set(raw) => {
            let value = validated_value(kind, key, raw)?;
            set_value(front, key, value);
        }
    }
    Ok(())
}

/// Validate and type one incoming value for its field. Known fields get the
/// kind's rules; everything else is stored as a bare YAML scalar.
fn validated_value(kind: Kind, key: &str, raw: &str) -> Result<Value, UpdateError> {
    if key == "title" {
        let title = raw.trim();
        if title.is_empty() {
            return Err(UpdateError::InvalidValue {
                field: "title".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        return Ok(Value::String(title.to_string()));
    }
    if key == "status" {
        let canonical = canonical_status(kind, raw).ok_or_else(|| UpdateError::InvalidValue {
            field: "status".to_string(),
            reason: format!("unknown {kind} status `{}`", raw.trim()),
        })?;
        return Ok(Value::String(canonical.to_string()));
    }
    if is_reference_field(kind, key) {
        let reference = RecordRef::parse(raw).ok_or_else(|| UpdateError::InvalidValue {
            field: key.to_string(),
            reason: "empty reference".to_string(),
        })?;
        return Ok(Value::String(encode_reference(&reference)));
    }
    if is_date_field(kind, key) {
        let value = raw.trim();
        if !dates::is_valid_date_value(value) {
            return Err(UpdateError::InvalidValue {
                field: key.to_string(),
                reason: format!("unreadable date `{value}`"),
            });
        }
        return Ok(Value::String(value.to_string()));
    }
    if kind != Kind::Task && key == "description" {
        return Ok(Value::String(raw.to_string()));
    }
    Ok(frontmatter::yaml_scalar(raw))
}

/// New references are written in the symbolic link form; values already
/// carrying an explicit encoding keep it.
fn encode_reference(reference: &RecordRef) -> String {
    match reference {
        RecordRef::Bare { name, .. } => RecordRef::wiki_link(name),
        other => other.as_raw().to_string(),
    }
}

fn is_reference_field(kind: Kind, key: &str) -> bool {
    match kind {
        Kind::Task => key == "project" || key == "area",
        Kind::Project => key == "area",
        Kind::Area => false,
    }
}

fn is_date_field(kind: Kind, key: &str) -> bool {
    match kind {
        Kind::Task => matches!(
            key,
            "created" | "updated" | "completed" | "due" | "scheduled" | "defer"
        ),
        Kind::Project => matches!(key, "created" | "updated" | "completed" | "due"),
        Kind::Area => matches!(key, "created" | "updated"),
    }
}

fn canonical_status(kind: Kind, raw: &str) -> Option<&'static str> {
    match kind {
        Kind::Task => TaskStatus::parse(raw).map(|status| status.as_str()),
        Kind::Project => ProjectStatus::parse(raw).map(|status| status.as_str()),
        Kind::Area => AreaStatus::parse(raw).map(|status| status.as_str()),
    }
}

fn status_is_terminal(kind: Kind, front: &Mapping) -> bool {
    let raw = front.get("status").and_then(frontmatter::scalar_to_string);
    match (kind, raw) {
        (Kind::Task, Some(raw)) => TaskStatus::parse(&raw)
            .map(|status| status.is_terminal())
            .unwrap_or(false),
        (Kind::Project, Some(raw)) => ProjectStatus::parse(&raw)
            .map(|status| status.is_terminal())
            .unwrap_or(false),
        _ => false,
    }
}

fn set_value(front: &mut Mapping, key: &str, value: Value) {
    front.insert(Value::String(key.to_string()), value);
}

fn remove_value(front: &mut Mapping, key: &str) {
    front.shift_remove(Value::String(key.to_string()));
}

fn read_existing(path: &Path) -> Result<String, UpdateError> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(content),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            Err(UpdateError::NotFound(path.to_path_buf()))
        }
        Err(err) => Err(UpdateError::Io {
            path: path.to_path_buf(),
            source: err,
        }),
    }
}

fn write_error(path: &Path, source: std::io::Error) -> UpdateError {
    UpdateError::Write {
        path: path.to_path_buf(),
        source,
    }
}

fn write_atomic(path: &Path, content: &str) -> Result<(), UpdateError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir).map_err(|err| write_error(path, err))?;
    tmp.write_all(content.as_bytes())
        .map_err(|err| write_error(path, err))?;
    tmp.as_file()
        .sync_all()
        .map_err(|err| write_error(path, err))?;
    tmp.persist(path)
        .map_err(|err| write_error(path, err.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
        fs::create_dir_all(dir).expect("create dir");
        let path = dir.join(name);
        fs::write(&path, content).expect("write file");
        path
    }

    #[test]
    fn set_preserves_unknown_fields_and_key_order() {
        let tmp = TempDir::new().expect("tempdir");
        let path = write_file(
            tmp.path(),
            "t.md",
            concat!(
                "---\n",
                "title: Write quarterly report\n",
                "status: ready\n",
                "due: 2025-01-15\n",
                "priority: high\n",
                "energy: low\n",
                "---\n",
                "Body stays.\n",
            ),
        );
        apply_edits(
            &path,
            Kind::Task,
            &[FieldEdit::set("status", "in-progress")],
        )
        .expect("apply");
        let after = fs::read_to_string(&path).expect("read");
        assert!(after.contains("status: in-progress\n"));
        assert!(after.contains("due: 2025-01-15\n"));
        assert!(after.contains("priority: high\n"));
        assert!(after.contains("energy: low\n"));
        assert!(after.contains("Body stays.\n"));
        // Untouched keys keep their relative order.
        let title_at = after.find("title:").expect("title");
        let status_at = after.find("status:").expect("status");
        let due_at = after.find("due:").expect("due");
        let priority_at = after.find("priority:").expect("priority");
        assert!(title_at < status_at && status_at < due_at && due_at < priority_at);
    }

    #[test]
    fn every_edit_refreshes_updated() {
        let tmp = TempDir::new().expect("tempdir");
        let path = write_file(
            tmp.path(),
            "t.md",
            "---\ntitle: T\nupdated: 2020-01-01 08:00\n---\n",
        );
        apply_edits(&path, Kind::Task, &[FieldEdit::set("due", "2025-02-02")]).expect("apply");
        let after = fs::read_to_string(&path).expect("read");
        assert!(!after.contains("updated: 2020-01-01 08:00"));
        assert!(after.contains("updated: "));
    }

    #[test]
    fn entering_a_terminal_status_stamps_completed() {
        let tmp = TempDir::new().expect("tempdir");
        let path = write_file(tmp.path(), "t.md", "---\ntitle: T\nstatus: ready\n---\n");
        let record =
            apply_edits(&path, Kind::Task, &[FieldEdit::set("status", "done")]).expect("apply");
        match record {
            Record::Task(task) => assert!(task.completed.is_some()),
            other => panic!("unexpected record: {other:?}"),
        }
    }

    #[test]
    fn leaving_a_terminal_status_clears_completed() {
        let tmp = TempDir::new().expect("tempdir");
        let path = write_file(
            tmp.path(),
            "t.md",
            "---\ntitle: T\nstatus: done\ncompleted: 2025-01-01 10:00\n---\n",
        );
        let record =
            apply_edits(&path, Kind::Task, &[FieldEdit::set("status", "ready")]).expect("apply");
        match record {
            Record::Task(task) => assert_eq!(task.completed, None),
            other => panic!("unexpected record: {other:?}"),
        }
    }

    #[test]
    fn staying_terminal_keeps_the_original_completed_stamp() {
        let tmp = TempDir::new().expect("tempdir");
        let path = write_file(
            tmp.path(),
            "t.md",
            "---\ntitle: T\nstatus: done\ncompleted: 2025-01-01 10:00\n---\n",
        );
        apply_edits(&path, Kind::Task, &[FieldEdit::set("status", "cancelled")]).expect("apply");
        let after = fs::read_to_string(&path).expect("read");
        assert!(after.contains("completed: 2025-01-01 10:00\n"));
    }

    #[test]
    fn bare_references_are_normalized_to_wiki_links() {
        let tmp = TempDir::new().expect("tempdir");
        let path = write_file(tmp.path(), "t.md", "---\ntitle: T\n---\n");
        apply_edits(&path, Kind::Task, &[FieldEdit::set("project", "Q1 Planning")])
            .expect("apply");
        let after = fs::read_to_string(&path).expect("read");
        assert!(after.contains("[[Q1 Planning]]"));
    }

    #[test]
    fn untouched_references_keep_their_encoding() {
        let tmp = TempDir::new().expect("tempdir");
        let path = write_file(
            tmp.path(),
            "t.md",
            "---\ntitle: T\nproject: projects/Q1 Planning.md\n---\n",
        );
        apply_edits(&path, Kind::Task, &[FieldEdit::set("due", "2025-03-01")]).expect("apply");
        let after = fs::read_to_string(&path).expect("read");
        assert!(after.contains("project: projects/Q1 Planning.md\n"));
    }

    #[test]
    fn remove_drops_the_key_but_title_is_protected() {
        let tmp = TempDir::new().expect("tempdir");
        let path = write_file(
            tmp.path(),
            "t.md",
            "---\ntitle: T\ndue: 2025-01-15\n---\n",
        );
        apply_edits(&path, Kind::Task, &[FieldEdit::remove("due")]).expect("apply");
        let after = fs::read_to_string(&path).expect("read");
        assert!(!after.contains("due:"));

        let err = apply_edits(&path, Kind::Task, &[FieldEdit::remove("title")]).unwrap_err();
        assert!(matches!(err, UpdateError::InvalidValue { .. }));
    }

    #[test]
    fn invalid_status_and_date_values_are_rejected() {
        let tmp = TempDir::new().expect("tempdir");
        let path = write_file(tmp.path(), "t.md", "---\ntitle: T\n---\n");
        let err =
            apply_edits(&path, Kind::Task, &[FieldEdit::set("status", "someday")]).unwrap_err();
        assert!(matches!(err, UpdateError::InvalidValue { .. }));
        let err =
            apply_edits(&path, Kind::Task, &[FieldEdit::set("due", "whenever")]).unwrap_err();
        assert!(matches!(err, UpdateError::InvalidValue { .. }));
        // A failed edit set leaves the file untouched.
        let after = fs::read_to_string(&path).expect("read");
        assert_eq!(after, "---\ntitle: T\n---\n");
    }

    #[test]
    fn editing_a_missing_file_is_not_found() {
        let tmp = TempDir::new().expect("tempdir");
        let err = apply_edits(
            &tmp.path().join("absent.md"),
            Kind::Task,
            &[FieldEdit::set("status", "ready")],
        )
        .unwrap_err();
        assert!(matches!(err, UpdateError::NotFound(_)));
    }

    #[test]
    fn batch_updates_isolate_failures() {
        let tmp = TempDir::new().expect("tempdir");
        let good = write_file(tmp.path(), "good.md", "---\ntitle: Good\n---\n");
        let missing = tmp.path().join("missing.md");
        let results = apply_edits_batch(
            &[good.clone(), missing],
            Kind::Task,
            &[FieldEdit::set("status", "done")],
        );
        assert_eq!(results.len(), 2);
        assert!(results[0].1.is_ok());
        assert!(results[1].1.is_err());
        let after = fs::read_to_string(&good).expect("read");
        assert!(after.contains("status: done"));
    }

    #[test]
    fn create_record_slugs_the_title() {
        let tmp = TempDir::new().expect("tempdir");
        let record = create_record(
            tmp.path(),
            Kind::Task,
            &NewRecord {
                title: "Write the Q1 report!".to_string(),
                status: Some("ready".to_string()),
                ..NewRecord::default()
            },
        )
        .expect("create");
        assert_eq!(record.name(), "write-the-q1-report");
        assert!(record.path().exists());
        let content = fs::read_to_string(record.path()).expect("read");
        assert!(content.contains("title: Write the Q1 report!\n"));
        assert!(content.contains("status: ready\n"));
        assert!(content.contains("created: "));
    }

    #[test]
    fn create_record_counts_up_on_collision() {
        let tmp = TempDir::new().expect("tempdir");
        let new = NewRecord {
            title: "Same title".to_string(),
            ..NewRecord::default()
        };
        let first = create_record(tmp.path(), Kind::Task, &new).expect("create");
        let second = create_record(tmp.path(), Kind::Task, &new).expect("create");
        let third = create_record(tmp.path(), Kind::Task, &new).expect("create");
        assert_eq!(first.name(), "same-title");
        assert_eq!(second.name(), "same-title-2");
        assert_eq!(third.name(), "same-title-3");
    }

    #[test]
    fn create_record_falls_back_to_a_unique_suffix() {
        let tmp = TempDir::new().expect("tempdir");
        let new = NewRecord {
            title: "Busy".to_string(),
            ..NewRecord::default()
        };
        for _ in 0..MAX_SLUG_ATTEMPTS {
            create_record(tmp.path(), Kind::Task, &new).expect("create");
        }
        let overflow = create_record(tmp.path(), Kind::Task, &new).expect("create");
        assert!(overflow.name().starts_with("busy-"));
        assert!(overflow.name().len() > "busy-50".len());
    }

    #[test]
    fn create_record_normalizes_initial_references() {
        let tmp = TempDir::new().expect("tempdir");
        let record = create_record(
            tmp.path(),
            Kind::Task,
            &NewRecord {
                title: "Linked".to_string(),
                project: Some("Q1 Planning".to_string()),
                ..NewRecord::default()
            },
        )
        .expect("create");
        let content = fs::read_to_string(record.path()).expect("read");
        assert!(content.contains("project: '[[Q1 Planning]]'\n"));
    }

    #[test]
    fn slug_title_cleans_punctuation_and_spaces() {
        assert_eq!(slug_title("Write the Q1 report!"), "write-the-q1-report");
        assert_eq!(slug_title("  spaced   out  "), "spaced-out");
        assert_eq!(slug_title("Dash-already"), "dash-already");
        assert_eq!(slug_title("???"), "untitled");
    }

    #[cfg(unix)]
    #[test]
    fn failed_writes_leave_the_original_intact() {
        use std::os::unix::fs::PermissionsExt;
        let tmp = TempDir::new().expect("tempdir");
        let dir = tmp.path().join("locked");
        let path = write_file(&dir, "t.md", "---\ntitle: T\nstatus: ready\n---\n");
        let mut perms = fs::metadata(&dir).expect("meta").permissions();
        perms.set_mode(0o555);
        fs::set_permissions(&dir, perms).expect("chmod");

        let result = apply_edits(&path, Kind::Task, &[FieldEdit::set("status", "done")]);
        assert!(matches!(result, Err(UpdateError::Write { .. })));
        let after = fs::read_to_string(&path).expect("read");
        assert_eq!(after, "---\ntitle: T\nstatus: ready\n---\n");

        let mut restore = fs::metadata(&dir).expect("meta").permissions();
        restore.set_mode(0o755);
        fs::set_permissions(&dir, restore).expect("chmod back");
    }
}
