use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::frontmatter::MAX_RECORD_BYTES;
use crate::record::{self, Kind, Record};

/// Per-directory cap on the number of files one scan will look at.
pub const MAX_FILES_PER_SCAN: usize = 10_000;

/// A contained per-file problem. Scans and index builds never fail because
/// of one bad file; they collect these instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub source: PathBuf,
    pub message: String,
}

impl Warning {
    pub fn new(source: impl Into<PathBuf>, message: impl Into<String>) -> Warning {
        Warning {
            source: source.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.source.display(), self.message)
    }
}

#[derive(Debug, Default)]
pub struct ScanOutcome {
    pub records: Vec<Record>,
    pub warnings: Vec<Warning>,
}

/// Scan one kind directory. `include_archive` pulls in the `archive/`
/// subdirectory (and its dated subfolders) as the same kind.
///
/// A missing directory is an empty scan, not an error; unreadable entries
/// and unparsable files become warnings.
pub fn scan_dir(dir: &Path, kind: Kind, include_archive: bool) -> ScanOutcome {
    let mut outcome = ScanOutcome::default();
    let mut paths = Vec::new();
    list_markdown_files(dir, &mut paths, &mut outcome.warnings);
    if include_archive {
        list_archive_files(&dir.join("archive"), &mut paths, &mut outcome.warnings);
    }
    paths.sort();
    if paths.len() > MAX_FILES_PER_SCAN {
        outcome.warnings.push(Warning::new(
            dir,
            format!(
                "directory lists {} markdown files; only the first {} were scanned",
                paths.len(),
                MAX_FILES_PER_SCAN
            ),
        ));
        paths.truncate(MAX_FILES_PER_SCAN);
    }
    debug!(dir = %dir.display(), kind = %kind, files = paths.len(), "scanning");
    let parsed: Vec<Result<Record, Warning>> = paths
        .par_iter()
        .map(|path| read_record(path, kind))
        .collect();
    for result in parsed {
        match result {
            Ok(record) => outcome.records.push(record),
            Err(warning) => {
                warn!(source = %warning.source.display(), "{}", warning.message);
                outcome.warnings.push(warning);
            }
        }
    }
    outcome
}

fn read_record(path: &Path, kind: Kind) -> Result<Record, Warning> {
    if let Ok(meta) = fs::metadata(path) {
        if meta.len() > MAX_RECORD_BYTES as u64 {
            return Err(Warning::new(
                path,
                format!(
                    "file is {} bytes, over the {} byte limit",
                    meta.len(),
                    MAX_RECORD_BYTES
                ),
            ));
        }
    }
    let content = fs::read_to_string(path)
        .map_err(|err| Warning::new(path, format!("cannot read file: {err}")))?;
    record::parse_record(kind, path, &content)
        .map_err(|err| Warning::new(path, format!("cannot parse {kind}: {err}")))
}

fn list_markdown_files(dir: &Path, paths: &mut Vec<PathBuf>, warnings: &mut Vec<Warning>) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            debug!(dir = %dir.display(), "directory does not exist, scanning nothing");
            return;
        }
        Err(err) => {
            warnings.push(Warning::new(dir, format!("cannot list directory: {err}")));
            return;
        }
    };
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warnings.push(Warning::new(dir, format!("cannot read directory entry: {err}")));
                continue;
            }
        };
        let path = entry.path();
        if path.is_file() && is_markdown(&path) {
            paths.push(path);
        }
    }
}

/// The archive keeps flat files as well as dated subfolders one level down.
fn list_archive_files(archive: &Path, paths: &mut Vec<PathBuf>, warnings: &mut Vec<Warning>) {
    let entries = match fs::read_dir(archive) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return,
        Err(err) => {
            warnings.push(Warning::new(archive, format!("cannot list directory: {err}")));
            return;
        }
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            list_markdown_files(&path, paths, warnings);
        } else if is_markdown(&path) {
            paths.push(path);
        }
    }
}

fn is_markdown(path: &Path) -> bool {
    path.extension().map(|ext| ext == "md").unwrap_or(false)
}
