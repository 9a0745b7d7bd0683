use std::cell::OnceCell;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::config;
use crate::index::VaultIndex;
use crate::record::Kind;

#[derive(Debug, Error)]
pub enum VaultError {
    #[error("no vault at {0}")]
    NotFound(PathBuf),
}

/// The three kind directories, each independently configurable.
#[derive(Debug, Clone)]
pub struct VaultPaths {
    pub root: PathBuf,
    pub tasks_dir: PathBuf,
    pub projects_dir: PathBuf,
    pub areas_dir: PathBuf,
}

impl VaultPaths {
    /// Resolve the directories under an explicit root through the config
    /// chain (project config, then global, then the built-in names).
    pub fn resolve(root: &Path) -> Result<VaultPaths, VaultError> {
        if !root.is_dir() {
            return Err(VaultError::NotFound(root.to_path_buf()));
        }
        let paths = VaultPaths {
            root: root.to_path_buf(),
            tasks_dir: root.join(config::resolve_tasks_dir(root)),
            projects_dir: root.join(config::resolve_projects_dir(root)),
            areas_dir: root.join(config::resolve_areas_dir(root)),
        };
        debug!(root = %paths.root.display(), "vault resolved");
        Ok(paths)
    }

    /// Walk up from `start` looking for a vault: the nearest ancestor with a
    /// config file wins, else the nearest one that already has the default
    /// tasks and projects layout.
    pub fn locate(start: &Path) -> Result<VaultPaths, VaultError> {
        if let Some(root) = config::find_config_root(start) {
            return VaultPaths::resolve(&root);
        }
        let start_abs = start.canonicalize().unwrap_or_else(|_| start.to_path_buf());
        for candidate in start_abs.ancestors() {
            if candidate.join(config::DEFAULT_TASKS_DIR).is_dir()
                && candidate.join(config::DEFAULT_PROJECTS_DIR).is_dir()
            {
                return VaultPaths::resolve(candidate);
            }
        }
        Err(VaultError::NotFound(start.to_path_buf()))
    }

    /// The directory records of this kind live in.
    pub fn dir_for(&self, kind: Kind) -> &Path {
        match kind {
            Kind::Task => &self.tasks_dir,
            Kind::Project => &self.projects_dir,
            Kind::Area => &self.areas_dir,
        }
    }
}

/// One session over a vault. The index is built on first use and reused for
/// every query in the same session; a new invocation starts from a fresh
/// scan.
#[derive(Debug)]
pub struct Vault {
    paths: VaultPaths,
    include_archive: bool,
    index: OnceCell<VaultIndex>,
}

impl Vault {
    pub fn open(paths: VaultPaths) -> Vault {
        Vault {
            paths,
            include_archive: false,
            index: OnceCell::new(),
        }
    }

    /// Include the `archive/` subdirectories. Set this before the first
    /// query; the index is built once.
    pub fn with_archive(mut self, include_archive: bool) -> Vault {
        self.include_archive = include_archive;
        self
    }

    pub fn paths(&self) -> &VaultPaths {
        &self.paths
    }

    pub fn index(&self) -> &VaultIndex {
        self.index
            .get_or_init(|| VaultIndex::build(&self.paths, self.include_archive))
    }
}
