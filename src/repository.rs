//! Local Spack package repository
//!
//! A repository is a directory with a `repo.yaml` file and a `packages/`
//! directory holding one `<recipe-name>/package.py` per package.
//!
//! Discovery order:
//! - An explicit `--repo` path
//! - The builtin repository below `$SPACK_ROOT`
//! - The first repository reported by `spack repo list`

use crate::error::{ConfigError, IoError};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Builtin repository below `$SPACK_ROOT`
const BUILTIN_REPO: &[&str] = &["var", "spack", "repos", "builtin"];

const RECIPE_FILE: &str = "package.py";

/// Validated on-disk repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpackRepository {
    root: PathBuf,
}

impl SpackRepository {
    /// Use `repo` if given, else the builtin repository of `spack_root`,
    /// else ask the `spack` executable
    pub fn discover(repo: Option<&Path>, spack_root: Option<&Path>) -> Result<Self, ConfigError> {
        Self::discover_with(repo, spack_root, spack_repo_list)
    }

    /// [`Self::discover`] with the `spack repo list` call supplied by the caller
    pub fn discover_with(
        repo: Option<&Path>,
        spack_root: Option<&Path>,
        repo_list: impl FnOnce() -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let path = match (repo, spack_root) {
            (Some(repo), _) => repo.to_path_buf(),
            (None, Some(root)) => BUILTIN_REPO.iter().fold(root.to_path_buf(), |p, c| p.join(c)),
            (None, None) => repo_list()
                .as_deref()
                .and_then(first_listed_repository)
                .ok_or(ConfigError::RepositoryNotFound)?,
        };
        Self::open(path)
    }

    /// Open an existing repository directory
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let root = path.into();
        let message = if !root.is_dir() {
            Some("not a directory")
        } else if !root.join("packages").is_dir() {
            Some("missing 'packages' directory")
        } else if !root.join("repo.yaml").is_file() {
            Some("missing 'repo.yaml'")
        } else {
            None
        };

        match message {
            Some(message) => Err(ConfigError::InvalidPath {
                path: root,
                message: format!("not a Spack repository: {}", message),
            }),
            None => Ok(Self { root }),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn recipe_dir(&self, recipe_name: &str) -> PathBuf {
        self.root.join("packages").join(recipe_name)
    }

    /// Whether a recipe with this name is already present
    pub fn exists(&self, recipe_name: &str) -> bool {
        self.recipe_dir(recipe_name).join(RECIPE_FILE).is_file()
    }

    /// Write `packages/<recipe_name>/package.py`; never overwrites
    pub fn write_recipe(&self, recipe_name: &str, content: &str) -> Result<PathBuf, IoError> {
        let dir = self.recipe_dir(recipe_name);
        let path = dir.join(RECIPE_FILE);
        if path.exists() {
            return Err(IoError::AlreadyExists { path });
        }

        fs::create_dir_all(&dir).map_err(|e| IoError::generic(&dir, e))?;
        fs::write(&path, content).map_err(|e| IoError::generic(&path, e))?;
        debug!(path = %path.display(), "wrote recipe");
        Ok(path)
    }
}

/// Output of `spack repo list`, or `None` when spack is not available
fn spack_repo_list() -> Option<String> {
    let output = match Command::new("spack").args(["repo", "list"]).output() {
        Ok(output) => output,
        Err(err) => {
            debug!(error = %err, "spack executable not available");
            return None;
        }
    };
    if !output.status.success() {
        debug!(status = %output.status, "spack repo list failed");
        return None;
    }
    String::from_utf8(output.stdout).ok()
}

/// Path of the first repository in `spack repo list` output. Each entry
/// line ends with the repository path; `==>` lines are headers.
fn first_listed_repository(listing: &str) -> Option<PathBuf> {
    listing
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("==>"))
        .find_map(|line| line.split_whitespace().last())
        .map(PathBuf::from)
}
