//! Locating package roots on disk.
//!
//! A root package name is resolved against an ordered list of search
//! directories: the configured source directories first, then any entries
//! from the `PYTHONPATH` environment variable. The first directory
//! containing the package wins.

use std::path::{Path, PathBuf};

use indexmap::IndexSet;
use log::{debug, warn};
use walkdir::WalkDir;

use crate::config::BuildConfig;
use crate::errors::{StrataError, StrataResult};

const INIT_FILE: &str = "__init__.py";

#[derive(Debug)]
pub struct PackageResolver {
    search_dirs: Vec<PathBuf>,
}

impl PackageResolver {
    pub fn new(config: &BuildConfig) -> Self {
        Self {
            search_dirs: search_directories(config),
        }
    }

    /// The ordered, deduplicated directories that will be probed.
    pub fn search_directories(&self) -> &[PathBuf] {
        &self.search_dirs
    }

    /// Locate the directory for a (possibly dotted) root package name.
    ///
    /// A directory with an `__init__.py` is a regular package. One without
    /// is accepted as a namespace portion provided it contains at least one
    /// source file somewhere beneath it; a bare namespace directory fails
    /// with [`StrataError::NamespacePackageEncountered`].
    pub fn determine_package_directory(&self, package_name: &str) -> StrataResult<PathBuf> {
        let relative: PathBuf = package_name.split('.').collect();

        let mut bare_namespace_candidate = None;
        for search_dir in &self.search_dirs {
            let candidate = search_dir.join(&relative);
            if !candidate.is_dir() {
                continue;
            }
            if candidate.join(INIT_FILE).is_file() {
                debug!("found package {package_name} at {}", candidate.display());
                return Ok(candidate);
            }
            if contains_python_source(&candidate) {
                debug!(
                    "found namespace portion {package_name} at {}",
                    candidate.display()
                );
                return Ok(candidate);
            }
            // Remember it so we can report a more precise error if no other
            // search directory has the real package.
            bare_namespace_candidate.get_or_insert(candidate);
        }

        match bare_namespace_candidate {
            Some(_) => Err(StrataError::NamespacePackageEncountered(
                package_name.to_owned(),
            )),
            None => Err(StrataError::PackageNotFound(package_name.to_owned())),
        }
    }
}

/// Configured source directories first, then `PYTHONPATH`, deduplicated and
/// canonicalized where possible.
fn search_directories(config: &BuildConfig) -> Vec<PathBuf> {
    let mut unique_dirs: IndexSet<PathBuf> = IndexSet::new();

    for dir in &config.src_dirs {
        add_search_directory(&mut unique_dirs, dir);
    }

    if let Ok(pythonpath) = std::env::var("PYTHONPATH") {
        let separator = if cfg!(windows) { ';' } else { ':' };
        for entry in pythonpath.split(separator) {
            if entry.is_empty() {
                continue;
            }
            let path = PathBuf::from(entry);
            if !path.is_dir() {
                warn!("ignoring PYTHONPATH entry that is not a directory: {entry}");
                continue;
            }
            add_search_directory(&mut unique_dirs, &path);
        }
    }

    unique_dirs.into_iter().collect()
}

fn add_search_directory(unique_dirs: &mut IndexSet<PathBuf>, dir: &Path) {
    match dir.canonicalize() {
        Ok(canonical) => {
            unique_dirs.insert(canonical);
        }
        Err(_) => {
            unique_dirs.insert(dir.to_path_buf());
        }
    }
}

fn contains_python_source(directory: &Path) -> bool {
    WalkDir::new(directory)
        .follow_links(true)
        .into_iter()
        .filter_map(Result::ok)
        .any(|entry| {
            entry.file_type().is_file()
                && entry.path().extension().is_some_and(|ext| ext == "py")
        })
}
