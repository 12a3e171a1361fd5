//! The on-disk import cache.
//!
//! One JSON file per build configuration, named by a fingerprint of the
//! sorted root names and the two boolean flags, mapping each source file's
//! path to its mtime and extracted imports. A file whose recorded mtime
//! matches the scan is not re-extracted. The cache is not safe for
//! concurrent writers; readers treat anything missing or unreadable as a
//! cold cache.

use std::collections::BTreeMap;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use log::{info, warn};
use rustc_hash::FxHasher;
use serde::{Deserialize, Serialize};

use crate::config::BuildConfig;
use crate::discovery::ModuleFile;
use crate::scanning::DirectImport;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedImport {
    pub importer: String,
    pub imported: String,
    pub line_number: usize,
    pub line_contents: String,
    pub is_type_checking: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub mtime: f64,
    pub imports: Vec<CachedImport>,
}

/// The per-configuration cache, loaded eagerly on setup.
#[derive(Debug)]
pub struct ImportsCache {
    /// `None` disables both reads and writes.
    cache_file: Option<PathBuf>,
    entries: BTreeMap<String, CacheEntry>,
}

impl ImportsCache {
    pub fn setup(config: &BuildConfig) -> Self {
        let Some(cache_dir) = &config.cache_dir else {
            return Self {
                cache_file: None,
                entries: BTreeMap::new(),
            };
        };
        let cache_file = cache_dir.join(format!("{}.json", fingerprint(config)));
        let entries = read_entries(&cache_file);
        Self {
            cache_file: Some(cache_file),
            entries,
        }
    }

    /// The cached imports for a file, provided its mtime is unchanged.
    ///
    /// Mtimes are compared exactly: any change, in either direction,
    /// invalidates the entry.
    #[allow(clippy::float_cmp)]
    pub fn read_imports(&self, module_file: &ModuleFile) -> Option<Vec<DirectImport>> {
        self.cache_file.as_ref()?;
        let entry = self.entries.get(&path_key(&module_file.path))?;
        if entry.mtime != module_file.mtime {
            return None;
        }
        Some(
            entry
                .imports
                .iter()
                .map(|import| DirectImport {
                    importer: import.importer.clone(),
                    imported: import.imported.clone(),
                    line_number: import.line_number,
                    line_contents: import.line_contents.clone(),
                    is_type_checking: import.is_type_checking,
                })
                .collect(),
        )
    }

    /// Replace the cache contents with this build's results and persist.
    ///
    /// Entries for files no longer on disk are discarded. Write failures
    /// are logged, not fatal: the cache only ever saves work.
    pub fn write(&mut self, results: &[(ModuleFile, Vec<DirectImport>)]) {
        let Some(cache_file) = self.cache_file.clone() else {
            return;
        };

        self.entries = results
            .iter()
            .map(|(module_file, imports)| {
                let entry = CacheEntry {
                    mtime: module_file.mtime,
                    imports: imports
                        .iter()
                        .map(|import| CachedImport {
                            importer: import.importer.clone(),
                            imported: import.imported.clone(),
                            line_number: import.line_number,
                            line_contents: import.line_contents.clone(),
                            is_type_checking: import.is_type_checking,
                        })
                        .collect(),
                };
                (path_key(&module_file.path), entry)
            })
            .collect();

        let Some(cache_dir) = cache_file.parent() else {
            return;
        };
        if let Err(error) = fs::create_dir_all(cache_dir) {
            warn!("could not create cache directory {}: {error}", cache_dir.display());
            return;
        }
        write_marker_files(cache_dir);

        match serde_json::to_string(&self.entries) {
            Ok(serialized) => {
                if let Err(error) = fs::write(&cache_file, serialized) {
                    warn!("could not write cache file {}: {error}", cache_file.display());
                } else {
                    info!("wrote cache file {}", cache_file.display());
                }
            }
            Err(error) => warn!("could not serialize cache: {error}"),
        }
    }
}

fn path_key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn read_entries(cache_file: &Path) -> BTreeMap<String, CacheEntry> {
    let serialized = match fs::read_to_string(cache_file) {
        Ok(serialized) => serialized,
        Err(_) => {
            info!("no cache file at {}", cache_file.display());
            return BTreeMap::new();
        }
    };
    match serde_json::from_str(&serialized) {
        Ok(entries) => {
            info!("using cache file {}", cache_file.display());
            entries
        }
        Err(_) => {
            warn!(
                "could not use corrupt cache file {}",
                cache_file.display()
            );
            BTreeMap::new()
        }
    }
}

/// Hash of the ordered roots plus flags; differently-configured builds get
/// different cache files.
fn fingerprint(config: &BuildConfig) -> String {
    let mut sorted_roots: Vec<&str> = config
        .package_names
        .iter()
        .map(String::as_str)
        .collect();
    sorted_roots.sort_unstable();

    let mut hasher = FxHasher::default();
    sorted_roots.hash(&mut hasher);
    config.include_external_packages.hash(&mut hasher);
    config.exclude_type_checking_imports.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

fn write_marker_files(cache_dir: &Path) {
    let marker_files = [
        (".gitignore", "# Automatically created by strata.\n*"),
        (
            "CACHEDIR.TAG",
            "Signature: 8a477f597d28d172789f06886806bc55\n\
             # This file is a cache directory tag automatically created by strata.\n\
             # For information about cache directory tags see https://bford.info/cachedir/",
        ),
    ];
    for (filename, contents) in marker_files {
        let path = cache_dir.join(filename);
        if !path.exists()
            && let Err(error) = fs::write(&path, contents)
        {
            warn!("could not write {}: {error}", path.display());
        }
    }
}
