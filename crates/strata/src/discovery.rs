//! Module discovery: walking a package directory for source files.

use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use log::warn;
use walkdir::WalkDir;

use crate::errors::StrataResult;

const INIT_FILE: &str = "__init__.py";

/// One source file belonging to a found package.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleFile {
    /// Fully qualified dotted name, e.g. `pkg.foo.bar`.
    pub module: String,
    pub path: PathBuf,
    /// Modification time in fractional seconds since the epoch.
    pub mtime: f64,
}

/// A root package located on disk, with its full module inventory.
#[derive(Debug, Clone)]
pub struct FoundPackage {
    pub name: String,
    pub directory: PathBuf,
    pub module_files: Vec<ModuleFile>,
}

/// Walk `directory` and collect every module belonging to the package.
///
/// Symlinks are followed. Subdirectories without an `__init__.py` are not
/// descended into (the root itself is exempt, so namespace portions scan
/// normally). Hidden files and directories are skipped, as are files with
/// extra dots in their name (`some.module.py` is not importable).
pub fn find_package(package_name: &str, directory: &Path) -> StrataResult<FoundPackage> {
    let mut module_files = Vec::new();

    let walker = WalkDir::new(directory)
        .follow_links(true)
        .into_iter()
        .filter_entry(|entry| {
            if !entry.file_type().is_dir() || entry.depth() == 0 {
                return true;
            }
            let name = entry.file_name().to_string_lossy();
            !name.starts_with('.') && entry.path().join(INIT_FILE).is_file()
        });

    for entry in walker {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let file_name = entry.file_name().to_string_lossy();
        if file_name.starts_with('.') || !file_name.ends_with(".py") {
            continue;
        }
        if file_name.matches('.').count() > 1 {
            warn!(
                "skipping module with too many dots in the name: {}",
                entry.path().display()
            );
            continue;
        }

        let module = module_name_from_path(package_name, entry.path(), directory);
        let metadata = entry.metadata().map_err(std::io::Error::from)?;
        let mtime = metadata
            .modified()?
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);

        module_files.push(ModuleFile {
            module,
            path: entry.path().to_path_buf(),
            mtime,
        });
    }

    Ok(FoundPackage {
        name: package_name.to_owned(),
        directory: directory.to_path_buf(),
        module_files,
    })
}

/// `pkg` + `<dir>/foo/bar.py` → `pkg.foo.bar`; an `__init__.py` names its
/// containing package.
fn module_name_from_path(package_name: &str, path: &Path, package_directory: &Path) -> String {
    let relative = path.strip_prefix(package_directory).unwrap_or(path);
    let mut components: Vec<String> = vec![package_name.to_owned()];
    for component in relative.with_extension("").components() {
        components.push(component.as_os_str().to_string_lossy().into_owned());
    }
    if components.last().is_some_and(|c| c == "__init__") {
        components.pop();
    }
    components.join(".")
}
