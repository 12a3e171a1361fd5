//! Import resolution: from raw imported objects to module-level imports.
//!
//! The scanner owns the module inventory of every found package and decides,
//! for each imported object a file declares, which graph module it refers
//! to: a relative import is rebased onto the importer's package, a
//! `from X import name` lands on `X.name` if that is a module and on `X`
//! otherwise, and anything outside the internal packages is distilled to an
//! external stand-in (when externals are wanted at all).

use log::{debug, warn};
use rustc_hash::FxHashSet;

use crate::discovery::FoundPackage;
use crate::parsing::ImportedObject;

/// A resolved module-to-module import with its line metadata.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DirectImport {
    pub importer: String,
    pub imported: String,
    pub line_number: usize,
    pub line_contents: String,
    pub is_type_checking: bool,
}

/// Resolves imported objects against the full internal module inventory.
#[derive(Debug)]
pub struct ImportScanner {
    /// Root package names, sorted deepest-first for external distillation.
    package_names: Vec<String>,
    /// Every internal module across all found packages.
    modules: FxHashSet<String>,
    include_external_packages: bool,
}

impl ImportScanner {
    pub fn new(found_packages: &[FoundPackage], include_external_packages: bool) -> Self {
        let mut package_names: Vec<String> =
            found_packages.iter().map(|p| p.name.clone()).collect();
        package_names.sort();
        package_names.reverse();

        let modules = found_packages
            .iter()
            .flat_map(|p| p.module_files.iter().map(|f| f.module.clone()))
            .collect();

        Self {
            package_names,
            modules,
            include_external_packages,
        }
    }

    /// Resolve the imports declared by one module.
    ///
    /// `is_package` is whether the module is a package (`__init__.py`),
    /// which shifts the base of relative imports by one level.
    pub fn resolve_imports(
        &self,
        importer: &str,
        is_package: bool,
        imported_objects: Vec<ImportedObject>,
    ) -> Vec<DirectImport> {
        let mut imports = Vec::new();
        for imported_object in imported_objects {
            let Some(absolute_name) =
                self.absolute_object_name(importer, is_package, &imported_object.name)
            else {
                continue;
            };

            let imported = match self.resolve_internal(&absolute_name) {
                Some(module) => module,
                None => {
                    if !self.include_external_packages {
                        continue;
                    }
                    match self.distill_external(&absolute_name) {
                        Some(module) => module,
                        None => continue,
                    }
                }
            };

            imports.push(DirectImport {
                importer: importer.to_owned(),
                imported,
                line_number: imported_object.line_number,
                line_contents: imported_object.line_contents,
                is_type_checking: imported_object.is_type_checking,
            });
        }
        imports
    }

    /// Whether a module name refers to something outside the internal
    /// packages.
    pub fn is_external(&self, module: &str) -> bool {
        !self.package_names.iter().any(|package| {
            module == package.as_str() || module.starts_with(&format!("{package}."))
        })
    }

    /// Rebase a relative import onto the importer's dotted name. `from .`
    /// at depth k strips k trailing segments of the importer's package
    /// prefix before prepending.
    fn absolute_object_name(
        &self,
        importer: &str,
        is_package: bool,
        imported_object_name: &str,
    ) -> Option<String> {
        let leading_dots = imported_object_name
            .chars()
            .take_while(|&c| c == '.')
            .count();
        if leading_dots == 0 {
            return Some(imported_object_name.to_owned());
        }

        let parts: Vec<&str> = importer.split('.').collect();
        // A package's own contents live at depth 1, so its base keeps one
        // more segment than a plain module's.
        let segments_to_keep = if is_package {
            parts.len().checked_sub(leading_dots - 1)
        } else {
            parts.len().checked_sub(leading_dots)
        };
        let Some(segments_to_keep) = segments_to_keep.filter(|&n| n > 0) else {
            warn!(
                "relative import {imported_object_name} in {importer} reaches above its root \
                 package; skipping"
            );
            return None;
        };

        let base = parts[..segments_to_keep].join(".");
        Some(format!("{base}.{}", &imported_object_name[leading_dots..]))
    }

    /// An imported object resolves to the module of the same name if there
    /// is one, else to its parent module (`from x import name` where `name`
    /// is an attribute, not a submodule). The `*` of a wildcard import never
    /// names a module, so it lands on the parent too.
    fn resolve_internal(&self, imported_object_name: &str) -> Option<String> {
        if self.modules.contains(imported_object_name) {
            return Some(imported_object_name.to_owned());
        }
        if let Some((parent, _)) = imported_object_name.rsplit_once('.')
            && self.modules.contains(parent)
        {
            return Some(parent.to_owned());
        }
        None
    }

    /// Turn a known-external name into the module to add to the graph.
    ///
    /// Unwanted subpackages are removed: `django.models.db` becomes
    /// `django`. When the external shares a namespace with an internal
    /// package, the result is the shallowest prefix that does not clash
    /// with an internal namespace — for `foo.blue.alpha.one` alongside the
    /// internal package `foo.blue.beta` that is `foo.blue.alpha`; alongside
    /// `foo.green` it is `foo.blue`.
    fn distill_external(&self, module_name: &str) -> Option<String> {
        // An ancestor of an internal package is a namespace, not a module.
        for package in &self.package_names {
            if is_descendant(package, module_name) {
                debug!("not distilling {module_name}: it is an internal namespace");
                return None;
            }
        }

        let module_root = module_name.split('.').next().expect("names are non-empty");
        let mut candidate_portions: Vec<String> = Vec::new();
        for package in &self.package_names {
            if !is_descendant(package, module_root) {
                continue;
            }
            let mut external_components: Vec<&str> = module_name.split('.').collect();
            let mut namespace_components: Vec<&str> = Vec::new();
            for internal in package.split('.') {
                if external_components.first() != Some(&internal) {
                    break;
                }
                namespace_components.push(external_components.remove(0));
            }
            namespace_components.push(external_components[0]);
            candidate_portions.push(namespace_components.join("."));
        }

        // When several packages share a namespace with the module, the
        // deepest candidate is itself known to be a namespace.
        let deepest = candidate_portions
            .into_iter()
            .max_by_key(|portion| portion.split('.').count());
        Some(deepest.unwrap_or_else(|| module_root.to_owned()))
    }
}

fn is_descendant(module_name: &str, potential_ancestor: &str) -> bool {
    module_name.starts_with(&format!("{potential_ancestor}."))
}
