//! Build orchestration: scan → cache check → parallel extraction → graph
//! assembly.

use log::{debug, info};
use rayon::prelude::*;

use crate::cache::ImportsCache;
use crate::config::BuildConfig;
use crate::discovery::{self, FoundPackage, ModuleFile};
use crate::errors::StrataResult;
use crate::graph::Graph;
use crate::parsing;
use crate::resolver::PackageResolver;
use crate::scanning::{DirectImport, ImportScanner};

/// Build an import graph for the configured package roots.
///
/// Each root is located on disk and walked for modules; files whose imports
/// are already cached are skipped, the rest are parsed in parallel; finally
/// the graph is assembled serially, resolving external imports into
/// squashed stand-in nodes when requested.
pub fn build_graph(config: &BuildConfig) -> StrataResult<Graph> {
    let resolver = PackageResolver::new(config);
    let mut found_packages = Vec::with_capacity(config.package_names.len());
    for package_name in &config.package_names {
        let directory = resolver.determine_package_directory(package_name)?;
        let package = discovery::find_package(package_name, &directory)?;
        debug!(
            "found {} modules in package {package_name}",
            package.module_files.len()
        );
        found_packages.push(package);
    }

    // The scanner needs the complete inventory before any resolution:
    // external names are distilled against every internal namespace.
    let scanner = ImportScanner::new(&found_packages, config.include_external_packages);

    let results = scan_packages(config, &found_packages, &scanner)?;

    Ok(assemble_graph(config, &scanner, &results))
}

fn scan_packages(
    config: &BuildConfig,
    found_packages: &[FoundPackage],
    scanner: &ImportScanner,
) -> StrataResult<Vec<(ModuleFile, Vec<DirectImport>)>> {
    let mut cache = ImportsCache::setup(config);

    let mut cached: Vec<(ModuleFile, Vec<DirectImport>)> = Vec::new();
    let mut to_extract: Vec<&ModuleFile> = Vec::new();
    for package in found_packages {
        for module_file in &package.module_files {
            match cache.read_imports(module_file) {
                Some(imports) => cached.push((module_file.clone(), imports)),
                None => to_extract.push(module_file),
            }
        }
    }
    info!(
        "{} modules cached, {} to extract",
        cached.len(),
        to_extract.len()
    );

    // Extraction is independent per file; fan out across the thread pool.
    let extracted: Vec<(ModuleFile, Vec<DirectImport>)> = to_extract
        .into_par_iter()
        .map(|module_file| -> StrataResult<(ModuleFile, Vec<DirectImport>)> {
            let imports = extract_one(module_file, scanner)?;
            Ok((module_file.clone(), imports))
        })
        .collect::<StrataResult<_>>()?;

    let mut results = cached;
    results.extend(extracted);
    cache.write(&results);
    Ok(results)
}

fn extract_one(
    module_file: &ModuleFile,
    scanner: &ImportScanner,
) -> StrataResult<Vec<DirectImport>> {
    let Some(imported_objects) = parsing::parse_imports(&module_file.path)? else {
        // Not decodable; warned about and treated as importing nothing.
        return Ok(Vec::new());
    };
    let is_package = module_file
        .path
        .file_name()
        .is_some_and(|name| name == "__init__.py");
    Ok(scanner.resolve_imports(&module_file.module, is_package, imported_objects))
}

fn assemble_graph(
    config: &BuildConfig,
    scanner: &ImportScanner,
    results: &[(ModuleFile, Vec<DirectImport>)],
) -> Graph {
    let mut graph = Graph::new();
    for (module_file, _) in results {
        graph
            .add_module(&module_file.module, false)
            .expect("scanned modules cannot conflict");
    }
    for (_, imports) in results {
        for import in imports {
            if config.exclude_type_checking_imports && import.is_type_checking {
                continue;
            }
            if scanner.is_external(&import.imported) {
                graph
                    .add_module(&import.imported, true)
                    .expect("distilled externals never collide with internal modules");
            }
            graph.add_import_with_detail(
                &import.importer,
                &import.imported,
                import.line_number,
                &import.line_contents,
            );
        }
    }
    info!(
        "assembled graph with {} modules and {} imports",
        graph.modules().count(),
        graph.count_imports()
    );
    graph
}
