//! Direct-import queries.

use crate::errors::{StrataError, StrataResult};
use crate::expressions::ModuleExpression;
use crate::graph::{FxIndexSet, Graph, ImportDetail, ModuleNameSet};
use crate::interner::ModuleId;

impl Graph {
    /// Number of distinct import edges (not detail records).
    pub fn count_imports(&self) -> usize {
        self.imports.values().map(FxIndexSet::len).sum()
    }

    /// Whether a direct import exists.
    ///
    /// With `as_packages`, both sides are expanded to their descendant sets
    /// first; overlapping subtrees fail with
    /// [`StrataError::ModulesHaveSharedDescendants`].
    pub fn direct_import_exists(
        &self,
        importer: &str,
        imported: &str,
        as_packages: bool,
    ) -> StrataResult<bool> {
        let importer = self.require_visible(importer)?;
        let imported = self.require_visible(imported)?;

        let (importers, importeds) = if as_packages {
            let importers = self.with_descendant_ids(importer);
            let importeds = self.with_descendant_ids(imported);
            if importers.iter().any(|m| importeds.contains(m)) {
                return Err(StrataError::ModulesHaveSharedDescendants);
            }
            (importers, importeds)
        } else {
            (
                FxIndexSet::from_iter([importer]),
                FxIndexSet::from_iter([imported]),
            )
        };

        Ok(importers.iter().any(|candidate| {
            self.imports
                .get(candidate)
                .is_some_and(|targets| targets.iter().any(|t| importeds.contains(t)))
        }))
    }

    pub fn find_modules_directly_imported_by(&self, module: &str) -> StrataResult<ModuleNameSet> {
        let id = self.require_visible(module)?;
        Ok(self.resolve_set(self.imports_of(id).iter().copied()))
    }

    pub fn find_modules_that_directly_import(&self, module: &str) -> StrataResult<ModuleNameSet> {
        let id = self.require_visible(module)?;
        Ok(self.resolve_set(self.importers_of(id).iter().copied()))
    }

    /// The stored detail records for an edge, empty if the edge is absent or
    /// carries none.
    pub fn get_import_details(&self, importer: &str, imported: &str) -> Vec<ImportDetail> {
        let (Some(importer), Some(imported)) =
            (self.visible_id(importer), self.visible_id(imported))
        else {
            return Vec::new();
        };
        self.import_details
            .get(&(importer, imported))
            .cloned()
            .unwrap_or_default()
    }

    /// Every (importer, imported) edge whose endpoints match the two
    /// expressions, sorted by name.
    pub fn find_matching_direct_imports(
        &self,
        importer_expression: &str,
        imported_expression: &str,
    ) -> StrataResult<Vec<(String, String)>> {
        let importer_expression: ModuleExpression = importer_expression.parse()?;
        let imported_expression: ModuleExpression = imported_expression.parse()?;

        let mut matches: Vec<(String, String)> = self
            .imports
            .iter()
            .flat_map(|(importer, importeds)| {
                importeds.iter().map(move |imported| (*importer, *imported))
            })
            .filter(|(importer, imported)| {
                importer_expression.is_match(self.name_of(*importer))
                    && imported_expression.is_match(self.name_of(*imported))
            })
            .map(|(importer, imported)| {
                (
                    self.name_of(importer).to_owned(),
                    self.name_of(imported).to_owned(),
                )
            })
            .collect();
        matches.sort();
        Ok(matches)
    }

    /// Every direct (importer, imported) edge running from one module's
    /// subtree into another's.
    pub(crate) fn direct_imports_between(
        &self,
        importer: ModuleId,
        imported: ModuleId,
    ) -> Vec<(ModuleId, ModuleId)> {
        let importer_members = self.with_descendant_ids(importer);
        let imported_members = self.with_descendant_ids(imported);
        let mut edges = Vec::new();
        for member in &importer_members {
            for target in self.imports_of(*member) {
                if imported_members.contains(target) {
                    edges.push((*member, *target));
                }
            }
        }
        edges
    }

    pub(crate) fn imports_of(&self, id: ModuleId) -> &FxIndexSet<ModuleId> {
        static EMPTY: std::sync::LazyLock<FxIndexSet<ModuleId>> =
            std::sync::LazyLock::new(FxIndexSet::default);
        self.imports.get(&id).unwrap_or(&EMPTY)
    }

    pub(crate) fn importers_of(&self, id: ModuleId) -> &FxIndexSet<ModuleId> {
        static EMPTY: std::sync::LazyLock<FxIndexSet<ModuleId>> =
            std::sync::LazyLock::new(FxIndexSet::default);
        self.reverse_imports.get(&id).unwrap_or(&EMPTY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(names: &[&str]) -> ModuleNameSet {
        names.iter().map(|&n| n.to_owned()).collect()
    }

    #[test]
    fn count_imports_counts_edges_not_details() {
        let mut graph = Graph::new();
        graph.add_import_with_detail("a", "b", 1, "import b");
        graph.add_import_with_detail("a", "b", 2, "import b");
        graph.add_import("a", "c");
        assert_eq!(graph.count_imports(), 2);
    }

    #[test]
    fn direct_import_exists_is_directional() {
        let mut graph = Graph::new();
        graph.add_import("pkg.foo", "pkg.bar");
        assert!(graph.direct_import_exists("pkg.foo", "pkg.bar", false).unwrap());
        assert!(!graph.direct_import_exists("pkg.bar", "pkg.foo", false).unwrap());
    }

    #[test]
    fn direct_import_exists_as_packages_scans_descendants() {
        let mut graph = Graph::new();
        graph.add_module("pkg.foo", false).unwrap();
        graph.add_module("pkg.bar", false).unwrap();
        graph.add_import("pkg.bar.x", "pkg.foo.alpha");

        assert!(graph.direct_import_exists("pkg.bar", "pkg.foo", true).unwrap());
        assert!(!graph.direct_import_exists("pkg.foo", "pkg.bar", true).unwrap());
        // Without package expansion there is no direct edge.
        assert!(!graph.direct_import_exists("pkg.bar", "pkg.foo", false).unwrap());
    }

    #[test]
    fn direct_import_exists_rejects_overlapping_subtrees() {
        let mut graph = Graph::new();
        graph.add_module("pkg", false).unwrap();
        graph.add_module("pkg.foo", false).unwrap();
        let result = graph.direct_import_exists("pkg", "pkg.foo", true);
        assert!(matches!(
            result,
            Err(StrataError::ModulesHaveSharedDescendants)
        ));
    }

    #[test]
    fn direct_neighbour_queries() {
        let mut graph = Graph::new();
        graph.add_import("pkg.bar", "pkg.foo");
        graph.add_import("pkg.bar", "other");
        graph.add_import("pkg.green", "pkg.bar");

        assert_eq!(
            graph.find_modules_directly_imported_by("pkg.bar").unwrap(),
            set(&["pkg.foo", "other"])
        );
        assert_eq!(
            graph.find_modules_that_directly_import("pkg.bar").unwrap(),
            set(&["pkg.green"])
        );
    }

    #[test]
    fn get_import_details_for_missing_edge_is_empty() {
        let mut graph = Graph::new();
        graph.add_import("a", "b");
        assert!(graph.get_import_details("a", "b").is_empty());
        assert!(graph.get_import_details("b", "a").is_empty());
        assert!(graph.get_import_details("a", "nowhere").is_empty());
    }

    #[test]
    fn find_matching_direct_imports_filters_both_ends() {
        let mut graph = Graph::new();
        graph.add_import("pkg.animals.dog", "pkg.food.chicken");
        graph.add_import("pkg.animals.cat", "pkg.food.fish");
        graph.add_import("pkg.animals.dog", "pkg.colors.golden");
        graph.add_import("pkg.shops.tesco", "pkg.food.chicken");

        let matches = graph
            .find_matching_direct_imports("pkg.animals.*", "pkg.food.*")
            .unwrap();
        assert_eq!(
            matches,
            vec![
                ("pkg.animals.cat".to_owned(), "pkg.food.fish".to_owned()),
                ("pkg.animals.dog".to_owned(), "pkg.food.chicken".to_owned()),
            ]
        );
    }
}
