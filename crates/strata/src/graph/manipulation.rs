//! Graph mutation: adding and removing modules and imports, squashing.

use crate::errors::{StrataError, StrataResult};
use crate::graph::{FxIndexSet, Graph, ImportDetail, ModuleMeta};
use crate::interner::ModuleId;

impl Graph {
    /// Add a module to the graph. Idempotent.
    ///
    /// Placeholder nodes are created for any missing ancestors so that
    /// hierarchy queries work, but they are not part of the graph until
    /// added themselves.
    ///
    /// Fails if the module already exists with the opposite `is_squashed`
    /// flag, or if any ancestor is squashed (a squashed module stands in for
    /// its whole subtree, so the subtree must stay empty).
    pub fn add_module(&mut self, name: &str, is_squashed: bool) -> StrataResult<()> {
        if let Some(ancestor) = self.squashed_ancestor(name) {
            return Err(StrataError::DescendantOfSquashedModule {
                module: name.to_owned(),
                ancestor,
            });
        }

        if let Some(id) = self.visible_id(name) {
            if self.modules[&id].squashed != is_squashed {
                return Err(StrataError::SquashedStateConflict(name.to_owned()));
            }
            return Ok(());
        }

        let id = self.get_or_add_node(name);
        let meta = self.modules.get_mut(&id).expect("node just added");
        meta.visible = true;
        meta.squashed = is_squashed;
        Ok(())
    }

    /// Remove a module and all its incident imports. No-op if absent.
    ///
    /// Descendants are left in place; if the module still anchors a subtree
    /// it is downgraded to a placeholder rather than dropped.
    pub fn remove_module(&mut self, name: &str) {
        let Some(id) = self.visible_id(name) else {
            return;
        };
        self.remove_incident_imports(id);
        if self.children.get(&id).is_some_and(|c| !c.is_empty()) {
            let meta = self.modules.get_mut(&id).expect("module is present");
            meta.visible = false;
            meta.squashed = false;
        } else {
            self.drop_node(id);
        }
    }

    /// Add a direct import between two modules, auto-adding either end if
    /// missing. The edge set is idempotent. An existing endpoint keeps its
    /// squashed state.
    pub fn add_import(&mut self, importer: &str, imported: &str) {
        let importer = self.ensure_visible_node(importer);
        let imported = self.ensure_visible_node(imported);
        self.add_import_ids(importer, imported);
    }

    /// Like [`Graph::add_import`], but appending line metadata to the edge.
    ///
    /// A repeated (importer, imported) pair appends a detail rather than
    /// creating a second edge.
    pub fn add_import_with_detail(
        &mut self,
        importer: &str,
        imported: &str,
        line_number: usize,
        line_contents: &str,
    ) {
        let importer = self.ensure_visible_node(importer);
        let imported = self.ensure_visible_node(imported);
        self.add_import_ids(importer, imported);
        self.import_details
            .entry((importer, imported))
            .or_default()
            .push(ImportDetail {
                line_number,
                line_contents: line_contents.to_owned(),
            });
    }

    /// Remove a direct import and its details. No-op if absent. Idempotent.
    pub fn remove_import(&mut self, importer: &str, imported: &str) {
        let (Some(importer), Some(imported)) =
            (self.visible_id(importer), self.visible_id(imported))
        else {
            return;
        };
        self.remove_import_ids(importer, imported);
    }

    /// Collapse a module's subtree into the module itself.
    ///
    /// Every import to or from a descendant is re-pointed at the module; the
    /// descendants (and their import details) are then removed, and the
    /// module is flagged as squashed.
    pub fn squash_module(&mut self, name: &str) -> StrataResult<()> {
        let id = self.require_visible(name)?;
        if self.modules[&id].squashed {
            return Ok(());
        }

        let subtree = self.with_descendant_ids(id);
        let descendants: Vec<ModuleId> = subtree.iter().skip(1).copied().collect();

        let mut imported_by_subtree: FxIndexSet<ModuleId> = FxIndexSet::default();
        let mut importers_of_subtree: FxIndexSet<ModuleId> = FxIndexSet::default();
        for descendant in &descendants {
            if let Some(imports) = self.imports.get(descendant) {
                imported_by_subtree.extend(imports.iter().copied());
            }
            if let Some(importers) = self.reverse_imports.get(descendant) {
                importers_of_subtree.extend(importers.iter().copied());
            }
        }
        // Imports internal to the subtree collapse to nothing.
        imported_by_subtree.retain(|m| !subtree.contains(m));
        importers_of_subtree.retain(|m| !subtree.contains(m));

        for imported in imported_by_subtree {
            self.add_import_ids(id, imported);
        }
        for importer in importers_of_subtree {
            self.add_import_ids(importer, id);
        }

        // Children first, so parents never dangle.
        for descendant in descendants.into_iter().rev() {
            self.remove_incident_imports(descendant);
            self.drop_node(descendant);
        }

        self.modules.get_mut(&id).expect("module is present").squashed = true;
        Ok(())
    }

    // Id-level mutation
    // -----------------

    /// Node for a name, created (with placeholder ancestors) if missing,
    /// made visible either way. The squashed flag is left alone.
    fn ensure_visible_node(&mut self, name: &str) -> ModuleId {
        let id = self.get_or_add_node(name);
        self.modules.get_mut(&id).expect("node just ensured").visible = true;
        id
    }

    /// Intern a name and make sure a node exists for it and every ancestor.
    /// New nodes start out invisible.
    pub(crate) fn get_or_add_node(&mut self, name: &str) -> ModuleId {
        if let Some(id) = self.node_id(name) {
            return id;
        }

        let mut lineage: Vec<&str> = vec![name];
        let mut current = name;
        while let Some((parent, _)) = current.rsplit_once('.') {
            lineage.push(parent);
            current = parent;
        }

        let mut parent: Option<ModuleId> = None;
        for ancestor in lineage.into_iter().rev() {
            let id = self.names.intern(ancestor);
            if self.modules.contains_key(&id) {
                parent = Some(id);
                continue;
            }
            self.modules.insert(id, ModuleMeta::default());
            self.parents.insert(id, parent);
            self.children.insert(id, FxIndexSet::default());
            self.imports.insert(id, FxIndexSet::default());
            self.reverse_imports.insert(id, FxIndexSet::default());
            if let Some(parent) = parent {
                self.children.get_mut(&parent).expect("parent exists").insert(id);
            }
            parent = Some(id);
        }
        parent.expect("lineage is never empty")
    }

    pub(crate) fn add_import_ids(&mut self, importer: ModuleId, imported: ModuleId) {
        self.imports.entry(importer).or_default().insert(imported);
        self.reverse_imports.entry(imported).or_default().insert(importer);
    }

    pub(crate) fn remove_import_ids(&mut self, importer: ModuleId, imported: ModuleId) {
        if let Some(imports) = self.imports.get_mut(&importer) {
            imports.shift_remove(&imported);
        }
        if let Some(importers) = self.reverse_imports.get_mut(&imported) {
            importers.shift_remove(&importer);
        }
        self.import_details.remove(&(importer, imported));
    }

    fn remove_incident_imports(&mut self, id: ModuleId) {
        let imported: Vec<ModuleId> = self
            .imports
            .get(&id)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default();
        for target in imported {
            self.remove_import_ids(id, target);
        }
        let importers: Vec<ModuleId> = self
            .reverse_imports
            .get(&id)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default();
        for source in importers {
            self.remove_import_ids(source, id);
        }
    }

    /// Drop a childless node from all structures. The interned name remains.
    fn drop_node(&mut self, id: ModuleId) {
        if let Some(Some(parent)) = self.parents.get(&id)
            && let Some(siblings) = self.children.get_mut(parent)
        {
            siblings.shift_remove(&id);
        }
        self.modules.shift_remove(&id);
        self.parents.remove(&id);
        self.children.remove(&id);
        self.imports.remove(&id);
        self.reverse_imports.remove(&id);
    }

    fn squashed_ancestor(&self, name: &str) -> Option<String> {
        let mut current = name;
        while let Some((parent, _)) = current.rsplit_once('.') {
            if let Some(id) = self.visible_id(parent)
                && self.modules[&id].squashed
            {
                return Some(parent.to_owned());
            }
            current = parent;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_module_is_idempotent() {
        let mut graph = Graph::new();
        graph.add_module("pkg.foo", false).unwrap();
        graph.add_module("pkg.foo", false).unwrap();
        assert_eq!(graph.modules().count(), 1);
    }

    #[test]
    fn add_module_with_conflicting_squashed_state_fails() {
        let mut graph = Graph::new();
        graph.add_module("pkg.foo", false).unwrap();
        let result = graph.add_module("pkg.foo", true);
        assert!(matches!(result, Err(StrataError::SquashedStateConflict(_))));
    }

    #[test]
    fn add_module_under_squashed_ancestor_fails() {
        let mut graph = Graph::new();
        graph.add_module("pkg.ext", true).unwrap();
        let result = graph.add_module("pkg.ext.sub", false);
        assert!(matches!(
            result,
            Err(StrataError::DescendantOfSquashedModule { .. })
        ));
    }

    #[test]
    fn add_import_auto_adds_modules() {
        let mut graph = Graph::new();
        graph.add_import("pkg.foo", "pkg.bar");
        assert!(graph.contains_module("pkg.foo"));
        assert!(graph.contains_module("pkg.bar"));
        assert!(graph.direct_import_exists("pkg.foo", "pkg.bar", false).unwrap());
    }

    #[test]
    fn add_import_twice_counts_one_edge() {
        let mut graph = Graph::new();
        let before = graph.count_imports();
        graph.add_import("a", "b");
        graph.add_import("a", "b");
        assert_eq!(graph.count_imports(), before + 1);
    }

    #[test]
    fn repeated_detailed_import_appends_details() {
        let mut graph = Graph::new();
        graph.add_import_with_detail("a", "b", 1, "import b");
        graph.add_import_with_detail("a", "b", 10, "from b import x");

        assert_eq!(graph.count_imports(), 1);
        let details = graph.get_import_details("a", "b");
        assert_eq!(details.len(), 2);
        assert_eq!(details[0].line_number, 1);
        assert_eq!(details[1].line_number, 10);
    }

    #[test]
    fn remove_import_is_idempotent() {
        let mut graph = Graph::new();
        graph.add_import("a", "b");
        graph.remove_import("a", "b");
        graph.remove_import("a", "b");
        assert_eq!(graph.count_imports(), 0);
        // Modules stay in the graph.
        assert!(graph.contains_module("a"));
        assert!(graph.contains_module("b"));
    }

    #[test]
    fn remove_nonexistent_module_is_a_noop() {
        let mut graph = Graph::new();
        graph.add_module("pkg", false).unwrap();
        graph.remove_module("pkg.foo");
        assert_eq!(graph.modules().count(), 1);
    }

    #[test]
    fn remove_module_removes_incident_imports() {
        let mut graph = Graph::new();
        graph.add_import("importer", "pkg.foo");
        graph.add_import("pkg.foo", "imported");

        graph.remove_module("pkg.foo");

        assert!(!graph.contains_module("pkg.foo"));
        assert!(!graph.direct_import_exists("importer", "imported", false).unwrap());
        assert_eq!(graph.count_imports(), 0);
    }

    #[test]
    fn remove_module_does_not_recurse_into_descendants() {
        let mut graph = Graph::new();
        graph.add_module("pkg.foo", false).unwrap();
        graph.add_module("pkg.foo.alpha", false).unwrap();

        graph.remove_module("pkg.foo");

        assert!(!graph.contains_module("pkg.foo"));
        assert!(graph.contains_module("pkg.foo.alpha"));
    }

    #[test]
    fn squash_module_collapses_descendant_imports() {
        let mut graph = Graph::new();
        graph.add_import("pkg.blue.alpha", "pkg.green");
        graph.add_import("pkg.blue.alpha.foo", "pkg.yellow");
        graph.add_import("pkg.red", "pkg.blue.alpha");
        graph.add_import("pkg.green", "pkg.blue.beta");
        // An import internal to the squashed subtree disappears.
        graph.add_import("pkg.blue.alpha", "pkg.blue.beta");
        graph.add_module("pkg.blue", false).unwrap();

        graph.squash_module("pkg.blue").unwrap();

        assert!(graph.is_module_squashed("pkg.blue").unwrap());
        assert!(!graph.contains_module("pkg.blue.alpha"));
        assert!(!graph.contains_module("pkg.blue.alpha.foo"));
        assert!(graph.direct_import_exists("pkg.blue", "pkg.green", false).unwrap());
        assert!(graph.direct_import_exists("pkg.blue", "pkg.yellow", false).unwrap());
        assert!(graph.direct_import_exists("pkg.red", "pkg.blue", false).unwrap());
        assert!(graph.direct_import_exists("pkg.green", "pkg.blue", false).unwrap());
        assert!(!graph.direct_import_exists("pkg.blue", "pkg.blue", false).unwrap());
    }

    #[test]
    fn squash_module_with_no_descendants() {
        let mut graph = Graph::new();
        graph.add_module("pkg.blue", false).unwrap();
        graph.squash_module("pkg.blue").unwrap();
        assert!(graph.is_module_squashed("pkg.blue").unwrap());
    }

    #[test]
    fn squash_module_twice_is_a_noop() {
        let mut graph = Graph::new();
        graph.add_module("pkg.blue", false).unwrap();
        graph.squash_module("pkg.blue").unwrap();
        graph.squash_module("pkg.blue").unwrap();
        assert!(graph.is_module_squashed("pkg.blue").unwrap());
    }

    #[test]
    fn squash_missing_module_fails() {
        let mut graph = Graph::new();
        let result = graph.squash_module("nowhere");
        assert!(matches!(result, Err(StrataError::ModuleNotPresent(_))));
    }

    #[test]
    fn squash_drops_descendant_import_details() {
        let mut graph = Graph::new();
        graph
            .add_import_with_detail("pkg.blue.alpha", "pkg.green", 4, "from pkg import green");
        graph.add_module("pkg.blue", false).unwrap();

        graph.squash_module("pkg.blue").unwrap();

        assert!(graph.get_import_details("pkg.blue", "pkg.green").is_empty());
    }
}
