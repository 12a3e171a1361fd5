//! Indirect-import queries: reachable sets, shortest chains, existence.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::errors::StrataResult;
use crate::graph::pathfinding::{find_reach, find_shortest_path};
use crate::graph::{FxIndexSet, Graph, ModuleNameSet};
use crate::interner::ModuleId;

impl Graph {
    /// Modules transitively imported by `module` (or by anything in its
    /// subtree, with `as_package`). The starting set is excluded.
    pub fn find_upstream_modules(
        &self,
        module: &str,
        as_package: bool,
    ) -> StrataResult<ModuleNameSet> {
        let id = self.require_visible(module)?;
        let from_modules = self.search_set(id, as_package);
        Ok(self.resolve_set(find_reach(&self.imports, &from_modules)))
    }

    /// Modules that transitively import `module` (or anything in its
    /// subtree, with `as_package`). The starting set is excluded.
    pub fn find_downstream_modules(
        &self,
        module: &str,
        as_package: bool,
    ) -> StrataResult<ModuleNameSet> {
        let id = self.require_visible(module)?;
        let from_modules = self.search_set(id, as_package);
        Ok(self.resolve_set(find_reach(&self.reverse_imports, &from_modules)))
    }

    /// One shortest chain of direct imports from importer to imported, or
    /// `None` if unreachable.
    pub fn find_shortest_chain(
        &self,
        importer: &str,
        imported: &str,
        as_packages: bool,
    ) -> StrataResult<Option<Vec<String>>> {
        let importer = self.require_visible(importer)?;
        let imported = self.require_visible(imported)?;
        Ok(self
            .shortest_chain_ids(importer, imported, as_packages)?
            .map(|chain| {
                chain
                    .into_iter()
                    .map(|id| self.name_of(id).to_owned())
                    .collect()
            }))
    }

    /// Whether any chain exists from importer to imported.
    pub fn chain_exists(
        &self,
        importer: &str,
        imported: &str,
        as_packages: bool,
    ) -> StrataResult<bool> {
        let importer = self.require_visible(importer)?;
        let imported = self.require_visible(imported)?;
        self.chain_exists_ids(importer, imported, as_packages)
    }

    /// One shortest chain per (head, tail) pair between two packages.
    ///
    /// For each pair of members drawn from the importer's and imported's
    /// subtrees, the search runs with every *other* member excluded, so a
    /// chain that merely passes through another member is suppressed in
    /// favour of that member's own chain.
    pub fn find_shortest_chains(
        &self,
        importer: &str,
        imported: &str,
        as_packages: bool,
    ) -> StrataResult<FxHashSet<Vec<String>>> {
        let importer = self.require_visible(importer)?;
        let imported = self.require_visible(imported)?;

        // Shortcut when there are no chains at all.
        if !self.chain_exists_ids(importer, imported, as_packages)? {
            return Ok(FxHashSet::default());
        }

        let downstream_modules = self.search_set(importer, as_packages);
        let upstream_modules = self.search_set(imported, as_packages);
        let all_members: FxHashSet<ModuleId> = downstream_modules
            .iter()
            .chain(upstream_modules.iter())
            .copied()
            .collect();

        let mut chains = FxHashSet::default();
        for downstream in &downstream_modules {
            for upstream in &upstream_modules {
                let mut excluded_modules = all_members.clone();
                excluded_modules.remove(downstream);
                excluded_modules.remove(upstream);

                let chain = find_shortest_path(
                    self,
                    &FxIndexSet::from_iter([*downstream]),
                    &FxIndexSet::from_iter([*upstream]),
                    &excluded_modules,
                    &FxHashMap::default(),
                )?;
                if let Some(chain) = chain {
                    chains.insert(
                        chain
                            .into_iter()
                            .map(|id| self.name_of(id).to_owned())
                            .collect(),
                    );
                }
            }
        }
        Ok(chains)
    }

    // Id-level helpers shared with the layer analyser.

    pub(crate) fn shortest_chain_ids(
        &self,
        importer: ModuleId,
        imported: ModuleId,
        as_packages: bool,
    ) -> StrataResult<Option<Vec<ModuleId>>> {
        find_shortest_path(
            self,
            &self.search_set(importer, as_packages),
            &self.search_set(imported, as_packages),
            &FxHashSet::default(),
            &FxHashMap::default(),
        )
    }

    pub(crate) fn chain_exists_ids(
        &self,
        importer: ModuleId,
        imported: ModuleId,
        as_packages: bool,
    ) -> StrataResult<bool> {
        Ok(self
            .shortest_chain_ids(importer, imported, as_packages)?
            .is_some())
    }

    fn search_set(&self, id: ModuleId, with_descendants: bool) -> FxIndexSet<ModuleId> {
        if with_descendants {
            self.with_descendant_ids(id)
        } else {
            FxIndexSet::from_iter([id])
        }
    }
}
