//! The import graph.
//!
//! A [`Graph`] holds two related structures over interned module ids: the
//! module hierarchy implied by dotted names, and the directed import graph
//! with mirrored forward/reverse adjacency. All public methods speak in
//! module names; ids stay internal.
//!
//! Adjacency sets are insertion-ordered so that traversals (and therefore
//! chain selection) are deterministic for a given build order.

use indexmap::{IndexMap, IndexSet};
use rustc_hash::{FxBuildHasher, FxHashMap};

use crate::errors::{StrataError, StrataResult};
use crate::interner::{ModuleId, ModuleNames};

mod chains;
mod cycles;
mod direct;
mod hierarchy;
mod layers;
mod manipulation;
pub(crate) mod pathfinding;

pub use layers::{Layer, PackageDependency, Route};

pub(crate) type FxIndexMap<K, V> = IndexMap<K, V, FxBuildHasher>;
pub(crate) type FxIndexSet<T> = IndexSet<T, FxBuildHasher>;

/// An insertion-ordered set of module names, as returned by set-valued
/// queries.
pub type ModuleNameSet = IndexSet<String, FxBuildHasher>;

/// Line metadata attached to a direct import.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ImportDetail {
    pub line_number: usize,
    pub line_contents: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ModuleMeta {
    /// Placeholder ancestors exist in the hierarchy but haven't been added
    /// to the graph; they are skipped by every query result.
    pub(crate) visible: bool,
    pub(crate) squashed: bool,
}

/// A directed import graph over one or more Python package trees.
#[derive(Debug, Default, Clone)]
pub struct Graph {
    pub(crate) names: ModuleNames,
    pub(crate) modules: FxIndexMap<ModuleId, ModuleMeta>,
    pub(crate) parents: FxHashMap<ModuleId, Option<ModuleId>>,
    pub(crate) children: FxHashMap<ModuleId, FxIndexSet<ModuleId>>,
    pub(crate) imports: FxHashMap<ModuleId, FxIndexSet<ModuleId>>,
    pub(crate) reverse_imports: FxHashMap<ModuleId, FxIndexSet<ModuleId>>,
    pub(crate) import_details: FxHashMap<(ModuleId, ModuleId), Vec<ImportDetail>>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// All modules in the graph, in insertion order.
    pub fn modules(&self) -> impl Iterator<Item = &str> {
        self.modules
            .iter()
            .filter(|(_, meta)| meta.visible)
            .map(|(id, _)| self.names.resolve(*id))
    }

    pub fn contains_module(&self, name: &str) -> bool {
        self.visible_id(name).is_some()
    }

    pub fn is_module_squashed(&self, name: &str) -> StrataResult<bool> {
        let id = self.require_visible(name)?;
        Ok(self.modules[&id].squashed)
    }

    // Internal lookups
    // ----------------

    /// Id of a module present in the graph, placeholder ancestors included.
    pub(crate) fn node_id(&self, name: &str) -> Option<ModuleId> {
        let id = self.names.get(name)?;
        self.modules.contains_key(&id).then_some(id)
    }

    pub(crate) fn visible_id(&self, name: &str) -> Option<ModuleId> {
        self.node_id(name)
            .filter(|id| self.modules[id].visible)
    }

    pub(crate) fn require_visible(&self, name: &str) -> StrataResult<ModuleId> {
        self.visible_id(name)
            .ok_or_else(|| StrataError::ModuleNotPresent(name.to_owned()))
    }

    pub(crate) fn is_visible(&self, id: ModuleId) -> bool {
        self.modules.get(&id).is_some_and(|meta| meta.visible)
    }

    pub(crate) fn name_of(&self, id: ModuleId) -> &str {
        self.names.resolve(id)
    }

    /// The module and all its descendants, placeholders included, parents
    /// before children.
    pub(crate) fn with_descendant_ids(&self, id: ModuleId) -> FxIndexSet<ModuleId> {
        let mut result = FxIndexSet::default();
        result.insert(id);
        let mut i = 0;
        while let Some(&current) = result.get_index(i) {
            if let Some(children) = self.children.get(&current) {
                result.extend(children.iter().copied());
            }
            i += 1;
        }
        result
    }

    pub(crate) fn resolve_set(&self, ids: impl IntoIterator<Item = ModuleId>) -> ModuleNameSet {
        ids.into_iter()
            .filter(|id| self.is_visible(*id))
            .map(|id| self.name_of(id).to_owned())
            .collect()
    }
}
