//! Module name interning.
//!
//! Every set and map in the graph is keyed by [`ModuleId`], a small integer
//! handle for a dotted module name. Interning happens once per distinct name;
//! after that, hierarchy and adjacency operations never hash strings.

use indexmap::IndexSet;
use rustc_hash::FxBuildHasher;

/// Unique identifier for an interned module name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct ModuleId(u32);

impl ModuleId {
    #[inline]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

/// Bidirectional map between dotted names and [`ModuleId`]s.
///
/// Ids are dense, stable for the lifetime of the interner, and never reused.
#[derive(Debug, Default, Clone)]
pub struct ModuleNames {
    names: IndexSet<String, FxBuildHasher>,
}

impl ModuleNames {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a name, returning its id. Idempotent.
    pub fn intern(&mut self, name: &str) -> ModuleId {
        if let Some(index) = self.names.get_index_of(name) {
            return ModuleId(index as u32);
        }
        let (index, _) = self.names.insert_full(name.to_owned());
        ModuleId(index as u32)
    }

    /// Look up an already-interned name.
    pub fn get(&self, name: &str) -> Option<ModuleId> {
        self.names.get_index_of(name).map(|index| ModuleId(index as u32))
    }

    /// Resolve an id back to its name.
    ///
    /// Panics if the id was not produced by this interner.
    pub fn resolve(&self, id: ModuleId) -> &str {
        self.names
            .get_index(id.0 as usize)
            .expect("ModuleId not found in interner")
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
