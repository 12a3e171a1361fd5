//! Hierarchy queries: children, descendants, and expression matching.

use crate::errors::{StrataError, StrataResult};
use crate::expressions::ModuleExpression;
use crate::graph::{Graph, ModuleNameSet};
use crate::interner::ModuleId;

impl Graph {
    /// Modules whose name is the supplied name plus exactly one segment.
    ///
    /// The module itself may be a placeholder (e.g. a package whose children
    /// were added as orphans), but it must be known to the hierarchy.
    pub fn find_children(&self, module: &str) -> StrataResult<ModuleNameSet> {
        let id = self.hierarchy_node(module)?;
        let children = self
            .children
            .get(&id)
            .map(|children| children.iter().copied())
            .into_iter()
            .flatten();
        Ok(self.resolve_set(children))
    }

    /// All modules strictly under the supplied name.
    pub fn find_descendants(&self, module: &str) -> StrataResult<ModuleNameSet> {
        let id = self.hierarchy_node(module)?;
        Ok(self.resolve_set(self.with_descendant_ids(id).into_iter().skip(1)))
    }

    /// Modules matching a module expression (`*` one segment, `**` one or
    /// more).
    pub fn find_matching_modules(&self, expression: &str) -> StrataResult<ModuleNameSet> {
        let expression: ModuleExpression = expression.parse()?;
        Ok(self
            .modules
            .iter()
            .filter(|(_, meta)| meta.visible)
            .map(|(id, _)| self.name_of(*id))
            .filter(|name| expression.is_match(name))
            .map(str::to_owned)
            .collect())
    }

    fn hierarchy_node(&self, module: &str) -> StrataResult<ModuleId> {
        let id = self
            .node_id(module)
            .ok_or_else(|| StrataError::ModuleNotPresent(module.to_owned()))?;
        if self.modules[&id].squashed {
            return Err(StrataError::ModuleIsSquashed(module.to_owned()));
        }
        Ok(id)
    }
}
