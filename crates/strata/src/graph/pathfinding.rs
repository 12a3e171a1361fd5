//! Reachability and shortest-path search over interned adjacency sets.
//!
//! Neighbours are visited in adjacency insertion order, so for a given build
//! order the discovered path is deterministic.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::errors::{StrataError, StrataResult};
use crate::graph::{FxIndexMap, FxIndexSet, Graph};
use crate::interner::ModuleId;

/// Transitive closure over `adjacency` from `from_modules`, excluding the
/// starting set itself.
pub(crate) fn find_reach(
    adjacency: &FxHashMap<ModuleId, FxIndexSet<ModuleId>>,
    from_modules: &FxIndexSet<ModuleId>,
) -> FxIndexSet<ModuleId> {
    let mut seen: FxIndexSet<ModuleId> = from_modules.iter().copied().collect();

    let mut i = 0;
    while let Some(&module) = seen.get_index(i) {
        if let Some(next_modules) = adjacency.get(&module) {
            for next_module in next_modules {
                seen.insert(*next_module);
            }
        }
        i += 1;
    }

    seen.retain(|module| !from_modules.contains(module));
    seen
}

/// Shortest path from any of `from_modules` to any of `to_modules`, found
/// with a bidirectional BFS.
///
/// `excluded_modules` may not be entered; `excluded_imports` edges may not
/// be traversed. Overlapping endpoint sets fail with
/// [`StrataError::ModulesHaveSharedDescendants`].
pub(crate) fn find_shortest_path(
    graph: &Graph,
    from_modules: &FxIndexSet<ModuleId>,
    to_modules: &FxIndexSet<ModuleId>,
    excluded_modules: &FxHashSet<ModuleId>,
    excluded_imports: &FxHashMap<ModuleId, FxHashSet<ModuleId>>,
) -> StrataResult<Option<Vec<ModuleId>>> {
    if from_modules.iter().any(|m| to_modules.contains(m)) {
        return Err(StrataError::ModulesHaveSharedDescendants);
    }

    // Each map records how a module was reached: None for a search root.
    let mut predecessors: FxIndexMap<ModuleId, Option<ModuleId>> =
        from_modules.iter().map(|m| (*m, None)).collect();
    let mut successors: FxIndexMap<ModuleId, Option<ModuleId>> =
        to_modules.iter().map(|m| (*m, None)).collect();

    let mut i_forwards = 0;
    let mut i_backwards = 0;
    let meeting_point = 'search: loop {
        // Expand the forward frontier by one level.
        for _ in 0..(predecessors.len() - i_forwards) {
            let module = *predecessors.get_index(i_forwards).expect("index in bounds").0;
            for next_module in graph.imports_of(module).iter().copied() {
                if import_is_excluded(module, next_module, excluded_modules, excluded_imports) {
                    continue;
                }
                if !predecessors.contains_key(&next_module) {
                    predecessors.insert(next_module, Some(module));
                }
                if successors.contains_key(&next_module) {
                    break 'search Some(next_module);
                }
            }
            i_forwards += 1;
        }

        // Expand the backward frontier by one level.
        for _ in 0..(successors.len() - i_backwards) {
            let module = *successors.get_index(i_backwards).expect("index in bounds").0;
            for next_module in graph.importers_of(module).iter().copied() {
                if import_is_excluded(next_module, module, excluded_modules, excluded_imports) {
                    continue;
                }
                if !successors.contains_key(&next_module) {
                    successors.insert(next_module, Some(module));
                }
                if predecessors.contains_key(&next_module) {
                    break 'search Some(next_module);
                }
            }
            i_backwards += 1;
        }

        if i_forwards == predecessors.len() && i_backwards == successors.len() {
            break 'search None;
        }
    };

    Ok(meeting_point.map(|meeting_point| {
        let mut path = vec![];
        let mut node = Some(meeting_point);
        while let Some(n) = node {
            path.push(n);
            node = *predecessors.get(&n).expect("node was visited forwards");
        }
        path.reverse();
        let mut node = *successors
            .get(path.last().expect("path contains the meeting point"))
            .expect("node was visited backwards");
        while let Some(n) = node {
            path.push(n);
            node = *successors.get(&n).expect("node was visited backwards");
        }
        path
    }))
}

fn import_is_excluded(
    from_module: ModuleId,
    to_module: ModuleId,
    excluded_modules: &FxHashSet<ModuleId>,
    excluded_imports: &FxHashMap<ModuleId, FxHashSet<ModuleId>>,
) -> bool {
    excluded_modules.contains(&to_module)
        || excluded_imports
            .get(&from_module)
            .is_some_and(|targets| targets.contains(&to_module))
}
