//! Cycle-breaker nomination.
//!
//! Identifies a set of imports that, if removed, would leave a package
//! locally acyclic: no cycles between the subtrees of its direct children.
//! The children are condensed into a small weighted graph and arranged into
//! a linear order with a greedy heuristic (peel sources and sinks, then
//! extract by weighted degree difference); every condensed edge pointing
//! backwards in that order is a violation, reported as the underlying
//! module-level imports.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::errors::StrataResult;
use crate::graph::{FxIndexMap, FxIndexSet, Graph};
use crate::interner::ModuleId;

impl Graph {
    /// Identify a set of imports that, if removed, would make the package
    /// locally acyclic.
    ///
    /// Returns (importer, imported) name pairs. Imports that don't run
    /// between two different child subtrees of the package are disregarded.
    /// Fails with [`crate::errors::StrataError::ModuleNotPresent`] if the
    /// package is not in the graph.
    pub fn nominate_cycle_breakers(
        &self,
        package: &str,
    ) -> StrataResult<FxHashSet<(String, String)>> {
        let package = self.require_visible(package)?;
        let children: Vec<ModuleId> = self
            .children
            .get(&package)
            .map(|children| children.iter().copied().collect())
            .unwrap_or_default();
        if children.len() < 2 {
            return Ok(FxHashSet::default());
        }

        let (orig_imports, orig_reverse_imports, edge_weights) =
            self.condense_children(&children);

        // Work on a copy; nodes are removed as they are placed in the order.
        let mut working_imports = orig_imports.clone();
        let mut working_reverse_imports = orig_reverse_imports.clone();

        // Peel off sources: they can only ever point rightwards.
        let mut sources: Vec<ModuleId> = vec![];
        loop {
            let current_sources: Vec<ModuleId> = working_reverse_imports
                .iter()
                .filter(|(_, importers)| importers.is_empty())
                .map(|(source, _)| *source)
                .collect();
            if current_sources.is_empty() {
                break;
            }
            for source in &current_sources {
                remove_node(*source, &mut working_imports, &mut working_reverse_imports);
            }
            sources.extend(current_sources);
        }

        // Peel off sinks. Later-found sinks depend on earlier ones, so they
        // go in front of them.
        let mut sinks: Vec<ModuleId> = vec![];
        loop {
            let current_sinks: Vec<ModuleId> = working_imports
                .iter()
                .filter(|(_, importeds)| importeds.is_empty())
                .map(|(sink, _)| *sink)
                .collect();
            if current_sinks.is_empty() {
                break;
            }
            for sink in &current_sinks {
                remove_node(*sink, &mut working_imports, &mut working_reverse_imports);
            }
            sinks.splice(0..0, current_sinks);
        }

        // What's left is cyclic. Repeatedly extract the node with the
        // greatest weighted out-degree minus in-degree, ties broken by name.
        let mut middle: Vec<ModuleId> = vec![];
        while !working_imports.is_empty() {
            let mut best: Option<(ModuleId, isize)> = None;
            for candidate in working_imports.keys().copied() {
                let difference = degree_difference(
                    candidate,
                    &working_imports,
                    &working_reverse_imports,
                    &edge_weights,
                );
                let replace = match best {
                    None => true,
                    Some((incumbent, best_difference)) => {
                        difference > best_difference
                            || (difference == best_difference
                                && self.name_of(candidate) < self.name_of(incumbent))
                    }
                };
                if replace {
                    best = Some((candidate, difference));
                }
            }
            let (node, _) = best.expect("working graph is non-empty");
            middle.push(node);
            remove_node(node, &mut working_imports, &mut working_reverse_imports);
        }

        let position: FxHashMap<ModuleId, usize> = sources
            .into_iter()
            .chain(middle)
            .chain(sinks)
            .enumerate()
            .map(|(index, module)| (module, index))
            .collect();

        // Any original edge pointing leftwards in the order breaks a cycle;
        // expand it to the specific imports between the two subtrees.
        let mut cycle_breakers = FxHashSet::default();
        for (importer, importeds) in &orig_imports {
            for imported in importeds {
                if position[imported] < position[importer] {
                    for (from, to) in self.direct_imports_between(*importer, *imported) {
                        cycle_breakers.insert((
                            self.name_of(from).to_owned(),
                            self.name_of(to).to_owned(),
                        ));
                    }
                }
            }
        }
        Ok(cycle_breakers)
    }

    /// Condense the children into adjacency maps plus edge weights. An edge
    /// A→B exists iff any import runs from A's subtree to B's subtree; its
    /// weight is the number of distinct module-level import pairs.
    #[allow(clippy::type_complexity)]
    fn condense_children(
        &self,
        children: &[ModuleId],
    ) -> (
        FxIndexMap<ModuleId, FxIndexSet<ModuleId>>,
        FxIndexMap<ModuleId, FxIndexSet<ModuleId>>,
        FxHashMap<(ModuleId, ModuleId), usize>,
    ) {
        let mut imports: FxIndexMap<ModuleId, FxIndexSet<ModuleId>> = FxIndexMap::default();
        let mut reverse_imports: FxIndexMap<ModuleId, FxIndexSet<ModuleId>> =
            FxIndexMap::default();
        let mut weights = FxHashMap::default();

        for child in children {
            imports.insert(*child, FxIndexSet::default());
            reverse_imports.insert(*child, FxIndexSet::default());
        }
        for child_a in children {
            for child_b in children.iter().filter(|child| *child != child_a) {
                let import_count = self.direct_imports_between(*child_a, *child_b).len();
                if import_count > 0 {
                    imports[child_a].insert(*child_b);
                    reverse_imports[child_b].insert(*child_a);
                    weights.insert((*child_a, *child_b), import_count);
                }
            }
        }
        (imports, reverse_imports, weights)
    }
}

/// Remove a node from the working maps, along with its incident edges.
fn remove_node(
    module: ModuleId,
    imports: &mut FxIndexMap<ModuleId, FxIndexSet<ModuleId>>,
    reverse_imports: &mut FxIndexMap<ModuleId, FxIndexSet<ModuleId>>,
) {
    imports.shift_remove(&module);
    for importeds in imports.values_mut() {
        importeds.shift_remove(&module);
    }
    reverse_imports.shift_remove(&module);
    for importers in reverse_imports.values_mut() {
        importers.shift_remove(&module);
    }
}

#[allow(clippy::cast_possible_wrap)]
fn degree_difference(
    module: ModuleId,
    imports: &FxIndexMap<ModuleId, FxIndexSet<ModuleId>>,
    reverse_imports: &FxIndexMap<ModuleId, FxIndexSet<ModuleId>>,
    edge_weights: &FxHashMap<(ModuleId, ModuleId), usize>,
) -> isize {
    let outdegree: isize = imports[&module]
        .iter()
        .map(|imported| edge_weights[&(module, *imported)] as isize)
        .sum();
    let indegree: isize = reverse_imports[&module]
        .iter()
        .map(|importer| edge_weights[&(*importer, module)] as isize)
        .sum();
    outdegree - indegree
}
