//! Layered-architecture analysis.
//!
//! Given an ordered stack of layers (highest first), finds every package
//! pair where some chain of imports flows from a lower layer up to a higher
//! one, and describes the violation surface as a set of [`Route`]s. Closed
//! layers additionally constrain the legal direction: a chain from a higher
//! layer to a lower one must pass through every closed layer between them.

use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::errors::{StrataError, StrataResult};
use crate::graph::Graph;
use crate::graph::pathfinding::find_shortest_path;
use crate::interner::ModuleId;

/// One layer in the stack: a set of module name tails, whether sibling
/// tails must be independent of one another, and whether the layer is
/// closed (may not be bypassed by higher-to-lower chains).
#[derive(Debug, Clone)]
pub struct Layer {
    pub tails: Vec<String>,
    pub independent: bool,
    pub closed: bool,
}

impl Layer {
    pub fn new<I, S>(tails: I, independent: bool, closed: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tails: tails.into_iter().map(Into::into).collect(),
            independent,
            closed,
        }
    }
}

impl From<&str> for Layer {
    fn from(tail: &str) -> Self {
        Layer::new([tail], true, false)
    }
}

/// A family of chains sharing the same interior: they fan in from `heads`,
/// pass through `middle` (empty for direct imports), and fan out to `tails`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Route {
    pub heads: Vec<String>,
    pub middle: Vec<String>,
    pub tails: Vec<String>,
}

/// All discovered illegal routes for one ordered (importer, imported)
/// package pair.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct PackageDependency {
    pub importer: String,
    pub imported: String,
    pub routes: Vec<Route>,
}

struct IdRoute {
    heads: Vec<ModuleId>,
    middle: Vec<ModuleId>,
    tails: Vec<ModuleId>,
}

/// One effective layer after container resolution.
struct Level {
    modules: Vec<ModuleId>,
    independent: bool,
    closed: bool,
}

/// One (importer, imported) pair to search, with the modules its chains may
/// not pass through.
struct Check {
    importer: ModuleId,
    imported: ModuleId,
    excluded_modules: FxHashSet<ModuleId>,
}

impl Graph {
    /// Find dependencies that don't conform to the supplied layered
    /// architecture.
    ///
    /// Layers are ordered highest to lowest. With containers, each layer
    /// tail is resolved against every container prefix; layer modules
    /// missing from the graph are silently ignored, but a missing container
    /// fails with [`StrataError::NoSuchContainer`].
    ///
    /// Two kinds of violation are reported: chains from a lower layer up to
    /// a higher one (or between independent siblings), and chains from a
    /// higher layer to a lower one that bypass a closed layer in between.
    ///
    /// The set of reported (importer, imported) pairs is fully determined by
    /// the graph; the representative chains inside each dependency are not.
    pub fn find_illegal_dependencies_for_layers(
        &self,
        layers: &[Layer],
        containers: &[String],
    ) -> StrataResult<Vec<PackageDependency>> {
        for container in containers {
            if !self.contains_module(container) {
                return Err(StrataError::NoSuchContainer(container.clone()));
            }
        }

        // Resolve the layer stack once per container prefix.
        let prefixes: Vec<Option<&str>> = if containers.is_empty() {
            vec![None]
        } else {
            containers.iter().map(|c| Some(c.as_str())).collect()
        };

        let mut checks: Vec<Check> = Vec::new();
        for prefix in prefixes {
            let levels: Vec<Level> = layers
                .iter()
                .map(|layer| {
                    let modules = layer
                        .tails
                        .iter()
                        .map(|tail| match prefix {
                            Some(prefix) => format!("{prefix}.{tail}"),
                            None => tail.clone(),
                        })
                        .filter_map(|name| self.visible_id(&name))
                        .collect();
                    Level {
                        modules,
                        independent: layer.independent,
                        closed: layer.closed,
                    }
                })
                .collect();

            checks.extend(self.generate_uphill_checks(&levels));
            checks.extend(self.generate_closed_bypass_checks(&levels));
        }

        // Distinct pairs are independent; search them in parallel.
        let mut dependencies: Vec<PackageDependency> = checks
            .par_iter()
            .map(|check| {
                self.find_illegal_routes(check.importer, check.imported, &check.excluded_modules)
            })
            .collect::<StrataResult<Vec<Option<PackageDependency>>>>()?
            .into_iter()
            .flatten()
            .collect();
        dependencies.sort();
        Ok(dependencies)
    }

    /// Lower modules may not import higher ones, and independent siblings
    /// may not import each other. Chains through any other layer are that
    /// layer's own violation, so its modules are excluded here.
    fn generate_uphill_checks(&self, levels: &[Level]) -> Vec<Check> {
        let all_layer_modules: FxHashSet<ModuleId> = levels
            .iter()
            .flat_map(|level| level.modules.iter().copied())
            .flat_map(|module| self.with_descendant_ids(module))
            .collect();

        let mut pairs: Vec<(ModuleId, ModuleId)> = Vec::new();
        for (index, level) in levels.iter().enumerate() {
            for module in &level.modules {
                for lower_level in &levels[index + 1..] {
                    for lower_module in &lower_level.modules {
                        pairs.push((*lower_module, *module));
                    }
                }
                if level.independent {
                    for sibling in &level.modules {
                        if sibling != module {
                            pairs.push((*module, *sibling));
                        }
                    }
                }
            }
        }

        pairs
            .into_iter()
            .map(|(importer, imported)| {
                let mut excluded_modules = all_layer_modules.clone();
                for member in self
                    .with_descendant_ids(importer)
                    .iter()
                    .chain(self.with_descendant_ids(imported).iter())
                {
                    excluded_modules.remove(member);
                }
                Check {
                    importer,
                    imported,
                    excluded_modules,
                }
            })
            .collect()
    }

    /// Higher-to-lower chains must include every closed layer between the
    /// two. Excluding the closed layers' modules means any chain found has
    /// bypassed them all.
    fn generate_closed_bypass_checks(&self, levels: &[Level]) -> Vec<Check> {
        let mut checks = Vec::new();
        for (higher_index, higher_level) in levels.iter().enumerate() {
            for (lower_offset, lower_level) in levels[higher_index + 1..].iter().enumerate() {
                let lower_index = higher_index + 1 + lower_offset;
                let closed_between: FxHashSet<ModuleId> = levels
                    [higher_index + 1..lower_index]
                    .iter()
                    .filter(|level| level.closed)
                    .flat_map(|level| level.modules.iter().copied())
                    .flat_map(|module| self.with_descendant_ids(module))
                    .collect();
                if closed_between.is_empty() {
                    continue;
                }
                for higher_module in &higher_level.modules {
                    for lower_module in &lower_level.modules {
                        checks.push(Check {
                            importer: *higher_module,
                            imported: *lower_module,
                            excluded_modules: closed_between.clone(),
                        });
                    }
                }
            }
        }
        checks
    }

    /// Search one (importer, imported) pair, repeatedly finding a shortest
    /// chain and removing its edges from the search until none remain.
    fn find_illegal_routes(
        &self,
        importer: ModuleId,
        imported: ModuleId,
        excluded_modules: &FxHashSet<ModuleId>,
    ) -> StrataResult<Option<PackageDependency>> {
        let importer_members = self.with_descendant_ids(importer);
        let imported_members = self.with_descendant_ids(imported);

        let mut excluded_imports: FxHashMap<ModuleId, FxHashSet<ModuleId>> = FxHashMap::default();
        let mut direct_imports: Vec<(ModuleId, ModuleId)> = Vec::new();
        let mut middles: Vec<Vec<ModuleId>> = Vec::new();

        loop {
            let chain = find_shortest_path(
                self,
                &importer_members,
                &imported_members,
                excluded_modules,
                &excluded_imports,
            )?;
            let Some(chain) = chain else {
                break;
            };

            // Remove the discovered edges so the next iteration finds a
            // disjoint slice of the violation surface.
            for window in chain.windows(2) {
                excluded_imports
                    .entry(window[0])
                    .or_default()
                    .insert(window[1]);
            }

            if chain.len() == 2 {
                direct_imports.push((chain[0], chain[1]));
            } else {
                middles.push(chain[1..chain.len() - 1].to_vec());
            }
        }

        let mut routes: Vec<IdRoute> = direct_imports
            .into_iter()
            .map(|(head, tail)| IdRoute {
                heads: vec![head],
                middle: vec![],
                tails: vec![tail],
            })
            .collect();

        // For indirect chains, gather every member importing the first
        // middle module and every member imported by the last one.
        for middle in middles {
            let first = *middle.first().expect("middle is non-empty");
            let last = *middle.last().expect("middle is non-empty");
            let heads: Vec<ModuleId> = importer_members
                .iter()
                .filter(|member| self.imports_of(**member).contains(&first))
                .copied()
                .collect();
            let tails: Vec<ModuleId> = imported_members
                .iter()
                .filter(|member| self.imports_of(last).contains(*member))
                .copied()
                .collect();
            routes.push(IdRoute {
                heads,
                middle,
                tails,
            });
        }

        if routes.is_empty() {
            return Ok(None);
        }
        Ok(Some(PackageDependency {
            importer: self.name_of(importer).to_owned(),
            imported: self.name_of(imported).to_owned(),
            routes: routes.into_iter().map(|route| self.resolve_route(&route)).collect(),
        }))
    }

    fn resolve_route(&self, route: &IdRoute) -> Route {
        let mut heads: Vec<String> = route
            .heads
            .iter()
            .map(|id| self.name_of(*id).to_owned())
            .collect();
        heads.sort();
        let middle: Vec<String> = route
            .middle
            .iter()
            .map(|id| self.name_of(*id).to_owned())
            .collect();
        let mut tails: Vec<String> = route
            .tails
            .iter()
            .map(|id| self.name_of(*id).to_owned())
            .collect();
        tails.sort();
        Route {
            heads,
            middle,
            tails,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(|&v| v.to_owned()).collect()
    }

    /// A three-level stack where `low` reaches `high` both directly and via
    /// `utils`, and the mid layers import one another.
    fn layered_graph() -> Graph {
        let mut graph = Graph::new();
        for name in [
            "low", "low.blue", "low.green", "low.green.alpha", "mid_a", "mid_a.orange", "mid_b",
            "mid_b.brown", "mid_c", "mid_c.purple", "high", "high.yellow", "high.red",
            "high.red.beta", "utils",
        ] {
            graph.add_module(name, false).unwrap();
        }
        graph.add_import("low.blue", "utils");
        graph.add_import("low.green.alpha", "high.yellow");
        graph.add_import("mid_a", "mid_b");
        graph.add_import("mid_b", "mid_c");
        graph.add_import("high", "low.blue");
        graph.add_import("utils", "high.red");
        graph
    }

    #[test]
    fn finds_illegal_dependencies_without_containers() {
        let graph = layered_graph();
        let layers = [
            Layer::from("high"),
            Layer::new(["mid_a", "mid_b", "mid_c"], true, false),
            Layer::from("low"),
        ];

        let dependencies = graph
            .find_illegal_dependencies_for_layers(&layers, &[])
            .unwrap();

        assert_eq!(
            dependencies,
            vec![
                PackageDependency {
                    importer: "low".to_owned(),
                    imported: "high".to_owned(),
                    routes: vec![
                        Route {
                            heads: names(&["low.green.alpha"]),
                            middle: names(&[]),
                            tails: names(&["high.yellow"]),
                        },
                        Route {
                            heads: names(&["low.blue"]),
                            middle: names(&["utils"]),
                            tails: names(&["high.red"]),
                        },
                    ],
                },
                PackageDependency {
                    importer: "mid_a".to_owned(),
                    imported: "mid_b".to_owned(),
                    routes: vec![Route {
                        heads: names(&["mid_a"]),
                        middle: names(&[]),
                        tails: names(&["mid_b"]),
                    }],
                },
                PackageDependency {
                    importer: "mid_b".to_owned(),
                    imported: "mid_c".to_owned(),
                    routes: vec![Route {
                        heads: names(&["mid_b"]),
                        middle: names(&[]),
                        tails: names(&["mid_c"]),
                    }],
                },
            ]
        );
    }

    #[test]
    fn finds_illegal_dependencies_with_a_container() {
        let mut graph = Graph::new();
        for name in [
            "pkg",
            "pkg.low",
            "pkg.low.blue",
            "pkg.low.green",
            "pkg.low.green.alpha",
            "pkg.high",
            "pkg.high.yellow",
            "pkg.high.red",
            "pkg.utils",
        ] {
            graph.add_module(name, false).unwrap();
        }
        graph.add_import("pkg.low.blue", "pkg.utils");
        graph.add_import("pkg.low.green.alpha", "pkg.high.yellow");
        graph.add_import("pkg.high", "pkg.low.blue");
        graph.add_import("pkg.utils", "pkg.high.red");

        let layers = [Layer::from("high"), Layer::from("low")];
        let dependencies = graph
            .find_illegal_dependencies_for_layers(&layers, &["pkg".to_owned()])
            .unwrap();

        assert_eq!(
            dependencies,
            vec![PackageDependency {
                importer: "pkg.low".to_owned(),
                imported: "pkg.high".to_owned(),
                routes: vec![
                    Route {
                        heads: names(&["pkg.low.green.alpha"]),
                        middle: names(&[]),
                        tails: names(&["pkg.high.yellow"]),
                    },
                    Route {
                        heads: names(&["pkg.low.blue"]),
                        middle: names(&["pkg.utils"]),
                        tails: names(&["pkg.high.red"]),
                    },
                ],
            }]
        );
    }

    #[test]
    fn independent_siblings_are_checked_both_ways() {
        let mut graph = Graph::new();
        graph.add_module("a", false).unwrap();
        graph.add_module("b", false).unwrap();
        graph.add_import("b", "a");

        let layers = [Layer::new(["a", "b"], true, false)];
        let dependencies = graph
            .find_illegal_dependencies_for_layers(&layers, &[])
            .unwrap();

        assert_eq!(dependencies.len(), 1);
        assert_eq!(dependencies[0].importer, "b");
        assert_eq!(dependencies[0].imported, "a");
    }

    #[test]
    fn dependent_siblings_are_not_checked() {
        let mut graph = Graph::new();
        graph.add_module("a", false).unwrap();
        graph.add_module("b", false).unwrap();
        graph.add_import("b", "a");

        let layers = [Layer::new(["a", "b"], false, false)];
        let dependencies = graph
            .find_illegal_dependencies_for_layers(&layers, &[])
            .unwrap();
        assert!(dependencies.is_empty());
    }

    #[test]
    fn chains_through_other_layers_are_not_reported() {
        let mut graph = Graph::new();
        for name in ["high", "mid", "low"] {
            graph.add_module(name, false).unwrap();
        }
        // low reaches high only via mid; that is mid's violation, not low's.
        graph.add_import("low", "mid");
        graph.add_import("mid", "high");

        let layers = [Layer::from("high"), Layer::from("mid"), Layer::from("low")];
        let dependencies = graph
            .find_illegal_dependencies_for_layers(&layers, &[])
            .unwrap();

        let pairs: Vec<(&str, &str)> = dependencies
            .iter()
            .map(|d| (d.importer.as_str(), d.imported.as_str()))
            .collect();
        assert_eq!(pairs, vec![("low", "mid"), ("mid", "high")]);
    }

    #[test]
    fn missing_layer_modules_are_ignored() {
        let mut graph = Graph::new();
        graph.add_module("high", false).unwrap();
        let layers = [Layer::from("high"), Layer::from("nonexistent")];
        let dependencies = graph
            .find_illegal_dependencies_for_layers(&layers, &[])
            .unwrap();
        assert!(dependencies.is_empty());
    }

    #[test]
    fn missing_container_fails() {
        let graph = Graph::new();
        let layers = [Layer::from("high")];
        let result =
            graph.find_illegal_dependencies_for_layers(&layers, &["nowhere".to_owned()]);
        assert!(matches!(result, Err(StrataError::NoSuchContainer(_))));
    }

    #[test]
    fn discovered_route_edges_are_disjoint() {
        let mut graph = Graph::new();
        graph.add_module("high", false).unwrap();
        graph.add_module("low", false).unwrap();
        // Two equal-length chains sharing no edges.
        graph.add_import("low.a", "m1");
        graph.add_import("m1", "high.x");
        graph.add_import("low.b", "m2");
        graph.add_import("m2", "high.y");

        let layers = [Layer::from("high"), Layer::from("low")];
        let dependencies = graph
            .find_illegal_dependencies_for_layers(&layers, &[])
            .unwrap();

        assert_eq!(dependencies.len(), 1);
        let middles: FxHashSet<&[String]> = dependencies[0]
            .routes
            .iter()
            .map(|route| route.middle.as_slice())
            .collect();
        assert_eq!(middles.len(), 2);
    }

    fn closed_layer() -> Layer {
        Layer::new(["mid"], true, true)
    }

    #[test]
    fn bypassing_a_closed_layer_is_reported() {
        let mut graph = Graph::new();
        for name in ["high", "mid", "low"] {
            graph.add_module(name, false).unwrap();
        }
        graph.add_import("high.a", "low.b");

        let layers = [Layer::from("high"), closed_layer(), Layer::from("low")];
        let dependencies = graph
            .find_illegal_dependencies_for_layers(&layers, &[])
            .unwrap();

        assert_eq!(
            dependencies,
            vec![PackageDependency {
                importer: "high".to_owned(),
                imported: "low".to_owned(),
                routes: vec![Route {
                    heads: names(&["high.a"]),
                    middle: names(&[]),
                    tails: names(&["low.b"]),
                }],
            }]
        );
    }

    #[test]
    fn chains_through_the_closed_layer_comply() {
        let mut graph = Graph::new();
        for name in ["high", "mid", "low"] {
            graph.add_module(name, false).unwrap();
        }
        graph.add_import("high.a", "mid.x");
        graph.add_import("mid.x", "low.b");

        let layers = [Layer::from("high"), closed_layer(), Layer::from("low")];
        let dependencies = graph
            .find_illegal_dependencies_for_layers(&layers, &[])
            .unwrap();
        assert!(dependencies.is_empty());
    }

    #[test]
    fn indirect_bypass_of_a_closed_layer_is_reported() {
        let mut graph = Graph::new();
        for name in ["high", "mid", "low"] {
            graph.add_module(name, false).unwrap();
        }
        // The chain dodges mid via a module outside the layers.
        graph.add_import("high.a", "shared");
        graph.add_import("shared", "low.b");

        let layers = [Layer::from("high"), closed_layer(), Layer::from("low")];
        let dependencies = graph
            .find_illegal_dependencies_for_layers(&layers, &[])
            .unwrap();

        assert_eq!(dependencies.len(), 1);
        assert_eq!(dependencies[0].importer, "high");
        assert_eq!(dependencies[0].imported, "low");
        assert_eq!(dependencies[0].routes[0].middle, names(&["shared"]));
    }

    #[test]
    fn open_layers_may_be_bypassed() {
        let mut graph = Graph::new();
        for name in ["high", "mid", "low"] {
            graph.add_module(name, false).unwrap();
        }
        graph.add_import("high.a", "low.b");

        let layers = [Layer::from("high"), Layer::from("mid"), Layer::from("low")];
        let dependencies = graph
            .find_illegal_dependencies_for_layers(&layers, &[])
            .unwrap();
        assert!(dependencies.is_empty());
    }

    #[test]
    fn missing_closed_layers_do_not_constrain() {
        let mut graph = Graph::new();
        graph.add_module("high", false).unwrap();
        graph.add_module("low", false).unwrap();
        graph.add_import("high.a", "low.b");

        let layers = [Layer::from("high"), closed_layer(), Layer::from("low")];
        let dependencies = graph
            .find_illegal_dependencies_for_layers(&layers, &[])
            .unwrap();
        assert!(dependencies.is_empty());
    }

    #[test]
    fn closed_layer_bypass_within_a_container() {
        let mut graph = Graph::new();
        for name in ["pkg", "pkg.high", "pkg.mid", "pkg.low"] {
            graph.add_module(name, false).unwrap();
        }
        graph.add_import("pkg.high.a", "pkg.low.b");

        let layers = [Layer::from("high"), closed_layer(), Layer::from("low")];
        let dependencies = graph
            .find_illegal_dependencies_for_layers(&layers, &["pkg".to_owned()])
            .unwrap();

        assert_eq!(dependencies.len(), 1);
        assert_eq!(dependencies[0].importer, "pkg.high");
        assert_eq!(dependencies[0].imported, "pkg.low");
    }
}
