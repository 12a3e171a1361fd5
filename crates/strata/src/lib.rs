//! Strata builds a queryable import graph of one or more Python packages.
//!
//! Point [`build_graph`] at a package root and it discovers every module,
//! extracts the imports each one makes (via the ruff parser), and returns a
//! [`Graph`] supporting hierarchy, reachability, and shortest-chain queries,
//! plus enforcement of layered-architecture constraints with
//! [`Graph::find_illegal_dependencies_for_layers`].
//!
//! ```no_run
//! use strata::{BuildConfig, build_graph};
//!
//! let config = BuildConfig::new(["mypackage"]);
//! let graph = build_graph(&config)?;
//! assert!(graph.chain_exists("mypackage.api", "mypackage.db", false)?);
//! # Ok::<(), strata::StrataError>(())
//! ```

pub mod builder;
pub mod cache;
pub mod config;
pub mod discovery;
pub mod errors;
pub mod expressions;
pub mod graph;
pub mod interner;
pub mod parsing;
pub mod resolver;
pub mod scanning;

pub use builder::build_graph;
pub use config::BuildConfig;
pub use errors::{StrataError, StrataResult};
pub use graph::{Graph, ImportDetail, Layer, ModuleNameSet, PackageDependency, Route};
