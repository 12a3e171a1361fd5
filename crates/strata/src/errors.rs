//! Error types for the strata crate.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StrataError {
    #[error("module {0} is not present in the graph")]
    ModuleNotPresent(String),

    #[error("module {0} is squashed")]
    ModuleIsSquashed(String),

    /// `add_module` was called for an existing module with the opposite
    /// squashed flag.
    #[error("cannot add module {0}: it is already present with a different squashed state")]
    SquashedStateConflict(String),

    #[error("module {module} is a descendant of squashed module {ancestor}")]
    DescendantOfSquashedModule { module: String, ancestor: String },

    #[error("modules have shared descendants")]
    ModulesHaveSharedDescendants,

    #[error("{0} is not a valid module expression")]
    InvalidModuleExpression(String),

    #[error("container {0} does not exist")]
    NoSuchContainer(String),

    #[error("could not find package {0} in any of the search directories")]
    PackageNotFound(String),

    #[error(
        "package {0} appears to be a namespace package with no source files; \
         adding an __init__.py file should fix the problem"
    )]
    NamespacePackageEncountered(String),

    #[error("syntax error in {}, line {line_number}: {text}", path.display())]
    SourceSyntaxError {
        path: PathBuf,
        line_number: usize,
        text: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type StrataResult<T> = Result<T, StrataError>;
