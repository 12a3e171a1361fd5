//! Module expressions.
//!
//! An expression refers to a set of modules by name: `*` stands in for
//! exactly one dotted segment, `**` for one or more. A wildcard embedded in
//! a segment (`foo*`) is invalid.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use crate::errors::{StrataError, StrataResult};

static EXPRESSION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\w+|\*{1,2})(\.(\w+|\*{1,2}))*$").expect("static pattern"));

const SEGMENT_PATTERN: &str = r"[^\.]+";
const SEGMENTS_PATTERN: &str = r"[^\.]+(\.[^\.]+)*?";

/// A parsed, validated module expression.
#[derive(Debug, Clone)]
pub struct ModuleExpression {
    expression: String,
    pattern: Regex,
}

impl fmt::Display for ModuleExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.expression)
    }
}

impl FromStr for ModuleExpression {
    type Err = StrataError;

    fn from_str(expression: &str) -> Result<Self, Self::Err> {
        if !EXPRESSION_PATTERN.is_match(expression) {
            return Err(StrataError::InvalidModuleExpression(expression.to_owned()));
        }
        // Adjacent wildcard segments are ambiguous; reject them.
        let segments: Vec<&str> = expression.split('.').collect();
        for window in segments.windows(2) {
            if let [a, b] = window
                && matches!((*a, *b), ("*", "**") | ("**", "*") | ("**", "**"))
            {
                return Err(StrataError::InvalidModuleExpression(expression.to_owned()));
            }
        }

        Ok(Self {
            expression: expression.to_owned(),
            pattern: compile(&segments)?,
        })
    }
}

impl ModuleExpression {
    pub fn is_match(&self, module_name: &str) -> bool {
        self.pattern.is_match(module_name)
    }

    pub fn as_str(&self) -> &str {
        &self.expression
    }
}

fn compile(segments: &[&str]) -> StrataResult<Regex> {
    let mut parts = Vec::with_capacity(segments.len());
    for segment in segments {
        match *segment {
            "*" => parts.push(SEGMENT_PATTERN.to_owned()),
            "**" => parts.push(SEGMENTS_PATTERN.to_owned()),
            literal => parts.push(regex::escape(literal)),
        }
    }
    let pattern = format!(r"^{}$", parts.join(r"\."));
    Regex::new(&pattern)
        .map_err(|_| StrataError::InvalidModuleExpression(segments.join(".")))
}
