//! kubesim-selector — selector parsing and evaluation.
//!
//! Selectors are comma-separated term lists combined with logical AND:
//!
//! | Form | Example |
//! |---|---|
//! | equality | `tier=frontend`, `tier!=frontend` |
//! | set membership | `env in (prod,staging)`, `env notin (dev)` |
//! | existence | `tier`, `!tier` |
//! | field path | `status.phase=Running`, `spec.nodeName!=node-1` |
//!
//! Label terms are tried in priority order equality → set → existence;
//! field terms only accept equality forms. Namespace filtering is implicit
//! for namespaced queries (see [`Query`]).

pub mod error;
pub mod field;
pub mod label;
pub mod query;

use serde_json::Value;

pub use error::{SelectorError, SelectorResult};
pub use field::{FieldOperator, FieldRequirement, FieldSelector};
pub use label::{LabelSelector, Operator, Requirement};
pub use query::{NamespaceSelector, Query};

/// A predicate over resource objects.
pub trait Selector {
    fn matches(&self, obj: &Value) -> bool;
}

/// Split a selector string on commas that are not inside parentheses.
pub(crate) fn split_terms(selector: &str) -> Vec<&str> {
    let mut terms = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in selector.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                terms.push(&selector[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    terms.push(&selector[start..]);
    terms
        .into_iter()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect()
}

/// String form of a scalar for comparison against selector values.
pub(crate) fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
