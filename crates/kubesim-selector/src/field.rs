//! Field selectors over arbitrary nested object fields.
//!
//! A field path like `status.phase` or `spec.template.metadata.name` is
//! tokenized on non-word characters and walked left to right. A path that
//! does not resolve satisfies `!=` and fails `=`.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::error::{SelectorError, SelectorResult};
use crate::{Selector, scalar_string, split_terms};

static FIELD_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<key>[^!=\s]+)\s*(?P<operator>==|=|!=)\s*(?P<value>\S*)$").unwrap()
});

static PATH_TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\w+").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldOperator {
    Equals,
    NotEquals,
    /// Only built from structured `matchFields` expressions.
    In,
    NotIn,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRequirement {
    pub path: Vec<String>,
    pub operator: FieldOperator,
    pub values: Vec<String>,
}

impl FieldRequirement {
    pub fn new(path: &str, operator: FieldOperator, values: Vec<String>) -> Self {
        Self {
            path: tokenize(path),
            operator,
            values,
        }
    }

    pub fn parse(term: &str) -> Option<Self> {
        let caps = FIELD_PATTERN.captures(term)?;
        let operator = if &caps["operator"] == "!=" {
            FieldOperator::NotEquals
        } else {
            FieldOperator::Equals
        };
        Some(Self::new(&caps["key"], operator, vec![caps["value"].to_string()]))
    }

    /// Build from a `matchFields` expression (`In` / `NotIn`).
    pub fn from_expression(expr: &Value) -> SelectorResult<Self> {
        let key = expr
            .get("key")
            .and_then(Value::as_str)
            .ok_or_else(|| SelectorError::Syntax(expr.to_string()))?;
        let operator = match expr.get("operator").and_then(Value::as_str) {
            Some("In") => FieldOperator::In,
            Some("NotIn") => FieldOperator::NotIn,
            Some(other) => return Err(SelectorError::UnsupportedOperator(other.to_string())),
            None => return Err(SelectorError::Syntax(expr.to_string())),
        };
        let values = expr
            .get("values")
            .and_then(Value::as_array)
            .map(|vs| vs.iter().filter_map(scalar_string).collect())
            .unwrap_or_default();
        Ok(Self::new(key, operator, values))
    }

    /// Resolve the path against `obj`.
    fn lookup<'a>(&self, obj: &'a Value) -> Option<&'a Value> {
        self.path.iter().try_fold(obj, |current, token| match current {
            Value::Object(map) => map.get(token),
            Value::Array(items) => token.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
    }

    pub fn matches(&self, obj: &Value) -> bool {
        let found = self.lookup(obj).and_then(scalar_string);
        let hit = found.as_ref().is_some_and(|f| self.values.contains(f));
        match self.operator {
            FieldOperator::Equals | FieldOperator::In => hit,
            FieldOperator::NotEquals | FieldOperator::NotIn => !hit,
        }
    }
}

fn tokenize(path: &str) -> Vec<String> {
    PATH_TOKEN
        .find_iter(path)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// A conjunction of field requirements.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldSelector {
    requirements: Vec<FieldRequirement>,
}

impl FieldSelector {
    /// Parse a `fieldSelector` query string.
    pub fn parse(selector: &str) -> SelectorResult<Self> {
        let requirements = split_terms(selector)
            .into_iter()
            .map(|term| {
                FieldRequirement::parse(term).ok_or_else(|| SelectorError::Syntax(term.into()))
            })
            .collect::<SelectorResult<Vec<_>>>()?;
        Ok(Self { requirements })
    }

    pub fn push(&mut self, requirement: FieldRequirement) {
        self.requirements.push(requirement);
    }

    pub fn requirements(&self) -> &[FieldRequirement] {
        &self.requirements
    }

    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }
}

impl Selector for FieldSelector {
    fn matches(&self, obj: &Value) -> bool {
        self.requirements.iter().all(|r| r.matches(obj))
    }
}
