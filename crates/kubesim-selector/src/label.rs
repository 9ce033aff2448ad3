//! Label selectors.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::error::{SelectorError, SelectorResult};
use crate::{Selector, scalar_string, split_terms};

static EQUALITY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<key>[^!=\s]+)\s*(?P<operator>==|=|!=)\s*(?P<value>\S*)$").unwrap()
});

static SET_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<key>[^\s(),!]+)\s+(?P<operator>in|notin)\s+\((?P<values>[^)]*)\)$").unwrap()
});

static EXISTENCE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?P<negated>!?)\s*(?P<key>[^\s(),!=]+)$").unwrap());

/// Label requirement operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Equals,
    NotEquals,
    In,
    NotIn,
    Exists,
    DoesNotExist,
}

impl Operator {
    /// Parse the operator names used by structured `matchExpressions`.
    pub fn from_expression(op: &str) -> SelectorResult<Self> {
        match op {
            "In" => Ok(Self::In),
            "NotIn" => Ok(Self::NotIn),
            "Exists" => Ok(Self::Exists),
            "DoesNotExist" => Ok(Self::DoesNotExist),
            other => Err(SelectorError::UnsupportedOperator(other.to_string())),
        }
    }
}

/// A single label predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    pub key: String,
    pub operator: Operator,
    pub values: Vec<String>,
}

impl Requirement {
    pub fn new(key: impl Into<String>, operator: Operator, values: Vec<String>) -> Self {
        Self {
            key: key.into(),
            operator,
            values,
        }
    }

    pub fn equals(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(key, Operator::Equals, vec![value.into()])
    }

    /// Parse one textual term, trying equality, set and existence forms in order.
    pub fn parse(term: &str) -> Option<Self> {
        if let Some(caps) = EQUALITY_PATTERN.captures(term) {
            let operator = if &caps["operator"] == "!=" {
                Operator::NotEquals
            } else {
                Operator::Equals
            };
            return Some(Self::new(&caps["key"], operator, vec![caps["value"].to_string()]));
        }
        if let Some(caps) = SET_PATTERN.captures(term) {
            let operator = if &caps["operator"] == "notin" {
                Operator::NotIn
            } else {
                Operator::In
            };
            let values = caps["values"]
                .split(',')
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(String::from)
                .collect();
            return Some(Self::new(&caps["key"], operator, values));
        }
        if let Some(caps) = EXISTENCE_PATTERN.captures(term) {
            let operator = if caps["negated"].is_empty() {
                Operator::Exists
            } else {
                Operator::DoesNotExist
            };
            return Some(Self::new(&caps["key"], operator, Vec::new()));
        }
        None
    }

    /// Build from a `{key, operator, values}` expression document.
    pub fn from_expression(expr: &Value) -> SelectorResult<Self> {
        let key = expr
            .get("key")
            .and_then(Value::as_str)
            .ok_or_else(|| SelectorError::Syntax(expr.to_string()))?;
        let op = expr
            .get("operator")
            .and_then(Value::as_str)
            .ok_or_else(|| SelectorError::Syntax(expr.to_string()))?;
        let values = expr
            .get("values")
            .and_then(Value::as_array)
            .map(|vs| vs.iter().filter_map(scalar_string).collect())
            .unwrap_or_default();
        Ok(Self::new(key, Operator::from_expression(op)?, values))
    }

    pub fn matches_labels(&self, labels: Option<&Map<String, Value>>) -> bool {
        let value = labels
            .and_then(|l| l.get(&self.key))
            .and_then(scalar_string);
        match self.operator {
            Operator::Equals => value.as_deref() == self.values.first().map(String::as_str),
            Operator::NotEquals => value.as_deref() != self.values.first().map(String::as_str),
            Operator::In => value.is_some_and(|v| self.values.contains(&v)),
            Operator::NotIn => !value.is_some_and(|v| self.values.contains(&v)),
            Operator::Exists => labels.is_some_and(|l| l.contains_key(&self.key)),
            Operator::DoesNotExist => !labels.is_some_and(|l| l.contains_key(&self.key)),
        }
    }
}

/// A conjunction of label requirements. The empty selector matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSelector {
    requirements: Vec<Requirement>,
}

impl LabelSelector {
    pub fn everything() -> Self {
        Self::default()
    }

    /// Parse a `labelSelector` query string.
    pub fn parse(selector: &str) -> SelectorResult<Self> {
        let requirements = split_terms(selector)
            .into_iter()
            .map(|term| Requirement::parse(term).ok_or_else(|| SelectorError::Syntax(term.into())))
            .collect::<SelectorResult<Vec<_>>>()?;
        Ok(Self { requirements })
    }

    /// Equality requirements from a plain `{key: value}` map.
    pub fn from_map(map: &Map<String, Value>) -> Self {
        let requirements = map
            .iter()
            .filter_map(|(k, v)| scalar_string(v).map(|v| Requirement::equals(k, v)))
            .collect();
        Self { requirements }
    }

    /// Build from a `{matchLabels, matchExpressions}` document.
    pub fn from_match_spec(spec: &Value) -> SelectorResult<Self> {
        let mut selector = spec
            .get("matchLabels")
            .and_then(Value::as_object)
            .map(Self::from_map)
            .unwrap_or_default();
        if let Some(exprs) = spec.get("matchExpressions").and_then(Value::as_array) {
            for expr in exprs {
                selector.push(Requirement::from_expression(expr)?);
            }
        }
        Ok(selector)
    }

    pub fn push(&mut self, requirement: Requirement) {
        self.requirements.push(requirement);
    }

    pub fn requirements(&self) -> &[Requirement] {
        &self.requirements
    }

    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }

    pub fn matches_labels(&self, labels: Option<&Map<String, Value>>) -> bool {
        self.requirements.iter().all(|r| r.matches_labels(labels))
    }
}

impl Selector for LabelSelector {
    fn matches(&self, obj: &Value) -> bool {
        let labels = obj.pointer("/metadata/labels").and_then(Value::as_object);
        self.matches_labels(labels)
    }
}
