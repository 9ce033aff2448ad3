//! List queries: namespace + label + field selectors.

use serde_json::Value;

use crate::error::SelectorResult;
use crate::field::FieldSelector;
use crate::label::LabelSelector;
use crate::Selector;

/// Exact namespace match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceSelector(pub String);

impl Selector for NamespaceSelector {
    fn matches(&self, obj: &Value) -> bool {
        obj.pointer("/metadata/namespace").and_then(Value::as_str) == Some(self.0.as_str())
    }
}

/// Everything a list request filters on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    pub namespace: Option<NamespaceSelector>,
    pub labels: LabelSelector,
    pub fields: FieldSelector,
}

impl Query {
    /// Build a query from request parameters.
    ///
    /// `namespace` is only applied when the queried kind is namespaced.
    pub fn parse(
        namespace: Option<&str>,
        namespaced: bool,
        label_selector: Option<&str>,
        field_selector: Option<&str>,
    ) -> SelectorResult<Self> {
        let namespace = namespace
            .filter(|_| namespaced)
            .map(|ns| NamespaceSelector(ns.to_string()));
        Ok(Self {
            namespace,
            labels: LabelSelector::parse(label_selector.unwrap_or(""))?,
            fields: FieldSelector::parse(field_selector.unwrap_or(""))?,
        })
    }

    /// Keep the objects that pass every predicate, preserving order.
    pub fn filter(&self, objects: Vec<Value>) -> Vec<Value> {
        objects.into_iter().filter(|o| self.matches(o)).collect()
    }
}

impl Selector for Query {
    fn matches(&self, obj: &Value) -> bool {
        self.namespace.as_ref().is_none_or(|ns| ns.matches(obj))
            && self.labels.matches(obj)
            && self.fields.matches(obj)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn objects() -> Vec<Value> {
        vec![
            json!({"metadata": {"name": "a", "namespace": "default", "labels": {"tier": "frontend"}}}),
            json!({"metadata": {"name": "b", "namespace": "default", "labels": {"tier": "backend"}}}),
            json!({"metadata": {"name": "c", "namespace": "other", "labels": {"tier": "frontend"}}}),
        ]
    }

    fn names(objects: &[Value]) -> Vec<&str> {
        objects
            .iter()
            .map(|o| o["metadata"]["name"].as_str().unwrap())
            .collect()
    }

    #[test]
    fn namespace_applies_only_to_namespaced_kinds() {
        let q = Query::parse(Some("default"), true, None, None).unwrap();
        assert_eq!(names(&q.filter(objects())), vec!["a", "b"]);

        let q = Query::parse(Some("default"), false, None, None).unwrap();
        assert_eq!(names(&q.filter(objects())), vec!["a", "b", "c"]);
    }

    #[test]
    fn all_predicates_must_hold() {
        let q = Query::parse(
            Some("default"),
            true,
            Some("tier=frontend"),
            Some("metadata.name!=b"),
        )
        .unwrap();
        assert_eq!(names(&q.filter(objects())), vec!["a"]);
    }

    #[test]
    fn repeated_filtering_is_stable() {
        let q = Query::parse(None, true, Some("tier"), None).unwrap();
        assert_eq!(q.filter(objects()), q.filter(objects()));
    }

    #[test]
    fn bad_selector_fails_parse() {
        assert!(Query::parse(None, true, Some("a b"), None).is_err());
        assert!(Query::parse(None, true, None, Some("nope")).is_err());
    }
}
