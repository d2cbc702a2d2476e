//! Deterministic cache key composition.
//!
//! A key is either a bare operation name (`courses`) or an operation name
//! followed by its canonically serialised arguments
//! (`lessons:{"course_id":5,"published_only":true}`). Operation names may not
//! contain the separator, so the split point is unambiguous and distinct
//! requests never map to the same key.

use serde::Serialize;
use serde_json::{Map, Value};
use shared::{Error, Result};
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub const SEPARATOR: char = ':';

    /// Key for an operation that takes no arguments.
    pub fn simple(operation: &str) -> Result<Self> {
        validate_operation(operation)?;
        Ok(Self(operation.to_string()))
    }

    /// Key for an operation and its argument set.
    ///
    /// Object fields are sorted recursively, so argument structs that differ
    /// only in field order produce the same key.
    pub fn compose<A>(operation: &str, args: &A) -> Result<Self>
    where
        A: Serialize + ?Sized,
    {
        validate_operation(operation)?;
        let value = serde_json::to_value(args)
            .map_err(|e| Error::InvalidKey(format!("unserializable arguments for '{operation}': {e}")))?;
        let encoded = serde_json::to_string(&canonicalize(value))
            .map_err(|e| Error::InvalidKey(e.to_string()))?;
        Ok(Self(format!("{operation}{}{encoded}", Self::SEPARATOR)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn operation(&self) -> &str {
        self.0
            .split_once(Self::SEPARATOR)
            .map_or(self.0.as_str(), |(operation, _)| operation)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn validate_operation(operation: &str) -> Result<()> {
    if operation.is_empty() {
        return Err(Error::InvalidKey("operation name is empty".to_string()));
    }
    if operation.contains(CacheKey::SEPARATOR) {
        return Err(Error::InvalidKey(format!(
            "operation name '{operation}' contains '{}'",
            CacheKey::SEPARATOR
        )));
    }
    Ok(())
}

fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut fields: Vec<(String, Value)> = map.into_iter().collect();
            fields.sort_by(|a, b| a.0.cmp(&b.0));
            let mut sorted = Map::new();
            for (name, field) in fields {
                sorted.insert(name, canonicalize(field));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Serialize)]
    struct Filter {
        course_id: i64,
        published_only: bool,
    }

    #[derive(Serialize)]
    struct ReorderedFilter {
        published_only: bool,
        course_id: i64,
    }

    #[test]
    fn test_simple_key_is_operation_name() {
        let key = CacheKey::simple("courses").unwrap();
        assert_eq!(key.as_str(), "courses");
        assert_eq!(key.operation(), "courses");
    }

    #[test]
    fn test_compose_is_stable_across_field_order() {
        let a = CacheKey::compose("lessons", &Filter { course_id: 5, published_only: true }).unwrap();
        let b = CacheKey::compose(
            "lessons",
            &ReorderedFilter { published_only: true, course_id: 5 },
        )
        .unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str(), r#"lessons:{"course_id":5,"published_only":true}"#);
        assert_eq!(a.operation(), "lessons");
    }

    #[test]
    fn test_compose_sorts_nested_objects() {
        let a = CacheKey::compose("search", &json!({"q": {"z": 1, "a": [ {"y": 2, "b": 3} ]}})).unwrap();
        assert_eq!(a.as_str(), r#"search:{"q":{"a":[{"b":3,"y":2}],"z":1}}"#);
    }

    #[test]
    fn test_different_arguments_never_collide() {
        let a = CacheKey::compose("lessons", &Filter { course_id: 5, published_only: true }).unwrap();
        let b = CacheKey::compose("lessons", &Filter { course_id: 5, published_only: false }).unwrap();
        let c = CacheKey::compose("lesson", &Filter { course_id: 5, published_only: true }).unwrap();
        assert_ne!(a, b);
        assert_ne!(a, c);
        // a bare name never contains the separator, composed keys always do
        assert_ne!(CacheKey::simple("courses").unwrap(), CacheKey::compose("courses", &()).unwrap());
    }

    #[test]
    fn test_string_arguments_are_quoted() {
        let a = CacheKey::compose("search", "1").unwrap();
        let b = CacheKey::compose("search", &1).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_rejects_invalid_operation_names() {
        assert!(matches!(CacheKey::simple(""), Err(Error::InvalidKey(_))));
        assert!(matches!(CacheKey::simple("a:b"), Err(Error::InvalidKey(_))));
        assert!(matches!(CacheKey::compose("a:b", &1), Err(Error::InvalidKey(_))));
    }
}
