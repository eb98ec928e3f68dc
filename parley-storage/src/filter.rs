//! Query filters and update documents

use serde_json::Value as JsonValue;

/// One filter condition over a document field
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Field equals value
    Eq(String, JsonValue),
    /// Field differs from value
    Ne(String, JsonValue),
    /// Field is one of the values
    In(String, Vec<JsonValue>),
    /// String field contains the substring
    Contains(String, String),
}

impl Condition {
    pub fn field(&self) -> &str {
        match self {
            Condition::Eq(f, _)
            | Condition::Ne(f, _)
            | Condition::In(f, _)
            | Condition::Contains(f, _) => f,
        }
    }

    /// Whether a document satisfies this condition
    pub fn matches(&self, doc: &JsonValue) -> bool {
        let value = doc.get(self.field());
        match self {
            Condition::Eq(_, expected) => value == Some(expected),
            Condition::Ne(_, expected) => value != Some(expected),
            Condition::In(_, expected) => {
                value.is_some_and(|v| expected.iter().any(|e| e == v))
            }
            Condition::Contains(_, needle) => value
                .and_then(|v| v.as_str())
                .is_some_and(|s| s.contains(needle.as_str())),
        }
    }
}

/// Conjunction of conditions
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<Condition>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: &str, value: impl Into<JsonValue>) -> Self {
        self.conditions.push(Condition::Eq(field.to_string(), value.into()));
        self
    }

    pub fn ne(mut self, field: &str, value: impl Into<JsonValue>) -> Self {
        self.conditions.push(Condition::Ne(field.to_string(), value.into()));
        self
    }

    pub fn is_in(mut self, field: &str, values: Vec<JsonValue>) -> Self {
        self.conditions.push(Condition::In(field.to_string(), values));
        self
    }

    pub fn contains(mut self, field: &str, needle: &str) -> Self {
        self.conditions
            .push(Condition::Contains(field.to_string(), needle.to_string()));
        self
    }

    /// Prepend a condition (used by the gateway for the tenant intersect)
    pub fn prepend(&mut self, condition: Condition) {
        self.conditions.insert(0, condition);
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// The equality value for `field`, when the filter pins it with `Eq`
    pub fn eq_value(&self, field: &str) -> Option<&JsonValue> {
        self.conditions.iter().find_map(|c| match c {
            Condition::Eq(f, v) if f == field => Some(v),
            _ => None,
        })
    }

    /// Whether any condition references `field`
    pub fn references(&self, field: &str) -> bool {
        self.conditions.iter().any(|c| c.field() == field)
    }

    /// Whether a document satisfies every condition
    pub fn matches(&self, doc: &JsonValue) -> bool {
        self.conditions.iter().all(|c| c.matches(doc))
    }
}

/// An update document: fields to set and fields to unset
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    pub set: serde_json::Map<String, JsonValue>,
    pub unset: Vec<String>,
}

impl Update {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, field: &str, value: impl Into<JsonValue>) -> Self {
        self.set.insert(field.to_string(), value.into());
        self
    }

    pub fn unset(mut self, field: &str) -> Self {
        self.unset.push(field.to_string());
        self
    }

    /// Remove every reference to `field`; returns whether anything was
    /// removed
    pub fn strip_field(&mut self, field: &str) -> bool {
        let had_set = self.set.remove(field).is_some();
        let before = self.unset.len();
        self.unset.retain(|f| f != field);
        had_set || self.unset.len() != before
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.unset.is_empty()
    }

    /// Apply to a document in place
    pub fn apply(&self, doc: &mut JsonValue) {
        if let Some(obj) = doc.as_object_mut() {
            for (field, value) in &self.set {
                obj.insert(field.clone(), value.clone());
            }
            for field in &self.unset {
                obj.remove(field);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_filter_matching() {
        let doc = json!({"tenant_id": "t1", "status": "open", "subject": "printer on fire"});

        assert!(Filter::new().eq("tenant_id", "t1").matches(&doc));
        assert!(!Filter::new().eq("tenant_id", "t2").matches(&doc));
        assert!(Filter::new()
            .eq("tenant_id", "t1")
            .ne("status", "closed")
            .matches(&doc));
        assert!(Filter::new()
            .is_in("status", vec![json!("open"), json!("pending")])
            .matches(&doc));
        assert!(Filter::new().contains("subject", "printer").matches(&doc));
        assert!(!Filter::new().contains("subject", "toner").matches(&doc));
    }

    #[test]
    fn test_missing_field_semantics() {
        let doc = json!({"status": "open"});
        assert!(!Filter::new().eq("tenant_id", "t1").matches(&doc));
        // Ne matches documents lacking the field
        assert!(Filter::new().ne("tenant_id", "t1").matches(&doc));
    }

    #[test]
    fn test_eq_value_lookup() {
        let filter = Filter::new().eq("tenant_id", "t1").eq("status", "open");
        assert_eq!(filter.eq_value("tenant_id"), Some(&json!("t1")));
        assert_eq!(filter.eq_value("missing"), None);
        assert!(filter.references("status"));
    }

    #[test]
    fn test_update_apply_and_strip() {
        let mut update = Update::new()
            .set("name", "y")
            .set("tenant_id", "t2")
            .unset("tenant_id");

        assert!(update.strip_field("tenant_id"));
        assert!(!update.strip_field("tenant_id"));

        let mut doc = json!({"tenant_id": "t1", "name": "x"});
        update.apply(&mut doc);
        assert_eq!(doc["name"], "y");
        assert_eq!(doc["tenant_id"], "t1");
    }
}
