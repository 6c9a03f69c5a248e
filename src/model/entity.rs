use crate::model::{EntityKey, DELETED_ANNOTATION};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

fn default_kind() -> String {
    crate::model::ENTITY_KIND.to_string()
}

/// A catalog entity: a named, namespaced, typed piece of MCP infrastructure
/// metadata. `(namespace, name)` is the primary key; `type` carries the
/// semantic role; `spec` is an open payload the core does not validate
/// beyond the identifying fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    #[serde(default = "default_kind")]
    pub kind: String,
    #[serde(rename = "type")]
    pub entity_type: String,
    pub namespace: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub annotations: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub labels: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub relations: Vec<EntityRelation>,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub spec: serde_json::Map<String, Value>,
}

/// Free-form relation entry; relationship resolution filters these by
/// `relation_type` when the structured fields are absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRelation {
    #[serde(rename = "type")]
    pub relation_type: String,
    pub target: String,
}

impl Entity {
    pub fn key(&self) -> EntityKey {
        EntityKey::new(self.namespace.clone(), self.name.clone())
    }

    /// True when the soft-delete marker annotation is present and "true".
    pub fn is_soft_deleted(&self) -> bool {
        self.annotations
            .get(DELETED_ANNOTATION)
            .map(|v| v == "true")
            .unwrap_or(false)
    }

    /// A `spec` field as a string, if present and non-empty.
    pub fn spec_str(&self, field: &str) -> Option<&str> {
        match self.spec.get(field) {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
            _ => None,
        }
    }

    /// A `spec` field as a list of strings. A bare string is accepted as a
    /// single-element list; empty or non-string entries are dropped.
    pub fn spec_str_list(&self, field: &str) -> Vec<&str> {
        match self.spec.get(field) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) if !s.trim().is_empty() => Some(s.as_str()),
                    _ => None,
                })
                .collect(),
            Some(Value::String(s)) if !s.trim().is_empty() => vec![s.as_str()],
            _ => Vec::new(),
        }
    }

    /// Relation targets carrying the given relation type tag.
    pub fn relation_targets(&self, relation_type: &str) -> Vec<&str> {
        self.relations
            .iter()
            .filter(|r| r.relation_type == relation_type && !r.target.trim().is_empty())
            .map(|r| r.target.as_str())
            .collect()
    }
}

/// Why a relationship reference could not be resolved. Broken references
/// are data, not faults; reads still succeed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningReason {
    /// The reference parses but no visible entity matches it.
    BrokenReference,
    /// The reference does not parse as `namespace/name` or `name`.
    InvalidReference,
}

/// Non-fatal note attached to a read when a relationship field could not be
/// resolved to a visible entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationWarning {
    /// The field the reference came from, e.g. `spec.server`.
    pub field: String,
    pub reference: String,
    pub reason: WarningReason,
}

/// A merged entity annotated with its resolved relationship references.
/// `parent` is populated for tools, `depends_on` for workloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedEntity {
    #[serde(flatten)]
    pub entity: Entity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<EntityKey>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<EntityKey>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<RelationWarning>,
}

impl ResolvedEntity {
    pub fn unresolved(entity: Entity) -> Self {
        Self {
            entity,
            parent: None,
            depends_on: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entity_with_spec(spec: serde_json::Map<String, Value>) -> Entity {
        Entity {
            kind: default_kind(),
            entity_type: "tool".to_string(),
            namespace: "default".to_string(),
            name: "create-issue".to_string(),
            description: None,
            annotations: HashMap::new(),
            labels: HashMap::new(),
            relations: Vec::new(),
            spec,
        }
    }

    #[test]
    fn spec_str_ignores_blank_and_non_string_values() {
        let mut spec = serde_json::Map::new();
        spec.insert("server".to_string(), json!("  "));
        spec.insert("timeout".to_string(), json!(30));
        let entity = entity_with_spec(spec);
        assert_eq!(entity.spec_str("server"), None);
        assert_eq!(entity.spec_str("timeout"), None);
        assert_eq!(entity.spec_str("missing"), None);
    }

    #[test]
    fn spec_str_list_accepts_bare_string() {
        let mut spec = serde_json::Map::new();
        spec.insert("tools".to_string(), json!("default/create-issue"));
        let entity = entity_with_spec(spec);
        assert_eq!(entity.spec_str_list("tools"), vec!["default/create-issue"]);
    }

    #[test]
    fn entity_deserializes_with_defaults() {
        let entity: Entity = serde_json::from_str(
            r#"{"type": "server", "namespace": "default", "name": "github-mcp"}"#,
        )
        .unwrap();
        assert_eq!(entity.kind, crate::model::ENTITY_KIND);
        assert!(entity.annotations.is_empty());
        assert!(entity.spec.is_empty());
        assert!(!entity.is_soft_deleted());
    }
}
