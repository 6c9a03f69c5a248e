use crate::logic::relationships;
use crate::model::{Entity, EntityKey};

/// Client-side list predicates. All filtering happens over the merged view;
/// at catalog scale (low hundreds of entities) a linear scan is enough.
#[derive(Debug, Clone, Default)]
pub struct EntityFilter {
    /// Case-insensitive substring match on name and description.
    pub text: Option<String>,
    /// Keep entities whose resolved parent reference is this key.
    pub parent: Option<EntityKey>,
    /// Keep entities whose resolved dependency list contains this key.
    pub depends_on: Option<EntityKey>,
}

impl EntityFilter {
    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.parent.is_none() && self.depends_on.is_none()
    }

    pub fn matches(&self, entity: &Entity) -> bool {
        if let Some(text) = &self.text {
            let needle = text.to_lowercase();
            let in_name = entity.name.to_lowercase().contains(&needle);
            let in_description = entity
                .description
                .as_ref()
                .map(|d| d.to_lowercase().contains(&needle))
                .unwrap_or(false);
            if !in_name && !in_description {
                return false;
            }
        }
        if let Some(parent) = &self.parent {
            if !relationships::references_parent(entity, parent) {
                return false;
            }
        }
        if let Some(dependency) = &self.depends_on {
            if !relationships::references_dependency(entity, dependency) {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ENTITY_KIND;
    use serde_json::json;
    use std::collections::HashMap;

    fn entity(name: &str, description: Option<&str>) -> Entity {
        Entity {
            kind: ENTITY_KIND.to_string(),
            entity_type: "tool".to_string(),
            namespace: "default".to_string(),
            name: name.to_string(),
            description: description.map(String::from),
            annotations: HashMap::new(),
            labels: HashMap::new(),
            relations: Vec::new(),
            spec: serde_json::Map::new(),
        }
    }

    #[test]
    fn text_filter_matches_name_or_description() {
        let filter = EntityFilter {
            text: Some("Issue".to_string()),
            ..Default::default()
        };
        assert!(filter.matches(&entity("create-issue", None)));
        assert!(filter.matches(&entity("gh-tool", Some("files GitHub issues"))));
        assert!(!filter.matches(&entity("list-prs", Some("lists pull requests"))));
    }

    #[test]
    fn parent_filter_uses_resolved_reference() {
        let mut tool = entity("create-issue", None);
        tool.spec.insert("server".to_string(), json!("github-mcp"));

        let filter = EntityFilter {
            parent: Some(EntityKey::new("default", "github-mcp")),
            ..Default::default()
        };
        assert!(filter.matches(&tool));

        let other = EntityFilter {
            parent: Some(EntityKey::new("default", "other-server")),
            ..Default::default()
        };
        assert!(!other.matches(&tool));
    }

    #[test]
    fn empty_filter_matches_everything() {
        assert!(EntityFilter::default().matches(&entity("anything", None)));
    }
}
