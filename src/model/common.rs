use serde::{Deserialize, Serialize};
use std::fmt;

/// Structural discriminator shared by every catalog entity. The semantic
/// type (server/tool/workload) lives in the entity's `type` field.
pub const ENTITY_KIND: &str = "Resource";

/// Namespace assumed when an entity reference carries no explicit namespace.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Annotation marking an entity as soft-deleted ("true" when hidden).
pub const DELETED_ANNOTATION: &str = "mcp-catalog.io/deleted";

/// Annotation carrying the RFC 3339 timestamp of the soft delete.
pub const DELETED_AT_ANNOTATION: &str = "mcp-catalog.io/deleted-at";

/// User-facing boolean-as-string flag; passes through merge untouched.
pub const DISABLED_ANNOTATION: &str = "mcp-catalog.io/disabled";

/// Label used as the lowest-priority fallback for a tool's parent server.
pub const SERVER_LABEL: &str = "mcp-catalog.io/server";

/// Semantic role of a catalog entity. The wire `type` string for each class
/// is deployment-configurable through [`TypeRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityClass {
    Server,
    Tool,
    Workload,
}

impl EntityClass {
    pub const ALL: [EntityClass; 3] = [
        EntityClass::Server,
        EntityClass::Tool,
        EntityClass::Workload,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityClass::Server => "server",
            EntityClass::Tool => "tool",
            EntityClass::Workload => "workload",
        }
    }
}

impl fmt::Display for EntityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps each [`EntityClass`] to its configured `type` string and to the
/// plural URL segment used by the REST surface.
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    server: String,
    tool: String,
    workload: String,
}

impl TypeRegistry {
    pub fn new(server: String, tool: String, workload: String) -> Self {
        Self {
            server,
            tool,
            workload,
        }
    }

    /// The `type` string stored on entities of the given class.
    pub fn type_value(&self, class: EntityClass) -> &str {
        match class {
            EntityClass::Server => &self.server,
            EntityClass::Tool => &self.tool,
            EntityClass::Workload => &self.workload,
        }
    }

    /// Plural path segment for the given class, e.g. `servers`.
    pub fn segment(&self, class: EntityClass) -> String {
        format!("{}s", self.type_value(class))
    }

    pub fn class_for_type(&self, type_value: &str) -> Option<EntityClass> {
        EntityClass::ALL
            .into_iter()
            .find(|class| self.type_value(*class) == type_value)
    }

    /// Resolves a plural URL segment back to its class.
    pub fn class_for_segment(&self, segment: &str) -> Option<EntityClass> {
        EntityClass::ALL
            .into_iter()
            .find(|class| self.segment(*class) == segment)
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new(
            "server".to_string(),
            "tool".to_string(),
            "workload".to_string(),
        )
    }
}

/// Primary key of an entity within the merged view. The same key appearing
/// in both stores denotes the same logical entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityKey {
    pub namespace: String,
    pub name: String,
}

impl EntityKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Parses an entity reference: either `namespace/name` or a bare `name`
    /// that defaults to `default_namespace`.
    pub fn parse(raw: &str, default_namespace: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        let (namespace, name) = match raw.split_once('/') {
            Some((ns, name)) => (ns, name),
            None => (default_namespace, raw),
        };
        if !is_valid_identifier(namespace) || !is_valid_identifier(name) {
            return None;
        }
        Some(Self::new(namespace, name))
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Identifier rules shared by namespaces and names: non-empty, limited to
/// alphanumerics plus `.`, `_` and `-`.
pub fn is_valid_identifier(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}
