use crate::model::{Entity, EntityKey, SERVER_LABEL};

/// Relation-type tag linking a tool to its parent server in the free-form
/// relation list.
pub const RELATION_CHILD_OF: &str = "childOf";

/// Relation-type tag linking a workload to a tool it consumes.
pub const RELATION_CONSUMES_TOOL: &str = "consumesTool";

/// A relationship reference pulled out of one of the candidate fields,
/// before any existence check.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedRef {
    /// Which field supplied the reference, e.g. `spec.server`.
    pub field: &'static str,
    pub raw: String,
}

fn parent_from_server(entity: &Entity) -> Vec<String> {
    entity.spec_str("server").map(String::from).into_iter().collect()
}

fn parent_from_mcp_server(entity: &Entity) -> Vec<String> {
    entity.spec_str("mcpServer").map(String::from).into_iter().collect()
}

fn parent_from_relations(entity: &Entity) -> Vec<String> {
    entity
        .relation_targets(RELATION_CHILD_OF)
        .first()
        .map(|t| t.to_string())
        .into_iter()
        .collect()
}

fn parent_from_parent_server(entity: &Entity) -> Vec<String> {
    entity.spec_str("parentServer").map(String::from).into_iter().collect()
}

fn parent_from_label(entity: &Entity) -> Vec<String> {
    entity
        .labels
        .get(SERVER_LABEL)
        .filter(|v| !v.trim().is_empty())
        .cloned()
        .into_iter()
        .collect()
}

fn deps_from_tools(entity: &Entity) -> Vec<String> {
    entity.spec_str_list("tools").into_iter().map(String::from).collect()
}

fn deps_from_consumes_tools(entity: &Entity) -> Vec<String> {
    entity
        .spec_str_list("consumesTools")
        .into_iter()
        .map(String::from)
        .collect()
}

fn deps_from_mcp_tools(entity: &Entity) -> Vec<String> {
    entity.spec_str_list("mcpTools").into_iter().map(String::from).collect()
}

fn deps_from_relations(entity: &Entity) -> Vec<String> {
    entity
        .relation_targets(RELATION_CONSUMES_TOOL)
        .into_iter()
        .map(String::from)
        .collect()
}

type Extractor = fn(&Entity) -> Vec<String>;

/// Candidate fields for the child → parent relationship (tool → server),
/// highest priority first. Exactly one is authoritative per entity: the
/// first one that yields a value.
const PARENT_FIELDS: &[(&str, Extractor)] = &[
    ("spec.server", parent_from_server),
    ("spec.mcpServer", parent_from_mcp_server),
    ("relations[childOf]", parent_from_relations),
    ("spec.parentServer", parent_from_parent_server),
    ("labels[mcp-catalog.io/server]", parent_from_label),
];

/// Candidate fields for the consumer → dependency relationship
/// (workload → tools), highest priority first.
const DEPENDENCY_FIELDS: &[(&str, Extractor)] = &[
    ("spec.tools", deps_from_tools),
    ("spec.consumesTools", deps_from_consumes_tools),
    ("spec.mcpTools", deps_from_mcp_tools),
    ("relations[consumesTool]", deps_from_relations),
];

fn first_populated(entity: &Entity, fields: &[(&'static str, Extractor)]) -> Vec<ExtractedRef> {
    for (field, extract) in fields {
        let values = extract(entity);
        if !values.is_empty() {
            return values
                .into_iter()
                .map(|raw| ExtractedRef { field, raw })
                .collect();
        }
    }
    Vec::new()
}

/// The authoritative parent reference of an entity, if any field is
/// populated. At most one reference; lower-priority fields are ignored
/// once a higher one yields a value.
pub fn parent_reference(entity: &Entity) -> Option<ExtractedRef> {
    first_populated(entity, PARENT_FIELDS).into_iter().next()
}

/// The authoritative dependency references of an entity; empty when no
/// candidate field is populated.
pub fn dependency_references(entity: &Entity) -> Vec<ExtractedRef> {
    first_populated(entity, DEPENDENCY_FIELDS)
}

/// Parses an extracted reference relative to the holder's namespace.
pub fn parse_target(entity: &Entity, reference: &ExtractedRef) -> Option<EntityKey> {
    EntityKey::parse(&reference.raw, &entity.namespace)
}

/// Forward resolver applied in reverse: does `entity`'s resolved parent
/// reference point at `target`? Dangling and malformed references never
/// match.
pub fn references_parent(entity: &Entity, target: &EntityKey) -> bool {
    parent_reference(entity)
        .and_then(|r| parse_target(entity, &r))
        .map(|key| key == *target)
        .unwrap_or(false)
}

/// Does `entity`'s resolved dependency list include `target`?
pub fn references_dependency(entity: &Entity, target: &EntityKey) -> bool {
    dependency_references(entity)
        .iter()
        .filter_map(|r| parse_target(entity, r))
        .any(|key| key == *target)
}
