use anyhow::Result;
use serde_json::json;
use std::collections::HashMap;

use crate::model::{
    Entity, EntityRelation, OverlayRecord, DEFAULT_NAMESPACE, DISABLED_ANNOTATION, ENTITY_KIND,
};
use crate::store::traits::OverlayStore;

fn demo_entity(
    entity_type: &str,
    name: &str,
    description: &str,
    spec: serde_json::Map<String, serde_json::Value>,
) -> Entity {
    let mut annotations = HashMap::new();
    annotations.insert(DISABLED_ANNOTATION.to_string(), "false".to_string());
    Entity {
        kind: ENTITY_KIND.to_string(),
        entity_type: entity_type.to_string(),
        namespace: DEFAULT_NAMESPACE.to_string(),
        name: name.to_string(),
        description: Some(description.to_string()),
        annotations,
        labels: HashMap::new(),
        relations: Vec::new(),
        spec,
    }
}

fn spec(pairs: &[(&str, serde_json::Value)]) -> serde_json::Map<String, serde_json::Value> {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.clone()))
        .collect()
}

/// A small demo MCP catalog: two servers, their tools, and two workloads
/// consuming them. Written through the Overlay Store like any API create.
pub fn demo_catalog() -> Vec<Entity> {
    let mut entities = vec![
        demo_entity(
            "server",
            "github-mcp",
            "GitHub MCP server exposing repository operations",
            spec(&[
                ("transport", json!("streamable-http")),
                ("url", json!("https://github-mcp.internal/mcp")),
            ]),
        ),
        demo_entity(
            "server",
            "filesystem-mcp",
            "Filesystem MCP server scoped to shared volumes",
            spec(&[("transport", json!("stdio"))]),
        ),
        demo_entity(
            "tool",
            "create-issue",
            "Files a GitHub issue in a configured repository",
            spec(&[("server", json!("github-mcp"))]),
        ),
        demo_entity(
            "tool",
            "list-pull-requests",
            "Lists open pull requests",
            spec(&[("server", json!("github-mcp"))]),
        ),
        demo_entity(
            "tool",
            "read-file",
            "Reads a file from a shared volume",
            spec(&[("server", json!("filesystem-mcp"))]),
        ),
        demo_entity(
            "workload",
            "pr-triage-agent",
            "Agent workload that triages incoming pull requests",
            spec(&[(
                "tools",
                json!(["create-issue", "list-pull-requests"]),
            )]),
        ),
    ];

    // one relation-list consumer, to exercise the legacy resolution path
    let mut doc_sync = demo_entity(
        "workload",
        "doc-sync",
        "Synchronizes documentation from shared volumes",
        spec(&[]),
    );
    doc_sync.relations.push(EntityRelation {
        relation_type: "consumesTool".to_string(),
        target: "read-file".to_string(),
    });
    entities.push(doc_sync);

    entities
}

pub async fn load_seed_data<S: OverlayStore>(store: &S) -> Result<()> {
    for entity in demo_catalog() {
        store.upsert_record(OverlayRecord::active(entity)).await?;
    }
    Ok(())
}
