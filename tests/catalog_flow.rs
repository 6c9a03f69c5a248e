//! Service-level flows over in-memory stores: merge precedence, soft and
//! hard deletion, cascade scope, and relationship resolution.

use serde_json::json;
use std::collections::HashMap;

use mcp_catalog::logic::{CatalogError, EntityFilter, Reconciler};
use mcp_catalog::model::{
    Entity, EntityClass, EntityKey, TypeRegistry, WarningReason, DELETED_ANNOTATION,
    DEFAULT_NAMESPACE, ENTITY_KIND,
};
use mcp_catalog::store::{CatalogStore, MemoryOverlayStore, MemoryReferenceStore};

type TestStore = CatalogStore<MemoryReferenceStore, MemoryOverlayStore>;

fn types() -> TypeRegistry {
    TypeRegistry::default()
}

fn entity(entity_type: &str, name: &str) -> Entity {
    Entity {
        kind: ENTITY_KIND.to_string(),
        entity_type: entity_type.to_string(),
        namespace: DEFAULT_NAMESPACE.to_string(),
        name: name.to_string(),
        description: None,
        annotations: HashMap::new(),
        labels: HashMap::new(),
        relations: Vec::new(),
        spec: serde_json::Map::new(),
    }
}

fn key(name: &str) -> EntityKey {
    EntityKey::new(DEFAULT_NAMESPACE, name)
}

fn store_with_references(references: Vec<Entity>) -> TestStore {
    let reference_store = MemoryReferenceStore::new();
    for reference in references {
        reference_store.insert(reference);
    }
    CatalogStore::new(reference_store, MemoryOverlayStore::new())
}

async fn create(store: &TestStore, class: EntityClass, body: Entity) {
    Reconciler::create(store, &types(), class, body).await.unwrap();
}

#[tokio::test]
async fn scenario_cascade_delete_of_server_hides_its_tool() {
    let store = store_with_references(Vec::new());
    create(&store, EntityClass::Server, entity("server", "s1")).await;

    let mut t1 = entity("tool", "t1");
    t1.spec.insert("server".to_string(), json!("s1"));
    create(&store, EntityClass::Tool, t1).await;

    let resolved = Reconciler::get(&store, &types(), EntityClass::Tool, &key("t1"))
        .await
        .unwrap();
    assert_eq!(resolved.parent, Some(key("s1")));

    Reconciler::delete(&store, &types(), EntityClass::Server, &key("s1"))
        .await
        .unwrap();

    assert!(matches!(
        Reconciler::get(&store, &types(), EntityClass::Tool, &key("t1")).await,
        Err(CatalogError::NotFound(_))
    ));
}

#[tokio::test]
async fn scenario_merge_unions_annotations_from_both_stores() {
    let mut reference = entity("workload", "w1");
    reference
        .annotations
        .insert("owner".to_string(), "teamA".to_string());
    let store = store_with_references(vec![reference]);

    let mut override_body = entity("workload", "w1");
    override_body
        .annotations
        .insert("disabled".to_string(), "true".to_string());
    Reconciler::update(&store, &types(), EntityClass::Workload, &key("w1"), override_body)
        .await
        .unwrap();

    let resolved = Reconciler::get(&store, &types(), EntityClass::Workload, &key("w1"))
        .await
        .unwrap();
    assert_eq!(resolved.entity.annotations["owner"], "teamA");
    assert_eq!(resolved.entity.annotations["disabled"], "true");
}

#[tokio::test]
async fn scenario_second_create_conflicts() {
    let store = store_with_references(Vec::new());
    create(&store, EntityClass::Tool, entity("tool", "t2")).await;

    let err = Reconciler::create(&store, &types(), EntityClass::Tool, entity("tool", "t2"))
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::Conflict(_)));
}

#[tokio::test]
async fn scenario_soft_delete_and_undelete_round_trip() {
    let mut reference = entity("workload", "w2");
    reference
        .annotations
        .insert("owner".to_string(), "teamB".to_string());
    let store = store_with_references(vec![reference]);

    Reconciler::delete(&store, &types(), EntityClass::Workload, &key("w2"))
        .await
        .unwrap();

    // invisible to normal reads and listings
    assert!(matches!(
        Reconciler::get(&store, &types(), EntityClass::Workload, &key("w2")).await,
        Err(CatalogError::NotFound(_))
    ));
    let listed = Reconciler::list(&store, &types(), EntityClass::Workload, &EntityFilter::default())
        .await
        .unwrap();
    assert!(listed.is_empty());

    // visible to the admin surface
    let tombstones = Reconciler::list_soft_deleted(&store, &types(), EntityClass::Workload)
        .await
        .unwrap();
    assert_eq!(tombstones.len(), 1);
    assert_eq!(tombstones[0].name, "w2");

    // undelete restores the pre-delete data
    Reconciler::undelete(&store, &types(), EntityClass::Workload, &key("w2"))
        .await
        .unwrap();
    let resolved = Reconciler::get(&store, &types(), EntityClass::Workload, &key("w2"))
        .await
        .unwrap();
    assert_eq!(resolved.entity.annotations["owner"], "teamB");
    assert!(!resolved.entity.annotations.contains_key(DELETED_ANNOTATION));
}

#[tokio::test]
async fn scenario_overlay_only_delete_leaves_no_trace() {
    let store = store_with_references(Vec::new());
    create(&store, EntityClass::Workload, entity("workload", "w3")).await;

    Reconciler::delete(&store, &types(), EntityClass::Workload, &key("w3"))
        .await
        .unwrap();

    assert!(matches!(
        Reconciler::get(&store, &types(), EntityClass::Workload, &key("w3")).await,
        Err(CatalogError::NotFound(_))
    ));
    let tombstones = Reconciler::list_soft_deleted(&store, &types(), EntityClass::Workload)
        .await
        .unwrap();
    assert!(tombstones.is_empty());
}

#[tokio::test]
async fn identity_fields_survive_a_malformed_overlay() {
    let reference = entity("server", "s-ident");
    let store = store_with_references(vec![reference]);

    // a full-body update cannot change identity; it is rejected outright
    let err = Reconciler::update(
        &store,
        &types(),
        EntityClass::Server,
        &key("s-ident"),
        entity("server", "other-name"),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, CatalogError::InvalidArgument(_)));

    let resolved = Reconciler::get(&store, &types(), EntityClass::Server, &key("s-ident"))
        .await
        .unwrap();
    assert_eq!(resolved.entity.name, "s-ident");
    assert_eq!(resolved.entity.kind, ENTITY_KIND);
}

#[tokio::test]
async fn soft_delete_suppresses_reingested_reference_data() {
    let reference_store = std::sync::Arc::new(MemoryReferenceStore::new());
    reference_store.insert(entity("server", "persistent"));
    let store = CatalogStore::new(std::sync::Arc::clone(&reference_store), MemoryOverlayStore::new());

    Reconciler::delete(&store, &types(), EntityClass::Server, &key("persistent"))
        .await
        .unwrap();

    // simulate a re-ingestion cycle re-supplying the record
    let mut refreshed = entity("server", "persistent");
    refreshed
        .annotations
        .insert("sync-cycle".to_string(), "2".to_string());
    reference_store.insert(refreshed);

    // the overlay tombstone keeps winning regardless
    let listed = Reconciler::list(&store, &types(), EntityClass::Server, &EntityFilter::default())
        .await
        .unwrap();
    assert!(listed.is_empty());
    assert!(matches!(
        Reconciler::get(&store, &types(), EntityClass::Server, &key("persistent")).await,
        Err(CatalogError::NotFound(_))
    ));
}

#[tokio::test]
async fn cascade_skips_other_servers_tools_and_leaves_workloads_with_warnings() {
    let store = store_with_references(Vec::new());
    create(&store, EntityClass::Server, entity("server", "s1")).await;
    create(&store, EntityClass::Server, entity("server", "s2")).await;

    let mut t1 = entity("tool", "t1");
    t1.spec.insert("server".to_string(), json!("s1"));
    create(&store, EntityClass::Tool, t1).await;
    let mut t2 = entity("tool", "t2");
    t2.spec.insert("server".to_string(), json!("s2"));
    create(&store, EntityClass::Tool, t2).await;

    let mut workload = entity("workload", "agent");
    workload.spec.insert("tools".to_string(), json!(["t1", "t2"]));
    create(&store, EntityClass::Workload, workload).await;

    Reconciler::delete(&store, &types(), EntityClass::Server, &key("s1"))
        .await
        .unwrap();

    // t1 went with s1; t2 is untouched
    assert!(matches!(
        Reconciler::get(&store, &types(), EntityClass::Tool, &key("t1")).await,
        Err(CatalogError::NotFound(_))
    ));
    assert!(Reconciler::get(&store, &types(), EntityClass::Tool, &key("t2"))
        .await
        .is_ok());

    // the workload survives with a broken reference surfaced as a warning
    let resolved = Reconciler::get(&store, &types(), EntityClass::Workload, &key("agent"))
        .await
        .unwrap();
    assert_eq!(resolved.depends_on, vec![key("t2")]);
    assert_eq!(resolved.warnings.len(), 1);
    assert_eq!(resolved.warnings[0].reference, "t1");
    assert_eq!(resolved.warnings[0].reason, WarningReason::BrokenReference);
}

#[tokio::test]
async fn resolver_prefers_canonical_field_over_fallbacks() {
    let store = store_with_references(Vec::new());
    create(&store, EntityClass::Server, entity("server", "canonical")).await;
    create(&store, EntityClass::Server, entity("server", "fallback")).await;

    let mut tool = entity("tool", "t-priority");
    tool.spec.insert("server".to_string(), json!("canonical"));
    tool.labels
        .insert("mcp-catalog.io/server".to_string(), "fallback".to_string());
    create(&store, EntityClass::Tool, tool).await;

    let resolved = Reconciler::get(&store, &types(), EntityClass::Tool, &key("t-priority"))
        .await
        .unwrap();
    assert_eq!(resolved.parent, Some(key("canonical")));
}

#[tokio::test]
async fn list_filters_by_text_and_parent() {
    let store = store_with_references(Vec::new());
    create(&store, EntityClass::Server, entity("server", "github-mcp")).await;

    let mut issue_tool = entity("tool", "create-issue");
    issue_tool.description = Some("Files GitHub issues".to_string());
    issue_tool.spec.insert("server".to_string(), json!("github-mcp"));
    create(&store, EntityClass::Tool, issue_tool).await;

    let mut other_tool = entity("tool", "read-file");
    other_tool.spec.insert("server".to_string(), json!("other"));
    create(&store, EntityClass::Tool, other_tool).await;

    let by_text = Reconciler::list(
        &store,
        &types(),
        EntityClass::Tool,
        &EntityFilter {
            text: Some("issue".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(by_text.len(), 1);
    assert_eq!(by_text[0].entity.name, "create-issue");

    let by_parent = Reconciler::list(
        &store,
        &types(),
        EntityClass::Tool,
        &EntityFilter {
            parent: Some(key("github-mcp")),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(by_parent.len(), 1);
    assert_eq!(by_parent[0].entity.name, "create-issue");
}

#[tokio::test]
async fn update_after_soft_delete_is_not_found() {
    let store = store_with_references(vec![entity("tool", "t-gone")]);
    Reconciler::delete(&store, &types(), EntityClass::Tool, &key("t-gone"))
        .await
        .unwrap();

    let err = Reconciler::update(
        &store,
        &types(),
        EntityClass::Tool,
        &key("t-gone"),
        entity("tool", "t-gone"),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, CatalogError::NotFound(_)));
}

#[tokio::test]
async fn admin_hard_delete_purges_tombstone_and_reference_resurfaces() {
    let store = store_with_references(vec![entity("server", "declared")]);

    Reconciler::delete(&store, &types(), EntityClass::Server, &key("declared"))
        .await
        .unwrap();
    assert_eq!(
        Reconciler::list_soft_deleted(&store, &types(), EntityClass::Server)
            .await
            .unwrap()
            .len(),
        1
    );

    Reconciler::hard_delete(&store, &types(), EntityClass::Server, &key("declared"))
        .await
        .unwrap();

    // tombstone gone; the declarative source still supplies the entity
    assert!(Reconciler::list_soft_deleted(&store, &types(), EntityClass::Server)
        .await
        .unwrap()
        .is_empty());
    assert!(
        Reconciler::get(&store, &types(), EntityClass::Server, &key("declared"))
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn seed_catalog_loads_and_resolves() {
    let store = store_with_references(Vec::new());
    mcp_catalog::seed::load_seed_data(&store).await.unwrap();

    let servers = Reconciler::list(&store, &types(), EntityClass::Server, &EntityFilter::default())
        .await
        .unwrap();
    assert_eq!(servers.len(), 2);

    let resolved = Reconciler::get(
        &store,
        &types(),
        EntityClass::Workload,
        &key("pr-triage-agent"),
    )
    .await
    .unwrap();
    assert_eq!(resolved.depends_on.len(), 2);
    assert!(resolved.warnings.is_empty());

    // the relation-list consumer resolves through the legacy path
    let doc_sync = Reconciler::get(&store, &types(), EntityClass::Workload, &key("doc-sync"))
        .await
        .unwrap();
    assert_eq!(doc_sync.depends_on, vec![key("read-file")]);
}
