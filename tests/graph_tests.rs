mod common;

use compliancegraph::{
    Entity, EntityBatch, EntityKind, GraphStore, LoaderError, OwnerRef, RelationshipKind,
    StoreCounts, UpsertPolicy,
    graph_store::{COUNTRY_LABEL, INCORPORATED_IN},
};

fn write(store: &GraphStore, kind: EntityKind, records: Vec<Entity>) -> Result<usize, LoaderError> {
    store.write_batch(&EntityBatch {
        kind,
        index: 0,
        records,
    })
}

fn load_scenario(store: &GraphStore) {
    let graph = common::scenario_graph();
    for kind in [EntityKind::Institution, EntityKind::Subsidiary, EntityKind::Account] {
        let records: Vec<Entity> = graph.records(kind).to_vec();
        write(store, kind, records).unwrap();
    }
}

#[test]
fn test_rerunning_a_load_is_idempotent() {
    let store = GraphStore::in_memory(UpsertPolicy::Overwrite).unwrap();
    load_scenario(&store);
    let first = store.integrity().unwrap();
    load_scenario(&store);
    let second = store.integrity().unwrap();

    assert_eq!(first.total_nodes, second.total_nodes);
    assert_eq!(first.total_edges, second.total_edges);
    assert_eq!(second.duplicate_edges, 0);
    assert_eq!(store.count_entities(EntityKind::Account).unwrap(), 6);
    assert_eq!(
        store
            .count_relationships(RelationshipKind::HasAccount)
            .unwrap(),
        6
    );
    assert_eq!(
        store
            .count_relationships(RelationshipKind::OwnsSubsidiary)
            .unwrap(),
        2
    );
}

#[test]
fn test_country_nodes_are_shared() {
    let store = GraphStore::in_memory(UpsertPolicy::Overwrite).unwrap();
    load_scenario(&store);
    // US for the institution, GB for both subsidiaries.
    assert_eq!(store.count_label(COUNTRY_LABEL).unwrap(), 2);
    assert_eq!(store.count_edge_type(INCORPORATED_IN).unwrap(), 3);
}

#[test]
fn test_absent_values_are_not_stored_as_properties() {
    let store = GraphStore::in_memory(UpsertPolicy::Overwrite).unwrap();
    write(
        &store,
        EntityKind::Institution,
        vec![common::institution("inst-1").into()],
    )
    .unwrap();

    let props = store.node("Institution", "inst-1").unwrap().unwrap();
    assert_eq!(props["legal_name"], "inst-1 Capital");
    assert!(!props.contains_key("swift_code"));
    assert!(!props.contains_key("deleted_at"));
    assert!(props.values().all(|v| !v.is_null()));
    assert_eq!(store.integrity().unwrap().null_properties, 0);
}

#[test]
fn test_missing_endpoint_is_a_dangling_reference() {
    let store = GraphStore::in_memory(UpsertPolicy::Overwrite).unwrap();
    let err = write(
        &store,
        EntityKind::Account,
        vec![common::account("acct-1", OwnerRef::Institution("ghost".into())).into()],
    )
    .unwrap_err();
    assert!(matches!(err, LoaderError::DanglingReference(_)), "{err}");
    assert_eq!(store.count_entities(EntityKind::Account).unwrap(), 0);
}

#[test]
fn test_transaction_edges_run_from_accounts() {
    let store = GraphStore::in_memory(UpsertPolicy::Overwrite).unwrap();
    load_scenario(&store);
    let owner = OwnerRef::Subsidiary("sub-1".into());
    write(
        &store,
        EntityKind::Transaction,
        vec![common::transaction("tx-1", "acct-1-1", "acct-2-1", owner).into()],
    )
    .unwrap();

    assert_eq!(
        store.edge_endpoints("SENT").unwrap(),
        vec![("acct-1-1".to_string(), "tx-1".to_string())]
    );
    assert_eq!(
        store.edge_endpoints("RECEIVED").unwrap(),
        vec![("acct-2-1".to_string(), "tx-1".to_string())]
    );
}

#[test]
fn test_skip_policy_keeps_first_properties() {
    let store = GraphStore::in_memory(UpsertPolicy::Skip).unwrap();
    write(
        &store,
        EntityKind::Institution,
        vec![common::institution("inst-1").into()],
    )
    .unwrap();
    let mut renamed = common::institution("inst-1");
    renamed.legal_name = "Renamed Bank".into();
    write(&store, EntityKind::Institution, vec![renamed.into()]).unwrap();

    let props = store.node("Institution", "inst-1").unwrap().unwrap();
    assert_eq!(props["legal_name"], "inst-1 Capital");
    assert_eq!(store.count_label("Institution").unwrap(), 1);
}

#[test]
fn test_wipe_empties_the_graph() {
    let store = GraphStore::in_memory(UpsertPolicy::Overwrite).unwrap();
    load_scenario(&store);
    store.wipe().unwrap();
    let report = store.integrity().unwrap();
    assert_eq!(report.total_nodes, 0);
    assert_eq!(report.total_edges, 0);
}
