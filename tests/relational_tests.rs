mod common;

use compliancegraph::{
    Entity, EntityBatch, EntityKind, LoaderError, OwnerRef, RelationalStore, RelationshipKind,
    StoreCounts, UpsertPolicy,
    fault_injection::{Fault, FaultInjector, FaultPoint},
    relational::{RELATIONAL_SCHEMA, RELATIONAL_SCHEMA_VERSION, columns, render},
};

fn batch(kind: EntityKind, index: usize, records: Vec<Entity>) -> EntityBatch {
    EntityBatch {
        kind,
        index,
        records,
    }
}

fn seeded(policy: UpsertPolicy) -> RelationalStore {
    let store = RelationalStore::in_memory(policy).unwrap();
    store
        .write_batch(&batch(
            EntityKind::Institution,
            0,
            vec![common::institution("inst-1").into()],
        ))
        .unwrap();
    store
}

fn legal_name(store: &RelationalStore) -> String {
    let idx = columns(EntityKind::Institution)
        .iter()
        .position(|c| *c == "legal_name")
        .unwrap();
    let rows = store.read_rows(EntityKind::Institution).unwrap();
    render(&rows[0][idx])
}

#[test]
fn test_batch_commits_every_row() {
    let store = seeded(UpsertPolicy::Overwrite);
    let owner = OwnerRef::Institution("inst-1".into());
    let accounts: Vec<Entity> = (0..3)
        .map(|i| common::account(&format!("acct-{i}"), owner.clone()).into())
        .collect();
    let written = store
        .write_batch(&batch(EntityKind::Account, 0, accounts))
        .unwrap();
    assert_eq!(written, 3);
    assert_eq!(store.count_entities(EntityKind::Account).unwrap(), 3);
    assert_eq!(
        store
            .count_relationships(RelationshipKind::HasAccount)
            .unwrap(),
        3
    );
}

#[test]
fn test_constraint_violation_rolls_back_whole_batch() {
    let store = seeded(UpsertPolicy::Overwrite);
    let records: Vec<Entity> = vec![
        common::account("acct-ok", OwnerRef::Institution("inst-1".into())).into(),
        common::account("acct-orphan", OwnerRef::Institution("missing".into())).into(),
    ];
    let err = store
        .write_batch(&batch(EntityKind::Account, 0, records))
        .unwrap_err();
    assert!(matches!(err, LoaderError::Store(_)), "{err}");
    assert!(!err.is_transient());
    assert_eq!(store.count_entities(EntityKind::Account).unwrap(), 0);
}

#[test]
fn test_owner_must_match_its_discriminator() {
    let store = seeded(UpsertPolicy::Overwrite);
    // inst-1 exists, but only as an institution.
    let records: Vec<Entity> =
        vec![common::account("acct-1", OwnerRef::Subsidiary("inst-1".into())).into()];
    assert!(
        store
            .write_batch(&batch(EntityKind::Account, 0, records))
            .is_err()
    );
    assert_eq!(store.count_entities(EntityKind::Account).unwrap(), 0);
}

#[test]
fn test_fault_before_commit_leaves_no_rows() {
    let faults = FaultInjector::new();
    faults.configure(
        FaultPoint::RelationalBeforeCommit,
        EntityKind::Institution,
        0,
        1,
        Fault::Transient,
    );
    let store = RelationalStore::in_memory(UpsertPolicy::Overwrite)
        .unwrap()
        .with_faults(faults.clone());
    let records: Vec<Entity> = vec![
        common::institution("inst-1").into(),
        common::institution("inst-2").into(),
    ];
    let first = store.write_batch(&batch(EntityKind::Institution, 0, records.clone()));
    assert!(first.unwrap_err().is_transient());
    assert_eq!(store.count_entities(EntityKind::Institution).unwrap(), 0);

    store
        .write_batch(&batch(EntityKind::Institution, 0, records))
        .unwrap();
    assert_eq!(store.count_entities(EntityKind::Institution).unwrap(), 2);
    assert_eq!(
        faults.hits(FaultPoint::RelationalBeforeCommit, EntityKind::Institution, 0),
        2
    );
}

#[test]
fn test_skip_policy_keeps_existing_row() {
    let store = seeded(UpsertPolicy::Skip);
    let mut renamed = common::institution("inst-1");
    renamed.legal_name = "Renamed Bank".into();
    store
        .write_batch(&batch(EntityKind::Institution, 0, vec![renamed.into()]))
        .unwrap();
    assert_eq!(legal_name(&store), "inst-1 Capital");
    assert_eq!(store.count_entities(EntityKind::Institution).unwrap(), 1);
}

#[test]
fn test_overwrite_policy_replaces_existing_row() {
    let store = seeded(UpsertPolicy::Overwrite);
    let mut renamed = common::institution("inst-1");
    renamed.legal_name = "Renamed Bank".into();
    store
        .write_batch(&batch(EntityKind::Institution, 0, vec![renamed.into()]))
        .unwrap();
    assert_eq!(legal_name(&store), "Renamed Bank");
    assert_eq!(store.count_entities(EntityKind::Institution).unwrap(), 1);
}

#[test]
fn test_soft_deleted_rows_are_kept_but_not_counted_as_active() {
    let store = seeded(UpsertPolicy::Overwrite);
    let owner = OwnerRef::Institution("inst-1".into());
    let mut deleted = common::document("doc-2", owner.clone());
    deleted.deleted_at = Some(common::today());
    store
        .write_batch(&batch(
            EntityKind::Document,
            0,
            vec![common::document("doc-1", owner).into(), deleted.into()],
        ))
        .unwrap();
    assert_eq!(store.count_entities(EntityKind::Document).unwrap(), 2);
    assert_eq!(
        store
            .count_relationships(RelationshipKind::HasDocument)
            .unwrap(),
        1
    );
}

#[test]
fn test_wipe_removes_rows_in_dependency_order() {
    let store = seeded(UpsertPolicy::Overwrite);
    store
        .write_batch(&batch(
            EntityKind::Account,
            0,
            vec![common::account("acct-1", OwnerRef::Institution("inst-1".into())).into()],
        ))
        .unwrap();
    store.wipe().unwrap();
    for kind in EntityKind::ALL {
        assert_eq!(store.count_entities(kind).unwrap(), 0, "{kind}");
    }
}

#[test]
fn test_on_disk_store_records_schema_version() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("relational.db");
    {
        let store = RelationalStore::open(Some(&path), 2, UpsertPolicy::Overwrite).unwrap();
        store
            .write_batch(&batch(
                EntityKind::Institution,
                0,
                vec![common::institution("inst-1").into()],
            ))
            .unwrap();
    }
    let store = RelationalStore::open(Some(&path), 2, UpsertPolicy::Overwrite).unwrap();
    assert_eq!(store.count_entities(EntityKind::Institution).unwrap(), 1);
    let conn = store.pool().get().unwrap();
    assert_eq!(
        RELATIONAL_SCHEMA.read_version(&conn).unwrap(),
        Some(RELATIONAL_SCHEMA_VERSION)
    );
}
