use compliancegraph::{DependencySequencer, EntityKind, LoaderError};

fn position(seq: &DependencySequencer, kind: EntityKind) -> usize {
    seq.position(kind).expect("kind in order")
}

#[test]
fn test_institution_then_subsidiary_then_account() {
    let seq = DependencySequencer::for_schema().unwrap();
    assert!(position(&seq, EntityKind::Institution) < position(&seq, EntityKind::Subsidiary));
    assert!(position(&seq, EntityKind::Subsidiary) < position(&seq, EntityKind::Account));
    assert!(position(&seq, EntityKind::Account) < position(&seq, EntityKind::Transaction));
    assert!(position(&seq, EntityKind::Account) < position(&seq, EntityKind::ComplianceEvent));
}

#[test]
fn test_every_reference_precedes_its_referrer() {
    let seq = DependencySequencer::for_schema().unwrap();
    for kind in EntityKind::ALL {
        for referenced in kind.references() {
            if *referenced == kind {
                continue;
            }
            assert!(
                position(&seq, *referenced) < position(&seq, kind),
                "{referenced} must precede {kind}"
            );
        }
    }
}

#[test]
fn test_order_is_deterministic() {
    let a = DependencySequencer::for_schema().unwrap();
    let b = DependencySequencer::for_schema().unwrap();
    assert_eq!(a.write_order(), b.write_order());
}

#[test]
fn test_mutual_references_are_a_cycle() {
    let err = DependencySequencer::from_declarations(&[
        (EntityKind::Institution, vec![EntityKind::Account]),
        (EntityKind::Account, vec![EntityKind::Institution]),
    ])
    .unwrap_err();
    assert!(matches!(err, LoaderError::SchemaDependency(_)));
}

#[test]
fn test_ties_follow_declaration_order() {
    let seq = DependencySequencer::from_declarations(&[
        (EntityKind::Document, vec![EntityKind::Institution]),
        (EntityKind::Address, vec![EntityKind::Institution]),
        (EntityKind::Institution, vec![]),
    ])
    .unwrap();
    assert_eq!(
        seq.write_order(),
        &[EntityKind::Institution, EntityKind::Document, EntityKind::Address]
    );
}

#[test]
fn test_dependents_of_account_are_transitive() {
    let seq = DependencySequencer::for_schema().unwrap();
    let dependents = seq.dependents_of(EntityKind::Account);
    assert!(dependents.contains(&EntityKind::Transaction));
    assert!(dependents.contains(&EntityKind::ComplianceEvent));
    assert!(!dependents.contains(&EntityKind::Document));
    assert!(!dependents.contains(&EntityKind::Institution));
}
