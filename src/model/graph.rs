use std::collections::BTreeMap;

use ahash::AHashMap;
use chrono::NaiveDate;

use crate::errors::LoaderError;

use super::{Entity, EntityKind, Violations};

/// In-memory graph of one generation run: records grouped per type in
/// insertion order, plus an id index for reference resolution.
#[derive(Clone, Debug)]
pub struct EntityGraph {
    generated_on: NaiveDate,
    records: BTreeMap<EntityKind, Vec<Entity>>,
    index: AHashMap<String, (EntityKind, usize)>,
}

impl EntityGraph {
    pub fn new(generated_on: NaiveDate) -> Self {
        Self {
            generated_on,
            records: BTreeMap::new(),
            index: AHashMap::new(),
        }
    }

    pub fn generated_on(&self) -> NaiveDate {
        self.generated_on
    }

    /// Appends a record. Identifiers are unique across all types.
    pub fn insert(&mut self, entity: impl Into<Entity>) -> Result<(), LoaderError> {
        let entity = entity.into();
        let kind = entity.kind();
        if let Some((existing, _)) = self.index.get(entity.id()) {
            return Err(LoaderError::validation(format!(
                "duplicate identifier {} ({kind} collides with {existing})",
                entity.id()
            )));
        }
        let bucket = self.records.entry(kind).or_default();
        self.index
            .insert(entity.id().to_string(), (kind, bucket.len()));
        bucket.push(entity);
        Ok(())
    }

    pub fn records(&self, kind: EntityKind) -> &[Entity] {
        self.records.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn count(&self, kind: EntityKind) -> usize {
        self.records(kind).len()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn kind_of(&self, id: &str) -> Option<EntityKind> {
        self.index.get(id).map(|(kind, _)| *kind)
    }

    pub fn get(&self, id: &str) -> Option<&Entity> {
        let (kind, pos) = self.index.get(id)?;
        self.records.get(kind)?.get(*pos)
    }

    /// Cross-record checks: every reference resolves to a record of the
    /// declared type, and a transaction belongs to its debit account's owner.
    pub fn check_references(&self, entity: &Entity) -> Result<(), Violations> {
        let mut v = Violations::default();
        for reference in entity.references() {
            match self.kind_of(reference.id) {
                None => v.push(format!(
                    "{} {} does not exist",
                    reference.field, reference.id
                )),
                Some(actual) if actual != reference.kind => v.push(format!(
                    "{} {} is a {actual}, expected {}",
                    reference.field, reference.id, reference.kind
                )),
                Some(_) => {}
            }
        }
        if let Entity::Transaction(tx) = entity
            && let Some(Entity::Account(debit)) = self.get(&tx.debit_account_id)
            && debit.entity != tx.entity
        {
            v.push(format!(
                "transaction owner {} does not own debit account {}",
                tx.entity.id(),
                debit.account_id
            ));
        }
        v.into_result()
    }

    /// Full validation of one record against this graph.
    pub fn validate_entity(&self, entity: &Entity) -> Result<(), Violations> {
        let mut v = Violations::default();
        if let Err(own) = entity.validate(self.generated_on) {
            v.extend(own);
        }
        if let Err(refs) = self.check_references(entity) {
            v.extend(refs);
        }
        v.into_result()
    }

    pub fn kinds(&self) -> impl Iterator<Item = EntityKind> + '_ {
        self.records.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        Account, BusinessType, Institution, OperationalStatus, OwnerRef, RiskRating,
    };

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn institution(id: &str) -> Institution {
        Institution {
            institution_id: id.into(),
            legal_name: "Acme Bank".into(),
            business_type: BusinessType::Bank,
            incorporation_country: "US".into(),
            incorporation_date: date(2000, 1, 1),
            onboarding_date: date(2010, 1, 1),
            risk_rating: RiskRating::Low,
            operational_status: OperationalStatus::Active,
            primary_currency: None,
            swift_code: None,
            lei_code: None,
            website: None,
            annual_revenue: None,
            employee_count: None,
            public_company: false,
            stock_symbol: None,
            deleted_at: None,
        }
    }

    fn account(id: &str, owner: OwnerRef) -> Account {
        Account {
            account_id: id.into(),
            entity: owner,
            account_type: "checking".into(),
            account_number: "12345678".into(),
            currency: "USD".into(),
            status: "active".into(),
            opening_date: date(2015, 1, 1),
            balance: 10.0,
            risk_rating: RiskRating::Low,
            last_activity_date: None,
            custodian_bank: None,
            deleted_at: None,
        }
    }

    #[test]
    fn duplicate_identifiers_are_rejected() {
        let mut graph = EntityGraph::new(date(2024, 1, 1));
        graph.insert(institution("i-1")).unwrap();
        assert!(graph.insert(institution("i-1")).is_err());
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn owner_type_must_match_referenced_record() {
        let mut graph = EntityGraph::new(date(2024, 1, 1));
        graph.insert(institution("i-1")).unwrap();
        let wrong = account("a-1", OwnerRef::Subsidiary("i-1".into()));
        let err = graph.check_references(&wrong.into()).unwrap_err();
        assert!(err.to_string().contains("expected subsidiary"));
    }

    #[test]
    fn resolved_references_pass() {
        let mut graph = EntityGraph::new(date(2024, 1, 1));
        graph.insert(institution("i-1")).unwrap();
        let ok: Entity = account("a-1", OwnerRef::Institution("i-1".into())).into();
        assert!(graph.validate_entity(&ok).is_ok());
    }
}
