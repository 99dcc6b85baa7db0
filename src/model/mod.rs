//! Typed entity records and their declared references.
//!
//! Every record type is a plain struct with an explicit `validate()` contract;
//! [`Entity`] is the closed sum type the rest of the loader moves around.

mod graph;
mod records;
mod relationship;

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub use graph::EntityGraph;
pub use relationship::{Endpoint, RelationshipKind};
pub use records::{
    Account, Address, AuthorizedPerson, BeneficialOwner, BusinessType, ComplianceEvent,
    CustomerProfile, Document, HAS_NATIONALITY_SQL, Institution, JurisdictionPresence,
    OperationalStatus, RiskAssessment, RiskRating, Subsidiary, Transaction, TransactionStatus,
    TransactionType,
};

/// The fixed set of entity types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Institution,
    Subsidiary,
    Account,
    Transaction,
    BeneficialOwner,
    AuthorizedPerson,
    Document,
    Address,
    JurisdictionPresence,
    RiskAssessment,
    ComplianceEvent,
}

/// Batch-size category; transaction volumes dwarf everything else.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BatchCategory {
    Entities,
    Transactions,
}

const OWNERS: &[EntityKind] = &[EntityKind::Institution, EntityKind::Subsidiary];

impl EntityKind {
    /// Declaration order; also the tie-break order of the sequencer.
    pub const ALL: [EntityKind; 11] = [
        EntityKind::Institution,
        EntityKind::Subsidiary,
        EntityKind::Account,
        EntityKind::Transaction,
        EntityKind::BeneficialOwner,
        EntityKind::AuthorizedPerson,
        EntityKind::Document,
        EntityKind::Address,
        EntityKind::JurisdictionPresence,
        EntityKind::RiskAssessment,
        EntityKind::ComplianceEvent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Institution => "institution",
            EntityKind::Subsidiary => "subsidiary",
            EntityKind::Account => "account",
            EntityKind::Transaction => "transaction",
            EntityKind::BeneficialOwner => "beneficial_owner",
            EntityKind::AuthorizedPerson => "authorized_person",
            EntityKind::Document => "document",
            EntityKind::Address => "address",
            EntityKind::JurisdictionPresence => "jurisdiction_presence",
            EntityKind::RiskAssessment => "risk_assessment",
            EntityKind::ComplianceEvent => "compliance_event",
        }
    }

    /// Node label in the graph store.
    pub fn label(&self) -> &'static str {
        match self {
            EntityKind::Institution => "Institution",
            EntityKind::Subsidiary => "Subsidiary",
            EntityKind::Account => "Account",
            EntityKind::Transaction => "Transaction",
            EntityKind::BeneficialOwner => "BeneficialOwner",
            EntityKind::AuthorizedPerson => "AuthorizedPerson",
            EntityKind::Document => "Document",
            EntityKind::Address => "Address",
            EntityKind::JurisdictionPresence => "JurisdictionPresence",
            EntityKind::RiskAssessment => "RiskAssessment",
            EntityKind::ComplianceEvent => "ComplianceEvent",
        }
    }

    /// Table name in the relational store.
    pub fn table(&self) -> &'static str {
        match self {
            EntityKind::Institution => "institutions",
            EntityKind::Subsidiary => "subsidiaries",
            EntityKind::Account => "accounts",
            EntityKind::Transaction => "transactions",
            EntityKind::BeneficialOwner => "beneficial_owners",
            EntityKind::AuthorizedPerson => "authorized_persons",
            EntityKind::Document => "documents",
            EntityKind::Address => "addresses",
            EntityKind::JurisdictionPresence => "jurisdiction_presences",
            EntityKind::RiskAssessment => "risk_assessments",
            EntityKind::ComplianceEvent => "compliance_events",
        }
    }

    /// Primary key column of the type's table.
    pub fn primary_key(&self) -> &'static str {
        match self {
            EntityKind::Institution => "institution_id",
            EntityKind::Subsidiary => "subsidiary_id",
            EntityKind::Account => "account_id",
            EntityKind::Transaction => "transaction_id",
            EntityKind::BeneficialOwner => "owner_id",
            EntityKind::AuthorizedPerson => "person_id",
            EntityKind::Document => "document_id",
            EntityKind::Address => "address_id",
            EntityKind::JurisdictionPresence => "presence_id",
            EntityKind::RiskAssessment => "assessment_id",
            EntityKind::ComplianceEvent => "event_id",
        }
    }

    pub fn category(&self) -> BatchCategory {
        match self {
            EntityKind::Transaction => BatchCategory::Transactions,
            _ => BatchCategory::Entities,
        }
    }

    /// Types this type declares references to.
    pub fn references(&self) -> &'static [EntityKind] {
        match self {
            EntityKind::Institution => &[],
            EntityKind::Subsidiary => &[EntityKind::Institution],
            EntityKind::Account => OWNERS,
            EntityKind::Transaction => &[
                EntityKind::Account,
                EntityKind::Institution,
                EntityKind::Subsidiary,
            ],
            EntityKind::ComplianceEvent => &[
                EntityKind::Institution,
                EntityKind::Subsidiary,
                EntityKind::Account,
            ],
            EntityKind::BeneficialOwner
            | EntityKind::AuthorizedPerson
            | EntityKind::Document
            | EntityKind::Address
            | EntityKind::JurisdictionPresence
            | EntityKind::RiskAssessment => OWNERS,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntityKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s || kind.label() == s || kind.table() == s)
            .ok_or_else(|| format!("unknown entity type '{s}'"))
    }
}

/// Owning entity of a dependent record.
///
/// Serialised as the `entity_type` / `entity_id` pair.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "entity_type", content = "entity_id", rename_all = "snake_case")]
pub enum OwnerRef {
    Institution(String),
    Subsidiary(String),
}

impl OwnerRef {
    pub fn id(&self) -> &str {
        match self {
            OwnerRef::Institution(id) | OwnerRef::Subsidiary(id) => id,
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            OwnerRef::Institution(_) => EntityKind::Institution,
            OwnerRef::Subsidiary(_) => EntityKind::Subsidiary,
        }
    }

    pub fn entity_type(&self) -> &'static str {
        self.kind().as_str()
    }
}

/// A resolved-or-not pointer from one record to another.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reference<'a> {
    pub field: &'static str,
    pub kind: EntityKind,
    pub id: &'a str,
}

/// Reasons a record failed validation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Violations(Vec<String>);

impl Violations {
    pub fn check(&mut self, ok: bool, reason: impl Into<String>) {
        if !ok {
            self.0.push(reason.into());
        }
    }

    pub fn push(&mut self, reason: impl Into<String>) {
        self.0.push(reason.into());
    }

    pub fn extend(&mut self, other: Violations) {
        self.0.extend(other.0);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn reasons(&self) -> &[String] {
        &self.0
    }

    pub fn into_result(self) -> Result<(), Violations> {
        if self.0.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for Violations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("; "))
    }
}

/// Any record of the fixed schema.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Entity {
    Institution(Institution),
    Subsidiary(Subsidiary),
    Account(Account),
    Transaction(Transaction),
    BeneficialOwner(BeneficialOwner),
    AuthorizedPerson(AuthorizedPerson),
    Document(Document),
    Address(Address),
    JurisdictionPresence(JurisdictionPresence),
    RiskAssessment(RiskAssessment),
    ComplianceEvent(ComplianceEvent),
}

impl Entity {
    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::Institution(_) => EntityKind::Institution,
            Entity::Subsidiary(_) => EntityKind::Subsidiary,
            Entity::Account(_) => EntityKind::Account,
            Entity::Transaction(_) => EntityKind::Transaction,
            Entity::BeneficialOwner(_) => EntityKind::BeneficialOwner,
            Entity::AuthorizedPerson(_) => EntityKind::AuthorizedPerson,
            Entity::Document(_) => EntityKind::Document,
            Entity::Address(_) => EntityKind::Address,
            Entity::JurisdictionPresence(_) => EntityKind::JurisdictionPresence,
            Entity::RiskAssessment(_) => EntityKind::RiskAssessment,
            Entity::ComplianceEvent(_) => EntityKind::ComplianceEvent,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Entity::Institution(r) => &r.institution_id,
            Entity::Subsidiary(r) => &r.subsidiary_id,
            Entity::Account(r) => &r.account_id,
            Entity::Transaction(r) => &r.transaction_id,
            Entity::BeneficialOwner(r) => &r.owner_id,
            Entity::AuthorizedPerson(r) => &r.person_id,
            Entity::Document(r) => &r.document_id,
            Entity::Address(r) => &r.address_id,
            Entity::JurisdictionPresence(r) => &r.presence_id,
            Entity::RiskAssessment(r) => &r.assessment_id,
            Entity::ComplianceEvent(r) => &r.event_id,
        }
    }

    /// The owning institution or subsidiary, for owned record types.
    pub fn owner(&self) -> Option<&OwnerRef> {
        match self {
            Entity::Institution(_) | Entity::Subsidiary(_) => None,
            Entity::Account(r) => Some(&r.entity),
            Entity::Transaction(r) => Some(&r.entity),
            Entity::BeneficialOwner(r) => Some(&r.entity),
            Entity::AuthorizedPerson(r) => Some(&r.entity),
            Entity::Document(r) => Some(&r.entity),
            Entity::Address(r) => Some(&r.entity),
            Entity::JurisdictionPresence(r) => Some(&r.entity),
            Entity::RiskAssessment(r) => Some(&r.entity),
            Entity::ComplianceEvent(r) => Some(&r.entity),
        }
    }

    pub fn deleted_at(&self) -> Option<NaiveDate> {
        match self {
            Entity::Institution(r) => r.deleted_at,
            Entity::Subsidiary(r) => r.deleted_at,
            Entity::Account(r) => r.deleted_at,
            Entity::Transaction(r) => r.deleted_at,
            Entity::BeneficialOwner(r) => r.deleted_at,
            Entity::AuthorizedPerson(r) => r.deleted_at,
            Entity::Document(r) => r.deleted_at,
            Entity::Address(r) => r.deleted_at,
            Entity::JurisdictionPresence(r) => r.deleted_at,
            Entity::RiskAssessment(r) => r.deleted_at,
            Entity::ComplianceEvent(r) => r.deleted_at,
        }
    }

    /// Every foreign reference this record carries.
    pub fn references(&self) -> Vec<Reference<'_>> {
        let mut refs = Vec::new();
        if let Some(owner) = self.owner() {
            refs.push(Reference {
                field: "entity_id",
                kind: owner.kind(),
                id: owner.id(),
            });
        }
        match self {
            Entity::Subsidiary(r) => refs.push(Reference {
                field: "parent_institution_id",
                kind: EntityKind::Institution,
                id: &r.parent_institution_id,
            }),
            Entity::Transaction(r) => {
                refs.push(Reference {
                    field: "debit_account_id",
                    kind: EntityKind::Account,
                    id: &r.debit_account_id,
                });
                refs.push(Reference {
                    field: "credit_account_id",
                    kind: EntityKind::Account,
                    id: &r.credit_account_id,
                });
            }
            Entity::ComplianceEvent(r) => {
                if let Some(account) = r.related_account_id.as_deref() {
                    refs.push(Reference {
                        field: "related_account_id",
                        kind: EntityKind::Account,
                        id: account,
                    });
                }
            }
            _ => {}
        }
        refs
    }

    /// Intra-record invariants; cross-record checks live on [`EntityGraph`].
    pub fn validate(&self, today: NaiveDate) -> Result<(), Violations> {
        let mut violations = Violations::default();
        violations.check(!self.id().trim().is_empty(), "identifier must be set");
        let own = match self {
            Entity::Institution(r) => r.validate(today),
            Entity::Subsidiary(r) => r.validate(today),
            Entity::Account(r) => r.validate(today),
            Entity::Transaction(r) => r.validate(today),
            Entity::BeneficialOwner(r) => r.validate(today),
            Entity::AuthorizedPerson(r) => r.validate(today),
            Entity::Document(r) => r.validate(today),
            Entity::Address(r) => r.validate(today),
            Entity::JurisdictionPresence(r) => r.validate(today),
            Entity::RiskAssessment(r) => r.validate(today),
            Entity::ComplianceEvent(r) => r.validate(today),
        };
        if let Err(own) = own {
            violations.extend(own);
        }
        violations.into_result()
    }
}

macro_rules! entity_from {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for Entity {
                fn from(record: $variant) -> Self {
                    Entity::$variant(record)
                }
            }
        )*
    };
}

entity_from!(
    Institution,
    Subsidiary,
    Account,
    Transaction,
    BeneficialOwner,
    AuthorizedPerson,
    Document,
    Address,
    JurisdictionPresence,
    RiskAssessment,
    ComplianceEvent,
);
