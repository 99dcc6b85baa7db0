use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::EntityKind;

/// End of a relationship that holds the dependent record. Its soft-delete
/// state decides whether the relationship is active.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Endpoint {
    From,
    To,
}

/// Relationship categories present in both stores.
///
/// The relational side derives each category from foreign-key columns; the
/// graph side stores it as an edge type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationshipKind {
    OwnsSubsidiary,
    CustomerOf,
    HasAccount,
    Sent,
    Received,
    OwnedBy,
    HasAuthorizedPerson,
    HasDocument,
    HasAddress,
    HasPresence,
    HasRiskAssessment,
    HasComplianceEvent,
    RelatedTo,
    CitizenOf,
}

impl RelationshipKind {
    pub const ALL: [RelationshipKind; 14] = [
        RelationshipKind::OwnsSubsidiary,
        RelationshipKind::CustomerOf,
        RelationshipKind::HasAccount,
        RelationshipKind::Sent,
        RelationshipKind::Received,
        RelationshipKind::OwnedBy,
        RelationshipKind::HasAuthorizedPerson,
        RelationshipKind::HasDocument,
        RelationshipKind::HasAddress,
        RelationshipKind::HasPresence,
        RelationshipKind::HasRiskAssessment,
        RelationshipKind::HasComplianceEvent,
        RelationshipKind::RelatedTo,
        RelationshipKind::CitizenOf,
    ];

    /// Edge type in the graph store.
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipKind::OwnsSubsidiary => "OWNS_SUBSIDIARY",
            RelationshipKind::CustomerOf => "CUSTOMER_OF",
            RelationshipKind::HasAccount => "HAS_ACCOUNT",
            RelationshipKind::Sent => "SENT",
            RelationshipKind::Received => "RECEIVED",
            RelationshipKind::OwnedBy => "OWNED_BY",
            RelationshipKind::HasAuthorizedPerson => "HAS_AUTHORIZED_PERSON",
            RelationshipKind::HasDocument => "HAS_DOCUMENT",
            RelationshipKind::HasAddress => "HAS_ADDRESS",
            RelationshipKind::HasPresence => "HAS_PRESENCE",
            RelationshipKind::HasRiskAssessment => "HAS_RISK_ASSESSMENT",
            RelationshipKind::HasComplianceEvent => "HAS_COMPLIANCE_EVENT",
            RelationshipKind::RelatedTo => "RELATED_TO",
            RelationshipKind::CitizenOf => "CITIZEN_OF",
        }
    }

    /// Optional categories exist only for some records of their type.
    pub fn is_optional(&self) -> bool {
        matches!(self, RelationshipKind::CustomerOf | RelationshipKind::RelatedTo)
    }

    /// Entity type(s) on the dependent end.
    pub fn subject_kinds(&self) -> &'static [EntityKind] {
        match self {
            RelationshipKind::OwnsSubsidiary | RelationshipKind::CustomerOf => {
                &[EntityKind::Subsidiary]
            }
            RelationshipKind::HasAccount => &[EntityKind::Account],
            RelationshipKind::Sent | RelationshipKind::Received => &[EntityKind::Transaction],
            RelationshipKind::OwnedBy => &[EntityKind::BeneficialOwner],
            RelationshipKind::HasAuthorizedPerson => &[EntityKind::AuthorizedPerson],
            RelationshipKind::HasDocument => &[EntityKind::Document],
            RelationshipKind::HasAddress => &[EntityKind::Address],
            RelationshipKind::HasPresence => &[EntityKind::JurisdictionPresence],
            RelationshipKind::HasRiskAssessment => &[EntityKind::RiskAssessment],
            RelationshipKind::HasComplianceEvent | RelationshipKind::RelatedTo => {
                &[EntityKind::ComplianceEvent]
            }
            RelationshipKind::CitizenOf => {
                &[EntityKind::BeneficialOwner, EntityKind::AuthorizedPerson]
            }
        }
    }

    pub fn subject_end(&self) -> Endpoint {
        match self {
            RelationshipKind::CustomerOf
            | RelationshipKind::RelatedTo
            | RelationshipKind::CitizenOf => Endpoint::From,
            _ => Endpoint::To,
        }
    }

    /// Ownership edge from an institution or subsidiary to a record of
    /// `kind`, for owned types.
    pub fn ownership(kind: EntityKind) -> Option<RelationshipKind> {
        match kind {
            EntityKind::Account => Some(RelationshipKind::HasAccount),
            EntityKind::BeneficialOwner => Some(RelationshipKind::OwnedBy),
            EntityKind::AuthorizedPerson => Some(RelationshipKind::HasAuthorizedPerson),
            EntityKind::Document => Some(RelationshipKind::HasDocument),
            EntityKind::Address => Some(RelationshipKind::HasAddress),
            EntityKind::JurisdictionPresence => Some(RelationshipKind::HasPresence),
            EntityKind::RiskAssessment => Some(RelationshipKind::HasRiskAssessment),
            EntityKind::ComplianceEvent => Some(RelationshipKind::HasComplianceEvent),
            EntityKind::Institution | EntityKind::Subsidiary | EntityKind::Transaction => None,
        }
    }
}

impl fmt::Display for RelationshipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RelationshipKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RelationshipKind::ALL
            .iter()
            .copied()
            .find(|rel| rel.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown relationship type '{s}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_owned_type_has_an_ownership_edge() {
        for kind in EntityKind::ALL {
            let owned = kind.references().contains(&EntityKind::Subsidiary)
                && kind != EntityKind::Transaction;
            assert_eq!(RelationshipKind::ownership(kind).is_some(), owned, "{kind}");
        }
    }

    #[test]
    fn only_customer_and_related_edges_are_optional() {
        let optional: Vec<_> = RelationshipKind::ALL
            .iter()
            .filter(|rel| rel.is_optional())
            .collect();
        assert_eq!(
            optional,
            vec![&RelationshipKind::CustomerOf, &RelationshipKind::RelatedTo]
        );
    }
}
