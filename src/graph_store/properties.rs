//! Record → node properties and outgoing/incoming edge specs.

use chrono::NaiveDate;
use serde_json::{Map, Value, json};

use crate::{
    errors::LoaderError,
    model::{Endpoint, Entity, EntityKind, OwnerRef, RelationshipKind},
};

pub const COUNTRY_LABEL: &str = "Country";
pub const BUSINESS_DATE_LABEL: &str = "BusinessDate";

pub const INCORPORATED_IN: &str = "INCORPORATED_IN";
pub const LOCATED_IN: &str = "LOCATED_IN";
pub const OCCURRED_ON: &str = "OCCURRED_ON";

/// One end of an edge.
#[derive(Clone, Debug, PartialEq)]
pub enum NodeRef<'a> {
    /// The record being written.
    This,
    /// Another entity; must already exist in the store.
    Entity { kind: EntityKind, id: &'a str },
    /// Reference node merged on demand.
    Country(&'a str),
    BusinessDate(NaiveDate),
}

#[derive(Clone, Debug, PartialEq)]
pub struct EdgeSpec<'a> {
    pub from: NodeRef<'a>,
    pub to: NodeRef<'a>,
    pub edge_type: &'static str,
    pub data: Value,
}

impl<'a> EdgeSpec<'a> {
    fn new(from: NodeRef<'a>, to: NodeRef<'a>, edge_type: &'static str, data: Value) -> Self {
        Self {
            from,
            to,
            edge_type,
            data,
        }
    }
}

fn owner_node(owner: &OwnerRef) -> NodeRef<'_> {
    NodeRef::Entity {
        kind: owner.kind(),
        id: owner.id(),
    }
}

fn ownership(owner: &OwnerRef, rel: RelationshipKind, data: Value) -> EdgeSpec<'_> {
    EdgeSpec::new(owner_node(owner), NodeRef::This, rel.as_str(), data)
}

/// Node property map of `entity`. Absent optional fields are left out rather
/// than stored as `null`.
pub fn node_properties(entity: &Entity) -> Result<Map<String, Value>, LoaderError> {
    let value = serde_json::to_value(entity)
        .map_err(|e| LoaderError::store(format!("{} {}: {e}", entity.kind(), entity.id())))?;
    let Value::Object(mut props) = value else {
        return Err(LoaderError::store(format!(
            "{} {} did not serialise to an object",
            entity.kind(),
            entity.id()
        )));
    };
    match entity {
        Entity::Subsidiary(r) => {
            props.remove("customer");
            props.insert("is_customer".into(), Value::Bool(r.is_customer()));
            if let Some(customer) = &r.customer {
                props.insert("customer_id".into(), json!(customer.customer_id));
                props.insert(
                    "customer_onboarding_date".into(),
                    json!(customer.onboarding_date),
                );
                props.insert("customer_risk_rating".into(), json!(customer.risk_rating));
                props.insert("customer_status".into(), json!(customer.status));
            }
        }
        Entity::RiskAssessment(r) => {
            let factors = serde_json::to_string(&r.risk_factors)
                .map_err(|e| LoaderError::store(format!("risk_factors: {e}")))?;
            props.insert("risk_factors".into(), Value::String(factors));
        }
        _ => {}
    }
    props.retain(|_, value| !value.is_null());
    Ok(props)
}

/// Edges implied by `entity`, including graph-only enrichment edges.
pub fn edges(entity: &Entity) -> Vec<EdgeSpec<'_>> {
    let mut out = Vec::new();
    match entity {
        Entity::Institution(r) => {
            out.push(EdgeSpec::new(
                NodeRef::This,
                NodeRef::Country(&r.incorporation_country),
                INCORPORATED_IN,
                json!({}),
            ));
        }
        Entity::Subsidiary(r) => {
            let parent = NodeRef::Entity {
                kind: EntityKind::Institution,
                id: &r.parent_institution_id,
            };
            out.push(EdgeSpec::new(
                parent.clone(),
                NodeRef::This,
                RelationshipKind::OwnsSubsidiary.as_str(),
                json!({
                    "ownership_percentage": r.parent_ownership_percentage,
                    "acquisition_date": r.acquisition_date,
                }),
            ));
            out.push(EdgeSpec::new(
                NodeRef::This,
                NodeRef::Country(&r.incorporation_country),
                INCORPORATED_IN,
                json!({}),
            ));
            if let Some(customer) = &r.customer {
                out.push(EdgeSpec::new(
                    NodeRef::This,
                    parent,
                    RelationshipKind::CustomerOf.as_str(),
                    json!({
                        "customer_id": customer.customer_id,
                        "onboarding_date": customer.onboarding_date,
                        "status": customer.status,
                    }),
                ));
            }
        }
        Entity::Account(r) => out.push(ownership(
            &r.entity,
            RelationshipKind::HasAccount,
            json!({ "opening_date": r.opening_date }),
        )),
        Entity::Transaction(r) => {
            let flow = json!({ "amount": r.amount, "currency": r.currency });
            out.push(EdgeSpec::new(
                NodeRef::Entity {
                    kind: EntityKind::Account,
                    id: &r.debit_account_id,
                },
                NodeRef::This,
                RelationshipKind::Sent.as_str(),
                flow.clone(),
            ));
            out.push(EdgeSpec::new(
                NodeRef::Entity {
                    kind: EntityKind::Account,
                    id: &r.credit_account_id,
                },
                NodeRef::This,
                RelationshipKind::Received.as_str(),
                flow,
            ));
            out.push(EdgeSpec::new(
                NodeRef::This,
                NodeRef::BusinessDate(r.transaction_date),
                OCCURRED_ON,
                json!({}),
            ));
        }
        Entity::BeneficialOwner(r) => {
            out.push(ownership(
                &r.entity,
                RelationshipKind::OwnedBy,
                json!({ "ownership_percentage": r.ownership_percentage }),
            ));
            if r.has_nationality() {
                out.push(EdgeSpec::new(
                    NodeRef::This,
                    NodeRef::Country(&r.nationality),
                    RelationshipKind::CitizenOf.as_str(),
                    json!({}),
                ));
            }
        }
        Entity::AuthorizedPerson(r) => {
            out.push(ownership(
                &r.entity,
                RelationshipKind::HasAuthorizedPerson,
                json!({
                    "authorization_level": r.authorization_level,
                    "is_active": r.is_active,
                }),
            ));
            if r.has_nationality() {
                out.push(EdgeSpec::new(
                    NodeRef::This,
                    NodeRef::Country(&r.nationality),
                    RelationshipKind::CitizenOf.as_str(),
                    json!({}),
                ));
            }
        }
        Entity::Document(r) => out.push(ownership(
            &r.entity,
            RelationshipKind::HasDocument,
            json!({
                "verification_status": r.verification_status.as_deref().unwrap_or("pending"),
            }),
        )),
        Entity::Address(r) => {
            out.push(ownership(
                &r.entity,
                RelationshipKind::HasAddress,
                json!({
                    "address_type": r.address_type,
                    "primary": r.primary_address,
                }),
            ));
            out.push(EdgeSpec::new(
                NodeRef::This,
                NodeRef::Country(&r.country),
                LOCATED_IN,
                json!({}),
            ));
        }
        Entity::JurisdictionPresence(r) => out.push(ownership(
            &r.entity,
            RelationshipKind::HasPresence,
            json!({ "status": r.status }),
        )),
        Entity::RiskAssessment(r) => out.push(ownership(
            &r.entity,
            RelationshipKind::HasRiskAssessment,
            json!({
                "risk_rating": r.risk_rating,
                "assessor": r.assessor.as_deref().unwrap_or("unassigned"),
            }),
        )),
        Entity::ComplianceEvent(r) => {
            out.push(ownership(
                &r.entity,
                RelationshipKind::HasComplianceEvent,
                json!({ "event_type": r.event_type }),
            ));
            if let Some(account) = r.related_account_id.as_deref() {
                out.push(EdgeSpec::new(
                    NodeRef::This,
                    NodeRef::Entity {
                        kind: EntityKind::Account,
                        id: account,
                    },
                    RelationshipKind::RelatedTo.as_str(),
                    json!({}),
                ));
            }
        }
    }
    out
}

/// Edge types a record of `kind` owns, each with the end the record sits on.
/// Overwriting a record replaces exactly these edges.
pub fn owned_edge_types(kind: EntityKind) -> Vec<(&'static str, Endpoint)> {
    let mut out: Vec<(&'static str, Endpoint)> = RelationshipKind::ALL
        .iter()
        .filter(|rel| rel.subject_kinds().contains(&kind))
        .map(|rel| (rel.as_str(), rel.subject_end()))
        .collect();
    match kind {
        EntityKind::Institution | EntityKind::Subsidiary => {
            out.push((INCORPORATED_IN, Endpoint::From))
        }
        EntityKind::Transaction => out.push((OCCURRED_ON, Endpoint::From)),
        EntityKind::Address => out.push((LOCATED_IN, Endpoint::From)),
        _ => {}
    }
    out
}
