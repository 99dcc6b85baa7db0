//! Record → row mapping. Column lists follow table declaration order and are
//! reused for upsert statements and CSV export.

use chrono::NaiveDate;
use rusqlite::types::Value;

use crate::{
    errors::LoaderError,
    model::{Entity, EntityKind, OwnerRef},
};

macro_rules! columns {
    ($pk:literal, owned, [$($col:literal),* $(,)?]) => {
        &[
            $pk,
            "entity_id",
            "entity_type",
            "institution_id",
            "subsidiary_id",
            $($col),*
        ]
    };
    ($pk:literal, [$($col:literal),* $(,)?]) => {
        &[$pk, $($col),*]
    };
}

pub fn columns(kind: EntityKind) -> &'static [&'static str] {
    match kind {
        EntityKind::Institution => columns!(
            "institution_id",
            [
                "legal_name",
                "business_type",
                "incorporation_country",
                "incorporation_date",
                "onboarding_date",
                "risk_rating",
                "operational_status",
                "primary_currency",
                "swift_code",
                "lei_code",
                "website",
                "annual_revenue",
                "employee_count",
                "public_company",
                "stock_symbol",
                "deleted_at",
            ]
        ),
        EntityKind::Subsidiary => columns!(
            "subsidiary_id",
            [
                "parent_institution_id",
                "legal_name",
                "tax_id",
                "incorporation_country",
                "incorporation_date",
                "acquisition_date",
                "business_type",
                "operational_status",
                "parent_ownership_percentage",
                "functional_currency",
                "is_regulated",
                "is_customer",
                "customer_id",
                "customer_onboarding_date",
                "customer_risk_rating",
                "customer_status",
                "deleted_at",
            ]
        ),
        EntityKind::Account => columns!(
            "account_id",
            owned,
            [
                "account_type",
                "account_number",
                "currency",
                "status",
                "opening_date",
                "balance",
                "risk_rating",
                "last_activity_date",
                "custodian_bank",
                "deleted_at",
            ]
        ),
        // Owner columns of a transaction sit after the account pair.
        EntityKind::Transaction => &[
            "transaction_id",
            "transaction_type",
            "transaction_date",
            "amount",
            "currency",
            "status",
            "debit_account_id",
            "credit_account_id",
            "entity_id",
            "entity_type",
            "institution_id",
            "subsidiary_id",
            "reference_number",
            "purpose",
            "screening_alert",
            "risk_score",
            "deleted_at",
        ],
        EntityKind::BeneficialOwner => columns!(
            "owner_id",
            owned,
            [
                "name",
                "nationality",
                "country_of_residence",
                "ownership_percentage",
                "dob",
                "verification_date",
                "pep_status",
                "sanctions_status",
                "notes",
                "deleted_at",
            ]
        ),
        EntityKind::AuthorizedPerson => columns!(
            "person_id",
            owned,
            [
                "name",
                "title",
                "nationality",
                "authorization_level",
                "authorization_start",
                "authorization_end",
                "is_active",
                "deleted_at",
            ]
        ),
        EntityKind::Document => columns!(
            "document_id",
            owned,
            [
                "document_type",
                "document_number",
                "issuing_authority",
                "issuing_country",
                "issue_date",
                "expiry_date",
                "verification_status",
                "deleted_at",
            ]
        ),
        EntityKind::Address => columns!(
            "address_id",
            owned,
            [
                "address_type",
                "address_line1",
                "address_line2",
                "city",
                "postal_code",
                "country",
                "effective_from",
                "effective_to",
                "primary_address",
                "deleted_at",
            ]
        ),
        EntityKind::JurisdictionPresence => columns!(
            "presence_id",
            owned,
            [
                "jurisdiction",
                "registration_date",
                "effective_from",
                "effective_to",
                "status",
                "local_registration_id",
                "deleted_at",
            ]
        ),
        EntityKind::RiskAssessment => columns!(
            "assessment_id",
            owned,
            [
                "assessment_date",
                "risk_rating",
                "risk_score",
                "assessment_type",
                "risk_factors",
                "assessor",
                "next_review_date",
                "deleted_at",
            ]
        ),
        EntityKind::ComplianceEvent => columns!(
            "event_id",
            owned,
            [
                "event_date",
                "event_type",
                "event_description",
                "old_state",
                "new_state",
                "decision",
                "decision_date",
                "related_account_id",
                "deleted_at",
            ]
        ),
    }
}

fn text(value: &str) -> Value {
    Value::Text(value.to_string())
}

fn opt_text(value: Option<&str>) -> Value {
    value.map(text).unwrap_or(Value::Null)
}

fn date(value: NaiveDate) -> Value {
    Value::Text(value.to_string())
}

fn opt_date(value: Option<NaiveDate>) -> Value {
    value.map(date).unwrap_or(Value::Null)
}

fn flag(value: bool) -> Value {
    Value::Integer(i64::from(value))
}

fn owner(entity: &OwnerRef) -> [Value; 4] {
    let (institution, subsidiary) = match entity {
        OwnerRef::Institution(id) => (text(id), Value::Null),
        OwnerRef::Subsidiary(id) => (Value::Null, text(id)),
    };
    [
        text(entity.id()),
        text(entity.entity_type()),
        institution,
        subsidiary,
    ]
}

/// Column values of `entity`, in [`columns`] order.
pub fn values(entity: &Entity) -> Result<Vec<Value>, LoaderError> {
    let row = match entity {
        Entity::Institution(r) => vec![
            text(&r.institution_id),
            text(&r.legal_name),
            text(r.business_type.as_str()),
            text(&r.incorporation_country),
            date(r.incorporation_date),
            date(r.onboarding_date),
            text(r.risk_rating.as_str()),
            text(r.operational_status.as_str()),
            opt_text(r.primary_currency.as_deref()),
            opt_text(r.swift_code.as_deref()),
            opt_text(r.lei_code.as_deref()),
            opt_text(r.website.as_deref()),
            r.annual_revenue.map(Value::Real).unwrap_or(Value::Null),
            r.employee_count.map(Value::Integer).unwrap_or(Value::Null),
            flag(r.public_company),
            opt_text(r.stock_symbol.as_deref()),
            opt_date(r.deleted_at),
        ],
        Entity::Subsidiary(r) => {
            let customer = r.customer.as_ref();
            vec![
                text(&r.subsidiary_id),
                text(&r.parent_institution_id),
                text(&r.legal_name),
                text(&r.tax_id),
                text(&r.incorporation_country),
                date(r.incorporation_date),
                date(r.acquisition_date),
                text(r.business_type.as_str()),
                text(r.operational_status.as_str()),
                Value::Real(r.parent_ownership_percentage),
                text(&r.functional_currency),
                flag(r.is_regulated),
                flag(r.is_customer()),
                opt_text(customer.map(|c| c.customer_id.as_str())),
                opt_date(customer.map(|c| c.onboarding_date)),
                opt_text(customer.map(|c| c.risk_rating.as_str())),
                opt_text(customer.map(|c| c.status.as_str())),
                opt_date(r.deleted_at),
            ]
        }
        Entity::Account(r) => {
            let mut row = vec![text(&r.account_id)];
            row.extend(owner(&r.entity));
            row.extend([
                text(&r.account_type),
                text(&r.account_number),
                text(&r.currency),
                text(&r.status),
                date(r.opening_date),
                Value::Real(r.balance),
                text(r.risk_rating.as_str()),
                opt_date(r.last_activity_date),
                opt_text(r.custodian_bank.as_deref()),
                opt_date(r.deleted_at),
            ]);
            row
        }
        Entity::Transaction(r) => {
            let mut row = vec![
                text(&r.transaction_id),
                text(r.transaction_type.as_str()),
                date(r.transaction_date),
                Value::Real(r.amount),
                text(&r.currency),
                text(r.status.as_str()),
                text(&r.debit_account_id),
                text(&r.credit_account_id),
            ];
            row.extend(owner(&r.entity));
            row.extend([
                opt_text(r.reference_number.as_deref()),
                opt_text(r.purpose.as_deref()),
                flag(r.screening_alert),
                r.risk_score.map(Value::Integer).unwrap_or(Value::Null),
                opt_date(r.deleted_at),
            ]);
            row
        }
        Entity::BeneficialOwner(r) => {
            let mut row = vec![text(&r.owner_id)];
            row.extend(owner(&r.entity));
            row.extend([
                text(&r.name),
                text(&r.nationality),
                text(&r.country_of_residence),
                Value::Real(r.ownership_percentage),
                date(r.dob),
                date(r.verification_date),
                flag(r.pep_status),
                flag(r.sanctions_status),
                opt_text(r.notes.as_deref()),
                opt_date(r.deleted_at),
            ]);
            row
        }
        Entity::AuthorizedPerson(r) => {
            let mut row = vec![text(&r.person_id)];
            row.extend(owner(&r.entity));
            row.extend([
                text(&r.name),
                text(&r.title),
                text(&r.nationality),
                text(&r.authorization_level),
                date(r.authorization_start),
                opt_date(r.authorization_end),
                flag(r.is_active),
                opt_date(r.deleted_at),
            ]);
            row
        }
        Entity::Document(r) => {
            let mut row = vec![text(&r.document_id)];
            row.extend(owner(&r.entity));
            row.extend([
                text(&r.document_type),
                text(&r.document_number),
                text(&r.issuing_authority),
                text(&r.issuing_country),
                date(r.issue_date),
                date(r.expiry_date),
                opt_text(r.verification_status.as_deref()),
                opt_date(r.deleted_at),
            ]);
            row
        }
        Entity::Address(r) => {
            let mut row = vec![text(&r.address_id)];
            row.extend(owner(&r.entity));
            row.extend([
                text(&r.address_type),
                text(&r.address_line1),
                opt_text(r.address_line2.as_deref()),
                text(&r.city),
                text(&r.postal_code),
                text(&r.country),
                date(r.effective_from),
                opt_date(r.effective_to),
                flag(r.primary_address),
                opt_date(r.deleted_at),
            ]);
            row
        }
        Entity::JurisdictionPresence(r) => {
            let mut row = vec![text(&r.presence_id)];
            row.extend(owner(&r.entity));
            row.extend([
                text(&r.jurisdiction),
                date(r.registration_date),
                date(r.effective_from),
                opt_date(r.effective_to),
                text(&r.status),
                text(&r.local_registration_id),
                opt_date(r.deleted_at),
            ]);
            row
        }
        Entity::RiskAssessment(r) => {
            let factors = serde_json::to_string(&r.risk_factors)
                .map_err(|e| LoaderError::store(format!("risk_factors: {e}")))?;
            let mut row = vec![text(&r.assessment_id)];
            row.extend(owner(&r.entity));
            row.extend([
                date(r.assessment_date),
                text(r.risk_rating.as_str()),
                Value::Real(r.risk_score),
                text(&r.assessment_type),
                Value::Text(factors),
                opt_text(r.assessor.as_deref()),
                opt_date(r.next_review_date),
                opt_date(r.deleted_at),
            ]);
            row
        }
        Entity::ComplianceEvent(r) => {
            let mut row = vec![text(&r.event_id)];
            row.extend(owner(&r.entity));
            row.extend([
                date(r.event_date),
                text(&r.event_type),
                text(&r.event_description),
                opt_text(r.old_state.as_deref()),
                text(&r.new_state),
                opt_text(r.decision.as_deref()),
                opt_date(r.decision_date),
                opt_text(r.related_account_id.as_deref()),
                opt_date(r.deleted_at),
            ]);
            row
        }
    };
    Ok(row)
}

/// Renders a stored value for CSV output; NULL becomes an empty field.
pub fn render(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Integer(n) => n.to_string(),
        Value::Real(f) => f.to_string(),
        Value::Text(s) => s.clone(),
        Value::Blob(b) => format!("<{} bytes>", b.len()),
    }
}
