#![allow(dead_code)]

use std::collections::BTreeMap;

use chrono::NaiveDate;
use compliancegraph::model::{
    Account, BeneficialOwner, BusinessType, ComplianceEvent, Document, EntityGraph, Institution,
    OperationalStatus, OwnerRef, RiskAssessment, RiskRating, Subsidiary, Transaction,
    TransactionStatus, TransactionType,
};

pub fn today() -> NaiveDate {
    date(2024, 6, 30)
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub fn institution(id: &str) -> Institution {
    Institution {
        institution_id: id.into(),
        legal_name: format!("{id} Capital"),
        business_type: BusinessType::Bank,
        incorporation_country: "US".into(),
        incorporation_date: date(2001, 3, 1),
        onboarding_date: date(2015, 5, 20),
        risk_rating: RiskRating::Low,
        operational_status: OperationalStatus::Active,
        primary_currency: Some("USD".into()),
        swift_code: None,
        lei_code: None,
        website: None,
        annual_revenue: Some(1_000_000.0),
        employee_count: Some(120),
        public_company: false,
        stock_symbol: None,
        deleted_at: None,
    }
}

pub fn subsidiary(id: &str, parent: &str) -> Subsidiary {
    Subsidiary {
        subsidiary_id: id.into(),
        parent_institution_id: parent.into(),
        legal_name: format!("{id} Holdings"),
        tax_id: format!("TX-{id}"),
        incorporation_country: "GB".into(),
        incorporation_date: date(2008, 1, 10),
        acquisition_date: date(2012, 7, 1),
        business_type: BusinessType::AssetManager,
        operational_status: OperationalStatus::Active,
        parent_ownership_percentage: 75.0,
        functional_currency: "GBP".into(),
        is_regulated: true,
        customer: None,
        deleted_at: None,
    }
}

pub fn account(id: &str, owner: OwnerRef) -> Account {
    Account {
        account_id: id.into(),
        entity: owner,
        account_type: "checking".into(),
        account_number: format!("000{id}"),
        currency: "USD".into(),
        status: "active".into(),
        opening_date: date(2018, 2, 1),
        balance: 2_500.0,
        risk_rating: RiskRating::Medium,
        last_activity_date: None,
        custodian_bank: None,
        deleted_at: None,
    }
}

pub fn transaction(id: &str, debit: &str, credit: &str, owner: OwnerRef) -> Transaction {
    Transaction {
        transaction_id: id.into(),
        transaction_type: TransactionType::Wire,
        transaction_date: date(2024, 1, 15),
        amount: 1_250.5,
        currency: "USD".into(),
        status: TransactionStatus::Completed,
        debit_account_id: debit.into(),
        credit_account_id: credit.into(),
        entity: owner,
        reference_number: None,
        purpose: None,
        screening_alert: false,
        risk_score: Some(12),
        deleted_at: None,
    }
}

pub fn beneficial_owner(id: &str, owner: OwnerRef) -> BeneficialOwner {
    BeneficialOwner {
        owner_id: id.into(),
        entity: owner,
        name: format!("Owner {id}"),
        nationality: "GB".into(),
        country_of_residence: "GB".into(),
        ownership_percentage: 30.0,
        dob: date(1970, 4, 12),
        verification_date: date(2023, 9, 1),
        pep_status: false,
        sanctions_status: false,
        notes: None,
        deleted_at: None,
    }
}

pub fn document(id: &str, owner: OwnerRef) -> Document {
    Document {
        document_id: id.into(),
        entity: owner,
        document_type: "regulatory_license".into(),
        document_number: format!("DOC-{id}"),
        issuing_authority: "Registrar".into(),
        issuing_country: "US".into(),
        issue_date: date(2020, 1, 1),
        expiry_date: date(2030, 1, 1),
        verification_status: None,
        deleted_at: None,
    }
}

pub fn risk_assessment(id: &str, owner: OwnerRef) -> RiskAssessment {
    RiskAssessment {
        assessment_id: id.into(),
        entity: owner,
        assessment_date: date(2024, 2, 1),
        risk_rating: RiskRating::Medium,
        risk_score: 48.0,
        assessment_type: "periodic".into(),
        risk_factors: BTreeMap::from([("geography".to_string(), 3u8)]),
        assessor: None,
        next_review_date: None,
        deleted_at: None,
    }
}

pub fn compliance_event(id: &str, owner: OwnerRef, account: Option<&str>) -> ComplianceEvent {
    ComplianceEvent {
        event_id: id.into(),
        entity: owner,
        event_date: date(2024, 3, 3),
        event_type: "periodic_review".into(),
        event_description: "periodic review recorded".into(),
        old_state: None,
        new_state: "approved".into(),
        decision: None,
        decision_date: None,
        related_account_id: account.map(str::to_string),
        deleted_at: None,
    }
}

/// One institution with two subsidiaries holding three accounts each.
pub fn scenario_graph() -> EntityGraph {
    let mut graph = EntityGraph::new(today());
    graph.insert(institution("inst-1")).unwrap();
    for s in 1..=2 {
        let sub = format!("sub-{s}");
        graph.insert(subsidiary(&sub, "inst-1")).unwrap();
        for a in 1..=3 {
            graph
                .insert(account(
                    &format!("acct-{s}-{a}"),
                    OwnerRef::Subsidiary(sub.clone()),
                ))
                .unwrap();
        }
    }
    graph
}
