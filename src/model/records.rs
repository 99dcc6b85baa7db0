use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{OwnerRef, Violations};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BusinessType {
    HedgeFund,
    Bank,
    BrokerDealer,
    Insurance,
    AssetManager,
    PensionFund,
    Other,
}

impl BusinessType {
    pub const ALL: [BusinessType; 7] = [
        BusinessType::HedgeFund,
        BusinessType::Bank,
        BusinessType::BrokerDealer,
        BusinessType::Insurance,
        BusinessType::AssetManager,
        BusinessType::PensionFund,
        BusinessType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BusinessType::HedgeFund => "hedge_fund",
            BusinessType::Bank => "bank",
            BusinessType::BrokerDealer => "broker_dealer",
            BusinessType::Insurance => "insurance",
            BusinessType::AssetManager => "asset_manager",
            BusinessType::PensionFund => "pension_fund",
            BusinessType::Other => "other",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationalStatus {
    Active,
    Dormant,
    Liquidating,
}

impl OperationalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationalStatus::Active => "active",
            OperationalStatus::Dormant => "dormant",
            OperationalStatus::Liquidating => "liquidating",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskRating {
    Low,
    Medium,
    High,
}

impl RiskRating {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskRating::Low => "low",
            RiskRating::Medium => "medium",
            RiskRating::High => "high",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Ach,
    Wire,
    Check,
    Lockbox,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Ach => "ach",
            TransactionType::Wire => "wire",
            TransactionType::Check => "check",
            TransactionType::Lockbox => "lockbox",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Completed,
    Pending,
    Failed,
    Reversed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Completed => "completed",
            TransactionStatus::Pending => "pending",
            TransactionStatus::Failed => "failed",
            TransactionStatus::Reversed => "reversed",
        }
    }
}

/// Whether a person record carries a `CITIZEN_OF` relationship. The
/// relational side counts the same rows with [`HAS_NATIONALITY_SQL`].
fn has_nationality(nationality: &str) -> bool {
    !nationality.is_empty()
}

/// SQL form of the `CITIZEN_OF` rule over a `nationality` column.
pub const HAS_NATIONALITY_SQL: &str = "nationality <> ''";

fn percentage_in_range(value: f64) -> bool {
    value.is_finite() && (0.0..=100.0).contains(&value)
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Institution {
    pub institution_id: String,
    pub legal_name: String,
    pub business_type: BusinessType,
    pub incorporation_country: String,
    pub incorporation_date: NaiveDate,
    pub onboarding_date: NaiveDate,
    pub risk_rating: RiskRating,
    pub operational_status: OperationalStatus,
    pub primary_currency: Option<String>,
    pub swift_code: Option<String>,
    pub lei_code: Option<String>,
    pub website: Option<String>,
    pub annual_revenue: Option<f64>,
    pub employee_count: Option<i64>,
    pub public_company: bool,
    pub stock_symbol: Option<String>,
    pub deleted_at: Option<NaiveDate>,
}

impl Institution {
    pub fn validate(&self, today: NaiveDate) -> Result<(), Violations> {
        let mut v = Violations::default();
        v.check(!self.legal_name.trim().is_empty(), "legal_name must be set");
        v.check(
            self.incorporation_date < self.onboarding_date,
            "incorporation_date must precede onboarding_date",
        );
        v.check(
            self.onboarding_date <= today,
            "onboarding_date must not be after the generation date",
        );
        if let Some(revenue) = self.annual_revenue {
            v.check(
                revenue.is_finite() && revenue >= 0.0,
                format!("annual_revenue {revenue} must be a finite, non-negative amount"),
            );
        }
        v.into_result()
    }
}

/// Customer profile of a subsidiary that is also a customer of its parent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CustomerProfile {
    pub customer_id: String,
    pub onboarding_date: NaiveDate,
    pub risk_rating: RiskRating,
    pub status: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Subsidiary {
    pub subsidiary_id: String,
    pub parent_institution_id: String,
    pub legal_name: String,
    pub tax_id: String,
    pub incorporation_country: String,
    pub incorporation_date: NaiveDate,
    pub acquisition_date: NaiveDate,
    pub business_type: BusinessType,
    pub operational_status: OperationalStatus,
    pub parent_ownership_percentage: f64,
    pub functional_currency: String,
    pub is_regulated: bool,
    pub customer: Option<CustomerProfile>,
    pub deleted_at: Option<NaiveDate>,
}

impl Subsidiary {
    pub fn is_customer(&self) -> bool {
        self.customer.is_some()
    }

    pub fn validate(&self, today: NaiveDate) -> Result<(), Violations> {
        let mut v = Violations::default();
        v.check(!self.legal_name.trim().is_empty(), "legal_name must be set");
        v.check(
            !self.parent_institution_id.trim().is_empty(),
            "parent_institution_id must be set",
        );
        v.check(
            self.incorporation_date < self.acquisition_date,
            "incorporation_date must precede acquisition_date",
        );
        v.check(
            self.acquisition_date <= today,
            "acquisition_date must not be after the generation date",
        );
        v.check(
            percentage_in_range(self.parent_ownership_percentage),
            format!(
                "parent_ownership_percentage {} outside [0, 100]",
                self.parent_ownership_percentage
            ),
        );
        if let Some(customer) = &self.customer {
            v.check(
                !customer.customer_id.trim().is_empty(),
                "customer_id must be set for a customer subsidiary",
            );
            v.check(
                customer.onboarding_date >= self.incorporation_date,
                "customer onboarding_date must not precede incorporation_date",
            );
        }
        v.into_result()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub account_id: String,
    #[serde(flatten)]
    pub entity: OwnerRef,
    pub account_type: String,
    pub account_number: String,
    pub currency: String,
    pub status: String,
    pub opening_date: NaiveDate,
    pub balance: f64,
    pub risk_rating: RiskRating,
    pub last_activity_date: Option<NaiveDate>,
    pub custodian_bank: Option<String>,
    pub deleted_at: Option<NaiveDate>,
}

impl Account {
    pub fn validate(&self, today: NaiveDate) -> Result<(), Violations> {
        let mut v = Violations::default();
        v.check(!self.account_number.is_empty(), "account_number must be set");
        v.check(!self.currency.is_empty(), "currency must be set");
        v.check(self.balance.is_finite(), "balance must be a finite amount");
        v.check(
            self.opening_date <= today,
            "opening_date must not be after the generation date",
        );
        if let Some(last) = self.last_activity_date {
            v.check(
                last >= self.opening_date,
                "last_activity_date must not precede opening_date",
            );
        }
        v.into_result()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub transaction_id: String,
    pub transaction_type: TransactionType,
    pub transaction_date: NaiveDate,
    pub amount: f64,
    pub currency: String,
    pub status: TransactionStatus,
    pub debit_account_id: String,
    pub credit_account_id: String,
    /// Owner of the debit account.
    #[serde(flatten)]
    pub entity: OwnerRef,
    pub reference_number: Option<String>,
    pub purpose: Option<String>,
    pub screening_alert: bool,
    pub risk_score: Option<i64>,
    pub deleted_at: Option<NaiveDate>,
}

impl Transaction {
    pub fn validate(&self, today: NaiveDate) -> Result<(), Violations> {
        let mut v = Violations::default();
        v.check(
            self.debit_account_id != self.credit_account_id,
            "debit_account_id and credit_account_id must differ",
        );
        v.check(
            self.amount.is_finite() && self.amount > 0.0,
            format!("amount {} must be positive", self.amount),
        );
        v.check(!self.currency.is_empty(), "currency must be set");
        v.check(
            self.transaction_date <= today,
            "transaction_date must not be after the generation date",
        );
        if let Some(score) = self.risk_score {
            v.check((0..=100).contains(&score), "risk_score outside [0, 100]");
        }
        v.into_result()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BeneficialOwner {
    pub owner_id: String,
    #[serde(flatten)]
    pub entity: OwnerRef,
    pub name: String,
    pub nationality: String,
    pub country_of_residence: String,
    pub ownership_percentage: f64,
    pub dob: NaiveDate,
    pub verification_date: NaiveDate,
    pub pep_status: bool,
    pub sanctions_status: bool,
    pub notes: Option<String>,
    pub deleted_at: Option<NaiveDate>,
}

impl BeneficialOwner {
    pub fn has_nationality(&self) -> bool {
        has_nationality(&self.nationality)
    }

    pub fn validate(&self, today: NaiveDate) -> Result<(), Violations> {
        let mut v = Violations::default();
        v.check(!self.name.trim().is_empty(), "name must be set");
        v.check(
            percentage_in_range(self.ownership_percentage),
            format!(
                "ownership_percentage {} outside [0, 100]",
                self.ownership_percentage
            ),
        );
        v.check(self.dob < self.verification_date, "dob must precede verification_date");
        v.check(
            self.verification_date <= today,
            "verification_date must not be after the generation date",
        );
        v.into_result()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuthorizedPerson {
    pub person_id: String,
    #[serde(flatten)]
    pub entity: OwnerRef,
    pub name: String,
    pub title: String,
    pub nationality: String,
    pub authorization_level: String,
    pub authorization_start: NaiveDate,
    pub authorization_end: Option<NaiveDate>,
    pub is_active: bool,
    pub deleted_at: Option<NaiveDate>,
}

impl AuthorizedPerson {
    pub fn has_nationality(&self) -> bool {
        has_nationality(&self.nationality)
    }

    pub fn validate(&self, _today: NaiveDate) -> Result<(), Violations> {
        let mut v = Violations::default();
        v.check(!self.name.trim().is_empty(), "name must be set");
        if let Some(end) = self.authorization_end {
            v.check(
                end >= self.authorization_start,
                "authorization_end must not precede authorization_start",
            );
        }
        v.into_result()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub document_id: String,
    #[serde(flatten)]
    pub entity: OwnerRef,
    pub document_type: String,
    pub document_number: String,
    pub issuing_authority: String,
    pub issuing_country: String,
    pub issue_date: NaiveDate,
    pub expiry_date: NaiveDate,
    pub verification_status: Option<String>,
    pub deleted_at: Option<NaiveDate>,
}

impl Document {
    pub fn validate(&self, today: NaiveDate) -> Result<(), Violations> {
        let mut v = Violations::default();
        v.check(
            self.expiry_date > self.issue_date,
            "expiry_date must be after issue_date",
        );
        v.check(
            self.issue_date <= today,
            "issue_date must not be after the generation date",
        );
        v.into_result()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub address_id: String,
    #[serde(flatten)]
    pub entity: OwnerRef,
    pub address_type: String,
    pub address_line1: String,
    pub address_line2: Option<String>,
    pub city: String,
    pub postal_code: String,
    pub country: String,
    pub effective_from: NaiveDate,
    pub effective_to: Option<NaiveDate>,
    pub primary_address: bool,
    pub deleted_at: Option<NaiveDate>,
}

impl Address {
    pub fn validate(&self, _today: NaiveDate) -> Result<(), Violations> {
        let mut v = Violations::default();
        v.check(!self.address_line1.trim().is_empty(), "address_line1 must be set");
        v.check(!self.country.is_empty(), "country must be set");
        if let Some(to) = self.effective_to {
            v.check(to >= self.effective_from, "effective_to must not precede effective_from");
        }
        v.into_result()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JurisdictionPresence {
    pub presence_id: String,
    #[serde(flatten)]
    pub entity: OwnerRef,
    pub jurisdiction: String,
    pub registration_date: NaiveDate,
    pub effective_from: NaiveDate,
    pub effective_to: Option<NaiveDate>,
    pub status: String,
    pub local_registration_id: String,
    pub deleted_at: Option<NaiveDate>,
}

impl JurisdictionPresence {
    pub fn validate(&self, today: NaiveDate) -> Result<(), Violations> {
        let mut v = Violations::default();
        v.check(!self.jurisdiction.is_empty(), "jurisdiction must be set");
        v.check(
            self.registration_date <= today,
            "registration_date must not be after the generation date",
        );
        if let Some(to) = self.effective_to {
            v.check(to >= self.effective_from, "effective_to must not precede effective_from");
        }
        v.into_result()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub assessment_id: String,
    #[serde(flatten)]
    pub entity: OwnerRef,
    pub assessment_date: NaiveDate,
    pub risk_rating: RiskRating,
    pub risk_score: f64,
    pub assessment_type: String,
    pub risk_factors: BTreeMap<String, u8>,
    pub assessor: Option<String>,
    pub next_review_date: Option<NaiveDate>,
    pub deleted_at: Option<NaiveDate>,
}

impl RiskAssessment {
    pub fn validate(&self, today: NaiveDate) -> Result<(), Violations> {
        let mut v = Violations::default();
        v.check(
            self.assessment_date <= today,
            "assessment_date must not be after the generation date",
        );
        v.check(
            percentage_in_range(self.risk_score),
            format!("risk_score {} outside [0, 100]", self.risk_score),
        );
        for (factor, score) in &self.risk_factors {
            v.check(
                (1..=5).contains(score),
                format!("risk factor {factor} score {score} outside 1..=5"),
            );
        }
        if let Some(next) = self.next_review_date {
            v.check(
                next > self.assessment_date,
                "next_review_date must be after assessment_date",
            );
        }
        v.into_result()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComplianceEvent {
    pub event_id: String,
    #[serde(flatten)]
    pub entity: OwnerRef,
    pub event_date: NaiveDate,
    pub event_type: String,
    pub event_description: String,
    pub old_state: Option<String>,
    pub new_state: String,
    pub decision: Option<String>,
    pub decision_date: Option<NaiveDate>,
    pub related_account_id: Option<String>,
    pub deleted_at: Option<NaiveDate>,
}

impl ComplianceEvent {
    pub fn validate(&self, today: NaiveDate) -> Result<(), Violations> {
        let mut v = Violations::default();
        v.check(!self.event_type.is_empty(), "event_type must be set");
        v.check(
            self.event_date <= today,
            "event_date must not be after the generation date",
        );
        if let Some(decided) = self.decision_date {
            v.check(
                decided >= self.event_date,
                "decision_date must not precede event_date",
            );
        }
        v.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    fn assessment(risk_score: f64) -> RiskAssessment {
        RiskAssessment {
            assessment_id: "ra-1".into(),
            entity: OwnerRef::Institution("i-1".into()),
            assessment_date: day(3, 1),
            risk_rating: RiskRating::Medium,
            risk_score,
            assessment_type: "periodic".into(),
            risk_factors: BTreeMap::from([("geography".to_string(), 3u8)]),
            assessor: None,
            next_review_date: None,
            deleted_at: None,
        }
    }

    #[test]
    fn risk_score_must_be_a_finite_percentage() {
        let today = day(6, 30);
        assert!(assessment(48.0).validate(today).is_ok());
        assert!(assessment(0.0).validate(today).is_ok());
        for bad in [f64::NAN, f64::INFINITY, -1.0, 100.5] {
            let err = assessment(bad).validate(today).unwrap_err();
            assert!(err.to_string().contains("risk_score"), "{bad}: {err}");
        }
    }

    #[test]
    fn infinite_revenue_is_rejected() {
        let institution = Institution {
            institution_id: "i-1".into(),
            legal_name: "North Capital".into(),
            business_type: BusinessType::Bank,
            incorporation_country: "US".into(),
            incorporation_date: day(1, 1),
            onboarding_date: day(2, 1),
            risk_rating: RiskRating::Low,
            operational_status: OperationalStatus::Active,
            primary_currency: None,
            swift_code: None,
            lei_code: None,
            website: None,
            annual_revenue: Some(f64::INFINITY),
            employee_count: None,
            public_company: false,
            stock_symbol: None,
            deleted_at: None,
        };
        let err = institution.validate(day(6, 30)).unwrap_err();
        assert!(err.to_string().contains("annual_revenue"), "{err}");
    }

    #[test]
    fn blank_nationality_has_no_citizenship() {
        assert!(has_nationality("GB"));
        assert!(!has_nationality(""));
    }
}
