//! Seeded synthetic producer of [`EntityGraph`]s.
//!
//! The same seed and generation date always yield the same graph, identifiers
//! included. Every record satisfies the model invariants by construction.

use std::collections::BTreeMap;

use chrono::{Days, NaiveDate};
use rand::{Rng, RngCore, SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Builder;

use crate::{
    errors::LoaderError,
    model::{
        Account, Address, AuthorizedPerson, BeneficialOwner, BusinessType, ComplianceEvent,
        CustomerProfile, Document, EntityGraph, Institution, JurisdictionPresence,
        OperationalStatus, OwnerRef, RiskAssessment, RiskRating, Subsidiary, Transaction,
        TransactionStatus, TransactionType,
    },
};

const COUNTRIES: &[&str] = &["US", "GB", "DE", "FR", "CH", "SG", "HK", "JP", "CA", "LU", "IE", "KY"];
const CURRENCIES: &[&str] = &["USD", "EUR", "GBP", "CHF", "SGD", "JPY"];
const NAME_PREFIXES: &[&str] = &[
    "Atlas", "Harbor", "Summit", "Granite", "Meridian", "Northgate", "Bluewater", "Crescent",
];
const NAME_SUFFIXES: &[&str] = &["Capital", "Partners", "Holdings", "Securities", "Trust", "Group"];
const FIRST_NAMES: &[&str] = &["Alex", "Maria", "Kenji", "Amara", "Lukas", "Priya", "Omar", "Sofia"];
const LAST_NAMES: &[&str] = &["Novak", "Okafor", "Tanaka", "Schmidt", "Haddad", "Silva", "Larsen"];
const CITIES: &[&str] = &["New York", "London", "Frankfurt", "Zurich", "Singapore", "Toronto"];
const ACCOUNT_TYPES: &[&str] = &["checking", "savings", "custody", "margin", "escrow"];
const DOCUMENT_TYPES: &[&str] = &[
    "certificate_of_incorporation",
    "articles_of_association",
    "regulatory_license",
    "tax_registration",
    "audited_financials",
];
const RISK_FACTORS: &[&str] = &["geography", "product", "client_type", "channel", "ownership"];
const EVENT_TYPES: &[&str] = &[
    "onboarding",
    "periodic_review",
    "risk_rating_change",
    "sanctions_screening",
    "account_review",
];
const TITLES: &[&str] = &["Director", "Chief Financial Officer", "Treasurer", "Compliance Officer"];
const AUTH_LEVELS: &[&str] = &["full", "limited", "view_only"];

/// Volumes and ratios of a generated graph.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// **Default:** `42`
    pub seed: u64,
    /// **Default:** `10`
    pub institutions: usize,
    /// **Default:** `2`
    pub subsidiaries_per_institution: usize,
    /// **Default:** `2`
    pub accounts_per_institution: usize,
    /// **Default:** `3`
    pub accounts_per_subsidiary: usize,
    /// Each account debits this many transactions.
    ///
    /// **Default:** `5`
    pub transactions_per_account: usize,
    /// The following counts apply to every institution and subsidiary.
    ///
    /// **Default:** `2`
    pub beneficial_owners_per_entity: usize,
    /// **Default:** `2`
    pub authorized_persons_per_entity: usize,
    /// **Default:** `2`
    pub documents_per_entity: usize,
    /// **Default:** `1`
    pub addresses_per_entity: usize,
    /// **Default:** `1`
    pub presences_per_entity: usize,
    /// **Default:** `1`
    pub risk_assessments_per_entity: usize,
    /// **Default:** `2`
    pub compliance_events_per_entity: usize,
    /// Share of subsidiaries that are also customers of their parent.
    ///
    /// **Default:** `0.3`
    pub customer_ratio: f64,
    /// Share of institutions rated high risk.
    ///
    /// **Default:** `0.1`
    pub high_risk_ratio: f64,
    /// Share of owned leaf records (documents, addresses, ...) that are
    /// soft-deleted.
    ///
    /// **Default:** `0.0`
    pub soft_delete_ratio: f64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            institutions: 10,
            subsidiaries_per_institution: 2,
            accounts_per_institution: 2,
            accounts_per_subsidiary: 3,
            transactions_per_account: 5,
            beneficial_owners_per_entity: 2,
            authorized_persons_per_entity: 2,
            documents_per_entity: 2,
            addresses_per_entity: 1,
            presences_per_entity: 1,
            risk_assessments_per_entity: 1,
            compliance_events_per_entity: 2,
            customer_ratio: 0.3,
            high_risk_ratio: 0.1,
            soft_delete_ratio: 0.0,
        }
    }
}

impl GeneratorConfig {
    /// A small graph for smoke tests and examples.
    pub fn small(seed: u64) -> Self {
        Self {
            seed,
            institutions: 2,
            subsidiaries_per_institution: 1,
            transactions_per_account: 2,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), LoaderError> {
        for (name, ratio) in [
            ("customer_ratio", self.customer_ratio),
            ("high_risk_ratio", self.high_risk_ratio),
            ("soft_delete_ratio", self.soft_delete_ratio),
        ] {
            if !(0.0..=1.0).contains(&ratio) {
                return Err(LoaderError::config(format!(
                    "generator.{name} must be within [0, 1], got {ratio}"
                )));
            }
        }
        Ok(())
    }
}

/// Generates a complete graph for `today`.
pub fn generate(config: &GeneratorConfig, today: NaiveDate) -> Result<EntityGraph, LoaderError> {
    config.validate()?;
    let mut generator = Generator::new(config, today);
    let graph = generator.build()?;
    info!(
        seed = config.seed,
        records = graph.len(),
        generated_on = %today,
        "synthetic graph generated"
    );
    Ok(graph)
}

struct Generator<'a> {
    config: &'a GeneratorConfig,
    today: NaiveDate,
    rng: StdRng,
    graph: EntityGraph,
}

/// What transactions and events need to know about an account.
struct OwnedAccount {
    id: String,
    owner: OwnerRef,
    opened: NaiveDate,
}

impl<'a> Generator<'a> {
    fn new(config: &'a GeneratorConfig, today: NaiveDate) -> Self {
        Self {
            config,
            today,
            rng: StdRng::seed_from_u64(config.seed),
            graph: EntityGraph::new(today),
        }
    }

    fn build(&mut self) -> Result<EntityGraph, LoaderError> {
        let mut owners = Vec::new();
        for _ in 0..self.config.institutions {
            let institution = self.institution();
            let institution_id = institution.institution_id.clone();
            owners.push(OwnerRef::Institution(institution_id.clone()));
            let incorporated = institution.incorporation_date;
            self.graph.insert(institution)?;
            for _ in 0..self.config.subsidiaries_per_institution {
                let subsidiary = self.subsidiary(&institution_id, incorporated);
                owners.push(OwnerRef::Subsidiary(subsidiary.subsidiary_id.clone()));
                self.graph.insert(subsidiary)?;
            }
        }

        let mut accounts = Vec::new();
        for owner in &owners {
            let count = match owner {
                OwnerRef::Institution(_) => self.config.accounts_per_institution,
                OwnerRef::Subsidiary(_) => self.config.accounts_per_subsidiary,
            };
            for _ in 0..count {
                let account = self.account(owner);
                accounts.push(OwnedAccount {
                    id: account.account_id.clone(),
                    owner: owner.clone(),
                    opened: account.opening_date,
                });
                self.graph.insert(account)?;
            }
        }

        if accounts.len() > 1 {
            for debit in 0..accounts.len() {
                for _ in 0..self.config.transactions_per_account {
                    let tx = self.transaction(&accounts, debit);
                    self.graph.insert(tx)?;
                }
            }
        }

        for owner in &owners {
            let owned: Vec<&str> = accounts
                .iter()
                .filter(|a| &a.owner == owner)
                .map(|a| a.id.as_str())
                .collect();
            for _ in 0..self.config.beneficial_owners_per_entity {
                let record = self.beneficial_owner(owner);
                self.graph.insert(record)?;
            }
            for _ in 0..self.config.authorized_persons_per_entity {
                let record = self.authorized_person(owner);
                self.graph.insert(record)?;
            }
            for _ in 0..self.config.documents_per_entity {
                let record = self.document(owner);
                self.graph.insert(record)?;
            }
            for n in 0..self.config.addresses_per_entity {
                let record = self.address(owner, n == 0);
                self.graph.insert(record)?;
            }
            for _ in 0..self.config.presences_per_entity {
                let record = self.presence(owner);
                self.graph.insert(record)?;
            }
            for _ in 0..self.config.risk_assessments_per_entity {
                let record = self.risk_assessment(owner);
                self.graph.insert(record)?;
            }
            for _ in 0..self.config.compliance_events_per_entity {
                let record = self.compliance_event(owner, &owned);
                self.graph.insert(record)?;
            }
        }

        Ok(std::mem::replace(&mut self.graph, EntityGraph::new(self.today)))
    }

    fn id(&mut self) -> String {
        let mut bytes = [0u8; 16];
        self.rng.fill_bytes(&mut bytes);
        Builder::from_random_bytes(bytes).into_uuid().to_string()
    }

    fn pick<T: Copy>(&mut self, items: &[T]) -> T {
        items[self.rng.gen_range(0..items.len())]
    }

    fn chance(&mut self, ratio: f64) -> bool {
        self.rng.gen_bool(ratio)
    }

    fn days_ago(&self, days: u64) -> NaiveDate {
        self.today
            .checked_sub_days(Days::new(days))
            .unwrap_or(NaiveDate::MIN)
    }

    /// Uniform date in `[from, to]`; `to` when the range is empty.
    fn date_between(&mut self, from: NaiveDate, to: NaiveDate) -> NaiveDate {
        let span = (to - from).num_days();
        if span <= 0 {
            return to;
        }
        from.checked_add_days(Days::new(self.rng.gen_range(0..=span) as u64))
            .unwrap_or(to)
    }

    fn after(&mut self, date: NaiveDate, max_days: u64) -> NaiveDate {
        let days = self.rng.gen_range(1..=max_days.max(1));
        date.checked_add_days(Days::new(days)).unwrap_or(date)
    }

    fn money(&mut self, low: f64, high: f64) -> f64 {
        (self.rng.gen_range(low..high) * 100.0).round() / 100.0
    }

    fn percentage(&mut self, low: f64) -> f64 {
        (self.rng.gen_range(low..=100.0) * 100.0).round() / 100.0
    }

    fn company_name(&mut self) -> String {
        format!(
            "{} {} {}",
            self.pick(NAME_PREFIXES),
            self.pick(NAME_SUFFIXES),
            self.rng.gen_range(100..1000)
        )
    }

    fn person_name(&mut self) -> String {
        format!("{} {}", self.pick(FIRST_NAMES), self.pick(LAST_NAMES))
    }

    fn soft_deleted(&mut self) -> Option<NaiveDate> {
        let ratio = self.config.soft_delete_ratio;
        self.chance(ratio).then_some(self.today)
    }

    fn institution(&mut self) -> Institution {
        let incorporation_date = self.date_between(self.days_ago(30 * 365), self.days_ago(2 * 365));
        let onboarding_date = self.date_between(
            incorporation_date.succ_opt().unwrap_or(incorporation_date),
            self.today,
        );
        let high_risk = self.chance(self.config.high_risk_ratio);
        let public_company = self.chance(0.3);
        let legal_name = self.company_name();
        Institution {
            institution_id: self.id(),
            swift_code: self.chance(0.8).then(|| {
                let bank: String = legal_name.chars().take(4).collect();
                format!("{}BK{}", bank.to_uppercase(), self.rng.gen_range(10..99))
            }),
            legal_name,
            business_type: self.pick(&BusinessType::ALL),
            incorporation_country: self.pick(COUNTRIES).to_string(),
            incorporation_date,
            onboarding_date,
            risk_rating: if high_risk {
                RiskRating::High
            } else {
                self.pick(&[RiskRating::Low, RiskRating::Medium])
            },
            operational_status: self.pick(&[
                OperationalStatus::Active,
                OperationalStatus::Active,
                OperationalStatus::Dormant,
            ]),
            primary_currency: Some(self.pick(CURRENCIES).to_string()),
            lei_code: self.chance(0.7).then(|| self.id().replace('-', "")[..20].to_uppercase()),
            website: None,
            annual_revenue: Some(self.money(1_000_000.0, 5_000_000_000.0)),
            employee_count: Some(self.rng.gen_range(10..50_000)),
            public_company,
            stock_symbol: public_company.then(|| {
                (0..4)
                    .map(|_| char::from(b'A' + self.rng.gen_range(0..26u8)))
                    .collect()
            }),
            deleted_at: None,
        }
    }

    fn subsidiary(&mut self, parent: &str, parent_incorporated: NaiveDate) -> Subsidiary {
        let incorporation_date = self.date_between(parent_incorporated, self.days_ago(365));
        let acquisition_date = self.date_between(
            incorporation_date.succ_opt().unwrap_or(incorporation_date),
            self.today,
        );
        let customer = self.chance(self.config.customer_ratio).then(|| CustomerProfile {
            customer_id: self.id(),
            onboarding_date: self.date_between(acquisition_date, self.today),
            risk_rating: self.pick(&[RiskRating::Low, RiskRating::Medium, RiskRating::High]),
            status: "active".into(),
        });
        Subsidiary {
            subsidiary_id: self.id(),
            parent_institution_id: parent.to_string(),
            legal_name: self.company_name(),
            tax_id: format!("TX-{:09}", self.rng.gen_range(0..1_000_000_000u32)),
            incorporation_country: self.pick(COUNTRIES).to_string(),
            incorporation_date,
            acquisition_date,
            business_type: self.pick(&BusinessType::ALL),
            operational_status: OperationalStatus::Active,
            parent_ownership_percentage: self.percentage(51.0),
            functional_currency: self.pick(CURRENCIES).to_string(),
            is_regulated: self.chance(0.6),
            customer,
            deleted_at: None,
        }
    }

    fn account(&mut self, owner: &OwnerRef) -> Account {
        let opening_date = self.date_between(self.days_ago(10 * 365), self.days_ago(30));
        let last_activity_date = Some(self.date_between(opening_date, self.today));
        Account {
            account_id: self.id(),
            entity: owner.clone(),
            account_type: self.pick(ACCOUNT_TYPES).to_string(),
            account_number: format!("{:012}", self.rng.gen_range(0..1_000_000_000_000u64)),
            currency: self.pick(CURRENCIES).to_string(),
            status: "active".into(),
            opening_date,
            balance: self.money(0.0, 50_000_000.0),
            risk_rating: self.pick(&[RiskRating::Low, RiskRating::Medium, RiskRating::High]),
            last_activity_date,
            custodian_bank: self.chance(0.4).then(|| self.company_name()),
            deleted_at: None,
        }
    }

    fn transaction(&mut self, accounts: &[OwnedAccount], debit: usize) -> Transaction {
        // Any other account; offset keeps it distinct from the debit side.
        let offset = self.rng.gen_range(1..accounts.len());
        let credit = &accounts[(debit + offset) % accounts.len()];
        let debit = &accounts[debit];
        let transaction_date = self.date_between(debit.opened.max(credit.opened), self.today);
        Transaction {
            transaction_id: self.id(),
            transaction_type: self.pick(&[
                TransactionType::Ach,
                TransactionType::Wire,
                TransactionType::Check,
                TransactionType::Lockbox,
            ]),
            transaction_date,
            amount: self.money(10.0, 1_000_000.0),
            currency: self.pick(CURRENCIES).to_string(),
            status: self.pick(&[
                TransactionStatus::Completed,
                TransactionStatus::Completed,
                TransactionStatus::Pending,
                TransactionStatus::Failed,
                TransactionStatus::Reversed,
            ]),
            debit_account_id: debit.id.clone(),
            credit_account_id: credit.id.clone(),
            entity: debit.owner.clone(),
            reference_number: Some(format!("REF{:010}", self.rng.gen_range(0..10_000_000_000u64))),
            purpose: self.chance(0.5).then(|| "settlement".to_string()),
            screening_alert: self.chance(0.05),
            risk_score: Some(self.rng.gen_range(0..=100)),
            deleted_at: None,
        }
    }

    fn beneficial_owner(&mut self, owner: &OwnerRef) -> BeneficialOwner {
        let dob = self.date_between(self.days_ago(85 * 365), self.days_ago(25 * 365));
        let verification_date = self.date_between(self.days_ago(5 * 365), self.today);
        BeneficialOwner {
            owner_id: self.id(),
            entity: owner.clone(),
            name: self.person_name(),
            nationality: self.pick(COUNTRIES).to_string(),
            country_of_residence: self.pick(COUNTRIES).to_string(),
            ownership_percentage: self.percentage(0.0),
            dob,
            verification_date,
            pep_status: self.chance(0.05),
            sanctions_status: self.chance(0.01),
            notes: None,
            deleted_at: self.soft_deleted(),
        }
    }

    fn authorized_person(&mut self, owner: &OwnerRef) -> AuthorizedPerson {
        let authorization_start = self.date_between(self.days_ago(10 * 365), self.today);
        let authorization_end = self
            .chance(0.2)
            .then(|| self.after(authorization_start, 3 * 365));
        AuthorizedPerson {
            person_id: self.id(),
            entity: owner.clone(),
            name: self.person_name(),
            title: self.pick(TITLES).to_string(),
            nationality: self.pick(COUNTRIES).to_string(),
            authorization_level: self.pick(AUTH_LEVELS).to_string(),
            authorization_start,
            is_active: authorization_end.is_none_or(|end| end > self.today),
            authorization_end,
            deleted_at: self.soft_deleted(),
        }
    }

    fn document(&mut self, owner: &OwnerRef) -> Document {
        let issue_date = self.date_between(self.days_ago(10 * 365), self.today);
        let expiry_date = self.after(issue_date, 10 * 365);
        Document {
            document_id: self.id(),
            entity: owner.clone(),
            document_type: self.pick(DOCUMENT_TYPES).to_string(),
            document_number: format!("DOC-{:08}", self.rng.gen_range(0..100_000_000u32)),
            issuing_authority: "Registrar of Companies".into(),
            issuing_country: self.pick(COUNTRIES).to_string(),
            issue_date,
            expiry_date,
            verification_status: self
                .chance(0.8)
                .then(|| self.pick(&["verified", "pending", "rejected"]).to_string()),
            deleted_at: self.soft_deleted(),
        }
    }

    fn address(&mut self, owner: &OwnerRef, primary: bool) -> Address {
        let effective_from = self.date_between(self.days_ago(15 * 365), self.today);
        let effective_to = (!primary && self.chance(0.5)).then(|| self.after(effective_from, 5 * 365));
        Address {
            address_id: self.id(),
            entity: owner.clone(),
            address_type: if primary { "registered" } else { "operational" }.into(),
            address_line1: format!("{} Market Street", self.rng.gen_range(1..999)),
            address_line2: self.chance(0.3).then(|| format!("Suite {}", self.rng.gen_range(100..2000))),
            city: self.pick(CITIES).to_string(),
            postal_code: format!("{:05}", self.rng.gen_range(0..100_000)),
            country: self.pick(COUNTRIES).to_string(),
            effective_from,
            effective_to,
            primary_address: primary,
            deleted_at: self.soft_deleted(),
        }
    }

    fn presence(&mut self, owner: &OwnerRef) -> JurisdictionPresence {
        let registration_date = self.date_between(self.days_ago(15 * 365), self.today);
        let effective_to = self.chance(0.1).then(|| self.after(registration_date, 5 * 365));
        JurisdictionPresence {
            presence_id: self.id(),
            entity: owner.clone(),
            jurisdiction: self.pick(COUNTRIES).to_string(),
            registration_date,
            effective_from: registration_date,
            effective_to,
            status: if effective_to.is_some() { "closed" } else { "active" }.into(),
            local_registration_id: format!("LR-{:07}", self.rng.gen_range(0..10_000_000u32)),
            deleted_at: self.soft_deleted(),
        }
    }

    fn risk_assessment(&mut self, owner: &OwnerRef) -> RiskAssessment {
        let assessment_date = self.date_between(self.days_ago(3 * 365), self.today);
        let risk_factors: BTreeMap<String, u8> = RISK_FACTORS
            .iter()
            .map(|factor| (factor.to_string(), self.rng.gen_range(1..=5)))
            .collect();
        let total: u32 = risk_factors.values().map(|s| u32::from(*s)).sum();
        let risk_score = f64::from(total) / (5.0 * RISK_FACTORS.len() as f64) * 100.0;
        let risk_rating = match risk_score {
            s if s >= 70.0 => RiskRating::High,
            s if s >= 40.0 => RiskRating::Medium,
            _ => RiskRating::Low,
        };
        RiskAssessment {
            assessment_id: self.id(),
            entity: owner.clone(),
            assessment_date,
            risk_rating,
            risk_score: (risk_score * 100.0).round() / 100.0,
            assessment_type: self.pick(&["initial", "periodic", "event_driven"]).to_string(),
            risk_factors,
            assessor: self.chance(0.7).then(|| self.person_name()),
            next_review_date: assessment_date.checked_add_days(Days::new(365)),
            deleted_at: self.soft_deleted(),
        }
    }

    fn compliance_event(&mut self, owner: &OwnerRef, accounts: &[&str]) -> ComplianceEvent {
        let event_date = self.date_between(self.days_ago(5 * 365), self.today);
        let decided = self.chance(0.6);
        let related_account_id = (!accounts.is_empty() && self.chance(0.5))
            .then(|| accounts[self.rng.gen_range(0..accounts.len())].to_string());
        let event_type = self.pick(EVENT_TYPES);
        ComplianceEvent {
            event_id: self.id(),
            entity: owner.clone(),
            event_date,
            event_type: event_type.to_string(),
            event_description: format!("{} recorded", event_type.replace('_', " ")),
            old_state: self.chance(0.5).then(|| "under_review".to_string()),
            new_state: self.pick(&["approved", "escalated", "closed"]).to_string(),
            decision: decided.then(|| self.pick(&["approve", "escalate", "reject"]).to_string()),
            decision_date: decided.then(|| self.date_between(event_date, self.today)),
            related_account_id,
            deleted_at: self.soft_deleted(),
        }
    }
}
