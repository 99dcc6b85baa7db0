use crate::schema::StoreSchema;

pub const RELATIONAL_SCHEMA_VERSION: i64 = 1;

// Owned-record tables carry the `(entity_id, entity_type)` discriminator plus
// one nullable foreign key per owner type; the CHECK keeps the three in step.
pub const RELATIONAL_SCHEMA: StoreSchema = StoreSchema {
    meta_table: "loader_meta",
    version: RELATIONAL_SCHEMA_VERSION,
    statements: &[
        r#"
        CREATE TABLE IF NOT EXISTS institutions (
            institution_id        TEXT PRIMARY KEY,
            legal_name            TEXT NOT NULL,
            business_type         TEXT NOT NULL,
            incorporation_country TEXT NOT NULL,
            incorporation_date    TEXT NOT NULL,
            onboarding_date       TEXT NOT NULL,
            risk_rating           TEXT NOT NULL,
            operational_status    TEXT NOT NULL,
            primary_currency      TEXT,
            swift_code            TEXT,
            lei_code              TEXT,
            website               TEXT,
            annual_revenue        REAL,
            employee_count        INTEGER,
            public_company        INTEGER NOT NULL,
            stock_symbol          TEXT,
            deleted_at            TEXT,
            CHECK (incorporation_date < onboarding_date)
        );
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS subsidiaries (
            subsidiary_id               TEXT PRIMARY KEY,
            parent_institution_id       TEXT NOT NULL REFERENCES institutions(institution_id),
            legal_name                  TEXT NOT NULL,
            tax_id                      TEXT NOT NULL,
            incorporation_country       TEXT NOT NULL,
            incorporation_date          TEXT NOT NULL,
            acquisition_date            TEXT NOT NULL,
            business_type               TEXT NOT NULL,
            operational_status          TEXT NOT NULL,
            parent_ownership_percentage REAL NOT NULL
                CHECK (parent_ownership_percentage BETWEEN 0 AND 100),
            functional_currency         TEXT NOT NULL,
            is_regulated                INTEGER NOT NULL,
            is_customer                 INTEGER NOT NULL,
            customer_id                 TEXT,
            customer_onboarding_date    TEXT,
            customer_risk_rating        TEXT,
            customer_status             TEXT,
            deleted_at                  TEXT,
            CHECK (incorporation_date < acquisition_date),
            CHECK (is_customer = 0 OR customer_id IS NOT NULL)
        );
        CREATE INDEX IF NOT EXISTS idx_subsidiaries_parent ON subsidiaries(parent_institution_id);
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS accounts (
            account_id         TEXT PRIMARY KEY,
            entity_id          TEXT NOT NULL,
            entity_type        TEXT NOT NULL CHECK (entity_type IN ('institution', 'subsidiary')),
            institution_id     TEXT REFERENCES institutions(institution_id),
            subsidiary_id      TEXT REFERENCES subsidiaries(subsidiary_id),
            account_type       TEXT NOT NULL,
            account_number     TEXT NOT NULL,
            currency           TEXT NOT NULL,
            status             TEXT NOT NULL,
            opening_date       TEXT NOT NULL,
            balance            REAL NOT NULL,
            risk_rating        TEXT NOT NULL,
            last_activity_date TEXT,
            custodian_bank     TEXT,
            deleted_at         TEXT,
            CHECK ((entity_type = 'institution' AND institution_id = entity_id AND subsidiary_id IS NULL)
                OR (entity_type = 'subsidiary' AND subsidiary_id = entity_id AND institution_id IS NULL))
        );
        CREATE INDEX IF NOT EXISTS idx_accounts_entity ON accounts(entity_type, entity_id);
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS transactions (
            transaction_id    TEXT PRIMARY KEY,
            transaction_type  TEXT NOT NULL,
            transaction_date  TEXT NOT NULL,
            amount            REAL NOT NULL CHECK (amount > 0),
            currency          TEXT NOT NULL,
            status            TEXT NOT NULL,
            debit_account_id  TEXT NOT NULL REFERENCES accounts(account_id),
            credit_account_id TEXT NOT NULL REFERENCES accounts(account_id),
            entity_id         TEXT NOT NULL,
            entity_type       TEXT NOT NULL CHECK (entity_type IN ('institution', 'subsidiary')),
            institution_id    TEXT REFERENCES institutions(institution_id),
            subsidiary_id     TEXT REFERENCES subsidiaries(subsidiary_id),
            reference_number  TEXT,
            purpose           TEXT,
            screening_alert   INTEGER NOT NULL,
            risk_score        INTEGER,
            deleted_at        TEXT,
            CHECK (debit_account_id <> credit_account_id),
            CHECK ((entity_type = 'institution' AND institution_id = entity_id AND subsidiary_id IS NULL)
                OR (entity_type = 'subsidiary' AND subsidiary_id = entity_id AND institution_id IS NULL))
        );
        CREATE INDEX IF NOT EXISTS idx_transactions_debit ON transactions(debit_account_id);
        CREATE INDEX IF NOT EXISTS idx_transactions_credit ON transactions(credit_account_id);
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS beneficial_owners (
            owner_id             TEXT PRIMARY KEY,
            entity_id            TEXT NOT NULL,
            entity_type          TEXT NOT NULL CHECK (entity_type IN ('institution', 'subsidiary')),
            institution_id       TEXT REFERENCES institutions(institution_id),
            subsidiary_id        TEXT REFERENCES subsidiaries(subsidiary_id),
            name                 TEXT NOT NULL,
            nationality          TEXT NOT NULL,
            country_of_residence TEXT NOT NULL,
            ownership_percentage REAL NOT NULL CHECK (ownership_percentage BETWEEN 0 AND 100),
            dob                  TEXT NOT NULL,
            verification_date    TEXT NOT NULL,
            pep_status           INTEGER NOT NULL,
            sanctions_status     INTEGER NOT NULL,
            notes                TEXT,
            deleted_at           TEXT,
            CHECK ((entity_type = 'institution' AND institution_id = entity_id AND subsidiary_id IS NULL)
                OR (entity_type = 'subsidiary' AND subsidiary_id = entity_id AND institution_id IS NULL))
        );
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS authorized_persons (
            person_id           TEXT PRIMARY KEY,
            entity_id           TEXT NOT NULL,
            entity_type         TEXT NOT NULL CHECK (entity_type IN ('institution', 'subsidiary')),
            institution_id      TEXT REFERENCES institutions(institution_id),
            subsidiary_id       TEXT REFERENCES subsidiaries(subsidiary_id),
            name                TEXT NOT NULL,
            title               TEXT NOT NULL,
            nationality         TEXT NOT NULL,
            authorization_level TEXT NOT NULL,
            authorization_start TEXT NOT NULL,
            authorization_end   TEXT,
            is_active           INTEGER NOT NULL,
            deleted_at          TEXT,
            CHECK ((entity_type = 'institution' AND institution_id = entity_id AND subsidiary_id IS NULL)
                OR (entity_type = 'subsidiary' AND subsidiary_id = entity_id AND institution_id IS NULL))
        );
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS documents (
            document_id         TEXT PRIMARY KEY,
            entity_id           TEXT NOT NULL,
            entity_type         TEXT NOT NULL CHECK (entity_type IN ('institution', 'subsidiary')),
            institution_id      TEXT REFERENCES institutions(institution_id),
            subsidiary_id       TEXT REFERENCES subsidiaries(subsidiary_id),
            document_type       TEXT NOT NULL,
            document_number     TEXT NOT NULL,
            issuing_authority   TEXT NOT NULL,
            issuing_country     TEXT NOT NULL,
            issue_date          TEXT NOT NULL,
            expiry_date         TEXT NOT NULL,
            verification_status TEXT,
            deleted_at          TEXT,
            CHECK (expiry_date > issue_date),
            CHECK ((entity_type = 'institution' AND institution_id = entity_id AND subsidiary_id IS NULL)
                OR (entity_type = 'subsidiary' AND subsidiary_id = entity_id AND institution_id IS NULL))
        );
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS addresses (
            address_id      TEXT PRIMARY KEY,
            entity_id       TEXT NOT NULL,
            entity_type     TEXT NOT NULL CHECK (entity_type IN ('institution', 'subsidiary')),
            institution_id  TEXT REFERENCES institutions(institution_id),
            subsidiary_id   TEXT REFERENCES subsidiaries(subsidiary_id),
            address_type    TEXT NOT NULL,
            address_line1   TEXT NOT NULL,
            address_line2   TEXT,
            city            TEXT NOT NULL,
            postal_code     TEXT NOT NULL,
            country         TEXT NOT NULL,
            effective_from  TEXT NOT NULL,
            effective_to    TEXT,
            primary_address INTEGER NOT NULL,
            deleted_at      TEXT,
            CHECK ((entity_type = 'institution' AND institution_id = entity_id AND subsidiary_id IS NULL)
                OR (entity_type = 'subsidiary' AND subsidiary_id = entity_id AND institution_id IS NULL))
        );
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS jurisdiction_presences (
            presence_id           TEXT PRIMARY KEY,
            entity_id             TEXT NOT NULL,
            entity_type           TEXT NOT NULL CHECK (entity_type IN ('institution', 'subsidiary')),
            institution_id        TEXT REFERENCES institutions(institution_id),
            subsidiary_id         TEXT REFERENCES subsidiaries(subsidiary_id),
            jurisdiction          TEXT NOT NULL,
            registration_date     TEXT NOT NULL,
            effective_from        TEXT NOT NULL,
            effective_to          TEXT,
            status                TEXT NOT NULL,
            local_registration_id TEXT NOT NULL,
            deleted_at            TEXT,
            CHECK ((entity_type = 'institution' AND institution_id = entity_id AND subsidiary_id IS NULL)
                OR (entity_type = 'subsidiary' AND subsidiary_id = entity_id AND institution_id IS NULL))
        );
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS risk_assessments (
            assessment_id    TEXT PRIMARY KEY,
            entity_id        TEXT NOT NULL,
            entity_type      TEXT NOT NULL CHECK (entity_type IN ('institution', 'subsidiary')),
            institution_id   TEXT REFERENCES institutions(institution_id),
            subsidiary_id    TEXT REFERENCES subsidiaries(subsidiary_id),
            assessment_date  TEXT NOT NULL,
            risk_rating      TEXT NOT NULL,
            risk_score       REAL NOT NULL,
            assessment_type  TEXT NOT NULL,
            risk_factors     TEXT NOT NULL,
            assessor         TEXT,
            next_review_date TEXT,
            deleted_at       TEXT,
            CHECK ((entity_type = 'institution' AND institution_id = entity_id AND subsidiary_id IS NULL)
                OR (entity_type = 'subsidiary' AND subsidiary_id = entity_id AND institution_id IS NULL))
        );
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS compliance_events (
            event_id           TEXT PRIMARY KEY,
            entity_id          TEXT NOT NULL,
            entity_type        TEXT NOT NULL CHECK (entity_type IN ('institution', 'subsidiary')),
            institution_id     TEXT REFERENCES institutions(institution_id),
            subsidiary_id      TEXT REFERENCES subsidiaries(subsidiary_id),
            event_date         TEXT NOT NULL,
            event_type         TEXT NOT NULL,
            event_description  TEXT NOT NULL,
            old_state          TEXT,
            new_state          TEXT NOT NULL,
            decision           TEXT,
            decision_date      TEXT,
            related_account_id TEXT REFERENCES accounts(account_id),
            deleted_at         TEXT,
            CHECK ((entity_type = 'institution' AND institution_id = entity_id AND subsidiary_id IS NULL)
                OR (entity_type = 'subsidiary' AND subsidiary_id = entity_id AND institution_id IS NULL))
        );
        "#,
    ],
};
