//! SQLite adapter: implementation of the patient and account repositories.
//!
//! # Schema
//!
//! - `accounts`: one row per login identity, secrets stored as Argon2id hashes
//! - `patients`: intake inputs plus the derived score and tier, which are kept
//!   only for filtering; records are re-assessed from their inputs on load
//!
//! `patients.assigned_doctor` references `accounts.username` with
//! `ON DELETE SET NULL`, so removing a doctor unassigns their patients.
//!
//! # Mutex Behavior
//!
//! The connection is protected by a `Mutex`. A poisoned mutex is reported as
//! `StorageError::LockPoisoned` for the current operation.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

use crate::domain::{
    Account, PatientIntake, PatientRecord, Questionnaire, RiskTier, Role, Sex,
};
use crate::ports::{
    CohortCounts, DoctorRepository, PatientFilter, PatientPage, PatientRepository, Repository,
};

/// Error type for storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Already exists: {0}")]
    Duplicate(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Corrupt stored data: {0}")]
    Corrupt(String),

    #[error("Database lock poisoned by a panicked thread")]
    LockPoisoned,
}

const PATIENT_COLUMNS: &str = "id, name, surname, assigned_doctor, age, height_m, weight_kg, \
     neck_circumference_cm, sex, snores_loudly, tired_during_day, observed_apnea, \
     treated_hypertension, updated_at";

/// SQLite storage adapter.
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    /// Open (or create) the database at `path`.
    ///
    /// # Errors
    /// Returns error if database cannot be opened or initialized.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        Self::from_connection(Connection::open(path)?)
    }

    /// Create an in-memory SQLite database (for testing).
    ///
    /// # Errors
    /// Returns error if database cannot be created.
    pub fn in_memory() -> Result<Self, StorageError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StorageError> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        let storage = Self {
            conn: Mutex::new(conn),
        };
        storage.init_schema()?;
        Ok(storage)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }

    fn init_schema(&self) -> Result<(), StorageError> {
        let conn = self.lock()?;

        conn.execute_batch(
            r"
            CREATE TABLE IF NOT EXISTS accounts (
                username TEXT PRIMARY KEY,
                password_hash TEXT NOT NULL,
                pin_hash TEXT NOT NULL,
                role TEXT NOT NULL CHECK (role IN ('patient', 'doctor')),
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS patients (
                id TEXT PRIMARY KEY,
                name TEXT,
                surname TEXT,
                assigned_doctor TEXT
                    REFERENCES accounts(username) ON DELETE SET NULL,
                age INTEGER,
                height_m REAL,
                weight_kg REAL,
                neck_circumference_cm REAL,
                sex TEXT CHECK (sex IN ('M', 'F')),
                snores_loudly INTEGER,
                tired_during_day INTEGER,
                observed_apnea INTEGER,
                treated_hypertension INTEGER,
                bmi REAL,
                stop_bang_score INTEGER NOT NULL,
                risk_tier TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_patients_doctor
                ON patients(assigned_doctor);
            ",
        )?;

        Ok(())
    }

    /// Map a primary-key violation to `Duplicate`, anything else to `Database`.
    fn insert_error(err: rusqlite::Error, key: &str) -> StorageError {
        match &err {
            rusqlite::Error::SqliteFailure(failure, _)
                if failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
            {
                StorageError::Duplicate(key.to_string())
            }
            _ => StorageError::Database(err),
        }
    }

    fn parse_timestamp(raw: &str, what: &str) -> Result<DateTime<Utc>, StorageError> {
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| StorageError::Corrupt(format!("{what} timestamp '{raw}': {e}")))
    }

    fn patient_params(record: &PatientRecord) -> [Value; 17] {
        fn text(value: Option<&str>) -> Value {
            value.map_or(Value::Null, |v| Value::Text(v.to_string()))
        }
        fn real(value: Option<f64>) -> Value {
            value.map_or(Value::Null, Value::Real)
        }
        fn flag(value: Option<bool>) -> Value {
            value.map_or(Value::Null, |v| Value::Integer(i64::from(v)))
        }

        let intake = record.intake();
        let answers = intake.questionnaire;
        [
            Value::Text(intake.id.clone()),
            text(intake.name.as_deref()),
            text(intake.surname.as_deref()),
            text(intake.assigned_doctor.as_deref()),
            intake.age.map_or(Value::Null, |age| Value::Integer(i64::from(age))),
            real(intake.height_m),
            real(intake.weight_kg),
            real(intake.neck_circumference_cm),
            text(intake.sex.as_ref().map(Sex::code)),
            flag(answers.snores_loudly),
            flag(answers.tired_during_day),
            flag(answers.observed_apnea),
            flag(answers.treated_hypertension),
            real(record.bmi()),
            Value::Integer(i64::from(record.stop_bang_score())),
            Value::Text(record.risk_tier().as_str().to_string()),
            Value::Text(record.updated_at().to_rfc3339()),
        ]
    }

    fn where_clause(filter: &PatientFilter) -> (String, Vec<Value>) {
        let mut clauses = Vec::new();
        let mut values = Vec::new();

        if let Some(id) = &filter.exact_id {
            clauses.push("id = ?");
            values.push(Value::Text(id.clone()));
        }
        if let Some(text) = &filter.text {
            clauses.push(
                r"(id LIKE ? ESCAPE '\' OR name LIKE ? ESCAPE '\' OR surname LIKE ? ESCAPE '\')",
            );
            let pattern = format!("%{}%", escape_like(text));
            for _ in 0..3 {
                values.push(Value::Text(pattern.clone()));
            }
        }
        if let Some(doctor) = &filter.assigned_doctor {
            clauses.push("assigned_doctor = ?");
            values.push(Value::Text(doctor.clone()));
        }
        if let Some(tier) = filter.risk_tier {
            clauses.push("risk_tier = ?");
            values.push(Value::Text(tier.as_str().to_string()));
        }
        if let Some(sex) = filter.sex {
            clauses.push("sex = ?");
            values.push(Value::Text(sex.code().to_string()));
        }

        if clauses.is_empty() {
            (String::new(), values)
        } else {
            (format!(" WHERE {}", clauses.join(" AND ")), values)
        }
    }
}

/// Escape LIKE wildcards so user text matches literally.
fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Row image of a patient, before re-assessment.
struct StoredPatient {
    intake: PatientIntake,
    sex: Option<String>,
    age: Option<i64>,
    updated_at: String,
}

impl StoredPatient {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let intake = PatientIntake {
            id: row.get(0)?,
            name: row.get(1)?,
            surname: row.get(2)?,
            assigned_doctor: row.get(3)?,
            age: None,
            height_m: row.get(5)?,
            weight_kg: row.get(6)?,
            neck_circumference_cm: row.get(7)?,
            sex: None,
            questionnaire: Questionnaire {
                snores_loudly: row.get(9)?,
                tired_during_day: row.get(10)?,
                observed_apnea: row.get(11)?,
                treated_hypertension: row.get(12)?,
            },
        };
        Ok(Self {
            intake,
            age: row.get(4)?,
            sex: row.get(8)?,
            updated_at: row.get(13)?,
        })
    }

    fn into_record(self) -> Result<PatientRecord, StorageError> {
        let id = self.intake.id.clone();
        self.assemble().inspect_err(|e| {
            tracing::debug!(patient_id = %id, "Unreadable patient row: {e}");
        })
    }

    // Error messages leave out the file number; it is only logged as a field.
    fn assemble(self) -> Result<PatientRecord, StorageError> {
        let mut intake = self.intake;

        intake.age = self
            .age
            .map(u32::try_from)
            .transpose()
            .map_err(|_| StorageError::Corrupt("stored patient age out of range".to_string()))?;
        intake.sex = match self.sex.as_deref() {
            None => None,
            Some(code) => Some(Sex::from_code(code).ok_or_else(|| {
                StorageError::Corrupt(format!("stored patient sex '{code}'"))
            })?),
        };

        let updated_at = SqliteStorage::parse_timestamp(&self.updated_at, "patient update")?;
        PatientRecord::assess_at(intake, updated_at)
            .map_err(|e| StorageError::Corrupt(format!("stored patient inputs: {e}")))
    }
}

/// Account columns as stored; role and creation time are checked afterwards.
struct StoredAccount {
    username: String,
    password_hash: String,
    pin_hash: String,
    role: String,
    created_at: String,
}

impl StoredAccount {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            username: row.get(0)?,
            password_hash: row.get(1)?,
            pin_hash: row.get(2)?,
            role: row.get(3)?,
            created_at: row.get(4)?,
        })
    }

    fn into_account(self) -> Result<Account, StorageError> {
        let role = Role::parse(&self.role)
            .ok_or_else(|| StorageError::Corrupt(format!("role '{}'", self.role)))?;
        let created_at = SqliteStorage::parse_timestamp(&self.created_at, "account creation")?;
        Ok(Account {
            username: self.username,
            password_hash: self.password_hash,
            pin_hash: self.pin_hash,
            role,
            created_at,
        })
    }
}

impl Repository for SqliteStorage {
    type Error = StorageError;
}

impl PatientRepository for SqliteStorage {
    fn insert_patient(&self, record: &PatientRecord) -> Result<(), Self::Error> {
        let conn = self.lock()?;

        conn.execute(
            &format!(
                "INSERT INTO patients ({PATIENT_COLUMNS}, bmi, stop_bang_score, risk_tier) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?17, ?14, ?15, ?16)"
            ),
            params_from_iter(Self::patient_params(record)),
        )
        .map_err(|e| Self::insert_error(e, record.id()))?;

        tracing::debug!(patient_id = record.id(), "Inserted patient");
        Ok(())
    }

    fn update_patient(&self, record: &PatientRecord) -> Result<(), Self::Error> {
        let conn = self.lock()?;

        let changed = conn.execute(
            r"
            UPDATE patients SET
                name = ?2, surname = ?3, assigned_doctor = ?4, age = ?5,
                height_m = ?6, weight_kg = ?7, neck_circumference_cm = ?8, sex = ?9,
                snores_loudly = ?10, tired_during_day = ?11, observed_apnea = ?12,
                treated_hypertension = ?13, bmi = ?14, stop_bang_score = ?15,
                risk_tier = ?16, updated_at = ?17
            WHERE id = ?1
            ",
            params_from_iter(Self::patient_params(record)),
        )?;

        if changed == 0 {
            return Err(StorageError::NotFound(format!("patient {}", record.id())));
        }

        tracing::debug!(patient_id = record.id(), "Updated patient");
        Ok(())
    }

    fn load_patient(&self, id: &str) -> Result<Option<PatientRecord>, Self::Error> {
        let conn = self.lock()?;

        let stored = conn
            .query_row(
                &format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE id = ?1"),
                params![id],
                StoredPatient::from_row,
            )
            .optional()?;

        stored.map(StoredPatient::into_record).transpose()
    }

    fn delete_patient(&self, id: &str) -> Result<bool, Self::Error> {
        let conn = self.lock()?;
        let changed = conn.execute("DELETE FROM patients WHERE id = ?1", params![id])?;
        tracing::debug!(patient_id = id, deleted = changed > 0, "Delete patient");
        Ok(changed > 0)
    }

    fn search_patients(
        &self,
        filter: &PatientFilter,
        offset: usize,
        limit: usize,
    ) -> Result<PatientPage, Self::Error> {
        let conn = self.lock()?;
        let (where_sql, mut values) = Self::where_clause(filter);

        let total_count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM patients{where_sql}"),
            params_from_iter(values.iter()),
            |row| row.get(0),
        )?;

        values.push(Value::Integer(i64::try_from(limit).unwrap_or(i64::MAX)));
        values.push(Value::Integer(i64::try_from(offset).unwrap_or(i64::MAX)));

        let mut stmt = conn.prepare(&format!(
            "SELECT {PATIENT_COLUMNS} FROM patients{where_sql} ORDER BY id LIMIT ? OFFSET ?"
        ))?;

        let stored = stmt
            .query_map(params_from_iter(values.iter()), StoredPatient::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        let items = stored
            .into_iter()
            .map(StoredPatient::into_record)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(PatientPage::new(
            items,
            usize::try_from(total_count).unwrap_or(0),
            offset,
            limit,
        ))
    }

    fn cohort_counts(&self, doctor: &str) -> Result<CohortCounts, Self::Error> {
        let conn = self.lock()?;
        let mut counts = CohortCounts::default();

        let mut stmt = conn.prepare(
            "SELECT risk_tier, COUNT(*) FROM patients WHERE assigned_doctor = ?1 GROUP BY risk_tier",
        )?;
        let tiers = stmt
            .query_map(params![doctor], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        for (tier, count) in tiers {
            let count = usize::try_from(count).unwrap_or(0);
            match RiskTier::parse(&tier) {
                Some(RiskTier::Low) => counts.low += count,
                Some(RiskTier::Intermediate) => counts.intermediate += count,
                Some(RiskTier::High) => counts.high += count,
                None => return Err(StorageError::Corrupt(format!("risk tier '{tier}'"))),
            }
        }

        let mut stmt = conn.prepare(
            "SELECT sex, COUNT(*) FROM patients WHERE assigned_doctor = ?1 GROUP BY sex",
        )?;
        let sexes = stmt
            .query_map(params![doctor], |row| {
                Ok((row.get::<_, Option<String>>(0)?, row.get::<_, i64>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        for (sex, count) in sexes {
            let count = usize::try_from(count).unwrap_or(0);
            match sex.as_deref().and_then(Sex::from_code) {
                Some(Sex::Male) => counts.male += count,
                Some(Sex::Female) => counts.female += count,
                None => counts.unspecified_sex += count,
            }
        }

        Ok(counts)
    }

    fn count_patients(&self) -> Result<usize, Self::Error> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM patients", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}

impl DoctorRepository for SqliteStorage {
    fn insert_account(&self, account: &Account) -> Result<(), Self::Error> {
        let conn = self.lock()?;

        conn.execute(
            r"
            INSERT INTO accounts (username, password_hash, pin_hash, role, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ",
            params![
                account.username,
                account.password_hash,
                account.pin_hash,
                account.role.as_str(),
                account.created_at.to_rfc3339(),
            ],
        )
        .map_err(|e| Self::insert_error(e, &account.username))?;

        tracing::info!(role = %account.role, "Stored new account");
        Ok(())
    }

    fn load_account(&self, username: &str) -> Result<Option<Account>, Self::Error> {
        let conn = self.lock()?;

        let row = conn
            .query_row(
                r"
                SELECT username, password_hash, pin_hash, role, created_at
                FROM accounts WHERE username = ?1
                ",
                params![username],
                StoredAccount::from_row,
            )
            .optional()?;

        row.map(StoredAccount::into_account).transpose()
    }

    fn update_password_hash(&self, username: &str, password_hash: &str) -> Result<(), Self::Error> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE accounts SET password_hash = ?2 WHERE username = ?1",
            params![username, password_hash],
        )?;
        if changed == 0 {
            return Err(StorageError::NotFound(format!("account {username}")));
        }
        Ok(())
    }

    fn delete_account(&self, username: &str) -> Result<bool, Self::Error> {
        let conn = self.lock()?;
        let changed = conn.execute("DELETE FROM accounts WHERE username = ?1", params![username])?;
        if changed > 0 {
            tracing::info!("Deleted account; assigned patients are now unassigned");
        }
        Ok(changed > 0)
    }

    fn list_accounts(&self, role: Role) -> Result<Vec<String>, Self::Error> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT username FROM accounts WHERE role = ?1 ORDER BY username")?;
        let names = stmt
            .query_map(params![role.as_str()], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(names)
    }
}
