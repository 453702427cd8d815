//! Patient records for OSA screening.
//!
//! A `PatientIntake` is what a form or an import line supplies. A
//! `PatientRecord` is an intake that has been through the screening engine;
//! its derived values can only come from `PatientRecord::assess`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::screening::{self, Assessment, ComputationError, RiskTier, ScreeningInput};

/// Maximum length of a patient file number.
pub const MAX_ID_LEN: usize = 20;

/// Maximum length of a first name or surname.
pub const MAX_NAME_LEN: usize = 50;

/// Biological sex as recorded on intake. Not scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sex {
    #[serde(rename = "M", alias = "male")]
    Male,
    #[serde(rename = "F", alias = "female")]
    Female,
}

impl Sex {
    /// Storage code, `M` or `F`.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Male => "M",
            Self::Female => "F",
        }
    }

    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "M" | "m" => Some(Self::Male),
            "F" | "f" => Some(Self::Female),
            _ => None,
        }
    }

    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Male => "Male",
            Self::Female => "Female",
        }
    }
}

/// The four self-reported STOP-BANG questions.
///
/// `None` means unanswered. Intake requires every answer; storage does not.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Questionnaire {
    pub snores_loudly: Option<bool>,
    pub tired_during_day: Option<bool>,
    pub observed_apnea: Option<bool>,
    pub treated_hypertension: Option<bool>,
}

impl Questionnaire {
    /// Full question text, shown as intake form hints, in field order.
    pub const PROMPTS: [&'static str; 4] = [
        "Do you snore loudly (louder than talking or heard through a closed door)?",
        "Do you often feel tired, fatigued or sleepy during the day?",
        "Has anyone observed you stop breathing during your sleep?",
        "Are you being treated for high blood pressure?",
    ];

    /// Short labels, in field order.
    pub const LABELS: [&'static str; 4] = [
        "Snores loudly",
        "Tired during the day",
        "Observed apnea",
        "Treated hypertension",
    ];

    /// A fully answered questionnaire.
    #[must_use]
    pub fn answered(snores: bool, tired: bool, observed: bool, hypertension: bool) -> Self {
        Self {
            snores_loudly: Some(snores),
            tired_during_day: Some(tired),
            observed_apnea: Some(observed),
            treated_hypertension: Some(hypertension),
        }
    }

    /// Answers in field order.
    #[must_use]
    pub fn answers(&self) -> [Option<bool>; 4] {
        [
            self.snores_loudly,
            self.tired_during_day,
            self.observed_apnea,
            self.treated_hypertension,
        ]
    }

    /// Labels of the questions left unanswered.
    #[must_use]
    pub fn unanswered(&self) -> Vec<&'static str> {
        self.answers()
            .iter()
            .zip(Self::LABELS)
            .filter(|(answer, _)| answer.is_none())
            .map(|(_, label)| label)
            .collect()
    }
}

/// Patient data as entered, before assessment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatientIntake {
    /// File number, externally assigned and immutable once stored
    pub id: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub surname: Option<String>,

    /// Username of the doctor following this patient
    #[serde(default)]
    pub assigned_doctor: Option<String>,

    #[serde(default)]
    pub age: Option<u32>,

    #[serde(default)]
    pub height_m: Option<f64>,

    #[serde(default)]
    pub weight_kg: Option<f64>,

    #[serde(default)]
    pub neck_circumference_cm: Option<f64>,

    #[serde(default)]
    pub sex: Option<Sex>,

    #[serde(flatten)]
    pub questionnaire: Questionnaire,
}

impl PatientIntake {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Trim text fields and turn blank optional text into `None`.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        fn blank_to_none(value: Option<String>) -> Option<String> {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        }

        self.id = self.id.trim().to_string();
        self.name = blank_to_none(self.name);
        self.surname = blank_to_none(self.surname);
        self.assigned_doctor = blank_to_none(self.assigned_doctor);
        self
    }

    /// The subset the screening engine reads.
    #[must_use]
    pub fn screening_input(&self) -> ScreeningInput {
        ScreeningInput {
            age: self.age,
            height_m: self.height_m,
            weight_kg: self.weight_kg,
            neck_circumference_cm: self.neck_circumference_cm,
            questionnaire: self.questionnaire,
        }
    }

    /// Data-entry validation. Reports every problem, not just the first.
    ///
    /// # Errors
    /// Returns validation errors as a vector of strings.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        let id = self.id.trim();
        if id.is_empty() {
            errors.push("File number is required".to_string());
        } else if id.chars().count() > MAX_ID_LEN {
            errors.push(format!("File number must be at most {MAX_ID_LEN} characters"));
        }

        for (label, value) in [("Name", &self.name), ("Surname", &self.surname)] {
            if let Some(value) = value {
                if value.chars().count() > MAX_NAME_LEN {
                    errors.push(format!("{label} must be at most {MAX_NAME_LEN} characters"));
                }
            }
        }

        for (label, value) in [
            ("Height", self.height_m),
            ("Weight", self.weight_kg),
            ("Neck circumference", self.neck_circumference_cm),
        ] {
            if let Some(value) = value {
                if !(value.is_finite() && value > 0.0) {
                    errors.push(format!("{label} {value} must be a positive number"));
                }
            }
        }

        for label in self.questionnaire.unanswered() {
            errors.push(format!("Question '{label}' must be answered"));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// A patient intake together with its assessment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatientRecord {
    #[serde(flatten)]
    intake: PatientIntake,

    #[serde(flatten)]
    assessment: Assessment,

    updated_at: DateTime<Utc>,
}

impl PatientRecord {
    /// Assess an intake, stamping the current time.
    ///
    /// # Errors
    /// Propagates engine guard failures.
    pub fn assess(intake: PatientIntake) -> Result<Self, ComputationError> {
        Self::assess_at(intake, Utc::now())
    }

    /// Assess an intake with an explicit timestamp (used when reloading).
    ///
    /// # Errors
    /// Propagates engine guard failures.
    pub fn assess_at(
        intake: PatientIntake,
        updated_at: DateTime<Utc>,
    ) -> Result<Self, ComputationError> {
        let assessment = screening::assess(&intake.screening_input())?;
        Ok(Self {
            assessment,
            intake,
            updated_at,
        })
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.intake.id
    }

    #[must_use]
    pub fn intake(&self) -> &PatientIntake {
        &self.intake
    }

    #[must_use]
    pub fn into_intake(self) -> PatientIntake {
        self.intake
    }

    #[must_use]
    pub fn assessment(&self) -> &Assessment {
        &self.assessment
    }

    #[must_use]
    pub fn bmi(&self) -> Option<f64> {
        self.assessment.bmi()
    }

    #[must_use]
    pub fn stop_bang_score(&self) -> u8 {
        self.assessment.stop_bang_score()
    }

    #[must_use]
    pub fn risk_tier(&self) -> RiskTier {
        self.assessment.risk_tier()
    }

    #[must_use]
    pub fn assigned_doctor(&self) -> Option<&str> {
        self.intake.assigned_doctor.as_deref()
    }

    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// "Name Surname", or an empty string when neither is known.
    #[must_use]
    pub fn full_name(&self) -> String {
        [self.intake.name.as_deref(), self.intake.surname.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl std::fmt::Display for PatientRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = self.full_name();
        if name.is_empty() {
            write!(f, "{}", self.id())
        } else {
            write!(f, "{} - {}", self.id(), name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_intake() -> PatientIntake {
        PatientIntake {
            id: "EXP-0042".to_string(),
            name: Some("Ana".to_string()),
            surname: Some("Lopez".to_string()),
            assigned_doctor: None,
            age: Some(55),
            height_m: Some(1.70),
            weight_kg: Some(110.0),
            neck_circumference_cm: Some(42.0),
            sex: Some(Sex::Female),
            questionnaire: Questionnaire::answered(true, false, true, false),
        }
    }

    #[test]
    fn test_valid_intake() {
        assert!(sample_intake().validate().is_ok());
    }

    #[test]
    fn test_validation_reports_every_problem() {
        let intake = PatientIntake {
            id: "   ".to_string(),
            name: Some("x".repeat(MAX_NAME_LEN + 1)),
            height_m: Some(0.0),
            weight_kg: Some(-4.0),
            ..Default::default()
        };

        let errors = intake.validate().expect_err("Should reject");
        assert!(errors.iter().any(|e| e.contains("File number is required")));
        assert!(errors.iter().any(|e| e.starts_with("Name")));
        assert!(errors.iter().any(|e| e.starts_with("Height")));
        assert!(errors.iter().any(|e| e.starts_with("Weight")));
        assert_eq!(
            errors.iter().filter(|e| e.starts_with("Question")).count(),
            4
        );
    }

    #[test]
    fn test_id_length_limit() {
        let mut intake = sample_intake();
        intake.id = "A".repeat(MAX_ID_LEN);
        assert!(intake.validate().is_ok());

        intake.id = "A".repeat(MAX_ID_LEN + 1);
        assert!(intake.validate().is_err());
    }

    #[test]
    fn test_normalized_trims_and_blanks() {
        let intake = PatientIntake {
            id: "  A-1 ".to_string(),
            name: Some("  ".to_string()),
            surname: Some(" Ruiz ".to_string()),
            assigned_doctor: Some(String::new()),
            ..Default::default()
        }
        .normalized();

        assert_eq!(intake.id, "A-1");
        assert_eq!(intake.name, None);
        assert_eq!(intake.surname.as_deref(), Some("Ruiz"));
        assert_eq!(intake.assigned_doctor, None);
    }

    #[test]
    fn test_record_derives_from_inputs() {
        let record = PatientRecord::assess(sample_intake()).expect("Should assess");
        assert_eq!(record.bmi(), Some(38.06));
        assert_eq!(record.stop_bang_score(), 5);
        assert_eq!(record.risk_tier(), RiskTier::High);
        assert_eq!(record.assessment().stop_bang_score(), 5);
        assert_eq!(record.to_string(), "EXP-0042 - Ana Lopez");
    }

    #[test]
    fn test_record_serializes_derived_fields() {
        let record = PatientRecord::assess(sample_intake()).expect("Should assess");
        let json = serde_json::to_value(&record).expect("Should serialize");
        assert_eq!(json["id"], "EXP-0042");
        assert_eq!(json["stop_bang_score"], 5);
        assert_eq!(json["risk_tier"], "high");
        assert_eq!(json["sex"], "F");
        assert_eq!(json["snores_loudly"], true);
        assert_eq!(json["criteria"][0], "age");
    }

    #[test]
    fn test_intake_from_flat_json() {
        let line = r#"{"id":"B7","age":62,"sex":"M","snores_loudly":true,
            "tired_during_day":false,"observed_apnea":false,"treated_hypertension":true}"#;
        let intake: PatientIntake = serde_json::from_str(line).expect("Should parse");
        assert_eq!(intake.id, "B7");
        assert_eq!(intake.sex, Some(Sex::Male));
        assert_eq!(intake.height_m, None);
        assert_eq!(intake.questionnaire.treated_hypertension, Some(true));
        assert!(intake.validate().is_ok());
    }

    #[test]
    fn test_sex_codes() {
        assert_eq!(Sex::from_code("M"), Some(Sex::Male));
        assert_eq!(Sex::from_code("f"), Some(Sex::Female));
        assert_eq!(Sex::from_code("X"), None);
        assert_eq!(Sex::Female.code(), "F");
    }
}
