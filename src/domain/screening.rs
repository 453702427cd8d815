//! STOP-BANG risk assessment for obstructive sleep apnea.
//!
//! Derives the body mass index, the STOP-BANG point tally and the risk tier
//! from a patient's anthropometrics and questionnaire answers. The engine is
//! pure: no I/O, no access to other records, same input gives same output.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::patient::Questionnaire;

/// Age strictly above this awards the age point.
pub const AGE_THRESHOLD_YEARS: u32 = 50;

/// BMI (after rounding) strictly above this awards the BMI point.
pub const BMI_THRESHOLD: f64 = 35.0;

/// Neck circumference strictly above this awards the neck point.
pub const NECK_THRESHOLD_CM: f64 = 40.0;

/// Number of criteria evaluated (7 of the 8 canonical STOP-BANG items; sex is not scored).
pub const MAX_STOP_BANG_SCORE: u8 = 7;

/// Guards that keep the engine from producing a wrong number.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ComputationError {
    #[error("Height must be a positive number of meters, got {0}")]
    NonPositiveHeight(f64),

    #[error("Weight must be a non-negative number of kilograms, got {0}")]
    InvalidWeight(f64),

    #[error("Neck circumference must be a finite number of centimeters, got {0}")]
    InvalidNeckCircumference(f64),

    #[error("Body mass index is not finite for height {height} m and weight {weight} kg")]
    NonFiniteBmi { height: f64, weight: f64 },
}

/// OSA risk tier derived from the STOP-BANG score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    /// Score 0-1
    Low,
    /// Score 2-3
    Intermediate,
    /// Score 4 or more
    High,
}

impl RiskTier {
    /// All tiers, lowest first.
    pub const ALL: [RiskTier; 3] = [RiskTier::Low, RiskTier::Intermediate, RiskTier::High];

    /// Classify a STOP-BANG score.
    #[must_use]
    pub fn from_score(score: u8) -> Self {
        match score {
            0..=1 => Self::Low,
            2..=3 => Self::Intermediate,
            _ => Self::High,
        }
    }

    /// Human-readable label shown to patients and on passes.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Low => "Low risk of OSA",
            Self::Intermediate => "Intermediate risk of OSA",
            Self::High => "High risk of OSA",
        }
    }

    /// Stable key used in storage.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Intermediate => "intermediate",
            Self::High => "high",
        }
    }

    /// Parse a storage key.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            "intermediate" => Some(Self::Intermediate),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

impl std::fmt::Display for RiskTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "LOW"),
            Self::Intermediate => write!(f, "INTERMEDIATE"),
            Self::High => write!(f, "HIGH"),
        }
    }
}

/// A single STOP-BANG criterion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    Age,
    Snoring,
    Tiredness,
    ObservedApnea,
    Hypertension,
    BodyMassIndex,
    NeckCircumference,
}

impl Criterion {
    /// Evaluation order.
    pub const ALL: [Criterion; 7] = [
        Criterion::Age,
        Criterion::Snoring,
        Criterion::Tiredness,
        Criterion::ObservedApnea,
        Criterion::Hypertension,
        Criterion::BodyMassIndex,
        Criterion::NeckCircumference,
    ];

    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Age => "Age over 50",
            Self::Snoring => "Loud snoring",
            Self::Tiredness => "Daytime tiredness",
            Self::ObservedApnea => "Observed apnea",
            Self::Hypertension => "Treated high blood pressure",
            Self::BodyMassIndex => "BMI over 35",
            Self::NeckCircumference => "Neck over 40 cm",
        }
    }

    fn is_met(self, input: &ScreeningInput, bmi: Option<f64>) -> bool {
        let answers = &input.questionnaire;
        match self {
            Self::Age => input.age.is_some_and(|age| age > AGE_THRESHOLD_YEARS),
            Self::Snoring => answers.snores_loudly == Some(true),
            Self::Tiredness => answers.tired_during_day == Some(true),
            Self::ObservedApnea => answers.observed_apnea == Some(true),
            Self::Hypertension => answers.treated_hypertension == Some(true),
            Self::BodyMassIndex => bmi.is_some_and(|bmi| bmi > BMI_THRESHOLD),
            Self::NeckCircumference => input
                .neck_circumference_cm
                .is_some_and(|neck| neck > NECK_THRESHOLD_CM),
        }
    }
}

/// The fields of a patient record the engine reads.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScreeningInput {
    pub age: Option<u32>,
    pub height_m: Option<f64>,
    pub weight_kg: Option<f64>,
    pub neck_circumference_cm: Option<f64>,
    pub questionnaire: Questionnaire,
}

/// Derived values of one assessment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assessment {
    bmi: Option<f64>,
    stop_bang_score: u8,
    risk_tier: RiskTier,
    criteria: Vec<Criterion>,
}

impl Assessment {
    /// Body mass index rounded to two decimals, absent without height and weight.
    #[must_use]
    pub fn bmi(&self) -> Option<f64> {
        self.bmi
    }

    #[must_use]
    pub fn stop_bang_score(&self) -> u8 {
        self.stop_bang_score
    }

    #[must_use]
    pub fn risk_tier(&self) -> RiskTier {
        self.risk_tier
    }

    /// Criteria that awarded a point, in evaluation order.
    #[must_use]
    pub fn criteria(&self) -> &[Criterion] {
        &self.criteria
    }
}

/// Run the three assessment steps: BMI, point tally, tier.
///
/// # Errors
/// Returns `ComputationError` for a non-positive height, a negative weight,
/// a non-finite measurement or a BMI that overflows. Absent values never fail.
pub fn assess(input: &ScreeningInput) -> Result<Assessment, ComputationError> {
    let bmi = body_mass_index(input.height_m, input.weight_kg)?;

    if let Some(neck) = input.neck_circumference_cm {
        if !neck.is_finite() {
            return Err(ComputationError::InvalidNeckCircumference(neck));
        }
    }

    let criteria: Vec<Criterion> = Criterion::ALL
        .into_iter()
        .filter(|criterion| criterion.is_met(input, bmi))
        .collect();

    // At most 7 entries.
    let stop_bang_score = criteria.len() as u8;

    Ok(Assessment {
        bmi,
        stop_bang_score,
        risk_tier: RiskTier::from_score(stop_bang_score),
        criteria,
    })
}

/// BMI = weight / height², rounded to two decimals.
///
/// Returns `Ok(None)` unless both measurements are present.
///
/// # Errors
/// A present height must be finite and strictly positive; a present weight
/// must be finite and non-negative.
pub fn body_mass_index(
    height_m: Option<f64>,
    weight_kg: Option<f64>,
) -> Result<Option<f64>, ComputationError> {
    if let Some(height) = height_m {
        if !(height.is_finite() && height > 0.0) {
            return Err(ComputationError::NonPositiveHeight(height));
        }
    }
    if let Some(weight) = weight_kg {
        if !(weight.is_finite() && weight >= 0.0) {
            return Err(ComputationError::InvalidWeight(weight));
        }
    }

    let (Some(height), Some(weight)) = (height_m, weight_kg) else {
        return Ok(None);
    };

    let raw = weight / (height * height);
    if !raw.is_finite() {
        return Err(ComputationError::NonFiniteBmi { height, weight });
    }

    Ok(Some(round_to_hundredths(raw)))
}

/// Round the exact binary value to two decimals, ties to even.
///
/// Formatting with a fixed precision is exact in Rust, so this matches
/// correctly rounded decimal rounding rather than `(x * 100).round() / 100`,
/// which double-rounds.
fn round_to_hundredths(value: f64) -> f64 {
    format!("{value:.2}").parse().unwrap_or(value)
}
