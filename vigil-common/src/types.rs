//! Domain types shared by the game engine and the HTTP server

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Screened condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Disease {
    Parkinson,
    Dementia,
    Vision,
}

impl Disease {
    pub const ALL: [Disease; 3] = [Disease::Parkinson, Disease::Dementia, Disease::Vision];

    pub fn as_str(&self) -> &'static str {
        match self {
            Disease::Parkinson => "parkinson",
            Disease::Dementia => "dementia",
            Disease::Vision => "vision",
        }
    }

    pub fn parse(s: &str) -> Option<Disease> {
        match s {
            "parkinson" => Some(Disease::Parkinson),
            "dementia" => Some(Disease::Dementia),
            "vision" => Some(Disease::Vision),
            _ => None,
        }
    }
}

impl std::fmt::Display for Disease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Run mode: a timed test producing a tri-state signal, or open-ended practice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionMode {
    Detection,
    Therapy,
}

impl SessionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionMode::Detection => "detection",
            SessionMode::Therapy => "therapy",
        }
    }

    pub fn parse(s: &str) -> Option<SessionMode> {
        match s {
            "detection" => Some(SessionMode::Detection),
            "therapy" => Some(SessionMode::Therapy),
            _ => None,
        }
    }
}

impl std::fmt::Display for SessionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse traffic-light screening signal for detection runs.
///
/// This is a screening aid, not a calibrated clinical score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Signal {
    Green,
    Yellow,
    Red,
}

impl Signal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::Green => "Green",
            Signal::Yellow => "Yellow",
            Signal::Red => "Red",
        }
    }

    /// A Yellow or Red detection result routes the elder towards therapy.
    pub fn needs_therapy(&self) -> bool {
        !matches!(self, Signal::Green)
    }
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result string for completed therapy runs
pub const THERAPY_COMPLETED: &str = "completed";

/// Motor (tap test / reaction probe) metrics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParkinsonMetrics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub taps_per_second: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_taps: Option<u32>,
    /// Elapsed time in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<f64>,
}

/// Memory (n-back / pair matching) metrics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DementiaMetrics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_answers: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempts: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level_reached: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grid_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mistakes: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<f64>,
}

/// Vision (shape matching / perceptual staircase) metrics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisionMetrics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_answers: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempts: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_threshold: Option<i32>,
}

/// Disease-specific metrics payload; exactly one branch is populated per
/// session, keyed by the session's disease type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionMetrics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parkinson: Option<ParkinsonMetrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dementia: Option<DementiaMetrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vision: Option<VisionMetrics>,
}

impl SessionMetrics {
    pub fn parkinson(m: ParkinsonMetrics) -> Self {
        Self { parkinson: Some(m), ..Default::default() }
    }

    pub fn dementia(m: DementiaMetrics) -> Self {
        Self { dementia: Some(m), ..Default::default() }
    }

    pub fn vision(m: VisionMetrics) -> Self {
        Self { vision: Some(m), ..Default::default() }
    }
}

/// One completed test or therapy run. Append-only: created once at the end of
/// a run, never updated or deleted by normal flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameSession {
    pub guid: String,
    pub elder_guid: String,
    pub disease_type: Disease,
    pub mode: SessionMode,
    pub result: String,
    pub metrics: SessionMetrics,
    pub created_at: DateTime<Utc>,
}

/// Body-mass-index category bands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BmiStatus {
    Underweight,
    Normal,
    Overweight,
}

impl BmiStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BmiStatus::Underweight => "Underweight",
            BmiStatus::Normal => "Normal",
            BmiStatus::Overweight => "Overweight",
        }
    }
}

impl std::fmt::Display for BmiStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derive BMI (rounded to one decimal) and category from height in cm and
/// weight in kg. Returns None for non-positive inputs.
pub fn derive_bmi(height_cm: f64, weight_kg: f64) -> Option<(f64, BmiStatus)> {
    if height_cm <= 0.0 || weight_kg <= 0.0 {
        return None;
    }
    let h_m = height_cm / 100.0;
    let bmi = (weight_kg / (h_m * h_m) * 10.0).round() / 10.0;
    let status = if bmi < 18.5 {
        BmiStatus::Underweight
    } else if bmi < 25.0 {
        BmiStatus::Normal
    } else {
        BmiStatus::Overweight
    };
    Some((bmi, status))
}

/// A periodic self-reported health snapshot tied to one elder
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Questionnaire {
    pub guid: String,
    pub elder_guid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caregiver_guid: Option<String>,
    pub height: f64,
    pub weight: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blood_pressure: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heart_rate: Option<f64>,
    pub breaths_per_min: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub physical_activity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sleep_hours: Option<f64>,
    pub stress_level: i64,
    pub bmi: f64,
    pub bmi_status: String,
    /// Whether the submission carried a verified elder credential
    pub authenticated: bool,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disease_round_trips_through_wire_names() {
        for d in Disease::ALL {
            assert_eq!(Disease::parse(d.as_str()), Some(d));
        }
        assert_eq!(Disease::parse("cardiac"), None);
    }

    #[test]
    fn signal_routing() {
        assert!(!Signal::Green.needs_therapy());
        assert!(Signal::Yellow.needs_therapy());
        assert!(Signal::Red.needs_therapy());
    }

    #[test]
    fn bmi_normal_band() {
        let (bmi, status) = derive_bmi(170.0, 70.0).unwrap();
        assert_eq!(bmi, 24.2);
        assert_eq!(status, BmiStatus::Normal);
    }

    #[test]
    fn bmi_band_edges() {
        // 18.5 is the lower edge of Normal
        let (bmi, status) = derive_bmi(200.0, 74.0).unwrap();
        assert_eq!(bmi, 18.5);
        assert_eq!(status, BmiStatus::Normal);

        let (_, status) = derive_bmi(200.0, 73.0).unwrap();
        assert_eq!(status, BmiStatus::Underweight);

        let (_, status) = derive_bmi(170.0, 75.0).unwrap();
        assert_eq!(status, BmiStatus::Overweight);
    }

    #[test]
    fn bmi_rejects_degenerate_input() {
        assert!(derive_bmi(0.0, 70.0).is_none());
        assert!(derive_bmi(170.0, -1.0).is_none());
    }

    #[test]
    fn metrics_serialize_with_camel_case_keys() {
        let m = SessionMetrics::dementia(DementiaMetrics {
            correct_answers: Some(7),
            attempts: Some(9),
            level_reached: Some(2),
            ..Default::default()
        });
        let v = serde_json::to_value(&m).unwrap();
        assert_eq!(v["dementia"]["correctAnswers"], 7);
        assert_eq!(v["dementia"]["levelReached"], 2);
        assert!(v.get("vision").is_none());
    }
}
