//! Single-record prediction input and result.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Valid range of one prediction field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldRange {
    /// Wire name of the field.
    pub field: &'static str,
    /// Inclusive lower bound.
    pub min: f64,
    /// Inclusive upper bound; `None` means unbounded.
    pub max: Option<f64>,
}

impl FieldRange {
    const fn bounded(field: &'static str, min: f64, max: f64) -> Self {
        Self {
            field,
            min,
            max: Some(max),
        }
    }

    const fn at_least(field: &'static str, min: f64) -> Self {
        Self {
            field,
            min,
            max: None,
        }
    }

    /// Returns true if `value` lies in the range.
    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        value.is_finite() && value >= self.min && self.max.map_or(true, |max| value <= max)
    }

    fn describe(&self) -> String {
        match self.max {
            Some(max) => format!("between {} and {}", self.min, max),
            None => format!("at least {}", self.min),
        }
    }
}

/// Field ranges in form order.
pub const PREDICTION_FIELD_RANGES: [FieldRange; 9] = [
    FieldRange::bounded("promedio_actual", 0.0, 10.0),
    FieldRange::bounded("asistencia_clases", 0.0, 100.0),
    FieldRange::bounded("tareas_entregadas", 0.0, 100.0),
    FieldRange::bounded("participacion_clase", 0.0, 10.0),
    FieldRange::bounded("horas_estudio", 0.0, 24.0),
    FieldRange::bounded("promedio_evaluaciones", 0.0, 10.0),
    FieldRange::at_least("cursos_reprobados", 0.0),
    FieldRange::at_least("actividades_extracurriculares", 0.0),
    FieldRange::at_least("reportes_disciplinarios", 0.0),
];

/// A field that failed range validation.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldViolation {
    /// The violated range.
    pub range: FieldRange,
    /// The rejected value.
    pub value: f64,
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} must be {} (got {})",
            self.range.field,
            self.range.describe(),
            self.value
        )
    }
}

/// Features of one student, as submitted for inference.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictionInput {
    /// Current grade average (0–10).
    #[serde(rename = "promedio_actual")]
    pub current_average: f64,
    /// Class attendance percentage (0–100).
    #[serde(rename = "asistencia_clases")]
    pub class_attendance: f64,
    /// Assignments handed in, as a percentage (0–100).
    #[serde(rename = "tareas_entregadas")]
    pub assignments_submitted: f64,
    /// Class participation level (0–10).
    #[serde(rename = "participacion_clase")]
    pub class_participation: f64,
    /// Daily study hours (0–24).
    #[serde(rename = "horas_estudio")]
    pub study_hours: f64,
    /// Assessment average (0–10).
    #[serde(rename = "promedio_evaluaciones")]
    pub assessment_average: f64,
    /// Number of failed courses.
    #[serde(rename = "cursos_reprobados")]
    pub failed_courses: f64,
    /// Number of extracurricular activities.
    #[serde(rename = "actividades_extracurriculares")]
    pub extracurricular_activities: f64,
    /// Number of disciplinary reports.
    #[serde(rename = "reportes_disciplinarios")]
    pub disciplinary_reports: f64,
}

impl PredictionInput {
    /// Field values paired with their ranges, in form order.
    #[must_use]
    pub fn fields(&self) -> [(FieldRange, f64); 9] {
        let [r0, r1, r2, r3, r4, r5, r6, r7, r8] = PREDICTION_FIELD_RANGES;
        [
            (r0, self.current_average),
            (r1, self.class_attendance),
            (r2, self.assignments_submitted),
            (r3, self.class_participation),
            (r4, self.study_hours),
            (r5, self.assessment_average),
            (r6, self.failed_courses),
            (r7, self.extracurricular_activities),
            (r8, self.disciplinary_reports),
        ]
    }

    /// Every field outside its range.
    #[must_use]
    pub fn violations(&self) -> Vec<FieldViolation> {
        self.fields()
            .into_iter()
            .filter(|(range, value)| !range.contains(*value))
            .map(|(range, value)| FieldViolation { range, value })
            .collect()
    }

    /// Checks every field against its range.
    ///
    /// # Errors
    ///
    /// Returns a message listing every out-of-range field.
    pub fn validate(&self) -> Result<(), String> {
        let violations = self.violations();
        if violations.is_empty() {
            return Ok(());
        }
        let details: Vec<String> = violations.iter().map(ToString::to_string).collect();
        Err(format!("Please enter valid values: {}", details.join("; ")))
    }
}

/// Outcome of one inference call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Predicted class: 1 = at risk, 0 = not at risk.
    pub prediction: u8,
    /// Human-readable label mirroring the class.
    #[serde(default, alias = "prediction_label")]
    pub prediction_meaning: String,
    /// Probability of the at-risk class, if the model reports one.
    #[serde(default)]
    pub probability_riesgo: Option<f64>,
}

impl PredictionResult {
    /// Returns true if the student is predicted to be at risk.
    #[must_use]
    pub fn is_at_risk(&self) -> bool {
        self.prediction == 1
    }

    /// The label, derived from the class when the service omitted it.
    #[must_use]
    pub fn label(&self) -> &str {
        if !self.prediction_meaning.is_empty() {
            &self.prediction_meaning
        } else if self.is_at_risk() {
            "riesgo"
        } else {
            "no riesgo"
        }
    }

    /// Builds the display assessment for this result.
    #[must_use]
    pub fn assessment(&self) -> RiskAssessment {
        RiskAssessment::from_result(self)
    }
}

/// Coarse risk level shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    /// Predicted at risk.
    High,
    /// Predicted not at risk.
    Low,
}

/// Display figures derived from a [`PredictionResult`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// Risk level.
    pub level: RiskLevel,
    /// Short headline.
    pub headline: String,
    /// Sentence with the probability and a recommendation.
    pub detail: String,
}

impl RiskAssessment {
    /// Derives the assessment from a prediction.
    #[must_use]
    pub fn from_result(result: &PredictionResult) -> Self {
        let risk_percent = result.probability_riesgo.map(|p| p * 100.0);
        if result.is_at_risk() {
            let detail = risk_percent.map_or_else(
                || "Intervention is recommended.".to_string(),
                |p| format!("Risk probability: {p:.2}%. Intervention is recommended."),
            );
            Self {
                level: RiskLevel::High,
                headline: "HIGH RISK".to_string(),
                detail,
            }
        } else {
            let detail = risk_percent.map_or_else(
                || "Performance is projected to be on track.".to_string(),
                |p| {
                    format!(
                        "Success probability: {:.2}%. Performance is projected to be on track.",
                        100.0 - p
                    )
                },
            );
            Self {
                level: RiskLevel::Low,
                headline: "LOW RISK".to_string(),
                detail,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_input() -> PredictionInput {
        PredictionInput {
            current_average: 7.5,
            class_attendance: 92.0,
            assignments_submitted: 88.0,
            class_participation: 6.0,
            study_hours: 3.0,
            assessment_average: 7.0,
            failed_courses: 0.0,
            extracurricular_activities: 2.0,
            disciplinary_reports: 0.0,
        }
    }

    #[test]
    fn test_valid_input() {
        assert!(valid_input().validate().is_ok());
        assert!(PredictionInput::default().validate().is_ok());
    }

    #[test]
    fn test_attendance_over_100_rejected() {
        let input = PredictionInput {
            class_attendance: 150.0,
            ..valid_input()
        };
        let message = input.validate().unwrap_err();
        assert!(message.contains("asistencia_clases must be between 0 and 100 (got 150)"));
    }

    #[test]
    fn test_negative_average_rejected() {
        let input = PredictionInput {
            current_average: -1.0,
            ..valid_input()
        };
        let violations = input.violations();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].range.field, "promedio_actual");
    }

    #[test]
    fn test_non_finite_rejected() {
        let input = PredictionInput {
            failed_courses: f64::NAN,
            study_hours: f64::INFINITY,
            ..valid_input()
        };
        assert_eq!(input.violations().len(), 2);
    }

    #[test]
    fn test_unbounded_counts() {
        let input = PredictionInput {
            disciplinary_reports: 40.0,
            ..valid_input()
        };
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_input_wire_names() {
        let json = serde_json::to_value(valid_input()).unwrap();
        assert_eq!(json["asistencia_clases"], 92.0);
        assert_eq!(json["reportes_disciplinarios"], 0.0);
        assert_eq!(json.as_object().unwrap().len(), 9);
    }

    #[test]
    fn test_result_label_alias() {
        let result: PredictionResult = serde_json::from_value(serde_json::json!({
            "prediction": 1,
            "prediction_label": "riesgo",
            "probability_riesgo": 0.875
        }))
        .unwrap();
        assert!(result.is_at_risk());
        assert_eq!(result.label(), "riesgo");
    }

    #[test]
    fn test_assessment_high_risk() {
        let result = PredictionResult {
            prediction: 1,
            prediction_meaning: "riesgo".into(),
            probability_riesgo: Some(0.875),
        };
        let assessment = result.assessment();
        assert_eq!(assessment.level, RiskLevel::High);
        assert!(assessment.detail.contains("87.50%"));
    }

    #[test]
    fn test_assessment_low_risk() {
        let result = PredictionResult {
            prediction: 0,
            prediction_meaning: String::new(),
            probability_riesgo: Some(0.25),
        };
        let assessment = result.assessment();
        assert_eq!(assessment.level, RiskLevel::Low);
        assert!(assessment.detail.contains("75.00%"));
        assert_eq!(result.label(), "no riesgo");
    }
}
