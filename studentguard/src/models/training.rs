//! Training parameters, metrics and evaluation results.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default iteration limit used by the service.
pub const DEFAULT_MAX_ITER: i64 = 1000;

/// Default regularization strength used by the service.
pub const DEFAULT_C: f64 = 0.5;

/// Default solver used by the service.
pub const DEFAULT_SOLVER: &str = "lbfgs";

/// Solvers the service's logistic regression accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Solver {
    /// Limited-memory BFGS.
    #[serde(rename = "lbfgs")]
    Lbfgs,
    /// Coordinate descent (liblinear).
    #[serde(rename = "liblinear")]
    Liblinear,
    /// Newton conjugate gradient.
    #[serde(rename = "newton-cg")]
    NewtonCg,
    /// Stochastic average gradient.
    #[serde(rename = "sag")]
    Sag,
    /// SAGA.
    #[serde(rename = "saga")]
    Saga,
}

impl Solver {
    /// Every known solver.
    pub const ALL: [Self; 5] = [
        Self::Lbfgs,
        Self::Liblinear,
        Self::NewtonCg,
        Self::Sag,
        Self::Saga,
    ];

    /// The wire name of the solver.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Lbfgs => "lbfgs",
            Self::Liblinear => "liblinear",
            Self::NewtonCg => "newton-cg",
            Self::Sag => "sag",
            Self::Saga => "saga",
        }
    }
}

impl fmt::Display for Solver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Solver {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|solver| solver.as_str() == s)
            .ok_or_else(|| format!("unknown solver '{s}'"))
    }
}

/// Training hyperparameters.
///
/// The working copy is sent verbatim, so out-of-domain values are
/// representable; the service decides what it actually uses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hyperparameters {
    /// Maximum solver iterations.
    pub max_iter: i64,
    /// Inverse regularization strength.
    #[serde(rename = "C")]
    pub c: f64,
    /// Solver name.
    pub solver: String,
}

impl Default for Hyperparameters {
    fn default() -> Self {
        Self {
            max_iter: DEFAULT_MAX_ITER,
            c: DEFAULT_C,
            solver: DEFAULT_SOLVER.to_string(),
        }
    }
}

impl Hyperparameters {
    /// Creates a parameter set.
    #[must_use]
    pub fn new(max_iter: i64, c: f64, solver: impl Into<String>) -> Self {
        Self {
            max_iter,
            c,
            solver: solver.into(),
        }
    }

    /// Sets the iteration limit.
    #[must_use]
    pub fn with_max_iter(mut self, max_iter: i64) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Sets the regularization strength.
    #[must_use]
    pub fn with_c(mut self, c: f64) -> Self {
        self.c = c;
        self
    }

    /// Sets the solver.
    #[must_use]
    pub fn with_solver(mut self, solver: impl Into<String>) -> Self {
        self.solver = solver.into();
        self
    }

    /// The solver, if it is one the service knows.
    #[must_use]
    pub fn known_solver(&self) -> Option<Solver> {
        self.solver.parse().ok()
    }

    /// Describes values outside their domain.
    ///
    /// Advisory only: retraining still submits the values as they are.
    #[must_use]
    pub fn issues(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if self.max_iter <= 0 {
            issues.push(format!("max_iter must be greater than 0 (got {})", self.max_iter));
        }
        if !(self.c.is_finite() && self.c > 0.0) {
            issues.push(format!("C must be greater than 0 (got {})", self.c));
        }
        if self.known_solver().is_none() {
            issues.push(format!("unknown solver '{}'", self.solver));
        }
        issues
    }
}

/// Metrics reported by a training run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainMetrics {
    /// Test-set accuracy (0.0–1.0).
    pub accuracy: f64,
    /// Test-set F1 score.
    pub f1_score: f64,
    /// Test-set precision.
    pub precision: f64,
    /// Test-set recall.
    pub recall: f64,
    /// Training split size.
    #[serde(default)]
    pub n_train: u64,
    /// Test split size.
    #[serde(default)]
    pub n_test: u64,
    /// Opaque locator of the saved model.
    #[serde(default)]
    pub model_path: String,
    /// Parameters the service actually used.
    #[serde(default)]
    pub hyperparams_used: Option<Hyperparameters>,
}

impl TrainMetrics {
    /// Total records used for training and testing.
    #[must_use]
    pub fn total_samples(&self) -> u64 {
        self.n_train + self.n_test
    }
}

/// Binary confusion matrix counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    /// Predicted at risk, actually at risk.
    #[serde(default)]
    pub true_positives: u64,
    /// Predicted at risk, actually not.
    #[serde(default)]
    pub false_positives: u64,
    /// Predicted not at risk, actually at risk.
    #[serde(default)]
    pub false_negatives: u64,
    /// Predicted not at risk, actually not.
    #[serde(default)]
    pub true_negatives: u64,
}

impl ConfusionMatrix {
    /// Total classified records.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.true_positives + self.false_positives + self.false_negatives + self.true_negatives
    }

    /// Correctly classified records.
    #[must_use]
    pub fn correct(&self) -> u64 {
        self.true_positives + self.true_negatives
    }

    /// Accuracy implied by the counts, `None` when empty.
    #[must_use]
    pub fn accuracy(&self) -> Option<f64> {
        let total = self.total();
        if total == 0 {
            None
        } else {
            Some(self.correct() as f64 / total as f64)
        }
    }
}

/// Result of the metrics-retrieval action.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    /// The service's message.
    #[serde(default)]
    pub message: String,
    /// Metrics of the last training run.
    pub metrics: TrainMetrics,
    /// Confusion matrix of the last training run.
    #[serde(default)]
    pub confusion_matrix: ConfusionMatrix,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_hyperparameters() {
        let params = Hyperparameters::default();
        assert_eq!(params, Hyperparameters::new(1000, 0.5, "lbfgs"));
        assert!(params.issues().is_empty());
        assert_eq!(params.known_solver(), Some(Solver::Lbfgs));
    }

    #[test]
    fn test_hyperparameters_wire_names() {
        let json = serde_json::to_value(Hyperparameters::default()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"max_iter": 1000, "C": 0.5, "solver": "lbfgs"})
        );
    }

    #[test]
    fn test_hyperparameter_issues_are_advisory() {
        let params = Hyperparameters::default()
            .with_c(-1.0)
            .with_max_iter(0)
            .with_solver("adam");

        let issues = params.issues();
        assert_eq!(issues.len(), 3);
        assert!(issues[1].contains("C must be greater than 0"));
    }

    #[test]
    fn test_solver_parse() {
        assert_eq!("newton-cg".parse::<Solver>().unwrap(), Solver::NewtonCg);
        assert!("adam".parse::<Solver>().is_err());
        assert_eq!(Solver::Saga.to_string(), "saga");
    }

    #[test]
    fn test_train_metrics_without_echo() {
        let metrics: TrainMetrics = serde_json::from_value(serde_json::json!({
            "accuracy": 0.9,
            "f1_score": 0.8,
            "precision": 0.85,
            "recall": 0.75,
            "n_train": 80,
            "n_test": 20,
            "model_path": "saved_models/model.pkl"
        }))
        .unwrap();

        assert!(metrics.hyperparams_used.is_none());
        assert_eq!(metrics.total_samples(), 100);
    }

    #[test]
    fn test_confusion_matrix_accuracy() {
        let matrix = ConfusionMatrix {
            true_positives: 8,
            false_positives: 2,
            false_negatives: 1,
            true_negatives: 9,
        };
        assert_eq!(matrix.total(), 20);
        assert_eq!(matrix.accuracy(), Some(0.85));
        assert_eq!(ConfusionMatrix::default().accuracy(), None);
    }
}
