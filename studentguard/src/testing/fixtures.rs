//! Canned service payloads.
//!
//! The `*_body` functions return wire JSON; the others return the typed
//! values a client would produce from that JSON.

use serde_json::{json, Value};
use std::collections::BTreeMap;

use crate::client::DatasetFile;
use crate::models::{
    CleanSummary, ConfusionMatrix, DatasetSnapshot, EvaluationReport, Hyperparameters,
    PredictionInput, PredictionResult, PreviewRow, TrainMetrics, UploadSummary,
};

const COLUMNS: [&str; 2] = ["age", "score"];

fn preview_rows() -> Vec<PreviewRow> {
    [(17.0, 7.5), (18.0, 6.0)]
        .into_iter()
        .map(|(age, score)| {
            let mut row = PreviewRow::new();
            row.insert("age".to_string(), json!(age));
            row.insert("score".to_string(), json!(score));
            row
        })
        .collect()
}

fn snapshot(rows: u64, missing: &[(&str, u64)]) -> DatasetSnapshot {
    DatasetSnapshot {
        total_rows: rows,
        total_columns: COLUMNS.len() as u64,
        columns: COLUMNS.iter().map(ToString::to_string).collect(),
        data_types: COLUMNS
            .iter()
            .map(|column| ((*column).to_string(), "float64".to_string()))
            .collect(),
        missing_values: missing
            .iter()
            .map(|(column, count)| ((*column).to_string(), *count))
            .collect(),
        preview: preview_rows(),
    }
}

/// Body of a successful upload with the given missing-value counts.
#[must_use]
pub fn upload_body(missing: &[(&str, u64)]) -> Value {
    let dataset = snapshot(20, missing);
    json!({
        "filename": "students.csv",
        "message": "Archivo cargado exitosamente",
        "info": {
            "total_rows": dataset.total_rows,
            "total_columns": dataset.total_columns,
            "columns": dataset.columns,
            "data_types": dataset.data_types,
            "missing_values": dataset.missing_values,
        },
        "preview": dataset.preview,
    })
}

/// Body of a successful clean that adjusted `values_adjusted` values and
/// left no missing values.
#[must_use]
pub fn clean_body(values_adjusted: u64) -> Value {
    let cleaned = snapshot(19, &[("age", 0), ("score", 0)]);
    json!({
        "message": "Datos limpiados exitosamente",
        "summary": {
            "duplicates_removed": 1,
            "missing_values_handled": 5,
            "text_converted_to_numeric": {},
            "values_adjusted": values_adjusted,
        },
        "cleaned_info": cleaned,
    })
}

/// Body of a successful training run, optionally echoing parameters.
#[must_use]
pub fn train_body(echo: Option<Hyperparameters>) -> Value {
    json!({
        "message": "Modelo entrenado exitosamente",
        "metrics": train_metrics(echo),
    })
}

/// Parameters as the service echoes them after clamping `C`.
#[must_use]
pub fn echoed_params(c: f64) -> Hyperparameters {
    Hyperparameters::default().with_c(c)
}

/// Upload summary with the given missing-value counts.
#[must_use]
pub fn upload_summary(missing: &[(&str, u64)]) -> UploadSummary {
    UploadSummary {
        filename: "students.csv".to_string(),
        message: "Archivo cargado exitosamente".to_string(),
        dataset: snapshot(20, missing),
    }
}

/// Clean summary with no missing values left.
#[must_use]
pub fn clean_summary(values_adjusted: u64) -> CleanSummary {
    CleanSummary {
        message: "Datos limpiados exitosamente".to_string(),
        duplicates_removed: 1,
        missing_values_handled: 5,
        text_converted_to_numeric: BTreeMap::new(),
        values_adjusted,
        cleaned: snapshot(19, &[("age", 0), ("score", 0)]),
    }
}

/// Training metrics with 87.5% accuracy.
#[must_use]
pub fn train_metrics(echo: Option<Hyperparameters>) -> TrainMetrics {
    TrainMetrics {
        accuracy: 0.875,
        f1_score: 0.8,
        precision: 0.82,
        recall: 0.78,
        n_train: 16,
        n_test: 4,
        model_path: "saved_models/modelo_riesgo.pkl".to_string(),
        hyperparams_used: echo,
    }
}

/// Evaluation report matching [`train_metrics`].
#[must_use]
pub fn evaluation_report() -> EvaluationReport {
    EvaluationReport {
        message: "Métricas obtenidas".to_string(),
        metrics: train_metrics(Some(Hyperparameters::default())),
        confusion_matrix: ConfusionMatrix {
            true_positives: 2,
            false_positives: 0,
            false_negatives: 0,
            true_negatives: 2,
        },
    }
}

/// A prediction of class `prediction` with the given risk probability.
#[must_use]
pub fn prediction_result(prediction: u8, probability: f64) -> PredictionResult {
    PredictionResult {
        prediction,
        prediction_meaning: if prediction == 1 { "riesgo" } else { "no riesgo" }.to_string(),
        probability_riesgo: Some(probability),
    }
}

/// A prediction input with every field in range.
#[must_use]
pub fn valid_prediction_input() -> PredictionInput {
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

/// A small CSV file.
#[must_use]
pub fn csv_file() -> DatasetFile {
    DatasetFile::new("students.csv", "age,score\n17,7.5\n18,6.0\n")
}
