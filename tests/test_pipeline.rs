//! Integration test: train once, reload from disk, score patient records

mod common;

use health_risk::inference::{AlcoholLevel, PatientInput, PatientRecord, Predictor, Sex, YesNo};
use health_risk::training::ModelName;
use health_risk::RiskError;
use polars::prelude::*;

fn high_risk() -> PatientRecord {
    PatientRecord {
        age: 62.0,
        bmi: 34.0,
        daily_steps: 2500.0,
        smoker: YesNo::Sim,
        alcohol: AlcoholLevel::Alto,
        systolic_pressure: 155.0,
        cholesterol: 275.0,
        family_history: YesNo::Sim,
        ..Default::default()
    }
}

fn low_risk() -> PatientRecord {
    PatientRecord {
        age: 30.0,
        sex: Sex::Feminino,
        bmi: 22.0,
        daily_steps: 11000.0,
        systolic_pressure: 110.0,
        cholesterol: 170.0,
        ..Default::default()
    }
}

#[test]
fn test_reloaded_predictor_scores_records() {
    let (tmp, outcome) = common::trained_artifacts();
    let predictor = Predictor::load(tmp.path().join("artifacts")).unwrap();

    let info = predictor.info();
    assert_eq!(info.model_name, ModelName::RandomForestClassifier);
    assert_eq!(info.classes, ["Alto", "Baixo", "Moderado"]);
    assert_eq!(info.n_features, outcome.summary.n_features);

    // Non-smoker, no family history, every measurement mid-range
    let prediction = predictor.predict(&PatientRecord::default()).unwrap();
    assert_eq!(prediction.label, "Baixo");
    let total: f64 = prediction.probabilities.values().sum();
    assert!((total - 1.0).abs() < 1e-9);
    assert_eq!(prediction.probabilities.len(), 3);

    // The predicted label carries the highest probability
    let chosen = prediction.probabilities[&prediction.label];
    assert!(prediction.probabilities.values().all(|&p| p <= chosen));
}

#[test]
fn test_extreme_records_land_in_extreme_classes() {
    let (tmp, _) = common::trained_artifacts();
    let predictor = Predictor::load(tmp.path().join("artifacts")).unwrap();

    assert_eq!(predictor.predict(&high_risk()).unwrap().label, "Alto");
    assert_eq!(predictor.predict(&low_risk()).unwrap().label, "Baixo");
}

#[test]
fn test_bmi_from_body_measurements_matches_direct_bmi() {
    let (tmp, _) = common::trained_artifacts();
    let predictor = Predictor::load(tmp.path().join("artifacts")).unwrap();

    let measured = PatientInput {
        bmi: None,
        weight_kg: Some(98.0),
        height_m: Some(1.75),
        ..PatientInput::from(high_risk())
    }
    .into_record()
    .unwrap();
    assert!((measured.bmi - 32.0).abs() < 1e-9);

    let direct = PatientRecord { bmi: 32.0, ..high_risk() };
    let a = predictor.predict(&measured).unwrap();
    let b = predictor.predict(&direct).unwrap();
    assert_eq!(a.label, b.label);
}

#[test]
fn test_frame_with_unseen_level_and_missing_column() {
    let (tmp, _) = common::trained_artifacts();
    let predictor = Predictor::load(tmp.path().join("artifacts")).unwrap();

    let mut df = PatientRecord::default().to_frame().unwrap();
    df = df.drop("Historico_Familiar").unwrap();
    df.with_column(Series::new("Sexo".into(), ["Outro"])).unwrap();

    let scored = predictor.predict_frame(&df).unwrap();
    assert_eq!(scored.len(), 1);
    assert!(predictor.classes().contains(&scored[0].label));
}

#[test]
fn test_invalid_record_rejected() {
    let (tmp, _) = common::trained_artifacts();
    let predictor = Predictor::load(tmp.path().join("artifacts")).unwrap();

    let record = PatientRecord {
        sleep_hours: 30.0,
        ..Default::default()
    };
    assert!(matches!(predictor.predict(&record), Err(RiskError::InvalidInput(_))));
}

#[test]
fn test_missing_artifacts_reported() {
    let tmp = tempfile::TempDir::new().unwrap();
    let result = Predictor::load(tmp.path());
    assert!(matches!(result, Err(RiskError::ArtifactError { .. })));
}
