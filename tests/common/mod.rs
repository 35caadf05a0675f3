//! Shared fixtures: a deterministic patient dataset and a trained artifact directory

#![allow(dead_code)]

use health_risk::training::{ModelName, TrainEngine, TrainingConfig, TrainingOutcome};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde_json::json;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const HEADER: &str = "ID,Idade,Sexo,IMC,Passos_Diarios,Horas_Sono,Agua_Litros,Calorias,\
Fumante,Alcool,Horas_Trabalho,Frequencia_Cardiaca_Repouso,Pressao_Sistolica,\
Pressao_Diastolica,Colesterol,Historico_Familiar,Risco_Doenca";

/// Risk level from a point score over the usual risk factors
pub fn risk_label(smoker: bool, family: bool, chol: f64, systolic: f64, steps: f64, bmi: f64) -> &'static str {
    let mut points = 0;
    if smoker {
        points += 2;
    }
    points += [family, chol > 240.0, systolic > 140.0, steps < 5000.0, bmi > 30.0]
        .iter()
        .filter(|&&hit| hit)
        .count();
    match points {
        0 | 1 => "Baixo",
        2 | 3 => "Moderado",
        _ => "Alto",
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "Sim"
    } else {
        "Não"
    }
}

/// CSV text with `rows` patients.
///
/// Numeric attributes are uniform so IQR trimming only catches the planted
/// cholesterol outliers (every 97th row). About 3% of `Calorias` values are
/// missing, either `N/A` or free text, and about 5% of `Agua_Litros` values
/// are zero.
pub fn patient_csv(rows: usize, seed: u64) -> String {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let alcohol = ["Baixo", "Moderado", "Alto", "Não consome"];
    let mut csv = String::from(HEADER);
    csv.push('\n');

    for id in 0..rows {
        let age: u32 = rng.gen_range(18..80);
        let sex = if rng.gen_bool(0.5) { "Masculino" } else { "Feminino" };
        let bmi: f64 = rng.gen_range(18.0..38.0);
        let steps: u32 = rng.gen_range(1000..14000);
        let sleep: f64 = rng.gen_range(4.0..10.0);
        let water: f64 = if rng.gen_bool(0.05) { 0.0 } else { rng.gen_range(1.0..4.0) };
        let calories = if rng.gen_bool(0.03) {
            let token = if id % 2 == 0 { "N/A" } else { "desconhecido" };
            token.to_string()
        } else {
            rng.gen_range(1500..3200).to_string()
        };
        let smoker = rng.gen_bool(0.3);
        let drink = alcohol[rng.gen_range(0..alcohol.len())];
        let work: u32 = rng.gen_range(4..13);
        let heart: u32 = rng.gen_range(55..95);
        let systolic: f64 = rng.gen_range(100.0..160.0);
        let diastolic: f64 = rng.gen_range(60.0..100.0);
        let chol: f64 = if id % 97 == 50 { 900.0 } else { rng.gen_range(150.0..290.0) };
        let family = rng.gen_bool(0.35);
        let label = risk_label(smoker, family, chol, systolic, f64::from(steps), bmi);

        let _ = writeln!(
            csv,
            "{},{},{},{:.1},{},{:.1},{:.2},{},{},{},{},{},{:.0},{:.0},{:.0},{},{}",
            id + 1,
            age,
            sex,
            bmi,
            steps,
            sleep,
            water,
            calories,
            yes_no(smoker),
            drink,
            work,
            heart,
            systolic,
            diastolic,
            chol,
            yes_no(family),
            label,
        );
    }
    csv
}

/// Write a dataset into `dir` and return its path
pub fn write_dataset(dir: &Path, rows: usize, seed: u64) -> PathBuf {
    let path = dir.join("dataset.csv");
    std::fs::write(&path, patient_csv(rows, seed)).expect("write dataset");
    path
}

/// Small, deterministic forest configuration over a fresh dataset in `dir`
pub fn forest_config(dir: &Path) -> TrainingConfig {
    let data_path = write_dataset(dir, 600, 7);
    let base = [
        ("n_estimators".to_string(), json!(25)),
        ("max_depth".to_string(), json!(8)),
        ("random_state".to_string(), json!(42)),
    ]
    .into_iter()
    .collect();
    TrainingConfig::new(ModelName::RandomForestClassifier, data_path, dir.join("artifacts"))
        .with_base_params(base)
}

/// Train a forest into a temporary directory; artifacts live under `<tmp>/artifacts`
pub fn trained_artifacts() -> (TempDir, TrainingOutcome) {
    let tmp = TempDir::new().expect("tempdir");
    let outcome = TrainEngine::new(forest_config(tmp.path()))
        .run()
        .expect("training run");
    (tmp, outcome)
}
