//! Integration test: cleaning and preparation on a realistic patient file

mod common;

use health_risk::preprocessing::{
    get_dummies, load_csv, DataCleaner, DataPreprocessor, FeatureSchema, PreprocessingConfig,
};
use health_risk::synthetic::class_counts;
use polars::prelude::*;
use proptest::prelude::*;
use tempfile::TempDir;

fn dataset() -> (TempDir, DataFrame) {
    let tmp = TempDir::new().unwrap();
    let path = common::write_dataset(tmp.path(), 400, 11);
    let df = load_csv(&path).unwrap();
    (tmp, df)
}

#[test]
fn test_load_csv_keeps_text_in_numeric_column() {
    let (_tmp, df) = dataset();
    assert_eq!(df.height(), 400);
    assert_eq!(df.width(), 17);
    // Free-text entries force the calories column to text
    assert_eq!(df.column("Calorias").unwrap().dtype(), &DataType::String);
    assert_eq!(df.column("Idade").unwrap().dtype(), &DataType::Int64);
}

#[test]
fn test_missing_markers_keep_numeric_columns_numeric() {
    let tmp = TempDir::new().unwrap();
    let mut lines: Vec<String> = common::patient_csv(300, 4).lines().map(str::to_string).collect();
    for (line, marker) in lines.iter_mut().skip(1).zip(["NA", "nan", "NULL", ""]) {
        *line = {
            let mut cells: Vec<&str> = line.split(',').collect();
            cells[1] = marker;
            cells.join(",")
        };
    }
    let path = tmp.path().join("dataset.csv");
    std::fs::write(&path, lines.join("\n")).unwrap();

    let df = load_csv(&path).unwrap();
    let age = df.column("Idade").unwrap();
    assert!(age.dtype().is_primitive_numeric(), "{:?}", age.dtype());
    assert_eq!(age.null_count(), 4);

    let data = DataPreprocessor::default().prepare(&df).unwrap();
    assert!(data.cleaning.rows_dropped_unparseable >= 4);
    assert!(!data.schema.columns().iter().any(|c| c.starts_with("Idade_")));
    assert_eq!(data.schema.len(), 17);
}

#[test]
fn test_cleaning_report() {
    let (_tmp, df) = dataset();
    let (clean, report) = DataCleaner::new(&PreprocessingConfig::default()).clean(&df).unwrap();

    assert!(report.id_dropped);
    assert!(clean.column("ID").is_err());
    assert!(report.rows_dropped_unparseable > 0);
    assert!(report.zeros_repaired > 0);
    assert_eq!(report.rows_out, clean.height());

    let chol = report.trims.iter().find(|t| t.column == "Colesterol").unwrap();
    assert!(chol.removed >= 1);
    assert!(chol.upper < 900.0);

    let water = clean.column("Agua_Litros").unwrap().f64().unwrap();
    assert!(water.into_iter().flatten().all(|v| v > 0.0));
    assert_eq!(clean.column("Calorias").unwrap().dtype(), &DataType::Float64);
}

#[test]
fn test_cleaning_is_idempotent() {
    let (_tmp, df) = dataset();
    let cleaner = DataCleaner::new(&PreprocessingConfig::default());
    let (once, _) = cleaner.clean(&df).unwrap();
    let (twice, report) = cleaner.clean(&once).unwrap();

    assert_eq!(once.height(), twice.height());
    assert_eq!(report.outliers_removed(), 0);
    assert_eq!(report.zeros_repaired, 0);
    assert!(!report.id_dropped);
}

#[test]
fn test_prepare_balances_train_only() {
    let (_tmp, df) = dataset();
    let data = DataPreprocessor::default().prepare(&df).unwrap();

    let train = class_counts(&data.y_train);
    assert_eq!(train.len(), 3);
    let first = *train.values().next().unwrap();
    assert!(train.values().all(|&n| n == first));

    // The held-out split keeps the natural imbalance and no synthetic rows
    let test = class_counts(&data.y_test);
    let total_test: usize = test.values().sum();
    assert_eq!(total_test, data.x_test.nrows());
    assert!(data.x_test.nrows() * 3 < data.cleaning.rows_out);

    assert_eq!(data.labels.classes(), ["Alto", "Baixo", "Moderado"]);
    assert_eq!(data.x_train.ncols(), data.schema.len());
    assert_eq!(data.scaler.n_features(), data.schema.len());
}

#[test]
fn test_schema_drops_first_level() {
    let (_tmp, df) = dataset();
    let data = DataPreprocessor::default().prepare(&df).unwrap();
    let columns = data.schema.columns();

    assert!(columns.iter().any(|c| c == "Sexo_Masculino"));
    assert!(!columns.iter().any(|c| c == "Sexo_Feminino"));
    assert!(columns.iter().any(|c| c == "Fumante_Sim"));
    assert!(!columns.iter().any(|c| c == "Alcool_Alto"));
    assert!(!columns.iter().any(|c| c == "Risco_Doenca" || c == "ID"));
    // 11 numeric, Sexo 1, Fumante 1, Alcool 3, Historico_Familiar 1
    assert_eq!(columns.len(), 17);
    assert_eq!(columns[0], "Idade");
}

#[test]
fn test_same_seed_same_split() {
    let (_tmp, df) = dataset();
    let a = DataPreprocessor::default().prepare(&df).unwrap();
    let b = DataPreprocessor::default().prepare(&df).unwrap();
    assert_eq!(a.y_test, b.y_test);
    assert_eq!(a.x_train, b.x_train);
}

#[test]
fn test_missing_target_rejected() {
    let (_tmp, df) = dataset();
    let config = PreprocessingConfig::default().with_target("Outcome");
    assert!(DataPreprocessor::new(config).prepare(&df).is_err());
}

proptest! {
    #[test]
    fn prop_align_always_matches_schema(
        present in proptest::collection::vec(any::<bool>(), 6),
        extra in 1usize..3,
        value in -50.0f64..50.0,
    ) {
        let names = ["Idade", "IMC", "Colesterol", "Sexo_Masculino", "Fumante_Sim", "Alcool_Baixo"];
        let schema = FeatureSchema::new(names.iter().map(|s| s.to_string()).collect());

        let mut columns: Vec<Column> = names
            .iter()
            .zip(&present)
            .filter(|(_, keep)| **keep)
            .map(|(name, _)| Column::new((*name).into(), [value]))
            .collect();
        for i in 0..extra {
            columns.push(Column::new(format!("Unseen_{}", i).into(), [1.0]));
        }
        let df = DataFrame::new(columns).unwrap();

        let x = schema.align(&df).unwrap();
        prop_assert_eq!(x.ncols(), schema.len());
        for (j, &keep) in present.iter().enumerate() {
            let expected = if keep { value } else { 0.0 };
            prop_assert_eq!(x[[0, j]], expected);
        }
    }
}

#[test]
fn test_unseen_level_aligns_to_zeros() {
    let schema = FeatureSchema::new(vec!["Idade".to_string(), "Sexo_Masculino".to_string()]);
    let df = df!("Idade" => [40.0], "Sexo" => ["Outro"]).unwrap();
    let x = schema.align(&get_dummies(&df).unwrap()).unwrap();
    assert_eq!(x.row(0).to_vec(), vec![40.0, 0.0]);
}
