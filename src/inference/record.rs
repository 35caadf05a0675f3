//! Patient records as collected by the front-ends

use crate::error::{Result, RiskError};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sex {
    Masculino,
    Feminino,
}

impl Sex {
    pub const ALL: [Sex; 2] = [Sex::Masculino, Sex::Feminino];

    pub fn as_str(&self) -> &'static str {
        match self {
            Sex::Masculino => "Masculino",
            Sex::Feminino => "Feminino",
        }
    }
}

/// Yes/no answers as they appear in the dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum YesNo {
    Sim,
    #[serde(rename = "Não")]
    Nao,
}

impl YesNo {
    pub const ALL: [YesNo; 2] = [YesNo::Sim, YesNo::Nao];

    pub fn as_str(&self) -> &'static str {
        match self {
            YesNo::Sim => "Sim",
            YesNo::Nao => "Não",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlcoholLevel {
    Baixo,
    Moderado,
    Alto,
    #[serde(rename = "Não consome")]
    NaoConsome,
}

impl AlcoholLevel {
    pub const ALL: [AlcoholLevel; 4] = [
        AlcoholLevel::Baixo,
        AlcoholLevel::Moderado,
        AlcoholLevel::Alto,
        AlcoholLevel::NaoConsome,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AlcoholLevel::Baixo => "Baixo",
            AlcoholLevel::Moderado => "Moderado",
            AlcoholLevel::Alto => "Alto",
            AlcoholLevel::NaoConsome => "Não consome",
        }
    }
}

macro_rules! display_as_str {
    ($($ty:ty),*) => {$(
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    )*};
}

display_as_str!(Sex, YesNo, AlcoholLevel);

/// One patient's fifteen model attributes, BMI already derived
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientRecord {
    pub age: f64,
    pub sex: Sex,
    pub bmi: f64,
    pub daily_steps: f64,
    pub sleep_hours: f64,
    pub water_liters: f64,
    pub calories: f64,
    pub smoker: YesNo,
    pub alcohol: AlcoholLevel,
    pub work_hours: f64,
    pub resting_heart_rate: f64,
    pub systolic_pressure: f64,
    pub diastolic_pressure: f64,
    pub cholesterol: f64,
    pub family_history: YesNo,
}

impl Default for PatientRecord {
    fn default() -> Self {
        Self {
            age: 45.0,
            sex: Sex::Masculino,
            bmi: 28.0,
            daily_steps: 8000.0,
            sleep_hours: 7.0,
            water_liters: 2.5,
            calories: 2200.0,
            smoker: YesNo::Nao,
            alcohol: AlcoholLevel::NaoConsome,
            work_hours: 8.0,
            resting_heart_rate: 70.0,
            systolic_pressure: 120.0,
            diastolic_pressure: 80.0,
            cholesterol: 200.0,
            family_history: YesNo::Nao,
        }
    }
}

impl PatientRecord {
    /// Reject values no patient can have
    pub fn validate(&self) -> Result<()> {
        let non_negative = [
            ("age", self.age),
            ("daily_steps", self.daily_steps),
            ("sleep_hours", self.sleep_hours),
            ("water_liters", self.water_liters),
            ("calories", self.calories),
            ("work_hours", self.work_hours),
            ("resting_heart_rate", self.resting_heart_rate),
            ("systolic_pressure", self.systolic_pressure),
            ("diastolic_pressure", self.diastolic_pressure),
            ("cholesterol", self.cholesterol),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(RiskError::InvalidInput(format!(
                    "{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }
        if !self.bmi.is_finite() || self.bmi <= 0.0 {
            return Err(RiskError::InvalidInput(format!("bmi must be positive, got {}", self.bmi)));
        }
        if self.sleep_hours > 24.0 || self.work_hours > 24.0 {
            return Err(RiskError::InvalidInput("Daily hours cannot exceed 24".to_string()));
        }
        Ok(())
    }

    /// Single-row frame using the training dataset's column names
    pub fn to_frame(&self) -> Result<DataFrame> {
        let df = df!(
            "Idade" => [self.age],
            "Sexo" => [self.sex.as_str()],
            "IMC" => [self.bmi],
            "Passos_Diarios" => [self.daily_steps],
            "Horas_Sono" => [self.sleep_hours],
            "Agua_Litros" => [self.water_liters],
            "Calorias" => [self.calories],
            "Fumante" => [self.smoker.as_str()],
            "Alcool" => [self.alcohol.as_str()],
            "Horas_Trabalho" => [self.work_hours],
            "Frequencia_Cardiaca_Repouso" => [self.resting_heart_rate],
            "Pressao_Sistolica" => [self.systolic_pressure],
            "Pressao_Diastolica" => [self.diastolic_pressure],
            "Colesterol" => [self.cholesterol],
            "Historico_Familiar" => [self.family_history.as_str()],
        )?;
        Ok(df)
    }
}

/// Body mass index from weight in kilograms and height in metres
pub fn bmi(weight_kg: f64, height_m: f64) -> Result<f64> {
    if !(weight_kg.is_finite() && weight_kg > 0.0) {
        return Err(RiskError::InvalidInput(format!("weight_kg must be positive, got {}", weight_kg)));
    }
    if !(height_m.is_finite() && height_m > 0.0) {
        return Err(RiskError::InvalidInput(format!("height_m must be positive, got {}", height_m)));
    }
    Ok(weight_kg / (height_m * height_m))
}

/// Front-end payload: a record whose BMI may be given directly or as weight and height.
///
/// Omitted attributes take the form defaults of [`PatientRecord::default`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatientInput {
    pub age: f64,
    pub sex: Sex,
    pub bmi: Option<f64>,
    pub weight_kg: Option<f64>,
    pub height_m: Option<f64>,
    pub daily_steps: f64,
    pub sleep_hours: f64,
    pub water_liters: f64,
    pub calories: f64,
    pub smoker: YesNo,
    pub alcohol: AlcoholLevel,
    pub work_hours: f64,
    pub resting_heart_rate: f64,
    pub systolic_pressure: f64,
    pub diastolic_pressure: f64,
    pub cholesterol: f64,
    pub family_history: YesNo,
}

impl Default for PatientInput {
    fn default() -> Self {
        PatientRecord::default().into()
    }
}

impl From<PatientRecord> for PatientInput {
    fn from(r: PatientRecord) -> Self {
        Self {
            age: r.age,
            sex: r.sex,
            bmi: Some(r.bmi),
            weight_kg: None,
            height_m: None,
            daily_steps: r.daily_steps,
            sleep_hours: r.sleep_hours,
            water_liters: r.water_liters,
            calories: r.calories,
            smoker: r.smoker,
            alcohol: r.alcohol,
            work_hours: r.work_hours,
            resting_heart_rate: r.resting_heart_rate,
            systolic_pressure: r.systolic_pressure,
            diastolic_pressure: r.diastolic_pressure,
            cholesterol: r.cholesterol,
            family_history: r.family_history,
        }
    }
}

impl PatientInput {
    /// Resolve BMI and validate.
    ///
    /// Weight and height together take precedence over an explicit `bmi`;
    /// only one of the two is an error.
    pub fn into_record(self) -> Result<PatientRecord> {
        let bmi = match (self.weight_kg, self.height_m, self.bmi) {
            (Some(w), Some(h), _) => bmi(w, h)?,
            (Some(_), None, _) | (None, Some(_), _) => {
                return Err(RiskError::InvalidInput(
                    "weight_kg and height_m must be given together".to_string(),
                ))
            }
            (None, None, Some(b)) => b,
            (None, None, None) => PatientRecord::default().bmi,
        };

        let record = PatientRecord {
            age: self.age,
            sex: self.sex,
            bmi,
            daily_steps: self.daily_steps,
            sleep_hours: self.sleep_hours,
            water_liters: self.water_liters,
            calories: self.calories,
            smoker: self.smoker,
            alcohol: self.alcohol,
            work_hours: self.work_hours,
            resting_heart_rate: self.resting_heart_rate,
            systolic_pressure: self.systolic_pressure,
            diastolic_pressure: self.diastolic_pressure,
            cholesterol: self.cholesterol,
            family_history: self.family_history,
        };
        record.validate()?;
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bmi_from_weight_and_height() {
        let input = PatientInput {
            bmi: None,
            weight_kg: Some(80.0),
            height_m: Some(2.0),
            ..Default::default()
        };
        assert_eq!(input.into_record().unwrap().bmi, 20.0);
    }

    #[test]
    fn test_half_body_measurement_rejected() {
        let input = PatientInput {
            weight_kg: Some(80.0),
            ..Default::default()
        };
        assert!(matches!(input.into_record(), Err(RiskError::InvalidInput(_))));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let input: PatientInput = serde_json::from_value(json!({
            "age": 61,
            "smoker": "Sim",
            "alcohol": "Não consome",
            "weight_kg": 90.0,
            "height_m": 1.5
        }))
        .unwrap();
        let record = input.into_record().unwrap();
        assert_eq!(record.age, 61.0);
        assert_eq!(record.smoker, YesNo::Sim);
        assert_eq!(record.cholesterol, 200.0);
        assert!((record.bmi - 40.0).abs() < 1e-12);
    }

    #[test]
    fn test_unknown_category_rejected() {
        let parsed = serde_json::from_value::<PatientInput>(json!({"sex": "Other"}));
        assert!(parsed.is_err());
    }

    #[test]
    fn test_negative_value_rejected() {
        let record = PatientRecord {
            daily_steps: -1.0,
            ..Default::default()
        };
        assert!(record.validate().is_err());
    }

    #[test]
    fn test_frame_columns() {
        let df = PatientRecord::default().to_frame().unwrap();
        assert_eq!(df.height(), 1);
        assert_eq!(df.width(), 15);
        assert_eq!(df.column("Alcool").unwrap().str().unwrap().get(0), Some("Não consome"));
    }
}
