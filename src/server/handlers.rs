//! HTTP handlers

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{rejection::JsonRejection, State},
    response::Html,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::inference::{ModelInfo, PatientInput, Prediction};

use super::error::Result;
use super::state::AppState;

/// Prediction plus the display percentages and the BMI actually used
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictResponse {
    #[serde(flatten)]
    pub prediction: Prediction,
    pub percentages: BTreeMap<String, String>,
    pub bmi: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelResponse {
    #[serde(flatten)]
    pub info: ModelInfo,
    pub trained_at: Option<String>,
    pub cv_best_score: Option<f64>,
    pub test_accuracy: Option<f64>,
}

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "model_loaded": true,
        "uptime_secs": state.uptime_secs(),
    }))
}

pub async fn model_info(State(state): State<Arc<AppState>>) -> Json<ModelResponse> {
    let metrics = state.training_metrics.as_ref();
    let field = |key: &str| metrics.and_then(|m| m.get(key));

    Json(ModelResponse {
        info: state.predictor.info(),
        trained_at: field("trained_at").and_then(|v| v.as_str()).map(str::to_string),
        cv_best_score: field("cv_best_score").and_then(|v| v.as_f64()),
        test_accuracy: field("classification_report")
            .and_then(|r| r.get("accuracy"))
            .and_then(|v| v.as_f64()),
    })
}

pub async fn predict(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<PatientInput>, JsonRejection>,
) -> Result<Json<PredictResponse>> {
    let Json(input) = payload?;
    let start = Instant::now();
    let record = input.into_record()?;

    // Scoring is CPU-bound; keep it off the async workers
    let predictor = Arc::clone(&state.predictor);
    let scored = record.clone();
    let prediction = tokio::task::spawn_blocking(move || predictor.predict(&scored))
        .await
        .map_err(|e| super::ServerError::Internal(e.to_string()))??;

    info!(
        label = %prediction.label,
        bmi = record.bmi,
        latency_us = start.elapsed().as_micros() as u64,
        "Served prediction"
    );

    Ok(Json(PredictResponse {
        percentages: prediction.percentages(),
        prediction,
        bmi: record.bmi,
    }))
}

pub async fn serve_index() -> Html<&'static str> {
    Html(EMBEDDED_INDEX_HTML)
}

const EMBEDDED_INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="pt-BR">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Previsão de Risco de Saúde</title>
    <style>
        body { font-family: system-ui, sans-serif; background: #f4f6f8; color: #1f2933; margin: 0; }
        main { max-width: 760px; margin: 2rem auto; background: #fff; padding: 2rem; border-radius: 8px; }
        h1 { margin-top: 0; font-size: 1.5rem; }
        form { display: grid; grid-template-columns: 1fr 1fr; gap: 0.75rem 1.5rem; }
        label { display: flex; flex-direction: column; font-size: 0.9rem; }
        input, select { margin-top: 0.25rem; padding: 0.4rem; font-size: 1rem; }
        button { grid-column: span 2; padding: 0.7rem; font-size: 1rem; cursor: pointer; }
        #result { margin-top: 1.5rem; }
        .label { font-size: 1.3rem; font-weight: 600; }
        .error { color: #b42318; }
        small { display: block; text-align: center; margin-top: 2rem; color: #6b7280; }
    </style>
</head>
<body>
<main>
    <h1>Sistema de Previsão de Risco de Saúde</h1>
    <p id="model"></p>
    <form id="form">
        <label>Idade <input name="age" type="number" value="45" min="0"></label>
        <label>Sexo
            <select name="sex"><option>Masculino</option><option>Feminino</option></select>
        </label>
        <label>Peso (kg) <input name="weight_kg" type="number" step="0.1" min="1" placeholder="opcional"></label>
        <label>Altura (m) <input name="height_m" type="number" step="0.01" min="0.3" placeholder="opcional"></label>
        <label>IMC (sem peso/altura) <input name="bmi" type="number" step="0.1" value="28" min="10" max="60"></label>
        <label>Passos diários <input name="daily_steps" type="number" value="8000" min="0"></label>
        <label>Horas de sono <input name="sleep_hours" type="number" step="0.5" value="7" min="0" max="24"></label>
        <label>Litros de água por dia <input name="water_liters" type="number" step="0.5" value="2.5" min="0"></label>
        <label>Calorias ingeridas <input name="calories" type="number" value="2200" min="0"></label>
        <label>É fumante?
            <select name="smoker"><option>Não</option><option>Sim</option></select>
        </label>
        <label>Consumo de álcool
            <select name="alcohol">
                <option>Não consome</option><option>Baixo</option><option>Moderado</option><option>Alto</option>
            </select>
        </label>
        <label>Horas de trabalho por dia <input name="work_hours" type="number" value="8" min="0" max="24"></label>
        <label>Frequência cardíaca em repouso <input name="resting_heart_rate" type="number" value="70" min="0"></label>
        <label>Pressão sistólica <input name="systolic_pressure" type="number" value="120" min="0"></label>
        <label>Pressão diastólica <input name="diastolic_pressure" type="number" value="80" min="0"></label>
        <label>Colesterol <input name="cholesterol" type="number" value="200" min="0"></label>
        <label>Histórico familiar?
            <select name="family_history"><option>Não</option><option>Sim</option></select>
        </label>
        <button type="submit">Prever risco</button>
    </form>
    <div id="result"></div>
    <small>Conteúdo destinado apenas a fins educacionais. Os dados exibidos são ilustrativos.</small>
</main>
<script>
const TEXT_FIELDS = ["sex", "smoker", "alcohol", "family_history"];

fetch("/api/model").then(r => r.json()).then(m => {
    document.getElementById("model").textContent =
        "Modelo: " + m.model_name + " · classes: " + m.classes.join(", ");
});

document.getElementById("form").addEventListener("submit", async (event) => {
    event.preventDefault();
    const payload = {};
    for (const [key, value] of new FormData(event.target).entries()) {
        if (value === "") continue;
        payload[key] = TEXT_FIELDS.includes(key) ? value : Number(value);
    }
    if (payload.weight_kg !== undefined && payload.height_m !== undefined) delete payload.bmi;

    const out = document.getElementById("result");
    const response = await fetch("/api/predict", {
        method: "POST",
        headers: { "Content-Type": "application/json" },
        body: JSON.stringify(payload),
    });
    const body = await response.json();
    if (!response.ok) {
        out.replaceChildren(node("p", "error", body.message));
        return;
    }
    const list = document.createElement("ul");
    for (const [cls, pct] of Object.entries(body.percentages)) {
        list.append(node("li", "", cls + ": " + pct));
    }
    out.replaceChildren(
        node("p", "label", "Risco previsto: " + body.label),
        node("p", "", "IMC utilizado: " + body.bmi.toFixed(2)),
        list,
    );
});

function node(tag, className, text) {
    const el = document.createElement(tag);
    el.className = className;
    el.textContent = text;
    return el;
}
</script>
</body>
</html>
"#;
