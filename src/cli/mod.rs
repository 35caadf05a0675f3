//! Health-risk CLI
//!
//! Command-line interface for training, one-shot prediction, the interactive
//! patient form and the web server.

use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::inference::{
    format_percent, AlcoholLevel, PatientInput, PatientRecord, Prediction, Predictor, Sex, YesNo,
};
use crate::server::PredictResponse;
use crate::training::{TrainEngine, TrainingConfig};

// ─── Styling helpers ───────────────────────────────────────────────────────────

const W: usize = 58; // box inner width

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn line_box_top()    { println!("  {}", dim("┌─────────────────────────────────────────────────────────┐")); }
fn line_box_bottom() { println!("  {}", dim("└─────────────────────────────────────────────────────────┘")); }
fn line_box_sep()    { println!("  {}", dim("├─────────────────────────────────────────────────────────┤")); }

fn line_box(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let pad = W.saturating_sub(visible_len);
    println!("  {}  {}{} {}", dim("│"), content, " ".repeat(pad), dim("│"));
}

fn line_box_center(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let total_pad = W.saturating_sub(visible_len);
    let left = total_pad / 2;
    let right = total_pad - left;
    println!("  {}  {}{}{} {}", dim("│"), " ".repeat(left), content, " ".repeat(right), dim("│"));
}

fn line_box_empty() { line_box(""); }

fn strip_ansi(s: &str) -> String {
    let mut out = String::new();
    let mut in_escape = false;
    for c in s.chars() {
        if c == '\x1b' { in_escape = true; continue; }
        if in_escape { if c == 'm' { in_escape = false; } continue; }
        out.push(c);
    }
    out
}

fn kv(key: &str, val: &str) -> String {
    format!("{} {}", muted(key), val.white())
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

/// Risk labels coloured by severity; unknown labels stay white
fn risk_label(label: &str) -> ColoredString {
    match label {
        "Alto" => label.truecolor(235, 90, 90).bold(),
        "Moderado" => label.truecolor(240, 190, 80).bold(),
        "Baixo" => label.truecolor(100, 210, 120).bold(),
        other => other.white().bold(),
    }
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "health-risk")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Health-risk classification: training pipeline, predictor and web form")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Clean, encode, balance, train and persist artifacts from a YAML config
    Train {
        /// Training configuration file
        #[arg(short, long)]
        config: PathBuf,
    },

    /// Predict one patient from a JSON file and print JSON
    Predict {
        /// Directory with the trained artifacts
        #[arg(short, long, env = "ARTIFACTS_DIR", default_value = "./artifacts")]
        artifacts: PathBuf,

        /// Patient JSON file; `-` reads stdin
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Fill in a patient form in the terminal
    Interactive {
        /// Directory with the trained artifacts
        #[arg(short, long, env = "ARTIFACTS_DIR", default_value = "./artifacts")]
        artifacts: PathBuf,
    },

    /// Start the web form and JSON API
    Serve {
        /// Directory with the trained artifacts
        #[arg(short, long, env = "ARTIFACTS_DIR", default_value = "./artifacts")]
        artifacts: PathBuf,

        /// Server host
        #[arg(long, env = "API_HOST", default_value = "0.0.0.0")]
        host: String,

        /// Server port
        #[arg(short, long, env = "API_PORT", default_value = "8080")]
        port: u16,
    },
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_train(config_path: &Path) -> anyhow::Result<()> {
    section("Train");

    let config = TrainingConfig::from_yaml_file(config_path)?;
    println!("  {:<14} {}", muted("Model"), config.model_name.to_string().cyan());
    println!("  {:<14} {}", muted("Data"), config.data_path.display());
    println!("  {:<14} {}", muted("Artifacts"), config.save_dir.display());
    match config.active_grid() {
        Some(grid) => println!(
            "  {:<14} {} parameter(s), {}-fold CV",
            muted("Grid search"),
            grid.len(),
            config.cv_folds
        ),
        None => println!("  {:<14} {}", muted("Grid search"), dim("off")),
    }
    println!();

    step_run("Training");
    let start = Instant::now();
    let outcome = TrainEngine::new(config).run()?;
    step_done(&format!("{:.2?}", start.elapsed()));

    let summary = &outcome.summary;
    section("Evaluation (held-out split)");
    for line in summary.classification_report.to_string().lines() {
        println!("  {}", line);
    }
    println!();
    if let Some(score) = summary.cv_best_score {
        println!("  {:<16} {}", muted("CV weighted F1"), format!("{:.4}", score).white().bold());
    }
    println!("  {:<16} {}", muted("Best params"), serde_json::to_string(&summary.best_params)?);
    println!(
        "  {:<16} {} train / {} test",
        muted("Rows"),
        summary.n_train,
        summary.n_test
    );
    if let Some(importances) = &summary.feature_importances {
        let mut ranked: Vec<(&String, &f64)> = importances.iter().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(a.1));
        println!();
        println!("  {}", muted("Top features"));
        for (name, value) in ranked.into_iter().take(5) {
            println!("    {:<28} {:.4}", name, value);
        }
    }
    println!();

    Ok(())
}

pub fn cmd_predict(artifacts: &Path, input: &Path) -> anyhow::Result<()> {
    let text = if input == Path::new("-") {
        std::io::read_to_string(std::io::stdin())?
    } else {
        std::fs::read_to_string(input)?
    };
    let patient: PatientInput = serde_json::from_str(&text)?;
    let record = patient.into_record()?;

    let predictor = Predictor::load(artifacts)?;
    let prediction = predictor.predict(&record)?;

    let response = PredictResponse {
        percentages: prediction.percentages(),
        prediction,
        bmi: record.bmi,
    };
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

// ─── Serve ─────────────────────────────────────────────────────────────────────

pub async fn cmd_serve(artifacts: &Path, host: &str, port: u16) -> anyhow::Result<()> {
    use crate::server::{run_server, ServerConfig};

    println!();
    line_box_top();
    line_box_empty();
    line_box_center(&format!("{}", "Health Risk".white().bold()));
    line_box_center(&format!("{}", dim(&format!("v{}", env!("CARGO_PKG_VERSION")))));
    line_box_empty();
    line_box_sep();
    line_box_empty();
    line_box(&kv("Form   ", &format!("http://{}:{}", host, port)));
    line_box(&kv("API    ", &format!("http://{}:{}/api/predict", host, port)));
    line_box(&kv("Health ", &format!("http://{}:{}/api/health", host, port)));
    line_box_empty();
    line_box_sep();
    line_box_empty();
    line_box_center(&format!("{}", dim("ctrl+c to stop")));
    line_box_empty();
    line_box_bottom();
    println!();

    let config = ServerConfig::default()
        .with_host(host)
        .with_port(port)
        .with_artifacts_dir(artifacts);

    run_server(config).await
}

// ─── Interactive mode ──────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("       {}", "Sistema de Previsão de Risco de Saúde".truecolor(120, 170, 255).bold());
    println!(
        "       {}",
        dim(&format!("health-risk  ·  v{}  ·  rust", env!("CARGO_PKG_VERSION")))
    );
    println!();
}

fn theme() -> dialoguer::theme::ColorfulTheme {
    use dialoguer::theme::ColorfulTheme;

    ColorfulTheme {
        active_item_prefix: dialoguer::console::style("  ›".to_string()).for_stderr().cyan(),
        active_item_style: dialoguer::console::Style::new().for_stderr().white().bold(),
        inactive_item_prefix: dialoguer::console::style("   ".to_string()).for_stderr(),
        inactive_item_style: dialoguer::console::Style::new().for_stderr().color256(245),
        prompt_prefix: dialoguer::console::style("  ?".to_string()).for_stderr().color256(111),
        prompt_style: dialoguer::console::Style::new().for_stderr().white().bold(),
        ..ColorfulTheme::default()
    }
}

fn ask_number(theme: &dialoguer::theme::ColorfulTheme, prompt: &str, default: f64) -> anyhow::Result<f64> {
    use dialoguer::Input;

    let value = Input::<f64>::with_theme(theme)
        .with_prompt(prompt)
        .default(default)
        .validate_with(|v: &f64| {
            if v.is_finite() && *v >= 0.0 {
                Ok(())
            } else {
                Err("enter a non-negative number")
            }
        })
        .interact_text()?;
    Ok(value)
}

fn ask_choice<T: Copy + std::fmt::Display + PartialEq>(
    theme: &dialoguer::theme::ColorfulTheme,
    prompt: &str,
    options: &[T],
    default: T,
) -> anyhow::Result<T> {
    use dialoguer::Select;

    let items: Vec<String> = options.iter().map(|o| o.to_string()).collect();
    let default_idx = options.iter().position(|o| *o == default).unwrap_or(0);
    let idx = Select::with_theme(theme)
        .with_prompt(prompt)
        .items(&items)
        .default(default_idx)
        .interact()?;
    Ok(options[idx])
}

/// Collect one patient, pre-filled with the form defaults
fn ask_patient(theme: &dialoguer::theme::ColorfulTheme) -> anyhow::Result<PatientInput> {
    use dialoguer::Select;

    let d = PatientRecord::default();
    let mut input = PatientInput {
        age: ask_number(theme, "Idade", d.age)?,
        sex: ask_choice(theme, "Sexo", &Sex::ALL, d.sex)?,
        ..Default::default()
    };

    let by_measurements = Select::with_theme(theme)
        .with_prompt("IMC")
        .items(&["informar o IMC", "calcular a partir de peso e altura"])
        .default(0)
        .interact()?
        == 1;
    if by_measurements {
        input.bmi = None;
        input.weight_kg = Some(ask_number(theme, "Peso (kg)", 80.0)?);
        input.height_m = Some(ask_number(theme, "Altura (m)", 1.70)?);
    } else {
        input.bmi = Some(ask_number(theme, "IMC", d.bmi)?);
    }

    input.daily_steps = ask_number(theme, "Média de passos diários", d.daily_steps)?;
    input.sleep_hours = ask_number(theme, "Média de horas de sono", d.sleep_hours)?;
    input.water_liters = ask_number(theme, "Litros de água por dia", d.water_liters)?;
    input.calories = ask_number(theme, "Calorias ingeridas", d.calories)?;
    input.smoker = ask_choice(theme, "É fumante?", &YesNo::ALL, d.smoker)?;
    input.alcohol = ask_choice(theme, "Consumo de álcool", &AlcoholLevel::ALL, d.alcohol)?;
    input.work_hours = ask_number(theme, "Horas de trabalho por dia", d.work_hours)?;
    input.resting_heart_rate = ask_number(theme, "Frequência cardíaca em repouso", d.resting_heart_rate)?;
    input.systolic_pressure = ask_number(theme, "Pressão sistólica", d.systolic_pressure)?;
    input.diastolic_pressure = ask_number(theme, "Pressão diastólica", d.diastolic_pressure)?;
    input.cholesterol = ask_number(theme, "Colesterol", d.cholesterol)?;
    input.family_history = ask_choice(theme, "Histórico familiar da doença?", &YesNo::ALL, d.family_history)?;

    Ok(input)
}

fn print_prediction(prediction: &Prediction, bmi: f64) {
    section("Resultado");
    println!("  {:<16} {}", muted("Risco previsto"), risk_label(&prediction.label));
    println!("  {:<16} {:.2}", muted("IMC"), bmi);
    println!();
    for (class, &p) in &prediction.probabilities {
        let bar = "█".repeat((p * 30.0).round() as usize);
        println!("  {:<12} {:>8}  {}", class, format_percent(p), accent(&bar));
    }
    println!();
}

pub fn cmd_interactive(artifacts: &Path) -> anyhow::Result<()> {
    use dialoguer::Confirm;

    print_banner();

    step_run("Loading artifacts");
    let predictor = Predictor::load(artifacts)?;
    let info = predictor.info();
    step_done(&format!("{} · {} classes", info.model_name, info.classes.len()));

    let theme = theme();
    loop {
        section("Paciente");
        let record = match ask_patient(&theme)?.into_record() {
            Ok(record) => record,
            Err(e) => {
                println!("  {} {}", "✗".red(), e);
                continue;
            }
        };
        let prediction = predictor.predict(&record)?;
        print_prediction(&prediction, record.bmi);

        let again = Confirm::with_theme(&theme)
            .with_prompt("Avaliar outro paciente?")
            .default(true)
            .interact()?;
        if !again {
            println!();
            println!("  {}", dim("até logo"));
            println!();
            break;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_serve_flags() {
        let cli = Cli::try_parse_from([
            "health-risk", "serve", "--artifacts", "models/rf", "--host", "127.0.0.1", "--port", "9000",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Serve { artifacts, host, port }) => {
                assert_eq!(artifacts, PathBuf::from("models/rf"));
                assert_eq!(host, "127.0.0.1");
                assert_eq!(port, 9000);
            }
            _ => panic!("expected serve"),
        }
    }

    #[test]
    fn test_strip_ansi() {
        let colored = format!("{}", "Alto".red());
        assert_eq!(strip_ansi(&colored), "Alto");
    }
}
