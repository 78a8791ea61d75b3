//! Command-line interface
//!
//! `cardiokit train` fetches the dataset, runs model selection and writes the
//! pipeline artifact. `cardiokit serve` loads that artifact and starts the
//! prediction server.

use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::data::{DatasetLoader, LoaderConfig, DEFAULT_DATA_PATH, DEFAULT_DATA_URL};
use crate::export::{TrainedPipeline, DEFAULT_MODEL_PATH};
use crate::inference::DriftPolicy;
use crate::training::{ModelSelector, SelectionReport, TrainingConfig};

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

fn step_ok(msg: &str) {
    println!("  {} {}", ok("✓"), msg);
}

fn step_run(msg: &str) {
    println!("  {} {}...", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("    {} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "cardiokit")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Train and serve a heart-disease classifier")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download the dataset if needed, select a model and save the pipeline
    Train {
        /// Local dataset path; downloaded here when absent
        #[arg(short, long, default_value = DEFAULT_DATA_PATH)]
        data: PathBuf,

        /// Where to write the pipeline artifact
        #[arg(short, long, default_value = DEFAULT_MODEL_PATH)]
        output: PathBuf,

        /// Worker threads for the grid search (default: all cores)
        #[arg(long)]
        n_jobs: Option<usize>,

        /// Seed for the hold-out split and every forest
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Dataset source URL
        #[arg(long, env = "DATA_URL", default_value = DEFAULT_DATA_URL)]
        data_url: String,

        /// Target column name
        #[arg(long, default_value = "target")]
        target: String,
    },

    /// Serve predictions from a saved pipeline
    Serve {
        /// Pipeline artifact to load
        #[arg(short, long, env = "MODEL_PATH", default_value = DEFAULT_MODEL_PATH)]
        model: PathBuf,

        /// Host to bind to
        #[arg(long, env = "API_HOST", default_value = "0.0.0.0")]
        host: String,

        /// Port to listen on
        #[arg(short, long, env = "API_PORT", default_value_t = 5050)]
        port: u16,

        /// Schema drift handling: fill_defaults or reject
        #[arg(long, env = "DRIFT_POLICY", default_value = "fill_defaults")]
        drift_policy: String,
    },
}

/// Arguments of `cardiokit train`
#[derive(Debug, Clone)]
pub struct TrainArgs {
    pub data: PathBuf,
    pub output: PathBuf,
    pub n_jobs: Option<usize>,
    pub seed: u64,
    pub data_url: String,
    pub target: String,
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub async fn cmd_train(args: TrainArgs) -> anyhow::Result<TrainedPipeline> {
    section("Train");

    step_run(&format!("Loading dataset {}", args.data.display()));
    let start = Instant::now();
    let loader = DatasetLoader::new(
        LoaderConfig::new()
            .with_data_url(args.data_url.clone())
            .with_target(args.target.clone()),
    );
    let dataset = loader.fetch_and_load(&args.data).await?;
    let (negatives, positives) = dataset.class_counts();
    step_done(&format!(
        "{} rows × {} cols, {} positive / {} negative in {:?}",
        dataset.n_samples(),
        dataset.features.n_columns(),
        positives,
        negatives,
        start.elapsed()
    ));

    let mut config = TrainingConfig::new().with_random_state(args.seed);
    if let Some(n) = args.n_jobs {
        config = config.with_n_jobs(n);
    }

    step_run(&format!(
        "Searching {} candidates with {}-fold stratified CV",
        config.grid.len().to_string().cyan(),
        config.cv_folds
    ));
    let start = Instant::now();
    let outcome = ModelSelector::new(config).run(&dataset)?;
    step_done(&format!("{:?}", start.elapsed()));

    print_report(&outcome.report);

    let pipeline = TrainedPipeline::from_outcome(outcome, &args.target, args.seed);

    step_run("Saving pipeline");
    pipeline.save(&args.output)?;
    step_done(&args.output.display().to_string());

    print_summary(&pipeline, &args.output);
    Ok(pipeline)
}

fn print_report(report: &SelectionReport) {
    section("Candidates");
    for (idx, candidate) in report.candidates.iter().enumerate() {
        let marker = if idx == report.best_index { ok("★") } else { dim("·") };
        println!(
            "  {} {:<40} {} {}",
            marker,
            candidate.params.to_string(),
            format!("{:.4}", candidate.cv.mean_score).white(),
            dim(&format!("± {:.4}", candidate.cv.std_score)),
        );
    }
}

fn print_summary(pipeline: &TrainedPipeline, output: &Path) {
    let meta = pipeline.metadata();
    let m = &meta.test_metrics;

    section("Result");
    println!("  {:<16} {}", muted("Best params"), pipeline.params().to_string().white().bold());
    println!(
        "  {:<16} {} {}",
        muted("CV F1"),
        format!("{:.4}", meta.cv_mean_f1).white().bold(),
        dim(&format!("± {:.4}", meta.cv_std_f1)),
    );
    println!("  {:<16} {}", muted("Test accuracy"), format!("{:.4}", m.accuracy).white());
    println!("  {:<16} {}", muted("Test precision"), format!("{:.4}", m.precision).white());
    println!("  {:<16} {}", muted("Test recall"), format!("{:.4}", m.recall).white());
    println!("  {:<16} {}", muted("Test F1"), format!("{:.4}", m.f1_score).white());
    println!("  {:<16} {} / {}", muted("Train / test"), meta.n_train, meta.n_test);
    println!();
    step_ok(&format!("Pipeline saved to {}", output.display().to_string().cyan()));
    println!();
}

pub async fn cmd_serve(model: PathBuf, host: &str, port: u16, drift_policy: &str) -> anyhow::Result<()> {
    use crate::server::{run_server, ServerConfig};

    let drift_policy: DriftPolicy = drift_policy.parse()?;

    println!();
    line_box_top();
    line_box_empty();
    line_box_center(&format!("{}", "cardiokit".white().bold()));
    line_box_center(&format!("{}", dim(&format!("v{}", env!("CARGO_PKG_VERSION")))));
    line_box_empty();
    line_box_sep();
    line_box_empty();
    line_box(&kv("Predict", &format!("POST http://{}:{}/predict", host, port)));
    line_box(&kv("Explain", &format!("POST http://{}:{}/explain", host, port)));
    line_box(&kv("Health ", &format!("GET  http://{}:{}/health", host, port)));
    line_box(&kv("Model  ", &model.display().to_string()));
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
        .with_model_path(model)
        .with_drift_policy(drift_policy);

    run_server(config).await
}
