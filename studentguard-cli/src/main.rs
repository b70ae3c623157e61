use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::info;

use studentguard::client::DatasetFile;
use studentguard::config::ClientConfig;
use studentguard::events::LoggingEventSink;
use studentguard::messages;
use studentguard::models::{Hyperparameters, PredictionInput};
use studentguard::observability::{init_tracing, LogFormat};
use studentguard::pipeline::{PipelineSession, RetrainSession};

#[derive(Parser, Debug)]
#[command(name = "studentguard", version, about = "Drive a StudentGuard pipeline session")]
struct Cli {
    /// Base URL of the API, including the `/api` prefix.
    #[arg(long, global = true, env = "STUDENTGUARD_API_URL")]
    api_url: Option<String>,
    /// Log output format (`pretty` or `json`).
    #[arg(long, global = true, default_value = "pretty")]
    log_format: LogFormat,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Checks that the service is reachable.
    Health,
    /// Uploads, cleans and trains, then optionally predicts.
    Run(RunArgs),
    /// Resets the remote session.
    Reset,
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// CSV dataset to upload.
    #[arg(long)]
    file: PathBuf,
    /// Solver iteration limit; enables retraining with explicit parameters.
    #[arg(long)]
    max_iter: Option<i64>,
    /// Inverse regularization strength.
    #[arg(long)]
    c: Option<f64>,
    /// Solver name.
    #[arg(long)]
    solver: Option<String>,
    /// Prediction input as JSON, using the service's field names.
    #[arg(long)]
    predict: Option<String>,
}

impl RunArgs {
    fn hyperparameters(&self) -> Option<Hyperparameters> {
        if self.max_iter.is_none() && self.c.is_none() && self.solver.is_none() {
            return None;
        }
        let mut params = Hyperparameters::default();
        if let Some(max_iter) = self.max_iter {
            params = params.with_max_iter(max_iter);
        }
        if let Some(c) = self.c {
            params = params.with_c(c);
        }
        if let Some(solver) = &self.solver {
            params = params.with_solver(solver.clone());
        }
        Some(params)
    }
}

fn build_session(api_url: Option<String>) -> Result<Arc<PipelineSession>> {
    let mut config = ClientConfig::from_env().context("reading StudentGuard environment")?;
    if let Some(url) = api_url {
        config = config.with_base_url(url);
    }
    let session = PipelineSession::from_config(config)
        .context("building the HTTP client")?
        .with_event_sink(Arc::new(LoggingEventSink::debug()));
    Ok(Arc::new(session))
}

async fn run(session: Arc<PipelineSession>, args: RunArgs) -> Result<()> {
    let file = DatasetFile::from_path(&args.file)
        .await
        .with_context(|| format!("reading {}", args.file.display()))?;

    let upload = session.upload(file).await.context("upload failed")?;
    info!(rows = upload.dataset.total_rows, "{}", session.status_line());

    session.clean().await.context("cleaning failed")?;
    if let Some(message) = session.clean_message() {
        info!("{message}");
    }

    let metrics = match args.hyperparameters() {
        Some(params) => {
            let retrain = RetrainSession::with_params(Arc::clone(&session), params);
            for issue in retrain.issues() {
                info!(issue = %issue, "Submitting parameters as given");
            }
            retrain.retrain().await.context("training failed")?
        }
        None => session.train().await.context("training failed")?,
    };
    info!("{}", session.status_line());

    println!(
        "{}",
        serde_json::to_string_pretty(&json!({
            "accuracy": messages::format_metric(Some(metrics.accuracy)),
            "precision": messages::format_metric(Some(metrics.precision)),
            "recall": messages::format_metric(Some(metrics.recall)),
            "f1_score": messages::format_metric(Some(metrics.f1_score)),
            "hyperparams_used": metrics.hyperparams_used,
        }))?
    );

    if let Some(raw) = args.predict {
        let input: PredictionInput =
            serde_json::from_str(&raw).context("parsing the prediction input")?;
        let result = session.predict(&input).await.context("prediction failed")?;
        let assessment = result.assessment();
        println!("{}: {}", assessment.headline, assessment.detail);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);
    let session = build_session(cli.api_url)?;

    match cli.command {
        Commands::Health => {
            let health = session.health().await.context("health check failed")?;
            println!("{}", serde_json::to_string_pretty(&health)?);
        }
        Commands::Run(args) => run(session, args).await?,
        Commands::Reset => {
            let message = session.reset().await.context("reset failed")?;
            println!("{message}");
        }
    }
    Ok(())
}
