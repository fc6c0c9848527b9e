//! # CLI Commands
//!
//! Implementations behind the `watchskip` subcommands. Each `cmd_*`
//! function is callable directly so the commands can be tested without
//! spawning the binary.

use crate::api::{AppState, PredictResponse, create_router};
use crate::config::{ServerConfig, YouTubeConfig};
use crate::youtube::{FetchError, YouTubeClient};
use serde::Serialize;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use tracing::{info, warn};
use watchskip_core::formats::{decode_model, encode_model};
use watchskip_core::metrics::{CLASS_NAMES, ClassificationReport, ConfusionMatrix};
use watchskip_core::pipeline::train_with;
use watchskip_core::selection::{CandidateScore, ParamGrid, StratifiedKFold};
use watchskip_core::{
    Dataset, RandomForestParams, TrainOptions, TrainedModel, TrainingOutcome, VaderScorer,
};

// =============================================================================
// ERROR TYPE
// =============================================================================

/// Errors surfaced by CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] watchskip_core::Error),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Predict(#[from] crate::api::ApiError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

// =============================================================================
// ARGUMENT HELPERS
// =============================================================================

/// A `--max-depths` entry: a positive depth or `none` for unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaxDepthArg(pub Option<usize>);

impl FromStr for MaxDepthArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("none") {
            return Ok(Self(None));
        }
        match s.parse::<usize>() {
            Ok(0) | Err(_) => Err(format!(
                "expected a positive depth or 'none', got {s:?}"
            )),
            Ok(depth) => Ok(Self(Some(depth))),
        }
    }
}

/// Assemble training options from CLI values.
pub fn build_train_options(
    test_fraction: f64,
    folds: usize,
    seed: u64,
    estimators: &[usize],
    max_depths: &[MaxDepthArg],
    min_leaves: &[usize],
) -> Result<TrainOptions, CliError> {
    if estimators.is_empty() || max_depths.is_empty() || min_leaves.is_empty() {
        return Err(CliError::InvalidArgument(
            "every grid dimension needs at least one value".into(),
        ));
    }
    if estimators.contains(&0) || min_leaves.contains(&0) {
        return Err(CliError::InvalidArgument(
            "n_estimators and min_samples_leaf must be positive".into(),
        ));
    }
    Ok(TrainOptions {
        test_fraction,
        cv: StratifiedKFold {
            n_splits: folds,
            shuffle: true,
            seed,
        },
        grid: ParamGrid {
            n_estimators: estimators.to_vec(),
            max_depth: max_depths.iter().map(|d| d.0).collect(),
            min_samples_leaf: min_leaves.to_vec(),
        },
        seed,
    })
}

// =============================================================================
// MODEL FILES
// =============================================================================

/// Write a model file, creating parent directories.
pub fn save_model(model: &TrainedModel, path: &Path) -> Result<(), CliError> {
    let bytes = encode_model(model)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, bytes)?;
    Ok(())
}

/// Read and decode a model file.
pub fn load_model(path: &Path) -> Result<TrainedModel, CliError> {
    let bytes = std::fs::read(path)?;
    Ok(decode_model(&bytes)?)
}

// =============================================================================
// GENERATE
// =============================================================================

/// Generate a synthetic dataset and write it as CSV.
pub fn cmd_generate(output: &Path, samples: usize, seed: u64) -> Result<Dataset, CliError> {
    let dataset = Dataset::generate(samples, seed)?;
    dataset.write_csv(output)?;

    let balance = dataset.label_balance();
    info!(path = %output.display(), rows = dataset.len(), "dataset written");
    println!(
        "Dataset saved: {} ({} rows x {} columns)",
        output.display(),
        dataset.len(),
        dataset.width()
    );
    println!("  Skip:  {:.3}", balance.skip);
    println!("  Watch: {:.3}", balance.watch);
    Ok(dataset)
}

// =============================================================================
// TRAIN
// =============================================================================

#[derive(Debug, Serialize)]
struct FeatureImportance {
    feature: &'static str,
    importance: f64,
}

#[derive(Debug, Serialize)]
struct ConfusionReport {
    labels: [&'static str; 2],
    matrix: [[usize; 2]; 2],
}

/// JSON summary written next to the model.
#[derive(Debug, Serialize)]
struct TrainingReport<'a> {
    best_params: &'a RandomForestParams,
    cv_accuracy: f64,
    test_accuracy: f64,
    train_samples: usize,
    test_samples: usize,
    feature_importances: Vec<FeatureImportance>,
    confusion_matrix: ConfusionReport,
    classification_report: &'a ClassificationReport,
    candidates: &'a [CandidateScore],
}

impl<'a> TrainingReport<'a> {
    fn new(outcome: &'a TrainingOutcome) -> Self {
        let meta = &outcome.model.meta;
        Self {
            best_params: &meta.params,
            cv_accuracy: meta.cv_accuracy,
            test_accuracy: meta.test_accuracy,
            train_samples: meta.train_samples,
            test_samples: meta.test_samples,
            feature_importances: meta
                .named_importances()
                .into_iter()
                .map(|(feature, importance)| FeatureImportance {
                    feature,
                    importance,
                })
                .collect(),
            confusion_matrix: confusion_report(&outcome.confusion),
            classification_report: &outcome.report,
            candidates: &outcome.search.candidates,
        }
    }
}

fn confusion_report(cm: &ConfusionMatrix) -> ConfusionReport {
    ConfusionReport {
        labels: CLASS_NAMES,
        matrix: cm.counts,
    }
}

/// Train on a CSV dataset, save the model and optionally a JSON report.
pub fn cmd_train(
    dataset_path: &Path,
    model_path: &Path,
    report_path: Option<&Path>,
    options: &TrainOptions,
) -> Result<TrainingOutcome, CliError> {
    let dataset = Dataset::read_csv(dataset_path)?;
    info!(path = %dataset_path.display(), rows = dataset.len(), "loaded dataset");
    println!(
        "Loaded dataset: {} rows x {} columns",
        dataset.len(),
        dataset.width()
    );

    let total = options.grid.len();
    println!(
        "Fitting {} folds for each of {} candidates, totalling {} fits",
        options.cv.n_splits,
        total,
        options.cv.n_splits * total
    );

    let outcome = train_with(&dataset, options, |index, score| {
        info!(
            candidate = index + 1,
            total,
            params = %score.params,
            mean_accuracy = score.mean_accuracy,
            std_accuracy = score.std_accuracy,
            "scored candidate"
        );
    })?;

    let meta = &outcome.model.meta;
    println!("Best parameters: {}", meta.params);
    println!("Best CV accuracy: {:.2}%", meta.cv_accuracy * 100.0);
    println!("Final test accuracy: {:.2}%", meta.test_accuracy * 100.0);
    println!();
    println!("Classification report:");
    print!("{}", outcome.report.to_text());
    println!();
    println!("Confusion matrix:");
    print!("{}", outcome.confusion.to_text());

    save_model(&outcome.model, model_path)?;
    info!(path = %model_path.display(), "model saved");
    println!("Model saved: {}", model_path.display());

    if let Some(report_path) = report_path {
        if let Some(parent) = report_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&TrainingReport::new(&outcome))?;
        std::fs::write(report_path, json)?;
        println!("Report saved: {}", report_path.display());
    }

    Ok(outcome)
}

// =============================================================================
// INSPECT
// =============================================================================

/// Print what a model file contains.
pub fn cmd_inspect(model_path: &Path, json: bool) -> Result<TrainedModel, CliError> {
    let model = load_model(model_path)?;
    let meta = &model.meta;

    if json {
        println!("{}", serde_json::to_string_pretty(meta)?);
    } else {
        println!("Model: {}", model_path.display());
        println!("  Parameters:     {}", meta.params);
        let forest = model.pipeline.forest();
        println!(
            "  Trees:          {} ({} nodes, deepest {})",
            forest.n_trees(),
            forest.total_nodes(),
            forest.max_tree_depth()
        );
        println!("  CV accuracy:    {:.2}%", meta.cv_accuracy * 100.0);
        println!("  Test accuracy:  {:.2}%", meta.test_accuracy * 100.0);
        println!(
            "  Samples:        {} train / {} test",
            meta.train_samples, meta.test_samples
        );
        println!("  Features:       importance  mean        scale");
        let scaler = model.pipeline.scaler();
        for (((name, importance), mean), scale) in meta
            .named_importances()
            .into_iter()
            .zip(scaler.mean())
            .zip(scaler.scale())
        {
            println!("    {name:<14} {importance:<11.4} {mean:<11.4} {scale:.4}");
        }
    }

    Ok(model)
}

// =============================================================================
// PREDICT
// =============================================================================

/// One-shot prediction for a URL, using the same path as the service.
pub async fn cmd_predict(
    url: &str,
    model_path: &Path,
    youtube: &YouTubeConfig,
    json: bool,
) -> Result<PredictResponse, CliError> {
    let model = load_model(model_path)?;
    let client = YouTubeClient::new(youtube)?;
    let state = AppState::new(model, client, VaderScorer::new());

    let response = state.predict(url).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        let f = &response.features;
        println!("Decision: {}", response.decision);
        println!(
            "  log_views={:.3} likes={} comments={} like_ratio={:.4} sentiment={:.2}",
            f.log_views, f.likes, f.comments, f.like_ratio, f.sentiment
        );
    }
    Ok(response)
}

// =============================================================================
// SERVE
// =============================================================================

/// Load the model and run the HTTP service until Ctrl-C.
pub async fn cmd_serve(config: ServerConfig) -> Result<(), CliError> {
    let model = load_model(&config.model_path)?;
    info!(
        path = %config.model_path.display(),
        params = %model.meta.params,
        "model loaded"
    );

    let client = YouTubeClient::new(&config.youtube)?;
    let state = AppState::new(model, client, VaderScorer::new());
    let app = create_router(state);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "WatchSkip server listening");
    println!("WatchSkip server listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_depth_arg_parses_none_and_numbers() {
        assert_eq!("none".parse::<MaxDepthArg>(), Ok(MaxDepthArg(None)));
        assert_eq!("None".parse::<MaxDepthArg>(), Ok(MaxDepthArg(None)));
        assert_eq!("6".parse::<MaxDepthArg>(), Ok(MaxDepthArg(Some(6))));
        assert!("0".parse::<MaxDepthArg>().is_err());
        assert!("deep".parse::<MaxDepthArg>().is_err());
    }

    #[test]
    fn build_train_options_maps_grid() {
        let options = build_train_options(
            0.25,
            4,
            7,
            &[10, 20],
            &[MaxDepthArg(Some(3)), MaxDepthArg(None)],
            &[1],
        );
        let options = options.ok();
        assert_eq!(options.as_ref().map(|o| o.grid.len()), Some(4));
        assert_eq!(options.as_ref().map(|o| o.cv.n_splits), Some(4));
        assert_eq!(
            options.as_ref().map(|o| o.grid.max_depth.clone()),
            Some(vec![Some(3), None])
        );
    }

    #[test]
    fn load_model_reports_missing_file_as_io() {
        let temp = tempfile::tempdir().ok();
        let path = temp.as_ref().map(|t| t.path().join("absent.model"));
        let result = path.as_deref().map(load_model);
        assert!(matches!(result, Some(Err(CliError::Io(_)))));
    }

    #[test]
    fn build_train_options_rejects_empty_dimensions() {
        assert!(build_train_options(0.2, 5, 1, &[], &[MaxDepthArg(None)], &[2]).is_err());
        assert!(build_train_options(0.2, 5, 1, &[0], &[MaxDepthArg(None)], &[2]).is_err());
    }
}
