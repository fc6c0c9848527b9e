//! Integration tests for WatchSkip CLI commands.
//!
//! Uses tempfile for testing file-based operations.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use serde_json::json;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use watchskip::cli::{
    CliError, MaxDepthArg, build_train_options, cmd_generate, cmd_inspect, cmd_predict,
    cmd_train, load_model, save_model,
};
use watchskip::config::YouTubeConfig;
use watchskip_core::formats::encode_model;
use watchskip_core::{Dataset, TrainOptions, TrainedModel};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Create a temporary directory for tests.
fn create_temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// A single-candidate grid that trains in well under a second.
fn quick_options() -> TrainOptions {
    build_train_options(0.2, 3, 42, &[10], &[MaxDepthArg(Some(6))], &[2]).unwrap()
}

/// Generate a small dataset and train a model from it.
fn trained_model(dir: &TempDir) -> PathBuf {
    let data = dir.path().join("data.csv");
    let model = dir.path().join("model.bin");
    cmd_generate(&data, 300, 42).unwrap();
    cmd_train(&data, &model, None, &quick_options()).unwrap();
    model
}

fn read_json(path: &Path) -> serde_json::Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

// =============================================================================
// GENERATE COMMAND TESTS
// =============================================================================

#[test]
fn test_generate_writes_csv() {
    let temp = create_temp_dir();
    let path = temp.path().join("nested").join("dataset.csv");

    let dataset = cmd_generate(&path, 250, 42).unwrap();
    assert_eq!(dataset.len(), 250);
    assert!(path.exists());

    let header = std::fs::read_to_string(&path).unwrap();
    let first = header.lines().next().unwrap();
    assert_eq!(
        first,
        "log_views,likes,comment_count,like_ratio,sentiment,label"
    );
    assert_eq!(header.lines().count(), 251);
}

#[test]
fn test_generate_round_trips_through_csv() {
    let temp = create_temp_dir();
    let path = temp.path().join("dataset.csv");

    let generated = cmd_generate(&path, 100, 7).unwrap();
    let loaded = Dataset::read_csv(&path).unwrap();
    assert_eq!(loaded.len(), generated.len());
    assert_eq!(loaded.labels(), generated.labels());
}

#[test]
fn test_generate_is_deterministic_per_seed() {
    let temp = create_temp_dir();
    let a = temp.path().join("a.csv");
    let b = temp.path().join("b.csv");

    cmd_generate(&a, 120, 42).unwrap();
    cmd_generate(&b, 120, 42).unwrap();
    assert_eq!(
        std::fs::read_to_string(&a).unwrap(),
        std::fs::read_to_string(&b).unwrap()
    );
}

#[test]
fn test_generate_zero_samples_fails() {
    let temp = create_temp_dir();
    let result = cmd_generate(&temp.path().join("empty.csv"), 0, 42);
    assert!(matches!(result, Err(CliError::Core(_))));
}

// =============================================================================
// TRAIN COMMAND TESTS
// =============================================================================

#[test]
fn test_train_saves_loadable_model() {
    let temp = create_temp_dir();
    let model_path = trained_model(&temp);

    let model = load_model(&model_path).unwrap();
    assert_eq!(model.meta.params.n_estimators, 10);
    assert_eq!(model.meta.params.max_depth, Some(6));
    assert_eq!(model.meta.train_samples + model.meta.test_samples, 300);
    assert!((0.0..=1.0).contains(&model.meta.test_accuracy));
}

#[test]
fn test_train_writes_report() {
    let temp = create_temp_dir();
    let data = temp.path().join("data.csv");
    let model = temp.path().join("out").join("model.bin");
    let report = temp.path().join("out").join("report.json");
    cmd_generate(&data, 300, 42).unwrap();

    let options =
        build_train_options(0.2, 3, 42, &[5, 10], &[MaxDepthArg(Some(4))], &[2]).unwrap();
    let outcome = cmd_train(&data, &model, Some(&report), &options).unwrap();

    assert_eq!(outcome.search.candidates.len(), 2);
    let value = read_json(&report);
    assert_eq!(value["candidates"].as_array().unwrap().len(), 2);
    assert_eq!(value["feature_importances"].as_array().unwrap().len(), 5);
    assert_eq!(value["confusion_matrix"]["labels"], json!(["Skip", "Watch"]));
    assert_eq!(
        value["test_samples"].as_u64().unwrap() as usize,
        outcome.model.meta.test_samples
    );
}

#[test]
fn test_train_missing_dataset_fails() {
    let temp = create_temp_dir();
    let result = cmd_train(
        &temp.path().join("missing.csv"),
        &temp.path().join("model.bin"),
        None,
        &quick_options(),
    );
    assert!(result.is_err());
    assert!(!temp.path().join("model.bin").exists());
}

#[test]
fn test_train_malformed_dataset_fails() {
    let temp = create_temp_dir();
    let data = temp.path().join("bad.csv");
    std::fs::write(
        &data,
        "log_views,likes,comment_count,like_ratio,sentiment,label\n1.0,2,3,oops,0.1,1\n",
    )
    .unwrap();

    let result = cmd_train(&data, &temp.path().join("model.bin"), None, &quick_options());
    assert!(matches!(result, Err(CliError::Core(_))));
}

// =============================================================================
// INSPECT COMMAND TESTS
// =============================================================================

#[test]
fn test_inspect_reads_trained_model() {
    let temp = create_temp_dir();
    let model_path = trained_model(&temp);

    let model = cmd_inspect(&model_path, false).unwrap();
    assert_eq!(model.pipeline.forest().n_trees(), 10);
    assert!(cmd_inspect(&model_path, true).is_ok());
}

#[test]
fn test_inspect_rejects_garbage_file() {
    let temp = create_temp_dir();
    let path = temp.path().join("garbage.bin");
    std::fs::write(&path, b"definitely not a model").unwrap();

    assert!(matches!(cmd_inspect(&path, false), Err(CliError::Core(_))));
}

#[test]
fn test_inspect_rejects_model_with_invalid_tree() {
    let temp = create_temp_dir();
    let model_path = trained_model(&temp);

    // Point a split at a feature column that does not exist.
    let mut value = serde_json::to_value(load_model(&model_path).unwrap()).unwrap();
    let split = value["pipeline"]["forest"]["trees"]
        .as_array_mut()
        .unwrap()
        .iter_mut()
        .flat_map(|tree| tree["nodes"].as_array_mut().unwrap().iter_mut())
        .find_map(|node| node.get_mut("Split"))
        .unwrap();
    split["feature"] = json!(9);
    let broken: TrainedModel = serde_json::from_value(value).unwrap();

    let path = temp.path().join("broken.bin");
    std::fs::write(&path, encode_model(&broken).unwrap()).unwrap();

    let result = cmd_inspect(&path, false);
    assert!(matches!(
        result,
        Err(CliError::Core(watchskip_core::Error::Format(_)))
    ));
}

#[test]
fn test_save_model_creates_parent_dirs() {
    let temp = create_temp_dir();
    let model = load_model(&trained_model(&temp)).unwrap();
    let nested = temp.path().join("a").join("b").join("model.bin");

    save_model(&model, &nested).unwrap();
    assert_eq!(load_model(&nested).unwrap(), model);
}

// =============================================================================
// PREDICT COMMAND TESTS
// =============================================================================

#[tokio::test]
async fn test_predict_fetches_and_classifies() {
    let temp = create_temp_dir();
    let model_path = trained_model(&temp);

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/videos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{
                "snippet": { "title": "Wonderful", "description": "" },
                "statistics": {
                    "viewCount": "99999",
                    "likeCount": "5000",
                    "commentCount": "300"
                }
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let youtube = YouTubeConfig::new("k").with_base_url(server.uri());
    let response = cmd_predict(
        "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
        &model_path,
        &youtube,
        true,
    )
    .await
    .unwrap();

    assert_eq!(response.features.likes, 5000);
    assert_eq!(response.features.comments, 300);
    let model = load_model(&model_path).unwrap();
    assert_eq!(response.decision, model.decide(&response.features));
}

#[tokio::test]
async fn test_predict_invalid_url_fails_before_fetch() {
    let temp = create_temp_dir();
    let model_path = trained_model(&temp);

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let youtube = YouTubeConfig::new("k").with_base_url(server.uri());
    let result = cmd_predict("not a url", &model_path, &youtube, false).await;
    assert!(matches!(result, Err(CliError::Predict(_))));
}
