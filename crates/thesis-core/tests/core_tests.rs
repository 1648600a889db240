use std::fs;
use std::path::Path;
use tempfile::TempDir;

use thesis_core::config::{expand_path, resolve_with_base, Config, EmbeddingBackend, GenerationBackend};
use thesis_core::error::Error;
use thesis_core::types::GenerationRequest;

#[test]
fn defaults_apply_without_config_files() {
    let tmp = TempDir::new().unwrap();
    let config = Config::load_from(tmp.path(), "test").expect("load");
    let s = config.settings().expect("settings");

    assert_eq!(s.segment.min_length, 25);
    assert_eq!(s.pipeline.top_k, 5);
    assert_eq!(s.pipeline.batch_size, 50);
    assert_eq!(s.generation.reformulate_max_tokens, 200);
    assert_eq!(s.generation.synthesis_max_tokens, 500);
    assert_eq!(s.embedding.backend, EmbeddingBackend::Local);
}

#[test]
fn env_file_overrides_base_file() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join("config.toml"),
        "[pipeline]\ntop_k = 7\n\n[generation]\nbackend = \"ollama\"\nmodel = \"llama3\"\n",
    )
    .unwrap();
    fs::write(tmp.path().join("config.test.toml"), "[pipeline]\ntop_k = 3\n").unwrap();

    let config = Config::load_from(tmp.path(), "test").expect("load");
    let s = config.settings().expect("settings");
    assert_eq!(s.pipeline.top_k, 3, "env-specific file wins");
    assert_eq!(s.generation.backend, GenerationBackend::Ollama);

    let model: String = config.get("generation.model").expect("raw key");
    assert_eq!(model, "llama3");
}

#[test]
fn invalid_batch_size_is_a_configuration_error() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("config.toml"), "[pipeline]\nbatch_size = 1\n").unwrap();

    match Config::load_from(tmp.path(), "prod") {
        Err(Error::Configuration(msg)) => assert!(msg.contains("batch_size")),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("batch_size = 1 must be rejected"),
    }
}

#[test]
fn missing_key_reports_configuration_error() {
    let tmp = TempDir::new().unwrap();
    let config = Config::load_from(tmp.path(), "test").unwrap();
    let err = config.get::<String>("nope.missing").unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));
}

#[test]
fn relative_paths_resolve_against_base() {
    let base = Path::new("/srv/thesis");
    assert_eq!(resolve_with_base(base, "corpus"), base.join("corpus"));
    assert_eq!(resolve_with_base(base, "/abs/corpus"), Path::new("/abs/corpus"));
    assert!(!expand_path("~/x").to_string_lossy().starts_with('~') || std::env::var("HOME").is_err());
}

#[test]
fn generation_request_sampling_builder() {
    let req = GenerationRequest::new("hi", 10).with_sampling(0.2, 0.5);
    assert_eq!(req.max_tokens, 10);
    assert!((req.temperature - 0.2).abs() < f32::EPSILON);
    assert!((req.top_p - 0.5).abs() < f32::EPSILON);
}

#[test]
fn retryable_errors() {
    assert!(Error::Timeout { service: "gen".into(), secs: 1 }.is_retryable());
    assert!(Error::external("gen", "503").is_retryable());
    assert!(!Error::storage("gone").is_retryable());
}
