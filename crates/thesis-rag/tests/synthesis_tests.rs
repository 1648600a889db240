mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use common::{services, services_with, strings, EchoGenerator};
use thesis_core::types::UNKNOWN_SOURCE;
use thesis_core::Error;
use thesis_embed::HashEmbedder;
use thesis_rag::{batch_synthesize, coverage_score, reformulate_all, synthesize, Services, DEFAULT_STYLE};

#[tokio::test]
async fn synthesis_keeps_source_reference() {
    let services = services();
    let passages = strings(&["The sky is blue.", "Water boils at 100C."]);
    let sources = strings(&["doc1", "doc1"]);
    let out = synthesize(&services, &passages, Some(&sources)).await.unwrap();
    assert!(out.text.contains("[doc1]"));
    assert_eq!(out.sources.into_iter().collect::<Vec<_>>(), vec!["doc1".to_string()]);
}

#[tokio::test]
async fn missing_or_short_sources_use_placeholder() {
    let services = services();
    let passages = strings(&["First passage.", "Second passage."]);

    let none = synthesize(&services, &passages, None).await.unwrap();
    assert!(none.text.contains(&format!("[{UNKNOWN_SOURCE}]: First passage.")));
    assert!(none.sources.is_empty(), "placeholder is not a document: {:?}", none.sources);

    let short = strings(&["doc7"]);
    let partial = synthesize(&services, &passages, Some(&short)).await.unwrap();
    assert!(partial.text.contains("[doc7]: First passage."));
    assert!(partial.text.contains(&format!("[{UNKNOWN_SOURCE}]: Second passage.")));
    assert_eq!(partial.sources.into_iter().collect::<Vec<_>>(), vec!["doc7".to_string()]);
}

#[tokio::test]
async fn batched_partials_without_sources_stay_unattributed() {
    let services = services();
    let passages = strings(&["alpha", "beta", "gamma", "delta", "epsilon"]);
    let out = batch_synthesize(&services, &passages, None, 2).await.unwrap();
    assert!(out.synthesis.sources.is_empty());
    assert!(out.synthesis.text.contains(&format!("partial summary 1: {UNKNOWN_SOURCE}")));
}

#[tokio::test]
async fn batching_never_drops_attribution() {
    let services = services();
    let passages: Vec<String> = (0..7).map(|i| format!("Finding number {i} about soil.")).collect();
    let sources: Vec<String> = (0..7).map(|i| format!("doc{i}")).collect();

    let direct = synthesize(&services, &passages, Some(&sources)).await.unwrap();
    let batched = batch_synthesize(&services, &passages, Some(&sources), 2).await.unwrap();

    assert_eq!(batched.levels, 2, "7 -> 4 -> 2 items before the final call");
    assert!(batched.failures.is_empty());
    for source in &sources {
        assert!(direct.text.contains(source.as_str()));
        assert!(batched.synthesis.text.contains(source.as_str()), "{source} lost across batches");
    }
    assert_eq!(batched.synthesis.sources, direct.sources);
    assert!(batched.synthesis.text.contains("partial summary 1: doc0, doc1"));
}

#[tokio::test]
async fn small_input_is_a_single_call() {
    let generator = Arc::new(EchoGenerator::new());
    let services = services_with(generator.clone());
    let passages = strings(&["one passage here", "another passage"]);
    let out = batch_synthesize(&services, &passages, None, 50).await.unwrap();
    assert_eq!(out.levels, 0);
    assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn failed_batch_is_reported_and_skipped() {
    let services = services_with(Arc::new(EchoGenerator::failing_on("POISON")));
    let passages = strings(&["alpha", "beta", "POISON gamma", "delta", "epsilon", "zeta"]);
    let sources = strings(&["a", "b", "c", "d", "e", "f"]);

    let out = batch_synthesize(&services, &passages, Some(&sources), 2).await.unwrap();
    assert_eq!(out.failures.len(), 1);
    assert_eq!(out.failures[0].level, 0);
    assert_eq!(out.failures[0].batch, 1);
    assert!(out.failures[0].sources.contains("c") && out.failures[0].sources.contains("d"));
    assert!(!out.synthesis.sources.contains("c"));
    assert!(out.synthesis.text.contains("epsilon"));
}

#[tokio::test]
async fn every_batch_failing_is_an_error() {
    let services = services_with(Arc::new(EchoGenerator::failing_on("x")));
    let passages = strings(&["x1", "x2", "x3", "x4", "x5"]);
    let err = batch_synthesize(&services, &passages, None, 2).await.unwrap_err();
    assert!(matches!(err, Error::ExternalService { .. }));
}

#[tokio::test]
async fn degenerate_batch_sizes_are_rejected() {
    let services = services();
    let passages = strings(&["a", "b", "c"]);
    for size in [0, 1] {
        let err = batch_synthesize(&services, &passages, None, size).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }
    assert!(matches!(synthesize(&services, &[], None).await, Err(Error::InvalidInput(_))));
}

#[tokio::test]
async fn reformulations_keep_order_and_isolate_failures() {
    let generator = Arc::new(EchoGenerator::failing_on("BROKEN"));
    let services = services_with(generator);
    let texts = strings(&["first text", "BROKEN text", "third text"]);

    let out = reformulate_all(&services, &texts, DEFAULT_STYLE).await;
    assert_eq!(out.len(), 3);
    assert!(out[0].as_ref().unwrap().contains("first text"));
    assert!(out[0].as_ref().unwrap().contains("academic style"));
    assert!(out[1].is_err());
    assert!(out[2].as_ref().unwrap().contains("third text"));
}

#[tokio::test]
async fn reformulation_concurrency_is_bounded() {
    let generator = Arc::new(EchoGenerator::slow(Duration::from_millis(20)));
    let embedder = Arc::new(HashEmbedder::new(16).unwrap());
    let pipeline = thesis_core::config::PipelineSettings { max_concurrency: 2, ..Default::default() };
    let services = Services::new(embedder, generator.clone()).with_pipeline(&pipeline);
    let texts: Vec<String> = (0..8).map(|i| format!("passage {i}")).collect();

    let out = reformulate_all(&services, &texts, DEFAULT_STYLE).await;
    assert!(out.iter().all(|r| r.is_ok()));
    assert!(generator.max_in_flight.load(Ordering::SeqCst) <= 2);
    assert_eq!(generator.calls.load(Ordering::SeqCst), 8);
}

#[tokio::test]
async fn slow_generation_times_out() {
    let generator = Arc::new(EchoGenerator::slow(Duration::from_secs(5)));
    let embedder = Arc::new(HashEmbedder::new(16).unwrap());
    let services = Services::new(embedder, generator).with_call_timeout(Duration::from_millis(50));
    let err = synthesize(&services, &strings(&["text"]), None).await.unwrap_err();
    assert!(matches!(err, Error::Timeout { ref service, .. } if service == "echo"), "got {err:?}");
}

#[tokio::test]
async fn coverage_is_repeatable_and_bounded() {
    let services = services();
    let passages = strings(&["soil erosion after heavy rain", "cover crops reduce soil erosion"]);
    let on_topic = "Heavy rain drives soil erosion, which cover crops reduce.";

    let first = coverage_score(&services, on_topic, &passages).await.unwrap();
    let second = coverage_score(&services, on_topic, &passages).await.unwrap();
    assert_eq!(first, second);
    assert!((-1.0..=1.0).contains(&first));

    let off_topic = coverage_score(&services, "baroque counterpoint", &passages).await.unwrap();
    assert!(first > off_topic);
    assert_eq!(coverage_score(&services, on_topic, &[]).await.unwrap(), 0.0);
}
