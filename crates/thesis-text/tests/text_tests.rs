use std::collections::HashSet;
use std::fs;
use tempfile::TempDir;

use thesis_core::types::Document;
use thesis_text::data_processor::SegmentingConfig;
use thesis_text::{clean_passages, segment, DataProcessor};

#[test]
fn min_length_drops_short_segments() {
    let raw = "A short line.\n\nThis is a much longer paragraph exceeding twenty-five characters.";
    let out = segment(raw, 25);
    assert_eq!(out, vec!["This is a much longer paragraph exceeding twenty-five characters."]);
}

#[test]
fn empty_input_yields_nothing() {
    assert!(segment("", 0).is_empty());
    assert!(segment("\n\n\n\n", 0).is_empty());
}

#[test]
fn cleaning_removes_noise_and_keeps_order() {
    let input = vec![
        "First real passage about soil erosion.".to_string(),
        "doi:10.1000/182".to_string(),
        "See https://example.org for more".to_string(),
        "CHAPTER TWO: METHODS".to_string(),
        "2019 2020 2021 12.5 13.7".to_string(),
        "Second real passage, with 3 numbers and 2 more.".to_string(),
    ];
    let out = clean_passages(input);
    assert_eq!(
        out,
        vec![
            "First real passage about soil erosion.".to_string(),
            "Second real passage, with 3 numbers and 2 more.".to_string(),
        ]
    );
}

#[test]
fn document_segments_are_tagged_with_source() {
    let processor = DataProcessor::new(SegmentingConfig { min_length: 0, clean: false });
    let doc = Document { id: "doc1".into(), text: "alpha passage\n\nbeta passage".into() };
    let segs = processor.segment_document(&doc);
    assert_eq!(segs.len(), 2);
    assert!(segs.iter().all(|s| s.source == "doc1"));
    assert_eq!(segs[1].text, "beta passage");
}

#[test]
fn process_directory_reads_txt_files_only() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    fs::write(dir.join("a.txt"), "Paragraph one of article a, long enough.\n\nshort").unwrap();
    fs::write(dir.join("b.txt"), "Paragraph one of article b, also long enough.").unwrap();
    fs::write(dir.join("ignored.md"), "Markdown is not ingested by default at all.").unwrap();

    let processor = DataProcessor::default();
    let segs = processor.process_directory(dir).expect("process");

    assert_eq!(segs.len(), 2);
    assert_eq!(segs[0].source, "a");
    assert_eq!(segs[1].source, "b");
}

#[test]
fn process_directory_limited_two_files_limit_one() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    fs::write(dir.join("a.txt"), "alpha bravo charlie delta echo foxtrot").unwrap();
    fs::write(dir.join("b.txt"), "golf hotel india juliet kilo lima mike").unwrap();

    let processor = DataProcessor::default();
    let segs = processor.process_directory_limited(dir, 1).expect("process limited");

    let sources: HashSet<_> = segs.iter().map(|s| s.source.clone()).collect();
    assert_eq!(sources.len(), 1, "limited to one source document");
}

#[test]
fn missing_directory_is_empty_not_error() {
    let processor = DataProcessor::default();
    let segs = processor.process_directory(std::path::Path::new("/definitely/not/here")).expect("ok");
    assert!(segs.is_empty());
}
