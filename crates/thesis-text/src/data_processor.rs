use std::path::{Path, PathBuf};

use thesis_core::traits::TextExtractor;
use thesis_core::types::{Document, Segment};
use thesis_core::Result;
use tracing::{debug, info};

use crate::extract::PlainTextExtractor;
use crate::segment::{clean_passages, segment};

#[derive(Debug, Clone)]
pub struct SegmentingConfig {
    pub min_length: usize,
    pub clean: bool,
}

impl Default for SegmentingConfig {
    fn default() -> Self {
        Self { min_length: 25, clean: true }
    }
}

/// Loads documents from a directory and turns them into source-tagged segments.
pub struct DataProcessor {
    config: SegmentingConfig,
    extractors: Vec<Box<dyn TextExtractor>>,
}

impl Default for DataProcessor {
    fn default() -> Self {
        Self::new(SegmentingConfig::default())
    }
}

impl DataProcessor {
    pub fn new(config: SegmentingConfig) -> Self {
        Self { config, extractors: vec![Box::new(PlainTextExtractor)] }
    }

    /// Register an extra extractor (e.g. a PDF bridge). Earlier extractors win.
    pub fn with_extractor(mut self, extractor: Box<dyn TextExtractor>) -> Self {
        self.extractors.push(extractor);
        self
    }

    pub fn process_directory(&self, data_dir: &Path) -> Result<Vec<Segment>> {
        self.process_directory_limited(data_dir, usize::MAX)
    }

    pub fn process_directory_limited(&self, data_dir: &Path, limit: usize) -> Result<Vec<Segment>> {
        let documents = self.load_documents(data_dir, limit)?;
        let segments = self.segment_documents(&documents);
        info!(documents = documents.len(), segments = segments.len(), dir = %data_dir.display(), "processed corpus directory");
        Ok(segments)
    }

    /// Extract every supported file under `data_dir` (sorted by path) into a document.
    pub fn load_documents(&self, data_dir: &Path, limit: usize) -> Result<Vec<Document>> {
        let mut files = self.list_supported_files(data_dir);
        if files.is_empty() {
            info!(dir = %data_dir.display(), "no supported files found");
            return Ok(vec![]);
        }
        if files.len() > limit {
            files.truncate(limit);
            info!(limit, "limited to first files");
        }
        let mut documents = Vec::with_capacity(files.len());
        for (file_index, file_path) in files.iter().enumerate() {
            debug!(file = %file_path.display(), n = file_index + 1, total = files.len(), "extracting");
            let Some(extractor) = self.extractors.iter().find(|e| e.supports(file_path)) else { continue };
            let text = extractor.extract(file_path)?;
            documents.push(Document { id: extract_doc_id(file_path), text });
        }
        Ok(documents)
    }

    pub fn segment_documents(&self, documents: &[Document]) -> Vec<Segment> {
        documents.iter().flat_map(|d| self.segment_document(d)).collect()
    }

    pub fn segment_document(&self, document: &Document) -> Vec<Segment> {
        let mut parts = segment(&document.text, self.config.min_length);
        if self.config.clean {
            parts = clean_passages(parts);
        }
        parts
            .into_iter()
            .map(|text| Segment { source: document.id.clone(), text })
            .collect()
    }

    fn list_supported_files(&self, root: &Path) -> Vec<PathBuf> {
        let mut out = Vec::new();
        for entry in walkdir::WalkDir::new(root).into_iter().filter_map(|e| e.ok()).filter(|e| e.file_type().is_file()) {
            let path = entry.path();
            if self.extractors.iter().any(|e| e.supports(path)) {
                out.push(path.to_path_buf());
            }
        }
        out.sort();
        out
    }
}

fn extract_doc_id(file_path: &Path) -> String {
    file_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| file_path.to_string_lossy().to_string())
}
