//! thesis-text
//!
//! Passage segmentation, noise cleaning and directory ingestion. Text
//! extraction from binary formats is delegated to a `TextExtractor`.

pub mod data_processor;
pub mod extract;
pub mod segment;

pub use data_processor::DataProcessor;
pub use extract::PlainTextExtractor;
pub use segment::{clean_passages, is_noise, segment};
