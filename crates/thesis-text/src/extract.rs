use std::fs;
use std::path::Path;

use thesis_core::traits::TextExtractor;
use thesis_core::{Error, Result};

/// Reads `.txt` files, falling back to lossy UTF-8 for mis-encoded input.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn supports(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|s| s.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("txt"))
    }

    fn extract(&self, path: &Path) -> Result<String> {
        match fs::read_to_string(path) {
            Ok(content) => Ok(content),
            Err(_) => {
                let bytes = fs::read(path)
                    .map_err(|e| Error::storage(format!("cannot read {}: {e}", path.display())))?;
                Ok(String::from_utf8_lossy(&bytes).to_string())
            }
        }
    }
}
