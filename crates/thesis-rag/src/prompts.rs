//! Instruction templates sent to the generation service.

use thesis_core::types::UNKNOWN_SOURCE;

pub fn reformulation(text: &str, style: &str) -> String {
    format!(
        "Rewrite the following passage so that it can be used in a thesis, in a {style} style, \
         without copying its wording:\n\n{text}"
    )
}

/// `labelled` holds `(source label, text)` pairs in output order.
pub fn synthesis(labelled: &[(String, String)]) -> String {
    let mut combined = String::new();
    for (label, text) in labelled {
        combined.push_str(&format!("[{label}]: {text}\n"));
    }
    format!(
        "Write a clear and concise synthesis of these passages with academic rephrasing, \
         keeping the source references in square brackets:\n\n{combined}"
    )
}

/// Label for passage `i`; blank or missing sources become [`UNKNOWN_SOURCE`].
pub fn source_label(sources: Option<&[String]>, i: usize) -> String {
    sources
        .and_then(|s| s.get(i))
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .unwrap_or(UNKNOWN_SOURCE)
        .to_string()
}
