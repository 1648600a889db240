/// Split raw text into trimmed passages on blank-line boundaries.
///
/// Runs of two or more newlines separate passages; `\r\n` is treated as `\n`.
/// Passages shorter than `min_length` characters after trimming are dropped.
/// Order is preserved and empty input yields no passages.
pub fn segment(raw: &str, min_length: usize) -> Vec<String> {
    let normalized = raw.replace("\r\n", "\n");
    normalized
        .split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty() && p.chars().count() >= min_length)
        .map(str::to_string)
        .collect()
}

/// Drop passages that look like references, headings or tables.
pub fn clean_passages(passages: Vec<String>) -> Vec<String> {
    passages.into_iter().filter(|p| !is_noise(p)).collect()
}

/// A passage is noise when it is a URL/DOI line, shouted in capitals, or mostly digits.
pub fn is_noise(passage: &str) -> bool {
    let lower = passage.to_lowercase();
    if lower.starts_with("doi") || lower.contains("http") {
        return true;
    }
    let mut letters = 0usize;
    let mut digits = 0usize;
    let mut has_lower = false;
    for c in passage.chars() {
        if c.is_alphabetic() {
            letters += 1;
            if c.is_lowercase() {
                has_lower = true;
            }
        } else if c.is_numeric() {
            digits += 1;
        }
    }
    // all-caps requires at least one cased letter
    let all_caps = letters > 0 && !has_lower && passage.chars().any(char::is_uppercase);
    all_caps || digits > letters
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_runs_of_blank_lines() {
        let out = segment("first para\n\n\n\nsecond para\r\n\r\nthird", 0);
        assert_eq!(out, vec!["first para", "second para", "third"]);
    }

    #[test]
    fn single_newlines_stay_inside_a_passage() {
        let out = segment("line one\nline two\n\nnext", 0);
        assert_eq!(out, vec!["line one\nline two", "next"]);
    }

    #[test]
    fn numeric_table_is_noise() {
        assert!(is_noise("12 13 14 15 a"));
        assert!(!is_noise("Table 1 shows 3 results"));
    }
}
