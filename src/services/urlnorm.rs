/// Guarantee an operator-entered website carries an explicit scheme.
///
/// Lines already starting with `http://` or `https://` pass through
/// unchanged; anything else gets `https://` prepended. No host validation,
/// no punycode handling.
pub fn normalize_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    }
}

/// Normalize a whole submission, dropping blank lines.
pub fn normalize_urls(raw: &[String]) -> Vec<String> {
    raw.iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| normalize_url(line))
        .collect()
}

/// Exact case-sensitive dedup, preserving first-seen order. Used for
/// extracted lists (emails, URLs); intentionally no smarter equivalence
/// than string equality.
pub fn dedup_exact(values: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    values
        .into_iter()
        .filter(|v| seen.insert(v.clone()))
        .collect()
}
