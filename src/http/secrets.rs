//! Secret redaction (spec.md §4.2 "Secret redaction"). Used to sanitize the
//! request snapshot echoed on both success and failure so a caller-supplied
//! secret never reaches a log line or an error's `request.data` /
//! `request.formattedData` verbatim.

use super::body::urlencode;
use super::descriptor::DataType;
use aho_corasick::AhoCorasick;

const PLACEHOLDER: &str = "[SECRET]";

/// Replace every occurrence of any `needle` in `text` with the fixed
/// placeholder token, in one pass.
pub fn redact(text: &str, needles: &[String]) -> String {
    let needles: Vec<&str> = needles.iter().filter(|n| !n.is_empty()).map(String::as_str).collect();
    if needles.is_empty() || text.is_empty() {
        return text.to_string();
    }
    let Ok(automaton) = AhoCorasick::new(&needles) else {
        return text.to_string();
    };
    let replacements = vec![PLACEHOLDER; needles.len()];
    automaton.replace_all(text, &replacements)
}

/// Encode a secret the same way the formatted body would encode it, so the
/// search for the needle actually finds it post-formatting (spec.md §4.2:
/// "The encoding of the secret must match the body encoding").
pub fn encode_secret_for_data_type(secret: &str, data_type: DataType) -> String {
    match data_type {
        DataType::Form => urlencode(secret),
        DataType::Json => secret.replace('"', "\\\""),
        DataType::Raw => secret.to_string(),
        // Binary and stream bodies are rendered as fixed placeholders and
        // are never scanned.
        DataType::Binary | DataType::Stream => secret.to_string(),
    }
}

/// Redact `formatted_data` using secrets encoded for `data_type`; binary
/// and stream bodies are never scanned (already rendered as placeholders).
pub fn redact_formatted(formatted_data: &str, data_type: DataType, secrets: &[String]) -> String {
    if matches!(data_type, DataType::Binary | DataType::Stream) {
        return formatted_data.to_string();
    }
    let encoded: Vec<String> = secrets
        .iter()
        .map(|s| encode_secret_for_data_type(s, data_type))
        .collect();
    redact(formatted_data, &encoded)
}

/// Redact the echoed `original_data` view — the pre-formatting loggable
/// representation (`body::FormattedRequest::original_data`). Unlike the
/// formatted wire body, this is never URL-encoded even for `form` requests
/// (it's the raw `k=v` join), so secrets must be searched verbatim there
/// regardless of data type; `json`'s original view is the same encoded
/// string as its formatted view, so it still needs quote-escaping.
pub fn redact_original(original_data: &str, data_type: DataType, secrets: &[String]) -> String {
    if matches!(data_type, DataType::Binary | DataType::Stream) {
        return original_data.to_string();
    }
    let search_type = if data_type == DataType::Json { DataType::Json } else { DataType::Raw };
    let encoded: Vec<String> = secrets
        .iter()
        .map(|s| encode_secret_for_data_type(s, search_type))
        .collect();
    redact(original_data, &encoded)
}
