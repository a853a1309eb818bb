//! Identifier helpers: shortening, case conversion and sanitizing.

use sha2::{Digest, Sha256};

/// Number of hex characters spliced into a shortened identifier.
pub const HASH_LENGTH: usize = 8;

/// Maximum length of a stack output export name.
pub const MAX_EXPORT_NAME_LENGTH: usize = 255;

/// Shorten `id` to at most `max_length` characters.
///
/// Identifiers that already fit are returned unchanged. Longer ones keep a
/// prefix and a suffix of the original and get the first eight hex digits of
/// their SHA-256 hash in the middle, so the result is exactly `max_length`
/// characters long and distinct inputs stay distinct in practice.
///
/// ```
/// use camp_core::naming::shorten;
///
/// assert_eq!(shorten("short", 10), "short");
/// assert_eq!(shorten("a-rather-long-identifier", 16).chars().count(), 16);
/// ```
pub fn shorten(id: &str, max_length: usize) -> String {
    let length = id.chars().count();
    if length <= max_length {
        return id.to_string();
    }

    let hash = content_hash(id);
    if max_length <= HASH_LENGTH {
        return hash[..max_length].to_string();
    }

    let keep = max_length - HASH_LENGTH;
    let head = keep / 2;
    let tail = keep - head;

    let prefix: String = id.chars().take(head).collect();
    let suffix: String = id.chars().skip(length - tail).collect();
    format!("{}{}{}", prefix, &hash[..HASH_LENGTH], suffix)
}

/// Hex-encoded SHA-256 of `value`.
pub fn content_hash(value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    hex::encode(hasher.finalize())
}

/// Split an identifier into words on separators and case changes.
fn words(s: &str) -> Vec<String> {
    let chars: Vec<char> = s.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }

        if let Some(prev) = current.chars().last() {
            let next = chars.get(i + 1).copied();
            let lower_to_upper = prev.is_lowercase() && c.is_uppercase();
            // "HTTPServer" splits before the "S"
            let acronym_end = prev.is_uppercase()
                && c.is_uppercase()
                && next.map(|n| n.is_lowercase()).unwrap_or(false);
            if lower_to_upper || acronym_end {
                words.push(std::mem::take(&mut current));
            }
        }
        current.push(c);
    }

    if !current.is_empty() {
        words.push(current);
    }
    words
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(|c| c.to_lowercase())).collect(),
        None => String::new(),
    }
}

/// `my-app-db-secret` → `myAppDbSecret`.
pub fn camel_case(s: &str) -> String {
    words(s)
        .iter()
        .enumerate()
        .map(|(i, w)| if i == 0 { w.to_lowercase() } else { capitalize(w) })
        .collect()
}

/// `my-app-production` → `MyAppProduction`.
pub fn upper_camel_case(s: &str) -> String {
    words(s).iter().map(|w| capitalize(w)).collect()
}

/// Replace everything that is not valid in a shell variable name with `_`.
pub fn sanitize_env_name(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

/// Export names allow alphanumerics, colons and hyphens only.
pub fn unique_export_name(stack_artifact_id: &str, logical_id: &str) -> String {
    let raw: String = format!("{}:{}", stack_artifact_id, logical_id)
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == ':' || c == '-' { c } else { '-' })
        .collect();
    shorten(&raw, MAX_EXPORT_NAME_LENGTH)
}
