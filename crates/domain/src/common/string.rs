//! String normalization utilities.

use crate::error::DomainError;

/// Trim a display name and reject it when blank.
///
/// # Examples
///
/// ```
/// use questkeep_domain::common::require_name;
///
/// assert_eq!(require_name("party", "  The Company ").unwrap(), "The Company");
/// assert!(require_name("party", "   ").is_err());
/// ```
pub fn require_name(what: &str, name: impl Into<String>) -> Result<String, DomainError> {
    let name = name.into().trim().to_string();
    if name.is_empty() {
        return Err(DomainError::validation(format!("{} name cannot be empty", what)));
    }
    Ok(name)
}

/// Trim tags, drop blanks and case-insensitive duplicates, keeping first-seen order.
pub fn normalize_tags(tags: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.trim();
        if tag.is_empty() || out.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
            continue;
        }
        out.push(tag.to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_tags_dedupes_case_insensitively() {
        let tags = normalize_tags(vec![
            " undead ".to_string(),
            "Undead".to_string(),
            String::new(),
            "boss".to_string(),
        ]);
        assert_eq!(tags, vec!["undead".to_string(), "boss".to_string()]);
    }
}
