//! Handle extraction from text files
//!
//! Feeds the aggregator's explicit mode: arbitrary text files are scanned
//! for `@name` tokens. A token directly preceded by an identifier character
//! is skipped, which keeps email addresses and `user@host` forms out of the
//! subject list.

use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

use crate::error::Result;

fn handle_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"@([A-Za-z0-9_]+)").expect("valid handle pattern"))
}

/// Extract handle tokens from `text`, without the leading `@`.
///
/// Duplicates are dropped on exact match; first occurrence wins and scan
/// order is preserved.
pub fn extract_handles(text: &str) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut handles = Vec::new();

    for found in handle_pattern().find_iter(text) {
        if let Some(preceding) = text[..found.start()].chars().next_back() {
            if preceding.is_ascii_alphanumeric() || preceding == '_' {
                continue;
            }
        }
        let handle = &found.as_str()[1..];
        if seen.insert(handle) {
            handles.push(handle.to_string());
        }
    }

    handles
}

/// Extract handles from several files, deduplicated across all of them in
/// file-scan order.
pub fn extract_handles_from_files<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<String>> {
    let mut seen = std::collections::HashSet::new();
    let mut handles = Vec::new();
    for path in paths {
        let text = std::fs::read_to_string(path)?;
        for handle in extract_handles(&text) {
            if seen.insert(handle.clone()) {
                handles.push(handle);
            }
        }
    }
    Ok(handles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_extracts_simple_handles() {
        let handles = extract_handles("follow @alice and @bob_99 today");
        assert_eq!(handles, vec!["alice", "bob_99"]);
    }

    #[test]
    fn test_rejects_email_like_tokens() {
        let handles = extract_handles("mail me at alice@example.com or ping @bob");
        assert_eq!(handles, vec!["bob"]);
    }

    #[test]
    fn test_rejects_domain_part_of_full_fediverse_address() {
        // Only the local part qualifies; "@mastodon" is preceded by 'e'
        let handles = extract_handles("@alice@mastodon.social");
        assert_eq!(handles, vec!["alice"]);
    }

    #[test]
    fn test_dedup_preserves_first_occurrence_order() {
        let handles = extract_handles("@carol @alice @carol @bob @alice");
        assert_eq!(handles, vec!["carol", "alice", "bob"]);
    }

    #[test]
    fn test_dedup_is_exact_match() {
        let handles = extract_handles("@Bob and @bob");
        assert_eq!(handles, vec!["Bob", "bob"]);
    }

    #[test]
    fn test_handle_at_start_of_text() {
        assert_eq!(extract_handles("@first word"), vec!["first"]);
    }

    #[test]
    fn test_punctuation_before_handle_is_fine() {
        let handles = extract_handles("(@paren) ,@comma .@dot");
        assert_eq!(handles, vec!["paren", "comma", "dot"]);
    }

    #[test]
    fn test_no_handles() {
        assert!(extract_handles("nothing to see here").is_empty());
        assert!(extract_handles("").is_empty());
        assert!(extract_handles("@ alone").is_empty());
    }

    #[test]
    fn test_extract_from_files_dedups_across_files() {
        let mut first = tempfile::NamedTempFile::new().unwrap();
        writeln!(first, "cc @alice @bob").unwrap();
        let mut second = tempfile::NamedTempFile::new().unwrap();
        writeln!(second, "also @bob @carol").unwrap();

        let handles =
            extract_handles_from_files(&[first.path(), second.path()]).unwrap();
        assert_eq!(handles, vec!["alice", "bob", "carol"]);
    }

    #[test]
    fn test_extract_from_missing_file_is_error() {
        let result = extract_handles_from_files(&[Path::new("/nonexistent/list.txt")]);
        assert!(result.is_err());
    }
}
