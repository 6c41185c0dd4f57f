//! Version-salted content hashing for duplicate detection.
//!
//! Identical résumé text under the same prompt version is the same analysis.
//! Salting with `PROMPT_VERSION` means a scoring-logic change invalidates
//! every previously stored hash, forcing reanalysis instead of silently
//! serving stale results.

use sha2::{Digest, Sha256};

use crate::analysis::prompts::PROMPT_VERSION;

/// SHA-256 of the trimmed résumé text concatenated with the prompt version,
/// hex-encoded.
pub fn content_hash(text: &str) -> String {
    hash_with_version(text, PROMPT_VERSION)
}

fn hash_with_version(text: &str, version: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.trim().as_bytes());
    hasher.update(version.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_text_same_hash() {
        let a = content_hash("Name: Ana Souza\nSkills: Python, SQL");
        let b = content_hash("Name: Ana Souza\nSkills: Python, SQL");
        assert_eq!(a, b);
    }

    #[test]
    fn test_surrounding_whitespace_is_ignored() {
        assert_eq!(content_hash("resume text"), content_hash("  resume text\n"));
    }

    #[test]
    fn test_different_text_different_hash() {
        assert_ne!(content_hash("resume a"), content_hash("resume b"));
    }

    #[test]
    fn test_version_bump_changes_hash() {
        let current = hash_with_version("resume text", PROMPT_VERSION);
        let bumped = hash_with_version("resume text", "99.0");
        assert_ne!(current, bumped);
    }

    #[test]
    fn test_hash_is_hex_sha256() {
        let h = content_hash("resume text");
        assert_eq!(h.len(), 64);
        assert!(h.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
