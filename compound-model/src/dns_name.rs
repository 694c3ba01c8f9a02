//! DNS name normalization (spec §4.3: "normalizes DNS names (lower-case,
//! strip trailing dot for storage, canonical with dot on the wire)").

/// Normalizes a user-supplied name for storage and comparison: lower-cased,
/// trailing dot stripped. A leading `*` wildcard label is preserved
/// (spec §8 scenario 4 "wildcard").
pub fn normalize(raw: &str) -> String {
    raw.trim_end_matches('.').to_ascii_lowercase()
}

/// The canonical on-the-wire form of a normalized name: always
/// dot-terminated, as backend handlers and zone files expect.
pub fn canonical(stored: &str) -> String {
    if stored.is_empty() {
        ".".to_string()
    } else {
        format!("{stored}.")
    }
}

/// Labels of a normalized name, outermost label first (`a.example.test`
/// -> `["a", "example", "test"]`).
pub fn labels(normalized: &str) -> Vec<&str> {
    if normalized.is_empty() {
        Vec::new()
    } else {
        normalized.split('.').collect()
    }
}

/// Labels in reverse (root-first) order, the walk direction the provider
/// suffix trie indexes on (spec §4.4 "reversed DNS labels").
pub fn reversed_labels(normalized: &str) -> Vec<&str> {
    let mut l = labels(normalized);
    l.reverse();
    l
}

/// Syntactic FQDN validity (spec §4.3): 1-63 char labels of letters,
/// digits and hyphens (never starting/ending with one), at most 253
/// characters total, with an optional single leading wildcard label.
pub fn is_valid_fqdn(raw: &str) -> bool {
    let name = normalize(raw);
    if name.is_empty() || name.len() > 253 {
        return false;
    }
    let labels: Vec<&str> = name.split('.').collect();
    if labels.iter().any(|l| l.is_empty()) {
        return false;
    }
    labels.iter().enumerate().all(|(i, label)| {
        if i == 0 && *label == "*" {
            return true;
        }
        is_valid_label(label)
    })
}

fn is_valid_label(label: &str) -> bool {
    if label.is_empty() || label.len() > 63 {
        return false;
    }
    let bytes = label.as_bytes();
    let alnum_hyphen = bytes
        .iter()
        .all(|b| b.is_ascii_alphanumeric() || *b == b'-');
    alnum_hyphen && bytes[0] != b'-' && bytes[bytes.len() - 1] != b'-'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_case_and_trailing_dot() {
        assert_eq!(normalize("Example.TEST."), "example.test");
        assert_eq!(normalize("example.test"), "example.test");
    }

    #[test]
    fn canonical_always_trailing_dot() {
        assert_eq!(canonical("example.test"), "example.test.");
    }

    #[test]
    fn reverses_labels() {
        assert_eq!(
            reversed_labels("a.example.test"),
            vec!["test", "example", "a"]
        );
    }

    #[test]
    fn accepts_plain_and_wildcard_names() {
        assert!(is_valid_fqdn("a.example.test"));
        assert!(is_valid_fqdn("*.wc.example.test"));
        assert!(is_valid_fqdn("example.test."));
    }

    #[test]
    fn rejects_malformed_names() {
        assert!(!is_valid_fqdn(""));
        assert!(!is_valid_fqdn("-bad.example.test"));
        assert!(!is_valid_fqdn("a..example.test"));
        assert!(!is_valid_fqdn(&"a".repeat(64)));
    }
}
