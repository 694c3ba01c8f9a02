//! Classifies an Entry's `targets` as addresses or hostnames and rejects
//! mixing the two (spec §3: "mixing hostnames with literals is rejected; a
//! single hostname becomes a CNAME/alias"; spec §4.3 "must each parse as
//! IPv4, IPv6, or hostname and must be homogeneous in the literal-vs-
//! hostname axis").

use std::net::IpAddr;

use crate::dns_name;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    /// One or more IPv4/IPv6 literals -> A/AAAA records.
    Address,
    /// Exactly one hostname -> a CNAME/alias record.
    Hostname,
}

/// Classifies a single target string.
pub fn classify(raw: &str) -> TargetKind {
    if raw.parse::<IpAddr>().is_ok() {
        TargetKind::Address
    } else {
        TargetKind::Hostname
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TargetError {
    #[error("targets must not be empty")]
    Empty,
    #[error("targets mix address literals and hostnames")]
    Mixed,
    #[error("a hostname target must appear alone, got {0} targets")]
    MultipleHostnames(usize),
    #[error("target {0:?} is not a valid IPv4/IPv6 literal or hostname")]
    Malformed(String),
}

/// Validates and classifies a target list as a whole, enforcing
/// homogeneity and the "single hostname" CNAME rule.
pub fn classify_all(targets: &[String]) -> Result<TargetKind, TargetError> {
    if targets.is_empty() {
        return Err(TargetError::Empty);
    }
    for t in targets {
        if t.parse::<IpAddr>().is_err() && !dns_name::is_valid_fqdn(t) {
            return Err(TargetError::Malformed(t.clone()));
        }
    }
    let kinds: Vec<TargetKind> = targets.iter().map(|t| classify(t)).collect();
    let first = kinds[0];
    if kinds.iter().any(|k| *k != first) {
        return Err(TargetError::Mixed);
    }
    if first == TargetKind::Hostname && targets.len() > 1 {
        return Err(TargetError::MultipleHostnames(targets.len()));
    }
    Ok(first)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_literals_and_hostnames() {
        assert_eq!(classify("11.11.11.11"), TargetKind::Address);
        assert_eq!(classify("::1"), TargetKind::Address);
        assert_eq!(classify("google-public-dns-a.google.com"), TargetKind::Hostname);
    }

    #[test]
    fn accepts_homogeneous_address_lists() {
        let kind = classify_all(&["11.11.11.11".into(), "22.22.22.22".into()]).unwrap();
        assert_eq!(kind, TargetKind::Address);
    }

    #[test]
    fn accepts_single_hostname() {
        let kind = classify_all(&["google-public-dns-a.google.com".into()]).unwrap();
        assert_eq!(kind, TargetKind::Hostname);
    }

    #[test]
    fn rejects_mixed_targets() {
        let err = classify_all(&["11.11.11.11".into(), "host.example.test".into()]).unwrap_err();
        assert_eq!(err, TargetError::Mixed);
    }

    #[test]
    fn rejects_multiple_hostnames() {
        let err = classify_all(&["a.example.test".into(), "b.example.test".into()]);
        assert_eq!(err, Err(TargetError::MultipleHostnames(2)));
    }

    #[test]
    fn rejects_empty() {
        assert_eq!(classify_all(&[]), Err(TargetError::Empty));
    }
}
