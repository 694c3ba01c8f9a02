//! Full Entry validation (spec §4.3 "Validation rules (Entry)"). Surfaced
//! to the Entry reconciler as a single entry point so a failure always
//! classifies as [`compound_common::ErrorKind::Validation`] — no retry
//! until `metadata.generation` changes.

use compound_common::{Classify, ErrorKind};
use compound_types::{DNSEntrySpec, EntryValues, RoutingPolicy, RoutingPolicyType};

use crate::{dns_name, target::{self, TargetError}};

/// Lowest TTL this controller will ever write, absent a backend-specific
/// minimum (spec §9 open question: "the backend adapter ... must return a
/// permanent error rather than silently clamping" below this).
pub const MIN_TTL: u32 = 1;
/// Highest TTL accepted; matches the common 32-bit signed TTL ceiling
/// shared by every backend in scope.
pub const MAX_TTL: u32 = i32::MAX as u32;
/// System-wide default when neither the Entry nor its Provider specify one
/// (spec §3 "Entry ... TTL ... falls back to provider default then system
/// default 300").
pub const SYSTEM_DEFAULT_TTL: u32 = 300;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("dns name {0:?} is not a syntactically valid FQDN")]
    InvalidDnsName(String),
    #[error("ttl must be greater than zero, got {0}")]
    NonPositiveTtl(u32),
    #[error("text must not be empty")]
    EmptyText,
    #[error(transparent)]
    Target(#[from] TargetError),
    #[error("routing policy {kind:?} requires parameter {parameter:?}")]
    MissingRoutingPolicyParameter {
        kind: RoutingPolicyType,
        parameter: &'static str,
    },
    #[error("weighted routing policy requires an integer weight, got {0:?}")]
    InvalidWeight(String),
    #[error("failover routing policy requires failoverRecordType of primary or secondary, got {0:?}")]
    InvalidFailoverRecordType(String),
}

impl Classify for ValidationError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Validation
    }
}

/// Validates an Entry spec end to end. Does not touch TTL defaulting
/// (that needs the resolved Provider and is computed by
/// [`crate::ttl::effective_ttl`] once a provider is selected).
pub fn validate_entry(spec: &DNSEntrySpec) -> Result<(), ValidationError> {
    if !dns_name::is_valid_fqdn(&spec.dns_name) {
        return Err(ValidationError::InvalidDnsName(spec.dns_name.clone()));
    }
    if let Some(ttl) = spec.ttl
        && ttl == 0
    {
        return Err(ValidationError::NonPositiveTtl(ttl));
    }
    match &spec.values {
        EntryValues::Targets { targets } => {
            target::classify_all(targets)?;
        }
        EntryValues::Text { text } => {
            if text.is_empty() {
                return Err(ValidationError::EmptyText);
            }
        }
    }
    if let Some(policy) = &spec.routing_policy {
        validate_routing_policy(policy)?;
    }
    Ok(())
}

fn validate_routing_policy(policy: &RoutingPolicy) -> Result<(), ValidationError> {
    let param = |name: &'static str| {
        policy
            .parameters
            .get(name)
            .ok_or(ValidationError::MissingRoutingPolicyParameter {
                kind: policy.type_,
                parameter: name,
            })
    };
    match policy.type_ {
        RoutingPolicyType::Weighted => {
            let weight = param("weight")?;
            if weight.parse::<u32>().is_err() {
                return Err(ValidationError::InvalidWeight(weight.clone()));
            }
        }
        RoutingPolicyType::Geolocation => {
            param("location")?;
        }
        RoutingPolicyType::Latency => {
            param("region")?;
        }
        RoutingPolicyType::Failover => {
            let kind = param("failoverRecordType")?;
            if kind != "primary" && kind != "secondary" {
                return Err(ValidationError::InvalidFailoverRecordType(kind.clone()));
            }
            param("healthCheckID")?;
        }
        RoutingPolicyType::IpBased => {
            param("collection")?;
            param("location")?;
        }
    }
    Ok(())
}

/// Clamps a requested TTL into `[MIN_TTL, MAX_TTL]`, falling back to the
/// provider default and then the system default (spec §3, §4.3).
pub fn effective_ttl(entry_ttl: Option<u32>, provider_default_ttl: u32) -> u32 {
    entry_ttl
        .unwrap_or(provider_default_ttl)
        .clamp(MIN_TTL, MAX_TTL)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn base_spec() -> DNSEntrySpec {
        DNSEntrySpec {
            dns_name: "a.example.test".into(),
            ttl: Some(120),
            values: EntryValues::Targets {
                targets: vec!["11.11.11.11".into()],
            },
            routing_policy: None,
        }
    }

    #[test]
    fn accepts_a_valid_spec() {
        assert!(validate_entry(&base_spec()).is_ok());
    }

    #[test]
    fn rejects_bad_dns_name() {
        let mut spec = base_spec();
        spec.dns_name = "-bad".into();
        assert!(matches!(
            validate_entry(&spec),
            Err(ValidationError::InvalidDnsName(_))
        ));
    }

    #[test]
    fn rejects_zero_ttl() {
        let mut spec = base_spec();
        spec.ttl = Some(0);
        assert_eq!(validate_entry(&spec), Err(ValidationError::NonPositiveTtl(0)));
    }

    #[test]
    fn rejects_empty_text() {
        let mut spec = base_spec();
        spec.values = EntryValues::Text { text: vec![] };
        assert_eq!(validate_entry(&spec), Err(ValidationError::EmptyText));
    }

    #[test]
    fn weighted_policy_requires_integer_weight() {
        let mut spec = base_spec();
        let mut params = BTreeMap::new();
        params.insert("weight".to_string(), "not-a-number".to_string());
        spec.routing_policy = Some(RoutingPolicy {
            type_: RoutingPolicyType::Weighted,
            set_identifier: "a".into(),
            parameters: params,
        });
        assert!(matches!(
            validate_entry(&spec),
            Err(ValidationError::InvalidWeight(_))
        ));
    }

    #[test]
    fn failover_requires_known_record_type_and_health_check() {
        let mut spec = base_spec();
        let mut params = BTreeMap::new();
        params.insert("failoverRecordType".to_string(), "tertiary".to_string());
        spec.routing_policy = Some(RoutingPolicy {
            type_: RoutingPolicyType::Failover,
            set_identifier: "a".into(),
            parameters: params,
        });
        assert!(matches!(
            validate_entry(&spec),
            Err(ValidationError::InvalidFailoverRecordType(_))
        ));
    }

    #[test]
    fn ttl_falls_back_to_provider_then_clamps() {
        assert_eq!(effective_ttl(Some(120), 300), 120);
        assert_eq!(effective_ttl(None, 600), 600);
        assert_eq!(effective_ttl(Some(0), 300), MIN_TTL);
    }
}
