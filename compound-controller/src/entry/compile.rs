//! Compiles a validated Entry spec, plus its resolved provider's default
//! TTL, into the desired `(RecordKey, RecordValue)` pairs the zone
//! registry tracks (spec §4.3 "derived in-memory model of owned zones";
//! spec §4.5 "desired: map (name, type) -> {ttl, values-set,
//! routingPolicy?}").

use std::collections::BTreeSet;
use std::net::IpAddr;

use compound_backend::{RecordKey, RecordType, RecordValue};
use compound_model::validate::effective_ttl;
use compound_types::{DNSEntrySpec, EntryValues};

/// One Entry may compile into more than one record key: a mixed
/// IPv4/IPv6 target list produces both an `A` and an `AAAA` key sharing
/// the same name. TXT values are wrapped in double quotes on the way in
/// so `status.targets` matches the zone-file convention (spec §8
/// scenario 2).
pub fn compile(spec: &DNSEntrySpec, provider_default_ttl: u32) -> Vec<(RecordKey, RecordValue)> {
    let name = compound_model::dns_name::normalize(&spec.dns_name);
    let ttl = effective_ttl(spec.ttl, provider_default_ttl);
    match &spec.values {
        EntryValues::Targets { targets } => compile_targets(&name, ttl, targets, spec),
        EntryValues::Text { text } => vec![(
            RecordKey::new(name, RecordType::Txt),
            RecordValue {
                ttl,
                values: text.iter().map(|t| format!("\"{t}\"")).collect(),
                routing_policy: spec.routing_policy.clone(),
            },
        )],
    }
}

fn compile_targets(name: &str, ttl: u32, targets: &[String], spec: &DNSEntrySpec) -> Vec<(RecordKey, RecordValue)> {
    let mut v4 = BTreeSet::new();
    let mut v6 = BTreeSet::new();
    let mut hostname = None;
    for target in targets {
        match target.parse::<IpAddr>() {
            Ok(IpAddr::V4(_)) => {
                v4.insert(target.clone());
            }
            Ok(IpAddr::V6(_)) => {
                v6.insert(target.clone());
            }
            Err(_) => hostname = Some(target.clone()),
        }
    }

    if let Some(hostname) = hostname {
        return vec![(
            RecordKey::new(name, RecordType::Cname),
            RecordValue { ttl, values: BTreeSet::from([hostname]), routing_policy: spec.routing_policy.clone() },
        )];
    }

    let mut out = Vec::new();
    if !v4.is_empty() {
        out.push((
            RecordKey::new(name, RecordType::A),
            RecordValue { ttl, values: v4, routing_policy: spec.routing_policy.clone() },
        ));
    }
    if !v6.is_empty() {
        out.push((
            RecordKey::new(name, RecordType::Aaaa),
            RecordValue { ttl, values: v6, routing_policy: spec.routing_policy.clone() },
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec_with(values: EntryValues) -> DNSEntrySpec {
        DNSEntrySpec { dns_name: "a.example.test".into(), ttl: Some(120), values, routing_policy: None }
    }

    #[test]
    fn compiles_address_targets_to_a_record() {
        let spec = spec_with(EntryValues::Targets { targets: vec!["11.11.11.11".into()] });
        let compiled = compile(&spec, 300);
        assert_eq!(compiled.len(), 1);
        assert_eq!(compiled[0].0.record_type, RecordType::A);
        assert_eq!(compiled[0].1.ttl, 120);
    }

    #[test]
    fn compiles_single_hostname_to_cname() {
        let spec = spec_with(EntryValues::Targets { targets: vec!["host.example.test".into()] });
        let compiled = compile(&spec, 300);
        assert_eq!(compiled.len(), 1);
        assert_eq!(compiled[0].0.record_type, RecordType::Cname);
    }

    #[test]
    fn compiles_text_with_quoted_values() {
        let spec = spec_with(EntryValues::Text { text: vec!["line1".into(), "line2 bla bla".into()] });
        let compiled = compile(&spec, 300);
        assert_eq!(compiled.len(), 1);
        assert_eq!(compiled[0].0.record_type, RecordType::Txt);
        assert!(compiled[0].1.values.contains("\"line1\""));
        assert!(compiled[0].1.values.contains("\"line2 bla bla\""));
    }

    #[test]
    fn falls_back_to_provider_default_ttl() {
        let mut spec = spec_with(EntryValues::Targets { targets: vec!["11.11.11.11".into()] });
        spec.ttl = None;
        let compiled = compile(&spec, 600);
        assert_eq!(compiled[0].1.ttl, 600);
    }

    #[test]
    fn splits_mixed_address_families_into_a_and_aaaa() {
        let spec = spec_with(EntryValues::Targets {
            targets: vec!["11.11.11.11".into(), "::1".into()],
        });
        let compiled = compile(&spec, 300);
        let types: BTreeSet<_> = compiled.iter().map(|(k, _)| k.record_type).collect();
        assert!(types.contains(&RecordType::A));
        assert!(types.contains(&RecordType::Aaaa));
    }
}
