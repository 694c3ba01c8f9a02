//! Custom resource types for the two declarative resources this controller
//! reconciles: [`DNSProvider`] and [`DNSEntry`] (spec §3, §6).

use k8s_openapi::apimachinery::pkg::apis::meta::v1::{Condition, Time};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt, str::FromStr};

/// Backend a [`DNSProvider`] materializes records at. The core only ever
/// sees this as an opaque routing key into the backend handler registry
/// (spec §4.6) — it never depends on a backend SDK type.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderType {
    AwsRoute53,
    GoogleCloudDns,
    AzureDns,
    Alicloud,
    OpenstackDesignate,
    Cloudflare,
    Infoblox,
    /// In-memory mock backend, useful for tests and local development.
    Mock,
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProviderType::AwsRoute53 => "aws-route53",
            ProviderType::GoogleCloudDns => "google-cloud-dns",
            ProviderType::AzureDns => "azure-dns",
            ProviderType::Alicloud => "alicloud",
            ProviderType::OpenstackDesignate => "openstack-designate",
            ProviderType::Cloudflare => "cloudflare",
            ProviderType::Infoblox => "infoblox",
            ProviderType::Mock => "mock",
        };
        write!(f, "{s}")
    }
}

impl FromStr for ProviderType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "aws-route53" => Ok(ProviderType::AwsRoute53),
            "google-cloud-dns" => Ok(ProviderType::GoogleCloudDns),
            "azure-dns" => Ok(ProviderType::AzureDns),
            "alicloud" => Ok(ProviderType::Alicloud),
            "openstack-designate" => Ok(ProviderType::OpenstackDesignate),
            "cloudflare" => Ok(ProviderType::Cloudflare),
            "infoblox" => Ok(ProviderType::Infoblox),
            "mock" => Ok(ProviderType::Mock),
            other => Err(format!("unknown provider type: {other}")),
        }
    }
}

/// A reference to the opaque secret holding backend credentials, always
/// resolved in the Provider's own namespace.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct SecretRef {
    pub name: String,
}

/// A suffix-based include/exclude scope, used for both domain names and
/// backend zone identifiers (spec §3 "domain scope", "zone scope").
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct Scope {
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
}

fn default_ttl() -> u32 {
    300
}

#[derive(CustomResource, Serialize, Deserialize, Default, Debug, PartialEq, Clone, JsonSchema)]
#[kube(
    group = "dns.compound.io",
    version = "v1",
    kind = "DNSProvider",
    plural = "dnsproviders",
    shortname = "dnsp",
    derive = "PartialEq",
    status = "DNSProviderStatus",
    namespaced
)]
#[kube(derive = "Default")]
#[kube(
    printcolumn = "{\"jsonPath\": \".status.state\", \"name\": \"STATE\", \"type\": \"string\" }"
)]
#[kube(
    printcolumn = "{\"jsonPath\": \".spec.type\", \"name\": \"TYPE\", \"type\": \"string\" }"
)]
pub struct DNSProviderSpec {
    #[serde(rename = "type")]
    pub type_: ProviderType,
    #[serde(rename = "secretRef")]
    pub secret_ref: SecretRef,
    #[serde(default)]
    pub domains: Scope,
    #[serde(default)]
    pub zones: Scope,
    /// Opaque backend-specific sub-config (region, project id, ...); the
    /// core never interprets this, only forwards it to the handler.
    #[serde(default, rename = "providerConfig")]
    pub provider_config: Option<serde_json::Value>,
    #[serde(default = "default_ttl", rename = "defaultTTL")]
    pub default_ttl: u32,
}

impl Default for ProviderType {
    fn default() -> Self {
        ProviderType::Mock
    }
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, JsonSchema, Default)]
pub enum ProviderPhase {
    #[default]
    Pending,
    Ready,
    Error,
    Deleting,
}

impl FromStr for ProviderPhase {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(ProviderPhase::Pending),
            "Ready" => Ok(ProviderPhase::Ready),
            "Error" => Ok(ProviderPhase::Error),
            "Deleting" => Ok(ProviderPhase::Deleting),
            _ => Err(()),
        }
    }
}

impl fmt::Display for ProviderPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderPhase::Pending => write!(f, "Pending"),
            ProviderPhase::Ready => write!(f, "Ready"),
            ProviderPhase::Error => write!(f, "Error"),
            ProviderPhase::Deleting => write!(f, "Deleting"),
        }
    }
}

/// The subset of a [`Scope`] that actually matched something live on the
/// backend, as opposed to what the spec merely requested.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct EffectiveScope {
    #[serde(default)]
    pub included: Vec<String>,
    #[serde(default)]
    pub excluded: Vec<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct DNSProviderStatus {
    pub state: ProviderPhase,
    pub message: Option<String>,
    #[serde(default)]
    pub domains: EffectiveScope,
    #[serde(default)]
    pub zones: EffectiveScope,
    #[serde(rename = "observedGeneration")]
    pub observed_generation: Option<i64>,
    #[serde(rename = "lastUpdated")]
    pub last_updated: Option<Time>,
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

/// Kind of routing policy parameter schema (spec §4.3).
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum RoutingPolicyType {
    Weighted,
    Geolocation,
    Latency,
    Failover,
    IpBased,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct RoutingPolicy {
    #[serde(rename = "type")]
    pub type_: RoutingPolicyType,
    #[serde(rename = "setIdentifier")]
    pub set_identifier: String,
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
}

/// An entry's values are either resolvable targets (addresses or other
/// names to alias) or opaque text records — mutually exclusive on the wire
/// (spec §3 "targets vs. text are mutually exclusive").
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, JsonSchema)]
#[serde(untagged)]
pub enum EntryValues {
    Targets { targets: Vec<String> },
    Text { text: Vec<String> },
}

#[derive(CustomResource, Serialize, Deserialize, Debug, PartialEq, Clone, JsonSchema)]
#[kube(
    group = "dns.compound.io",
    version = "v1",
    kind = "DNSEntry",
    plural = "dnsentries",
    shortname = "dnse",
    derive = "PartialEq",
    status = "DNSEntryStatus",
    namespaced
)]
#[kube(derive = "Default")]
#[kube(
    printcolumn = "{\"jsonPath\": \".status.state\", \"name\": \"STATE\", \"type\": \"string\" }"
)]
#[kube(
    printcolumn = "{\"jsonPath\": \".spec.dnsName\", \"name\": \"DNSNAME\", \"type\": \"string\" }"
)]
pub struct DNSEntrySpec {
    #[serde(rename = "dnsName")]
    pub dns_name: String,
    pub ttl: Option<u32>,
    #[serde(flatten)]
    pub values: EntryValues,
    #[serde(default, rename = "routingPolicy")]
    pub routing_policy: Option<RoutingPolicy>,
}

impl Default for DNSEntrySpec {
    fn default() -> Self {
        Self {
            dns_name: String::new(),
            ttl: None,
            values: EntryValues::Targets { targets: vec![] },
            routing_policy: None,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, JsonSchema, Default)]
pub enum EntryPhase {
    #[default]
    Pending,
    Ready,
    Error,
    Invalid,
    Stale,
    Deleting,
}

impl FromStr for EntryPhase {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(EntryPhase::Pending),
            "Ready" => Ok(EntryPhase::Ready),
            "Error" => Ok(EntryPhase::Error),
            "Invalid" => Ok(EntryPhase::Invalid),
            "Stale" => Ok(EntryPhase::Stale),
            "Deleting" => Ok(EntryPhase::Deleting),
            _ => Err(()),
        }
    }
}

impl fmt::Display for EntryPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryPhase::Pending => write!(f, "Pending"),
            EntryPhase::Ready => write!(f, "Ready"),
            EntryPhase::Error => write!(f, "Error"),
            EntryPhase::Invalid => write!(f, "Invalid"),
            EntryPhase::Stale => write!(f, "Stale"),
            EntryPhase::Deleting => write!(f, "Deleting"),
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct DNSEntryStatus {
    pub state: EntryPhase,
    pub message: Option<String>,
    pub provider: Option<String>,
    #[serde(rename = "providerType")]
    pub provider_type: Option<ProviderType>,
    pub zone: Option<String>,
    #[serde(default)]
    pub targets: Vec<String>,
    pub ttl: Option<u32>,
    #[serde(rename = "routingPolicy")]
    pub routing_policy: Option<RoutingPolicy>,
    #[serde(rename = "observedGeneration")]
    pub observed_generation: Option<i64>,
    #[serde(rename = "lastUpdated")]
    pub last_updated: Option<Time>,
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_values_serializes_untagged() {
        let spec = DNSEntrySpec {
            dns_name: "a.example.test".into(),
            ttl: Some(120),
            values: EntryValues::Targets {
                targets: vec!["11.11.11.11".into()],
            },
            routing_policy: None,
        };
        let json = serde_json::to_value(&spec).unwrap();
        assert_eq!(json["targets"][0], "11.11.11.11");
        assert!(json.get("text").is_none());
    }

    #[test]
    fn provider_type_round_trips_through_str() {
        for pt in [
            ProviderType::AwsRoute53,
            ProviderType::GoogleCloudDns,
            ProviderType::Mock,
        ] {
            let s = pt.to_string();
            assert_eq!(ProviderType::from_str(&s).unwrap(), pt);
        }
    }

    #[test]
    fn entry_phase_display_round_trips() {
        for phase in [
            EntryPhase::Pending,
            EntryPhase::Ready,
            EntryPhase::Error,
            EntryPhase::Invalid,
            EntryPhase::Stale,
            EntryPhase::Deleting,
        ] {
            assert_eq!(EntryPhase::from_str(&phase.to_string()).unwrap(), phase);
        }
    }
}
