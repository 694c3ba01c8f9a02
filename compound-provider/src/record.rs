//! A snapshot-friendly projection of a live, Ready [`compound_types::DNSProvider`]
//! (spec §4.4). The registry never touches the CRD type directly so it stays
//! decoupled from `kube`/`k8s-openapi` — the controller is responsible for
//! converting a `DNSProvider` into one of these whenever it observes a
//! Ready provider.

use compound_types::ProviderType;

/// Identifies a provider by its resource identity (namespace/name), the
/// granularity scopes and selection tie-breaks operate on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProviderKey {
    pub namespace: String,
    pub name: String,
}

impl ProviderKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for ProviderKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// A suffix-based include/exclude scope, mirroring [`compound_types::Scope`]
/// but plain-owned so this crate doesn't need the `kube`/`schemars` stack.
#[derive(Debug, Clone, Default)]
pub struct ScopeSet {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

impl ScopeSet {
    /// Zone scoping is a flat set, not a suffix trie (spec §4.4: "the
    /// chosen provider must additionally admit the backend zone ...; if
    /// the zone is in exclude, the provider is rejected"). Zone ids are
    /// opaque backend identifiers, not hierarchical DNS names, so exact
    /// membership is all that's meaningful.
    pub fn admits_zone(&self, zone_id: &str) -> bool {
        if self.exclude.iter().any(|z| z == zone_id) {
            return false;
        }
        self.include.is_empty() || self.include.iter().any(|z| z == zone_id)
    }
}

#[derive(Debug, Clone)]
pub struct ProviderRecord {
    pub key: ProviderKey,
    pub provider_type: ProviderType,
    pub domains: ScopeSet,
    pub zones: ScopeSet,
    pub default_ttl: u32,
}
