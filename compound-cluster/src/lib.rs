//! Cluster Access Layer (spec §4.1): resolves a logical cluster name to a
//! connection, and shares one informer cache per `(cluster, kind)` across
//! every reconciler that reads it, instead of each reconciler running its
//! own watch.

use compound_types::{DNSEntry, DNSProvider};
use futures::StreamExt;
use kube::{
    Api, Client, Resource,
    api::PostParams,
    runtime::{
        WatchStreamExt, reflector,
        watcher::{self, Config},
    },
};
use serde::{Serialize, de::DeserializeOwned};
use std::{collections::HashMap, fmt::Debug, hash::Hash, sync::Arc};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unknown cluster {0:?}")]
    UnknownCluster(String),
    #[error("kubernetes client error: {0}")]
    Kube(#[from] kube::Error),
}

/// Bounded number of attempts [`modify`] makes before giving up on
/// repeated optimistic-concurrency conflicts (spec §4.1 "`modify` must
/// retry on conflict up to a bounded number of attempts").
pub const DEFAULT_MODIFY_ATTEMPTS: u32 = 5;

/// Read-modify-write `name`: reads the current object, applies `f` to a
/// fresh copy, and writes it back, retrying from another fresh read
/// whenever the write is rejected by a 409 conflict (spec §4.1
/// "`modify(key, fn)` — read–modify–write with retry on
/// optimistic-concurrency failures"). The last conflict is surfaced as a
/// retryable [`Error::Kube`] once every attempt is exhausted.
pub async fn modify<K, F>(api: &Api<K>, name: &str, f: F) -> Result<K, Error>
where
    K: Resource + Clone + Debug + Send + Sync + Serialize + DeserializeOwned + 'static,
    K::DynamicType: Default,
    F: Fn(&mut K),
{
    modify_with_attempts(api, name, DEFAULT_MODIFY_ATTEMPTS, f).await
}

/// Same as [`modify`] with an explicit attempt bound, for callers that
/// need a tighter or looser retry budget than the default.
pub async fn modify_with_attempts<K, F>(api: &Api<K>, name: &str, max_attempts: u32, f: F) -> Result<K, Error>
where
    K: Resource + Clone + Debug + Send + Sync + Serialize + DeserializeOwned + 'static,
    K::DynamicType: Default,
    F: Fn(&mut K),
{
    let max_attempts = max_attempts.max(1);
    let mut last_err = None;
    for attempt in 1..=max_attempts {
        let mut current = api.get(name).await?;
        f(&mut current);
        match api.replace(name, &PostParams::default(), &current).await {
            Ok(updated) => return Ok(updated),
            Err(kube::Error::Api(ae)) if ae.code == 409 => {
                tracing::debug!(name, attempt, "optimistic-concurrency conflict, retrying");
                last_err = Some(kube::Error::Api(ae));
            }
            Err(err) => return Err(Error::Kube(err)),
        }
    }
    Err(Error::Kube(last_err.expect("loop runs at least once and only falls through after a conflict")))
}

/// A named connection to one Kubernetes API server. Clusters are named so
/// a single controller process can reconcile resources that target more
/// than one cluster (spec §3 "every identity triple carries a cluster
/// component"; §4.1 "one or more named clusters").
#[derive(Clone)]
pub struct ClusterRegistry {
    clients: Arc<HashMap<String, Client>>,
}

impl ClusterRegistry {
    /// Builds a registry with a single named cluster, the common case for
    /// an in-cluster deployment with no multi-cluster fan-out configured.
    pub fn single(name: impl Into<String>, client: Client) -> Self {
        let mut clients = HashMap::new();
        clients.insert(name.into(), client);
        Self {
            clients: Arc::new(clients),
        }
    }

    pub fn new(clients: HashMap<String, Client>) -> Self {
        Self {
            clients: Arc::new(clients),
        }
    }

    pub fn resolve(&self, cluster: &str) -> Result<Client, Error> {
        self.clients
            .get(cluster)
            .cloned()
            .ok_or_else(|| Error::UnknownCluster(cluster.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.clients.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

/// A running informer cache for one resource kind on one cluster. Holds
/// the watch task alive for as long as the cache is in use; dropping the
/// last clone of a `TypedCache` stops the underlying watch.
pub struct TypedCache<K: Resource> {
    pub store: reflector::Store<K>,
    _watch: Arc<tokio::task::JoinHandle<()>>,
}

impl<K> Clone for TypedCache<K>
where
    K: Resource,
{
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            _watch: self._watch.clone(),
        }
    }
}

impl<K> TypedCache<K>
where
    K: Resource + Clone + Debug + Send + Sync + serde::de::DeserializeOwned + 'static,
    K::DynamicType: Eq + Hash + Clone + Default + Send + Sync,
{
    /// Starts a watcher-backed reflector for `api` and returns a handle to
    /// its store. The watch runs for as long as this `TypedCache` (or a
    /// clone of it) is alive.
    pub fn spawn(api: Api<K>) -> Self {
        let (reader, writer) = reflector::store();
        let stream = reflector::reflector(writer, watcher(api, Config::default()))
            .default_backoff()
            .touched_objects();
        let watch = tokio::spawn(async move {
            futures::pin_mut!(stream);
            while let Some(event) = stream.next().await {
                if let Err(err) = event {
                    tracing::warn!(error = %err, kind = std::any::type_name::<K>(), "watch stream error");
                }
            }
        });
        Self {
            store: reader,
            _watch: Arc::new(watch),
        }
    }
}

fn watcher<K>(api: Api<K>, cfg: Config) -> impl futures::Stream<Item = watcher::Result<watcher::Event<K>>>
where
    K: Resource + Clone + Debug + Send + Sync + serde::de::DeserializeOwned + 'static,
    K::DynamicType: Clone + Default,
{
    kube::runtime::watcher(api, cfg)
}

/// Per-cluster caches for the two kinds this controller actually watches.
/// A generic arbitrary-kind cache registry was judged out of scope (spec
/// Non-goals: decoding arbitrary cluster resources) — everything this
/// controller reconciles is one of these two kinds.
#[derive(Clone)]
pub struct ClusterCaches {
    providers: HashMap<String, TypedCache<DNSProvider>>,
    entries: HashMap<String, TypedCache<DNSEntry>>,
}

impl ClusterCaches {
    pub fn new() -> Self {
        Self {
            providers: HashMap::new(),
            entries: HashMap::new(),
        }
    }

    pub fn provider_store(&mut self, cluster: &str, client: Client) -> reflector::Store<DNSProvider> {
        self.providers
            .entry(cluster.to_string())
            .or_insert_with(|| TypedCache::spawn(Api::all(client)))
            .store
            .clone()
    }

    pub fn entry_store(&mut self, cluster: &str, client: Client) -> reflector::Store<DNSEntry> {
        self.entries
            .entry(cluster.to_string())
            .or_insert_with(|| TypedCache::spawn(Api::all(client)))
            .store
            .clone()
    }
}

impl Default for ClusterCaches {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_resolves_known_and_rejects_unknown() {
        // `Client` has no cheap fake constructor, so this only exercises
        // the name-indexed map logic with an empty registry.
        let registry = ClusterRegistry::new(HashMap::new());
        assert!(registry.resolve("prod").is_err());
        assert_eq!(registry.names().count(), 0);
    }
}
