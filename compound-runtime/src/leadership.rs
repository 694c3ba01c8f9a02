use kube::Client;
use kube_leader_election::{LeaseLock, LeaseLockParams, LeaseLockResult};
use std::{future::Future, time::Duration};
use tokio_util::sync::CancellationToken;

/// Parameters for a named lease, one per reconciler that requires
/// leadership (spec §4.2: "reconcilers that require leadership" are
/// distinguished from ones that don't, and "a development mode may bypass
/// the lease entirely").
#[derive(Clone, Debug)]
pub struct LeaseGroupConfig {
    pub namespace: String,
    pub lease_name: String,
    pub holder_id: String,
    pub lease_ttl: Duration,
    pub renew_every: Duration,
    /// When set, the lease is never acquired and `run_gated` runs its
    /// work unconditionally — the development-mode bypass.
    pub dev_mode: bool,
}

impl LeaseGroupConfig {
    pub fn new(namespace: impl Into<String>, lease_name: impl Into<String>) -> Self {
        let holder_id = std::env::var("POD_NAME")
            .or_else(|_| std::env::var("HOSTNAME"))
            .unwrap_or_else(|_| format!("compound-{}", uuid::Uuid::new_v4()));
        Self {
            namespace: namespace.into(),
            lease_name: lease_name.into(),
            holder_id,
            lease_ttl: Duration::from_secs(15),
            renew_every: Duration::from_secs(5),
            dev_mode: false,
        }
    }

    pub fn dev_mode(mut self, dev_mode: bool) -> Self {
        self.dev_mode = dev_mode;
        self
    }
}

/// Gates a long-running piece of work behind Kubernetes Lease-based
/// leader election: the work is spawned on acquisition and aborted on
/// loss, same shape as a storage operator's per-resource controller loop
/// but generalized so any reconciler can be wrapped in one of these.
pub struct LeaseGroup {
    client: Client,
    config: LeaseGroupConfig,
}

impl LeaseGroup {
    pub fn new(client: Client, config: LeaseGroupConfig) -> Self {
        Self { client, config }
    }

    /// Runs `spawn_work` for as long as this process holds the lease.
    /// `spawn_work` is called fresh each time leadership is (re)acquired
    /// and must return a future that runs until aborted; it is dropped
    /// (via `JoinHandle::abort`) on leadership loss or shutdown.
    pub async fn run_gated<F, Fut>(self, shutdown: CancellationToken, spawn_work: F)
    where
        F: Fn() -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        if self.config.dev_mode {
            tracing::info!("dev mode: running without leader election");
            tokio::select! {
                _ = shutdown.cancelled() => {}
                _ = spawn_work() => {}
            }
            return;
        }

        let leadership = LeaseLock::new(
            self.client,
            &self.config.namespace,
            LeaseLockParams {
                holder_id: self.config.holder_id.clone(),
                lease_name: self.config.lease_name.clone(),
                lease_ttl: self.config.lease_ttl,
            },
        );

        let mut task: Option<tokio::task::JoinHandle<()>> = None;
        let mut tick = tokio::time::interval(self.config.renew_every);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    if let Some(task) = task.take() {
                        task.abort();
                        task.await.ok();
                    }
                    break;
                }
                _ = tick.tick() => {}
            }

            let lease = match leadership.try_acquire_or_renew().await {
                Ok(l) => l,
                Err(e) => {
                    tracing::error!(error = %e, "leader election renew/acquire failed");
                    if let Some(task) = task.take() {
                        task.abort();
                        tracing::warn!("aborted controller due to leader election error");
                    }
                    continue;
                }
            };

            if matches!(lease, LeaseLockResult::Acquired(_)) {
                if task.is_none() {
                    tracing::info!(lease = %self.config.lease_name, "acquired leadership");
                    task = Some(tokio::spawn(spawn_work()));
                }
            } else if let Some(task) = task.take() {
                // Lease loss cancels the whole process, not just this group.
                tracing::warn!(lease = %self.config.lease_name, "lost leadership, shutting down process");
                task.abort();
                shutdown.cancel();
            }
        }
    }
}
