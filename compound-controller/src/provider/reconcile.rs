//! Provider reconciler (spec §4.4 "maintain an index of all Ready
//! providers"; spec §3 "Provider ... Lifecycle"). Builds and tears down
//! the backend handler for each Provider, keeps the `ProviderRegistry`
//! snapshot current, and blocks deletion until every owned zone this
//! provider claims is empty of controller-managed records.

use std::sync::Arc;
use std::time::Duration;

use kube::{Resource, ResourceExt, runtime::controller::Action};

use compound_common::FINALIZER;
use compound_provider::{ProviderKey, ProviderRecord, ScopeSet};
use compound_types::{DNSProvider, ProviderPhase};

use crate::context::ControllerContext;
use crate::error::Error;

use super::actions;

const DEFAULT_REQUEUE: Duration = Duration::from_secs(60);

/// Reconciles one `DNSProvider`, timing the call and recording its
/// outcome under `ControllerMetrics` when the `metrics` feature is
/// enabled (spec §6 "Telemetry").
pub async fn reconcile(provider: Arc<DNSProvider>, ctx: Arc<ControllerContext>) -> Result<Action, Error> {
    #[cfg(feature = "metrics")]
    {
        let start = std::time::Instant::now();
        let metrics_ctx = ctx.clone();
        let result = reconcile_inner(provider, ctx).await;
        let labels = [metrics_ctx.cluster.as_str(), "DNSProvider", "provider"];
        metrics_ctx.metrics.reconcile_total.with_label_values(&labels).inc();
        metrics_ctx
            .metrics
            .reconcile_duration_seconds
            .with_label_values(&labels)
            .observe(start.elapsed().as_secs_f64());
        if result.is_err() {
            metrics_ctx.metrics.reconcile_errors_total.with_label_values(&labels).inc();
        }
        result
    }
    #[cfg(not(feature = "metrics"))]
    {
        reconcile_inner(provider, ctx).await
    }
}

async fn reconcile_inner(provider: Arc<DNSProvider>, ctx: Arc<ControllerContext>) -> Result<Action, Error> {
    let namespace = provider
        .namespace()
        .ok_or_else(|| Error::MissingNamespace(provider.name_any()))?;

    if provider.meta().deletion_timestamp.is_some() {
        return handle_deletion(&provider, &namespace, &ctx).await;
    }

    let handler = match actions::build_handler(&provider) {
        Ok(handler) => handler,
        Err(err) => {
            actions::report_error(&ctx, &provider, err.to_string()).await?;
            return Ok(Action::requeue(DEFAULT_REQUEUE));
        }
    };

    let key = actions::provider_key(&provider);
    ctx.backends.lock().register(key, provider.spec.type_, handler);

    compound_model::finalizer::add(&ctx.client, provider.as_ref(), FINALIZER).await?;
    actions::report_ready(&ctx, &provider).await?;
    rebuild_registry(&ctx);

    Ok(Action::requeue(DEFAULT_REQUEUE))
}

async fn handle_deletion(provider: &DNSProvider, namespace: &str, ctx: &Arc<ControllerContext>) -> Result<Action, Error> {
    ctx.shutdown.record_deletion_activity(chrono::Utc::now().timestamp());
    let key = ProviderKey::new(namespace.to_string(), provider.name_any());
    let still_owns_records = ctx.zones.keys().into_iter().any(|zk| {
        zk.provider_namespace == key.namespace
            && zk.provider_name == key.name
            && ctx
                .zones
                .get(&zk)
                .and_then(|z| z.try_lock().ok().map(|r| !r.state.is_empty_of_managed_records()))
                .unwrap_or(true)
    });
    if still_owns_records {
        return Err(Error::ProviderStillReferenced(key.to_string()));
    }

    let provider_key = actions::provider_key(provider);
    if let Some(handler) = ctx.backends.lock().deregister(&provider_key) {
        handler.close().await?;
    }
    compound_model::finalizer::remove(&ctx.client, provider, FINALIZER).await?;
    rebuild_registry(ctx);
    Ok(Action::await_change())
}

/// Rebuilds the provider selection index from every currently-Ready
/// provider in cache (spec §4.4; rebuilt wholesale rather than patched
/// incrementally so the index can never drift from the cache — see
/// `ProviderRegistry::replace`).
pub fn rebuild_registry(ctx: &ControllerContext) {
    let providers = ctx
        .providers
        .state()
        .into_iter()
        .filter(|p| p.status.as_ref().is_some_and(|s| s.state == ProviderPhase::Ready))
        .filter_map(|p| {
            let namespace = p.namespace()?;
            Some(ProviderRecord {
                key: ProviderKey::new(namespace, p.name_any()),
                provider_type: p.spec.type_,
                domains: ScopeSet {
                    include: p.spec.domains.include.clone(),
                    exclude: p.spec.domains.exclude.clone(),
                },
                zones: ScopeSet {
                    include: p.spec.zones.include.clone(),
                    exclude: p.spec.zones.exclude.clone(),
                },
                default_ttl: p.spec.default_ttl,
            })
        })
        .collect();
    ctx.provider_registry.replace(providers);
}

pub fn on_error(_provider: Arc<DNSProvider>, error: &Error, _ctx: Arc<ControllerContext>) -> Action {
    tracing::warn!(error = %error, "provider reconcile failed");
    Action::requeue(Duration::from_secs(5))
}
