//! Process entrypoint (spec §4.1-§4.2, §6): wires the cluster connection,
//! shared caches, selection/backend/zone registries into one
//! [`ControllerContext`], then runs the Provider reconciler, the Entry
//! reconciler, and the zone ticker side by side, each gated by its own
//! leadership lease, until a shutdown signal drains them.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use futures::StreamExt;
use kube::runtime::reflector::ObjectRef;
use kube::runtime::{Config as ControllerConfig, Controller, watcher};
use kube::{Api, Client};
use owo_colors::OwoColorize;
use parking_lot::Mutex;

use compound_backend::BackendRegistry;
use compound_cluster::{ClusterCaches, ClusterRegistry};
use compound_provider::ProviderRegistry;
use compound_runtime::{LeaseGroup, LeaseGroupConfig, ShutdownGuard};
use compound_types::{DNSEntry, DNSProvider};

use compound_controller::args::Cli;
use compound_controller::context::ControllerContext;
use compound_controller::zone::ZoneRegistry;
use compound_controller::{config, entry, metrics_server, provider, zone};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cli = config::load(cli)?;
    compound_common::init_logging(&cli.log_level);

    println!("{}", "starting compound-controller".green());

    let client = Client::try_default().await?;
    let mut caches = ClusterCaches::new();
    let providers = caches.provider_store(&cli.cluster_name, client.clone());
    let entries = caches.entry_store(&cli.cluster_name, client.clone());
    let _clusters = ClusterRegistry::single(cli.cluster_name.clone(), client.clone());

    let shutdown = ShutdownGuard::new(cli.shutdown_grace_period);
    let token = shutdown.token();

    let ctx = Arc::new(ControllerContext {
        client: client.clone(),
        cluster: cli.cluster_name.clone(),
        providers,
        entries,
        provider_registry: ProviderRegistry::new(),
        backends: Mutex::new(BackendRegistry::new()),
        zones: ZoneRegistry::new(),
        shutdown: shutdown.clone(),
        flap_suppression: cli.flap_suppression,
        #[cfg(feature = "metrics")]
        metrics: compound_common::metrics::ControllerMetrics::new("compound"),
    });

    // Seed the selection index from whatever the Provider cache already
    // holds at startup, so the Entry controller doesn't have to wait on
    // a full reconcile pass of every Provider before resolving anything.
    provider::rebuild_registry(&ctx);

    let shutdown_task = tokio::spawn(async move {
        shutdown.wait_for_shutdown().await;
    });

    #[cfg(feature = "metrics")]
    let metrics_task = tokio::spawn(metrics_server::run(
        cli.metrics_port,
        ctx.metrics.clone(),
        token.clone(),
    ));
    #[cfg(not(feature = "metrics"))]
    let metrics_task = tokio::spawn(metrics_server::run(cli.metrics_port, token.clone()));

    let ticker_task = {
        let ctx = ctx.clone();
        let token = token.clone();
        let interval = cli.zone_tick_interval;
        tokio::spawn(async move {
            zone::ticker::run(ctx, interval, token).await;
        })
    };

    let provider_group = LeaseGroup::new(
        client.clone(),
        LeaseGroupConfig::new(cli.namespace.clone(), "compound-provider-controller").dev_mode(cli.dev_mode),
    );
    let entry_group = LeaseGroup::new(
        client.clone(),
        LeaseGroupConfig::new(cli.namespace.clone(), "compound-entry-controller").dev_mode(cli.dev_mode),
    );

    let workers = cli.workers;
    let provider_ctx = ctx.clone();
    let provider_client = client.clone();
    let provider_task = {
        let token = token.clone();
        tokio::spawn(async move {
            provider_group
                .run_gated(token, move || {
                    run_provider_controller(provider_client.clone(), provider_ctx.clone(), workers)
                })
                .await;
        })
    };

    let entry_ctx = ctx.clone();
    let entry_client = client.clone();
    let entry_task = {
        let token = token.clone();
        tokio::spawn(async move {
            entry_group
                .run_gated(token, move || run_entry_controller(entry_client.clone(), entry_ctx.clone(), workers))
                .await;
        })
    };

    compound_common::signal_ready();

    let _ = shutdown_task.await;
    token.cancel();
    for task in [metrics_task, ticker_task, provider_task, entry_task] {
        let _ = task.await;
    }

    println!("{}", "compound-controller stopped gracefully".yellow());
    Ok(())
}

async fn run_provider_controller(client: Client, ctx: Arc<ControllerContext>, workers: u16) {
    let api: Api<DNSProvider> = Api::all(client);
    Controller::new(api, watcher::Config::default())
        .with_config(ControllerConfig::default().concurrency(workers.into()))
        .run(provider::run, provider::on_error, ctx)
        .for_each(|_| async {})
        .await;
}

async fn run_entry_controller(client: Client, ctx: Arc<ControllerContext>, workers: u16) {
    let entry_api: Api<DNSEntry> = Api::all(client.clone());
    let provider_api: Api<DNSProvider> = Api::all(client);
    let entries_for_mapper = ctx.entries.clone();
    Controller::new(entry_api, watcher::Config::default())
        .with_config(ControllerConfig::default().concurrency(workers.into()))
        .watches(provider_api, watcher::Config::default(), move |provider: DNSProvider| {
            affected_entries(&entries_for_mapper, &provider)
        })
        .run(entry::run, entry::on_error, ctx)
        .for_each(|_| async {})
        .await;
}

/// Maps a changed `DNSProvider` to every cached `DNSEntry` whose name
/// falls under that provider's domain scope, so a Provider transitioning
/// Ready/Error re-triggers selection for entries it might now own or have
/// just stopped owning, instead of waiting out the default requeue
/// interval (spec §4.4 "Provider change ... should retrigger selection
/// for affected entries").
fn affected_entries(entries: &kube::runtime::reflector::Store<DNSEntry>, provider: &DNSProvider) -> Vec<ObjectRef<DNSEntry>> {
    entries
        .state()
        .iter()
        .filter(|entry| domain_matches(&provider.spec.domains.include, &provider.spec.domains.exclude, &entry.spec.dns_name))
        .map(|entry| ObjectRef::from_obj(entry.as_ref()))
        .collect()
}

fn domain_matches(include: &[String], exclude: &[String], dns_name: &str) -> bool {
    let name = compound_model::dns_name::normalize(dns_name);
    let suffix_matches = |suffix: &String| {
        let suffix = compound_model::dns_name::normalize(suffix);
        name == suffix || name.ends_with(&format!(".{suffix}"))
    };
    if exclude.iter().any(suffix_matches) {
        return false;
    }
    include.is_empty() || include.iter().any(suffix_matches)
}
