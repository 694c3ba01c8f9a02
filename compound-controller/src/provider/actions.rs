//! Status and backend-registration helpers for the Provider reconciler,
//! mirroring the teacher's split between "what to decide" (`reconcile.rs`)
//! and "what to do" (this file).

use std::sync::Arc;

use chrono::Utc;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use kube::Resource;
use kube::runtime::events::{Recorder, Reporter};

use compound_backend::{BackendHandler, MockBackend};
use compound_model::status::{patch_status, provider_severity, record_event};
use compound_types::{DNSProvider, DNSProviderStatus, EffectiveScope, ProviderPhase, ProviderType};

use crate::context::ControllerContext;
use crate::error::Error;

/// Constructs the backend handler for `provider`. Only `ProviderType::Mock`
/// is implemented in this core (spec §1: every concrete backend SDK
/// adapter is an out-of-scope external collaborator); every other type is
/// a permanent configuration error.
pub fn build_handler(provider: &DNSProvider) -> Result<Arc<dyn BackendHandler>, Error> {
    match provider.spec.type_ {
        ProviderType::Mock => {
            let backend = MockBackend::new();
            for suffix in &provider.spec.domains.include {
                let normalized = compound_model::dns_name::normalize(suffix);
                backend.add_zone(normalized.clone(), normalized);
            }
            Ok(Arc::new(backend))
        }
        other => Err(Error::NoAdapter(provider_key(provider), other)),
    }
}

/// The key this provider's backend handler and zone state are addressed
/// by, matching the `Display` impl of `compound_provider::ProviderKey`.
pub fn provider_key(provider: &DNSProvider) -> String {
    format!(
        "{}/{}",
        provider.metadata.namespace.clone().unwrap_or_default(),
        provider.metadata.name.clone().unwrap_or_default()
    )
}

pub async fn report_ready(ctx: &ControllerContext, provider: &DNSProvider) -> Result<DNSProvider, compound_model::Error> {
    let updated = patch_status::<DNSProvider, DNSProviderStatus>(&ctx.client, provider, Time(Utc::now()), |status| {
        status.state = ProviderPhase::Ready;
        status.message = Some("provider ready".to_string());
        status.domains = EffectiveScope {
            included: provider.spec.domains.include.clone(),
            excluded: provider.spec.domains.exclude.clone(),
        };
        status.zones = EffectiveScope {
            included: provider.spec.zones.include.clone(),
            excluded: provider.spec.zones.exclude.clone(),
        };
        status.observed_generation = provider.metadata.generation;
    })
    .await?;
    emit_transition_event(ctx, &updated, ProviderPhase::Ready, "provider ready").await;
    Ok(updated)
}

pub async fn report_error(ctx: &ControllerContext, provider: &DNSProvider, message: impl Into<String>) -> Result<DNSProvider, compound_model::Error> {
    let message = message.into();
    let updated = patch_status::<DNSProvider, DNSProviderStatus>(&ctx.client, provider, Time(Utc::now()), |status| {
        status.state = ProviderPhase::Error;
        status.message = Some(message.clone());
        status.observed_generation = provider.metadata.generation;
    })
    .await?;
    let note = updated.status.as_ref().and_then(|s| s.message.clone()).unwrap_or_default();
    emit_transition_event(ctx, &updated, ProviderPhase::Error, &note).await;
    Ok(updated)
}

async fn emit_transition_event(ctx: &ControllerContext, provider: &DNSProvider, phase: ProviderPhase, note: &str) {
    let recorder = Recorder::new(
        ctx.client.clone(),
        Reporter { controller: "compound-controller".to_string(), instance: None },
        provider.object_ref(&()),
    );
    record_event(&recorder, provider_severity(phase), "StatusTransition", note.to_string()).await;
}
