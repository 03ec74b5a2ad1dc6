//! Composition root: wires the adapters into the use cases behind the router.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::info;

use crate::adapters::inbound::http::AppState;
use crate::adapters::outbound::cache::ResultCache;
use crate::adapters::outbound::job_store::InMemoryJobStore;
use crate::adapters::outbound::network::{
    CachingPackageRegistry, HttpExecutor, NpmRegistryClient, OpenAiCompatibleClient, OsvClient,
};
use crate::application::use_cases::{
    AnalyzePackageUseCase, ProviderRegistry, SummaryJobOrchestrator,
};
use crate::config::ConfigFile;
use crate::risk_analysis::domain::AiProvider;
use crate::shared::{Clock, Result, SystemClock};

/// How often abandoned job records are swept from the in-memory store
const JOB_SWEEP_INTERVAL: Duration = Duration::from_secs(300);

/// Builds the handler state from a validated config.
///
/// Must run inside a Tokio runtime: the summary job worker pool is spawned here.
/// `lookup` resolves environment variables (provider credentials).
pub fn build_app_state(
    config: &ConfigFile,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<AppState> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    build_app_state_with_clock(config, lookup, clock)
}

pub fn build_app_state_with_clock(
    config: &ConfigFile,
    lookup: impl Fn(&str) -> Option<String>,
    clock: Arc<dyn Clock>,
) -> Result<AppState> {
    let cache = ResultCache::new(clock.clone(), config.cache_ttl());
    let http = HttpExecutor::new(config.retry_policy())?;

    let registry = NpmRegistryClient::new(http.clone(), config.registry.base_url.clone())
        .context("Failed to configure the npm registry client")?;
    let registry = Arc::new(CachingPackageRegistry::new(registry, cache.clone()));
    let osv = OsvClient::new(http, cache, config.osv_options())
        .context("Failed to configure the OSV client")?;

    let analysis = AnalyzePackageUseCase::new(
        registry,
        Arc::new(osv),
        config.resolver_options(),
        clock.clone(),
    );

    let ai_http = HttpExecutor::new(config.ai_retry_policy())?;
    let mut providers: ProviderRegistry = HashMap::new();
    for provider in AiProvider::ALL {
        let client = OpenAiCompatibleClient::new(ai_http.clone(), provider, config.ai.base_url(provider))
            .with_context(|| format!("Failed to configure the {} client", provider))?;
        providers.insert(provider, Arc::new(client));
    }

    let settings = config.summary_job_settings(lookup)?;
    info!(
        default_provider = %settings.default_provider,
        credentials = settings.credentials.len(),
        workers = settings.max_concurrent_jobs,
        "Summary jobs configured"
    );
    let store = InMemoryJobStore::new();
    store.spawn_sweeper(clock.clone(), JOB_SWEEP_INTERVAL);
    let jobs = SummaryJobOrchestrator::start(
        Arc::new(store),
        providers,
        clock,
        settings,
    );

    Ok(AppState {
        analysis: Arc::new(analysis),
        jobs: Arc::new(jobs),
    })
}
