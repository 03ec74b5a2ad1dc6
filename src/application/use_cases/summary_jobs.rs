use crate::ports::inbound::{SummaryJobPort, SummaryJobRequest};
use crate::ports::outbound::{ChatRequest, JobStore, SummaryProvider};
use crate::risk_analysis::domain::{
    AiProvider, AiSummary, AnalysisJob, ApiKey, JobId, JobRecord, JobState, PackageName,
    ProviderProfile, SummaryPayload,
};
use crate::risk_analysis::services::{PromptBuilder, SummaryParser};
use crate::shared::security::validate_version_component;
use crate::shared::{Clock, RiskError, RiskResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, error, info, warn};

pub const DEFAULT_JOB_TTL_SECS: i64 = 3600;
pub const DEFAULT_EXECUTION_TIMEOUT_SECS: u64 = 300;

/// Tunables of the summary job pipeline
#[derive(Debug, Clone)]
pub struct SummaryJobSettings {
    pub default_provider: AiProvider,
    pub profiles: Vec<ProviderProfile>,
    /// Credentials configured in the environment, per provider
    pub credentials: HashMap<AiProvider, ApiKey>,
    /// Lifetime of a job record, counted from submission
    pub job_ttl: chrono::Duration,
    /// Execution budget of a single job
    pub execution_timeout: Duration,
    pub queue_capacity: usize,
    pub max_concurrent_jobs: usize,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for SummaryJobSettings {
    fn default() -> Self {
        Self {
            default_provider: AiProvider::Groq,
            profiles: vec![
                ProviderProfile {
                    provider: AiProvider::Groq,
                    default_model: "llama-3.3-70b-versatile".to_string(),
                    allowed_models: vec![
                        "llama-3.3-70b-versatile".to_string(),
                        "llama-3.1-8b-instant".to_string(),
                        "openai/gpt-oss-120b".to_string(),
                        "openai/gpt-oss-20b".to_string(),
                    ],
                },
                ProviderProfile {
                    provider: AiProvider::OpenRouter,
                    default_model: "meta-llama/llama-3.3-70b-instruct".to_string(),
                    allowed_models: Vec::new(),
                },
            ],
            credentials: HashMap::new(),
            job_ttl: chrono::Duration::seconds(DEFAULT_JOB_TTL_SECS),
            execution_timeout: Duration::from_secs(DEFAULT_EXECUTION_TIMEOUT_SECS),
            queue_capacity: 64,
            max_concurrent_jobs: 4,
            temperature: 0.2,
            max_tokens: 1500,
        }
    }
}

impl SummaryJobSettings {
    fn profile(&self, provider: AiProvider) -> RiskResult<&ProviderProfile> {
        self.profiles
            .iter()
            .find(|p| p.provider == provider)
            .ok_or_else(|| {
                RiskError::validation(format!("AI provider {} is not configured", provider))
            })
    }
}

/// Registered chat providers, keyed by provider
pub type ProviderRegistry = HashMap<AiProvider, Arc<dyn SummaryProvider>>;

/// SummaryJobOrchestrator - submit/poll pair for asynchronous AI summaries
///
/// `submit` records a `pending` job and hands it to a bounded queue; a
/// background worker pool drains the queue with at most
/// `max_concurrent_jobs` jobs running at once. Every job ends in exactly one
/// terminal record, including when dispatch fails, the worker panics or the
/// execution budget runs out. `poll` only reads the store and enforces
/// expiry itself.
pub struct SummaryJobOrchestrator {
    store: Arc<dyn JobStore>,
    clock: Arc<dyn Clock>,
    providers: Arc<ProviderRegistry>,
    settings: Arc<SummaryJobSettings>,
    queue: mpsc::Sender<AnalysisJob>,
}

impl SummaryJobOrchestrator {
    /// Creates the orchestrator and spawns its worker pool on the current runtime
    pub fn start(
        store: Arc<dyn JobStore>,
        providers: ProviderRegistry,
        clock: Arc<dyn Clock>,
        settings: SummaryJobSettings,
    ) -> Self {
        let (queue, receiver) = mpsc::channel(settings.queue_capacity.max(1));
        let providers = Arc::new(providers);
        let settings = Arc::new(settings);

        let worker = JobWorker {
            store: store.clone(),
            clock: clock.clone(),
            providers: providers.clone(),
            settings: settings.clone(),
        };
        spawn_worker_pool(worker, receiver, settings.max_concurrent_jobs);

        Self {
            store,
            clock,
            providers,
            settings,
            queue,
        }
    }

    /// Validates the payload and picks provider, model and credential
    fn prepare(
        &self,
        request: SummaryJobRequest,
    ) -> RiskResult<(SummaryPayload, AiProvider, String, ApiKey)> {
        let package = &request.package;
        PackageName::new(package.name.as_str())?;
        validate_version_component(&package.version)?;
        for (name, version) in &package.dependencies {
            PackageName::new(name.as_str())?;
            validate_version_component(version)?;
        }
        for record in &request.vulnerabilities {
            if record.id.trim().is_empty() {
                return Err(RiskError::validation("Vulnerability records must carry an id"));
            }
        }

        let (provider, api_key) = match request.api_key {
            Some(key) => {
                let provider = AiProvider::from_api_key(key.expose())
                    .unwrap_or(self.settings.default_provider);
                (provider, key)
            }
            None => {
                let provider = self.settings.default_provider;
                let key = self.settings.credentials.get(&provider).cloned().ok_or_else(|| {
                    RiskError::validation(format!(
                        "No API key was supplied and none is configured for {}",
                        provider
                    ))
                })?;
                (provider, key)
            }
        };

        if !self.providers.contains_key(&provider) {
            return Err(RiskError::validation(format!(
                "AI provider {} is not available",
                provider
            )));
        }
        let model = self
            .settings
            .profile(provider)?
            .select_model(request.model.as_deref())?;

        let payload = SummaryPayload {
            package: request.package,
            vulnerabilities: request.vulnerabilities,
        };
        Ok((payload, provider, model, api_key))
    }
}

#[async_trait]
impl SummaryJobPort for SummaryJobOrchestrator {
    async fn submit(&self, request: SummaryJobRequest) -> RiskResult<JobId> {
        let (payload, provider, model, api_key) = self.prepare(request)?;

        let id = JobId::generate();
        let created_at = self.clock.now();
        let expires_at = created_at + self.settings.job_ttl;

        self.store
            .put(
                &id,
                &JobRecord {
                    state: JobState::Pending,
                    timestamp: created_at,
                    expires_at,
                },
            )
            .await?;

        let job = AnalysisJob {
            id,
            payload,
            provider,
            model,
            api_key,
            created_at,
            expires_at,
        };

        if let Err(e) = self.queue.try_send(job) {
            let reason = match e {
                mpsc::error::TrySendError::Full(_) => "job queue is full",
                mpsc::error::TrySendError::Closed(_) => "job workers are not running",
            };
            warn!(job_id = %id, reason, "Failed to dispatch summary job");
            let failure = RiskError::Dispatch {
                reason: reason.to_string(),
            };
            write_terminal(
                self.store.as_ref(),
                self.clock.as_ref(),
                &id,
                JobState::failed(&failure),
                expires_at,
            )
            .await;
            return Ok(id);
        }

        info!(job_id = %id, provider = %provider, "Summary job queued");
        Ok(id)
    }

    async fn poll(&self, job_id: &str) -> RiskResult<JobState> {
        let id = JobId::parse(job_id)?;

        let Some(record) = self.store.get(&id).await? else {
            return Ok(JobState::Pending);
        };

        if record.is_expired(self.clock.now()) {
            debug!(job_id = %id, "Job record expired, deleting");
            self.store.delete(&id).await?;
            return Ok(JobState::failed(&RiskError::ExpiredJob {
                job_id: id.to_string(),
            }));
        }

        Ok(record.state)
    }
}

/// Shared dependencies of the background workers
#[derive(Clone)]
struct JobWorker {
    store: Arc<dyn JobStore>,
    clock: Arc<dyn Clock>,
    providers: Arc<ProviderRegistry>,
    settings: Arc<SummaryJobSettings>,
}

fn spawn_worker_pool(
    worker: JobWorker,
    mut receiver: mpsc::Receiver<AnalysisJob>,
    max_concurrent_jobs: usize,
) {
    let concurrency = max_concurrent_jobs.max(1);
    let semaphore = Arc::new(Semaphore::new(concurrency));

    tokio::spawn(async move {
        info!(concurrency, "Summary worker pool started");

        loop {
            let permit = match semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    error!(error = %e, "Failed to acquire job permit");
                    break;
                }
            };

            let Some(job) = receiver.recv().await else {
                break;
            };

            let worker = worker.clone();
            tokio::spawn(async move {
                worker.process(job).await;
                drop(permit);
            });
        }

        debug!("Summary worker pool exiting");
    });
}

impl JobWorker {
    /// Runs one job to a terminal state
    async fn process(&self, job: AnalysisJob) {
        let id = job.id;
        let expires_at = job.expires_at;
        let budget = self.settings.execution_timeout;
        info!(job_id = %id, provider = %job.provider, model = %job.model, "Processing summary job");

        let executor = self.clone();
        let mut handle = tokio::spawn(async move { executor.execute(job).await });

        let state = match tokio::time::timeout(budget, &mut handle).await {
            Ok(Ok(Ok(summary))) => JobState::Completed { result: summary },
            Ok(Ok(Err(e))) => {
                warn!(job_id = %id, code = e.code(), error = %e, "Summary job failed");
                JobState::failed(&e)
            }
            Ok(Err(join_error)) => {
                error!(job_id = %id, error = %join_error, "Summary job aborted");
                JobState::failed(&RiskError::internal(format!(
                    "summary job aborted: {}",
                    join_error
                )))
            }
            Err(_) => {
                handle.abort();
                warn!(job_id = %id, budget_secs = budget.as_secs(), "Summary job ran out of time");
                JobState::failed(&RiskError::Timeout {
                    target: "summary job".to_string(),
                    timeout_ms: u64::try_from(budget.as_millis()).unwrap_or(u64::MAX),
                })
            }
        };

        write_terminal(self.store.as_ref(), self.clock.as_ref(), &id, state, expires_at).await;
    }

    async fn execute(&self, job: AnalysisJob) -> RiskResult<AiSummary> {
        let provider = self.providers.get(&job.provider).ok_or_else(|| {
            RiskError::internal(format!("no client registered for {}", job.provider))
        })?;

        let request = ChatRequest {
            model: job.model,
            system_prompt: PromptBuilder::system_prompt().to_string(),
            user_prompt: PromptBuilder::user_prompt(&job.payload, self.clock.now()),
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
            api_key: job.api_key,
        };

        let content = provider.complete(&request).await?;
        SummaryParser::parse(&content)
    }
}

/// Writes a terminal state unless the record is already terminal.
///
/// Store failures are logged; there is no one left to report them to.
async fn write_terminal(
    store: &dyn JobStore,
    clock: &dyn Clock,
    id: &JobId,
    state: JobState,
    expires_at: DateTime<Utc>,
) {
    match store.get(id).await {
        Ok(Some(existing)) if existing.state.is_terminal() => {
            warn!(
                job_id = %id,
                existing = existing.state.label(),
                attempted = state.label(),
                "Ignoring write to a terminal job"
            );
            return;
        }
        Ok(_) => {}
        Err(e) => {
            error!(job_id = %id, error = %e, "Failed to read job before terminal write");
        }
    }

    let label = state.label();
    let record = JobRecord {
        state,
        timestamp: clock.now(),
        expires_at,
    };
    match store.put(id, &record).await {
        Ok(()) => info!(job_id = %id, status = label, "Summary job finished"),
        Err(e) => error!(job_id = %id, error = %e, "Failed to persist terminal job state"),
    }
}
