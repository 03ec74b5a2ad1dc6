/// Use cases module containing application business logic orchestration
mod analyze_package;
mod check_vulnerabilities;
mod resolve_dependencies;
mod summary_jobs;

pub use analyze_package::AnalyzePackageUseCase;
pub use check_vulnerabilities::CheckVulnerabilitiesUseCase;
pub use resolve_dependencies::{
    ResolveDependenciesUseCase, ResolverOptions, DEFAULT_MAX_CONCURRENCY, DEFAULT_MAX_DEPTH,
};
pub use summary_jobs::{
    ProviderRegistry, SummaryJobOrchestrator, SummaryJobSettings, DEFAULT_EXECUTION_TIMEOUT_SECS,
    DEFAULT_JOB_TTL_SECS,
};
