//! npm-risk-report - Risk reports for npm packages
//!
//! This library resolves an npm package's dependency tree, checks every
//! resolved version against the OSV vulnerability database and produces an
//! asynchronous AI risk summary, following hexagonal architecture and
//! Domain-Driven Design principles.
//!
//! # Architecture
//!
//! The library is organized into the following layers:
//!
//! - **Domain Layer** (`risk_analysis`): Pure business logic and domain models
//! - **Application Layer** (`application`): Use cases, DTOs and the risk report read model
//! - **Ports** (`ports`): Interface definitions for the core and its infrastructure
//! - **Adapters** (`adapters`): The HTTP router and concrete implementations of ports
//! - **Shared** (`shared`): Error taxonomy, clock abstraction and input validation
//!
//! # Example
//!
//! ```no_run
//! use npm_risk_report::prelude::*;
//!
//! # async fn run() -> Result<()> {
//! let config = ConfigFile::default();
//! let state = build_app_state(&config, |key| std::env::var(key).ok())?;
//!
//! let report = state
//!     .analysis
//!     .analyze(AnalyzeRequest::new("express", None))
//!     .await?;
//! println!("{} vulnerabilities", report.vulnerabilities.len());
//!
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
//! axum::serve(listener, create_router(state)).await?;
//! # Ok(())
//! # }
//! ```

pub mod adapters;
pub mod application;
pub mod bootstrap;
pub mod config;
pub mod logging;
pub mod ports;
pub mod risk_analysis;
pub mod shared;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::adapters::inbound::http::{create_router, AppState, ErrorResponse};
    pub use crate::adapters::outbound::cache::ResultCache;
    pub use crate::adapters::outbound::job_store::InMemoryJobStore;
    pub use crate::adapters::outbound::network::{
        CachingPackageRegistry, HttpExecutor, NpmRegistryClient, OpenAiCompatibleClient,
        OsvClient, OsvOptions, RetryPolicy,
    };
    pub use crate::application::dto::JobAccepted;
    pub use crate::application::read_models::RiskReport;
    pub use crate::application::use_cases::{
        AnalyzePackageUseCase, CheckVulnerabilitiesUseCase, ResolveDependenciesUseCase,
        ResolverOptions, SummaryJobOrchestrator, SummaryJobSettings,
    };
    pub use crate::bootstrap::build_app_state;
    pub use crate::config::ConfigFile;
    pub use crate::ports::inbound::{
        AnalyzeRequest, RiskAnalysisPort, SummaryJobPort, SummaryJobRequest,
    };
    pub use crate::ports::outbound::{
        JobStore, PackageRegistry, SummaryProvider, VulnerabilityRepository,
    };
    pub use crate::risk_analysis::domain::{
        AiProvider, DependencyGraph, JobId, JobState, PackageMetadata, PackageName,
        VulnerabilityRecord, VulnerabilityReport,
    };
    pub use crate::shared::{Clock, Result, RiskError, RiskResult, SystemClock};
}
