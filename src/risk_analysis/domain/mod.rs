pub mod analysis_job;
pub mod dependency_graph;
pub mod package;
pub mod provider;
pub mod vulnerability;

pub use analysis_job::{
    AiSummary, AnalysisJob, JobId, JobRecord, JobState, LicenseCompatibility, MaintenanceStatus,
    PackageSnapshot, RiskLevel, SummaryPayload,
};
pub use dependency_graph::{node_key, DependencyGraph, DependencyNode, ResolvedDependencySet};
pub use package::{
    ExactVersion, MaintenanceStats, PackageMetadata, PackageName, Packument, VersionManifest,
};
pub use provider::{AiProvider, ApiKey, ProviderProfile};
pub use vulnerability::{
    most_severe, Severity, SeverityCounts, VulnerabilityRecord, VulnerabilityReport,
};
