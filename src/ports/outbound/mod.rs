/// Outbound ports (Driven ports) - Infrastructure interfaces
///
/// These ports define the interfaces that the application core uses
/// to interact with external systems (registry, vulnerability database,
/// AI providers, job storage).
pub mod job_store;
pub mod package_registry;
pub mod summary_provider;
pub mod vulnerability_repository;

pub use job_store::JobStore;
pub use package_registry::PackageRegistry;
pub use summary_provider::{ChatRequest, SummaryProvider};
pub use vulnerability_repository::VulnerabilityRepository;
