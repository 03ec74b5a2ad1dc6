/// Mock implementations for testing
mod mock_package_registry;
mod mock_summary_provider;
mod mock_vulnerability_repository;

pub use mock_package_registry::MockPackageRegistry;
pub use mock_summary_provider::MockSummaryProvider;
pub use mock_vulnerability_repository::MockVulnerabilityRepository;
