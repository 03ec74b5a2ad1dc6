use super::error::RiskError;

/// Type alias for Result with anyhow::Error as the error type.
/// Used at the application edges (binary, configuration loading).
pub type Result<T> = std::result::Result<T, anyhow::Error>;

/// Result type for the acquisition pipeline, carrying the typed error taxonomy.
pub type RiskResult<T> = std::result::Result<T, RiskError>;
