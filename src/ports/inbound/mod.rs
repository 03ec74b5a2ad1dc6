/// Inbound ports (Driving ports) - Use case interfaces
///
/// These ports define the interfaces that external adapters (e.g., the HTTP
/// router) use to interact with the application core.
pub mod risk_analysis_port;
pub mod summary_job_port;

pub use risk_analysis_port::{AnalyzeRequest, RiskAnalysisPort};
pub use summary_job_port::{SummaryJobPort, SummaryJobRequest};
