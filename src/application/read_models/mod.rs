//! Read models for CQRS-lite pattern
//!
//! View-optimized structs that present a denormalized form of the
//! resolver, vulnerability and metadata outputs.

pub mod risk_report;
pub mod risk_report_builder;

pub use risk_report::{DependencySummaryView, PackageView, RiskReport, StalenessView};
pub use risk_report_builder::RiskReportBuilder;
