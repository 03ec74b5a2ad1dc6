/// Outbound adapters - Infrastructure implementations of outbound ports
pub mod cache;
pub mod job_store;
pub mod network;
