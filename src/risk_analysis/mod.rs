/// Risk analysis core - domain model and pure services
///
/// Nothing in this module performs I/O; adapters feed it data through the ports.
pub mod domain;
pub mod services;
