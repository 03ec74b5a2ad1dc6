/// Inbound adapters (Driving adapters)
///
/// Expose the inbound ports to the outside world.
pub mod http;
