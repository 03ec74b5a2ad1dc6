/// Shared kernel - error taxonomy, clock abstraction and input validation
pub mod clock;
pub mod error;
pub mod result;
pub mod security;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::RiskError;
pub use result::{Result, RiskResult};
