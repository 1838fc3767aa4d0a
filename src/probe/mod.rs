pub mod enumerator;
pub mod http_probe;
pub mod outcome;
pub mod throttle;

pub use enumerator::{deadline_token, Enumerator};
pub use outcome::{OutcomeKind, ProbeOutcome, ProbeRequest};
pub use throttle::{Admission, HostThrottle, RateLimiter, RequestBudget};
