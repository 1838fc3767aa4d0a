pub mod config;
pub mod defaults;
pub mod error;
pub mod external;
pub mod http_client;
pub mod output;
pub mod portscan;
pub mod probe;
pub mod template;
pub mod utils;

// re-export the types used by integration tests and the binary
pub use crate::config::{Engagement, Limits};
pub use crate::error::{ConfigError, EnumerationError};
pub use crate::output::{aggregate, Findings};
pub use crate::probe::{Enumerator, OutcomeKind, ProbeOutcome};
