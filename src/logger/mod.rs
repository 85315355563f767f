//! Logging setup. `Logger::new_bootstrap` installs the subscriber, the filter
//! is reloaded once settings are known. See `bin/session_demo.rs` for usage.

mod logger;
pub use logger::*;

pub use tracing::{debug, error, info, trace, warn};
