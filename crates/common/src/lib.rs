//! Shared plumbing for the adapter workspace: exchange environment selection,
//! logging setup and the wall clock used for identifier generation.

mod clock;
mod environment;
mod logging;

pub use clock::{Clock, FixedClock, SharedClock, SystemClock};
pub use environment::{ExchangeEnvironment, ParseEnvironmentError};
pub use logging::init_logging;
