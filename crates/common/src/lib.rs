//! Shared building blocks for the depth cache workspace.
//!
//! - [`BinanceEnvironment`]: REST and WebSocket endpoints per environment
//! - [`init_logging`]: installs the `tracing` subscriber used by binaries

mod environment;
mod logging;

pub use environment::{BinanceEnvironment, ParseEnvironmentError};
pub use logging::{init_logging, init_logging_with_default};
