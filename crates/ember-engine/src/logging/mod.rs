//! Process-wide logger setup.

mod init;

pub use init::{LoggingConfig, init_logging};
