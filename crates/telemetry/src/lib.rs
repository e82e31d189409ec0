//! Logging setup shared by the camlink binaries.

pub mod logging;

pub use logging::{init, LogFormat};
