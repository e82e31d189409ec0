//! camlink — camera live-view session core for the host device-management
//! platform. See the member crates for the actual functionality; this root
//! package ties them together and hosts the cross-crate integration tests.

pub use liveview_session;
pub use platform_client;
pub use telemetry;
