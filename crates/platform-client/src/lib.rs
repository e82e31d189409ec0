//! HTTP implementations of the live-view session's platform collaborators,
//! speaking the host platform's `/ch/v1/` REST surface.

pub mod api;
pub mod channels;
pub mod tunnels;

pub use api::PlatformApi;
pub use channels::{HttpControlChannel, HttpDeviceState, UI_STATE_CHANNEL};
pub use tunnels::HttpTunnelResource;
