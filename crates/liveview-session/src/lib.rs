//! Session core for the camera live-view widget: turns a device's reported
//! state into a live, playable stream endpoint by provisioning and
//! activating host-platform tunnels and waking the camera over the
//! platform's messaging channel.
//!
//! All platform collaborators (tunnel resource, messaging channel, device
//! state, id generation, page opening) are trait objects injected at
//! construction, so the whole state machine runs against in-memory fakes in
//! tests.

pub mod clients;
pub mod command;
pub mod error;
pub mod mock;
pub mod session;
pub mod types;

pub use clients::{
    ControlChannel, DeviceStateProvider, PageOpener, TaskIdSource, TunnelResource, UuidTaskIds,
};
pub use command::{ControlAction, ControlCommand, CommandValue, COMMAND_CHANNEL};
pub use error::SessionError;
pub use session::{stream_url, Collaborators, LiveViewSession, ManagementAccess, SessionConfig};
pub use types::{
    CameraDevice, CameraKind, DesiredCameraSettings, DeviceStateSnapshot, NewTunnel,
    ReportedState, SessionSnapshot, SessionState, Tunnel, TunnelPurpose,
};
