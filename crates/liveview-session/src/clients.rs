use crate::types::{DeviceStateSnapshot, NewTunnel, Tunnel};
use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

/// The host platform's tunnel REST resource. Activation is idempotent on
/// the platform side; callers do not pre-check.
#[async_trait]
pub trait TunnelResource: Send + Sync {
    /// Current tunnels for a device. No ordering guarantee.
    async fn list(&self, device_id: &str) -> Result<Vec<Tunnel>>;

    /// Provision a new tunnel.
    async fn create(&self, device_id: &str, tunnel: &NewTunnel) -> Result<Tunnel>;

    /// Transition a tunnel to its active state.
    async fn activate(&self, tunnel_id: &str) -> Result<()>;

    /// Defined by the resource but unused by the session flows; tunnels
    /// idle out via their timeout instead.
    async fn deactivate(&self, tunnel_id: &str) -> Result<()>;
}

/// The platform's pub/sub channel used to deliver control commands to a
/// physical device.
#[async_trait]
pub trait ControlChannel: Send + Sync {
    async fn send(&self, device_id: &str, channel: &str, payload: serde_json::Value) -> Result<()>;
}

/// Read-only access to a device's reported/desired state.
#[async_trait]
pub trait DeviceStateProvider: Send + Sync {
    async fn snapshot(&self, device_id: &str) -> Result<DeviceStateSnapshot>;
}

/// Source of per-command task ids.
pub trait TaskIdSource: Send + Sync {
    fn task_id(&self) -> String;
}

/// Production id source: random UUID v4 per command.
pub struct UuidTaskIds;

impl TaskIdSource for UuidTaskIds {
    fn task_id(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Opens a URL in a new browsing context. Returns false when the open was
/// blocked — the only observable signal a blocker gives — which triggers
/// the manual-link fallback rather than an error.
pub trait PageOpener: Send + Sync {
    fn open(&self, url: &str) -> bool;
}
