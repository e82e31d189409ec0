use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Fallback stream host when the device does not report one.
pub const DEFAULT_STREAM_HOST: &str = "localhost";
/// Fallback stream port when the device does not report one.
pub const DEFAULT_STREAM_PORT: u16 = 8083;
/// Fallback management port when the device does not report one.
pub const DEFAULT_MANAGE_PORT: u16 = 80;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CameraKind {
    Ptz,
    Fixed,
    Unknown,
}

impl CameraKind {
    /// Camera kinds arrive as free-form tags ("dahua_ptz", "fixed_thermal",
    /// ...); classification is by substring.
    pub fn from_tag(tag: Option<&str>) -> Self {
        match tag {
            Some(t) if t.contains("ptz") => CameraKind::Ptz,
            Some(t) if t.contains("fixed") => CameraKind::Fixed,
            _ => CameraKind::Unknown,
        }
    }
}

/// Which of the two per-device tunnels an operation is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TunnelPurpose {
    Management,
    LiveView,
}

impl TunnelPurpose {
    /// Idle timeout requested at tunnel creation, in seconds.
    pub fn timeout_secs(self) -> u32 {
        match self {
            TunnelPurpose::Management => 30,
            TunnelPurpose::LiveView => 15,
        }
    }

    /// Display name for a tunnel created on behalf of `device_name`.
    pub fn tunnel_name(self, device_name: &str) -> String {
        match self {
            TunnelPurpose::Management => format!("{device_name} Management Page"),
            TunnelPurpose::LiveView => format!("{device_name} Live View"),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TunnelPurpose::Management => "management",
            TunnelPurpose::LiveView => "live-view",
        }
    }
}

impl std::fmt::Display for TunnelPurpose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A provisioned network path record, owned by the host platform's tunnel
/// resource. The session holds only this cached view for the duration of a
/// flow; `(hostname, port)` is the natural key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tunnel {
    pub id: String,
    pub name: String,
    pub hostname: String,
    pub port: u16,
    #[serde(default)]
    pub protocol: String,
    #[serde(default)]
    pub is_favourite: bool,
    #[serde(default)]
    pub timeout: u32,
    /// Resolvable address, present once the tunnel has been activated.
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub active: bool,
}

impl Tunnel {
    pub fn matches(&self, hostname: &str, port: u16) -> bool {
        self.hostname == hostname && self.port == port
    }
}

/// Creation request for the tunnel resource.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewTunnel {
    pub name: String,
    pub hostname: String,
    pub port: u16,
    pub protocol: String,
    pub is_favourite: bool,
    pub timeout: u32,
}

impl NewTunnel {
    pub fn for_purpose(purpose: TunnelPurpose, device_name: &str, hostname: &str, port: u16) -> Self {
        Self {
            name: purpose.tunnel_name(device_name),
            hostname: hostname.to_string(),
            port,
            protocol: "http".to_string(),
            is_favourite: true,
            timeout: purpose.timeout_secs(),
        }
    }
}

/// Device-asserted fields, as published on the platform's state channel.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportedState {
    #[serde(default)]
    pub name: Option<String>,
    /// Some firmware revisions report the camera name separately from the
    /// agent name; when present it wins.
    #[serde(default)]
    pub cam_name: Option<String>,
    #[serde(default)]
    pub cam_type: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default, rename = "managePort")]
    pub manage_port: Option<u16>,
    #[serde(default, rename = "rtspServerHost")]
    pub rtsp_server_host: Option<String>,
    #[serde(default, rename = "rtspServerPort")]
    pub rtsp_server_port: Option<u16>,
    #[serde(default)]
    pub presets: Vec<String>,
    #[serde(default)]
    pub active_preset: Option<String>,
}

/// Operator-set overrides, keyed by device name on the state channel.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DesiredCameraSettings {
    #[serde(default)]
    pub presets: Option<Vec<String>>,
    #[serde(default)]
    pub active_preset: Option<String>,
}

/// Read-only snapshot of a device's state: what the device reports plus
/// what operators have asked for.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceStateSnapshot {
    #[serde(default)]
    pub reported: ReportedState,
    #[serde(default)]
    pub desired: HashMap<String, DesiredCameraSettings>,
}

/// Resolved, immutable view of the camera a session is bound to.
#[derive(Debug, Clone)]
pub struct CameraDevice {
    pub device_id: String,
    pub name: String,
    pub kind: CameraKind,
    pub manage_host: String,
    pub manage_port: u16,
    pub stream_host: String,
    pub stream_port: u16,
    pub presets: Vec<String>,
    pub active_preset: Option<String>,
}

impl CameraDevice {
    /// Overlay `desired[name]` on `reported` and apply the defaults. Presets
    /// and the active preset come from the operator overrides when present.
    pub fn resolve(device_id: &str, snapshot: &DeviceStateSnapshot) -> anyhow::Result<Self> {
        let reported = &snapshot.reported;
        let name = reported
            .cam_name
            .clone()
            .or_else(|| reported.name.clone())
            .ok_or_else(|| anyhow::anyhow!("device {device_id} reported no camera name"))?;
        let manage_host = reported
            .address
            .clone()
            .ok_or_else(|| anyhow::anyhow!("device {device_id} reported no address"))?;

        let settings = snapshot.desired.get(&name);
        let presets = settings
            .and_then(|s| s.presets.clone())
            .unwrap_or_else(|| reported.presets.clone());
        let active_preset = settings
            .and_then(|s| s.active_preset.clone())
            .or_else(|| reported.active_preset.clone());

        Ok(Self {
            device_id: device_id.to_string(),
            name,
            kind: CameraKind::from_tag(reported.cam_type.as_deref()),
            manage_host,
            manage_port: reported.manage_port.unwrap_or(DEFAULT_MANAGE_PORT),
            stream_host: reported
                .rtsp_server_host
                .clone()
                .unwrap_or_else(|| DEFAULT_STREAM_HOST.to_string()),
            stream_port: reported.rtsp_server_port.unwrap_or(DEFAULT_STREAM_PORT),
            presets,
            active_preset,
        })
    }

    /// The `(hostname, port)` natural key distinguishing the two tunnels.
    pub fn tunnel_key(&self, purpose: TunnelPurpose) -> (&str, u16) {
        match purpose {
            TunnelPurpose::Management => (&self.manage_host, self.manage_port),
            TunnelPurpose::LiveView => (&self.stream_host, self.stream_port),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Idle,
    Provisioning,
    AwaitingWake,
    Ready,
    Error,
}

/// Observable session state, published through a `watch` channel. A stream
/// URL only ever appears here after the live-view tunnel has been found and
/// its activation requested.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub state: SessionState,
    /// Debounce hint: an operation is in flight. The session itself does
    /// not serialize invocations.
    pub loading: bool,
    /// Advisory wake countdown, seconds remaining.
    pub wake_countdown: Option<u32>,
    pub wake_alert: bool,
    pub stream_url: Option<String>,
    /// Manual management link, set when opening the page was blocked.
    pub management_link: Option<String>,
    /// Name of a preset currently being recalled, cleared after the fixed
    /// recall window.
    pub preset_loading: Option<String>,
    /// Absolute pan/tilt/zoom is locked out while the device repositions.
    pub allow_absolute: bool,
    pub presets: Vec<String>,
    pub active_preset: Option<String>,
    pub error: Option<String>,
}

impl SessionSnapshot {
    pub fn initial(device: &CameraDevice) -> Self {
        Self {
            state: SessionState::Idle,
            loading: false,
            wake_countdown: None,
            wake_alert: false,
            stream_url: None,
            management_link: None,
            preset_loading: None,
            allow_absolute: true,
            presets: device.presets.clone(),
            active_preset: device.active_preset.clone(),
            error: None,
        }
    }
}
