use crate::clients::{
    ControlChannel, DeviceStateProvider, PageOpener, TaskIdSource, TunnelResource,
};
use crate::command::{ControlAction, ControlCommand, CommandValue, COMMAND_CHANNEL};
use crate::error::SessionError;
use crate::types::{
    CameraDevice, CameraKind, NewTunnel, SessionSnapshot, SessionState, Tunnel, TunnelPurpose,
};
use anyhow::Context;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Timing and channel parameters of a session. The defaults are the
/// values the deployed widget uses.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Channel control commands are sent on.
    pub command_channel: String,
    /// Advisory wake countdown seed, seconds.
    pub wake_budget_secs: u32,
    /// Countdown tick size, seconds. A tick observing a value at or below
    /// one tick publishes zero and clears the alert.
    pub wake_tick_secs: u32,
    /// Wait between requesting live-view activation and declaring the
    /// stream ready.
    pub liveview_settle: Duration,
    /// Wait between requesting management activation and opening the page.
    pub management_settle: Duration,
    /// How long a preset recall is reported as in progress; there is no
    /// acknowledgment channel to observe instead.
    pub preset_settle: Duration,
    /// Cadence of continuous pan/tilt re-sends while the stick is held.
    pub pan_tilt_repeat: Duration,
    /// How long device state is re-read after an absolute move.
    pub resync_window: Duration,
    pub resync_interval: Duration,
    pub max_presets: usize,
    pub max_preset_name_len: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            command_channel: COMMAND_CHANNEL.to_string(),
            wake_budget_secs: 90,
            wake_tick_secs: 5,
            liveview_settle: Duration::from_secs(1),
            management_settle: Duration::from_secs(2),
            preset_settle: Duration::from_secs(6),
            pan_tilt_repeat: Duration::from_millis(200),
            resync_window: Duration::from_secs(5),
            resync_interval: Duration::from_millis(200),
            max_presets: 5,
            max_preset_name_len: 6,
        }
    }
}

/// The platform collaborators a session talks to.
pub struct Collaborators {
    pub tunnels: Arc<dyn TunnelResource>,
    pub channel: Arc<dyn ControlChannel>,
    pub device_state: Arc<dyn DeviceStateProvider>,
    pub ids: Arc<dyn TaskIdSource>,
    pub opener: Arc<dyn PageOpener>,
}

/// Outcome of a management-access attempt. A blocked popup is not an
/// error; the caller surfaces the manual link instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManagementAccess {
    Opened,
    ManualLink(String),
}

struct PanTiltDrive {
    vector: Arc<Mutex<(f64, f64)>>,
    token: CancellationToken,
}

/// Per-widget-instance session controller. One instance per bound camera;
/// dropping (or closing) it cancels every timer it started. In-flight
/// platform requests are not cancelled, but their completions observe the
/// cancellation and stop publishing.
pub struct LiveViewSession {
    device: CameraDevice,
    cfg: SessionConfig,
    tunnels: Arc<dyn TunnelResource>,
    channel: Arc<dyn ControlChannel>,
    device_state: Arc<dyn DeviceStateProvider>,
    ids: Arc<dyn TaskIdSource>,
    opener: Arc<dyn PageOpener>,
    status: Arc<watch::Sender<SessionSnapshot>>,
    shutdown: CancellationToken,
    management_attempted: AtomicBool,
    liveview_attempted: AtomicBool,
    wake_task: Mutex<Option<CancellationToken>>,
    preset_task: Mutex<Option<CancellationToken>>,
    pan_tilt: Mutex<Option<PanTiltDrive>>,
    resync_active: Arc<AtomicBool>,
}

impl LiveViewSession {
    pub fn new(device: CameraDevice, collaborators: Collaborators, cfg: SessionConfig) -> Self {
        let (status, _) = watch::channel(SessionSnapshot::initial(&device));
        Self {
            device,
            cfg,
            tunnels: collaborators.tunnels,
            channel: collaborators.channel,
            device_state: collaborators.device_state,
            ids: collaborators.ids,
            opener: collaborators.opener,
            status: Arc::new(status),
            shutdown: CancellationToken::new(),
            management_attempted: AtomicBool::new(false),
            liveview_attempted: AtomicBool::new(false),
            wake_task: Mutex::new(None),
            preset_task: Mutex::new(None),
            pan_tilt: Mutex::new(None),
            resync_active: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn device(&self) -> &CameraDevice {
        &self.device
    }

    /// Watch the observable session state.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.status.subscribe()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.status.borrow().clone()
    }

    /// Tear the session down: cancels the wake countdown, preset revert,
    /// pan/tilt repeater and resync tasks. No further snapshots are
    /// published afterwards.
    pub fn close(&self) {
        self.shutdown.cancel();
    }

    fn publish<F: FnOnce(&mut SessionSnapshot)>(&self, f: F) {
        if self.shutdown.is_cancelled() {
            return;
        }
        self.status.send_modify(f);
    }

    /// The primary user-facing action: make the camera's stream playable.
    /// Returns the derived stream URL once the live-view tunnel is present
    /// and activated and the camera has been told to wake.
    pub async fn enable_live_view(&self) -> Result<String, SessionError> {
        self.publish(|s| {
            s.loading = true;
            s.error = None;
            s.state = SessionState::Provisioning;
        });

        let result = self.run_live_view_setup().await;
        if let Err(error) = &result {
            self.fail(error);
        }
        result
    }

    async fn run_live_view_setup(&self) -> Result<String, SessionError> {
        let tunnel = self
            .ensure_tunnel(TunnelPurpose::LiveView)
            .await
            .map_err(SessionError::TunnelSetup)?;

        self.publish(|s| s.state = SessionState::AwaitingWake);
        self.start_wake_countdown();

        self.tunnels
            .activate(&tunnel.id)
            .await
            .context("activating live-view tunnel")
            .map_err(SessionError::TunnelSetup)?;

        self.send_command(ControlAction::PowerOn, Some(1.into())).await?;
        self.send_command(ControlAction::SyncUi, Some(1.into())).await?;

        // Give the stream server a moment to pick the feed up before
        // pointing a player at it.
        sleep(self.cfg.liveview_settle).await;

        let endpoint = self.resolve_endpoint(tunnel, TunnelPurpose::LiveView).await?;
        let url = stream_url(&endpoint, &self.device.name);

        info!(device = %self.device.name, url = %url, "live view ready");
        self.publish(|s| {
            s.state = SessionState::Ready;
            s.stream_url = Some(url.clone());
            s.loading = false;
        });
        Ok(url)
    }

    /// Open the camera's own management page through its tunnel. Popup
    /// blocking is reported as `ManualLink`, never as an error.
    pub async fn enable_management_access(&self) -> Result<ManagementAccess, SessionError> {
        self.publish(|s| {
            s.loading = true;
            s.error = None;
        });

        let result = self.run_management_setup().await;
        if let Err(error) = &result {
            self.fail(error);
        }
        result
    }

    async fn run_management_setup(&self) -> Result<ManagementAccess, SessionError> {
        let tunnel = self
            .ensure_tunnel(TunnelPurpose::Management)
            .await
            .map_err(SessionError::TunnelSetup)?;

        self.send_command(ControlAction::PowerOn, Some(1.into())).await?;

        self.tunnels
            .activate(&tunnel.id)
            .await
            .context("activating management tunnel")
            .map_err(SessionError::TunnelSetup)?;

        sleep(self.cfg.management_settle).await;

        let endpoint = self
            .resolve_endpoint(tunnel, TunnelPurpose::Management)
            .await?;
        let url = format!("https://{endpoint}");

        if self.opener.open(&url) {
            self.publish(|s| {
                s.management_link = None;
                s.loading = false;
            });
            Ok(ManagementAccess::Opened)
        } else {
            debug!(device = %self.device.name, "management page open blocked, falling back to manual link");
            self.publish(|s| {
                s.management_link = Some(url.clone());
                s.loading = false;
            });
            Ok(ManagementAccess::ManualLink(url))
        }
    }

    /// Recall a stored position. Wakes the camera first; the recall is
    /// reported as in progress for a fixed window since the device never
    /// acknowledges.
    pub async fn goto_preset(&self, preset: &str) -> Result<(), SessionError> {
        let preset = preset.to_string();
        self.publish(|s| {
            s.preset_loading = Some(preset.clone());
            s.active_preset = Some(preset.clone());
            if s.state == SessionState::Ready {
                s.state = SessionState::AwaitingWake;
            }
        });

        let sent = async {
            self.send_command(ControlAction::PowerOn, Some(1.into())).await?;
            self.send_command(ControlAction::GotoPreset, Some(preset.as_str().into()))
                .await
        }
        .await;
        if let Err(error) = &sent {
            self.fail(error);
            return sent;
        }

        self.start_preset_revert(preset);
        Ok(())
    }

    /// Force the player to reconnect without re-provisioning tunnels: the
    /// stream URL gets a fresh cache-busting query parameter and the camera
    /// is woken again. Never touches the tunnel resource.
    pub async fn reset_stream(&self) -> Result<String, SessionError> {
        let current = self
            .status
            .borrow()
            .stream_url
            .clone()
            .ok_or_else(|| SessionError::StreamSetup("no stream to reset".to_string()))?;
        let url = cache_busted(&current);

        self.publish(|s| {
            if s.state == SessionState::Ready {
                s.state = SessionState::AwaitingWake;
            }
        });
        self.start_wake_countdown();

        let sent = async {
            self.send_command(ControlAction::PowerOn, Some(1.into())).await?;
            self.send_command(ControlAction::SyncUi, Some(1.into())).await
        }
        .await;
        if let Err(error) = sent {
            self.fail(&error);
            return Err(error);
        }

        sleep(self.cfg.liveview_settle).await;

        self.publish(|s| {
            s.stream_url = Some(url.clone());
            if s.state == SessionState::AwaitingWake {
                s.state = SessionState::Ready;
            }
        });
        Ok(url)
    }

    /// A player's first-frame signal short-circuits the advisory wake
    /// countdown.
    pub fn notify_player_ready(&self) {
        if let Some(token) = lock(&self.wake_task).take() {
            token.cancel();
        }
        self.publish(|s| {
            s.wake_countdown = Some(0);
            s.wake_alert = false;
        });
    }

    /// Absolute zoom, 0–100. Fixed cameras reposition optically, so they
    /// get the lockout-and-resync treatment.
    pub async fn set_zoom(&self, level: f64) -> Result<(), SessionError> {
        let level = level.clamp(0.0, 100.0);
        self.send_command(ControlAction::Zoom, Some(level.into())).await?;
        if self.device.kind == CameraKind::Fixed {
            self.publish(|s| s.allow_absolute = false);
            self.start_resync_window();
        }
        Ok(())
    }

    /// Absolute pan/tilt, each axis in [-1, 1].
    pub async fn pan_tilt_absolute(&self, pan: f64, tilt: f64) -> Result<(), SessionError> {
        let value = CommandValue::PanTilt {
            pan: pan.clamp(-1.0, 1.0),
            tilt: tilt.clamp(-1.0, 1.0),
        };
        self.send_command(ControlAction::PanTiltAbsolute, Some(value)).await?;
        self.publish(|s| s.allow_absolute = false);
        self.start_resync_window();
        Ok(())
    }

    /// Begin (or steer) continuous joystick motion. The first call spawns
    /// a repeater that re-sends the latest vector at a fixed cadence, so
    /// the camera keeps moving smoothly between joystick events.
    pub fn begin_pan_tilt(&self, pan: f64, tilt: f64) {
        let vector = (pan.clamp(-1.0, 1.0), tilt.clamp(-1.0, 1.0));

        let mut drive = lock(&self.pan_tilt);
        if let Some(active) = drive.as_ref() {
            *lock(&active.vector) = vector;
            return;
        }

        let shared = Arc::new(Mutex::new(vector));
        let token = self.shutdown.child_token();
        *drive = Some(PanTiltDrive {
            vector: Arc::clone(&shared),
            token: token.clone(),
        });
        drop(drive);

        self.publish(|s| s.allow_absolute = false);

        let channel = Arc::clone(&self.channel);
        let ids = Arc::clone(&self.ids);
        let device_id = self.device.device_id.clone();
        let device_name = self.device.name.clone();
        let channel_name = self.cfg.command_channel.clone();
        let period = self.cfg.pan_tilt_repeat;
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = sleep(period) => {
                        let (pan, tilt) = *lock(&shared);
                        let command = ControlCommand::new(
                            ControlAction::PanTiltContinuous,
                            Some(CommandValue::PanTilt { pan, tilt }),
                            ids.task_id(),
                        );
                        if let Err(error) = channel
                            .send(&device_id, &channel_name, command.envelope(&device_name))
                            .await
                        {
                            warn!(device = %device_name, error = %error, "continuous pan/tilt send failed");
                        }
                    }
                }
            }
        });
    }

    /// Stop continuous motion: cancels the repeater and tells the camera
    /// to stop.
    pub async fn end_pan_tilt(&self) -> Result<(), SessionError> {
        let Some(drive) = lock(&self.pan_tilt).take() else {
            return Ok(());
        };
        drive.token.cancel();
        self.send_command(ControlAction::Stop, None).await?;
        self.start_resync_window();
        Ok(())
    }

    /// Store the current position under a new name.
    pub async fn create_preset(&self, name: &str) -> Result<(), SessionError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SessionError::InvalidPreset("name is empty".to_string()));
        }
        if name.len() > self.cfg.max_preset_name_len {
            return Err(SessionError::InvalidPreset(format!(
                "name longer than {} characters",
                self.cfg.max_preset_name_len
            )));
        }
        let count = self.status.borrow().presets.len();
        if count >= self.cfg.max_presets {
            return Err(SessionError::InvalidPreset(format!(
                "at most {} presets are supported",
                self.cfg.max_presets
            )));
        }

        self.send_command(ControlAction::CreatePreset, Some(name.into())).await?;
        self.publish(|s| {
            if !s.presets.iter().any(|p| p == name) {
                s.presets.push(name.to_string());
            }
        });
        Ok(())
    }

    /// Remove a stored position.
    pub async fn delete_preset(&self, name: &str) -> Result<(), SessionError> {
        let known = self.status.borrow().presets.iter().any(|p| p == name);
        if !known {
            return Err(SessionError::InvalidPreset(format!("unknown preset {name:?}")));
        }

        self.send_command(ControlAction::DeletePreset, Some(name.into())).await?;
        self.publish(|s| {
            s.presets.retain(|p| p != name);
            if s.active_preset.as_deref() == Some(name) {
                s.active_preset = None;
            }
        });
        Ok(())
    }

    /// Reset a fixed camera's zoom to its default.
    pub async fn reset_zoom(&self) -> Result<(), SessionError> {
        self.send_command(ControlAction::Reset, None).await
    }

    /// Find the tunnel for `purpose` in the device's current list, or
    /// create it. A per-purpose one-shot flag keeps this instance from
    /// creating twice; concurrent *instances* can still race list-then-
    /// create, which the platform accepts as a known limitation.
    pub async fn ensure_tunnel(&self, purpose: TunnelPurpose) -> anyhow::Result<Tunnel> {
        let (hostname, port) = self.device.tunnel_key(purpose);
        let hostname = hostname.to_string();

        let tunnels = self
            .tunnels
            .list(&self.device.device_id)
            .await
            .context("listing tunnels")?;
        if let Some(tunnel) = tunnels.into_iter().find(|t| t.matches(&hostname, port)) {
            debug!(device = %self.device.name, purpose = %purpose, tunnel_id = %tunnel.id, "reusing tunnel");
            return Ok(tunnel);
        }

        let attempted = match purpose {
            TunnelPurpose::Management => &self.management_attempted,
            TunnelPurpose::LiveView => &self.liveview_attempted,
        };
        if attempted.swap(true, Ordering::SeqCst) {
            anyhow::bail!(
                "{purpose} tunnel for {} already requested but absent",
                self.device.name
            );
        }

        info!(device = %self.device.name, purpose = %purpose, %hostname, port, "creating tunnel");
        let request = NewTunnel::for_purpose(purpose, &self.device.name, &hostname, port);
        self.tunnels
            .create(&self.device.device_id, &request)
            .await
            .context("creating tunnel")
    }

    /// A tunnel's endpoint is assigned on the platform side; if the cached
    /// record predates activation, one re-list picks the address up.
    async fn resolve_endpoint(
        &self,
        tunnel: Tunnel,
        purpose: TunnelPurpose,
    ) -> Result<String, SessionError> {
        if let Some(endpoint) = tunnel.endpoint {
            return Ok(endpoint);
        }

        let (hostname, port) = self.device.tunnel_key(purpose);
        let hostname = hostname.to_string();
        let tunnels = self
            .tunnels
            .list(&self.device.device_id)
            .await
            .context("refreshing tunnels")
            .map_err(SessionError::TunnelSetup)?;
        tunnels
            .into_iter()
            .find(|t| t.matches(&hostname, port))
            .and_then(|t| t.endpoint)
            .ok_or_else(|| {
                SessionError::StreamSetup(format!("{purpose} tunnel has no endpoint"))
            })
    }

    async fn send_command(
        &self,
        action: ControlAction,
        value: Option<CommandValue>,
    ) -> Result<(), SessionError> {
        let command = ControlCommand::new(action, value, self.ids.task_id());
        self.channel
            .send(
                &self.device.device_id,
                &self.cfg.command_channel,
                command.envelope(&self.device.name),
            )
            .await
            .map_err(SessionError::CommandSend)
    }

    /// Seed and run the advisory countdown. A fresh start supersedes any
    /// countdown already ticking.
    fn start_wake_countdown(&self) {
        let token = self.shutdown.child_token();
        if let Some(previous) = lock(&self.wake_task).replace(token.clone()) {
            previous.cancel();
        }

        let seed = self.cfg.wake_budget_secs;
        let step = self.cfg.wake_tick_secs;
        self.publish(|s| {
            s.wake_countdown = Some(seed);
            s.wake_alert = true;
        });

        let status = Arc::clone(&self.status);
        let tick = Duration::from_secs(u64::from(step));
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = sleep(tick) => {
                        let mut finished = false;
                        status.send_modify(|s| {
                            let remaining = s.wake_countdown.unwrap_or(0);
                            if remaining <= step {
                                s.wake_countdown = Some(0);
                                s.wake_alert = false;
                                finished = true;
                            } else {
                                s.wake_countdown = Some(remaining - step);
                            }
                        });
                        if finished {
                            break;
                        }
                    }
                }
            }
        });
    }

    /// Clear the in-progress marker once the fixed recall window elapses.
    fn start_preset_revert(&self, preset: String) {
        let token = self.shutdown.child_token();
        if let Some(previous) = lock(&self.preset_task).replace(token.clone()) {
            previous.cancel();
        }

        let status = Arc::clone(&self.status);
        let settle = self.cfg.preset_settle;
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = sleep(settle) => {
                    status.send_modify(|s| {
                        if s.preset_loading.as_deref() == Some(preset.as_str()) {
                            s.preset_loading = None;
                        }
                        if s.state == SessionState::AwaitingWake && s.stream_url.is_some() {
                            s.state = SessionState::Ready;
                        }
                    });
                }
            }
        });
    }

    /// After an absolute move the camera repositions for a while and its
    /// reported state lags; lock absolute control out and re-read state
    /// until the window closes. Overlapping windows don't stack.
    fn start_resync_window(&self) {
        if self.resync_active.swap(true, Ordering::SeqCst) {
            return;
        }
        self.publish(|s| s.allow_absolute = false);

        let token = self.shutdown.child_token();
        let shutdown = self.shutdown.clone();
        let status = Arc::clone(&self.status);
        let provider = Arc::clone(&self.device_state);
        let active = Arc::clone(&self.resync_active);
        let device_id = self.device.device_id.clone();
        let window = self.cfg.resync_window;
        let every = self.cfg.resync_interval;
        tokio::spawn(async move {
            let deadline = sleep(window);
            tokio::pin!(deadline);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = &mut deadline => break,
                    _ = sleep(every) => {
                        match provider.snapshot(&device_id).await {
                            Ok(snapshot) => {
                                if let Ok(device) = CameraDevice::resolve(&device_id, &snapshot) {
                                    if !shutdown.is_cancelled() {
                                        status.send_modify(|s| {
                                            s.presets = device.presets;
                                            s.active_preset = device.active_preset;
                                        });
                                    }
                                }
                            }
                            Err(error) => {
                                warn!(device = %device_id, error = %error, "state resync failed");
                            }
                        }
                    }
                }
            }
            active.store(false, Ordering::SeqCst);
            if !shutdown.is_cancelled() {
                status.send_modify(|s| s.allow_absolute = true);
            }
        });
    }

    /// Collapse a failed operation into the error presentation: countdown
    /// and in-progress markers cleared, one generic retryable message.
    fn fail(&self, error: &SessionError) {
        warn!(device = %self.device.name, error = %error, "session operation failed");
        if let Some(token) = lock(&self.wake_task).take() {
            token.cancel();
        }
        let message = error.user_message();
        self.publish(|s| {
            s.state = SessionState::Error;
            s.error = Some(message);
            s.loading = false;
            s.wake_countdown = None;
            s.wake_alert = false;
            s.preset_loading = None;
        });
    }
}

impl Drop for LiveViewSession {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// The playable HLS address exposed by the stream server behind an
/// activated live-view tunnel.
pub fn stream_url(endpoint: &str, device_name: &str) -> String {
    format!("https://{endpoint}/stream/{device_name}/channel/0/hls/live/index.m3u8")
}

fn cache_busted(url: &str) -> String {
    let base = url.split('?').next().unwrap_or(url);
    format!("{base}?t={}", Utc::now().timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{
        MockControlChannel, MockDeviceState, MockTunnelResource, ScriptedOpener, SeqTaskIds,
    };
    use crate::types::CameraKind;

    fn test_device() -> CameraDevice {
        CameraDevice {
            device_id: "dev-1".to_string(),
            name: "cam1".to_string(),
            kind: CameraKind::Ptz,
            manage_host: "192.168.0.12".to_string(),
            manage_port: 80,
            stream_host: "localhost".to_string(),
            stream_port: 8083,
            presets: vec!["P1".to_string(), "P2".to_string()],
            active_preset: Some("P1".to_string()),
        }
    }

    fn test_session(tunnels: Arc<MockTunnelResource>) -> LiveViewSession {
        LiveViewSession::new(
            test_device(),
            Collaborators {
                tunnels,
                channel: Arc::new(MockControlChannel::new()),
                device_state: Arc::new(MockDeviceState::default()),
                ids: Arc::new(SeqTaskIds::new()),
                opener: Arc::new(ScriptedOpener::new([])),
            },
            SessionConfig::default(),
        )
    }

    #[tokio::test]
    async fn ensure_tunnel_reuses_matching_record() -> anyhow::Result<()> {
        let tunnels = Arc::new(MockTunnelResource::new());
        tunnels.push_tunnel(Tunnel {
            id: "tun-9".to_string(),
            name: "cam1 Live View".to_string(),
            hostname: "localhost".to_string(),
            port: 8083,
            protocol: "http".to_string(),
            is_favourite: true,
            timeout: 15,
            endpoint: Some("t9.relay.example.net".to_string()),
            active: true,
        });
        let session = test_session(Arc::clone(&tunnels));

        let tunnel = session.ensure_tunnel(TunnelPurpose::LiveView).await?;
        assert_eq!(tunnel.id, "tun-9");
        assert!(tunnels.created().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn ensure_tunnel_creates_once_per_instance() -> anyhow::Result<()> {
        let tunnels = Arc::new(MockTunnelResource::new());
        tunnels.skip_registration();
        let session = test_session(Arc::clone(&tunnels));

        let first = session.ensure_tunnel(TunnelPurpose::LiveView).await?;
        assert_eq!(first.name, "cam1 Live View");
        assert!(session.ensure_tunnel(TunnelPurpose::LiveView).await.is_err());
        assert_eq!(tunnels.created().len(), 1);
        Ok(())
    }

    #[test]
    fn cache_busting_replaces_the_query() {
        let first = cache_busted("https://t1.relay.example.net/stream/cam1/channel/0/hls/live/index.m3u8");
        assert!(first.contains("/index.m3u8?t="));
        let again = cache_busted(&first);
        assert_eq!(again.matches("?t=").count(), 1);
    }
}
