use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use liveview_session::{
    CameraDevice, Collaborators, DeviceStateProvider, LiveViewSession, ManagementAccess,
    PageOpener, SessionConfig, UuidTaskIds,
};
use platform_client::{HttpControlChannel, HttpDeviceState, HttpTunnelResource, PlatformApi};
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "camlink", about = "Operator console for camera live-view sessions")]
struct Cli {
    #[command(flatten)]
    platform: PlatformArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct PlatformArgs {
    /// Base URL of the host platform
    #[arg(long, env = "CAMLINK_BASE_URL")]
    base_url: String,

    /// Platform API access token
    #[arg(long, env = "CAMLINK_TOKEN", hide_env_values = true)]
    token: String,

    /// Device (agent) id the camera lives behind
    #[arg(long, env = "CAMLINK_DEVICE_ID")]
    device_id: String,

    /// Act on behalf of another agent
    #[arg(long, env = "CAMLINK_PROXY_AGENT")]
    proxy_agent: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Enable the live view and print the playable stream URL
    Watch,
    /// Activate the management tunnel and print the management link
    Manage,
    /// Recall a named preset position
    Preset { name: String },
    /// Set absolute zoom, 0-100
    Zoom { level: f64 },
}

/// A terminal can't open a browsing context; reporting the open as blocked
/// makes the session hand the link back for printing.
struct BlockedOpener;

impl PageOpener for BlockedOpener {
    fn open(&self, _url: &str) -> bool {
        false
    }
}

async fn build_session(platform: &PlatformArgs) -> Result<LiveViewSession> {
    let mut api = PlatformApi::new(&platform.base_url, &platform.token)?;
    if let Some(agent) = &platform.proxy_agent {
        api = api.with_proxy_agent(agent);
    }

    let device_state = Arc::new(HttpDeviceState::new(api.clone()));
    let snapshot = device_state
        .snapshot(&platform.device_id)
        .await
        .context("reading device state")?;
    let device = CameraDevice::resolve(&platform.device_id, &snapshot)?;
    info!(camera = %device.name, kind = ?device.kind, "camera resolved");

    Ok(LiveViewSession::new(
        device,
        Collaborators {
            tunnels: Arc::new(HttpTunnelResource::new(api.clone())),
            channel: Arc::new(HttpControlChannel::new(api)),
            device_state,
            ids: Arc::new(UuidTaskIds),
            opener: Arc::new(BlockedOpener),
        },
        SessionConfig::default(),
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init("camlink");

    let cli = Cli::parse();
    let session = build_session(&cli.platform).await?;

    match cli.command {
        Command::Watch => {
            let url = session.enable_live_view().await?;
            if let Some(remaining) = session.snapshot().wake_countdown {
                info!(seconds = remaining, "camera may still be waking from sleep");
            }
            println!("{url}");
        }
        Command::Manage => match session.enable_management_access().await? {
            ManagementAccess::Opened => info!("management page opened"),
            ManagementAccess::ManualLink(url) => println!("{url}"),
        },
        Command::Preset { name } => {
            session.goto_preset(&name).await?;
            info!(preset = %name, "preset recall sent");
        }
        Command::Zoom { level } => {
            session.set_zoom(level).await?;
            info!(zoom = level, "zoom sent");
        }
    }

    session.close();
    Ok(())
}
