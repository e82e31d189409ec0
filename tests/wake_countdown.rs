use anyhow::Result;
use liveview_session::mock::{
    MockControlChannel, MockDeviceState, MockTunnelResource, ScriptedOpener, SeqTaskIds,
};
use liveview_session::{
    CameraDevice, CameraKind, Collaborators, LiveViewSession, SessionConfig, Tunnel,
};
use std::sync::Arc;
use std::time::Duration;

fn session_with_live_tunnel() -> LiveViewSession {
    let tunnels = Arc::new(MockTunnelResource::new());
    tunnels.push_tunnel(Tunnel {
        id: "tun-live".to_string(),
        name: "cam1 Live View".to_string(),
        hostname: "localhost".to_string(),
        port: 8083,
        protocol: "http".to_string(),
        is_favourite: true,
        timeout: 15,
        endpoint: Some("live.relay.example.net".to_string()),
        active: false,
    });
    LiveViewSession::new(
        CameraDevice {
            device_id: "dev-1".to_string(),
            name: "cam1".to_string(),
            kind: CameraKind::Ptz,
            manage_host: "192.168.0.12".to_string(),
            manage_port: 80,
            stream_host: "localhost".to_string(),
            stream_port: 8083,
            presets: Vec::new(),
            active_preset: None,
        },
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

#[tokio::test(start_paused = true)]
async fn countdown_steps_from_seed_to_zero_then_clears_the_alert() -> Result<()> {
    let session = session_with_live_tunnel();
    let mut rx = session.subscribe();

    session.enable_live_view().await?;

    let first = rx.borrow_and_update().clone();
    assert_eq!(first.wake_countdown, Some(90));
    assert!(first.wake_alert);

    let mut seen = vec![90u32];
    while seen.last() != Some(&0) {
        rx.changed().await?;
        let snapshot = rx.borrow_and_update().clone();
        if let Some(remaining) = snapshot.wake_countdown {
            if seen.last() != Some(&remaining) {
                seen.push(remaining);
            }
        }
    }

    let expected: Vec<u32> = (0..=18).map(|i| 90 - i * 5).collect();
    assert_eq!(seen, expected);
    assert!(!session.snapshot().wake_alert);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn player_ready_short_circuits_the_countdown() -> Result<()> {
    let session = session_with_live_tunnel();

    session.enable_live_view().await?;
    assert_eq!(session.snapshot().wake_countdown, Some(90));

    session.notify_player_ready();
    let snapshot = session.snapshot();
    assert_eq!(snapshot.wake_countdown, Some(0));
    assert!(!snapshot.wake_alert);

    // The superseded countdown task must not resume ticking.
    tokio::time::sleep(Duration::from_secs(30)).await;
    let snapshot = session.snapshot();
    assert_eq!(snapshot.wake_countdown, Some(0));
    assert!(!snapshot.wake_alert);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn teardown_stops_all_publishing() -> Result<()> {
    let session = session_with_live_tunnel();
    session.enable_live_view().await?;

    let mut rx = session.subscribe();
    rx.borrow_and_update();

    session.close();
    tokio::time::sleep(Duration::from_secs(120)).await;

    assert!(!rx.has_changed()?);
    Ok(())
}
