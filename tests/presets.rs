use anyhow::Result;
use liveview_session::mock::{
    MockControlChannel, MockDeviceState, MockTunnelResource, ScriptedOpener, SeqTaskIds,
};
use liveview_session::{
    CameraDevice, CameraKind, Collaborators, LiveViewSession, SessionConfig, SessionError,
    SessionState, Tunnel,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

struct Harness {
    session: LiveViewSession,
    tunnels: Arc<MockTunnelResource>,
    channel: Arc<MockControlChannel>,
}

fn harness(presets: &[&str]) -> Harness {
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
    let channel = Arc::new(MockControlChannel::new());
    let session = LiveViewSession::new(
        CameraDevice {
            device_id: "dev-1".to_string(),
            name: "cam1".to_string(),
            kind: CameraKind::Ptz,
            manage_host: "192.168.0.12".to_string(),
            manage_port: 80,
            stream_host: "localhost".to_string(),
            stream_port: 8083,
            presets: presets.iter().map(|p| p.to_string()).collect(),
            active_preset: presets.first().map(|p| p.to_string()),
        },
        Collaborators {
            tunnels: tunnels.clone(),
            channel: channel.clone(),
            device_state: Arc::new(MockDeviceState::default()),
            ids: Arc::new(SeqTaskIds::new()),
            opener: Arc::new(ScriptedOpener::new([])),
        },
        SessionConfig::default(),
    );
    Harness {
        session,
        tunnels,
        channel,
    }
}

#[tokio::test(start_paused = true)]
async fn preset_recall_wakes_then_moves_and_reverts_after_the_window() -> Result<()> {
    let h = harness(&["P1", "P2"]);
    h.session.enable_live_view().await?;
    h.channel.reset();

    h.session.goto_preset("P2").await?;

    let sent = h.channel.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(
        sent[0].payload,
        json!({"cam1": {"action": "power_on", "value": 1, "task_id": "task-3"}})
    );
    assert_eq!(
        sent[1].payload,
        json!({"cam1": {"action": "goto_preset", "value": "P2", "task_id": "task-4"}})
    );

    let snapshot = h.session.snapshot();
    assert_eq!(snapshot.preset_loading.as_deref(), Some("P2"));
    assert_eq!(snapshot.active_preset.as_deref(), Some("P2"));
    assert_eq!(snapshot.state, SessionState::AwaitingWake);

    // The in-progress marker holds for the fixed window, then clears.
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(h.session.snapshot().preset_loading.as_deref(), Some("P2"));
    tokio::time::sleep(Duration::from_secs(2)).await;

    let snapshot = h.session.snapshot();
    assert_eq!(snapshot.preset_loading, None);
    assert_eq!(snapshot.state, SessionState::Ready);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn preset_recall_without_live_view_stays_idle() -> Result<()> {
    let h = harness(&["P1"]);

    h.session.goto_preset("P1").await?;
    assert_eq!(h.session.snapshot().state, SessionState::Idle);

    tokio::time::sleep(Duration::from_secs(7)).await;
    assert_eq!(h.session.snapshot().state, SessionState::Idle);
    assert_eq!(h.session.snapshot().preset_loading, None);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn create_preset_validates_and_updates_the_list() -> Result<()> {
    let h = harness(&["P1"]);

    h.session.create_preset("Gate").await?;
    assert_eq!(
        h.session.snapshot().presets,
        vec!["P1".to_string(), "Gate".to_string()]
    );
    let sent = h.channel.sent();
    assert_eq!(
        sent[0].payload["cam1"]["action"],
        json!("create_preset")
    );
    assert_eq!(sent[0].payload["cam1"]["value"], json!("Gate"));

    // Name length is capped.
    let err = h.session.create_preset("TooLongName").await;
    assert!(matches!(err, Err(SessionError::InvalidPreset(_))));

    // Empty names are rejected.
    assert!(h.session.create_preset("  ").await.is_err());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn create_preset_enforces_the_preset_cap() -> Result<()> {
    let h = harness(&["P1", "P2", "P3", "P4", "P5"]);

    let err = h.session.create_preset("P6").await;
    assert!(matches!(err, Err(SessionError::InvalidPreset(_))));
    assert!(h.channel.sent().is_empty());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn delete_preset_removes_exactly_the_named_one() -> Result<()> {
    let h = harness(&["P1", "P2"]);

    h.session.delete_preset("P1").await?;

    assert_eq!(h.session.snapshot().presets, vec!["P2".to_string()]);
    assert_eq!(h.session.snapshot().active_preset, None);
    let sent = h.channel.sent();
    assert_eq!(sent[0].payload["cam1"]["action"], json!("delete_preset"));
    assert_eq!(sent[0].payload["cam1"]["value"], json!("P1"));

    assert!(h.session.delete_preset("P9").await.is_err());
    assert_eq!(h.channel.sent().len(), 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn preset_recall_never_touches_tunnels() -> Result<()> {
    let h = harness(&["P1", "P2"]);
    h.session.enable_live_view().await?;
    h.tunnels.reset_counters();

    h.session.goto_preset("P2").await?;

    assert_eq!(h.tunnels.list_calls(), 0);
    assert!(h.tunnels.created().is_empty());
    assert!(h.tunnels.activated().is_empty());
    Ok(())
}
