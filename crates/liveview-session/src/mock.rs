//! In-memory collaborator implementations for tests. Each mock records the
//! calls it receives so tests can assert on exactly what the session did.

use crate::clients::{
    ControlChannel, DeviceStateProvider, PageOpener, TaskIdSource, TunnelResource,
};
use crate::types::{DeviceStateSnapshot, NewTunnel, Tunnel};
use anyhow::{bail, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Tunnel resource backed by a vector. Created tunnels are registered in
/// the list by default, like the real resource; disable registration to
/// simulate list/create visibility lag.
#[derive(Default)]
pub struct MockTunnelResource {
    tunnels: Mutex<Vec<Tunnel>>,
    created: Mutex<Vec<NewTunnel>>,
    activated: Mutex<Vec<String>>,
    deactivated: Mutex<Vec<String>>,
    list_calls: AtomicUsize,
    next_id: AtomicUsize,
    skip_registration: AtomicBool,
    fail_list: AtomicBool,
    fail_create: AtomicBool,
    fail_activate: AtomicBool,
}

impl MockTunnelResource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_tunnel(&self, tunnel: Tunnel) {
        lock(&self.tunnels).push(tunnel);
    }

    /// Created tunnels stop showing up in subsequent lists.
    pub fn skip_registration(&self) {
        self.skip_registration.store(true, Ordering::SeqCst);
    }

    pub fn fail_list(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::SeqCst);
    }

    pub fn fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    pub fn fail_activate(&self, fail: bool) {
        self.fail_activate.store(fail, Ordering::SeqCst);
    }

    pub fn created(&self) -> Vec<NewTunnel> {
        lock(&self.created).clone()
    }

    pub fn activated(&self) -> Vec<String> {
        lock(&self.activated).clone()
    }

    pub fn deactivated(&self) -> Vec<String> {
        lock(&self.deactivated).clone()
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn reset_counters(&self) {
        lock(&self.created).clear();
        lock(&self.activated).clear();
        lock(&self.deactivated).clear();
        self.list_calls.store(0, Ordering::SeqCst);
    }
}

#[async_trait]
impl TunnelResource for MockTunnelResource {
    async fn list(&self, _device_id: &str) -> Result<Vec<Tunnel>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_list.load(Ordering::SeqCst) {
            bail!("tunnel list unavailable");
        }
        Ok(lock(&self.tunnels).clone())
    }

    async fn create(&self, _device_id: &str, tunnel: &NewTunnel) -> Result<Tunnel> {
        if self.fail_create.load(Ordering::SeqCst) {
            bail!("tunnel create rejected");
        }
        lock(&self.created).push(tunnel.clone());
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let created = Tunnel {
            id: format!("tun-{n}"),
            name: tunnel.name.clone(),
            hostname: tunnel.hostname.clone(),
            port: tunnel.port,
            protocol: tunnel.protocol.clone(),
            is_favourite: tunnel.is_favourite,
            timeout: tunnel.timeout,
            endpoint: Some(format!("t{n}.relay.example.net")),
            active: false,
        };
        if !self.skip_registration.load(Ordering::SeqCst) {
            lock(&self.tunnels).push(created.clone());
        }
        Ok(created)
    }

    async fn activate(&self, tunnel_id: &str) -> Result<()> {
        if self.fail_activate.load(Ordering::SeqCst) {
            bail!("tunnel activate rejected");
        }
        lock(&self.activated).push(tunnel_id.to_string());
        let mut tunnels = lock(&self.tunnels);
        if let Some(tunnel) = tunnels.iter_mut().find(|t| t.id == tunnel_id) {
            tunnel.active = true;
        }
        Ok(())
    }

    async fn deactivate(&self, tunnel_id: &str) -> Result<()> {
        lock(&self.deactivated).push(tunnel_id.to_string());
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct SentMessage {
    pub device_id: String,
    pub channel: String,
    pub payload: serde_json::Value,
}

/// Control channel that records every envelope.
#[derive(Default)]
pub struct MockControlChannel {
    sent: Mutex<Vec<SentMessage>>,
    fail: AtomicBool,
}

impl MockControlChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        lock(&self.sent).clone()
    }

    /// Action names addressed to `device_name`, in send order.
    pub fn actions_for(&self, device_name: &str) -> Vec<String> {
        lock(&self.sent)
            .iter()
            .filter_map(|m| m.payload.get(device_name))
            .filter_map(|c| c.get("action"))
            .filter_map(|a| a.as_str().map(str::to_string))
            .collect()
    }

    pub fn reset(&self) {
        lock(&self.sent).clear();
    }
}

#[async_trait]
impl ControlChannel for MockControlChannel {
    async fn send(&self, device_id: &str, channel: &str, payload: serde_json::Value) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            bail!("channel send rejected");
        }
        lock(&self.sent).push(SentMessage {
            device_id: device_id.to_string(),
            channel: channel.to_string(),
            payload,
        });
        Ok(())
    }
}

/// State provider returning a configurable snapshot.
#[derive(Default)]
pub struct MockDeviceState {
    snapshot: Mutex<DeviceStateSnapshot>,
    calls: AtomicUsize,
}

impl MockDeviceState {
    pub fn new(snapshot: DeviceStateSnapshot) -> Self {
        Self {
            snapshot: Mutex::new(snapshot),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set_snapshot(&self, snapshot: DeviceStateSnapshot) {
        *lock(&self.snapshot) = snapshot;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DeviceStateProvider for MockDeviceState {
    async fn snapshot(&self, _device_id: &str) -> Result<DeviceStateSnapshot> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(lock(&self.snapshot).clone())
    }
}

/// Deterministic task ids: task-1, task-2, ...
#[derive(Default)]
pub struct SeqTaskIds {
    next: AtomicU64,
}

impl SeqTaskIds {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TaskIdSource for SeqTaskIds {
    fn task_id(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::SeqCst) + 1;
        format!("task-{n}")
    }
}

/// Page opener with scripted outcomes; defaults to "open succeeded" once
/// the script runs out.
#[derive(Default)]
pub struct ScriptedOpener {
    outcomes: Mutex<VecDeque<bool>>,
    opened: Mutex<Vec<String>>,
}

impl ScriptedOpener {
    pub fn new(outcomes: impl IntoIterator<Item = bool>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into_iter().collect()),
            opened: Mutex::new(Vec::new()),
        }
    }

    pub fn opened(&self) -> Vec<String> {
        lock(&self.opened).clone()
    }
}

impl PageOpener for ScriptedOpener {
    fn open(&self, url: &str) -> bool {
        lock(&self.opened).push(url.to_string());
        lock(&self.outcomes).pop_front().unwrap_or(true)
    }
}
