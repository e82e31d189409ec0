use crate::api::PlatformApi;
use anyhow::Result;
use async_trait::async_trait;
use liveview_session::{ControlChannel, DeviceStateProvider, DeviceStateSnapshot};
use serde::de::DeserializeOwned;
use serde::Deserialize;

/// Channel carrying the device's reported/desired state.
pub const UI_STATE_CHANNEL: &str = "ui_state";

#[derive(Debug, Deserialize)]
struct AggregateResponse<T> {
    aggregate: AggregateBody<T>,
}

#[derive(Debug, Deserialize)]
struct AggregateBody<T> {
    payload: T,
}

/// Writes channel aggregates — the transport control commands ride on.
pub struct HttpControlChannel {
    api: PlatformApi,
}

impl HttpControlChannel {
    pub fn new(api: PlatformApi) -> Self {
        Self { api }
    }
}

#[async_trait]
impl ControlChannel for HttpControlChannel {
    async fn send(&self, device_id: &str, channel: &str, payload: serde_json::Value) -> Result<()> {
        self.api
            .post_unit(&format!("/ch/v1/agent/{device_id}/{channel}/aggregate/"), &payload)
            .await
    }
}

/// Reads the device's state channel aggregate.
pub struct HttpDeviceState {
    api: PlatformApi,
    channel: String,
}

impl HttpDeviceState {
    pub fn new(api: PlatformApi) -> Self {
        Self {
            api,
            channel: UI_STATE_CHANNEL.to_string(),
        }
    }

    pub fn with_channel(mut self, channel: &str) -> Self {
        self.channel = channel.to_string();
        self
    }

    async fn read_aggregate<T: DeserializeOwned>(&self, device_id: &str) -> Result<T> {
        let response: AggregateResponse<T> = self
            .api
            .get_json(&format!(
                "/ch/v1/agent/{device_id}/{}/aggregate/",
                self.channel
            ))
            .await?;
        Ok(response.aggregate.payload)
    }
}

#[async_trait]
impl DeviceStateProvider for HttpDeviceState {
    async fn snapshot(&self, device_id: &str) -> Result<DeviceStateSnapshot> {
        self.read_aggregate(device_id).await
    }
}
