use crate::api::PlatformApi;
use anyhow::Result;
use async_trait::async_trait;
use liveview_session::{NewTunnel, Tunnel, TunnelResource};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

#[derive(Debug, Deserialize)]
struct TunnelListResponse {
    #[serde(default)]
    tunnels: Vec<Tunnel>,
}

/// The platform's tunnel REST resource.
pub struct HttpTunnelResource {
    api: PlatformApi,
}

impl HttpTunnelResource {
    pub fn new(api: PlatformApi) -> Self {
        Self { api }
    }
}

#[async_trait]
impl TunnelResource for HttpTunnelResource {
    async fn list(&self, device_id: &str) -> Result<Vec<Tunnel>> {
        let response: TunnelListResponse = self
            .api
            .get_json(&format!("/ch/v1/agent/{device_id}/dd_tunnels/"))
            .await?;
        Ok(response.tunnels)
    }

    async fn create(&self, device_id: &str, tunnel: &NewTunnel) -> Result<Tunnel> {
        let created: Tunnel = self
            .api
            .post_json(&format!("/ch/v1/agent/{device_id}/dd_tunnels/"), tunnel)
            .await?;
        info!(device = %device_id, tunnel_id = %created.id, name = %created.name, "tunnel created");
        Ok(created)
    }

    async fn activate(&self, tunnel_id: &str) -> Result<()> {
        self.api
            .post_unit(&format!("/ch/v1/tunnels/{tunnel_id}/activate/"), &json!({}))
            .await
    }

    async fn deactivate(&self, tunnel_id: &str) -> Result<()> {
        self.api
            .post_unit(&format!("/ch/v1/tunnels/{tunnel_id}/deactivate/"), &json!({}))
            .await
    }
}
