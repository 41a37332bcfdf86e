// File: scorebot-core/src/platforms/twitch/client.rs

use std::sync::Arc;
use reqwest::{Client as ReqwestClient, RequestBuilder, Response};

use crate::config::TwitchEndpoints;
use crate::Error;

/// Entry point for every Helix call. The bearer token is passed per request
/// because the credential manager may rotate it between calls.
#[derive(Clone)]
pub struct TwitchHelixClient {
    http: Arc<ReqwestClient>,
    client_id: String,
    helix_base: String,
}

impl TwitchHelixClient {
    pub fn new(client_id: &str, helix_base: &str) -> Self {
        Self {
            http: Arc::new(ReqwestClient::new()),
            client_id: client_id.to_string(),
            helix_base: helix_base.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_endpoints(client_id: &str, endpoints: &TwitchEndpoints) -> Self {
        Self::new(client_id, &endpoints.helix_base)
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn http_client(&self) -> Arc<ReqwestClient> {
        self.http.clone()
    }

    /// `{helix_base}/{path}`
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.helix_base, path.trim_start_matches('/'))
    }

    /// Adds the `Client-Id` and `Authorization: Bearer` headers Helix wants.
    pub(crate) fn authed(&self, builder: RequestBuilder, token: &str) -> RequestBuilder {
        builder
            .header("Client-Id", &self.client_id)
            .header("Authorization", format!("Bearer {}", token))
    }

    /// Turns a response whose status is not `expected` into
    /// `UpstreamRequestFailed`, keeping the body for the log.
    pub(crate) async fn expect_status(
        endpoint: &str,
        resp: Response,
        expected: u16,
    ) -> Result<Response, Error> {
        let status = resp.status().as_u16();
        if status == expected {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(Error::UpstreamRequestFailed {
            endpoint: endpoint.to_string(),
            status,
            body,
        })
    }
}
