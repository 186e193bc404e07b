//! Backend implementation talking to the IoT telemetry service and the route
//! optimizer over HTTP.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use binwatch_core::{
    config::TrackerConfig,
    model::{BinId, FillLevel, Route, RouteRequest},
    plugin::BackendPlugin,
    ports::{PortError, RoutePort, TelemetryPort},
};

/// Identifier under which this backend registers.
pub const BACKEND_ID: &str = "http";

const USER_AGENT: &str = "binwatch/0.1";

/// Response from `GET {base}/dustbin/{id}`
#[derive(Debug, Deserialize)]
struct WasteLevelResponse {
    waste_level: f64,
    // devices also report battery/timestamps, ignored
}

/// Response from `POST {optimizer}`
#[derive(Debug, Deserialize)]
struct RouteResponse {
    #[serde(default)]
    route: Vec<BinId>,
}

/// Build the shared HTTP client with a per-request timeout.
///
/// # Errors
///
/// Returns a [`reqwest::Error`] if the TLS backend cannot be initialised.
pub fn build_client(timeout: Duration) -> reqwest::Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
}

/// Fill-level queries against the IoT telemetry service.
pub struct HttpTelemetryPort {
    client: Client,
    base_url: String,
}

impl HttpTelemetryPort {
    /// Create a new telemetry port for the service rooted at `base_url`.
    #[must_use]
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
        }
    }

    fn bin_url(&self, bin: BinId) -> String {
        format!("{}/dustbin/{bin}", self.base_url)
    }
}

#[async_trait]
impl TelemetryPort for HttpTelemetryPort {
    async fn fill_level(&self, bin: BinId) -> Result<FillLevel, PortError> {
        let url = self.bin_url(bin);
        debug!(%bin, %url, "querying telemetry");

        let resp = fetch_json::<WasteLevelResponse>(self.client.get(url)).await?;

        FillLevel::new(resp.waste_level).ok_or(PortError::InvalidReading(resp.waste_level))
    }
}

/// Route requests against the external optimizer.
pub struct HttpRoutePort {
    client: Client,
    url: String,
}

impl HttpRoutePort {
    /// Create a new route port posting to `url`.
    #[must_use]
    pub fn new(client: Client, url: &str) -> Self {
        Self {
            client,
            url: url.to_owned(),
        }
    }
}

#[async_trait]
impl RoutePort for HttpRoutePort {
    async fn optimize(&self, request: &RouteRequest) -> Result<Route, PortError> {
        debug!(url = %self.url, bins = request.bins.len(), "posting route request");

        let resp = fetch_json::<RouteResponse>(self.client.post(&self.url).json(request)).await?;

        Ok(Route(resp.route))
    }
}

/// Build the plugin bundle for the HTTP backend.
#[must_use]
pub fn plugin(client: Client, config: &TrackerConfig) -> BackendPlugin {
    let telemetry_port = Arc::new(HttpTelemetryPort::new(client.clone(), &config.telemetry_url));
    let route_port = Arc::new(HttpRoutePort::new(client, &config.optimizer_url));

    BackendPlugin {
        id: BACKEND_ID.to_owned(),
        telemetry_port,
        route_port,
    }
}

// Send a request and decode a JSON answer, keeping transport, status and body
// failures apart.
async fn fetch_json<T: DeserializeOwned>(req: RequestBuilder) -> Result<T, PortError> {
    let resp = req.send().await.map_err(PortError::from)?;

    let status = resp.status();
    if !status.is_success() {
        return Err(PortError::Status(status));
    }

    resp.json().await.map_err(|err| {
        if err.is_decode() {
            PortError::Decode(err.to_string())
        } else {
            PortError::from(err)
        }
    })
}
