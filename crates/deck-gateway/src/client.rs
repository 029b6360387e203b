//! Loopback HTTP client for the bridge, plus port-file discovery.

use std::time::{Duration, Instant};

use deck_store::WorkspacePaths;

pub const PORT_POLL_INTERVAL: Duration = Duration::from_millis(250);
pub const PORT_POLL_CEILING: Duration = Duration::from_secs(30);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// A failed bridge call. `Unavailable` means the bridge could not be
/// reached at all and is kept distinguishable from an error the bridge
/// itself returned, whose body is carried through verbatim.
#[derive(Debug, thiserror::Error)]
pub enum CallError {
    #[error("bridge unavailable: {0}")]
    Unavailable(String),
    #[error("{0}")]
    Bridge(String),
}

/// Poll the port file until the bridge has published its port. The file
/// only appears after the listener is bound, so polling is the handshake.
pub fn discover_port(
    paths: &WorkspacePaths,
    interval: Duration,
    ceiling: Duration,
) -> Result<u16, CallError> {
    let deadline = Instant::now() + ceiling;
    loop {
        if let Ok(raw) = std::fs::read_to_string(paths.port_file()) {
            if let Ok(port) = raw.trim().parse::<u16>() {
                if port != 0 {
                    return Ok(port);
                }
            }
        }
        if Instant::now() >= deadline {
            return Err(CallError::Unavailable(format!(
                "no bridge port published at {} within {:.0?}",
                paths.port_file().display(),
                ceiling
            )));
        }
        std::thread::sleep(interval);
    }
}

/// How the client finds the bridge. The port file is read again for every
/// call, so a bridge restarted on a new ephemeral port is picked up without
/// restarting the gateway.
enum BridgeTarget {
    Fixed(String),
    PortFile {
        paths: WorkspacePaths,
        interval: Duration,
        ceiling: Duration,
    },
}

pub struct BridgeClient {
    http: reqwest::blocking::Client,
    target: BridgeTarget,
}

impl BridgeClient {
    /// Client that resolves the bridge through the workspace's port file,
    /// polling on every call with the standard interval and ceiling.
    pub fn for_workspace(paths: WorkspacePaths) -> Self {
        Self::for_workspace_with(paths, PORT_POLL_INTERVAL, PORT_POLL_CEILING)
    }

    pub fn for_workspace_with(
        paths: WorkspacePaths,
        interval: Duration,
        ceiling: Duration,
    ) -> Self {
        Self {
            http: Self::build_http(),
            target: BridgeTarget::PortFile {
                paths,
                interval,
                ceiling,
            },
        }
    }

    /// Client pinned to a fixed base URL, skipping discovery.
    pub fn with_base(base: impl Into<String>) -> Self {
        Self {
            http: Self::build_http(),
            target: BridgeTarget::Fixed(base.into()),
        }
    }

    fn build_http() -> reqwest::blocking::Client {
        reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default()
    }

    pub fn get(&self, path: &str) -> Result<serde_json::Value, CallError> {
        let url = self.url(path)?;
        self.send(self.http.get(url))
    }

    pub fn post(&self, path: &str, body: &serde_json::Value) -> Result<serde_json::Value, CallError> {
        let url = self.url(path)?;
        self.send(self.http.post(url).json(body))
    }

    pub fn patch(&self, path: &str, body: &serde_json::Value) -> Result<serde_json::Value, CallError> {
        let url = self.url(path)?;
        self.send(self.http.patch(url).json(body))
    }

    fn base_url(&self) -> Result<String, CallError> {
        match &self.target {
            BridgeTarget::Fixed(base) => Ok(base.clone()),
            BridgeTarget::PortFile {
                paths,
                interval,
                ceiling,
            } => {
                let port = discover_port(paths, *interval, *ceiling)?;
                Ok(format!("http://127.0.0.1:{port}"))
            }
        }
    }

    fn url(&self, path: &str) -> Result<String, CallError> {
        Ok(format!("{}{path}", self.base_url()?))
    }

    fn send(&self, request: reqwest::blocking::RequestBuilder) -> Result<serde_json::Value, CallError> {
        let response = request
            .send()
            .map_err(|err| CallError::Unavailable(err.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .map_err(|err| CallError::Unavailable(err.to_string()))?;
        if !status.is_success() {
            return Err(CallError::Bridge(text));
        }
        serde_json::from_str(&text)
            .map_err(|err| CallError::Bridge(format!("bridge returned invalid JSON: {err}")))
    }
}
