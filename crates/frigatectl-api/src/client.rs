// NVR HTTP client
//
// Wraps `reqwest::Client` with NVR-specific URL construction and status
// handling. Exactly two calls: a read of every camera's enable flag and
// a write of one camera's flag. No retries, no state between calls.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::StatusCode;
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;
use crate::models::StatusDocument;
use crate::transport::{DEFAULT_TIMEOUT, TransportConfig};

/// Path (relative to the API base) polled for camera state.
pub const DEFAULT_STATUS_PATH: &str = "config";

const BODY_PREVIEW_CHARS: usize = 200;

/// Raw HTTP client for the NVR camera control API.
///
/// `base_url` is the API root, e.g. `http://nvr.local:5000/api`.
#[derive(Debug, Clone)]
pub struct NvrClient {
    http: reqwest::Client,
    base_url: Url,
    status_path: String,
    timeout: Duration,
}

impl NvrClient {
    /// Create a new client from a `TransportConfig`.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self {
            http,
            base_url,
            status_path: DEFAULT_STATUS_PATH.to_owned(),
            timeout: transport.timeout,
        })
    }

    /// Create a client for `http://{host}:{port}/api`.
    pub fn for_host(host: &str, port: u16, transport: &TransportConfig) -> Result<Self, Error> {
        let base_url = Url::parse(&format!("http://{host}:{port}/api"))?;
        Self::new(base_url, transport)
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self {
            http,
            base_url,
            status_path: DEFAULT_STATUS_PATH.to_owned(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Poll a different status path (e.g. `status` for a flat status map).
    pub fn with_status_path(mut self, path: impl Into<String>) -> Self {
        self.status_path = path.into();
        self
    }

    /// The API base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The path polled for camera state, relative to the base URL.
    pub fn status_path(&self) -> &str {
        &self.status_path
    }

    // ── Calls ────────────────────────────────────────────────────────

    /// Fetch every camera's enable flag.
    ///
    /// `GET {base}/{status_path}`
    ///
    /// Fails as a whole on any non-200 status, timeout, or undecodable
    /// body; a partial mapping is never returned.
    pub async fn poll(&self) -> Result<HashMap<String, bool>, Error> {
        let segments: Vec<&str> = self
            .status_path
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();
        let url = self.api_url(&segments)?;
        debug!("GET {}", url);

        let resp = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        let body = Self::expect_ok(&url, resp).await?;

        let doc: StatusDocument = serde_json::from_str(&body).map_err(|e| {
            let preview = preview(&body);
            Error::Deserialization {
                message: format!("{e} (body preview: {preview:?})"),
                body: body.clone(),
            }
        })?;

        let states = doc.into_states();
        trace!(cameras = states.len(), "poll decoded");
        Ok(states)
    }

    /// Request that a camera be enabled or disabled.
    ///
    /// `PUT {base}/{camera}/enable` or `PUT {base}/{camera}/disable`
    ///
    /// Success means the NVR acknowledged the request with HTTP 200. The
    /// NVR applies the change asynchronously; this call does not verify it.
    pub async fn set_state(&self, camera: &str, enabled: bool) -> Result<(), Error> {
        let action = if enabled { "enable" } else { "disable" };
        let url = self.api_url(&[camera, action])?;
        debug!("PUT {}", url);

        let resp = self
            .http
            .put(url.clone())
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        Self::expect_ok(&url, resp).await?;
        Ok(())
    }

    /// Shorthand for `set_state(camera, true)`.
    pub async fn enable_camera(&self, camera: &str) -> Result<(), Error> {
        self.set_state(camera, true).await
    }

    /// Shorthand for `set_state(camera, false)`.
    pub async fn disable_camera(&self, camera: &str) -> Result<(), Error> {
        self.set_state(camera, false).await
    }

    // ── Helpers ──────────────────────────────────────────────────────

    /// Build `{base}/{segments...}`, percent-encoding each segment.
    ///
    /// Camera names are user-chosen, so they go through
    /// `path_segments_mut` rather than string concatenation.
    pub(crate) fn api_url(&self, segments: &[&str]) -> Result<Url, Error> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::InvalidBaseUrl {
                url: self.base_url.to_string(),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Read the body of a 200 response, or turn anything else into
    /// `Error::Status`.
    async fn expect_ok(url: &Url, resp: reqwest::Response) -> Result<String, Error> {
        let status = resp.status();
        if status != StatusCode::OK {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Status {
                status: status.as_u16(),
                path: url.path().to_owned(),
                body: preview(&body),
            });
        }
        resp.text().await.map_err(Error::Transport)
    }

    fn transport_error(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Timeout {
                timeout_secs: self.timeout.as_secs(),
            }
        } else {
            Error::Transport(err)
        }
    }
}

fn preview(body: &str) -> String {
    body.chars().take(BODY_PREVIEW_CHARS).collect()
}
