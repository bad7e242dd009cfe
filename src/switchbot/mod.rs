pub mod error;
pub mod models;

use std::{collections::HashMap, fmt, sync::Arc, time::Duration};

use data_encoding::BASE64;
use hmac::{Hmac, Mac};
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue},
    Client, Method,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use sha2::Sha256;
use tracing::debug;
use uuid::Uuid;

pub use self::error::{Result, SwitchBotError};
use self::models::{Command, Device, DeviceListBody, DeviceStatus, Scene, SwitchBotResponse};

type HmacSha256 = Hmac<Sha256>;

pub const DEFAULT_API_BASE_URL: &str = "https://api.switch-bot.com";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
const CONTENT_TYPE_JSON: &str = "application/json; charset=utf8";

/// Token and secret issued by the SwitchBot app.
///
/// The secret only ever feeds the HMAC key; it is redacted from `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub token: String,
    pub secret: String,
}

impl Credentials {
    pub fn new(token: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            secret: secret.into(),
        }
    }

    fn ensure_present(&self) -> Result<()> {
        if self.token.is_empty() || self.secret.is_empty() {
            return Err(SwitchBotError::MissingCredentials);
        }
        Ok(())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &self.token)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Connection settings for [`SwitchBotClient`].
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub credentials: Credentials,
    pub api_base_url: String,
    /// Opaque prefix prepended to every URL; empty disables forwarding.
    pub proxy_base: String,
    pub timeout: Duration,
}

impl ClientSettings {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            api_base_url: DEFAULT_API_BASE_URL.to_owned(),
            proxy_base: String::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Method, body and extra headers for a single [`SwitchBotClient::execute`] call.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    pub body: Option<Vec<u8>>,
    /// Merged over the signed defaults; a caller value wins. Names are
    /// case-insensitive, so `content-type` replaces `Content-Type`.
    pub headers: HashMap<String, String>,
}

impl RequestOptions {
    pub fn get() -> Self {
        Self {
            method: Method::GET,
            body: None,
            headers: HashMap::new(),
        }
    }

    pub fn post_json(body: &impl serde::Serialize) -> Result<Self> {
        Ok(Self {
            method: Method::POST,
            body: Some(serde_json::to_vec(body)?),
            headers: HashMap::new(),
        })
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// Signed client for the SwitchBot cloud API (v1.1).
///
/// Holds no mutable state: every call is an independent, freshly signed
/// round trip. Cloning is cheap.
#[derive(Debug, Clone)]
pub struct SwitchBotClient {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    http: Client,
    api_base_url: String,
    proxy_base: String,
    credentials: Credentials,
    timeout: Duration,
}

impl SwitchBotClient {
    pub fn new(settings: ClientSettings) -> Result<Self> {
        let http = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(SwitchBotError::Transport)?;

        Ok(Self {
            inner: Arc::new(Inner {
                http,
                api_base_url: settings.api_base_url,
                proxy_base: settings.proxy_base,
                credentials: settings.credentials,
                timeout: settings.timeout,
            }),
        })
    }

    /// Final URL for `endpoint`: plain concatenation, no re-encoding.
    pub fn url_for(&self, endpoint: &str) -> String {
        resolve_url(&self.inner.proxy_base, &self.inner.api_base_url, endpoint)
    }

    /// Sign, send and unwrap one request.
    ///
    /// Fails with `MissingCredentials` before touching the network when the
    /// token or secret is empty. A fresh timestamp and nonce are generated
    /// for every call.
    pub async fn execute<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<T> {
        let creds = &self.inner.credentials;
        creds.ensure_present()?;

        let mut headers = to_header_map(build_signed_headers(creds)?)?;
        for (name, value) in to_header_map(options.headers)? {
            if let Some(name) = name {
                headers.insert(name, value);
            }
        }
        let url = self.url_for(endpoint);
        debug!(method = %options.method, endpoint = %endpoint, "Sending SwitchBot request");

        let mut request = self
            .inner
            .http
            .request(options.method, &url)
            .headers(headers);
        if let Some(body) = options.body {
            request = request.body(body);
        }

        let response = request.send().await.map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.map_err(|e| self.transport_error(e))?;
            return Err(SwitchBotError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await.map_err(|e| self.transport_error(e))?;
        let body = serde_json::from_slice::<SwitchBotResponse>(&bytes)?.into_result()?;
        Ok(serde_json::from_value(body)?)
    }

    fn transport_error(&self, e: reqwest::Error) -> SwitchBotError {
        if e.is_timeout() {
            SwitchBotError::Timeout(self.inner.timeout)
        } else {
            SwitchBotError::Transport(e)
        }
    }

    /// All devices: physical ones first, then infrared remotes.
    pub async fn list_devices(&self) -> Result<Vec<Device>> {
        let body: DeviceListBody = self
            .execute("/v1.1/devices", RequestOptions::get())
            .await?;
        Ok(body.into_devices())
    }

    /// Raw status call by id.
    ///
    /// The vendor rejects this for infrared remotes; use [`Self::device_status`]
    /// when the device variant is known.
    pub async fn get_device_status(&self, device_id: &str) -> Result<DeviceStatus> {
        debug!(device_id = %device_id, "Fetching device status");
        self.execute(
            &format!("/v1.1/devices/{device_id}/status"),
            RequestOptions::get(),
        )
        .await
    }

    /// Status for a known device; infrared remotes are rejected locally.
    pub async fn device_status(&self, device: &Device) -> Result<DeviceStatus> {
        if !device.supports_status() {
            return Err(SwitchBotError::UnsupportedOperation {
                operation: "status",
                device_id: device.device_id().to_owned(),
            });
        }
        self.get_device_status(device.device_id()).await
    }

    /// Returns whatever body the vendor sends back, usually `{}`.
    pub async fn send_command(&self, device_id: &str, command: &Command) -> Result<Value> {
        debug!(device_id = %device_id, command = %command.command, "Sending command to device");
        self.execute(
            &format!("/v1.1/devices/{device_id}/commands"),
            RequestOptions::post_json(command)?,
        )
        .await
    }

    pub async fn list_scenes(&self) -> Result<Vec<Scene>> {
        self.execute("/v1.1/scenes", RequestOptions::get()).await
    }

    pub async fn execute_scene(&self, scene_id: &str) -> Result<Value> {
        debug!(scene_id = %scene_id, "Executing scene");
        // The JSON content type requires a body even without a payload.
        self.execute(
            &format!("/v1.1/scenes/{scene_id}/execute"),
            RequestOptions::post_json(&serde_json::json!({}))?,
        )
        .await
    }
}

pub(crate) fn resolve_url(proxy_base: &str, api_base_url: &str, endpoint: &str) -> String {
    if proxy_base.is_empty() {
        format!("{api_base_url}{endpoint}")
    } else {
        format!("{proxy_base}{api_base_url}{endpoint}")
    }
}

// ---------------------------------------------------------------------------
// Signing helpers
// ---------------------------------------------------------------------------

/// Deterministic signing inputs used by tests.
#[derive(Debug)]
pub(crate) struct SigningContext<'a> {
    /// 13-digit Unix timestamp in milliseconds
    pub t: &'a str,
    pub nonce: &'a str,
}

/// Base64 HMAC-SHA256 of `token + t + nonce`, keyed by the secret.
///
/// Vendor docs:
/// <https://github.com/OpenWonderLabs/SwitchBotAPI#authentication>
pub fn sign(credentials: &Credentials, t: &str, nonce: &str) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(credentials.secret.as_bytes())
        .map_err(|e| SwitchBotError::Signing(e.to_string()))?;
    mac.update(credentials.token.as_bytes());
    mac.update(t.as_bytes());
    mac.update(nonce.as_bytes());
    Ok(BASE64.encode(&mac.finalize().into_bytes()))
}

/// Build the signed headers for one request with a fresh `t` and nonce.
pub(crate) fn build_signed_headers(credentials: &Credentials) -> Result<HashMap<String, String>> {
    let t = chrono::Utc::now().timestamp_millis().to_string();
    let nonce = Uuid::new_v4().to_string();
    build_signed_headers_inner(credentials, &SigningContext { t: &t, nonce: &nonce })
}

pub(crate) fn build_signed_headers_inner(
    credentials: &Credentials,
    ctx: &SigningContext<'_>,
) -> Result<HashMap<String, String>> {
    let sign = sign(credentials, ctx.t, ctx.nonce)?;

    let mut headers = HashMap::new();
    headers.insert("Authorization".to_owned(), credentials.token.clone());
    headers.insert("t".to_owned(), ctx.t.to_owned());
    headers.insert("nonce".to_owned(), ctx.nonce.to_owned());
    headers.insert("sign".to_owned(), sign);
    headers.insert("Content-Type".to_owned(), CONTENT_TYPE_JSON.to_owned());
    Ok(headers)
}

/// Convert our string `HashMap` into a `reqwest::header::HeaderMap`.
fn to_header_map(map: HashMap<String, String>) -> Result<HeaderMap> {
    let mut header_map = HeaderMap::new();
    for (k, v) in map {
        let name = HeaderName::from_bytes(k.as_bytes())
            .map_err(|_| SwitchBotError::InvalidHeader(k.clone()))?;
        let value =
            HeaderValue::from_str(&v).map_err(|_| SwitchBotError::InvalidHeader(k.clone()))?;
        header_map.insert(name, value);
    }
    Ok(header_map)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
