//! Signed HTTP transport for the OVH API.
//!
//! Builds one authenticated request per call: the timestamp (local clock
//! corrected by the measured API clock delta) is part of the signed material,
//! so the signature is computed fresh for every request and never reused.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::OnceCell;
use tracing::{debug, error, warn};

use crate::error::{Error, Result};

/// Default timeout for API requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Application key header.
const APPLICATION_HEADER: &str = "X-Ovh-Application";
/// Request timestamp header.
const TIMESTAMP_HEADER: &str = "X-Ovh-Timestamp";
/// Consumer key header.
const CONSUMER_HEADER: &str = "X-Ovh-Consumer";
/// Request signature header.
const SIGNATURE_HEADER: &str = "X-Ovh-Signature";

/// Marker substituted for credential header values in debug logs.
const OBFUSCATED: &str = "OBFUSCATED";

/// Headers whose value must never reach the log sink.
static OBFUSCATE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new("(?i)application|password|signature|consumer").expect("obfuscation regex")
});

/// Signed transport to one API endpoint.
///
/// Credentials are immutable for the lifetime of the instance. The underlying
/// `reqwest::Client` is built once and reused for every call.
pub struct Api {
    client: Client,
    endpoint_url: String,
    application_key: String,
    application_secret: String,
    consumer_key: String,
    debug: bool,
    // First measurement is cached, success or failure: a failed clock sync
    // poisons the instance instead of re-measuring on the next call.
    time_delta: OnceCell<std::result::Result<i64, String>>,
}

impl Api {
    /// Create a transport for the given endpoint.
    ///
    /// An empty `consumer_key` produces unauthenticated calls: no consumer or
    /// signature header is attached.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(
        endpoint_url: impl Into<String>,
        application_key: impl Into<String>,
        application_secret: impl Into<String>,
        consumer_key: impl Into<String>,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            endpoint_url: endpoint_url.into(),
            application_key: application_key.into(),
            application_secret: application_secret.into(),
            consumer_key: consumer_key.into(),
            debug: false,
            time_delta: OnceCell::new(),
        })
    }

    /// Enable per-request debug logging (credential headers obfuscated).
    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Endpoint base URL this transport talks to.
    #[must_use]
    pub fn endpoint_url(&self) -> &str {
        &self.endpoint_url
    }

    /// Offset in seconds between the API clock and the local clock.
    ///
    /// Measured once per instance with an unauthenticated call to
    /// `/auth/time`; concurrent first uses share a single measurement.
    ///
    /// # Errors
    /// Returns `Error::ClockSync` if the measurement failed; the failure is
    /// permanent for this instance.
    pub async fn time_delta(&self) -> Result<i64> {
        let measured = self
            .time_delta
            .get_or_init(|| async {
                let delta = self.measure_time_delta().await;
                if let Err(ref e) = delta {
                    error!(error = %e, "clock sync with API failed");
                }
                delta
            })
            .await;

        match measured {
            Ok(delta) => Ok(*delta),
            Err(e) => Err(Error::ClockSync(e.clone())),
        }
    }

    async fn measure_time_delta(&self) -> std::result::Result<i64, String> {
        let url = format!("{}/auth/time", self.endpoint_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("time endpoint returned {status}"));
        }

        let text = response.text().await.map_err(|e| e.to_string())?;
        let remote: i64 = text
            .trim()
            .parse()
            .map_err(|_| format!("non-numeric time endpoint response: {text:?}"))?;
        let delta = remote - chrono::Utc::now().timestamp();
        debug!(delta, "measured API clock delta");
        Ok(delta)
    }

    /// Compute the request signature.
    ///
    /// A signature is only valid for the exact (method, url, body, timestamp)
    /// tuple it was computed over.
    fn sign(&self, method: &str, url: &str, body: &str, timestamp: i64) -> String {
        use sha1::{Digest, Sha1};

        let to_sign = format!(
            "{}+{}+{}+{}+{}+{}",
            self.application_secret, self.consumer_key, method, url, body, timestamp
        );

        let mut hasher = Sha1::new();
        hasher.update(to_sign.as_bytes());
        format!("$1${}", hex::encode(hasher.finalize()))
    }

    /// Send one call, signed when a consumer key is set.
    ///
    /// # Errors
    /// `Error::Api` when the response status is a client or server error;
    /// `Error::Transport` when the request itself fails.
    pub async fn call<B: Serialize>(
        &self,
        method: Method,
        path: &str,
        content: Option<&B>,
    ) -> Result<reqwest::Response> {
        let target_url = format!("{}{}", self.endpoint_url, path);
        let timestamp = chrono::Utc::now().timestamp() + self.time_delta().await?;
        let body = match content {
            Some(content) => serde_json::to_string(content)?,
            None => String::new(),
        };

        let method_name = method.as_str().to_uppercase();
        let mut headers = vec![
            ("Content-Type", "application/json".to_string()),
            (APPLICATION_HEADER, self.application_key.clone()),
            (TIMESTAMP_HEADER, timestamp.to_string()),
        ];
        if !self.consumer_key.is_empty() {
            let signature = self.sign(&method_name, &target_url, &body, timestamp);
            headers.push((CONSUMER_HEADER, self.consumer_key.clone()));
            headers.push((SIGNATURE_HEADER, signature));
        }

        if self.debug {
            // Obfuscation happens while the line is built; the real values
            // never reach the log sink.
            debug!("REQ: {}", curl_line(&method_name, &target_url, &headers));
            if !body.is_empty() {
                debug!("REQ BODY: {body}");
            }
        }

        let mut request = self.client.request(method, &target_url);
        for (name, value) in &headers {
            request = request.header(*name, value.as_str());
        }

        let response = request.body(body).send().await?;
        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// GET a resource and decode it.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.call::<()>(Method::GET, path, None).await?;
        Self::decode(response).await
    }

    /// POST a resource and decode the response.
    pub async fn post<T, B>(&self, path: &str, content: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize,
    {
        let response = self.call(Method::POST, path, Some(content)).await?;
        Self::decode(response).await
    }

    /// POST a resource, ignoring the response body.
    pub async fn post_empty<B: Serialize>(&self, path: &str, content: &B) -> Result<()> {
        self.call(Method::POST, path, Some(content)).await?;
        Ok(())
    }

    /// PUT a resource, ignoring the response body.
    pub async fn put_empty<B: Serialize>(&self, path: &str, content: &B) -> Result<()> {
        self.call(Method::PUT, path, Some(content)).await?;
        Ok(())
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            warn!(error = %e, body = %text, "failed to parse API response");
            Error::UnexpectedResponse(e.to_string())
        })
    }
}

/// Rebuild the request as a copyable curl command, credential headers
/// obfuscated.
fn curl_line(method: &str, url: &str, headers: &[(&str, String)]) -> String {
    let mut parts = vec![format!("curl -g -i -X '{method}' '{url}'")];
    for (name, value) in headers {
        let value = if OBFUSCATE_REGEX.is_match(name) {
            OBFUSCATED
        } else {
            value.as_str()
        };
        parts.push(format!("-H '{name}: {value}'"));
    }
    parts.join(" ")
}
