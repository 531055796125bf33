//! Session context and the `wreq` transport that carries it.

use std::collections::BTreeMap;

use wreq::{Client, header};
use wreq_util::Emulation;

use crate::config::ClientConfig;
use crate::credential::CredentialBundle;
use crate::error::{Error, Result};
use crate::transport::{ApiRequest, Method, RawResponse, Transport};

/// Authentication material and fixed headers, immutable after construction.
#[derive(Debug, Clone)]
pub struct Session {
    credentials: CredentialBundle,
    headers: BTreeMap<String, String>,
    cookie_header: String,
}

impl Session {
    pub fn new(credentials: CredentialBundle, headers: BTreeMap<String, String>) -> Self {
        let cookie_header = credentials.cookie_header();
        Self {
            credentials,
            headers,
            cookie_header,
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.credentials.clone(), config.headers.clone())
    }

    pub fn credentials(&self) -> &CredentialBundle {
        &self.credentials
    }

    fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn cookie_header(&self) -> &str {
        &self.cookie_header
    }
}

/// Production transport: one pooled `wreq` client with browser emulation.
pub struct WreqTransport {
    http_client: Client,
    session: Session,
}

impl WreqTransport {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let http_client = Client::builder()
            .emulation(Emulation::Chrome143)
            .gzip(true)
            .brotli(true)
            .zstd(true)
            .timeout(config.settings.timeout())
            .build()
            .map_err(|e| Error::Transport(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            session: Session::from_config(config),
        })
    }
}

/// Append urlencoded query pairs to a URL.
pub(crate) fn url_with_query(request: &ApiRequest) -> Result<String> {
    if request.query.is_empty() {
        return Ok(request.url.clone());
    }
    let query = serde_urlencoded::to_string(&request.query)
        .map_err(|e| Error::Transport(format!("failed to encode query: {}", e)))?;
    let sep = if request.url.contains('?') { '&' } else { '?' };
    Ok(format!("{}{}{}", request.url, sep, query))
}

impl Transport for WreqTransport {
    async fn send(&self, request: &ApiRequest) -> Result<RawResponse> {
        let url = url_with_query(request)?;
        let mut builder = match request.method {
            Method::Get => self.http_client.get(&url),
            Method::Post => self.http_client.post(&url),
        };

        for (name, value) in self.session.headers() {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder = builder.header(header::COOKIE, self.session.cookie_header());

        if !request.form.is_empty() {
            let body = serde_urlencoded::to_string(&request.form)
                .map_err(|e| Error::Transport(format!("failed to encode form: {}", e)))?;
            builder = builder
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Transport(format!("failed to read body: {}", e)))?;

        Ok(RawResponse { status, body })
    }
}
