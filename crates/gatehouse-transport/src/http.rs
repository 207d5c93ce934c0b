//! HTTP backend implementation using `reqwest`.
//!
//! Speaks the backend's REST shape: whitelisted methods under
//! `/api/method/<name>` answering `{ "message": ... }`, documents under
//! `/api/resource/<doctype>/<name>` answering `{ "data": ... }`. Session
//! cookies are kept in a shared jar so permission and profile queries ride
//! on the session established by `login`.

use std::sync::Arc;
use std::time::Duration;

use gatehouse_protocol::{
    Codec, JsonCodec, LoginRequest, LoginResponse, MethodResponse, PermissionSet, Profile,
    ResourceResponse, UserRecord,
};
use reqwest::cookie::Jar;
use reqwest::header::{CONTENT_TYPE, HeaderMap, SET_COOKIE};
use reqwest::{StatusCode, Url};

use crate::{PermissionEndpoint, ProfileEndpoint, SessionEndpoint, TransportError};

/// Whitelisted method answering the per-user capability map.
pub const DEFAULT_PERMISSION_METHOD: &str = "invoice_form_vue.api.check_user_permission";

/// Connection settings for [`HttpBackend`].
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Site root, e.g. `http://localhost:8000`.
    pub base_url: String,
    /// Per-request timeout enforced by the HTTP client.
    pub timeout: Duration,
    /// Method name queried for permissions.
    pub permission_method: String,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout: Duration::from_secs(10),
            permission_method: DEFAULT_PERMISSION_METHOD.to_string(),
            user_agent: concat!("gatehouse/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// A backend reached over HTTP. Implements every endpoint trait.
pub struct HttpBackend {
    client: reqwest::Client,
    base: Url,
    jar: Arc<Jar>,
    permission_method: String,
    codec: JsonCodec,
}

impl HttpBackend {
    /// Builds the HTTP client.
    ///
    /// # Errors
    /// Returns [`TransportError::Config`] for an unparsable base URL and
    /// [`TransportError::Request`] if the client cannot be constructed.
    pub fn new(config: HttpConfig) -> Result<Self, TransportError> {
        let base = Url::parse(&config.base_url)
            .map_err(|e| TransportError::Config(format!("base url {}: {e}", config.base_url)))?;
        let jar = Arc::new(Jar::default());
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent)
            .cookie_provider(Arc::clone(&jar))
            .build()
            .map_err(TransportError::Request)?;

        tracing::debug!(base = %base, "http backend ready");
        Ok(Self {
            client,
            base,
            jar,
            permission_method: config.permission_method,
            codec: JsonCodec,
        })
    }

    /// Seeds the cookie jar with existing session evidence
    /// (`user_id=...; sid=...`), so a session restored at boot is used for
    /// subsequent queries.
    pub fn with_evidence(self, evidence: &str) -> Self {
        for pair in evidence.split(';').map(str::trim).filter(|p| p.contains('=')) {
            self.jar.add_cookie_str(pair, &self.base);
        }
        self
    }

    fn url(&self, path: &str) -> Result<Url, TransportError> {
        self.base
            .join(path)
            .map_err(|e| TransportError::Config(format!("path {path}: {e}")))
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        endpoint: &'static str,
    ) -> Result<Vec<u8>, TransportError> {
        let response = request.send().await.map_err(TransportError::Request)?;
        let status = response.status();
        if !status.is_success() {
            tracing::debug!(endpoint, status = status.as_u16(), "endpoint rejected request");
            return Err(TransportError::Status {
                endpoint,
                status: status.as_u16(),
            });
        }
        let body = response.bytes().await.map_err(TransportError::Request)?;
        Ok(body.to_vec())
    }
}

impl SessionEndpoint for HttpBackend {
    async fn login(&self, identity: &str, secret: &str) -> Result<LoginResponse, TransportError> {
        let url = self.url("/api/method/login")?;
        let body = self.codec.encode(&LoginRequest {
            usr: identity.to_string(),
            pwd: secret.to_string(),
        })?;

        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(TransportError::Request)?;

        let status = response.status();
        let evidence = evidence_from_headers(response.headers());
        let rejected = matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN);
        if !status.is_success() && !rejected {
            return Err(TransportError::Status {
                endpoint: "login",
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await.map_err(TransportError::Request)?;
        // A rejection body is informational only; tolerate any shape.
        let message = self
            .codec
            .decode::<MethodResponse<String>>(&bytes)
            .ok()
            .and_then(|reply| reply.message);

        if rejected {
            return Ok(LoginResponse {
                success: false,
                message,
                evidence: String::new(),
            });
        }

        Ok(LoginResponse {
            success: message.is_some(),
            message,
            evidence,
        })
    }

    async fn logout(&self) -> Result<(), TransportError> {
        let url = self.url("/api/method/logout")?;
        self.send(self.client.get(url), "logout").await?;
        Ok(())
    }
}

impl PermissionEndpoint for HttpBackend {
    async fn get_permissions(&self, identity: &str) -> Result<PermissionSet, TransportError> {
        let url = self.url(&format!("/api/method/{}", self.permission_method))?;
        let request = self.client.get(url).query(&[("user", identity)]);
        let body = self.send(request, "permissions").await?;
        Ok(self.codec.decode_message(&body)?)
    }
}

impl ProfileEndpoint for HttpBackend {
    async fn current_identity(&self) -> Result<Option<String>, TransportError> {
        let url = self.url("/api/method/frappe.auth.get_logged_user")?;
        match self.send(self.client.get(url), "current identity").await {
            Ok(body) => Ok(Some(self.codec.decode_message(&body)?)),
            Err(TransportError::Status { status: 401 | 403, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn profile(&self, identity: &str) -> Result<Profile, TransportError> {
        let url = self.url(&format!(
            "/api/resource/User/{}",
            urlencoding::encode(identity)
        ))?;
        let body = self.send(self.client.get(url), "profile").await?;
        let record: ResourceResponse<UserRecord> = self.codec.decode(&body)?;
        Ok(record.data.into())
    }
}

/// Rebuilds cookie-style evidence from `Set-Cookie` headers, keeping only
/// each cookie's `name=value` part.
fn evidence_from_headers(headers: &HeaderMap) -> String {
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|cookie| cookie.split(';').next())
        .map(str::trim)
        .filter(|pair| pair.contains('='))
        .collect::<Vec<_>>()
        .join("; ")
}
