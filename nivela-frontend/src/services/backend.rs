//! HTTP client for the hosted backend (identity, REST rows, object storage).

use crate::config::BackendSettings;
use crate::models::AuthState;
use reqwest::{Client, IntoUrl, Method, RequestBuilder, Response, Url};
use secrecy::{ExposeSecret, Secret};
use service_core::error::AppError;
use service_core::observability::TracedRequestExt;
use tokio::sync::watch;

#[derive(Clone)]
pub struct BackendClient {
    http: Client,
    base_url: String,
    base: Url,
    api_key: Secret<String>,
    auth: Option<watch::Receiver<AuthState>>,
}

impl BackendClient {
    pub fn new(settings: &BackendSettings) -> Result<Self, AppError> {
        let http = Client::builder()
            .timeout(settings.request_timeout())
            .build()
            .map_err(|e| AppError::ConfigError(anyhow::anyhow!("HTTP client: {}", e)))?;

        let base_url = settings.url.trim_end_matches('/').to_string();
        let base = Url::parse(&base_url)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| {
                AppError::ConfigError(anyhow::anyhow!("invalid backend url: {}", settings.url))
            })?;

        Ok(Self {
            http,
            base_url,
            base,
            api_key: settings.anon_key.clone(),
            auth: None,
        })
    }

    /// A client that authenticates as the signed-in user whenever there is one.
    pub fn with_session(&self, auth: watch::Receiver<AuthState>) -> Self {
        Self {
            auth: Some(auth),
            ..self.clone()
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// URL made of `prefix` followed by `segments`, each percent-encoded as a
    /// single path segment.
    pub fn segment_url<'a>(
        &self,
        prefix: &str,
        segments: impl IntoIterator<Item = &'a str>,
    ) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty()
                .extend(prefix.split('/').filter(|s| !s.is_empty()))
                .extend(segments);
        }
        url
    }

    /// Request authenticated with the current session token, or the API key
    /// when signed out.
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.request_url(method, self.url(path))
    }

    pub fn request_url(&self, method: Method, url: impl IntoUrl) -> RequestBuilder {
        let session_token = self.auth.as_ref().and_then(|auth| {
            auth.borrow()
                .session
                .as_ref()
                .map(|session| session.access_token.clone())
        });

        match session_token {
            Some(token) => self.authorized(method, url, &token),
            None => self.authorized(method, url, self.api_key.expose_secret()),
        }
    }

    pub fn request_with_token(&self, method: Method, path: &str, token: &str) -> RequestBuilder {
        self.authorized(method, self.url(path), token)
    }

    fn authorized(&self, method: Method, url: impl IntoUrl, token: &str) -> RequestBuilder {
        self.http
            .request(method, url)
            .header("apikey", self.api_key.expose_secret())
            .bearer_auth(token)
            .traced()
    }
}

/// Turn a non-success response into an error carrying status and the
/// backend's message.
pub async fn error_from_response(response: Response) -> anyhow::Error {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    anyhow::anyhow!("{} {}", status.as_u16(), backend_message(&body))
}

/// The backend reports errors under different keys depending on the service.
pub fn backend_message(body: &str) -> String {
    let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();
    parsed
        .as_ref()
        .and_then(|value| {
            ["message", "error_description", "msg", "error"]
                .iter()
                .find_map(|key| value.get(*key).and_then(|v| v.as_str()))
        })
        .map(str::to_string)
        .unwrap_or_else(|| body.trim().to_string())
}
