use midas_config::XiaohongshuSettings;
use midas_models::{AuthCapture, MidasError};
use reqwest::Method;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{instrument, warn};
use url::Url;

/// One entry in a collection listing page.
#[derive(Debug, Clone, Deserialize)]
pub struct ListItem {
    pub note_id: String,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListPage {
    pub items: Vec<ListItem>,
    pub next_cursor: Option<String>,
}

/// The fields of a note's detail view this version cares about. The
/// upstream schema carries much more; only what the pipeline consumes
/// is modeled here.
#[derive(Debug, Clone, Deserialize)]
pub struct NoteDetail {
    pub note_id: String,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub video_media_url: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
}

const SIGNATURE_REJECTION_STATUS: u16 = 406;

/// Wraps signed upstream calls to Xiaohongshu's web-readonly surface
/// (C8). Holds the live `AuthCapture`, replaceable wholesale via
/// `set_auth`.
pub struct XiaohongshuFetcher {
    client: reqwest::Client,
    settings: XiaohongshuSettings,
    auth: Arc<Mutex<AuthCapture>>,
}

impl XiaohongshuFetcher {
    pub fn new(client: reqwest::Client, settings: XiaohongshuSettings, auth: Arc<Mutex<AuthCapture>>) -> Self {
        Self {
            client,
            settings,
            auth,
        }
    }

    #[instrument(skip(self))]
    pub async fn fetch_list(&self, cursor: Option<&str>, limit: u32) -> Result<ListPage, MidasError> {
        let mut url = format!(
            "https://edith.xiaohongshu.com/api/sns/web/v1/collection/{}/notes?limit={limit}",
            self.settings.collection_id,
        );
        if let Some(cursor) = cursor {
            url.push_str(&format!("&cursor={cursor}"));
        }

        let response = self.call(Method::GET, &url).await?;
        if response.status().as_u16() == SIGNATURE_REJECTION_STATUS {
            warn!("list fetch rejected by upstream signature check, no browser fallback configured");
            return Err(MidasError::upstream(
                "upstream rejected the request signature and no live-browser fallback is configured",
            ));
        }
        self.decode(response).await
    }

    #[instrument(skip(self))]
    pub async fn fetch_detail(&self, note_id: &str) -> Result<NoteDetail, MidasError> {
        let url = format!("https://edith.xiaohongshu.com/api/sns/web/v1/feed/{note_id}");
        let response = self.call(Method::GET, &url).await?;
        self.decode(response).await
    }

    async fn call(&self, method: Method, url: &str) -> Result<reqwest::Response, MidasError> {
        let parsed = Url::parse(url).map_err(|e| MidasError::internal(format!("invalid upstream url: {e}")))?;
        if parsed.scheme() != "https" {
            return Err(MidasError::internal("upstream calls must use https"));
        }
        let host = parsed.host_str().unwrap_or_default();
        if !self.settings.allowed_hosts.iter().any(|h| h == host) {
            return Err(MidasError::internal(format!("host {host} is not on the allowlist")));
        }
        if method != Method::GET && method != Method::POST {
            return Err(MidasError::internal("only GET/POST are permitted upstream"));
        }

        let auth = self.auth.lock().await.clone();
        auth.validate()
            .map_err(|reason| MidasError::auth_expired(reason.to_string()))?;

        let timeout = Duration::from_secs(self.settings.request_timeout_seconds);
        let mut request = self
            .client
            .request(method, url)
            .timeout(timeout)
            .header(reqwest::header::COOKIE, auth.cookie.clone())
            .header(reqwest::header::USER_AGENT, auth.user_agent.clone())
            .header(reqwest::header::ORIGIN, auth.origin.clone())
            .header(reqwest::header::REFERER, auth.referer.clone());

        for (key, value) in &auth.extra_headers {
            request = request.header(key, value);
        }

        let response = request
            .send()
            .await
            .map_err(|e| MidasError::upstream(format!("xiaohongshu request failed: {e}")))?;

        match response.status().as_u16() {
            401 | 403 => Err(MidasError::auth_expired("xiaohongshu rejected current credentials")),
            429 => {
                let retry_after = response
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(60);
                Err(MidasError::rate_limited("xiaohongshu rate-limited the request", retry_after))
            }
            _ => Ok(response),
        }
    }

    async fn decode<T: for<'de> Deserialize<'de>>(&self, response: reqwest::Response) -> Result<T, MidasError> {
        if !response.status().is_success() {
            return Err(MidasError::upstream(format!(
                "xiaohongshu returned status {}",
                response.status()
            )));
        }
        response
            .json()
            .await
            .map_err(|e| MidasError::upstream(format!("xiaohongshu response was not valid JSON: {e}")))
    }

    pub async fn set_auth(&self, new_auth: AuthCapture) -> Result<(), MidasError> {
        new_auth
            .validate()
            .map_err(|reason| MidasError::invalid_input(reason.to_string()))?;
        *self.auth.lock().await = new_auth;
        Ok(())
    }

    pub async fn current_auth(&self) -> AuthCapture {
        self.auth.lock().await.clone()
    }
}
