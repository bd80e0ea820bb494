//! Request/response plumbing shared by the async and blocking clients.
//!
//! Both clients apply the same [`RequestProfile`]: default `User-Agent`,
//! `Accept` and optional `Referer`, overridden by per-request headers, a
//! cookie jar owned by the client, and (by default) no certificate checks on
//! HTTPS targets.

pub mod blocking;
mod client;
pub mod multipart;

use crate::core::error::{preview, HttpError};
use crate::core::settings::HttpSettings;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, REFERER, USER_AGENT};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

pub use client::HttpClient;
pub use multipart::MultipartForm;

/// Extra request headers, applied on top of the client defaults.
pub type Headers = HashMap<String, String>;

#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub user_agent: String,
    pub accept: String,
    pub referer: Option<String>,
    pub form_content_type: String,
    pub encoding: String,
    pub timeout: Duration,
    pub accept_invalid_certs: bool,
    pub cookies: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self::from(&HttpSettings::default())
    }
}

impl From<&HttpSettings> for ClientOptions {
    fn from(settings: &HttpSettings) -> Self {
        Self {
            user_agent: settings.user_agent.clone(),
            accept: settings.accept.clone(),
            referer: settings.referer.clone(),
            form_content_type: settings.form_content_type.clone(),
            encoding: settings.encoding.clone(),
            timeout: Duration::from_secs(settings.timeout_secs),
            accept_invalid_certs: settings.accept_invalid_certs,
            cookies: settings.cookies,
        }
    }
}

/// Per-request defaults derived from [`ClientOptions`].
#[derive(Debug, Clone)]
pub(crate) struct RequestProfile {
    user_agent: String,
    accept: String,
    referer: Option<String>,
    pub(crate) form_content_type: String,
    pub(crate) encoding: String,
}

impl RequestProfile {
    pub(crate) fn new(options: &ClientOptions) -> Self {
        Self {
            user_agent: options.user_agent.clone(),
            accept: options.accept.clone(),
            referer: options.referer.clone(),
            form_content_type: options.form_content_type.clone(),
            encoding: options.encoding.clone(),
        }
    }

    /// Default headers with `extra` layered on top; same-named entries win.
    pub(crate) fn headers(&self, extra: &Headers) -> Result<HeaderMap, HttpError> {
        let mut map = HeaderMap::new();
        map.insert(USER_AGENT, header_value("User-Agent", &self.user_agent)?);
        map.insert(ACCEPT, header_value("Accept", &self.accept)?);
        if let Some(referer) = self.referer.as_deref().filter(|r| !r.is_empty()) {
            map.insert(REFERER, header_value("Referer", referer)?);
        }

        for (name, value) in extra {
            let header_name =
                HeaderName::from_bytes(name.as_bytes()).map_err(|e| HttpError::InvalidHeader {
                    name: name.clone(),
                    reason: e.to_string(),
                })?;
            map.insert(header_name, header_value(name, value)?);
        }
        Ok(map)
    }
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue, HttpError> {
    HeaderValue::from_str(value).map_err(|e| HttpError::InvalidHeader {
        name: name.to_string(),
        reason: e.to_string(),
    })
}

/// Validates that `url` is a non-blank absolute http(s) URL.
pub fn parse_url(url: &str) -> Result<Url, HttpError> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err(HttpError::InvalidUrl {
            url: url.to_string(),
            reason: "url is empty".to_string(),
        });
    }

    let parsed = Url::parse(trimmed).map_err(|e| HttpError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(HttpError::InvalidUrl {
            url: url.to_string(),
            reason: format!("unsupported scheme {other:?}"),
        }),
    }
}

/// Encodes `key=value` pairs joined with `&`, percent-encoding both sides.
pub fn encode_form(fields: &[(&str, &str)]) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(fields.iter().copied())
        .finish()
}

/// A fully read response. The connection is released before this exists.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub url: String,
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl HttpResponse {
    pub fn is_ok(&self) -> bool {
        self.status == StatusCode::OK
    }

    /// Returns the body, or a status error for non-2xx responses.
    pub fn into_text(self) -> Result<String, HttpError> {
        if !self.status.is_success() {
            return Err(HttpError::Status {
                url: self.url,
                status: self.status,
                body: preview(&self.body),
            });
        }
        Ok(self.body)
    }

    /// Decodes a 2xx body as JSON into `T`.
    pub fn json<T: DeserializeOwned>(self) -> Result<T, HttpError> {
        let url = self.url.clone();
        let body = self.into_text()?;
        serde_json::from_str(&body).map_err(|source| HttpError::Decode {
            url,
            source,
            body: preview(&body),
        })
    }
}
