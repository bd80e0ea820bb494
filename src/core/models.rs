use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Body returned by the token endpoint on a successful `refresh_token` grant.
#[derive(Clone, Default, Deserialize)]
pub struct AccessToken {
    #[serde(default)]
    pub token_type: String,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub expires_in: u64,
    #[serde(default)]
    pub ext_expires_in: u64,
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl AccessToken {
    /// The rotated refresh token, if the provider issued a usable one.
    pub fn rotated_refresh_token(&self) -> Option<&str> {
        self.refresh_token
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("token_type", &self.token_type)
            .field("scope", &self.scope)
            .field("expires_in", &self.expires_in)
            .field("ext_expires_in", &self.ext_expires_in)
            .field("access_token", &"<redacted>")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PollOutcome {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    pub succeeded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PollOutcome {
    pub fn from_status(url: &str, status: reqwest::StatusCode) -> Self {
        Self {
            url: url.to_string(),
            status_code: Some(status.as_u16()),
            succeeded: status == reqwest::StatusCode::OK,
            error: None,
        }
    }

    pub fn from_error(url: &str, error: String) -> Self {
        Self {
            url: url.to_string(),
            status_code: None,
            succeeded: false,
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub started_at: DateTime<Utc>,
    pub token_acquired: bool,
    pub outcomes: Vec<PollOutcome>,
}

impl CycleReport {
    pub fn new(token_acquired: bool) -> Self {
        Self {
            started_at: Utc::now(),
            token_acquired,
            outcomes: Vec::new(),
        }
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.succeeded).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }
}
