use super::AccessTokenProvider;
use crate::core::error::RefreshError;
use crate::core::models::AccessToken;
use crate::core::settings::OauthSettings;
use crate::core::token_store::TokenStore;
use crate::http::{Headers, HttpClient};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Clone)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

impl From<&OauthSettings> for ClientCredentials {
    fn from(settings: &OauthSettings) -> Self {
        Self {
            client_id: settings.client_id.clone(),
            client_secret: settings.client_secret.clone(),
            redirect_uri: settings.redirect_uri.clone(),
        }
    }
}

/// Trades the stored refresh token for a new token pair and persists the
/// rotated refresh token.
pub struct TokenRefresher {
    http: HttpClient,
    store: Arc<dyn TokenStore>,
    credentials: ClientCredentials,
    token_url: String,
}

impl TokenRefresher {
    pub fn new(
        http: HttpClient,
        store: Arc<dyn TokenStore>,
        credentials: ClientCredentials,
        token_url: impl Into<String>,
    ) -> Self {
        Self {
            http,
            store,
            credentials,
            token_url: token_url.into(),
        }
    }

    /// Runs one `refresh_token` grant, surfacing every failure.
    pub async fn try_refresh(&self) -> Result<AccessToken, RefreshError> {
        let refresh_token = self.store.read()?;

        let fields = [
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("refresh_token", refresh_token.as_str()),
            ("grant_type", "refresh_token"),
            ("redirect_uri", self.credentials.redirect_uri.as_str()),
        ];

        let token: AccessToken = self
            .http
            .post_json(&self.token_url, &fields, &Headers::new())
            .await?;

        // The old refresh token is spent once the grant succeeds.
        match token.rotated_refresh_token() {
            Some(rotated) => self.store.write(rotated)?,
            None => warn!("Token endpoint did not return a refresh_token, keeping the stored one"),
        }

        if token.access_token.trim().is_empty() {
            return Err(RefreshError::MissingAccessToken);
        }

        Ok(token)
    }

    /// Like [`try_refresh`](Self::try_refresh) but logs failures and yields
    /// `None` instead of an error.
    pub async fn refresh(&self) -> Option<String> {
        match self.try_refresh().await {
            Ok(token) => {
                info!(
                    token_type = %token.token_type,
                    expires_in = token.expires_in,
                    "Access token refreshed"
                );
                Some(token.access_token)
            }
            Err(e) => {
                error!(error = %e, kind = %e.kind(), "Token refresh failed");
                None
            }
        }
    }
}

#[async_trait]
impl AccessTokenProvider for TokenRefresher {
    async fn access_token(&self) -> Option<String> {
        self.refresh().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorKind;
    use crate::core::settings::WriteMode;
    use crate::core::token_store::testing::MemoryTokenStore;
    use crate::core::token_store::FileTokenStore;
    use crate::http::ClientOptions;
    use wiremock::matchers::{body_string, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn credentials() -> ClientCredentials {
        ClientCredentials {
            client_id: "client-1".to_string(),
            client_secret: "s3cret".to_string(),
            redirect_uri: "http://localhost/callback".to_string(),
        }
    }

    fn refresher(server: &MockServer, store: Arc<dyn TokenStore>) -> TokenRefresher {
        TokenRefresher::new(
            HttpClient::new(&ClientOptions::default()).unwrap(),
            store,
            credentials(),
            format!("{}/oauth2/v2.0/token", server.uri()),
        )
    }

    fn token_body(access: &str, refresh: &str) -> serde_json::Value {
        serde_json::json!({
            "token_type": "Bearer",
            "scope": "Mail.Read offline_access",
            "expires_in": 3599,
            "ext_expires_in": 3599,
            "access_token": access,
            "refresh_token": refresh,
        })
    }

    #[tokio::test]
    async fn test_refresh_posts_grant_and_rotates_token() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/oauth2/v2.0/token"))
            .and(body_string(
                "client_id=client-1&client_secret=s3cret&refresh_token=old-token\
                 &grant_type=refresh_token&redirect_uri=http%3A%2F%2Flocalhost%2Fcallback",
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_body("access-1", "new-token")))
            .expect(1)
            .mount(&mock_server)
            .await;

        let store = Arc::new(MemoryTokenStore::with_token("old-token"));
        let refresher = refresher(&mock_server, store.clone());

        let token = refresher.try_refresh().await.unwrap();
        assert_eq!(token.access_token, "access-1");
        assert_eq!(store.current().as_deref(), Some("new-token"));
        assert_eq!(store.write_count(), 1);
    }

    #[tokio::test]
    async fn test_file_store_holds_new_token_after_refresh() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_body("a", "rotated")))
            .mount(&mock_server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let token_path = dir.path().join("refreshToken.txt");
        std::fs::write(&token_path, "original\n").unwrap();
        let store = Arc::new(FileTokenStore::new(&token_path, WriteMode::Replace));

        let access = refresher(&mock_server, store.clone()).refresh().await;
        assert_eq!(access.as_deref(), Some("a"));
        assert_eq!(store.read().unwrap(), "rotated");
        assert_eq!(std::fs::read_to_string(&token_path).unwrap(), "rotated");
    }

    #[tokio::test]
    async fn test_undecodable_body_yields_none_and_keeps_token() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&mock_server)
            .await;

        let store = Arc::new(MemoryTokenStore::with_token("old-token"));
        let refresher = refresher(&mock_server, store.clone());

        let err = refresher.try_refresh().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Deserialization);
        assert_eq!(refresher.refresh().await, None);
        assert_eq!(store.current().as_deref(), Some("old-token"));
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn test_rejected_grant_yields_none() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "invalid_grant",
                "error_description": "AADSTS70000: token expired"
            })))
            .mount(&mock_server)
            .await;

        let store = Arc::new(MemoryTokenStore::with_token("stale"));
        let refresher = refresher(&mock_server, store.clone());

        let err = refresher.try_refresh().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Network);
        assert!(err.to_string().contains("invalid_grant"));
        assert_eq!(refresher.access_token().await, None);
    }

    #[tokio::test]
    async fn test_missing_stored_token_skips_network() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        let refresher = refresher(&mock_server, Arc::new(MemoryTokenStore::empty()));
        let err = refresher.try_refresh().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[tokio::test]
    async fn test_persist_failure_yields_none() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_body("a", "b")))
            .mount(&mock_server)
            .await;

        let store = Arc::new(MemoryTokenStore::failing_writes("old"));
        let refresher = refresher(&mock_server, store.clone());

        assert_eq!(refresher.refresh().await, None);
        assert_eq!(store.write_count(), 1);
    }

    #[tokio::test]
    async fn test_response_without_refresh_token_keeps_stored_one() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "token_type": "Bearer",
                "expires_in": 3600,
                "access_token": "only-access"
            })))
            .mount(&mock_server)
            .await;

        let store = Arc::new(MemoryTokenStore::with_token("keep-me"));
        let refresher = refresher(&mock_server, store.clone());

        assert_eq!(refresher.refresh().await.as_deref(), Some("only-access"));
        assert_eq!(store.current().as_deref(), Some("keep-me"));
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_access_token_still_saves_rotated_token() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_body("", "next")))
            .mount(&mock_server)
            .await;

        let store = Arc::new(MemoryTokenStore::with_token("old"));
        let refresher = refresher(&mock_server, store.clone());

        assert!(matches!(
            refresher.try_refresh().await,
            Err(RefreshError::MissingAccessToken)
        ));
        assert_eq!(store.current().as_deref(), Some("next"));
        assert_eq!(refresher.refresh().await, None);
    }

    #[tokio::test]
    async fn test_missing_access_token_field_still_saves_rotated_token() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "token_type": "Bearer",
                "refresh_token": "rotated"
            })))
            .mount(&mock_server)
            .await;

        let store = Arc::new(MemoryTokenStore::with_token("old"));
        let refresher = refresher(&mock_server, store.clone());

        assert_eq!(refresher.refresh().await, None);
        assert_eq!(store.current().as_deref(), Some("rotated"));
        assert_eq!(store.write_count(), 1);
    }
}
