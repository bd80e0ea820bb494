mod refresher;

use async_trait::async_trait;

pub use refresher::{ClientCredentials, TokenRefresher};

/// Supplies the bearer token for one poll cycle.
///
/// Implementations never fail outward: any problem is logged and reported
/// as `None`, and the cycle carries on with an empty bearer token.
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    async fn access_token(&self) -> Option<String>;
}
