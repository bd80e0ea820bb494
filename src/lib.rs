pub mod cli;
pub mod core;
pub mod daemon;
pub mod http;
pub mod oauth;

pub use crate::core::error::{ErrorKind, HttpError, RefreshError, TokenStoreError};
pub use crate::core::settings::Settings;
pub use daemon::{Components, PollScheduler};
pub use http::blocking::BlockingHttpClient;
pub use http::{HttpClient, MultipartForm};
pub use oauth::{AccessTokenProvider, TokenRefresher};
