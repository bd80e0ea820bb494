mod polling;

use crate::core::credentials::RefreshTokenWatcher;
use crate::core::settings::Settings;
use crate::core::token_store::FileTokenStore;
use crate::http::{ClientOptions, HttpClient};
use crate::oauth::{ClientCredentials, TokenRefresher};
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;

pub use polling::PollScheduler;

/// The long-lived pieces shared by the daemon and the one-shot commands.
pub struct Components {
    pub http: HttpClient,
    pub store: Arc<FileTokenStore>,
    pub refresher: Arc<TokenRefresher>,
}

impl Components {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let http = HttpClient::new(&ClientOptions::from(&settings.http))
            .context("Failed to build HTTP client")?;
        let store = Arc::new(FileTokenStore::new(
            settings.token_file_path(),
            settings.token_store.write_mode,
        ));
        let refresher = Arc::new(TokenRefresher::new(
            http.clone(),
            store.clone(),
            ClientCredentials::from(&settings.oauth),
            settings.oauth.token_url.clone(),
        ));

        Ok(Self {
            http,
            store,
            refresher,
        })
    }

    pub fn scheduler(&self, settings: &Settings) -> PollScheduler {
        PollScheduler::new(
            self.refresher.clone(),
            self.http.clone(),
            settings.endpoints.clone(),
            settings.interval(),
        )
    }
}

pub async fn run(settings: Settings) -> Result<()> {
    tracing::info!(
        token_file = %settings.token_file_path().display(),
        endpoints = settings.endpoints.len(),
        "Starting token-poller daemon"
    );

    let components = Components::from_settings(&settings)?;
    let scheduler = components.scheduler(&settings);

    // Dropping the watcher stops it, so it lives until the scheduler exits.
    let (_watcher, wake) = if settings.token_store.watch {
        match RefreshTokenWatcher::start(components.store.clone()) {
            Ok((watcher, rx)) => (Some(watcher), Some(rx)),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to watch refresh token file, continuing without it");
                (None, None)
            }
        }
    } else {
        (None, None)
    };

    let cancel = CancellationToken::new();
    let handle = tokio::spawn(scheduler.run(cancel.clone(), wake));

    shutdown_signal().await;
    tracing::info!("Shutdown requested");
    cancel.cancel();

    handle.await.context("Poll scheduler task failed")?;
    tracing::info!("token-poller daemon stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
