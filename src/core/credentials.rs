use crate::core::token_store::FileTokenStore;
use anyhow::{Context, Result};
use notify::{Config, RecommendedWatcher, RecursiveMode, Watcher};
use std::ffi::OsString;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

const DEBOUNCE: Duration = Duration::from_millis(200);

/// Watches the refresh-token file for replacement by something other than
/// this process, e.g. an operator re-seeding a revoked token.
pub struct RefreshTokenWatcher {
    _watcher: RecommendedWatcher,
}

impl RefreshTokenWatcher {
    pub fn start(store: Arc<FileTokenStore>) -> Result<(Self, mpsc::UnboundedReceiver<()>)> {
        let path = store.path().to_path_buf();
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => std::env::current_dir().context("Failed to resolve current directory")?,
        };
        let file_name: OsString = path
            .file_name()
            .map(|n| n.to_os_string())
            .context("Refresh token path has no file name")?;

        let (async_tx, async_rx) = mpsc::unbounded_channel::<()>();
        let (notify_tx, mut notify_rx) = mpsc::unbounded_channel::<()>();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<notify::Event>| {
                if let Ok(event) = res {
                    if event.kind.is_modify() || event.kind.is_create() {
                        let touches_token = event
                            .paths
                            .iter()
                            .any(|p| p.file_name() == Some(file_name.as_os_str()));
                        if touches_token {
                            let _ = notify_tx.send(());
                        }
                    }
                }
            },
            Config::default(),
        )?;

        watcher
            .watch(&parent, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch directory: {}", parent.display()))?;
        tracing::info!(?parent, "Watching refresh token directory");

        tokio::spawn(async move {
            while notify_rx.recv().await.is_some() {
                tokio::time::sleep(DEBOUNCE).await;
                while notify_rx.try_recv().is_ok() {}

                let Ok(on_disk) = store.peek() else {
                    continue;
                };
                if store.last_known().as_deref() == Some(on_disk.as_str()) {
                    tracing::debug!("Refresh token file rewritten by this process");
                    continue;
                }

                tracing::info!(path = %store.path().display(), "Refresh token replaced on disk");
                if async_tx.send(()).is_err() {
                    break;
                }
            }
        });

        Ok((Self { _watcher: watcher }, async_rx))
    }
}
