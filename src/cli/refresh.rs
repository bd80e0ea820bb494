use crate::core::settings::Settings;
use crate::daemon::Components;
use anyhow::{Context, Result};

/// Performs one refresh grant and persists the rotated refresh token.
/// Token values are never printed.
pub async fn run(settings: &Settings) -> Result<()> {
    let components = Components::from_settings(settings)?;

    let token = components
        .refresher
        .try_refresh()
        .await
        .context("Token refresh failed")?;

    println!(
        "Access token refreshed ({}, expires in {}s)",
        token.token_type, token.expires_in
    );
    if let Some(scope) = token.scope.as_deref().filter(|s| !s.is_empty()) {
        println!("Scope: {scope}");
    }
    match token.rotated_refresh_token() {
        Some(_) => println!(
            "Refresh token rotated and saved to {}",
            components.store.path().display()
        ),
        None => println!("Token endpoint did not rotate the refresh token"),
    }
    Ok(())
}
