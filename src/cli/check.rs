use crate::core::settings::Settings;
use crate::core::token_store::FileTokenStore;
use crate::http::parse_url;
use anyhow::Result;

/// Prints the effective configuration with secrets redacted and flags
/// endpoints or token state that would fail at runtime.
pub fn run(settings: &Settings) -> Result<()> {
    let (report, problems) = render(settings);
    print!("{report}");

    if problems > 0 {
        anyhow::bail!("{problems} problem(s) found");
    }
    println!("Configuration OK");
    Ok(())
}

fn render(settings: &Settings) -> (String, usize) {
    let mut out = String::new();
    let mut problems = 0;

    out.push_str(&format!("Interval:      {} ms\n", settings.interval_ms));
    out.push_str(&format!("Token URL:     {}\n", settings.oauth.token_url));
    out.push_str(&format!("Client ID:     {}\n", settings.oauth.client_id));
    out.push_str(&format!("Client secret: {}\n", redact(&settings.oauth.client_secret)));
    out.push_str(&format!("Redirect URI:  {}\n", settings.oauth.redirect_uri));

    let token_path = settings.token_file_path();
    let store = FileTokenStore::new(&token_path, settings.token_store.write_mode);
    let token_state = match store.peek() {
        Ok(_) => "present".to_string(),
        Err(e) => {
            problems += 1;
            e.to_string()
        }
    };
    out.push_str(&format!(
        "Token file:    {} ({token_state})\n",
        token_path.display()
    ));

    out.push_str(&format!("Endpoints:     {}\n", settings.endpoints.len()));
    for url in &settings.endpoints {
        match parse_url(url) {
            Ok(_) => out.push_str(&format!("  {url}\n")),
            Err(e) => {
                problems += 1;
                out.push_str(&format!("  {url} (invalid: {e})\n"));
            }
        }
    }

    (out, problems)
}

fn redact(secret: &str) -> &'static str {
    if secret.is_empty() {
        "(not set)"
    } else {
        "(set)"
    }
}
