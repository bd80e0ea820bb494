use crate::core::models::CycleReport;
use crate::core::settings::Settings;
use crate::daemon::Components;
use anyhow::Result;

/// Runs a single poll cycle in the foreground and prints what happened.
pub async fn run(settings: &Settings, json: bool) -> Result<()> {
    let components = Components::from_settings(settings)?;
    let mut scheduler = components.scheduler(settings);

    let report = scheduler.run_cycle().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render_text(&report));
    }

    if !report.token_acquired {
        anyhow::bail!("Token refresh failed, see log output");
    }
    if report.failed() > 0 {
        anyhow::bail!("{} of {} endpoint calls failed", report.failed(), report.outcomes.len());
    }
    Ok(())
}

fn render_text(report: &CycleReport) -> String {
    let mut out = String::new();
    let token = if report.token_acquired { "acquired" } else { "unavailable" };
    out.push_str(&format!("Access token: {token}\n"));

    if report.outcomes.is_empty() {
        out.push_str("No endpoints configured\n");
        return out;
    }

    for outcome in &report.outcomes {
        let mark = if outcome.succeeded { "ok  " } else { "FAIL" };
        let detail = match (&outcome.status_code, &outcome.error) {
            (_, Some(error)) => error.clone(),
            (Some(code), None) => code.to_string(),
            (None, None) => "-".to_string(),
        };
        out.push_str(&format!("  {mark} {} ({detail})\n", outcome.url));
    }
    out.push_str(&format!(
        "{} succeeded, {} failed\n",
        report.succeeded(),
        report.failed()
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::PollOutcome;
    use reqwest::StatusCode;

    #[test]
    fn test_render_text_lists_each_endpoint() {
        let mut report = CycleReport::new(true);
        report
            .outcomes
            .push(PollOutcome::from_status("https://a.example/x", StatusCode::OK));
        report.outcomes.push(PollOutcome::from_error(
            "https://b.example/y",
            "connection refused".to_string(),
        ));

        let text = render_text(&report);
        assert!(text.starts_with("Access token: acquired\n"));
        assert!(text.contains("  ok   https://a.example/x (200)\n"));
        assert!(text.contains("  FAIL https://b.example/y (connection refused)\n"));
        assert!(text.ends_with("1 succeeded, 1 failed\n"));
    }

    #[test]
    fn test_render_text_without_endpoints() {
        let text = render_text(&CycleReport::new(false));
        assert_eq!(text, "Access token: unavailable\nNo endpoints configured\n");
    }
}
