//! Environment readiness check.

use crate::cli::output::{self, Styled};
use crate::config::{self, ScoutConfig};
use crate::renderer::chromium::{self, CHROMIUM_ENV};
use anyhow::Result;
use std::path::Path;

/// Check Chromium availability, config resolution and the site registry.
pub async fn run(config_path: Option<&Path>) -> Result<()> {
    let chromium_path = chromium::find_chromium();
    let resolved = config::resolve_config_path(config_path);
    let loaded = ScoutConfig::load(config_path);

    if output::is_json() {
        let (config_ok, config_error, sites) = match &loaded {
            Ok(c) => (true, None, c.sites.iter().map(|s| s.id.clone()).collect()),
            Err(e) => (false, Some(e.to_string()), Vec::new()),
        };
        output::print_json(&serde_json::json!({
            "os": std::env::consts::OS,
            "arch": std::env::consts::ARCH,
            "chromium": chromium_path.as_ref().map(|p| p.display().to_string()),
            "config_path": resolved.as_ref().map(|p| p.display().to_string()),
            "config_ok": config_ok,
            "config_error": config_error,
            "sites": sites,
            "static_ready": config_ok,
            "rendered_ready": config_ok && chromium_path.is_some(),
        }));
        return Ok(());
    }

    let s = Styled::new();
    output::print_header(&s);

    output::print_section(&s, "System");
    output::print_check(
        s.ok_sym(),
        "Platform",
        &format!("{} {}", std::env::consts::OS, std::env::consts::ARCH),
    );
    eprintln!();

    output::print_section(&s, "Browser");
    match &chromium_path {
        Some(path) => output::print_check(s.ok_sym(), "Chromium", &path.display().to_string()),
        None => {
            output::print_check(s.warn_sym(), "Chromium", &s.yellow("not found"));
            output::print_detail(&format!(
                "Install Chrome/Chromium or set {CHROMIUM_ENV}; --rendered needs it."
            ));
        }
    }
    eprintln!();

    output::print_section(&s, "Config");
    let source = resolved
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "built-in defaults".to_string());
    match &loaded {
        Ok(c) => {
            output::print_check(s.ok_sym(), "Source", &source);
            let ids: Vec<&str> = c.sites.iter().map(|s| s.id.as_str()).collect();
            output::print_check(s.ok_sym(), "Sites", &ids.join(", "));
            output::print_check(
                s.info_sym(),
                "Politeness",
                &format!(
                    "{} at a time, {}ms per host",
                    c.politeness.concurrency, c.politeness.min_delay_ms
                ),
            );
        }
        Err(e) => {
            output::print_check(s.fail_sym(), "Source", &source);
            output::print_detail(&s.red(&e.to_string()));
        }
    }

    match (&loaded, &chromium_path) {
        (Err(_), _) => output::print_status(&s, &s.red("NOT READY"), "fix the config"),
        (Ok(_), None) => output::print_status(&s, &s.yellow("PARTIAL"), "static fetch only"),
        (Ok(_), Some(_)) => output::print_status(&s, &s.green("READY"), "static and rendered"),
    }
    Ok(())
}
