//! Configuration commands.
//!
//! - `config show`: Display current configuration
//! - `config set`: Set a configuration value

use owo_colors::OwoColorize;
use serde_json::json;

use super::CommandOutput;
use crate::config::{Config, TOKEN_ENV, URL_ENV};
use crate::error::{Result, TaskboardError};
use crate::types::ProjectId;

const SETTABLE_KEYS: &[&str] = &[
    "server_url",
    "token",
    "default_project",
    "request_timeout",
    "connect_timeout",
    "max_retries",
    "retry_base_delay_ms",
];

/// Mask a sensitive value by showing only the first 2 and last 2 characters
fn mask_sensitive_value(value: &str) -> String {
    let char_count = value.chars().count();
    if char_count > 4 {
        let first: String = value.chars().take(2).collect();
        let last: String = value.chars().skip(char_count - 2).collect();
        format!("{first}...{last}")
    } else {
        "****".to_string()
    }
}

/// Show current configuration
pub fn cmd_config_show(output_json: bool) -> Result<()> {
    let config = Config::load()?;
    let path = Config::config_path()?;
    let server_url = config.server_url()?;
    let token = config.credential();

    let json_output = json!({
        "server_url": server_url.as_str(),
        "auth": {
            "token_configured": token.is_some(),
        },
        "request_timeout": config.request_timeout,
        "connect_timeout": config.connect_timeout,
        "max_retries": config.max_retries,
        "retry_base_delay_ms": config.retry_base_delay_ms,
        "default_project": config.default_project,
        "config_file": path.to_string_lossy(),
    });

    let mut text = String::new();
    text.push_str(&format!("{}\n\n", "Configuration:".cyan().bold()));
    text.push_str(&format!("{}: {}\n", "server_url".cyan(), server_url));

    let token_status = match &token {
        Some(t) => mask_sensitive_value(t.expose()).green().to_string(),
        None => "not configured".dimmed().to_string(),
    };
    text.push_str(&format!("{}: {token_status}\n", "token".cyan()));

    let project = match config.default_project {
        Some(p) => p.to_string(),
        None => "not configured".dimmed().to_string(),
    };
    text.push_str(&format!("{}: {project}\n", "default_project".cyan()));
    text.push_str(&format!(
        "{}: {}s total, {}s connect\n",
        "timeouts".cyan(),
        config.request_timeout,
        config.connect_timeout
    ));
    text.push_str(&format!(
        "{}: {} (base delay {}ms)\n",
        "retries".cyan(),
        config.max_retries,
        config.retry_base_delay_ms
    ));

    text.push('\n');
    text.push_str(
        &format!(
            "Config file: {}\n{TOKEN_ENV} and {URL_ENV} override the file",
            path.display()
        )
        .dimmed()
        .to_string(),
    );

    CommandOutput::new(json_output)
        .with_text(text)
        .print(output_json)
}

/// Set a configuration value
pub fn cmd_config_set(key: &str, value: &str, output_json: bool) -> Result<()> {
    let mut config = Config::load()?;
    apply_setting(&mut config, key, value)?;
    config.save()?;

    let shown = if key == "token" {
        mask_sensitive_value(value)
    } else {
        value.to_string()
    };

    CommandOutput::new(json!({
        "action": "config_set",
        "key": key,
        "success": true,
    }))
    .with_text(format!("Set {} to {shown}", key.cyan()))
    .print(output_json)
}

fn apply_setting(config: &mut Config, key: &str, value: &str) -> Result<()> {
    let invalid = || TaskboardError::Config(format!("invalid value '{value}' for {key}"));

    match key {
        "server_url" => {
            url::Url::parse(value)?;
            config.server_url = value.to_string();
        }
        "token" => config.set_token(value.to_string()),
        "default_project" => {
            config.default_project = Some(ProjectId::new(value.parse().map_err(|_| invalid())?));
        }
        "request_timeout" => config.request_timeout = value.parse().map_err(|_| invalid())?,
        "connect_timeout" => config.connect_timeout = value.parse().map_err(|_| invalid())?,
        "max_retries" => config.max_retries = value.parse().map_err(|_| invalid())?,
        "retry_base_delay_ms" => {
            config.retry_base_delay_ms = value.parse().map_err(|_| invalid())?;
        }
        _ => {
            return Err(TaskboardError::Config(format!(
                "unknown config key '{key}'. Valid keys: {}",
                SETTABLE_KEYS.join(", ")
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_sensitive_value() {
        assert_eq!(mask_sensitive_value("abcdefgh"), "ab...gh");
        assert_eq!(mask_sensitive_value("abc"), "****");
    }

    #[test]
    fn test_apply_setting() {
        let mut config = Config::default();
        apply_setting(&mut config, "default_project", "12").unwrap();
        apply_setting(&mut config, "max_retries", "0").unwrap();
        apply_setting(&mut config, "server_url", "https://tracker.example.com").unwrap();
        assert_eq!(config.default_project, Some(ProjectId::new(12)));
        assert_eq!(config.max_retries, 0);
        assert_eq!(config.server_url, "https://tracker.example.com");
    }

    #[test]
    fn test_apply_setting_rejects_bad_input() {
        let mut config = Config::default();
        assert!(apply_setting(&mut config, "max_retries", "many").is_err());
        let bad_url = apply_setting(&mut config, "server_url", "not a url");
        assert!(bad_url.is_err());
        assert!(matches!(
            apply_setting(&mut config, "github.token", "x"),
            Err(TaskboardError::Config(m)) if m.contains("unknown config key")
        ));
    }
}
