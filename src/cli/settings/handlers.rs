use reqwest::Url;

use crate::cli::settings::error::SettingError;
use crate::cli::settings::SettingHandler;
use crate::core::config::Config;
use crate::utils::url::normalize_base_url;

fn success_set(key: &str, value: &str) -> String {
    format!("✅ Set {key} to: {value}")
}

fn success_unset(key: &str) -> String {
    format!("✅ Unset {key}")
}

/// Handler for the `base-url` setting.
pub struct BaseUrlHandler;

impl SettingHandler for BaseUrlHandler {
    fn key(&self) -> &'static str {
        "base-url"
    }

    fn set(&self, args: &[String], config: &mut Config) -> Result<String, SettingError> {
        let Some(raw) = args.first() else {
            return Err(SettingError::MissingArgs {
                hint: "To set the server URL, specify it:",
                example: "logchat set base-url http://chatbot.internal:8000",
            });
        };

        let url = normalize_base_url(raw);
        let valid = Url::parse(&url)
            .map(|parsed| matches!(parsed.scheme(), "http" | "https"))
            .unwrap_or(false);
        if !valid {
            return Err(SettingError::InvalidValue {
                key: "base-url",
                input: raw.clone(),
                hint: "Use an http:// or https:// URL",
            });
        }

        let message = success_set("base-url", &url);
        config.base_url = Some(url);
        Ok(message)
    }

    fn unset(&self, config: &mut Config) -> Result<String, SettingError> {
        config.base_url = None;
        Ok(success_unset("base-url"))
    }
}

/// Handler for the `request-timeout` setting, in whole seconds.
pub struct RequestTimeoutHandler;

impl SettingHandler for RequestTimeoutHandler {
    fn key(&self) -> &'static str {
        "request-timeout"
    }

    fn set(&self, args: &[String], config: &mut Config) -> Result<String, SettingError> {
        let Some(raw) = args.first() else {
            return Err(SettingError::MissingArgs {
                hint: "To set a request timeout, specify the number of seconds:",
                example: "logchat set request-timeout 60",
            });
        };

        let secs = raw
            .trim()
            .trim_end_matches('s')
            .parse::<u64>()
            .ok()
            .filter(|secs| *secs > 0)
            .ok_or_else(|| SettingError::InvalidValue {
                key: "request-timeout",
                input: raw.clone(),
                hint: "Use a positive number of seconds, e.g. 60",
            })?;

        config.request_timeout_secs = Some(secs);
        Ok(success_set("request-timeout", &format!("{secs}s")))
    }

    fn unset(&self, config: &mut Config) -> Result<String, SettingError> {
        config.request_timeout_secs = None;
        Ok(success_unset("request-timeout"))
    }
}
