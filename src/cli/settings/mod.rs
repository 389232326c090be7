//! Settings management for CLI set/unset commands.
//!
//! Each configuration key has a [`SettingHandler`] that validates input and
//! applies it to a [`Config`]. The caller loads and saves the file.

pub mod error;
pub mod handlers;

use std::collections::HashMap;
use std::error::Error;

pub use error::SettingError;

use crate::core::config::Config;
use handlers::{BaseUrlHandler, RequestTimeoutHandler};

/// Trait for handling a configuration setting.
pub trait SettingHandler: Send + Sync {
    /// Returns the configuration key this handler manages.
    fn key(&self) -> &'static str;

    /// Applies `args` to `config` and returns a success message.
    fn set(&self, args: &[String], config: &mut Config) -> Result<String, SettingError>;

    /// Clears the value and returns a success message.
    fn unset(&self, config: &mut Config) -> Result<String, SettingError>;
}

/// Registry of all available setting handlers.
pub struct SettingRegistry {
    handlers: HashMap<&'static str, Box<dyn SettingHandler>>,
}

impl SettingRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            handlers: HashMap::new(),
        };
        registry.register(Box::new(BaseUrlHandler));
        registry.register(Box::new(RequestTimeoutHandler));
        registry
    }

    fn register(&mut self, handler: Box<dyn SettingHandler>) {
        self.handlers.insert(handler.key(), handler);
    }

    pub fn get(&self, key: &str) -> Result<&dyn SettingHandler, SettingError> {
        self.handlers
            .get(key)
            .map(|h| h.as_ref())
            .ok_or_else(|| SettingError::UnknownKey(key.to_string()))
    }
}

impl Default for SettingRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn exit_with(err: SettingError) -> ! {
    err.print();
    std::process::exit(1);
}

pub fn run_set(key: &str, value: &[String]) -> Result<(), Box<dyn Error>> {
    let mut config = Config::load()?;
    if value.is_empty() {
        config.print_all();
        return Ok(());
    }

    let registry = SettingRegistry::new();
    let handler = registry.get(key).unwrap_or_else(|err| exit_with(err));
    let message = handler
        .set(value, &mut config)
        .unwrap_or_else(|err| exit_with(err));
    config.save()?;
    println!("{message}");
    Ok(())
}

pub fn run_unset(key: &str) -> Result<(), Box<dyn Error>> {
    let mut config = Config::load()?;
    let registry = SettingRegistry::new();
    let handler = registry.get(key).unwrap_or_else(|err| exit_with(err));
    let message = handler
        .unset(&mut config)
        .unwrap_or_else(|err| exit_with(err));
    config.save()?;
    println!("{message}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn base_url_is_normalized_and_validated() {
        let registry = SettingRegistry::new();
        let handler = registry.get("base-url").unwrap();
        let mut config = Config::default();

        let message = handler
            .set(&args(&["http://chatbot.internal:8000/"]), &mut config)
            .unwrap();
        assert_eq!(config.base_url.as_deref(), Some("http://chatbot.internal:8000"));
        assert_eq!(message, "✅ Set base-url to: http://chatbot.internal:8000");

        let err = handler.set(&args(&["ftp://nope"]), &mut config).unwrap_err();
        assert!(matches!(err, SettingError::InvalidValue { key: "base-url", .. }));
        assert_eq!(config.base_url.as_deref(), Some("http://chatbot.internal:8000"));

        handler.unset(&mut config).unwrap();
        assert_eq!(config.base_url, None);
    }

    #[test]
    fn request_timeout_accepts_seconds_only() {
        let registry = SettingRegistry::new();
        let handler = registry.get("request-timeout").unwrap();
        let mut config = Config::default();

        handler.set(&args(&["45s"]), &mut config).unwrap();
        assert_eq!(config.request_timeout_secs, Some(45));

        assert!(handler.set(&args(&["0"]), &mut config).is_err());
        assert!(handler.set(&args(&["soon"]), &mut config).is_err());
        assert!(matches!(
            handler.set(&[], &mut config),
            Err(SettingError::MissingArgs { .. })
        ));
        assert_eq!(config.request_timeout_secs, Some(45));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let registry = SettingRegistry::new();
        assert_eq!(
            registry.get("theme").err(),
            Some(SettingError::UnknownKey("theme".into()))
        );
    }
}
