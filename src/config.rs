use anyhow::{Context, Result};

use crate::template::Template;

pub const TOKEN_VAR: &str = "MAINTBOT_DISCORD_TOKEN";
pub const PREFIX_VAR: &str = "MAINTBOT_PREFIX";
pub const TEMPLATE_VAR: &str = "MAINTBOT_MESSAGE_TEMPLATE";
pub const SERVER_VAR: &str = "MAINTBOT_DISCORD_SERVER";
pub const DEBUG_VAR: &str = "MAINTBOT_DEBUG";

/// Runtime configuration, read from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// Discord bot token
    pub discord_token: String,
    /// Command prefix; without one the bot never answers. An empty prefix
    /// matches every message.
    pub prefix: Option<String>,
    /// Custom notice template source, if overridden
    pub message_template: Option<String>,
    /// Support server link substituted as `{DiscordServer}`
    pub discord_server: String,
}

impl Config {
    /// Read the process environment. Call [`load_dotenv`] first to pick up
    /// a `.env` file.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let discord_token = lookup(TOKEN_VAR)
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| anyhow::anyhow!("Missing `{}` environment variable", TOKEN_VAR))?;

        Ok(Self {
            discord_token,
            prefix: lookup(PREFIX_VAR),
            message_template: lookup(TEMPLATE_VAR),
            discord_server: lookup(SERVER_VAR).unwrap_or_default(),
        })
    }

    /// Compile the configured template, or the built-in one.
    pub fn template(&self) -> Result<Template> {
        match &self.message_template {
            Some(source) => Template::compile(source).with_context(|| {
                format!("Unable to parse template from `{}`", TEMPLATE_VAR)
            }),
            None => Ok(Template::default_message()),
        }
    }
}

/// Whether verbose logging was requested. Read on its own, before
/// [`Config::from_env`], so logging is up before anything else is reported.
pub fn debug_requested() -> bool {
    std::env::var_os(DEBUG_VAR).is_some()
}

/// Load `./.env` when it exists. A present but unreadable file is an error.
/// Variables already set in the environment take precedence.
pub fn load_dotenv() -> Result<()> {
    match dotenvy::dotenv() {
        Ok(_) => Ok(()),
        Err(e) if e.not_found() => Ok(()),
        Err(e) => Err(e).context("Failed to load .env file"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_token_required() {
        let err = Config::from_lookup(lookup_from(&[(PREFIX_VAR, "!")])).unwrap_err();
        assert!(err.to_string().contains(TOKEN_VAR));
    }

    #[test]
    fn test_blank_token_rejected() {
        assert!(Config::from_lookup(lookup_from(&[(TOKEN_VAR, "  ")])).is_err());
    }

    #[test]
    fn test_optional_values_default() {
        let config = Config::from_lookup(lookup_from(&[(TOKEN_VAR, "abc")])).unwrap();
        assert_eq!(config.discord_token, "abc");
        assert_eq!(config.prefix, None);
        assert_eq!(config.message_template, None);
        assert_eq!(config.discord_server, "");
    }

    #[test]
    fn test_all_values_read() {
        let config = Config::from_lookup(lookup_from(&[
            (TOKEN_VAR, "abc"),
            (PREFIX_VAR, "!"),
            (TEMPLATE_VAR, "{Bot} is down"),
            (SERVER_VAR, "https://discord.gg/xyz"),
        ]))
        .unwrap();
        assert_eq!(config.prefix.as_deref(), Some("!"));
        assert_eq!(config.message_template.as_deref(), Some("{Bot} is down"));
        assert_eq!(config.discord_server, "https://discord.gg/xyz");
    }

    #[test]
    fn test_empty_prefix_is_kept() {
        let config =
            Config::from_lookup(lookup_from(&[(TOKEN_VAR, "abc"), (PREFIX_VAR, "")])).unwrap();
        assert_eq!(config.prefix.as_deref(), Some(""));
    }

    #[test]
    fn test_custom_template_compiled() {
        let config = Config::from_lookup(lookup_from(&[
            (TOKEN_VAR, "abc"),
            (TEMPLATE_VAR, "{Bot} is down"),
        ]))
        .unwrap();
        assert!(config.template().is_ok());
    }

    #[test]
    fn test_malformed_template_is_error() {
        let config = Config::from_lookup(lookup_from(&[
            (TOKEN_VAR, "abc"),
            (TEMPLATE_VAR, "{Owner} is down"),
        ]))
        .unwrap();
        let err = config.template().unwrap_err();
        assert!(format!("{:#}", err).contains("unknown placeholder"));
    }
}
