//! Client configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the engine can run with zero
//! configuration in development and tests.

use handla_shared::constants::DEFAULT_INVITE_HOST;

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Host used when building shareable invite links.
    /// Env: `HANDLA_INVITE_HOST`
    /// Default: `handla.app`
    pub invite_host: String,

    /// Whether the session publishes the user's profile on open so other
    /// members can display their name and photo.
    /// Env: `HANDLA_PUBLISH_PROFILE` (true/false)
    /// Default: `true`
    pub publish_profile: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            invite_host: DEFAULT_INVITE_HOST.to_string(),
            publish_profile: true,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(host) = std::env::var("HANDLA_INVITE_HOST") {
            if host.trim().is_empty() {
                tracing::warn!("Empty HANDLA_INVITE_HOST, using default");
            } else {
                config.invite_host = host;
            }
        }

        if let Ok(val) = std::env::var("HANDLA_PUBLISH_PROFILE") {
            config.publish_profile = val != "false" && val != "0";
        }

        config
    }
}
