//! Configuration loading and management
//!
//! Everything comes from environment variables and defaults; there is no
//! config file.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::popup::{DEFAULT_HEIGHT, DEFAULT_WIDTH};
use crate::state::DismissPolicy;
use crate::suggest::RandomSuggestions;

const ENV_SOCKET: &str = "LAYOUT_HINT_SOCKET";
const ENV_POPUP_WIDTH: &str = "LAYOUT_HINT_POPUP_WIDTH";
const ENV_POPUP_HEIGHT: &str = "LAYOUT_HINT_POPUP_HEIGHT";
const ENV_AUTO_CLOSE_MS: &str = "LAYOUT_HINT_AUTO_CLOSE_MS";
const ENV_SUGGESTIONS: &str = "LAYOUT_HINT_SUGGESTIONS";

const MAX_SUGGESTIONS: usize = 8;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the Unix domain socket for the control channel
    pub socket_path: PathBuf,

    /// Directory for runtime data
    pub data_dir: PathBuf,

    /// Popup title
    pub popup_title: String,

    /// Popup size in logical pixels
    pub popup_size: (u32, u32),

    /// How the popup is dismissed
    pub dismiss: DismissPolicy,

    /// Number of suggestions per popup
    pub suggestions: usize,
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let data_dir = dirs::runtime_dir()
            .or_else(dirs::data_local_dir)
            .context("no runtime or data directory for this user")?
            .join("layout-hint");

        let socket_path = lookup(ENV_SOCKET)
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("control.sock"));

        let width = parse_var(&lookup, ENV_POPUP_WIDTH)?.unwrap_or(DEFAULT_WIDTH);
        let height = parse_var(&lookup, ENV_POPUP_HEIGHT)?.unwrap_or(DEFAULT_HEIGHT);
        if width == 0 || height == 0 {
            bail!("popup size must be non-zero, got {}x{}", width, height);
        }

        let dismiss = match parse_var::<u64, _>(&lookup, ENV_AUTO_CLOSE_MS)? {
            Some(0) | None => DismissPolicy::OnModifierRelease,
            Some(delay_ms) => DismissPolicy::AfterDelay { delay_ms },
        };

        let suggestions =
            parse_var(&lookup, ENV_SUGGESTIONS)?.unwrap_or(RandomSuggestions::DEFAULT_COUNT);
        if !(1..=MAX_SUGGESTIONS).contains(&suggestions) {
            bail!(
                "{} must be between 1 and {}, got {}",
                ENV_SUGGESTIONS,
                MAX_SUGGESTIONS,
                suggestions
            );
        }

        Ok(Self {
            socket_path,
            data_dir,
            popup_title: "Layout suggestions".to_string(),
            popup_size: (width, height),
            dismiss,
            suggestions,
        })
    }

    /// Auto-close delay, if that mode is enabled
    pub fn auto_close(&self) -> Option<Duration> {
        match self.dismiss {
            DismissPolicy::AfterDelay { delay_ms } => Some(Duration::from_millis(delay_ms)),
            DismissPolicy::OnModifierRelease => None,
        }
    }

    /// Ensure data directory exists
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)
            .with_context(|| format!("failed to create {}", self.data_dir.display()))?;
        Ok(())
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .with_context(|| format!("invalid value for {}: {:?}", key, raw))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_config_defaults() {
        let config = load(&[]).unwrap();
        assert!(config.socket_path.to_string_lossy().contains("layout-hint"));
        assert_eq!(config.popup_size, (DEFAULT_WIDTH, DEFAULT_HEIGHT));
        assert_eq!(config.dismiss, DismissPolicy::OnModifierRelease);
        assert_eq!(config.auto_close(), None);
        assert_eq!(config.suggestions, 3);
    }

    #[test]
    fn test_config_overrides() {
        let config = load(&[
            (ENV_SOCKET, "/tmp/hint.sock"),
            (ENV_POPUP_WIDTH, "640"),
            (ENV_POPUP_HEIGHT, " 400 "),
            (ENV_AUTO_CLOSE_MS, "1500"),
            (ENV_SUGGESTIONS, "5"),
        ])
        .unwrap();

        assert_eq!(config.socket_path, PathBuf::from("/tmp/hint.sock"));
        assert_eq!(config.popup_size, (640, 400));
        assert_eq!(config.auto_close(), Some(Duration::from_millis(1500)));
        assert_eq!(config.suggestions, 5);
    }

    #[test]
    fn test_zero_auto_close_means_release_mode() {
        let config = load(&[(ENV_AUTO_CLOSE_MS, "0")]).unwrap();
        assert_eq!(config.dismiss, DismissPolicy::OnModifierRelease);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(load(&[(ENV_POPUP_WIDTH, "wide")]).is_err());
        assert!(load(&[(ENV_POPUP_HEIGHT, "0")]).is_err());
        assert!(load(&[(ENV_SUGGESTIONS, "0")]).is_err());
        assert!(load(&[(ENV_SUGGESTIONS, "99")]).is_err());
        assert!(load(&[(ENV_AUTO_CLOSE_MS, "-5")]).is_err());
    }
}
