use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;

const DEFAULT_API_URL: &str = "http://localhost:8000/api";
const DEFAULT_STATE_DIR_NAME: &str = "docdesk";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_url: String,
    pub csrf_token: Option<String>,
    pub user_id: Option<String>,
    pub state_dir: PathBuf,
    pub timeout: Duration,
}

/// Printable view of [`Settings`]; the CSRF token is reported, never shown.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SettingsSnapshot {
    pub api_url: String,
    pub csrf_token_set: bool,
    pub user_id: Option<String>,
    pub state_dir: String,
    pub timeout_secs: u64,
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let home = dirs::home_dir().unwrap_or_else(std::env::temp_dir);
        let read = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let api_url = read("DOCDESK_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let state_dir = read("DOCDESK_STATE_DIR")
            .map(|value| expand_with_home(&value, &home))
            .unwrap_or_else(default_state_dir);
        let timeout_secs = read("DOCDESK_TIMEOUT_SECS")
            .and_then(|value| value.parse::<u64>().ok())
            .filter(|value| *value > 0)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Self {
            api_url,
            csrf_token: read("DOCDESK_CSRF_TOKEN"),
            user_id: read("DOCDESK_USER_ID"),
            state_dir,
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    pub fn snapshot(&self) -> SettingsSnapshot {
        SettingsSnapshot {
            api_url: self.api_url.clone(),
            csrf_token_set: self.csrf_token.is_some(),
            user_id: self.user_id.clone(),
            state_dir: self.state_dir.display().to_string(),
            timeout_secs: self.timeout.as_secs(),
        }
    }
}

fn default_state_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(DEFAULT_STATE_DIR_NAME)
}

fn expand_with_home(value: &str, home: &Path) -> PathBuf {
    if value == "~" {
        return home.to_path_buf();
    }
    if let Some(rest) = value.strip_prefix("~/") {
        return home.join(rest);
    }
    PathBuf::from(value)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn settings(pairs: &[(&str, &str)]) -> Settings {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        Settings::from_lookup(|name| env.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let settings = settings(&[]);
        assert_eq!(settings.api_url, DEFAULT_API_URL);
        assert_eq!(settings.csrf_token, None);
        assert_eq!(settings.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert!(settings.state_dir.ends_with(DEFAULT_STATE_DIR_NAME));
    }

    #[test]
    fn blank_and_invalid_values_fall_back() {
        let settings = settings(&[
            ("DOCDESK_CSRF_TOKEN", "  "),
            ("DOCDESK_TIMEOUT_SECS", "0"),
            ("DOCDESK_USER_ID", " u1 "),
        ]);
        assert_eq!(settings.csrf_token, None);
        assert_eq!(settings.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert_eq!(settings.user_id.as_deref(), Some("u1"));
    }

    #[test]
    fn state_dir_expands_home() {
        let home = Path::new("/home/kim");
        assert_eq!(expand_with_home("~", home), PathBuf::from("/home/kim"));
        assert_eq!(
            expand_with_home("~/state/docdesk", home),
            PathBuf::from("/home/kim/state/docdesk")
        );
        assert_eq!(expand_with_home("/srv/docdesk", home), PathBuf::from("/srv/docdesk"));
    }

    #[test]
    fn snapshot_hides_token() {
        let snapshot = settings(&[("DOCDESK_CSRF_TOKEN", "secret"), ("DOCDESK_TIMEOUT_SECS", "5")])
            .snapshot();
        assert!(snapshot.csrf_token_set);
        assert_eq!(snapshot.timeout_secs, 5);
        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(!json.contains("secret"));
    }
}
