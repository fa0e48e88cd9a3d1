use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

const SIDEBAR_FILE: &str = "sidebar.json";

#[derive(Debug, Error)]
pub enum ContextError {
    #[error("state io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("state encoding error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

impl User {
    /// A user known only by id, as the CLI gets it from the environment.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: String::new(),
            username: None,
            first_name: None,
            last_name: None,
        }
    }

    pub fn display_name(&self) -> String {
        match (self.first_name.as_deref(), self.last_name.as_deref()) {
            (Some(first), Some(last)) => format!("{first} {last}"),
            (Some(first), None) => first.to_string(),
            _ => self
                .username
                .clone()
                .filter(|name| !name.is_empty())
                .or_else(|| Some(self.email.clone()).filter(|email| !email.is_empty()))
                .unwrap_or_else(|| self.id.clone()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthState {
    user: Option<User>,
    is_loading: bool,
}

impl AuthState {
    pub fn set_user(&mut self, user: Option<User>) {
        self.user = user;
        self.is_loading = false;
    }

    pub fn set_loading(&mut self, is_loading: bool) {
        self.is_loading = is_loading;
    }

    pub fn clear(&mut self) {
        self.set_user(None);
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// Parent scope for the project list.
    pub fn user_id(&self) -> Option<&str> {
        self.user.as_ref().map(|user| user.id.as_str())
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
pub struct SidebarState {
    pub collapsed: bool,
}

impl Default for SidebarState {
    fn default() -> Self {
        Self { collapsed: true }
    }
}

impl SidebarState {
    pub fn toggle(&mut self) {
        self.collapsed = !self.collapsed;
    }

    pub fn set_collapsed(&mut self, collapsed: bool) {
        self.collapsed = collapsed;
    }

    /// Missing or unreadable state falls back to the default.
    pub fn load(path: &Path) -> Self {
        std::fs::read(path)
            .ok()
            .and_then(|raw| serde_json::from_slice(&raw).ok())
            .unwrap_or_default()
    }

    pub fn save(&self, path: &Path) -> Result<(), ContextError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_vec_pretty(self)?)?;
        Ok(())
    }
}

/// Process-wide UI state, created once at start and passed explicitly.
#[derive(Debug, Clone)]
pub struct AppContext {
    pub auth: AuthState,
    sidebar: SidebarState,
    state_dir: PathBuf,
}

impl AppContext {
    pub fn load(state_dir: impl Into<PathBuf>) -> Self {
        let state_dir = state_dir.into();
        let sidebar = SidebarState::load(&state_dir.join(SIDEBAR_FILE));
        Self {
            auth: AuthState::default(),
            sidebar,
            state_dir,
        }
    }

    pub fn sidebar(&self) -> SidebarState {
        self.sidebar
    }

    pub fn toggle_sidebar(&mut self) -> Result<SidebarState, ContextError> {
        self.sidebar.toggle();
        self.persist_sidebar()?;
        Ok(self.sidebar)
    }

    pub fn set_sidebar_collapsed(&mut self, collapsed: bool) -> Result<(), ContextError> {
        self.sidebar.set_collapsed(collapsed);
        self.persist_sidebar()
    }

    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    fn persist_sidebar(&self) -> Result<(), ContextError> {
        self.sidebar.save(&self.state_dir.join(SIDEBAR_FILE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn user() -> User {
        User {
            id: "u1".into(),
            email: "kim@example.com".into(),
            username: Some("kim".into()),
            first_name: None,
            last_name: None,
        }
    }

    #[test]
    fn auth_state_tracks_user_and_loading() {
        let mut auth = AuthState::default();
        auth.set_loading(true);
        assert!(auth.is_loading());
        assert!(!auth.is_authenticated());

        auth.set_user(Some(user()));
        assert!(!auth.is_loading());
        assert_eq!(auth.user_id(), Some("u1"));
        assert_eq!(auth.user().map(User::display_name).as_deref(), Some("kim"));

        auth.clear();
        assert!(!auth.is_authenticated());
    }

    #[test]
    fn sidebar_defaults_to_collapsed() {
        let dir = tempdir().unwrap();
        let context = AppContext::load(dir.path());
        assert!(context.sidebar().collapsed);
    }

    #[test]
    fn sidebar_toggle_persists_across_loads() {
        let dir = tempdir().unwrap();
        let mut context = AppContext::load(dir.path().join("nested"));
        let state = context.toggle_sidebar().unwrap();
        assert!(!state.collapsed);

        let reloaded = AppContext::load(dir.path().join("nested"));
        assert!(!reloaded.sidebar().collapsed);
    }

    #[test]
    fn corrupt_sidebar_file_falls_back_to_default() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(SIDEBAR_FILE), b"{not json").unwrap();
        assert_eq!(SidebarState::load(&dir.path().join(SIDEBAR_FILE)), SidebarState::default());
    }
}
