use crate::api::{HttpTransport, Session, Transport};
use crate::credentials::CredentialStore;
use crate::error::{Error, Result};
use crate::storage::{self, KeyValueStore, SqliteStore};
use crate::ui::chat::{ChatSession, ChatView, DEFAULT_MAX_IMAGE_BYTES};
use crate::ui::favorites::{FavoriteKind, FavoriteToggle, FavoriteView};
use crate::ui::filter::{FilterView, ListFilter};
use crate::ui::search::{LiveSearch, SearchView, DEFAULT_DEBOUNCE};
use crate::ui::theme::{ThemeSwitch, ThemeView, DEFAULT_REAPPLY_DELAY};
use crate::ui::Route;
use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub base_url: String,
    pub store_path: Option<PathBuf>,
    pub search_debounce_ms: u64,
    pub max_image_bytes: u64,
    pub theme_reapply_delay_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            store_path: None,
            search_debounce_ms: DEFAULT_DEBOUNCE.as_millis() as u64,
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
            theme_reapply_delay_ms: DEFAULT_REAPPLY_DELAY.as_millis() as u64,
        }
    }
}

impl AppConfig {
    pub fn default_path() -> Option<PathBuf> {
        let base = BaseDirs::new()?;
        Some(base.config_dir().join("skillissue.toml"))
    }

    /// Reads the config file, falling back to defaults when it is missing
    /// or unreadable.
    pub fn load() -> Self {
        match Self::default_path() {
            Some(path) => Self::load_from(&path).unwrap_or_else(|e| {
                log::debug!("using default config ({}): {}", path.display(), e);
                Self::default()
            }),
            None => Self::default(),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let mut config: AppConfig = toml::from_str(&text)?;
        config.base_url = crate::utils::normalize_url(&config.base_url);
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::default_path()
            .ok_or_else(|| Error::Config("no config directory".to_string()))?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }

    pub fn theme_reapply_delay(&self) -> Duration {
        Duration::from_millis(self.theme_reapply_delay_ms)
    }
}

/// Wires one transport, one store and one [`Session`], and builds the
/// page controllers on top of them.
pub struct App {
    config: AppConfig,
    transport: Arc<dyn Transport>,
    store: Arc<dyn KeyValueStore>,
    session: Arc<Session>,
}

impl App {
    pub fn from_config(config: AppConfig) -> Result<Self> {
        let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(&config.base_url)?);
        let store_path = config
            .store_path
            .clone()
            .or_else(storage::default_path)
            .ok_or_else(|| Error::Config("no data directory for the store".to_string()))?;
        let store: Arc<dyn KeyValueStore> = Arc::new(SqliteStore::open(store_path)?);
        Ok(Self::with_parts(config, transport, store))
    }

    pub fn with_parts(
        config: AppConfig,
        transport: Arc<dyn Transport>,
        store: Arc<dyn KeyValueStore>,
    ) -> Self {
        let credentials = CredentialStore::new(store.clone());
        let session = Arc::new(Session::new(transport.clone(), credentials));
        Self {
            config,
            transport,
            store,
            session,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Sign-in page for visitors without a stored access token.
    pub fn start_route(&self) -> Route {
        if self.session.is_authenticated() {
            Route::Home
        } else {
            Route::SignIn
        }
    }

    pub fn chat<V: ChatView>(&self, view: V) -> ChatSession<V> {
        ChatSession::new(self.session.clone(), view).with_image_limit(self.config.max_image_bytes)
    }

    pub fn favorite<V: FavoriteView>(
        &self,
        view: V,
        kind: FavoriteKind,
        item_id: i64,
        csrf_token: Option<String>,
    ) -> FavoriteToggle<V> {
        FavoriteToggle::new(self.transport.clone(), view, kind, item_id, csrf_token)
    }

    pub fn search(&self, view: Box<dyn SearchView>) -> LiveSearch {
        LiveSearch::new(self.transport.clone(), view).with_debounce(self.config.search_debounce())
    }

    pub fn filter<V: FilterView>(&self, view: V, path: &str, query: &str) -> Option<ListFilter<V>> {
        ListFilter::from_location(self.transport.clone(), view, path, query)
    }

    pub fn theme<V: ThemeView>(&self, view: V) -> ThemeSwitch<V> {
        ThemeSwitch::new(self.store.clone(), view)
            .with_reapply_delay(self.config.theme_reapply_delay())
    }
}
