use crate::error::Result;
use crate::storage::KeyValueStore;
use std::sync::Arc;
use std::time::Duration;

const THEME_KEY: &str = "theme";

pub const DEFAULT_REAPPLY_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "light" => Some(Self::Light),
            "dark" => Some(Self::Dark),
            _ => None,
        }
    }

    /// Value of the document-level `data-theme` attribute.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    pub fn toggle(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }

    /// Toggle button icon: offers the opposite theme.
    pub fn icon(self) -> &'static str {
        match self {
            Self::Light => "🌙",
            Self::Dark => "☀️",
        }
    }

    pub fn toggle_title(self) -> &'static str {
        match self {
            Self::Light => "Switch to dark theme",
            Self::Dark => "Switch to light theme",
        }
    }
}

pub trait ThemeView {
    /// Sets the document attribute and refreshes the toggle button.
    fn apply(&mut self, theme: Theme);
}

pub struct ThemeSwitch<V: ThemeView> {
    store: Arc<dyn KeyValueStore>,
    view: V,
    current: Theme,
    reapply_delay: Duration,
}

impl<V: ThemeView> ThemeSwitch<V> {
    pub fn new(store: Arc<dyn KeyValueStore>, view: V) -> Self {
        Self {
            store,
            view,
            current: Theme::default(),
            reapply_delay: DEFAULT_REAPPLY_DELAY,
        }
    }

    pub fn with_reapply_delay(mut self, delay: Duration) -> Self {
        self.reapply_delay = delay;
        self
    }

    pub fn current(&self) -> Theme {
        self.current
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    /// Applies the saved theme, `light` when none is saved.
    pub fn load(&mut self) -> Theme {
        self.current = match self.store.get(THEME_KEY) {
            Ok(Some(saved)) => Theme::parse(&saved).unwrap_or_default(),
            Ok(None) => Theme::default(),
            Err(e) => {
                log::warn!("failed to read saved theme: {}", e);
                Theme::default()
            }
        };
        self.view.apply(self.current);
        self.current
    }

    /// Second pass for widgets built after the first [`load`](Self::load).
    pub async fn reapply(&mut self) -> Theme {
        tokio::time::sleep(self.reapply_delay).await;
        self.load()
    }

    pub fn toggle(&mut self) -> Result<Theme> {
        self.set(self.current.toggle())
    }

    pub fn set(&mut self, theme: Theme) -> Result<Theme> {
        self.current = theme;
        self.view.apply(theme);
        self.store.set(THEME_KEY, theme.as_str())?;
        log::info!("theme switched to {}", theme.as_str());
        Ok(theme)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[derive(Default)]
    struct Document {
        applied: Vec<Theme>,
    }

    impl ThemeView for Document {
        fn apply(&mut self, theme: Theme) {
            self.applied.push(theme);
        }
    }

    #[test]
    fn unknown_saved_value_falls_back_to_light() {
        let store = Arc::new(MemoryStore::new());
        store.set(THEME_KEY, "sepia").unwrap();
        let mut switch = ThemeSwitch::new(store, Document::default());
        assert_eq!(switch.load(), Theme::Light);
        assert_eq!(switch.view().applied, vec![Theme::Light]);
    }

    #[tokio::test(start_paused = true)]
    async fn reapply_waits_for_configured_delay() {
        let store = Arc::new(MemoryStore::new());
        store.set(THEME_KEY, "dark").unwrap();
        let mut switch = ThemeSwitch::new(store, Document::default())
            .with_reapply_delay(Duration::from_millis(250));
        switch.load();

        let started = tokio::time::Instant::now();
        assert_eq!(switch.reapply().await, Theme::Dark);
        let waited = started.elapsed();
        assert!(waited >= Duration::from_millis(250), "waited {:?}", waited);
        assert!(waited < DEFAULT_REAPPLY_DELAY * 3, "waited {:?}", waited);
        assert_eq!(switch.view().applied, vec![Theme::Dark, Theme::Dark]);
    }

    #[test]
    fn icon_offers_opposite_theme() {
        assert_eq!(Theme::Dark.icon(), "☀️");
        assert_eq!(Theme::Light.toggle(), Theme::Dark);
    }
}
