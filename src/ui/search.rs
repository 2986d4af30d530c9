use crate::api::models::SearchItem;
use crate::api::{ApiRequest, Transport};
use crate::error::Result;
use crate::ui::Route;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

pub const SEARCH_PATH: &str = "/api/search/";
pub const SEARCH_ALL_PATH: &str = "/api/search/all/";
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchUpdate {
    Results(Vec<SearchItem>),
    NoResults,
    Hidden,
    Navigate(Route),
}

pub trait SearchView: Send {
    fn render(&mut self, update: SearchUpdate);
}

struct Shared {
    transport: Arc<dyn Transport>,
    catalog: Mutex<Option<Vec<SearchItem>>>,
    view: Mutex<Box<dyn SearchView>>,
}

impl Shared {
    async fn render(&self, update: SearchUpdate) {
        self.view.lock().await.render(update);
    }

    async fn search(&self, query: &str) -> Result<()> {
        let local = {
            let catalog = self.catalog.lock().await;
            catalog.as_ref().map(|items| filter_by_title(items, query))
        };
        let results = match local {
            Some(results) => results,
            None => {
                let path = format!("{}?q={}", SEARCH_PATH, urlencoding::encode(query));
                let resp = self.transport.execute(ApiRequest::get(path)).await?.ok()?;
                resp.json()?
            }
        };
        if results.is_empty() {
            self.render(SearchUpdate::NoResults).await;
        } else {
            self.render(SearchUpdate::Results(results)).await;
        }
        Ok(())
    }
}

/// Case-insensitive substring match on the title.
pub fn filter_by_title(items: &[SearchItem], query: &str) -> Vec<SearchItem> {
    let needle = query.to_lowercase();
    items
        .iter()
        .filter(|item| item.title.to_lowercase().contains(&needle))
        .cloned()
        .collect()
}

/// Search-as-you-type box. Queries go to the server until the full catalog
/// has been fetched once (on first focus); afterwards they are answered
/// locally. The catalog is never refreshed.
pub struct LiveSearch {
    shared: Arc<Shared>,
    debounce: Duration,
    pending: Option<JoinHandle<()>>,
}

impl LiveSearch {
    pub fn new(transport: Arc<dyn Transport>, view: Box<dyn SearchView>) -> Self {
        Self {
            shared: Arc::new(Shared {
                transport,
                catalog: Mutex::new(None),
                view: Mutex::new(view),
            }),
            debounce: DEFAULT_DEBOUNCE,
            pending: None,
        }
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub async fn is_catalog_loaded(&self) -> bool {
        self.shared.catalog.lock().await.is_some()
    }

    /// Loads the full catalog the first time the box gains focus.
    pub async fn focus(&self) {
        if self.is_catalog_loaded().await {
            return;
        }
        match self.fetch_catalog().await {
            Ok(items) => {
                log::debug!("search catalog loaded with {} items", items.len());
                *self.shared.catalog.lock().await = Some(items);
            }
            Err(e) => log::warn!("failed to load search catalog: {}", e),
        }
    }

    async fn fetch_catalog(&self) -> Result<Vec<SearchItem>> {
        let resp = self
            .shared
            .transport
            .execute(ApiRequest::get(SEARCH_ALL_PATH))
            .await?;
        resp.ok()?.json()
    }

    /// Schedules a search for `query` after the debounce delay, replacing
    /// any search still waiting on its timer. Searches already sent to the
    /// server are not cancelled and may finish out of order.
    ///
    /// Spawns onto the current Tokio runtime and panics when called
    /// outside one.
    pub fn input(&mut self, query: &str) {
        if let Some(timer) = self.pending.take() {
            timer.abort();
        }
        let query = query.trim().to_string();
        let shared = self.shared.clone();
        let delay = self.debounce;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if query.is_empty() {
                shared.render(SearchUpdate::Hidden).await;
                return;
            }
            // Detached so a later keystroke cannot cancel it mid-flight.
            tokio::spawn(async move {
                if let Err(e) = shared.search(&query).await {
                    log::warn!("search for {:?} failed: {}", query, e);
                }
            });
        }));
    }

    /// Runs a search immediately, bypassing the debounce.
    pub async fn search_now(&self, query: &str) -> Result<()> {
        let query = query.trim();
        if query.is_empty() {
            self.shared.render(SearchUpdate::Hidden).await;
            return Ok(());
        }
        self.shared.search(query).await
    }

    /// Escape key or a click outside the dropdown.
    pub async fn dismiss(&self) {
        self.shared.render(SearchUpdate::Hidden).await;
    }

    pub async fn select(&self, item: &SearchItem) {
        self.shared
            .render(SearchUpdate::Navigate(Route::Page(item.url.clone())))
            .await;
    }
}

impl Drop for LiveSearch {
    fn drop(&mut self) {
        if let Some(timer) = self.pending.take() {
            timer.abort();
        }
    }
}
