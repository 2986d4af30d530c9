use crate::api::models::{ListingItem, ListingReply};
use crate::api::{ApiRequest, Transport};
use crate::error::Result;
use crate::ui::DEFAULT_AVATAR;
use std::sync::Arc;
use url::form_urlencoded;

pub const DEFAULT_ANNOUNCEMENT_IMAGE: &str = "/static/images/default-announcement.png";

const SEARCH_PARAM: &str = "search";
const TAGS_PARAM: &str = "tags";
const DATE_PARAM: &str = "date_filter";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateRange {
    Today,
    Week,
    Month,
}

impl DateRange {
    /// Anything outside the three known values is dropped.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "today" => Some(Self::Today),
            "week" => Some(Self::Week),
            "month" => Some(Self::Month),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Today => "today",
            Self::Week => "week",
            Self::Month => "month",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingKind {
    Announcements,
    Guides,
}

impl ListingKind {
    /// Listing pages only; detail pages such as `/guides/12/` and every
    /// other page yield `None`.
    pub fn from_path(path: &str) -> Option<Self> {
        if is_listing(path, "/announcements") {
            Some(Self::Announcements)
        } else if is_listing(path, "/guides") {
            Some(Self::Guides)
        } else {
            None
        }
    }

    pub fn api_path(self) -> &'static str {
        match self {
            Self::Announcements => "/api/announcements/filter/",
            Self::Guides => "/api/guides/filter/",
        }
    }

    fn item_href(self, id: i64) -> String {
        match self {
            Self::Announcements => format!("/announcements/{}/", id),
            Self::Guides => format!("/guides/{}/", id),
        }
    }

    fn default_image(self) -> &'static str {
        match self {
            Self::Announcements => DEFAULT_ANNOUNCEMENT_IMAGE,
            Self::Guides => DEFAULT_AVATAR,
        }
    }
}

fn is_listing(path: &str, segment: &str) -> bool {
    if !path.contains(segment) {
        return false;
    }
    !path.match_indices(segment).any(|(at, _)| {
        path[at + segment.len()..]
            .strip_prefix('/')
            .is_some_and(|rest| rest.starts_with(|c: char| c.is_ascii_digit()))
    })
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    pub search: String,
    pub tags: String,
    pub date: Option<DateRange>,
}

impl FilterState {
    pub fn from_query(query: &str) -> Self {
        let mut state = Self::default();
        for (key, value) in form_urlencoded::parse(query.trim_start_matches('?').as_bytes()) {
            match key.as_ref() {
                SEARCH_PARAM => state.search = value.trim().to_string(),
                TAGS_PARAM => state.tags = value.trim().to_string(),
                DATE_PARAM => state.date = DateRange::parse(&value),
                _ => {}
            }
        }
        state
    }

    /// Whether a query string names any filter parameter, valid or not.
    pub fn is_present_in(query: &str) -> bool {
        form_urlencoded::parse(query.trim_start_matches('?').as_bytes())
            .any(|(key, _)| matches!(key.as_ref(), SEARCH_PARAM | TAGS_PARAM | DATE_PARAM))
    }

    pub fn to_query(&self) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());
        let search = self.search.trim();
        if !search.is_empty() {
            query.append_pair(SEARCH_PARAM, search);
        }
        let tags = self.tags.trim();
        if !tags.is_empty() {
            query.append_pair(TAGS_PARAM, tags);
        }
        if let Some(date) = self.date {
            query.append_pair(DATE_PARAM, date.as_str());
        }
        query.finish()
    }
}

/// A rendered result card.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingCard {
    pub href: String,
    pub image: String,
    pub title: String,
    pub author: String,
    /// Guides only.
    pub rating: Option<String>,
}

impl ListingCard {
    pub fn from_item(kind: ListingKind, item: &ListingItem) -> Self {
        let image = item
            .image
            .clone()
            .filter(|i| !i.is_empty())
            .unwrap_or_else(|| kind.default_image().to_string());
        let author = match kind {
            ListingKind::Guides => item.author_name.clone().or_else(|| item.author.clone()),
            ListingKind::Announcements => item.author.clone(),
        }
        .filter(|a| !a.is_empty())
        .unwrap_or_else(|| "Unknown author".to_string());
        let rating = match kind {
            ListingKind::Guides => Some(format!("{}★", item.rating.unwrap_or(0.0))),
            ListingKind::Announcements => None,
        };
        Self {
            href: kind.item_href(item.id),
            image,
            title: item
                .title
                .clone()
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| "Untitled".to_string()),
            author,
            rating,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterUpdate {
    /// New `path?query` for the address bar.
    Location(String),
    DateSelected(Option<DateRange>),
    Loading,
    Results(Vec<ListingCard>),
    Empty,
    Error(String),
}

pub trait FilterView {
    fn render(&mut self, update: FilterUpdate);
}

/// Filter form of the announcements and guides listing pages.
pub struct ListFilter<V: FilterView> {
    transport: Arc<dyn Transport>,
    view: V,
    kind: ListingKind,
    page_path: String,
    state: FilterState,
    restore: bool,
}

impl<V: FilterView> ListFilter<V> {
    /// Returns `None` on pages without a filterable listing.
    pub fn from_location(
        transport: Arc<dyn Transport>,
        view: V,
        path: &str,
        query: &str,
    ) -> Option<Self> {
        let Some(kind) = ListingKind::from_path(path) else {
            log::debug!("no filterable listing on {}", path);
            return None;
        };
        Some(Self {
            transport,
            view,
            kind,
            page_path: path.to_string(),
            state: FilterState::from_query(query),
            restore: FilterState::is_present_in(query),
        })
    }

    pub fn kind(&self) -> ListingKind {
        self.kind
    }

    pub fn state(&self) -> &FilterState {
        &self.state
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn set_search(&mut self, search: &str) {
        self.state.search = search.to_string();
    }

    pub fn set_tags(&mut self, tags: &str) {
        self.state.tags = tags.to_string();
    }

    /// Takes effect on the next [`apply`](Self::apply).
    pub fn select_date(&mut self, value: &str) {
        self.state.date = DateRange::parse(value);
        self.view.render(FilterUpdate::DateSelected(self.state.date));
    }

    pub fn location(&self) -> String {
        let query = self.state.to_query();
        if query.is_empty() {
            self.page_path.clone()
        } else {
            format!("{}?{}", self.page_path, query)
        }
    }

    /// Re-applies a filter carried in the page URL on load.
    pub async fn restore(&mut self) -> Result<()> {
        if !self.restore {
            return Ok(());
        }
        self.restore = false;
        self.view.render(FilterUpdate::DateSelected(self.state.date));
        self.apply().await
    }

    pub async fn apply(&mut self) -> Result<()> {
        self.view.render(FilterUpdate::Location(self.location()));
        self.view.render(FilterUpdate::Loading);
        match self.fetch().await {
            Ok(items) if items.is_empty() => {
                self.view.render(FilterUpdate::Empty);
                Ok(())
            }
            Ok(items) => {
                let cards = items
                    .iter()
                    .map(|item| ListingCard::from_item(self.kind, item))
                    .collect();
                self.view.render(FilterUpdate::Results(cards));
                Ok(())
            }
            Err(e) => {
                log::error!("filtering {:?} failed: {}", self.kind, e);
                self.view.render(FilterUpdate::Error(format!(
                    "Failed to load data: {}",
                    e.user_message()
                )));
                Err(e)
            }
        }
    }

    async fn fetch(&self) -> Result<Vec<ListingItem>> {
        let query = self.state.to_query();
        let path = if query.is_empty() {
            self.kind.api_path().to_string()
        } else {
            format!("{}?{}", self.kind.api_path(), query)
        };
        let reply: ListingReply = self
            .transport
            .execute(ApiRequest::get(path))
            .await?
            .ok()?
            .json()?;
        Ok(reply.results)
    }
}
