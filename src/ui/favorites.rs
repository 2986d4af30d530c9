use crate::api::models::FavoriteReply;
use crate::api::{ApiRequest, Transport};
use crate::error::{Error, Result};
use serde_json::{Map, Value};
use std::sync::Arc;

pub const ACTIVE_LABEL: &str = "★ In favorites";
pub const INACTIVE_LABEL: &str = "☆ Add to favorites";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FavoriteKind {
    Announcement,
    Guide,
}

impl FavoriteKind {
    fn toggle_path(self, id: i64) -> String {
        match self {
            FavoriteKind::Announcement => format!("/announcements/{}/toggle-favorite/", id),
            FavoriteKind::Guide => format!("/guides/{}/toggle-favorite/", id),
        }
    }

    fn id_field(self) -> &'static str {
        match self {
            FavoriteKind::Announcement => "announcement_id",
            FavoriteKind::Guide => "guide_id",
        }
    }

    fn noun(self) -> &'static str {
        match self {
            FavoriteKind::Announcement => "Announcement",
            FavoriteKind::Guide => "Guide",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FavoriteUpdate {
    Label(&'static str),
    Alert(String),
}

pub trait FavoriteView {
    fn render(&mut self, update: FavoriteUpdate);
}

/// The add/remove favorite button of one announcement or guide page.
/// Session-cookie authenticated with a CSRF token, not the bearer session.
pub struct FavoriteToggle<V: FavoriteView> {
    transport: Arc<dyn Transport>,
    view: V,
    kind: FavoriteKind,
    item_id: i64,
    csrf_token: Option<String>,
}

impl<V: FavoriteView> FavoriteToggle<V> {
    pub fn new(
        transport: Arc<dyn Transport>,
        view: V,
        kind: FavoriteKind,
        item_id: i64,
        csrf_token: Option<String>,
    ) -> Self {
        Self {
            transport,
            view,
            kind,
            item_id,
            csrf_token,
        }
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    /// Flips the favorite on the server and returns whether the item is now
    /// a favorite.
    pub async fn toggle(&mut self) -> Result<bool> {
        match self.request().await {
            Ok(added) => {
                let (label, message) = if added {
                    (ACTIVE_LABEL, format!("{} added to favorites ✓", self.kind.noun()))
                } else {
                    (INACTIVE_LABEL, format!("{} removed from favorites", self.kind.noun()))
                };
                self.view.render(FavoriteUpdate::Alert(message));
                self.view.render(FavoriteUpdate::Label(label));
                Ok(added)
            }
            Err(Error::Status { status, message }) => {
                let reason = message
                    .clone()
                    .unwrap_or_else(|| "could not change favorites".to_string());
                self.view.render(FavoriteUpdate::Alert(format!("Error: {}", reason)));
                Err(Error::Status { status, message })
            }
            Err(e) => {
                log::error!("favorite toggle for {} failed: {}", self.item_id, e);
                self.view.render(FavoriteUpdate::Alert(
                    "Something went wrong while updating favorites".to_string(),
                ));
                Err(e)
            }
        }
    }

    async fn request(&self) -> Result<bool> {
        let mut body = Map::new();
        body.insert(
            self.kind.id_field().to_string(),
            Value::String(self.item_id.to_string()),
        );
        let mut request = ApiRequest::post(self.kind.toggle_path(self.item_id))
            .header("Content-Type", "application/json")
            .json(Value::Object(body));
        if let Some(token) = &self.csrf_token {
            request.set_header("X-CSRFToken", token.as_str());
        }
        let reply: FavoriteReply = self.transport.execute(request).await?.ok()?.json()?;
        Ok(reply.added.unwrap_or(false))
    }
}
