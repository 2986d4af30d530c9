use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Display fields cached alongside the tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginReply {
    pub access: String,
    pub refresh: String,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RefreshReply {
    pub access: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub user_id: i64,
    pub username: String,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub last_message: String,
    #[serde(default)]
    pub last_message_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub unread_count: u32,
}

impl Contact {
    /// Stand-in row for a peer with no conversation yet.
    pub fn placeholder(user_id: i64, username: &str) -> Self {
        Self {
            user_id,
            username: username.to_string(),
            avatar: None,
            last_message: String::new(),
            last_message_at: None,
            unread_count: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Outgoing,
    Incoming,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default = "outgoing")]
    pub direction: Direction,
    #[serde(default, rename = "message", deserialize_with = "non_empty")]
    pub text: Option<String>,
    #[serde(default, deserialize_with = "non_empty")]
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

fn outgoing() -> Direction {
    Direction::Outgoing
}

fn non_empty<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

#[derive(Debug, Deserialize)]
pub struct PeerProfile {
    #[serde(default)]
    pub avatar: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FavoriteReply {
    #[serde(default)]
    pub added: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchItem {
    pub title: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    pub url: String,
}

impl SearchItem {
    pub fn type_label(&self) -> &str {
        match self.kind.as_str() {
            "руководство" | "guide" => "Guide",
            "объявление" | "announcement" => "Announcement",
            "профиль" | "profile" => "Profile",
            other => other,
        }
    }
}

/// One card of a filtered announcements or guides listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingItem {
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub author_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub rating: Option<f64>,
}

// Decimal fields may arrive as "4.50".
fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

#[derive(Debug, Deserialize)]
pub struct ListingReply {
    #[serde(default)]
    pub results: Vec<ListingItem>,
}
