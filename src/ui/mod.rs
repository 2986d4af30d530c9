//! View-models for the page widgets. Each controller takes user intents as
//! method calls and reports what to draw through its view trait; none of
//! them touch a document directly.

pub mod chat;
pub mod favorites;
pub mod filter;
pub mod search;
pub mod theme;

pub const DEFAULT_AVATAR: &str = "/static/images/default-avatar.jpg";

/// Where the embedder should navigate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    SignIn,
    Page(String),
}

impl Route {
    pub fn path(&self) -> &str {
        match self {
            Route::Home => "/",
            Route::SignIn => "/login-page/",
            Route::Page(path) => path,
        }
    }
}
