//! Client-side layer for the SkillIssue web backend: bearer-token session
//! with refresh-and-retry, the chat widget, and the favorites, live search,
//! listing filter and theme controllers.

pub mod api;
pub mod app;
pub mod credentials;
pub mod error;
pub mod storage;
pub mod ui;
pub mod utils;

pub use app::{App, AppConfig};
pub use credentials::CredentialStore;
pub use error::{Error, Result, ValidationError};
