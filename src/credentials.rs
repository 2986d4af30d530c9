use crate::api::models::UserProfile;
use crate::error::Result;
use crate::storage::KeyValueStore;
use std::sync::Arc;

const ACCESS_TOKEN_KEY: &str = "access_token";
const REFRESH_TOKEN_KEY: &str = "refresh_token";
const USER_KEY: &str = "user_data";

/// Access token, refresh token and cached profile kept in a [`KeyValueStore`].
///
/// There is no expiry tracking; a stale access token is only noticed when
/// the server rejects it.
#[derive(Clone)]
pub struct CredentialStore {
    store: Arc<dyn KeyValueStore>,
}

impl CredentialStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn store(&self, access: &str, refresh: &str, profile: Option<&UserProfile>) -> Result<()> {
        self.store.set(ACCESS_TOKEN_KEY, access)?;
        self.store.set(REFRESH_TOKEN_KEY, refresh)?;
        if let Some(profile) = profile {
            self.store.set(USER_KEY, &serde_json::to_string(profile)?)?;
        }
        Ok(())
    }

    pub fn set_access(&self, access: &str) -> Result<()> {
        self.store.set(ACCESS_TOKEN_KEY, access)
    }

    pub fn access(&self) -> Option<String> {
        self.read(ACCESS_TOKEN_KEY)
    }

    pub fn refresh(&self) -> Option<String> {
        self.read(REFRESH_TOKEN_KEY)
    }

    pub fn profile(&self) -> Option<UserProfile> {
        let raw = self.read(USER_KEY)?;
        match serde_json::from_str(&raw) {
            Ok(profile) => Some(profile),
            Err(e) => {
                log::warn!("discarding unreadable cached profile: {}", e);
                None
            }
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.access().is_some()
    }

    pub fn clear(&self) -> Result<()> {
        self.store.remove(ACCESS_TOKEN_KEY)?;
        self.store.remove(REFRESH_TOKEN_KEY)?;
        self.store.remove(USER_KEY)?;
        Ok(())
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.store.get(key) {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(e) => {
                log::error!("failed to read {} from store: {}", key, e);
                None
            }
        }
    }
}
