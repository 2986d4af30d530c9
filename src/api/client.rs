use crate::api::models::{LoginReply, RefreshReply, UserProfile};
use crate::api::transport::{ApiRequest, ApiResponse, Transport};
use crate::credentials::CredentialStore;
use crate::error::{Error, Result};
use crate::ui::Route;
use reqwest::StatusCode;
use serde_json::json;
use std::sync::Arc;

pub const LOGIN_PATH: &str = "/api/login/";
pub const REFRESH_PATH: &str = "/api/token/refresh/";
pub const CURRENT_USER_PATH: &str = "/api/me/";
pub const LOGOUT_PATH: &str = "/logout/";

/// Session context: owns credential access and issues bearer-authenticated
/// requests. Constructed once and passed to the controllers that need it.
pub struct Session {
    transport: Arc<dyn Transport>,
    credentials: CredentialStore,
}

impl Session {
    pub fn new(transport: Arc<dyn Transport>, credentials: CredentialStore) -> Self {
        Self {
            transport,
            credentials,
        }
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    pub fn is_authenticated(&self) -> bool {
        self.credentials.is_authenticated()
    }

    fn with_auth(&self, mut request: ApiRequest, token: Option<&str>) -> ApiRequest {
        if request.is_multipart() {
            // The transport sets the multipart boundary itself.
            request.headers.retain(|(n, _)| !n.eq_ignore_ascii_case("content-type"));
        } else if request.header_value("content-type").is_none() {
            request.set_header("Content-Type", "application/json");
        }
        if let Some(t) = token {
            request.set_header("Authorization", format!("Bearer {}", t));
        }
        request
    }

    /// Performs `request` with the stored access token.
    ///
    /// On `401 Unauthorized` the access token is refreshed once and the
    /// request replayed once; the replayed reply is returned whatever its
    /// status. When no refresh token is stored or the refresh is refused,
    /// credentials are cleared and [`Error::SessionExpired`] is returned.
    /// Concurrent callers that all hit a 401 each refresh independently.
    pub async fn request(&self, request: ApiRequest) -> Result<ApiResponse> {
        let access = self.credentials.access();
        let first = self.with_auth(request.clone(), access.as_deref());
        let response = self.transport.execute(first).await?;
        if response.status != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        log::info!("{} {} was refused, refreshing access token", request.method, request.path);
        let access = match self.refresh_access_token().await {
            Ok(token) => token,
            Err(e) => {
                log::warn!("token refresh failed: {}", e);
                self.expire();
                return Err(Error::SessionExpired);
            }
        };
        let retry = self.with_auth(request, Some(&access));
        self.transport.execute(retry).await
    }

    /// Exchanges the refresh token for a new access token and stores it.
    /// Any failure clears the stored credentials.
    pub async fn refresh_access_token(&self) -> Result<String> {
        let Some(refresh) = self.credentials.refresh() else {
            self.expire();
            return Err(Error::SessionExpired);
        };
        match self.try_refresh(&refresh).await {
            Ok(access) => Ok(access),
            Err(e) => {
                self.expire();
                Err(e)
            }
        }
    }

    async fn try_refresh(&self, refresh: &str) -> Result<String> {
        let request = ApiRequest::post(REFRESH_PATH)
            .header("Content-Type", "application/json")
            .json(json!({ "refresh": refresh }));
        let reply: RefreshReply = self.transport.execute(request).await?.ok()?.json()?;
        let access = reply
            .access
            .filter(|a| !a.is_empty())
            .ok_or(Error::SessionExpired)?;
        self.credentials.set_access(&access)?;
        log::debug!("access token refreshed");
        Ok(access)
    }

    fn expire(&self) {
        if let Err(e) = self.credentials.clear() {
            log::error!("failed to clear credentials: {}", e);
        }
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<UserProfile> {
        let request = ApiRequest::post(LOGIN_PATH)
            .header("Content-Type", "application/json")
            .json(json!({ "username": username, "password": password }));
        let reply: LoginReply = self.transport.execute(request).await?.ok()?.json()?;
        let profile = UserProfile {
            id: None,
            username: reply.username,
            email: reply.email,
        };
        self.credentials
            .store(&reply.access, &reply.refresh, Some(&profile))?;
        log::info!("signed in as {}", profile.username);
        Ok(profile)
    }

    pub async fn current_user(&self) -> Result<UserProfile> {
        if !self.is_authenticated() {
            return Err(Error::NotAuthenticated);
        }
        let profile: UserProfile = self
            .request(ApiRequest::get(CURRENT_USER_PATH))
            .await?
            .ok()?
            .json()?;
        Ok(profile)
    }

    /// Clears credentials and ends the server session. The server call's
    /// outcome is ignored; the caller navigates to the returned route.
    pub async fn logout(&self) -> Route {
        self.expire();
        if let Err(e) = self.transport.execute(ApiRequest::get(LOGOUT_PATH)).await {
            log::warn!("logout call failed: {}", e);
        }
        Route::Home
    }
}
