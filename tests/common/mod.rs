#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;

use skillissue_client::api::{ApiRequest, ApiResponse, Session, Transport};
use skillissue_client::storage::MemoryStore;
use skillissue_client::ui::chat::{ChatUpdate, ChatView};
use skillissue_client::ui::favorites::{FavoriteUpdate, FavoriteView};
use skillissue_client::ui::filter::{FilterUpdate, FilterView};
use skillissue_client::ui::search::{SearchUpdate, SearchView};
use skillissue_client::CredentialStore;

type Handler = Box<dyn Fn(&ApiRequest) -> ApiResponse + Send + Sync>;

/// In-process backend answering every request through `handler` and
/// recording what was sent.
pub struct FakeBackend {
    handler: Handler,
    calls: Mutex<Vec<ApiRequest>>,
}

impl FakeBackend {
    pub fn new<F>(handler: F) -> Arc<Self>
    where
        F: Fn(&ApiRequest) -> ApiResponse + Send + Sync + 'static,
    {
        Arc::new(Self {
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<ApiRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, path_prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.path.starts_with(path_prefix))
            .count()
    }
}

#[async_trait]
impl Transport for FakeBackend {
    async fn execute(&self, request: ApiRequest) -> skillissue_client::Result<ApiResponse> {
        self.calls.lock().unwrap().push(request.clone());
        let response = (self.handler)(&request);
        // Suspend once like a real network call so concurrent callers interleave.
        tokio::task::yield_now().await;
        Ok(response)
    }
}

pub fn reply(status: u16, body: Value) -> ApiResponse {
    ApiResponse::new(
        StatusCode::from_u16(status).unwrap(),
        serde_json::to_vec(&body).unwrap(),
    )
}

pub fn bearer(request: &ApiRequest) -> Option<String> {
    request.header_value("Authorization").map(str::to_string)
}

pub fn credentials(access: Option<&str>, refresh: Option<&str>) -> CredentialStore {
    let creds = CredentialStore::new(Arc::new(MemoryStore::new()));
    match (access, refresh) {
        (Some(a), Some(r)) => creds.store(a, r, None),
        (Some(a), None) => creds.set_access(a),
        // An empty access token reads back as absent.
        (None, Some(r)) => creds.store("", r, None),
        (None, None) => Ok(()),
    }
    .unwrap();
    creds
}

pub fn session(
    backend: &Arc<FakeBackend>,
    access: Option<&str>,
    refresh: Option<&str>,
) -> Arc<Session> {
    Arc::new(Session::new(backend.clone(), credentials(access, refresh)))
}

/// Collects every update a controller renders.
#[derive(Debug)]
pub struct Recorder<U> {
    pub updates: Vec<U>,
}

impl<U> Default for Recorder<U> {
    fn default() -> Self {
        Self {
            updates: Vec::new(),
        }
    }
}

impl ChatView for Recorder<ChatUpdate> {
    fn render(&mut self, update: ChatUpdate) {
        self.updates.push(update);
    }
}

impl FavoriteView for Recorder<FavoriteUpdate> {
    fn render(&mut self, update: FavoriteUpdate) {
        self.updates.push(update);
    }
}

impl FilterView for Recorder<FilterUpdate> {
    fn render(&mut self, update: FilterUpdate) {
        self.updates.push(update);
    }
}

/// Search renders from spawned tasks, so its recorder is shared.
#[derive(Clone, Default)]
pub struct SharedRecorder {
    pub updates: Arc<Mutex<Vec<SearchUpdate>>>,
}

impl SharedRecorder {
    pub fn snapshot(&self) -> Vec<SearchUpdate> {
        self.updates.lock().unwrap().clone()
    }
}

impl SearchView for SharedRecorder {
    fn render(&mut self, update: SearchUpdate) {
        self.updates.lock().unwrap().push(update);
    }
}
