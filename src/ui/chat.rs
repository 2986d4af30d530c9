use crate::api::models::{ChatMessage, Contact, PeerProfile};
use crate::api::{ApiRequest, FormPart, Session};
use crate::error::{Error, Result, ValidationError};
use crate::ui::{Route, DEFAULT_AVATAR};
use crate::utils::format_time;
use std::sync::Arc;

pub const CONTACTS_PATH: &str = "/api/chat/contacts/";
pub const SEND_PATH: &str = "/api/chat/send/";
pub const DEFAULT_MAX_IMAGE_BYTES: u64 = 5 * 1024 * 1024;

fn messages_path(peer_id: i64) -> String {
    format!("/api/chat/{}/messages/", peer_id)
}

fn profile_api_path(username: &str) -> String {
    format!("/api/profile/{}/", urlencoding::encode(username))
}

pub fn profile_page_path(username: &str) -> String {
    format!("/users/{}/", urlencoding::encode(username))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatState {
    Closed,
    Contacts,
    Dialog { peer_id: i64, username: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactsNotice {
    SignInRequired,
    NoConversations,
    LoadFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogNotice {
    Loading,
    StartConversation,
    LoadFailed,
}

/// A message ready for display, with its local `HH:MM` time.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageLine {
    pub message: ChatMessage,
    pub time: String,
}

impl From<ChatMessage> for MessageLine {
    fn from(message: ChatMessage) -> Self {
        let time = format_time(&message.created_at);
        Self { message, time }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChatUpdate {
    Opened,
    Closed,
    /// Back from a dialog to the contact list pane.
    ContactsShown,
    Contacts(Vec<Contact>),
    ContactsNotice(ContactsNotice),
    DialogOpened { username: String, profile_url: String },
    PeerAvatar(String),
    DialogNotice(DialogNotice),
    /// Full history, oldest first.
    History(Vec<MessageLine>),
    MessageAppended(MessageLine),
    DraftImage(Option<String>),
    SendEnabled(bool),
    InputCleared,
    Alert(String),
    Navigate(Route),
}

pub trait ChatView {
    fn render(&mut self, update: ChatUpdate);
}

/// Image picked for the next message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageDraft {
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl ImageDraft {
    pub fn validate(&self, limit: u64) -> std::result::Result<(), ValidationError> {
        if !self.mime.starts_with("image/") {
            return Err(ValidationError::NotAnImage {
                mime: self.mime.clone(),
            });
        }
        let size = self.bytes.len() as u64;
        if size > limit {
            return Err(ValidationError::ImageTooLarge { size, limit });
        }
        Ok(())
    }
}

/// The chat widget: contact list, one open dialog, sending with an
/// optional image.
pub struct ChatSession<V: ChatView> {
    session: Arc<Session>,
    view: V,
    state: ChatState,
    contacts: Vec<Contact>,
    draft_image: Option<ImageDraft>,
    max_image_bytes: u64,
}

impl<V: ChatView> ChatSession<V> {
    pub fn new(session: Arc<Session>, view: V) -> Self {
        Self {
            session,
            view,
            state: ChatState::Closed,
            contacts: Vec::new(),
            draft_image: None,
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
        }
    }

    pub fn with_image_limit(mut self, bytes: u64) -> Self {
        self.max_image_bytes = bytes;
        self
    }

    pub fn state(&self) -> &ChatState {
        &self.state
    }

    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    pub fn draft_image(&self) -> Option<&ImageDraft> {
        self.draft_image.as_ref()
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    pub async fn open(&mut self) -> Result<()> {
        self.state = ChatState::Contacts;
        self.view.render(ChatUpdate::Opened);
        self.load_contacts().await
    }

    pub fn close(&mut self) {
        self.state = ChatState::Closed;
        self.view.render(ChatUpdate::Closed);
    }

    /// Rebuilds the contact list from the server.
    pub async fn load_contacts(&mut self) -> Result<()> {
        if !self.session.is_authenticated() {
            self.view
                .render(ChatUpdate::ContactsNotice(ContactsNotice::SignInRequired));
            return Err(Error::NotAuthenticated);
        }
        match self.fetch_contacts().await {
            Ok(contacts) => {
                self.contacts = contacts;
                if self.contacts.is_empty() {
                    self.view
                        .render(ChatUpdate::ContactsNotice(ContactsNotice::NoConversations));
                } else {
                    self.view.render(ChatUpdate::Contacts(self.contacts.clone()));
                }
                Ok(())
            }
            Err(Error::SessionExpired) => {
                self.contacts.clear();
                self.view
                    .render(ChatUpdate::ContactsNotice(ContactsNotice::SignInRequired));
                self.view.render(ChatUpdate::Navigate(Route::SignIn));
                Err(Error::SessionExpired)
            }
            Err(e) => {
                log::warn!("failed to load chat contacts: {}", e);
                self.view
                    .render(ChatUpdate::ContactsNotice(ContactsNotice::LoadFailed));
                Err(e)
            }
        }
    }

    async fn fetch_contacts(&self) -> Result<Vec<Contact>> {
        let resp = self.session.request(ApiRequest::get(CONTACTS_PATH)).await?;
        resp.ok()?.json()
    }

    /// Opens the dialog with `peer_id` and loads its whole history.
    pub async fn select_contact(&mut self, peer_id: i64, username: &str) -> Result<()> {
        self.clear_draft_image();
        if !self.session.is_authenticated() {
            self.alert(&Error::NotAuthenticated);
            return Err(Error::NotAuthenticated);
        }

        self.state = ChatState::Dialog {
            peer_id,
            username: username.to_string(),
        };
        self.view.render(ChatUpdate::DialogOpened {
            username: username.to_string(),
            profile_url: profile_page_path(username),
        });

        let avatar = self.fetch_avatar(username).await;
        self.view.render(ChatUpdate::PeerAvatar(avatar));

        self.view.render(ChatUpdate::DialogNotice(DialogNotice::Loading));
        match self.fetch_history(peer_id).await {
            Ok(messages) if messages.is_empty() => {
                self.view
                    .render(ChatUpdate::DialogNotice(DialogNotice::StartConversation));
                Ok(())
            }
            Ok(messages) => {
                let lines = messages.into_iter().map(MessageLine::from).collect();
                self.view.render(ChatUpdate::History(lines));
                Ok(())
            }
            Err(e) => {
                log::warn!("failed to load messages with {}: {}", peer_id, e);
                self.view
                    .render(ChatUpdate::DialogNotice(DialogNotice::LoadFailed));
                if matches!(e, Error::SessionExpired) {
                    self.view.render(ChatUpdate::Navigate(Route::SignIn));
                }
                Err(e)
            }
        }
    }

    async fn fetch_avatar(&self, username: &str) -> String {
        let resp = self
            .session
            .request(ApiRequest::get(profile_api_path(username)))
            .await;
        let avatar = resp
            .and_then(|r| r.ok())
            .and_then(|r| r.json::<PeerProfile>())
            .map(|p| p.avatar);
        match avatar {
            Ok(Some(url)) if !url.is_empty() => url,
            Ok(_) => DEFAULT_AVATAR.to_string(),
            Err(e) => {
                log::warn!("failed to load avatar for {}: {}", username, e);
                DEFAULT_AVATAR.to_string()
            }
        }
    }

    async fn fetch_history(&self, peer_id: i64) -> Result<Vec<ChatMessage>> {
        let resp = self
            .session
            .request(ApiRequest::get(messages_path(peer_id)))
            .await?;
        let mut messages: Vec<ChatMessage> = resp.ok()?.json()?;
        messages.sort_by_key(|m| m.created_at);
        Ok(messages)
    }

    pub async fn back(&mut self) -> Result<()> {
        self.state = ChatState::Contacts;
        self.view.render(ChatUpdate::ContactsShown);
        self.load_contacts().await
    }

    /// Entry point from a profile's "write message" action.
    pub async fn open_with_user(&mut self, peer_id: i64, username: &str) -> Result<()> {
        if !self.session.is_authenticated() {
            self.alert(&Error::NotAuthenticated);
            return Err(Error::NotAuthenticated);
        }
        self.state = ChatState::Contacts;
        self.view.render(ChatUpdate::Opened);
        // A failed list load still lets the dialog open.
        let _ = self.load_contacts().await;

        if !self.contacts.iter().any(|c| c.user_id == peer_id) {
            self.contacts.insert(0, Contact::placeholder(peer_id, username));
            self.view.render(ChatUpdate::Contacts(self.contacts.clone()));
        }
        self.select_contact(peer_id, username).await
    }

    pub fn attach_image(&mut self, draft: ImageDraft) -> Result<()> {
        if let Err(e) = draft.validate(self.max_image_bytes) {
            self.clear_draft_image();
            let e = Error::Validation(e);
            self.alert(&e);
            return Err(e);
        }
        self.view
            .render(ChatUpdate::DraftImage(Some(draft.file_name.clone())));
        self.draft_image = Some(draft);
        Ok(())
    }

    pub fn remove_image(&mut self) {
        self.clear_draft_image();
    }

    fn clear_draft_image(&mut self) {
        if self.draft_image.take().is_some() {
            self.view.render(ChatUpdate::DraftImage(None));
        }
    }

    /// Sends `text` and the drafted image to the open dialog's peer.
    ///
    /// The send control is disabled while the request is in flight and
    /// re-enabled afterwards whatever the outcome. A failed send leaves the
    /// view untouched apart from an alert.
    pub async fn send(&mut self, text: &str) -> Result<ChatMessage> {
        let ChatState::Dialog { peer_id, .. } = self.state else {
            let e = Error::Validation(ValidationError::NoRecipient);
            self.alert(&e);
            return Err(e);
        };
        let text = text.trim();
        if text.is_empty() && self.draft_image.is_none() {
            let e = Error::Validation(ValidationError::EmptyMessage);
            self.alert(&e);
            return Err(e);
        }
        if !self.session.is_authenticated() {
            self.alert(&Error::NotAuthenticated);
            return Err(Error::NotAuthenticated);
        }

        self.view.render(ChatUpdate::SendEnabled(false));
        let outcome = self.deliver(peer_id, text).await;
        self.view.render(ChatUpdate::SendEnabled(true));
        outcome
    }

    async fn deliver(&mut self, peer_id: i64, text: &str) -> Result<ChatMessage> {
        let mut sent = match self.submit(peer_id, text).await {
            Ok(message) => message,
            Err(e) => {
                log::warn!("failed to send message to {}: {}", peer_id, e);
                if matches!(e, Error::SessionExpired) {
                    self.view.render(ChatUpdate::Navigate(Route::SignIn));
                }
                self.alert(&e);
                return Err(e);
            }
        };
        if sent.text.is_none() && !text.is_empty() {
            sent.text = Some(text.to_string());
        }

        self.view.render(ChatUpdate::InputCleared);
        self.clear_draft_image();
        self.view
            .render(ChatUpdate::MessageAppended(sent.clone().into()));
        // Reorders the list and refreshes unread counts; errors are rendered.
        let _ = self.load_contacts().await;
        Ok(sent)
    }

    async fn submit(&self, peer_id: i64, text: &str) -> Result<ChatMessage> {
        let mut parts = vec![FormPart::Text {
            name: "receiver_id".into(),
            value: peer_id.to_string(),
        }];
        if !text.is_empty() {
            parts.push(FormPart::Text {
                name: "message".into(),
                value: text.to_string(),
            });
        }
        if let Some(image) = &self.draft_image {
            parts.push(FormPart::File {
                name: "image".into(),
                file_name: image.file_name.clone(),
                mime: image.mime.clone(),
                bytes: image.bytes.clone(),
            });
        }
        let resp = self
            .session
            .request(ApiRequest::post(SEND_PATH).multipart(parts))
            .await?;
        resp.ok()?.json()
    }

    fn alert(&mut self, error: &Error) {
        self.view.render(ChatUpdate::Alert(error.user_message()));
    }
}
