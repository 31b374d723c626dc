mod store;

pub use store::{SessionStore, SqliteSessionStore};

#[cfg(test)]
pub use store::MockSessionStore;

use crate::llm::{ChatMessage, CompletionRequest, LlmClient, Role};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

pub const NEW_CHAT_TITLE: &str = "New Chat";
const TITLE_LIMIT: usize = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: i64,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            timestamp: current_timestamp(),
        }
    }
}

impl From<&Message> for ChatMessage {
    fn from(message: &Message) -> Self {
        ChatMessage {
            role: message.role,
            content: message.content.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: String,
    pub title: String,
    pub messages: Vec<Message>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatSession {
    pub fn new() -> Self {
        let now = current_timestamp();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: NEW_CHAT_TITLE.to_string(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Append a message. The first user message names an untitled session.
    pub fn push(&mut self, message: Message) {
        if message.role == Role::User
            && self.title == NEW_CHAT_TITLE
            && !self.messages.iter().any(|m| m.role == Role::User)
        {
            self.title = title_from(&message.content);
        }
        self.updated_at = self.updated_at.max(message.timestamp);
        self.messages.push(message);
    }

    fn history(&self) -> Vec<ChatMessage> {
        self.messages.iter().map(ChatMessage::from).collect()
    }
}

fn title_from(content: &str) -> String {
    let content = content.trim();
    if content.chars().count() > TITLE_LIMIT {
        let head: String = content.chars().take(TITLE_LIMIT).collect();
        format!("{}...", head)
    } else {
        content.to_string()
    }
}

fn current_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

/// Send `input` as the next user turn and append the model's reply.
///
/// Blank input is ignored. When the model call fails the user message stays
/// in the session and the error is returned.
pub async fn send(
    client: &dyn LlmClient,
    session: &mut ChatSession,
    input: &str,
) -> Result<Option<Message>> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(None);
    }

    session.push(Message::new(Role::User, input));
    let request = CompletionRequest::conversation(session.history());

    tracing::info!(
        session = %session.id,
        turns = session.messages.len(),
        "Sending chat message"
    );

    let reply = client.complete(&request).await?;
    let message = Message::new(Role::Assistant, reply.trim());
    session.push(message.clone());
    Ok(Some(message))
}

/// The set of chat sessions, backed by a [`SessionStore`]
pub struct ChatBook<S: SessionStore> {
    store: S,
    sessions: Vec<ChatSession>,
    current: usize,
}

impl<S: SessionStore> ChatBook<S> {
    /// Load every stored session. An empty store starts with one new session.
    pub async fn open(store: S) -> Result<Self> {
        let sessions = store.load_all().await?;
        let mut book = Self {
            store,
            sessions,
            current: 0,
        };
        if book.sessions.is_empty() {
            book.new_session().await?;
        }
        Ok(book)
    }

    pub fn sessions(&self) -> &[ChatSession] {
        &self.sessions
    }

    pub fn current(&self) -> &ChatSession {
        &self.sessions[self.current]
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub async fn new_session(&mut self) -> Result<&ChatSession> {
        let session = ChatSession::new();
        self.store.save(&session).await?;
        self.sessions.insert(0, session);
        self.current = 0;
        Ok(&self.sessions[0])
    }

    pub fn select(&mut self, index: usize) -> bool {
        if index >= self.sessions.len() {
            return false;
        }
        self.current = index;
        true
    }

    /// Remove a session. Losing the current one selects the first remaining
    /// session, or a new one when none remain.
    pub async fn delete(&mut self, index: usize) -> Result<bool> {
        let Some(session) = self.sessions.get(index) else {
            return Ok(false);
        };
        self.store.delete(&session.id).await?;
        self.sessions.remove(index);

        if self.sessions.is_empty() {
            self.new_session().await?;
        } else if index == self.current {
            self.current = 0;
        } else if index < self.current {
            self.current -= 1;
        }
        Ok(true)
    }

    /// [`send`] on the current session, saving it whether or not the model answered
    pub async fn send(&mut self, client: &dyn LlmClient, input: &str) -> Result<Option<Message>> {
        let session = &mut self.sessions[self.current];
        let result = send(client, session, input).await;
        if !matches!(result, Ok(None)) {
            self.store.save(session).await?;
        }
        result
    }
}
