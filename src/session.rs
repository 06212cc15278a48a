//! Session-keyed store of open conversations.
//!
//! Lifecycle: a session is created on "new chat" and removed when its tab is
//! closed. The store is never empty; closing the last session opens a fresh
//! one first. Each session carries its own loading flag so that at most one
//! request is in flight per conversation.

use crate::ai::{ChatError, ChatResult};
use crate::types::{ChatMessage, ChatSession, NEW_CHAT_TITLE, SessionId};
use std::sync::{Arc, Mutex, MutexGuard};

pub type SharedStore = Arc<Mutex<SessionStore>>;

/// Locks the store, recovering the data from a poisoned mutex.
pub fn lock(store: &SharedStore) -> MutexGuard<'_, SessionStore> {
    store
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

struct SessionEntry {
    session: ChatSession,
    loading: bool,
}

pub struct SessionStore {
    entries: Vec<SessionEntry>,
    active: SessionId,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    /// Store with a single empty "New Chat" session.
    pub fn new() -> Self {
        let session = ChatSession::new(NEW_CHAT_TITLE);
        let active = session.id.clone();
        Self {
            entries: vec![SessionEntry {
                session,
                loading: false,
            }],
            active,
        }
    }

    pub fn shared(self) -> SharedStore {
        Arc::new(Mutex::new(self))
    }

    /// Opens a new session and makes it active.
    pub fn create(&mut self, title: &str) -> SessionId {
        let session = ChatSession::new(title);
        let id = session.id.clone();
        self.entries.push(SessionEntry {
            session,
            loading: false,
        });
        self.active = id.clone();
        tracing::info!(session = %id, "session created");
        id
    }

    /// Returns false when `id` is unknown.
    pub fn select(&mut self, id: &SessionId) -> bool {
        if self.position(id).is_some() {
            self.active = id.clone();
            true
        } else {
            false
        }
    }

    /// Removes a session and returns the id of the active one afterwards.
    ///
    /// Closing the active session activates the last remaining tab. Unknown ids
    /// are ignored.
    pub fn close(&mut self, id: &SessionId) -> SessionId {
        let Some(index) = self.position(id) else {
            return self.active.clone();
        };

        if self.entries.len() == 1 {
            self.create(NEW_CHAT_TITLE);
        }
        self.entries.remove(index);
        tracing::info!(session = %id, "session closed");

        if &self.active == id
            && let Some(last) = self.entries.last()
        {
            self.active = last.session.id.clone();
        }
        self.active.clone()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn active_id(&self) -> SessionId {
        self.active.clone()
    }

    pub fn active(&self) -> Option<&ChatSession> {
        self.get(&self.active)
    }

    pub fn contains(&self, id: &SessionId) -> bool {
        self.position(id).is_some()
    }

    pub fn get(&self, id: &SessionId) -> Option<&ChatSession> {
        self.entry(id).map(|entry| &entry.session)
    }

    /// Snapshot of every session in tab order.
    pub fn sessions(&self) -> Vec<ChatSession> {
        self.entries
            .iter()
            .map(|entry| entry.session.clone())
            .collect()
    }

    pub fn messages(&self, id: &SessionId) -> Option<Vec<ChatMessage>> {
        self.get(id).map(|session| session.messages.clone())
    }

    /// Appends by replacing the message list. Returns false if the session is gone.
    pub fn append(&mut self, id: &SessionId, message: ChatMessage) -> bool {
        let Some(entry) = self.entry_mut(id) else {
            tracing::debug!(session = %id, "dropping message for closed session");
            return false;
        };
        let mut messages = entry.session.messages.clone();
        messages.push(message);
        entry.session = entry.session.with_messages(messages);
        true
    }

    pub fn clear(&mut self, id: &SessionId) {
        if let Some(entry) = self.entry_mut(id) {
            entry.session = entry.session.with_messages(Vec::new());
        }
    }

    pub fn is_loading(&self, id: &SessionId) -> bool {
        self.entry(id).is_some_and(|entry| entry.loading)
    }

    /// Marks a request as in flight.
    pub fn begin_request(&mut self, id: &SessionId) -> ChatResult<()> {
        let entry = self.entry_mut(id).ok_or(ChatError::SessionClosed)?;
        if entry.loading {
            return Err(ChatError::Busy);
        }
        entry.loading = true;
        Ok(())
    }

    pub fn end_request(&mut self, id: &SessionId) {
        if let Some(entry) = self.entry_mut(id) {
            entry.loading = false;
        }
    }

    fn position(&self, id: &SessionId) -> Option<usize> {
        self.entries.iter().position(|entry| &entry.session.id == id)
    }

    fn entry(&self, id: &SessionId) -> Option<&SessionEntry> {
        self.entries.iter().find(|entry| &entry.session.id == id)
    }

    fn entry_mut(&mut self, id: &SessionId) -> Option<&mut SessionEntry> {
        self.entries
            .iter_mut()
            .find(|entry| &entry.session.id == id)
    }
}
