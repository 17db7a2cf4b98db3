//! In-process store. Nothing survives a restart.

use super::{CredentialStore, Message, MessageStore, StoreError};
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct MemoryStore {
    users: Mutex<HashMap<String, String>>,
    messages: Mutex<Vec<Message>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryStore {
    fn exists(&self, username: &str) -> Result<bool, StoreError> {
        Ok(self.users.lock().contains_key(username))
    }

    fn get_hash(&self, username: &str) -> Result<Option<String>, StoreError> {
        Ok(self.users.lock().get(username).cloned())
    }

    fn insert(&self, username: &str, password_hash: &str) -> Result<(), StoreError> {
        // Check and insert under one lock so racing registrations see a conflict.
        match self.users.lock().entry(username.to_owned()) {
            Entry::Occupied(_) => Err(StoreError::Conflict),
            Entry::Vacant(slot) => {
                slot.insert(password_hash.to_owned());
                Ok(())
            }
        }
    }
}

impl MessageStore for MemoryStore {
    fn list_messages(&self) -> Result<Vec<Message>, StoreError> {
        let mut messages = self.messages.lock().clone();
        messages.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.id.cmp(&b.id)));
        Ok(messages)
    }

    fn post_message(&self, sender: &str, content: &str) -> Result<Message, StoreError> {
        let mut messages = self.messages.lock();
        let id = i64::try_from(messages.len())
            .map_err(|e| StoreError::Backend(e.to_string()))?
            + 1;
        let message = Message {
            id,
            sender: sender.to_owned(),
            content: content.to_owned(),
            timestamp: Utc::now(),
        };
        messages.push(message.clone());
        Ok(message)
    }
}
