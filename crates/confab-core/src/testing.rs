//! In-memory repository fakes shared by the core's unit tests.

use chrono::{DateTime, Utc};

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use confab_types::error::RepositoryError;
use confab_types::message::{Message, MessageId};
use confab_types::user::{UserId, UserProfile};

use crate::repository::{DirectoryRepository, MessageRepository};

/// Hash-map-backed user directory.
pub(crate) struct MemoryDirectory {
    users: Mutex<HashMap<UserId, UserProfile>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self {
            users: Mutex::new(HashMap::new()),
        }
    }

    pub fn insert(&self, profile: UserProfile) {
        self.users.lock().unwrap().insert(profile.id, profile);
    }

    pub fn get(&self, id: UserId) -> Option<UserProfile> {
        self.users.lock().unwrap().get(&id).cloned()
    }
}

impl DirectoryRepository for MemoryDirectory {
    async fn find_user(&self, id: UserId) -> Result<Option<UserProfile>, RepositoryError> {
        Ok(self.users.lock().unwrap().get(&id).cloned())
    }

    async fn set_presence(
        &self,
        id: UserId,
        online: bool,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut users = self.users.lock().unwrap();
        match users.get_mut(&id) {
            Some(user) => {
                user.is_online = online;
                user.last_active = at;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }
}

/// Vec-backed message log with a switch to simulate store outages.
pub(crate) struct MemoryMessages {
    messages: Mutex<Vec<Message>>,
    fail_writes: AtomicBool,
}

impl MemoryMessages {
    pub fn new() -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Make every subsequent write fail with a query error.
    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.messages.lock().unwrap().len()
    }

    pub fn all(&self) -> Vec<Message> {
        self.messages.lock().unwrap().clone()
    }

    fn check_writable(&self) -> Result<(), RepositoryError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(RepositoryError::Query("store unavailable".to_string()))
        } else {
            Ok(())
        }
    }

    fn between(messages: &[Message], a: UserId, b: UserId) -> Vec<Message> {
        messages
            .iter()
            .filter(|m| {
                (m.sender_id == a && m.receiver_id == b)
                    || (m.sender_id == b && m.receiver_id == a)
            })
            .cloned()
            .collect()
    }
}

impl MessageRepository for MemoryMessages {
    async fn save(&self, message: &Message) -> Result<(), RepositoryError> {
        self.check_writable()?;
        self.messages.lock().unwrap().push(message.clone());
        Ok(())
    }

    async fn get(&self, id: MessageId) -> Result<Option<Message>, RepositoryError> {
        Ok(self
            .messages
            .lock()
            .unwrap()
            .iter()
            .find(|m| m.id == id)
            .cloned())
    }

    async fn conversation(
        &self,
        a: UserId,
        b: UserId,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Message>, RepositoryError> {
        let messages = self.messages.lock().unwrap();
        let mut pair = Self::between(&messages, a, b);
        // Newest first, id as tiebreak (UUID v7, time-sorted).
        pair.sort_by(|x, y| {
            y.created_at
                .cmp(&x.created_at)
                .then_with(|| y.id.0.cmp(&x.id.0))
        });
        Ok(pair
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn count_conversation(&self, a: UserId, b: UserId) -> Result<u64, RepositoryError> {
        let messages = self.messages.lock().unwrap();
        Ok(Self::between(&messages, a, b).len() as u64)
    }

    async fn mark_read(
        &self,
        id: MessageId,
        read_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        self.check_writable()?;
        let mut messages = self.messages.lock().unwrap();
        match messages.iter_mut().find(|m| m.id == id) {
            Some(message) => {
                message.is_read = true;
                message.read_at = Some(read_at);
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn mark_conversation_read(
        &self,
        sender: UserId,
        receiver: UserId,
        read_at: DateTime<Utc>,
    ) -> Result<u64, RepositoryError> {
        self.check_writable()?;
        let mut messages = self.messages.lock().unwrap();
        let mut changed = 0;
        for message in messages.iter_mut() {
            if message.sender_id == sender && message.receiver_id == receiver && !message.is_read {
                message.is_read = true;
                message.read_at = Some(read_at);
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn unread_count(&self, receiver: UserId) -> Result<u64, RepositoryError> {
        let messages = self.messages.lock().unwrap();
        Ok(messages
            .iter()
            .filter(|m| m.receiver_id == receiver && !m.is_read)
            .count() as u64)
    }

    async fn clear_conversation(&self, a: UserId, b: UserId) -> Result<u64, RepositoryError> {
        self.check_writable()?;
        let mut messages = self.messages.lock().unwrap();
        let before = messages.len();
        messages.retain(|m| {
            !((m.sender_id == a && m.receiver_id == b)
                || (m.sender_id == b && m.receiver_id == a))
        });
        Ok((before - messages.len()) as u64)
    }
}
