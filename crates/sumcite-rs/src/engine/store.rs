//! The conversation store seam: opaque KV with last-write-wins updates and
//! TTL-based idle expiry.
//!
//! The engine defines the record shape and the update protocol; storage
//! itself is a collaborator. [`MemoryConversationStore`] is a volatile,
//! timeout-based cache: a `HashMap` behind `RwLock`, per-entry deadline,
//! expiry enforced on read. There is no cross-key transaction and no
//! optimistic concurrency — concurrent writers to the same conversation
//! race, last write wins.

use super::records::Conversation;
use crate::error::SumciteResult;
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

/// Default idle timeout for conversation records.
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// `get`/`set` contract for persisted conversations.
pub trait ConversationStore: Send + Sync {
    /// Fetch a conversation; `None` if absent or expired.
    fn get(&self, conversation_id: &str) -> SumciteResult<Option<Conversation>>;

    /// Write a conversation, resetting its idle-expiry deadline.
    fn set(
        &self,
        conversation_id: &str,
        conversation: &Conversation,
        ttl: Duration,
    ) -> SumciteResult<()>;
}

struct StoredConversation {
    conversation: Conversation,
    expires_at: Instant,
}

/// In-memory TTL store.
#[derive(Default)]
pub struct MemoryConversationStore {
    entries: RwLock<HashMap<String, StoredConversation>>,
}

impl MemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a live (unexpired) entry exists, without touching its TTL.
    pub fn contains(&self, conversation_id: &str) -> bool {
        let entries = self.entries.read().unwrap();
        entries
            .get(conversation_id)
            .is_some_and(|stored| Instant::now() < stored.expires_at)
    }

    /// Number of entries currently held (expired entries included until
    /// their next read).
    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ConversationStore for MemoryConversationStore {
    fn get(&self, conversation_id: &str) -> SumciteResult<Option<Conversation>> {
        let mut entries = self.entries.write().unwrap();
        match entries.get(conversation_id) {
            Some(stored) if Instant::now() < stored.expires_at => {
                Ok(Some(stored.conversation.clone()))
            }
            Some(_) => {
                entries.remove(conversation_id);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn set(
        &self,
        conversation_id: &str,
        conversation: &Conversation,
        ttl: Duration,
    ) -> SumciteResult<()> {
        let mut entries = self.entries.write().unwrap();
        entries.insert(
            conversation_id.to_string(),
            StoredConversation {
                conversation: conversation.clone(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Message;
    use crate::engine::records::ConversationContext;

    fn make_conversation(id: &str) -> Conversation {
        Conversation::new(
            id,
            ConversationContext::Transient,
            vec![Message::system("sys")],
        )
    }

    #[test]
    fn set_get_roundtrip() {
        let store = MemoryConversationStore::new();
        let convo = make_conversation("c1");
        store.set("c1", &convo, DEFAULT_TTL).unwrap();

        let loaded = store.get("c1").unwrap().unwrap();
        assert_eq!(loaded, convo);
    }

    #[test]
    fn missing_conversation_is_none() {
        let store = MemoryConversationStore::new();
        assert!(store.get("nope").unwrap().is_none());
    }

    #[test]
    fn zero_ttl_expires_immediately() {
        let store = MemoryConversationStore::new();
        store
            .set("c1", &make_conversation("c1"), Duration::ZERO)
            .unwrap();
        assert!(store.get("c1").unwrap().is_none());
        // The expired entry was purged on read.
        assert!(store.is_empty());
    }

    #[test]
    fn last_write_wins() {
        let store = MemoryConversationStore::new();
        let mut convo = make_conversation("c1");
        store.set("c1", &convo, DEFAULT_TTL).unwrap();

        convo.messages.push(Message::user("follow-up"));
        store.set("c1", &convo, DEFAULT_TTL).unwrap();

        let loaded = store.get("c1").unwrap().unwrap();
        assert_eq!(loaded.messages.len(), 2);
    }

    #[test]
    fn contains_respects_expiry() {
        let store = MemoryConversationStore::new();
        store
            .set("live", &make_conversation("live"), DEFAULT_TTL)
            .unwrap();
        store
            .set("dead", &make_conversation("dead"), Duration::ZERO)
            .unwrap();
        assert!(store.contains("live"));
        assert!(!store.contains("dead"));
        assert!(!store.contains("never"));
    }
}
