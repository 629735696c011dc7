//! Per-session conversation transcripts.
//!
//! Each chat session owns its own [`Conversation`]; the resolution pipeline
//! receives it by `&mut` so one caller's turns never leak into another's
//! provider prompt. Transcripts live in memory only and vanish on restart.
//!
//! The store holds at most `capacity` sessions. Opening a new one beyond
//! that evicts the least recently used session.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::models::ConversationTurn;

/// Session used when a request does not name one.
pub const DEFAULT_SESSION: &str = "default";

pub const DEFAULT_MAX_SESSIONS: usize = 1000;

#[derive(Debug, Clone, Default)]
pub struct Conversation {
    turns: Vec<ConversationTurn>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn push(&mut self, turn: ConversationTurn) {
        self.turns.push(turn);
    }

    /// Appends the turns `other` gained after its first `from` turns.
    pub fn extend_from(&mut self, other: &Conversation, from: usize) {
        if let Some(new_turns) = other.turns.get(from..) {
            self.turns.extend(new_turns.iter().cloned());
        }
    }

    /// The transcript with `system_prompt` prepended, ready for a provider.
    pub fn with_system(&self, system_prompt: &str) -> Vec<ConversationTurn> {
        let mut messages = Vec::with_capacity(self.turns.len() + 1);
        messages.push(ConversationTurn::system(system_prompt));
        messages.extend(self.turns.iter().cloned());
        messages
    }
}

struct Slot {
    conversation: Arc<Mutex<Conversation>>,
    last_used: u64,
}

#[derive(Default)]
struct Sessions {
    slots: HashMap<String, Slot>,
    clock: u64,
}

/// All live sessions, keyed by caller-chosen id.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<Mutex<Sessions>>,
    capacity: usize,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_MAX_SESSIONS)
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that keeps at most `capacity` sessions (minimum one).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(Sessions::default())),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the session named `id`, creating it on first use.
    pub async fn get(&self, id: &str) -> Arc<Mutex<Conversation>> {
        let mut sessions = self.sessions.lock().await;
        sessions.clock += 1;
        let now = sessions.clock;

        if let Some(slot) = sessions.slots.get_mut(id) {
            slot.last_used = now;
            return slot.conversation.clone();
        }

        if sessions.slots.len() >= self.capacity {
            let oldest = sessions
                .slots
                .iter()
                .min_by_key(|(_, slot)| slot.last_used)
                .map(|(key, _)| key.clone());
            if let Some(key) = oldest {
                sessions.slots.remove(&key);
                tracing::debug!(session = %key, "evicted least recently used session");
            }
        }

        let conversation = Arc::new(Mutex::new(Conversation::new()));
        sessions.slots.insert(
            id.to_string(),
            Slot {
                conversation: conversation.clone(),
                last_used: now,
            },
        );
        conversation
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.slots.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    #[test]
    fn test_with_system_prepends_prompt() {
        let mut conversation = Conversation::new();
        conversation.push(ConversationTurn::user("halo"));
        conversation.push(ConversationTurn::assistant("hai"));

        let messages = conversation.with_system("Jawab singkat.");
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[0].content, "Jawab singkat.");
        assert_eq!(messages[2].content, "hai");
        assert_eq!(conversation.len(), 2, "transcript itself is unchanged");
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let store = SessionStore::new();

        store
            .get("a")
            .await
            .lock()
            .await
            .push(ConversationTurn::user("rahasia"));

        assert_eq!(store.get("a").await.lock().await.len(), 1);
        assert!(store.get("b").await.lock().await.is_empty());
        assert_eq!(store.len().await, 2);
    }

    #[test]
    fn test_extend_from_copies_only_new_turns() {
        let mut shared = Conversation::new();
        shared.push(ConversationTurn::user("satu"));

        let mut snapshot = shared.clone();
        let start = snapshot.len();
        snapshot.push(ConversationTurn::user("dua"));
        snapshot.push(ConversationTurn::assistant("tiga"));

        // Another request finished in the meantime.
        shared.push(ConversationTurn::user("lain"));
        shared.extend_from(&snapshot, start);

        let contents: Vec<&str> = shared.turns().iter().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, ["satu", "lain", "dua", "tiga"]);
    }

    #[tokio::test]
    async fn test_store_evicts_least_recently_used() {
        let store = SessionStore::with_capacity(2);
        store.get("a").await.lock().await.push(ConversationTurn::user("a1"));
        store.get("b").await;
        // Touch "a" so "b" becomes the oldest.
        store.get("a").await;
        store.get("c").await;

        assert_eq!(store.len().await, 2);
        assert_eq!(store.get("a").await.lock().await.len(), 1, "recently used survives");
        assert!(store.get("b").await.lock().await.is_empty(), "evicted session starts over");
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_many_ids_stay_within_capacity() {
        let store = SessionStore::with_capacity(8);
        for i in 0..100 {
            store.get(&format!("s{}", i)).await;
        }
        assert_eq!(store.len().await, 8);
    }
}
