//! In-process conversation memory keyed by session.
//!
//! Lookup and insert go through a sharded `DashMap`; each session has its
//! own async mutex so one session's operations are linearized without
//! serializing unrelated sessions. Never hold a `DashMap` guard across an
//! await: clone the slot `Arc` out first.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use lectern_types::chat::{ChatMessage, ConversationHistory, MessageRole, SessionId, SessionStatus};
use lectern_types::config::MemoryConfig;
use lectern_types::error::SessionError;

use crate::llm::token_counter::TokenCounter;

use super::trim::TrimPolicy;

/// State of one session: lifecycle status plus its full history.
#[derive(Debug, Default)]
pub struct SessionSlot {
    pub status: SessionStatus,
    pub history: ConversationHistory,
}

/// Per-session message store with token-budget trimming.
pub struct ConversationMemory {
    sessions: DashMap<SessionId, Arc<Mutex<SessionSlot>>>,
    counter: Arc<dyn TokenCounter>,
    policy: TrimPolicy,
    commit_trimmed: bool,
}

impl ConversationMemory {
    pub fn new(counter: Arc<dyn TokenCounter>, policy: TrimPolicy) -> Self {
        Self {
            sessions: DashMap::new(),
            counter,
            policy,
            commit_trimmed: false,
        }
    }

    pub fn from_config(counter: Arc<dyn TokenCounter>, config: &MemoryConfig) -> Self {
        Self::new(counter, TrimPolicy::from_config(config)).with_commit_trimmed(config.commit_trimmed)
    }

    /// Write every trimmed view back to storage.
    pub fn with_commit_trimmed(mut self, commit: bool) -> Self {
        self.commit_trimmed = commit;
        self
    }

    pub fn policy(&self) -> &TrimPolicy {
        &self.policy
    }

    pub fn counter(&self) -> &Arc<dyn TokenCounter> {
        &self.counter
    }

    fn slot(&self, session_id: &SessionId) -> Arc<Mutex<SessionSlot>> {
        self.sessions
            .entry(session_id.clone())
            .or_default()
            .value()
            .clone()
    }

    fn existing_slot(&self, session_id: &SessionId) -> Option<Arc<Mutex<SessionSlot>>> {
        self.sessions.get(session_id).map(|s| s.value().clone())
    }

    fn is_current(&self, session_id: &SessionId, slot: &Arc<Mutex<SessionSlot>>) -> bool {
        self.sessions
            .get(session_id)
            .is_some_and(|s| Arc::ptr_eq(s.value(), slot))
    }

    /// Lock a session for the duration of a turn, creating it if needed.
    ///
    /// A slot evicted while this call waited is never returned; the lock is
    /// retried on the session's replacement.
    pub async fn lock(&self, session_id: &SessionId) -> OwnedMutexGuard<SessionSlot> {
        loop {
            let slot = self.slot(session_id);
            let guard = Arc::clone(&slot).lock_owned().await;
            if self.is_current(session_id, &slot) {
                return guard;
            }
        }
    }

    /// Snapshot of the full history. Creates the session on first use.
    pub async fn get_or_create(&self, session_id: &SessionId) -> ConversationHistory {
        self.lock(session_id).await.history.clone()
    }

    /// Append a message. Fails only when the session is closed.
    pub async fn append(
        &self,
        session_id: &SessionId,
        role: MessageRole,
        content: impl Into<String>,
    ) -> Result<(), SessionError> {
        let mut slot = self.lock(session_id).await;
        self.append_locked(&mut slot, session_id, role, content.into())
    }

    /// Append to a slot the caller already holds.
    pub fn append_locked(
        &self,
        slot: &mut SessionSlot,
        session_id: &SessionId,
        role: MessageRole,
        content: String,
    ) -> Result<(), SessionError> {
        if slot.status == SessionStatus::Closed {
            return Err(SessionError::Closed(session_id.to_string()));
        }
        let tokens = self.counter.estimate_tokens(&content);
        slot.history.push(ChatMessage::new(role, content, tokens));
        slot.status = SessionStatus::Active;
        tracing::debug!(session_id = %session_id, %role, tokens, "appended message");
        Ok(())
    }

    /// Trimmed view of a session's history. Unknown sessions yield an empty
    /// history and are not created.
    pub async fn trimmed_view(&self, session_id: &SessionId) -> ConversationHistory {
        match self.existing_slot(session_id) {
            Some(slot) => {
                let mut slot = slot.lock().await;
                self.trimmed_locked(&mut slot)
            }
            None => ConversationHistory::new(),
        }
    }

    /// Trimmed view of a slot the caller already holds.
    pub fn trimmed_locked(&self, slot: &mut SessionSlot) -> ConversationHistory {
        let trimmed: ConversationHistory = self.policy.trim(slot.history.messages()).into();
        if self.commit_trimmed && trimmed.len() != slot.history.len() {
            tracing::debug!(
                before = slot.history.len(),
                after = trimmed.len(),
                "committing trimmed history"
            );
            slot.history = trimmed.clone();
        }
        trimmed
    }

    /// Close a session. Closed sessions reject appends; there is no way back.
    pub async fn close(&self, session_id: &SessionId) {
        let mut slot = self.lock(session_id).await;
        slot.status = SessionStatus::Closed;
    }

    /// Current status; unknown sessions report `Empty`.
    pub async fn status(&self, session_id: &SessionId) -> SessionStatus {
        match self.existing_slot(session_id) {
            Some(slot) => slot.lock().await.status,
            None => SessionStatus::Empty,
        }
    }

    /// Remove a session entirely. Returns whether it existed.
    ///
    /// Waits for an in-flight turn on the session to finish first.
    pub async fn evict(&self, session_id: &SessionId) -> bool {
        loop {
            let Some(slot) = self.existing_slot(session_id) else {
                return false;
            };
            let _guard = slot.lock().await;
            if self
                .sessions
                .remove_if(session_id, |_, current| Arc::ptr_eq(current, &slot))
                .is_some()
            {
                return true;
            }
        }
    }

    pub fn contains(&self, session_id: &SessionId) -> bool {
        self.sessions.contains_key(session_id)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::token_counter::CharRatioCounter;

    fn memory(budget: u32) -> ConversationMemory {
        ConversationMemory::new(Arc::new(CharRatioCounter::default()), TrimPolicy::new(budget))
    }

    #[tokio::test]
    async fn test_get_or_create_is_idempotent() {
        let memory = memory(100);
        let id = SessionId::new("s1");
        assert!(memory.get_or_create(&id).await.is_empty());
        assert!(memory.get_or_create(&id).await.is_empty());
        assert_eq!(memory.session_count(), 1);
        assert_eq!(memory.status(&id).await, SessionStatus::Empty);
    }

    #[tokio::test]
    async fn test_append_counts_tokens_and_activates() {
        let memory = memory(100);
        let id = SessionId::new("s1");
        memory.append(&id, MessageRole::User, "12345678").await.unwrap();
        let history = memory.get_or_create(&id).await;
        assert_eq!(history.len(), 1);
        assert_eq!(history.messages()[0].token_count, 2);
        assert_eq!(memory.status(&id).await, SessionStatus::Active);
    }

    #[tokio::test]
    async fn test_append_to_closed_session_fails() {
        let memory = memory(100);
        let id = SessionId::new("s1");
        memory.append(&id, MessageRole::User, "hi").await.unwrap();
        memory.close(&id).await;
        let err = memory
            .append(&id, MessageRole::User, "again")
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Closed(ref s) if s == "s1"));
        assert_eq!(memory.get_or_create(&id).await.len(), 1);
    }

    #[tokio::test]
    async fn test_trimmed_view_unknown_session_is_empty_and_not_created() {
        let memory = memory(100);
        let id = SessionId::new("ghost");
        assert!(memory.trimmed_view(&id).await.is_empty());
        assert!(!memory.contains(&id));
    }

    #[tokio::test]
    async fn test_trimmed_view_does_not_mutate_by_default() {
        let memory = memory(3);
        let id = SessionId::new("s1");
        memory.append(&id, MessageRole::User, "aaaaaaaa").await.unwrap();
        memory.append(&id, MessageRole::Assistant, "bbbb").await.unwrap();
        memory.append(&id, MessageRole::User, "cccc").await.unwrap();
        memory.append(&id, MessageRole::Assistant, "dddd").await.unwrap();

        let view = memory.trimmed_view(&id).await;
        assert_eq!(view.len(), 2);
        assert_eq!(view.messages()[0].content, "cccc");
        assert_eq!(memory.get_or_create(&id).await.len(), 4);
    }

    #[tokio::test]
    async fn test_trimmed_view_commits_when_enabled() {
        let memory = memory(3).with_commit_trimmed(true);
        let id = SessionId::new("s1");
        for (role, text) in [
            (MessageRole::User, "aaaaaaaa"),
            (MessageRole::Assistant, "bbbb"),
            (MessageRole::User, "cccc"),
            (MessageRole::Assistant, "dddd"),
        ] {
            memory.append(&id, role, text).await.unwrap();
        }
        let view = memory.trimmed_view(&id).await;
        assert_eq!(memory.get_or_create(&id).await, view);
    }

    #[tokio::test]
    async fn test_evict_removes_session() {
        let memory = memory(100);
        let id = SessionId::new("s1");
        memory.append(&id, MessageRole::User, "hi").await.unwrap();
        memory.close(&id).await;
        assert!(memory.evict(&id).await);
        assert!(!memory.evict(&id).await);
        // A fresh session with the same id starts over.
        memory.append(&id, MessageRole::User, "hi").await.unwrap();
        assert_eq!(memory.get_or_create(&id).await.len(), 1);
    }

    #[tokio::test]
    async fn test_evict_waits_for_in_flight_turn() {
        let memory = Arc::new(memory(100));
        let id = SessionId::new("s1");
        memory.append(&id, MessageRole::User, "one").await.unwrap();
        let turn = memory.lock(&id).await;

        let evicting = tokio::spawn({
            let memory = Arc::clone(&memory);
            let id = id.clone();
            async move { memory.evict(&id).await }
        });
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        let next_turn = tokio::spawn({
            let memory = Arc::clone(&memory);
            let id = id.clone();
            async move { memory.lock(&id).await.history.len() }
        });
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(!evicting.is_finished());
        assert!(!next_turn.is_finished());

        drop(turn);
        assert!(evicting.await.unwrap());
        // The queued turn lands on a fresh session, not the evicted one.
        assert_eq!(next_turn.await.unwrap(), 0);
        assert!(memory.contains(&id));
    }

    #[tokio::test]
    async fn test_concurrent_sessions_do_not_interfere() {
        let memory = Arc::new(memory(1000));
        let mut handles = Vec::new();
        for s in 0..8 {
            let memory = Arc::clone(&memory);
            handles.push(tokio::spawn(async move {
                let id = SessionId::new(format!("s{s}"));
                for i in 0..25 {
                    memory
                        .append(&id, MessageRole::User, format!("m{i}"))
                        .await
                        .unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(memory.session_count(), 8);
        for s in 0..8 {
            let history = memory.get_or_create(&SessionId::new(format!("s{s}"))).await;
            assert_eq!(history.len(), 25);
            assert_eq!(history.messages()[24].content, "m24");
        }
    }
}
