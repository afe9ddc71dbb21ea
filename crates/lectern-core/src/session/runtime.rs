//! Per-session turns: prompt composition, oracle calls and committing
//! the exchange to conversation memory.

use std::pin::Pin;
use std::sync::Arc;

use futures_util::{Stream, StreamExt};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use lectern_types::chat::{MessageRole, SessionId, SessionStatus};
use lectern_types::error::SessionError;

use crate::memory::{ConversationMemory, SessionSlot};
use crate::oracle::TextOracle;
use crate::prompt::Prompt;
use crate::prompt::templates::CHAT;
use crate::retrieval::{NoRetriever, Retriever, format_context};

/// Answer fragments of one streamed turn.
pub type SessionStream = Pin<Box<dyn Stream<Item = Result<String, SessionError>> + Send + 'static>>;

/// Runs conversational turns: retrieval, prompt composition, the oracle
/// call and the commit to memory.
///
/// Each turn holds its session's lock from composition to commit, so turns
/// on one session are linearized while different sessions run concurrently.
/// A turn is committed (user message, then assistant reply) only when the
/// oracle answered in full.
pub struct SessionRuntime<O, R = NoRetriever> {
    oracle: Arc<O>,
    memory: Arc<ConversationMemory>,
    retriever: Arc<R>,
    abstract_text: Arc<RwLock<String>>,
    k: usize,
}

impl<O> SessionRuntime<O, NoRetriever> {
    pub fn new(oracle: Arc<O>, memory: Arc<ConversationMemory>) -> Self {
        Self {
            oracle,
            memory,
            retriever: Arc::new(NoRetriever),
            abstract_text: Arc::new(RwLock::new(String::new())),
            k: 0,
        }
    }
}

impl<O, R> SessionRuntime<O, R> {
    /// Use `retriever` for up to `k` context passages per turn.
    pub fn with_retriever<R2>(self, retriever: Arc<R2>, k: usize) -> SessionRuntime<O, R2> {
        SessionRuntime {
            oracle: self.oracle,
            memory: self.memory,
            retriever,
            abstract_text: self.abstract_text,
            k,
        }
    }

    pub fn memory(&self) -> &Arc<ConversationMemory> {
        &self.memory
    }

    /// Abstract placed in the system prompt of every later turn.
    pub async fn set_abstract(&self, text: impl Into<String>) {
        *self.abstract_text.write().await = text.into();
    }

    pub async fn close(&self, session_id: &SessionId) {
        self.memory.close(session_id).await;
        tracing::info!(session_id = %session_id, "session closed");
    }

    /// Forget a session once any turn on it has settled.
    pub async fn evict(&self, session_id: &SessionId) -> bool {
        self.memory.evict(session_id).await
    }
}

impl<O, R> SessionRuntime<O, R>
where
    O: TextOracle + 'static,
    R: Retriever + 'static,
{
    /// One blocking turn. On any error nothing is appended.
    #[tracing::instrument(name = "session_ask", skip_all, fields(session_id = %session_id))]
    pub async fn ask(&self, session_id: &SessionId, question: &str) -> Result<String, SessionError> {
        let mut slot = self.memory.lock(session_id).await;
        let prompt = self.begin_turn(&mut slot, session_id, question).await?;
        let answer = self.oracle.generate(&prompt).await?;
        commit(&self.memory, &mut slot, session_id, question, &answer)?;
        Ok(answer)
    }

    /// [`ask`](Self::ask), abandoned with [`SessionError::Cancelled`] as soon
    /// as `cancel` fires.
    pub async fn ask_cancellable(
        &self,
        session_id: &SessionId,
        question: &str,
        cancel: &CancellationToken,
    ) -> Result<String, SessionError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::info!(session_id = %session_id, "turn cancelled");
                Err(SessionError::Cancelled)
            }
            result = self.ask(session_id, question) => result,
        }
    }

    /// A streamed turn.
    ///
    /// Nothing happens until the stream is polled. The session stays locked
    /// while the stream is alive. The turn is committed only once the
    /// stream has been drained to its end; dropping it early, an oracle
    /// error, or `cancel` firing (which yields [`SessionError::Cancelled`])
    /// leave memory untouched.
    pub fn ask_stream(
        &self,
        session_id: SessionId,
        question: String,
        cancel: CancellationToken,
    ) -> SessionStream {
        let oracle = self.oracle.clone();
        let memory = self.memory.clone();
        let retriever = self.retriever.clone();
        let abstract_text = self.abstract_text.clone();
        let k = self.k;

        Box::pin(async_stream::stream! {
            let mut slot = memory.lock(&session_id).await;
            let prompt = match compose(&memory, &mut slot, &session_id, retriever.as_ref(), &abstract_text, k, &question).await {
                Ok(prompt) => prompt,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };

            let mut fragments = oracle.generate_stream(prompt);
            let mut answer = String::new();
            loop {
                let next = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => Err(SessionError::Cancelled),
                    next = fragments.next() => Ok(next),
                };
                match next {
                    Ok(Some(Ok(fragment))) => {
                        answer.push_str(&fragment);
                        yield Ok(fragment);
                    }
                    Ok(Some(Err(e))) => {
                        tracing::warn!(session_id = %session_id, error = %e, "stream failed; turn discarded");
                        yield Err(e.into());
                        return;
                    }
                    Ok(None) => break,
                    Err(e) => {
                        tracing::info!(session_id = %session_id, "streamed turn cancelled");
                        yield Err(e);
                        return;
                    }
                }
            }

            if let Err(e) = commit(&memory, &mut slot, &session_id, &question, &answer) {
                yield Err(e);
            }
        })
    }

    async fn begin_turn(
        &self,
        slot: &mut SessionSlot,
        session_id: &SessionId,
        question: &str,
    ) -> Result<Prompt, SessionError> {
        compose(
            &self.memory,
            slot,
            session_id,
            self.retriever.as_ref(),
            &self.abstract_text,
            self.k,
            question,
        )
        .await
    }
}

/// Build the chat prompt: abstract and retrieved context in the system
/// message, trimmed history, then the question.
async fn compose<R: Retriever>(
    memory: &ConversationMemory,
    slot: &mut SessionSlot,
    session_id: &SessionId,
    retriever: &R,
    abstract_text: &RwLock<String>,
    k: usize,
    question: &str,
) -> Result<Prompt, SessionError> {
    if slot.status == SessionStatus::Closed {
        return Err(SessionError::Closed(session_id.to_string()));
    }

    let passages = if k == 0 {
        Vec::new()
    } else {
        retriever.similarity_search(question, k).await?
    };
    let history = memory.trimmed_locked(slot);
    tracing::debug!(
        session_id = %session_id,
        passages = passages.len(),
        history = history.len(),
        history_tokens = history.total_tokens(),
        "composed turn"
    );

    Ok(Prompt::new(CHAT)
        .var("abstract", abstract_text.read().await.as_str())
        .var("context", format_context(&passages))
        .var("input", question)
        .with_history(history.to_messages()))
}

fn commit(
    memory: &ConversationMemory,
    slot: &mut SessionSlot,
    session_id: &SessionId,
    question: &str,
    answer: &str,
) -> Result<(), SessionError> {
    memory.append_locked(slot, session_id, MessageRole::User, question.to_string())?;
    memory.append_locked(slot, session_id, MessageRole::Assistant, answer.to_string())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use lectern_types::document::Passage;
    use lectern_types::error::RetrievalError;
    use lectern_types::llm::LlmError;

    use crate::llm::token_counter::CharRatioCounter;
    use crate::memory::TrimPolicy;
    use crate::testing::StubOracle;

    use super::*;

    fn memory() -> Arc<ConversationMemory> {
        Arc::new(ConversationMemory::new(
            Arc::new(CharRatioCounter::default()),
            TrimPolicy::new(1000),
        ))
    }

    fn echo() -> StubOracle {
        StubOracle::new(|p| Ok(format!("re: {}", p.vars["input"])))
    }

    struct FixedRetriever;

    impl Retriever for FixedRetriever {
        async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<Passage>, RetrievalError> {
            Ok((0..k)
                .map(|i| Passage {
                    chunk_index: i,
                    source: None,
                    page_range: None,
                    text: format!("{query}-{i}"),
                    score: 1.0,
                })
                .collect())
        }
    }

    struct BrokenRetriever;

    impl Retriever for BrokenRetriever {
        async fn similarity_search(&self, _: &str, _: usize) -> Result<Vec<Passage>, RetrievalError> {
            Err(RetrievalError::Backend("index offline".to_string()))
        }
    }

    #[tokio::test]
    async fn test_ask_commits_user_then_assistant() {
        let runtime = SessionRuntime::new(Arc::new(echo()), memory());
        let id = SessionId::new("s1");

        let answer = runtime.ask(&id, "hello").await.unwrap();
        assert_eq!(answer, "re: hello");

        let history = runtime.memory().get_or_create(&id).await;
        let roles: Vec<_> = history.messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![MessageRole::User, MessageRole::Assistant]);
        assert_eq!(history.messages()[1].content, "re: hello");
        assert_eq!(runtime.memory().status(&id).await, SessionStatus::Active);
    }

    #[tokio::test]
    async fn test_prompt_carries_history_context_and_abstract() {
        let oracle = Arc::new(echo());
        let runtime = SessionRuntime::new(oracle.clone(), memory()).with_retriever(Arc::new(FixedRetriever), 2);
        runtime.set_abstract("About graphs.").await;
        let id = SessionId::new("s1");

        runtime.ask(&id, "first").await.unwrap();
        runtime.ask(&id, "second").await.unwrap();

        let second = &oracle.calls()[1];
        assert_eq!(second.vars["abstract"], "About graphs.");
        assert_eq!(second.vars["context"], "second-0\n\nsecond-1");
        assert_eq!(second.history.len(), 2);
        assert_eq!(second.history[0].content, "first");
        let rendered = second.render().unwrap();
        assert_eq!(rendered.messages.len(), 3);
        assert!(rendered.system.unwrap().contains("second-1"));
    }

    #[tokio::test]
    async fn test_oracle_error_commits_nothing() {
        let runtime = SessionRuntime::new(
            Arc::new(StubOracle::new(|_| Err(LlmError::Timeout(5)))),
            memory(),
        );
        let id = SessionId::new("s1");
        let err = runtime.ask(&id, "hello").await.unwrap_err();
        assert!(matches!(err, SessionError::Oracle(LlmError::Timeout(5))));
        assert!(runtime.memory().get_or_create(&id).await.is_empty());
    }

    #[tokio::test]
    async fn test_retrieval_error_commits_nothing() {
        let oracle = Arc::new(echo());
        let runtime = SessionRuntime::new(oracle.clone(), memory()).with_retriever(Arc::new(BrokenRetriever), 3);
        let id = SessionId::new("s1");
        let err = runtime.ask(&id, "hello").await.unwrap_err();
        assert!(matches!(err, SessionError::Retrieval(_)));
        assert_eq!(oracle.call_count(), 0);
    }

    #[tokio::test]
    async fn test_closed_session_rejects_ask() {
        let oracle = Arc::new(echo());
        let runtime = SessionRuntime::new(oracle.clone(), memory());
        let id = SessionId::new("s1");
        runtime.ask(&id, "hello").await.unwrap();
        runtime.close(&id).await;

        let err = runtime.ask(&id, "again").await.unwrap_err();
        assert!(matches!(err, SessionError::Closed(_)));
        assert_eq!(oracle.call_count(), 1);
    }

    #[tokio::test]
    async fn test_evict_forgets_session() {
        let runtime = SessionRuntime::new(Arc::new(echo()), memory());
        let id = SessionId::new("s1");
        runtime.ask(&id, "hello").await.unwrap();
        assert!(runtime.evict(&id).await);
        assert!(!runtime.evict(&id).await);
        assert_eq!(runtime.memory().status(&id).await, SessionStatus::Empty);
    }

    #[tokio::test]
    async fn test_cancelled_ask_commits_nothing() {
        let oracle = Arc::new(echo().with_delay(Duration::from_secs(30)));
        let runtime = SessionRuntime::new(oracle, memory());
        let id = SessionId::new("s1");
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = runtime.ask_cancellable(&id, "hello", &cancel).await.unwrap_err();
        assert!(matches!(err, SessionError::Cancelled));
        assert!(runtime.memory().get_or_create(&id).await.is_empty());
    }

    #[tokio::test]
    async fn test_stream_commits_after_drain() {
        let runtime = SessionRuntime::new(Arc::new(echo()), memory());
        let id = SessionId::new("s1");

        let mut stream = runtime.ask_stream(id.clone(), "one two".to_string(), CancellationToken::new());
        let mut answer = String::new();
        while let Some(fragment) = stream.next().await {
            answer.push_str(&fragment.unwrap());
        }
        drop(stream);

        assert_eq!(answer, "re: one two");
        let history = runtime.memory().get_or_create(&id).await;
        assert_eq!(history.len(), 2);
        assert_eq!(history.messages()[1].content, "re: one two");
    }

    #[tokio::test]
    async fn test_stream_dropped_early_commits_nothing() {
        let runtime = SessionRuntime::new(Arc::new(echo()), memory());
        let id = SessionId::new("s1");

        let mut stream = runtime.ask_stream(id.clone(), "one two three".to_string(), CancellationToken::new());
        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first, "re: ");
        drop(stream);

        assert!(runtime.memory().get_or_create(&id).await.is_empty());
    }

    #[tokio::test]
    async fn test_stream_cancel_mid_turn() {
        let runtime = SessionRuntime::new(Arc::new(echo().with_hanging_stream()), memory());
        let id = SessionId::new("s1");
        let cancel = CancellationToken::new();

        let mut stream = runtime.ask_stream(id.clone(), "hello".to_string(), cancel.clone());
        assert!(stream.next().await.unwrap().is_ok());
        cancel.cancel();
        let err = stream.next().await.unwrap().unwrap_err();
        assert!(matches!(err, SessionError::Cancelled));
        assert!(stream.next().await.is_none());
        drop(stream);

        assert!(runtime.memory().get_or_create(&id).await.is_empty());
    }

    #[tokio::test]
    async fn test_stream_error_commits_nothing() {
        let runtime = SessionRuntime::new(
            Arc::new(StubOracle::new(|_| Err(LlmError::Timeout(1)))),
            memory(),
        );
        let id = SessionId::new("s1");
        let mut stream = runtime.ask_stream(id.clone(), "hi".to_string(), CancellationToken::new());
        assert!(matches!(
            stream.next().await.unwrap(),
            Err(SessionError::Oracle(LlmError::Timeout(1)))
        ));
        drop(stream);
        assert!(runtime.memory().get_or_create(&id).await.is_empty());
    }

    #[tokio::test]
    async fn test_turns_on_one_session_are_serialized() {
        let oracle = Arc::new(echo().with_delay(Duration::from_millis(20)));
        let runtime = Arc::new(SessionRuntime::new(oracle.clone(), memory()));
        let id = SessionId::new("shared");

        let mut handles = Vec::new();
        for i in 0..4 {
            let runtime = runtime.clone();
            let id = id.clone();
            handles.push(tokio::spawn(async move { runtime.ask(&id, &format!("q{i}")).await }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(oracle.max_in_flight(), 1);
        let history = runtime.memory().get_or_create(&id).await;
        assert_eq!(history.len(), 8);
        // Every user message is directly followed by its own answer.
        for pair in history.messages().chunks(2) {
            assert_eq!(pair[1].content, format!("re: {}", pair[0].content));
        }
    }

    #[tokio::test]
    async fn test_distinct_sessions_run_concurrently() {
        let oracle = Arc::new(echo().with_delay(Duration::from_millis(50)));
        let runtime = Arc::new(SessionRuntime::new(oracle.clone(), memory()));

        let a = {
            let runtime = runtime.clone();
            tokio::spawn(async move { runtime.ask(&SessionId::new("a"), "x").await })
        };
        let b = {
            let runtime = runtime.clone();
            tokio::spawn(async move { runtime.ask(&SessionId::new("b"), "y").await })
        };
        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();
        assert_eq!(oracle.max_in_flight(), 2);
    }
}
