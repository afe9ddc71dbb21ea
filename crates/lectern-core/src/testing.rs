//! Stub oracles shared by unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures_util::StreamExt;

use lectern_types::llm::LlmError;

use crate::oracle::{TextOracle, TextStream};
use crate::prompt::Prompt;

type Respond = Box<dyn Fn(&Prompt) -> Result<String, LlmError> + Send + Sync>;

/// Answers every prompt with a closure and records what it was asked.
pub(crate) struct StubOracle {
    respond: Respond,
    calls: Mutex<Vec<Prompt>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    delay: Option<Duration>,
    hang_stream: bool,
}

impl StubOracle {
    pub(crate) fn new(
        respond: impl Fn(&Prompt) -> Result<String, LlmError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            respond: Box::new(respond),
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            delay: None,
            hang_stream: false,
        }
    }

    /// Returns the given outputs in order, then an error.
    pub(crate) fn scripted(outputs: Vec<&str>) -> Self {
        let queue: Mutex<VecDeque<String>> =
            Mutex::new(outputs.into_iter().map(str::to_string).collect());
        Self::new(move |_| {
            queue
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| LlmError::Provider {
                    message: "script exhausted".to_string(),
                })
        })
    }

    /// Always answers with `text`.
    pub(crate) fn constant(text: &str) -> Self {
        let text = text.to_string();
        Self::new(move |_| Ok(text.clone()))
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Streams yield their first fragment and then never finish.
    pub(crate) fn with_hanging_stream(mut self) -> Self {
        self.hang_stream = true;
        self
    }

    pub(crate) fn calls(&self) -> Vec<Prompt> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub(crate) fn calls_named(&self, name: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.name() == name)
            .count()
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl TextOracle for StubOracle {
    async fn generate(&self, prompt: &Prompt) -> Result<String, LlmError> {
        self.calls.lock().unwrap().push(prompt.clone());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        (self.respond)(prompt)
    }

    fn generate_stream(&self, prompt: Prompt) -> TextStream {
        self.calls.lock().unwrap().push(prompt.clone());
        match (self.respond)(&prompt) {
            Ok(text) => {
                let parts: Vec<Result<String, LlmError>> = text
                    .split_inclusive(' ')
                    .map(|s| Ok(s.to_string()))
                    .collect();
                if self.hang_stream {
                    let first: Vec<_> = parts.into_iter().take(1).collect();
                    Box::pin(futures_util::stream::iter(first).chain(futures_util::stream::pending()))
                } else {
                    Box::pin(futures_util::stream::iter(parts))
                }
            }
            Err(e) => Box::pin(futures_util::stream::once(async move { Err(e) })),
        }
    }
}
