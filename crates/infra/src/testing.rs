//! Generator doubles shared by the unit and integration tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use retone_ai::{ChatMessage, GenerationError, GenerationOptions, Generator};

/// Replies `{"rewritten_text": "<prefix> #<n>"}` with a per-call counter, after
/// an optional delay and an optional number of leading failures.
pub struct ScriptedGenerator {
    prefix: String,
    delay: Duration,
    fail_first: AtomicU32,
    calls: AtomicU32,
    conversations: Mutex<Vec<Vec<ChatMessage>>>,
    options: Mutex<Vec<GenerationOptions>>,
}

impl ScriptedGenerator {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            delay: Duration::ZERO,
            fail_first: AtomicU32::new(0),
            calls: AtomicU32::new(0),
            conversations: Mutex::new(Vec::new()),
            options: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn failing_first(self, times: u32) -> Self {
        self.fail_first.store(times, Ordering::SeqCst);
        self
    }

    pub fn always_failing(self) -> Self {
        self.failing_first(u32::MAX)
    }

    /// Generation calls made so far, failed ones included.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn conversations(&self) -> Vec<Vec<ChatMessage>> {
        self.conversations.lock().unwrap().clone()
    }

    pub fn options(&self) -> Vec<GenerationOptions> {
        self.options.lock().unwrap().clone()
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(
        &self,
        messages: &[ChatMessage],
        options: &GenerationOptions,
    ) -> Result<String, GenerationError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.conversations.lock().unwrap().push(messages.to_vec());
        self.options.lock().unwrap().push(*options);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let failures = self.fail_first.load(Ordering::SeqCst);
        if failures > 0 {
            self.fail_first.store(failures - 1, Ordering::SeqCst);
            return Err(GenerationError::Status {
                status: 503,
                body: "upstream unavailable".to_string(),
            });
        }

        Ok(serde_json::json!({ "rewritten_text": format!("{} #{}", self.prefix, n) }).to_string())
    }
}
