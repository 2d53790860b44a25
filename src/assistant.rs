//! Debate-mentor completion client
//!
//! Talks to an OpenAI-compatible chat completion endpoint. The transport is
//! a trait so tests drive the retry logic with a scripted fake; the browser
//! transport lives behind `cfg(target_arch = "wasm32")` and uses `fetch`.
//!
//! The service requires strictly alternating user/assistant turns after the
//! system message, so the outgoing history is sanitized before every send.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default completion endpoint and model
pub const DEFAULT_API_URL: &str = "https://api.sarvam.ai/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "sarvam-m";

/// Mentor persona sent as the system message
pub const SYSTEM_PROMPT: &str = "You are ArgueAI, an expert debate assistant for students. \
Only respond to questions about debating formats (BP, AP, MUN), argumentation, rebuttal \
techniques, logical fallacies, time management, judging criteria, and speaking tips. \
Politely refuse unrelated topics by saying: \"I'm your debate mentor! Try asking me about \
rebuttals, speaker roles, or delivery tips.\"\n\nKeep responses concise but informative, \
typically 2-4 sentences unless a longer explanation is needed.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One turn of the mentor conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("no API key configured")]
    MissingApiKey,
    #[error("request failed: {0}")]
    Network(String),
    #[error("service returned status {0}")]
    Status(u16),
    #[error("completion response carried no content")]
    EmptyCompletion,
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Outgoing request body (OpenAI-compatible)
#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

/// The slice of the response we care about; unknown fields are ignored
#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: String,
}

/// Parse a completion response body into its first choice's text
fn parse_completion(body: &str) -> Result<String, AssistantError> {
    let response: CompletionResponse =
        serde_json::from_str(body).map_err(|e| AssistantError::Malformed(e.to_string()))?;
    let content = response
        .choices
        .into_iter()
        .next()
        .map(|c| c.message.content)
        .unwrap_or_default();
    if content.is_empty() {
        return Err(AssistantError::EmptyCompletion);
    }
    Ok(content)
}

/// Build the outgoing message list: system prompt (optionally extended with
/// the current learning context), then the history filtered to strictly
/// alternating roles, ending on a user turn.
pub fn build_messages(history: &[ChatMessage], context: Option<&str>) -> Vec<ChatMessage> {
    let system = match context {
        Some(ctx) => format!("{SYSTEM_PROMPT}\n\nCurrent learning context: {ctx}"),
        None => SYSTEM_PROMPT.to_string(),
    };
    let mut messages = vec![ChatMessage::system(system)];

    let mut last_role = Role::System;
    for message in history {
        // Skip turns that repeat the previous role
        if message.role == last_role {
            continue;
        }
        if matches!(message.role, Role::User | Role::Assistant) {
            messages.push(message.clone());
            last_role = message.role;
        }
    }

    // The service expects the final turn to come from the user
    if messages.len() > 1 && messages.last().map(|m| m.role) == Some(Role::Assistant) {
        messages.pop();
    }

    messages
}

/// Bounded retry with exponential backoff
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
        }
    }
}

impl RetryPolicy {
    /// Delay after the given 0-based failed attempt
    pub fn delay_ms(&self, attempt: u32) -> u64 {
        self.base_delay_ms * 2u64.pow(attempt)
    }
}

/// Something that can deliver a sanitized message list to the service and
/// wait between attempts.
#[allow(async_fn_in_trait)]
pub trait CompletionTransport {
    async fn send(&self, messages: &[ChatMessage]) -> Result<String, AssistantError>;
    async fn sleep(&self, ms: u64);
}

/// The mentor client. One instance lives for the application session; there
/// is no global singleton.
pub struct MentorClient<T> {
    transport: T,
    retry: RetryPolicy,
}

impl<T: CompletionTransport> MentorClient<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(transport: T, retry: RetryPolicy) -> Self {
        Self { transport, retry }
    }

    /// Send the conversation and return the mentor's reply, retrying
    /// transient failures with exponential backoff.
    pub async fn get_completion(
        &self,
        history: &[ChatMessage],
        context: Option<&str>,
    ) -> Result<String, AssistantError> {
        let messages = build_messages(history, context);

        let mut last_error = None;
        for attempt in 0..self.retry.max_attempts {
            match self.transport.send(&messages).await {
                Ok(text) => return Ok(text),
                Err(err) => {
                    log::warn!(
                        "completion attempt {}/{} failed: {err}",
                        attempt + 1,
                        self.retry.max_attempts
                    );
                    last_error = Some(err);
                    if attempt + 1 < self.retry.max_attempts {
                        self.transport.sleep(self.retry.delay_ms(attempt)).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or(AssistantError::Network("no attempts were made".into())))
    }
}

/// Browser transport on `fetch`
#[cfg(target_arch = "wasm32")]
pub mod fetch {
    use wasm_bindgen::{JsCast, JsValue};
    use wasm_bindgen_futures::JsFuture;
    use web_sys::{Request, RequestInit, Response};

    use super::*;

    /// `fetch`-backed transport. The API key comes from the build
    /// environment; without one the chat widget stays disabled.
    pub struct FetchTransport {
        api_url: String,
        api_key: String,
        model: String,
    }

    impl FetchTransport {
        pub fn new(api_url: String, api_key: String, model: String) -> Self {
            Self {
                api_url,
                api_key,
                model,
            }
        }

        /// Build from the compile-time `SARVAM_API_KEY` environment variable
        pub fn from_env() -> Result<Self, AssistantError> {
            let api_key = option_env!("SARVAM_API_KEY").ok_or(AssistantError::MissingApiKey)?;
            Ok(Self::new(
                DEFAULT_API_URL.to_string(),
                api_key.to_string(),
                DEFAULT_MODEL.to_string(),
            ))
        }
    }

    fn js_err(err: JsValue) -> AssistantError {
        AssistantError::Network(format!("{err:?}"))
    }

    impl CompletionTransport for FetchTransport {
        async fn send(&self, messages: &[ChatMessage]) -> Result<String, AssistantError> {
            let body = serde_json::to_string(&CompletionRequest {
                model: &self.model,
                messages,
                max_tokens: 500,
                temperature: 0.7,
                stream: false,
            })
            .map_err(|e| AssistantError::Malformed(e.to_string()))?;

            let opts = RequestInit::new();
            opts.set_method("POST");
            opts.set_body(&JsValue::from_str(&body));

            let request =
                Request::new_with_str_and_init(&self.api_url, &opts).map_err(js_err)?;
            request
                .headers()
                .set("Content-Type", "application/json")
                .map_err(js_err)?;
            request
                .headers()
                .set("Authorization", &format!("Bearer {}", self.api_key))
                .map_err(js_err)?;

            let window = web_sys::window()
                .ok_or_else(|| AssistantError::Network("no window".into()))?;
            let response: Response = JsFuture::from(window.fetch_with_request(&request))
                .await
                .map_err(js_err)?
                .dyn_into()
                .map_err(js_err)?;

            if !response.ok() {
                return Err(AssistantError::Status(response.status()));
            }

            let text = JsFuture::from(response.text().map_err(js_err)?)
                .await
                .map_err(js_err)?
                .as_string()
                .ok_or_else(|| AssistantError::Malformed("non-text body".into()))?;

            parse_completion(&text)
        }

        async fn sleep(&self, ms: u64) {
            let promise = js_sys::Promise::new(&mut |resolve, _reject| {
                if let Some(window) = web_sys::window() {
                    let _ = window.set_timeout_with_callback_and_timeout_and_arguments_0(
                        &resolve, ms as i32,
                    );
                }
            });
            let _ = JsFuture::from(promise).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use futures::executor::block_on;

    use super::*;

    #[test]
    fn test_build_messages_starts_with_system() {
        let messages = build_messages(&[ChatMessage::user("hi")], None);
        assert_eq!(messages[0].role, Role::System);
        assert!(messages[0].content.contains("ArgueAI"));
        assert_eq!(messages[1], ChatMessage::user("hi"));
    }

    #[test]
    fn test_build_messages_appends_context() {
        let messages = build_messages(&[ChatMessage::user("hi")], Some("rebuttals"));
        assert!(messages[0].content.ends_with("Current learning context: rebuttals"));
    }

    #[test]
    fn test_build_messages_enforces_alternation() {
        let history = vec![
            ChatMessage::user("one"),
            ChatMessage::user("two"),
            ChatMessage::assistant("reply"),
            ChatMessage::system("sneaky"),
            ChatMessage::assistant("again"),
            ChatMessage::user("three"),
        ];
        let messages = build_messages(&history, None);
        let roles: Vec<Role> = messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::System, Role::User, Role::Assistant, Role::User]
        );
        assert_eq!(messages[1].content, "one");
        assert_eq!(messages[3].content, "three");
    }

    #[test]
    fn test_build_messages_drops_trailing_assistant() {
        let history = vec![
            ChatMessage::user("question"),
            ChatMessage::assistant("answer"),
        ];
        let messages = build_messages(&history, None);
        assert_eq!(messages.last().unwrap().role, Role::User);
    }

    #[test]
    fn test_retry_delays_double() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_ms(0), 1000);
        assert_eq!(policy.delay_ms(1), 2000);
        assert_eq!(policy.delay_ms(2), 4000);
    }

    #[test]
    fn test_parse_completion() {
        let body = r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"A warrant links evidence to the claim."},"finish_reason":"stop"}]}"#;
        assert_eq!(
            parse_completion(body).unwrap(),
            "A warrant links evidence to the claim."
        );
        assert!(matches!(
            parse_completion(r#"{"choices":[]}"#),
            Err(AssistantError::EmptyCompletion)
        ));
        assert!(matches!(
            parse_completion("not json"),
            Err(AssistantError::Malformed(_))
        ));
    }

    /// Transport that replays a script of outcomes and records sleeps
    struct ScriptedTransport {
        outcomes: RefCell<Vec<Result<String, AssistantError>>>,
        sleeps: RefCell<Vec<u64>>,
        sends: RefCell<u32>,
    }

    impl ScriptedTransport {
        fn new(outcomes: Vec<Result<String, AssistantError>>) -> Self {
            Self {
                outcomes: RefCell::new(outcomes),
                sleeps: RefCell::new(Vec::new()),
                sends: RefCell::new(0),
            }
        }
    }

    impl CompletionTransport for ScriptedTransport {
        async fn send(&self, _messages: &[ChatMessage]) -> Result<String, AssistantError> {
            *self.sends.borrow_mut() += 1;
            self.outcomes.borrow_mut().remove(0)
        }

        async fn sleep(&self, ms: u64) {
            self.sleeps.borrow_mut().push(ms);
        }
    }

    #[test]
    fn test_retries_then_succeeds() {
        let transport = ScriptedTransport::new(vec![
            Err(AssistantError::Status(503)),
            Err(AssistantError::Network("timeout".into())),
            Ok("hello".into()),
        ]);
        let client = MentorClient::new(transport);
        let reply =
            block_on(client.get_completion(&[ChatMessage::user("hi")], None)).unwrap();
        assert_eq!(reply, "hello");
        assert_eq!(*client.transport.sends.borrow(), 3);
        // Backoff between failed attempts, none after success
        assert_eq!(*client.transport.sleeps.borrow(), vec![1000, 2000]);
    }

    #[test]
    fn test_retries_exhaust() {
        let transport = ScriptedTransport::new(vec![
            Err(AssistantError::Status(500)),
            Err(AssistantError::Status(500)),
            Err(AssistantError::Status(500)),
        ]);
        let client = MentorClient::new(transport);
        let err = block_on(client.get_completion(&[ChatMessage::user("hi")], None));
        assert!(matches!(err, Err(AssistantError::Status(500))));
        assert_eq!(*client.transport.sends.borrow(), 3);
        assert_eq!(*client.transport.sleeps.borrow(), vec![1000, 2000]);
    }

    #[test]
    fn test_first_try_success_never_sleeps() {
        let transport = ScriptedTransport::new(vec![Ok("fast".into())]);
        let client = MentorClient::new(transport);
        let reply =
            block_on(client.get_completion(&[ChatMessage::user("hi")], None)).unwrap();
        assert_eq!(reply, "fast");
        assert!(client.transport.sleeps.borrow().is_empty());
    }
}
