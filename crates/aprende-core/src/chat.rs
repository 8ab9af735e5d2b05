//! The chat widget state machine
//!
//! A [`ChatWidget`] owns one [`Conversation`] and the client used to answer
//! it. Submitting does not run the request itself: it hands back a
//! [`PendingReply`] that the caller drives (the TUI spawns it, tests and the
//! one-shot CLI await it) and feeds back through [`ChatWidget::finish`].
//! Between the two calls the conversation is awaiting and further
//! submissions are ignored.

use std::sync::Arc;
use futures_util::future::BoxFuture;
use tracing::{debug, error, info, warn};

use crate::ai::CompletionService;
use crate::credentials::CredentialStore;
use crate::error::CompletionError;
use crate::format::format_reply;
use crate::state::{ChatMessage, Conversation};

pub type TurnId = u64;

const FAILURE_DESCRIPTION: &str =
    "Failed to get response from Gemini. Please check your API key and try again.";
const MISSING_KEY_DESCRIPTION: &str =
    "No Gemini API key configured. Set GEMINI_API_KEY or run `aprende key set <KEY>`.";

/// Completion backend plus the store its API key is read from
#[derive(Clone)]
pub struct ChatClient {
    service: Arc<dyn CompletionService>,
    credentials: Arc<dyn CredentialStore>,
}

impl ChatClient {
    pub fn new(service: Arc<dyn CompletionService>, credentials: Arc<dyn CredentialStore>) -> Self {
        Self { service, credentials }
    }

    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        // Read at call time so a key stored after mounting is picked up
        let api_key = self.credentials.get().ok_or(CompletionError::MissingCredential)?;
        self.service.complete(&api_key, prompt).await
    }

    fn evict_credential(&self) {
        match self.credentials.clear() {
            Ok(()) => info!("evicted rejected API key"),
            Err(e) => warn!(error = %e, "failed to clear rejected API key"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Error,
}

/// A dismissable message for the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub description: String,
    pub level: NotificationLevel,
}

impl Notification {
    pub fn info(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            level: NotificationLevel::Info,
        }
    }

    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            level: NotificationLevel::Error,
        }
    }

    fn from_failure(err: &CompletionError) -> Self {
        let description = match err {
            CompletionError::MissingCredential => MISSING_KEY_DESCRIPTION,
            _ => FAILURE_DESCRIPTION,
        };
        Self::error("Error", description)
    }
}

/// An in-flight request for one turn
pub struct PendingReply {
    turn: TurnId,
    request: BoxFuture<'static, Result<String, CompletionError>>,
}

impl PendingReply {
    pub fn turn(&self) -> TurnId {
        self.turn
    }

    pub async fn resolve(self) -> TurnOutcome {
        TurnOutcome {
            turn: self.turn,
            result: self.request.await,
        }
    }
}

/// Result of a [`PendingReply`], to be handed back to [`ChatWidget::finish`]
#[derive(Debug)]
pub struct TurnOutcome {
    pub turn: TurnId,
    pub result: Result<String, CompletionError>,
}

pub struct ChatWidget {
    conversation: Conversation,
    client: ChatClient,
    next_turn: TurnId,
    pending: Option<TurnId>,
}

impl ChatWidget {
    pub fn new(client: ChatClient) -> Self {
        Self {
            conversation: Conversation::new(),
            client,
            next_turn: 0,
            pending: None,
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        self.conversation.messages()
    }

    pub fn draft(&self) -> &str {
        self.conversation.draft()
    }

    pub fn is_awaiting(&self) -> bool {
        self.conversation.is_awaiting()
    }

    /// Draft editing stays allowed while a reply is pending
    pub fn set_draft(&mut self, draft: impl Into<String>) {
        self.conversation.set_draft(draft);
    }

    /// Submit the current draft
    pub fn submit(&mut self) -> Option<PendingReply> {
        let text = self.conversation.draft().to_string();
        self.submit_text(&text)
    }

    /// Start a turn for `text`.
    ///
    /// Returns `None` without touching any state when the trimmed text is
    /// empty or a reply is still pending.
    pub fn submit_text(&mut self, text: &str) -> Option<PendingReply> {
        let prompt = text.trim();
        if prompt.is_empty() {
            return None;
        }
        if self.conversation.is_awaiting() {
            debug!(pending = ?self.pending, "submission ignored while awaiting a reply");
            return None;
        }

        self.conversation.append_message(ChatMessage::user(prompt));
        self.conversation.set_draft("");
        self.conversation.set_awaiting(true);

        self.next_turn += 1;
        let turn = self.next_turn;
        self.pending = Some(turn);
        info!(turn, prompt_chars = prompt.chars().count(), "submitting prompt");

        let client = self.client.clone();
        let prompt = prompt.to_string();
        Some(PendingReply {
            turn,
            request: Box::pin(async move { client.complete(&prompt).await }),
        })
    }

    /// Apply the outcome of the pending turn.
    ///
    /// Outcomes for any other turn are dropped. Returns the notification to
    /// show when the request failed.
    pub fn finish(&mut self, outcome: TurnOutcome) -> Option<Notification> {
        if self.pending != Some(outcome.turn) {
            debug!(turn = outcome.turn, pending = ?self.pending, "dropping stale reply");
            return None;
        }
        self.pending = None;

        let notification = match outcome.result {
            Ok(text) => {
                debug!(turn = outcome.turn, reply_chars = text.chars().count(), "reply received");
                self.conversation.append_message(ChatMessage::assistant(format_reply(&text)));
                None
            }
            Err(err) => {
                error!(turn = outcome.turn, error = %err, "completion failed");
                if err.is_credential_rejection() {
                    self.client.evict_credential();
                }
                Some(Notification::from_failure(&err))
            }
        };

        self.conversation.set_awaiting(false);
        notification
    }

    /// Submit `text` and wait for the reply in place.
    ///
    /// Returns `Err(None)` when the submission was ignored.
    pub async fn ask(&mut self, text: &str) -> Result<(), Option<Notification>> {
        let pending = self.submit_text(text).ok_or(None::<Notification>)?;
        let outcome = pending.resolve().await;
        match self.finish(outcome) {
            Some(notification) => Err(Some(notification)),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::MemoryCredentials;
    use crate::format::Reply;
    use crate::state::{ChatRole, Content, GREETING};
    use async_trait::async_trait;
    use std::sync::Mutex;

    enum Script {
        Reply(&'static str),
        RejectKey,
        Fail,
    }

    struct ScriptedService {
        script: Script,
        calls: Mutex<Vec<(String, String)>>,
    }

    impl ScriptedService {
        fn new(script: Script) -> Arc<Self> {
            Arc::new(Self {
                script,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<(String, String)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CompletionService for ScriptedService {
        async fn complete(&self, api_key: &str, prompt: &str) -> Result<String, CompletionError> {
            self.calls.lock().unwrap().push((api_key.to_string(), prompt.to_string()));
            match self.script {
                Script::Reply(text) => Ok(text.to_string()),
                Script::RejectKey => Err(CompletionError::InvalidCredential(
                    "API key not valid. Please pass a valid API key.".to_string(),
                )),
                Script::Fail => Err(CompletionError::Rejected {
                    status: 500,
                    message: "internal".to_string(),
                }),
            }
        }
    }

    fn widget(
        script: Script,
        key: Option<&str>,
    ) -> (ChatWidget, Arc<ScriptedService>, Arc<MemoryCredentials>) {
        let service = ScriptedService::new(script);
        let credentials = Arc::new(MemoryCredentials::new(key));
        let client = ChatClient::new(service.clone(), credentials.clone());
        (ChatWidget::new(client), service, credentials)
    }

    #[test]
    fn test_initial_state() {
        let (chat, _, _) = widget(Script::Fail, None);
        assert_eq!(chat.messages().len(), 1);
        assert_eq!(chat.messages()[0].role, ChatRole::Assistant);
        assert_eq!(chat.messages()[0].content, Content::Text(GREETING.to_string()));
        assert_eq!(chat.draft(), "");
        assert!(!chat.is_awaiting());
    }

    #[tokio::test]
    async fn test_blank_submission_is_noop() {
        let (mut chat, service, _) = widget(Script::Reply("unused"), Some("key"));
        chat.set_draft("   \t ");

        assert!(chat.submit().is_none());
        assert!(chat.submit_text("").is_none());

        assert_eq!(chat.messages().len(), 1);
        assert_eq!(chat.draft(), "   \t ");
        assert!(!chat.is_awaiting());
        assert!(service.calls().is_empty());
    }

    #[tokio::test]
    async fn test_successful_turn() {
        let (mut chat, service, _) = widget(Script::Reply("**Hi** there"), Some("key"));
        chat.set_draft("  Hello  ");

        let pending = chat.submit().expect("turn should start");
        assert_eq!(chat.messages().len(), 2);
        assert_eq!(chat.messages()[1], ChatMessage::user("Hello"));
        assert_eq!(chat.draft(), "");
        assert!(chat.is_awaiting());

        let outcome = pending.resolve().await;
        assert!(chat.finish(outcome).is_none());

        assert_eq!(chat.messages().len(), 3);
        assert_eq!(chat.messages()[2], ChatMessage::assistant(format_reply("**Hi** there")));
        assert!(!chat.is_awaiting());
        assert_eq!(service.calls(), vec![("key".to_string(), "Hello".to_string())]);
    }

    #[tokio::test]
    async fn test_rejected_key_is_evicted() {
        let (mut chat, service, credentials) = widget(Script::RejectKey, Some("bad-key"));

        let result = chat.ask("Hello").await;
        let notification = result.unwrap_err().expect("failure should notify");
        assert_eq!(notification.level, NotificationLevel::Error);
        assert_eq!(notification.description, FAILURE_DESCRIPTION);

        assert_eq!(chat.messages().len(), 2);
        assert_eq!(chat.messages()[1], ChatMessage::user("Hello"));
        assert!(!chat.is_awaiting());
        assert_eq!(credentials.get(), None);
        assert_eq!(service.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_other_failure_keeps_key() {
        let (mut chat, _, credentials) = widget(Script::Fail, Some("good-key"));

        let notification = chat.ask("Hello").await.unwrap_err();
        assert!(notification.is_some());
        assert_eq!(chat.messages().len(), 2);
        assert!(!chat.is_awaiting());
        assert_eq!(credentials.get().as_deref(), Some("good-key"));
    }

    #[tokio::test]
    async fn test_missing_key_fails_without_calling_service() {
        let (mut chat, service, _) = widget(Script::Reply("unused"), None);

        let notification = chat.ask("Hello").await.unwrap_err().unwrap();
        assert_eq!(notification.description, MISSING_KEY_DESCRIPTION);
        assert!(service.calls().is_empty());
        assert_eq!(chat.messages().len(), 2);
        assert!(!chat.is_awaiting());
    }

    #[tokio::test]
    async fn test_second_submission_is_gated_while_awaiting() {
        let (mut chat, service, _) = widget(Script::Reply("ok"), Some("key"));

        let pending = chat.submit_text("first").unwrap();
        chat.set_draft("second");
        assert!(chat.submit().is_none());
        assert_eq!(chat.draft(), "second");
        assert_eq!(chat.messages().len(), 2);

        chat.finish(pending.resolve().await);
        assert!(!chat.is_awaiting());
        assert_eq!(service.calls().len(), 1);

        let pending = chat.submit().expect("gate is released after the reply");
        chat.finish(pending.resolve().await);
        assert_eq!(chat.messages().len(), 5);
        assert_eq!(service.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_stale_outcome_is_dropped() {
        let (mut chat, _, _) = widget(Script::Reply("ok"), Some("key"));

        let pending = chat.submit_text("Hello").unwrap();
        let turn = pending.turn();
        let stale = TurnOutcome {
            turn: turn + 1,
            result: Ok("wrong".to_string()),
        };
        assert!(chat.finish(stale).is_none());
        assert!(chat.is_awaiting());
        assert_eq!(chat.messages().len(), 2);

        chat.finish(pending.resolve().await);
        let duplicate = TurnOutcome {
            turn,
            result: Err(CompletionError::MissingCredential),
        };
        assert!(chat.finish(duplicate).is_none());
        assert_eq!(chat.messages().len(), 3);
        assert!(!chat.is_awaiting());
    }

    #[tokio::test]
    async fn test_empty_reply_still_appends_one_message() {
        let (mut chat, _, _) = widget(Script::Reply(""), Some("key"));
        chat.ask("Hello").await.unwrap();
        assert_eq!(chat.messages().len(), 3);
        assert_eq!(chat.messages()[2].content, Content::Reply(Reply::default()));
    }
}
