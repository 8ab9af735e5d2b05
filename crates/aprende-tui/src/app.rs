use aprende_core::{ChatWidget, Cta, LandingPage, Notification, TurnOutcome};
use ratatui::layout::Rect;
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

use crate::tui::AppEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

/// Focusable elements of the page, in tab order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Cta(Cta),
    Input,
}

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub struct App {
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub focus: Focus,
    pub page: LandingPage,
    pub model: String,

    // Chat view state
    pub input_cursor: usize,
    pub chat_scroll: u16,
    pub chat_follow: bool,
    pub animation_frame: u8,

    // Newest last; only the newest is shown
    pub notifications: Vec<Notification>,
    missing_key_hint: bool,

    // Areas for mouse hit-testing (updated during render)
    pub cta_areas: Vec<(Cta, Rect)>,
    pub chat_area: Option<Rect>,
    pub input_area: Option<Rect>,
    pub send_area: Option<Rect>,

    events: UnboundedSender<AppEvent>,
}

impl App {
    pub fn new(
        page: LandingPage,
        model: &str,
        key_configured: bool,
        events: UnboundedSender<AppEvent>,
    ) -> Self {
        Self {
            should_quit: false,
            input_mode: InputMode::Normal,
            focus: Focus::Cta(Cta::GetStarted),
            page,
            model: model.to_string(),

            input_cursor: 0,
            chat_scroll: 0,
            chat_follow: true,
            animation_frame: 0,

            notifications: Vec::new(),
            missing_key_hint: !key_configured,

            cta_areas: Vec::new(),
            chat_area: None,
            input_area: None,
            send_area: None,

            events,
        }
    }

    pub fn chat(&self) -> Option<&ChatWidget> {
        self.page.chat()
    }

    pub fn is_awaiting(&self) -> bool {
        self.chat().map(|c| c.is_awaiting()).unwrap_or(false)
    }

    /// Activate a call-to-action; mounts the chat on first use
    pub fn activate(&mut self, cta: Cta) {
        if self.page.activate(cta) && self.missing_key_hint {
            self.notifications.push(Notification::info(
                "No API key",
                "Set GEMINI_API_KEY or run `aprende key set <KEY>` before sending a message.",
            ));
        }
        if self.page.is_chat_visible() {
            self.focus_input();
        }
    }

    pub fn focus_input(&mut self) {
        if self.page.is_chat_visible() {
            self.focus = Focus::Input;
            self.input_mode = InputMode::Editing;
            self.input_cursor = self.draft_len();
        }
    }

    fn focus_order(&self) -> Vec<Focus> {
        let mut order = vec![Focus::Cta(Cta::GetStarted)];
        if self.page.is_chat_visible() {
            order.push(Focus::Input);
        }
        order.push(Focus::Cta(Cta::StartLearning));
        order
    }

    pub fn focus_next(&mut self) {
        let order = self.focus_order();
        let i = order.iter().position(|f| *f == self.focus).unwrap_or(0);
        self.focus = order[(i + 1) % order.len()];
        self.input_mode = InputMode::Normal;
    }

    pub fn focus_prev(&mut self) {
        let order = self.focus_order();
        let i = order.iter().position(|f| *f == self.focus).unwrap_or(0);
        self.focus = order[(i + order.len() - 1) % order.len()];
        self.input_mode = InputMode::Normal;
    }

    /// Enter/click on the focused element
    pub fn activate_focused(&mut self) {
        match self.focus {
            Focus::Cta(cta) => self.activate(cta),
            Focus::Input => self.focus_input(),
        }
    }

    // Draft editing; the draft itself lives in the chat widget

    fn draft_len(&self) -> usize {
        self.chat().map(|c| c.draft().chars().count()).unwrap_or(0)
    }

    fn edit_draft(&mut self, edit: impl FnOnce(&mut String, &mut usize)) {
        let mut cursor = self.input_cursor;
        if let Some(chat) = self.page.chat_mut() {
            let mut draft = chat.draft().to_string();
            edit(&mut draft, &mut cursor);
            chat.set_draft(draft);
        }
        self.input_cursor = cursor;
    }

    pub fn insert_char(&mut self, c: char) {
        self.edit_draft(|draft, cursor| {
            let byte_pos = char_to_byte_index(draft, *cursor);
            draft.insert(byte_pos, c);
            *cursor += 1;
        });
    }

    pub fn backspace(&mut self) {
        self.edit_draft(|draft, cursor| {
            if *cursor > 0 {
                *cursor -= 1;
                let byte_pos = char_to_byte_index(draft, *cursor);
                draft.remove(byte_pos);
            }
        });
    }

    pub fn delete(&mut self) {
        self.edit_draft(|draft, cursor| {
            if *cursor < draft.chars().count() {
                let byte_pos = char_to_byte_index(draft, *cursor);
                draft.remove(byte_pos);
            }
        });
    }

    pub fn cursor_left(&mut self) {
        self.input_cursor = self.input_cursor.saturating_sub(1);
    }

    pub fn cursor_right(&mut self) {
        self.input_cursor = (self.input_cursor + 1).min(self.draft_len());
    }

    pub fn cursor_home(&mut self) {
        self.input_cursor = 0;
    }

    pub fn cursor_end(&mut self) {
        self.input_cursor = self.draft_len();
    }

    /// Submit the draft and run the request in the background
    pub fn submit(&mut self) {
        let Some(chat) = self.page.chat_mut() else {
            return;
        };
        let Some(pending) = chat.submit() else {
            return;
        };

        self.input_cursor = 0;
        self.chat_follow = true;

        let events = self.events.clone();
        tokio::spawn(async move {
            let outcome = pending.resolve().await;
            // The receiver is gone once the app has shut down
            let _ = events.send(AppEvent::Reply(outcome));
        });
    }

    pub fn on_reply(&mut self, outcome: TurnOutcome) {
        match self.page.chat_mut() {
            Some(chat) => {
                if let Some(notification) = chat.finish(outcome) {
                    self.notifications.push(notification);
                }
                self.chat_follow = true;
            }
            None => debug!(turn = outcome.turn, "reply arrived with no chat mounted"),
        }
    }

    pub fn dismiss_notification(&mut self) -> bool {
        self.notifications.pop().is_some()
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.is_awaiting() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.chat_follow = false;
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        // Clamped to the content height during render
        self.chat_scroll = self.chat_scroll.saturating_add(lines);
    }

    pub fn scroll_to_top(&mut self) {
        self.chat_follow = false;
        self.chat_scroll = 0;
    }

    pub fn scroll_to_bottom(&mut self) {
        self.chat_follow = true;
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use aprende_core::{ChatClient, CompletionError, CompletionService, MemoryCredentials};
    use async_trait::async_trait;
    use std::sync::Arc;
    use tokio::sync::mpsc;

    pub(crate) struct Echo;

    #[async_trait]
    impl CompletionService for Echo {
        async fn complete(&self, _api_key: &str, prompt: &str) -> Result<String, CompletionError> {
            Ok(format!("**echo** {prompt}"))
        }
    }

    pub(crate) fn test_app(key: Option<&str>) -> (App, mpsc::UnboundedReceiver<AppEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let client = ChatClient::new(Arc::new(Echo), Arc::new(MemoryCredentials::new(key)));
        let app = App::new(LandingPage::new(client), "gemini-test", key.is_some(), tx);
        (app, rx)
    }

    #[test]
    fn test_cta_mounts_chat_and_focuses_input() {
        let (mut app, _rx) = test_app(Some("key"));
        assert!(app.chat().is_none());

        app.activate(Cta::StartLearning);
        assert!(app.chat().is_some());
        assert_eq!(app.focus, Focus::Input);
        assert_eq!(app.input_mode, InputMode::Editing);
        assert!(app.notifications.is_empty());
    }

    #[test]
    fn test_missing_key_hint_shown_once() {
        let (mut app, _rx) = test_app(None);
        app.activate(Cta::GetStarted);
        app.activate(Cta::GetStarted);
        assert_eq!(app.notifications.len(), 1);
        assert!(app.dismiss_notification());
        assert!(!app.dismiss_notification());
    }

    #[test]
    fn test_focus_cycles_through_visible_elements() {
        let (mut app, _rx) = test_app(Some("key"));
        app.focus_next();
        assert_eq!(app.focus, Focus::Cta(Cta::StartLearning));
        app.focus_next();
        assert_eq!(app.focus, Focus::Cta(Cta::GetStarted));

        app.activate(Cta::GetStarted);
        app.focus_next();
        assert_eq!(app.focus, Focus::Cta(Cta::StartLearning));
        app.focus_prev();
        assert_eq!(app.focus, Focus::Input);
    }

    #[test]
    fn test_draft_editing_is_utf8_safe() {
        let (mut app, _rx) = test_app(Some("key"));
        app.activate(Cta::GetStarted);

        for c in "héllo".chars() {
            app.insert_char(c);
        }
        app.cursor_left();
        app.cursor_left();
        app.backspace();
        assert_eq!(app.chat().unwrap().draft(), "hélo");
        assert_eq!(app.input_cursor, 2);

        app.cursor_home();
        app.delete();
        assert_eq!(app.chat().unwrap().draft(), "élo");

        app.cursor_end();
        app.insert_char('!');
        assert_eq!(app.chat().unwrap().draft(), "élo!");
    }

    #[tokio::test]
    async fn test_submit_routes_reply_through_event_channel() {
        let (mut app, mut rx) = test_app(Some("key"));
        app.activate(Cta::GetStarted);
        for c in "Hello".chars() {
            app.insert_char(c);
        }

        app.submit();
        assert!(app.is_awaiting());
        assert_eq!(app.input_cursor, 0);
        assert_eq!(app.chat().unwrap().messages().len(), 2);

        // Typing while waiting still works, submitting does not
        app.insert_char('x');
        app.submit();
        assert_eq!(app.chat().unwrap().messages().len(), 2);

        match rx.recv().await {
            Some(AppEvent::Reply(outcome)) => app.on_reply(outcome),
            other => panic!("unexpected event {:?}", other),
        }

        assert!(!app.is_awaiting());
        assert_eq!(app.chat().unwrap().messages().len(), 3);
        assert_eq!(app.chat().unwrap().draft(), "x");
        assert!(app.notifications.is_empty());
    }

    #[tokio::test]
    async fn test_failed_reply_pushes_notification() {
        let (mut app, mut rx) = test_app(None);
        app.activate(Cta::GetStarted);
        app.dismiss_notification();
        app.insert_char('?');
        app.submit();

        if let Some(AppEvent::Reply(outcome)) = rx.recv().await {
            app.on_reply(outcome);
        }
        assert_eq!(app.notifications.len(), 1);
        assert!(!app.is_awaiting());
        assert_eq!(app.chat().unwrap().messages().len(), 2);
    }
}
