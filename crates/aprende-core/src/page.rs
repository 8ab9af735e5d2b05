//! Landing page content and the chat mount state

use tracing::info;

use crate::chat::{ChatClient, ChatWidget};

pub const HERO_TITLE: &str = "Your Personal AI Assistant";
pub const HERO_TAGLINE: &str = "Transform your learning experience with AI-powered study tools, personalized guidance, and interactive exercises.";
pub const FEATURES_TITLE: &str = "Key Features";
pub const CTA_TITLE: &str = "Ready to Transform Your Learning?";
pub const CTA_TAGLINE: &str = "Join thousands of students who are already experiencing the future of education.";
pub const CHAT_TITLE: &str = "Your Personal AI Assistant";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Feature {
    pub icon: &'static str,
    pub title: &'static str,
    pub description: &'static str,
}

pub const FEATURES: [Feature; 4] = [
    Feature {
        icon: "🧠",
        title: "AI-Powered Learning",
        description: "Get intelligent answers and explanations tailored to your learning style",
    },
    Feature {
        icon: "🎯",
        title: "Personalized Path",
        description: "Follow a customized learning journey based on your goals",
    },
    Feature {
        icon: "📖",
        title: "Interactive Study",
        description: "Engage with dynamic exercises and quizzes",
    },
    Feature {
        icon: "💡",
        title: "Smart Insights",
        description: "Track your progress and receive intelligent recommendations",
    },
];

/// The two call-to-action buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cta {
    GetStarted,
    StartLearning,
}

impl Cta {
    pub fn all() -> [Cta; 2] {
        [Cta::GetStarted, Cta::StartLearning]
    }

    pub fn label(&self) -> &'static str {
        match self {
            Cta::GetStarted => "Get Started →",
            Cta::StartLearning => "Start Learning Now",
        }
    }
}

/// Landing page state: whether the chat widget has been mounted.
///
/// Mounting is one-way; once the chat is shown it stays.
pub struct LandingPage {
    client: ChatClient,
    chat: Option<ChatWidget>,
}

impl LandingPage {
    pub fn new(client: ChatClient) -> Self {
        Self { client, chat: None }
    }

    /// Handle a CTA activation. Returns true when this call mounted the chat.
    pub fn activate(&mut self, cta: Cta) -> bool {
        if self.chat.is_some() {
            return false;
        }
        info!(?cta, "mounting chat");
        self.chat = Some(ChatWidget::new(self.client.clone()));
        true
    }

    pub fn is_chat_visible(&self) -> bool {
        self.chat.is_some()
    }

    pub fn chat(&self) -> Option<&ChatWidget> {
        self.chat.as_ref()
    }

    pub fn chat_mut(&mut self) -> Option<&mut ChatWidget> {
        self.chat.as_mut()
    }
}
