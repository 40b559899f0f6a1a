//! Placeholder learning assistant
//!
//! Replies are chosen by keyword, first match wins. There is no model behind
//! this; the session only supplies the user's name and Moodle host.

use crate::conversation::ChatReply;
use crate::session::Session;

const HELP_TEXT: &str = "I'm your personalized AI Moodle assistant! Here's what I can help you with:

🎓 **Course Management**
- Browse your enrolled courses
- Access course materials and files
- Navigate course content

📚 **Study Support**
- Organize your learning materials
- Find specific resources
- Track your progress

💬 **Smart Assistance**
- Answer questions about your courses
- Provide study recommendations
- Help with course navigation

What would you like to explore first?";

/// Suggestions offered outside of a conversation
pub const GENERAL_SUGGESTIONS: [&str; 8] = [
    "Show me my courses",
    "What materials are available?",
    "Help me organize my studies",
    "Find recent course updates",
    "What assignments are coming up?",
    "Help me prepare for exams",
    "Show me discussion forums",
    "Find lecture recordings",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Intent {
    Courses,
    Greeting,
    Help,
    Other,
}

impl Intent {
    fn detect(message: &str) -> Self {
        let lowered = message.to_lowercase();
        if lowered.contains("course") {
            Intent::Courses
        } else if lowered.contains("hello") || lowered.contains("hi") {
            Intent::Greeting
        } else if lowered.contains("help") {
            Intent::Help
        } else {
            Intent::Other
        }
    }
}

/// Keyword-matching responder
#[derive(Debug, Clone, Copy, Default)]
pub struct Assistant;

impl Assistant {
    pub fn new() -> Self {
        Self
    }

    pub fn reply(&self, message: &str, session: &Session) -> ChatReply {
        match Intent::detect(message) {
            Intent::Courses => ChatReply::new(format!(
                "I can help you with your courses! You're connected to {}. \
                 Use the courses section to browse your enrolled courses and materials.",
                session.moodle_url
            ))
            .with_suggestions(&[
                "Show me my courses",
                "Help me find course materials",
                "What assignments are due?",
            ]),
            Intent::Greeting => ChatReply::new(format!(
                "Hello {}! I'm your AI learning assistant. I can help you navigate your \
                 Moodle courses, find materials, and answer questions about your coursework.",
                session.display_name().unwrap_or("there")
            ))
            .with_suggestions(&[
                "Show me my courses",
                "Help me organize my study materials",
                "What can you do?",
            ]),
            Intent::Help => ChatReply::new(HELP_TEXT).with_suggestions(&[
                "Show me my courses",
                "Help me find materials",
                "What assignments do I have?",
            ]),
            Intent::Other => ChatReply::new(format!(
                "I understand you're asking about: '{}'. This is a prototype AI assistant. \
                 In the full version, I'll be able to provide intelligent responses based on \
                 your course content and learning materials.",
                message
            ))
            .with_suggestions(&[
                "Show me my courses",
                "Help me with my studies",
                "What can you do?",
            ]),
        }
    }
}
