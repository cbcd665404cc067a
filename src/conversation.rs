use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::agent::SearchReply;

/// Seeded as the first transcript entry of every session.
pub const WELCOME_MESSAGE: &str = "Hi, I'm Reddit Agent! I can help you:\n\n\
    1. Search any subreddit for the latest posts\n\
    2. Create summaries of the most interesting discussions\n\
    3. Find threads with high engagement\n\
    4. Draft relevant comments for those threads\n\n\
    Just type a subreddit name (e.g. 'programming' or 'technology') to get started!";

/// Shown verbatim when a request fails, whatever the cause.
pub const CONNECTION_APOLOGY: &str =
    "Sorry, I'm having trouble connecting to the server. Please try again later.";

/// Shown when a successful reply carries no final output.
pub const NO_OUTPUT_FALLBACK: &str = "No final output was generated.";

/// Who authored a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sender {
    User,
    Bot,
}

impl Sender {
    pub fn display_name(&self) -> &'static str {
        match self {
            Sender::User => "You",
            Sender::Bot => "Reddit Agent",
        }
    }
}

/// One transcript entry. Ids increase monotonically within the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: u64,
    pub sender: Sender,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// Whether a search request is currently in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SendState {
    #[default]
    Idle,
    Sending,
}

/// The append-only transcript plus the send state machine. Messages are
/// never edited, removed, or reordered, and the transcript is not capped:
/// a single chat session is expected to stay small.
pub struct Conversation {
    messages: Vec<Message>,
    next_id: u64,
    state: SendState,
    show_steps: bool,
}

impl Conversation {
    /// A fresh conversation holding only the bot welcome message.
    pub fn new(show_steps: bool) -> Self {
        let mut conversation = Self {
            messages: Vec::new(),
            next_id: 1,
            state: SendState::default(),
            show_steps,
        };
        conversation.push(Sender::Bot, WELCOME_MESSAGE);
        conversation
    }

    fn push(&mut self, sender: Sender, text: impl Into<String>) {
        let message = Message {
            id: self.next_id,
            sender,
            text: text.into(),
            timestamp: Utc::now(),
        };
        tracing::debug!(
            "message {} from {} appended",
            message.id,
            message.sender.display_name()
        );
        self.next_id += 1;
        self.messages.push(message);
    }

    /// Submit the draft: append the user entry, arm the in-flight flag,
    /// and hand back the query to dispatch. `None` means nothing changed,
    /// either because the draft was blank or a request is already running.
    pub fn submit(&mut self, draft: &str) -> Option<String> {
        if self.state == SendState::Sending {
            return None;
        }
        let query = draft.trim();
        if query.is_empty() {
            return None;
        }
        self.push(Sender::User, query);
        self.state = SendState::Sending;
        Some(query.to_string())
    }

    /// Append the reply's messages and return to `Idle`. The steps entry
    /// comes first when present; a missing or empty final output falls
    /// back to the fixed string so the user always sees an answer.
    pub fn settle_success(&mut self, reply: &SearchReply) {
        if self.state == SendState::Idle {
            tracing::debug!("dropping agent reply with no request in flight");
            return;
        }
        if self.show_steps {
            if let Some(steps) = reply.steps_text() {
                self.push(Sender::Bot, steps);
            }
        }
        let final_text = reply
            .final_output
            .as_deref()
            .filter(|text| !text.is_empty())
            .unwrap_or(NO_OUTPUT_FALLBACK);
        self.push(Sender::Bot, final_text);
        self.state = SendState::Idle;
    }

    /// Append the fixed apology and return to `Idle`. Failure causes are
    /// logged by the caller, never shown in the transcript.
    pub fn settle_failure(&mut self) {
        if self.state == SendState::Idle {
            tracing::debug!("dropping agent failure with no request in flight");
            return;
        }
        self.push(Sender::Bot, CONNECTION_APOLOGY);
        self.state = SendState::Idle;
    }

    /// Append a user entry outside the send cycle (slash command echo).
    pub fn append_user(&mut self, text: impl Into<String>) {
        self.push(Sender::User, text);
    }

    /// Append a bot entry outside the send cycle (locally answered
    /// commands, notices).
    pub fn append_bot(&mut self, text: impl Into<String>) {
        self.push(Sender::Bot, text);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_awaiting(&self) -> bool {
        self.state == SendState::Sending
    }
}
