use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Who authored a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// A single turn in the renter's conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
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

/// A hard requirement extracted from the conversation, e.g. a budget cap
/// or a pets rule. `value` keeps whatever shape the extractor produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HardRule {
    pub field: String,
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

/// Flattens a conversation into "role: content" lines for prompting.
pub fn transcript(messages: &[Message]) -> String {
    let mut out = String::new();
    for msg in messages {
        let role = match msg.role {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        };
        out.push_str(role);
        out.push_str(": ");
        out.push_str(&msg.content);
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transcript_orders_turns() {
        let messages = vec![
            Message::user("Looking for a flat in Hackney"),
            Message::assistant("What is your budget?"),
            Message::user("Up to 900 a month"),
        ];
        let text = transcript(&messages);
        assert_eq!(
            text,
            "user: Looking for a flat in Hackney\nassistant: What is your budget?\nuser: Up to 900 a month\n"
        );
    }

    #[test]
    fn role_serializes_lowercase() {
        let msg = Message::assistant("hi");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "assistant");
    }
}
