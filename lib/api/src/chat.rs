//! Conversational assistant that gathers the renter's requirements.

use chrono::Local;
use serde_json::{json, Value};

use flatmatch_core::{HardRule, Message, Result};
use flatmatch_provider::OpenAiClient;

/// History turns included in each completion request.
const HISTORY_WINDOW: usize = 10;

const SYSTEM_TEMPLATE: &str = "\
You are a helpful assistant helping users find rooms to rent in London.

Today's date: {today}

Your goal is to understand what the user is looking for by asking clarifying questions. Key topics to cover:
1. Monthly budget (max rent per month) - ESSENTIAL. Always ask for their \"monthly budget\" explicitly.
2. Commute - ask in a simple, direct way like:
   \"Where will you need to commute to? And how long are you willing to spend getting there?\"
3. Move-in date / timeline
4. How long they're looking to stay (minimum tenancy)
5. Property preferences (house share vs flat, furnished, bills included)
6. Any deal-breakers (pets, couples, parking)

Current known preferences: {rules}

CONVERSATION FLOW:
- Ask ONE question at a time, naturally working through the topics above
- Be conversational - don't sound like a form or checklist
- Skip topics the user has already answered or that aren't relevant
- After 3-4 exchanges (or once the key points are covered), suggest looking at the matched listings.

Be friendly and natural. The goal is to help, not interrogate.";

const SEARCH_NUDGE: &str = "\
You have gathered enough information (budget, location, etc). Explicitly suggest \
that the user clicks the 'Find Matches' button now to see available properties.";

/// Runs one assistant turn: the reply text plus whether the frontend
/// should surface the search button.
pub async fn generate_response(
    provider: &OpenAiClient,
    message: &str,
    history: &[Message],
    rules: &[HardRule],
) -> Result<(String, bool)> {
    let suggested = search_suggested(history.len(), rules);
    let messages = build_messages(message, history, rules, suggested);
    let reply = provider.chat(messages, 200).await?;
    Ok((reply, suggested))
}

/// Suggest searching once budget and location are known, or once the
/// conversation is deep enough to have produced any rule at all.
pub fn search_suggested(history_len: usize, rules: &[HardRule]) -> bool {
    let has_budget = rules.iter().any(|r| r.field == "max_budget");
    let has_location = rules.iter().any(|r| {
        matches!(
            r.field.as_str(),
            "target_location" | "max_commute" | "location" | "postcode"
        )
    });
    has_budget && has_location || history_len >= 4 && !rules.is_empty()
}

fn build_messages(
    message: &str,
    history: &[Message],
    rules: &[HardRule],
    suggested: bool,
) -> Value {
    let rules_text = if rules.is_empty() {
        "None yet".to_string()
    } else {
        rules
            .iter()
            .map(|r| format!("{}: {}", r.field, r.value))
            .collect::<Vec<_>>()
            .join(", ")
    };
    let today = Local::now().format("%A, %d %B %Y").to_string();
    let system = SYSTEM_TEMPLATE
        .replace("{today}", &today)
        .replace("{rules}", &rules_text);

    let mut messages = vec![json!({"role": "system", "content": system})];
    let start = history.len().saturating_sub(HISTORY_WINDOW);
    for m in &history[start..] {
        messages.push(json!({"role": m.role, "content": m.content}));
    }
    messages.push(json!({"role": "user", "content": message}));
    if suggested {
        messages.push(json!({"role": "system", "content": SEARCH_NUDGE}));
    }
    Value::Array(messages)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(field: &str) -> HardRule {
        HardRule {
            field: field.to_string(),
            value: json!(true),
            unit: None,
        }
    }

    #[test]
    fn budget_and_location_trigger_suggestion() {
        assert!(search_suggested(0, &[rule("max_budget"), rule("target_location")]));
        assert!(!search_suggested(0, &[rule("max_budget")]));
        assert!(!search_suggested(0, &[]));
    }

    #[test]
    fn deep_conversation_with_any_rule_triggers_suggestion() {
        assert!(search_suggested(4, &[rule("pets_allowed")]));
        assert!(!search_suggested(4, &[]));
        assert!(!search_suggested(3, &[rule("pets_allowed")]));
    }

    #[test]
    fn history_window_keeps_last_ten() {
        let history: Vec<Message> = (0..15).map(|i| Message::user(format!("m{i}"))).collect();
        let messages = build_messages("latest", &history, &[], false);
        let arr = messages.as_array().unwrap();
        // system + 10 history + current message
        assert_eq!(arr.len(), 12);
        assert_eq!(arr[1]["content"], "m5");
        assert_eq!(arr.last().unwrap()["content"], "latest");
    }

    #[test]
    fn nudge_appended_when_suggested() {
        let messages = build_messages("hi", &[], &[rule("max_budget")], true);
        let arr = messages.as_array().unwrap();
        assert_eq!(arr.last().unwrap()["role"], "system");
        assert_eq!(arr.last().unwrap()["content"], SEARCH_NUDGE);
    }
}
