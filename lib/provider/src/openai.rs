//! OpenAI-compatible chat, vision and embedding client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use tracing::{debug, warn};

use flatmatch_core::{
    transcript, Error, HardRule, IdealCriteria, Listing, ListingScore, MatchProvider, Message,
    Result,
};

use crate::prompts;

/// How many listing photos get attached to a scoring request.
const MAX_SCORE_IMAGES: usize = 5;

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub embedding_model: String,
    pub chat_model: String,
    pub vision_model: String,
    pub timeout: Duration,
    pub max_retries: usize,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.openai.com/v1".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            chat_model: "gpt-4o-mini".to_string(),
            vision_model: "gpt-4o".to_string(),
            timeout: Duration::from_secs(60),
            max_retries: 4,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: Client,
    config: OpenAiConfig,
}

impl OpenAiClient {
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(Error::InvalidConfig("missing OpenAI API key".to_string()));
        }
        let mut headers = HeaderMap::new();
        let auth = format!("Bearer {}", config.api_key.trim());
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth)
                .map_err(|_| Error::InvalidConfig("invalid OpenAI API key".to_string()))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| Error::InvalidConfig(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.config.base_url.trim_end_matches('/'))
    }

    /// POSTs a JSON body, retrying rate limits, server errors and
    /// transport failures with exponential backoff.
    async fn post_json(&self, path: &str, body: &Value) -> Result<Value> {
        let endpoint = self.endpoint(path);
        let mut attempt = 0usize;
        loop {
            let response = self.client.post(&endpoint).json(body).send().await;
            match response {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        return resp
                            .json()
                            .await
                            .map_err(|e| Error::Provider(format!("bad response body: {e}")));
                    }
                    let text = resp
                        .text()
                        .await
                        .unwrap_or_else(|_| "<body unavailable>".to_string());
                    if should_retry(status) && attempt + 1 < self.config.max_retries {
                        attempt += 1;
                        warn!(%status, attempt, "retrying OpenAI request");
                        tokio::time::sleep(retry_backoff(attempt)).await;
                        continue;
                    }
                    return Err(Error::Provider(format!(
                        "OpenAI request failed ({status}): {text}"
                    )));
                }
                Err(err) => {
                    if is_retryable(&err) && attempt + 1 < self.config.max_retries {
                        attempt += 1;
                        warn!(error = %err, attempt, "retrying OpenAI request");
                        tokio::time::sleep(retry_backoff(attempt)).await;
                        continue;
                    }
                    return Err(Error::Provider(err.to_string()));
                }
            }
        }
    }

    async fn chat_completion(
        &self,
        model: &str,
        messages: Value,
        json_mode: bool,
        max_tokens: Option<u32>,
    ) -> Result<String> {
        let mut body = json!({
            "model": model,
            "messages": messages,
        });
        if json_mode {
            body["response_format"] = json!({"type": "json_object"});
        }
        if let Some(max) = max_tokens {
            body["max_tokens"] = json!(max);
        }
        let response = self.post_json("chat/completions", &body).await?;
        extract_content(&response)
    }

    /// A plain chat turn, used by the conversational assistant.
    pub async fn chat(&self, messages: Value, max_tokens: u32) -> Result<String> {
        self.chat_completion(&self.config.chat_model, messages, false, Some(max_tokens))
            .await
    }

    /// Extracts hard rules from a new user message, merging with the
    /// rules gathered so far. Falls back to the existing rules when the
    /// model returns something unparseable.
    pub async fn extract_rules(
        &self,
        message: &str,
        existing: &[HardRule],
    ) -> Result<Vec<HardRule>> {
        let rules_json = serde_json::to_string(existing)?;
        let messages = json!([
            {"role": "system", "content": prompts::RULES_SYSTEM},
            {"role": "user", "content": format!("Current rules: {rules_json}\n\nNew message: {message}")},
        ]);
        let content = self
            .chat_completion(&self.config.chat_model, messages, true, Some(300))
            .await?;
        Ok(parse_rules(&content).unwrap_or_else(|| existing.to_vec()))
    }
}

#[async_trait]
impl MatchProvider for OpenAiClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let body = json!({
            "model": self.config.embedding_model,
            "input": text,
        });
        let response = self.post_json("embeddings", &body).await?;
        parse_embedding(&response)
    }

    async fn summarize(&self, conversation: &[Message]) -> Result<String> {
        let messages = json!([
            {"role": "system", "content": prompts::SUMMARIZE_SYSTEM},
            {"role": "user", "content": transcript(conversation)},
        ]);
        self.chat_completion(&self.config.chat_model, messages, false, Some(500))
            .await
    }

    async fn ideal_criteria(&self, conversation: &[Message]) -> Result<IdealCriteria> {
        let messages = json!([
            {"role": "system", "content": prompts::IDEAL_SYSTEM},
            {"role": "user", "content": transcript(conversation)},
        ]);
        let content = self
            .chat_completion(&self.config.chat_model, messages, true, None)
            .await?;
        let value = parse_json_content(&content)?;
        debug!(?value, "ideal listing response");
        serde_json::from_value(value).map_err(Error::from)
    }

    async fn score_listing(
        &self,
        summary: &str,
        ideal: &IdealCriteria,
        listing: &Listing,
    ) -> Result<ListingScore> {
        let system = prompts::score_system(
            ideal.target_location.as_deref(),
            ideal.max_commute.as_deref(),
        );
        let text = format!(
            "CONVERSATION SUMMARY:\n{summary}\n\nIDEAL LISTING CRITERIA:\n{}\n\nLISTING TO EVALUATE:\n{}",
            ideal.prompt_lines(),
            listing_text(listing),
        );

        let mut user_content = vec![json!({"type": "text", "text": text})];
        let has_images = !listing.image_urls.is_empty();
        if has_images {
            user_content.push(json!({"type": "text", "text": "\nLISTING IMAGES:"}));
            for url in listing.image_urls.iter().take(MAX_SCORE_IMAGES) {
                user_content.push(json!({
                    "type": "image_url",
                    "image_url": {"url": url, "detail": "low"},
                }));
            }
        }

        let model = if has_images {
            &self.config.vision_model
        } else {
            &self.config.chat_model
        };
        let messages = json!([
            {"role": "system", "content": system},
            {"role": "user", "content": user_content},
        ]);
        let content = self
            .chat_completion(model, messages, true, Some(500))
            .await?;
        parse_score(&content)
    }
}

fn should_retry(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn is_retryable(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_body() || err.is_request() || err.is_decode()
}

fn retry_backoff(attempt: usize) -> Duration {
    let capped = attempt.min(5) as u32;
    Duration::from_millis(500 * (1 << capped))
}

fn extract_content(response: &Value) -> Result<String> {
    response["choices"][0]["message"]["content"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| Error::InvalidResponse("completion has no content".to_string()))
}

fn parse_embedding(response: &Value) -> Result<Vec<f32>> {
    let embedding = response["data"][0]["embedding"]
        .as_array()
        .ok_or_else(|| Error::InvalidResponse("embedding response has no data".to_string()))?;
    embedding
        .iter()
        .map(|v| {
            v.as_f64()
                .map(|f| f as f32)
                .ok_or_else(|| Error::InvalidResponse("non-numeric embedding value".to_string()))
        })
        .collect()
}

/// Parses a JSON-mode completion, tolerating ```json fences some
/// models still wrap their output in.
fn parse_json_content(content: &str) -> Result<Value> {
    let trimmed = content.trim();
    let stripped = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .map(|s| s.trim_end_matches("```").trim())
        .unwrap_or(trimmed);
    serde_json::from_str(stripped).map_err(Error::from)
}

/// Accepts both `{"rules": [...]}` and a bare array. Returns `None` on
/// anything else so the caller can keep its existing rules.
fn parse_rules(content: &str) -> Option<Vec<HardRule>> {
    let value = parse_json_content(content).ok()?;
    let rules = match value {
        Value::Array(_) => value,
        Value::Object(ref map) => map.get("rules")?.clone(),
        _ => return None,
    };
    serde_json::from_value(rules).ok()
}

fn parse_score(content: &str) -> Result<ListingScore> {
    let value = parse_json_content(content)?;
    let overall = value["overall_score"]
        .as_f64()
        .ok_or_else(|| Error::InvalidResponse("score response has no overall_score".to_string()))?;
    Ok(ListingScore {
        overall: overall.round().clamp(1.0, 100.0) as u8,
        reasoning: value,
    })
}

fn listing_text(listing: &Listing) -> String {
    let mut lines = vec![format!("title: {}", listing.title)];
    let mut push = |key: &str, value: Option<String>| {
        if let Some(v) = value {
            lines.push(format!("{key}: {v}"));
        }
    };
    push("price", listing.price.map(|p| format!("£{p} pcm")));
    push("location", listing.location.clone());
    push("postcode", listing.postcode.clone());
    push("property_type", listing.property_type.clone());
    push("furnishings", listing.furnishings.clone());
    push("minimum_term", listing.minimum_term.clone());
    push("available", listing.available.clone());
    push("pets", listing.pets.clone());
    push("couples", listing.couples.clone());
    push("bills_included", listing.bills_included.clone());
    push("parking", listing.parking.clone());
    push("summary", listing.summary.clone());
    lines.join("\n")
}
