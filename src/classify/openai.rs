//! Chat-completions wire format and the HTTP transport behind it.
//!
//! Request: `{model, response_format: {type: json_object}, temperature: 0,
//! messages: [system, user]}` where the user message is a JSON document
//! `{instructions, allowedCategories, transactions}`.
//!
//! Expected reply: `choices[0].message.content` holding
//! `{"assignments": [{"id": "...", "category": "..."}]}`.

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;

use super::Assignment;
use crate::error::FinsortError;
use crate::models::Transaction;

const SYSTEM_PROMPT: &str =
    "You are a precise finance transaction classifier. Output strict JSON only.";

const INSTRUCTIONS: &str = "Classify each transaction into exactly ONE category from the allowed list.\n\
Return pure JSON of the form: {\"assignments\":[{\"id\":\"...\",\"category\":\"<one of allowed>\"}]}.\n\
- Use ONLY the allowed categories (case-sensitive).\n\
- If nothing fits, pick \"Other\".\n\
- Positive amounts are income; negatives are expenses.";

/// Body substrings that mark a quota or billing failure.
const QUOTA_MARKERS: &[&str] = &["insufficient_quota", "billing_hard_limit_reached"];

const TOO_MANY_REQUESTS: u16 = 429;

#[derive(Debug, Serialize)]
pub(crate) struct ChatRequest {
    model: String,
    response_format: ResponseFormat,
    temperature: f32,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UserPayload<'a> {
    instructions: &'static str,
    allowed_categories: &'a [String],
    transactions: Vec<BatchItem<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BatchItem<'a> {
    id: String,
    merchant: Option<&'a str>,
    description: Option<&'a str>,
    amount_cents: i64,
}

pub(super) fn build_request(
    model: &str,
    batch: &[&Transaction],
    allowed: &[String],
) -> Result<ChatRequest> {
    let transactions = batch
        .iter()
        .filter_map(|t| {
            Some(BatchItem {
                id: t.id?.to_string(),
                merchant: t.merchant.as_deref(),
                description: t.raw_desc.as_deref(),
                amount_cents: t.amount_cents,
            })
        })
        .collect();
    let payload = UserPayload {
        instructions: INSTRUCTIONS,
        allowed_categories: allowed,
        transactions,
    };
    let user = serde_json::to_string(&payload).context("serialize classification payload")?;

    Ok(ChatRequest {
        model: model.to_string(),
        response_format: ResponseFormat {
            kind: "json_object",
        },
        temperature: 0.0,
        messages: vec![
            ChatMessage {
                role: "system",
                content: SYSTEM_PROMPT.to_string(),
            },
            ChatMessage {
                role: "user",
                content: user,
            },
        ],
    })
}

pub(super) fn completions_url(base_url: &str) -> String {
    format!("{}/v1/chat/completions", base_url.trim_end_matches('/'))
}

pub(super) fn is_quota_failure(reply: &TransportReply) -> bool {
    reply.status == TOO_MANY_REQUESTS || QUOTA_MARKERS.iter().any(|m| reply.body.contains(m))
}

/// Pull well-formed `{id, category}` pairs out of a successful reply.
///
/// Anything unexpected (a body that is not JSON, missing `choices`, content
/// that is not JSON, a missing `assignments` array) yields no assignments.
/// Entries whose `id` or `category` is not a string, or whose `id` is not a
/// transaction id, are dropped.
pub(super) fn parse_assignments(body: &str) -> Vec<Assignment> {
    let Ok(envelope) = serde_json::from_str::<Value>(body) else {
        return Vec::new();
    };
    let content = envelope
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .unwrap_or("{}");
    let Ok(parsed) = serde_json::from_str::<Value>(content) else {
        return Vec::new();
    };
    let Some(items) = parsed.get("assignments").and_then(Value::as_array) else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| {
            let id = item.get("id")?.as_str()?;
            let category = item.get("category")?.as_str()?;
            Some(Assignment {
                transaction_id: id.trim().parse().ok()?,
                category: category.to_string(),
            })
        })
        .collect()
}

/// Status and raw body of an HTTP exchange.
#[derive(Debug, Clone)]
pub(crate) struct TransportReply {
    pub(crate) status: u16,
    pub(crate) body: String,
}

impl TransportReply {
    pub(crate) fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends one classification request. Only a failure to get *any* answer is
/// an error; non-success statuses come back as a reply.
pub(crate) trait Transport {
    fn send(
        &self,
        url: &str,
        api_key: &str,
        request: &ChatRequest,
    ) -> std::result::Result<TransportReply, FinsortError>;
}

pub(crate) struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub(crate) fn new() -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
        }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for HttpTransport {
    fn send(
        &self,
        url: &str,
        api_key: &str,
        request: &ChatRequest,
    ) -> std::result::Result<TransportReply, FinsortError> {
        let resp = self
            .client
            .post(url)
            .bearer_auth(api_key)
            .json(request)
            .send()
            .map_err(|e| FinsortError::Network(e.to_string()))?;

        let status = resp.status().as_u16();
        let body = resp
            .text()
            .map_err(|e| FinsortError::Network(e.to_string()))?;
        Ok(TransportReply { status, body })
    }
}

#[cfg(test)]
#[path = "openai_tests.rs"]
mod tests;
