//! OpenRouter-backed [`FactsExtractor`] implementation.
//!
//! Sends a course description to a chat-completions endpoint with a fixed
//! system prompt and parses the model's JSON reply into
//! [`CourseFacts`]. All failures surface as [`CatalogError::Extraction`];
//! the caller decides whether that degrades the record or aborts.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use courseatlas_core::FactsExtractor;
use courseatlas_shared::{CatalogError, CourseFacts, LlmConfig, NONE_SENTINEL, Result, resolve_api_key};

/// Fixed instruction set. The prompt pins the output to exactly one JSON
/// object so parsing stays mechanical; `"N/A"` distinguishes "source says
/// none" from "model could not tell" (which must not be invented).
const SYSTEM_PROMPT: &str = "\
You extract structured facts from university course descriptions. \
Reply with exactly one JSON object and nothing else: no prose, no markdown, \
no code fences. The object has exactly these keys: \
\"credit\" (integer credit hours, or \"N/A\" if the description does not state them), \
\"prereq\" (array of prerequisite course codes such as \"MATH 241\", or \"N/A\" if the \
description states there are no prerequisites), \
\"gened\" (array of general-education category names, or \"N/A\" if the description \
states the course satisfies none). \
Never invent values that are not stated in the description.";

static COURSE_CODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Z]{2,4} \d{3}$").unwrap()
});

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: i32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
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

/// The model's reply before normalization. Tolerates the schema drift real
/// models produce: a bare string where an array belongs, or `"N/A"` where a
/// number belongs.
#[derive(Debug, Deserialize)]
struct RawFacts {
    #[serde(default)]
    credit: Option<CreditField>,
    #[serde(default)]
    prereq: Option<ListField>,
    #[serde(default)]
    gened: Option<ListField>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CreditField {
    Number(i64),
    Text(String),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ListField {
    One(String),
    Many(Vec<String>),
}

// ---------------------------------------------------------------------------
// LlmExtractor
// ---------------------------------------------------------------------------

/// Chat-completions client implementing [`FactsExtractor`].
pub struct LlmExtractor {
    client: reqwest::Client,
    endpoint: Url,
    model: String,
    api_key: String,
}

impl LlmExtractor {
    pub fn new(endpoint: Url, model: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| CatalogError::Extraction(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint,
            model: model.into(),
            api_key: api_key.into(),
        })
    }

    /// Build an extractor from the `[llm]` config section, resolving the API
    /// key from the configured environment variable.
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let api_key = resolve_api_key(config)?;
        let endpoint = Url::parse(&config.endpoint)
            .map_err(|e| CatalogError::config(format!("invalid llm endpoint: {e}")))?;
        Self::new(endpoint, config.model.clone(), api_key)
    }
}

#[async_trait]
impl FactsExtractor for LlmExtractor {
    async fn extract(&self, text: &str) -> Result<CourseFacts> {
        let request = ChatRequest {
            model: &self.model,
            // Deterministic output; sampling variance only hurts a
            // fixed-schema task.
            temperature: 0,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: text,
                },
            ],
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| CatalogError::Extraction(format!("llm request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Extraction(format!(
                "llm endpoint returned HTTP {status}"
            )));
        }

        let reply: ChatResponse = response
            .json()
            .await
            .map_err(|e| CatalogError::Extraction(format!("malformed llm response: {e}")))?;
        let content = reply
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .ok_or_else(|| CatalogError::Extraction("llm response held no choices".into()))?;

        let facts = parse_facts(content)?;
        tracing::debug!(credit = ?facts.credit, prereq = facts.prereq.len(), "facts extracted");
        Ok(facts)
    }
}

// ---------------------------------------------------------------------------
// Reply parsing
// ---------------------------------------------------------------------------

/// Parse and normalize one model reply into [`CourseFacts`].
fn parse_facts(content: &str) -> Result<CourseFacts> {
    let body = strip_fences(content);
    let raw: RawFacts = serde_json::from_str(body).map_err(|e| {
        CatalogError::Extraction(format!("model output was not valid JSON: {e}"))
    })?;

    Ok(CourseFacts {
        credit: normalize_credit(raw.credit),
        prereq: normalize_list(raw.prereq, true),
        gened: normalize_list(raw.gened, false),
    })
}

/// Models frequently wrap JSON in a markdown fence despite instructions.
fn strip_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

fn normalize_credit(field: Option<CreditField>) -> Option<i64> {
    match field {
        Some(CreditField::Number(n)) => Some(n),
        Some(CreditField::Text(s)) => s.trim().parse().ok(),
        None => None,
    }
}

/// Collapse the string-or-array drift into a clean code list. `"N/A"` in any
/// spelling becomes the canonical sentinel; a missing or empty field becomes
/// an empty list, which downstream renders as unknown.
fn normalize_list(field: Option<ListField>, check_codes: bool) -> Vec<String> {
    let items = match field {
        Some(ListField::One(s)) => vec![s],
        Some(ListField::Many(v)) => v,
        None => Vec::new(),
    };

    let mut out = Vec::new();
    for item in items {
        let value = item.trim();
        if value.is_empty() {
            continue;
        }
        if value.eq_ignore_ascii_case(NONE_SENTINEL) || value.eq_ignore_ascii_case("none") {
            return vec![NONE_SENTINEL.to_string()];
        }
        // Course codes are canonically upper-case; gen-ed tags keep the
        // source spelling.
        if check_codes {
            let code = value.to_uppercase();
            if !COURSE_CODE.is_match(&code) {
                tracing::warn!(%code, "prerequisite does not look like a course code");
            }
            out.push(code);
        } else {
            out.push(value.to_string());
        }
    }
    out
}
