use std::future::Future;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use wouldyou_types::NewChallenge;

const DEFAULT_CATEGORY: &str = "general";
const DEFAULT_BATCH: usize = 10;
const MAX_BATCH: usize = 50;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

const SYSTEM_PROMPT: &str = "You write questions for a \"Would You Rather\" game. \
Both options must be equally hard to pick, family friendly and original. \
Reply with a JSON array only, no markdown and no commentary.";

/// Source of fresh non-daily challenges, consulted when a category runs low.
pub trait QuestionGenerator: Send + Sync {
    fn is_available(&self) -> bool;

    /// Produces up to `count` validated challenges for `category`.
    fn generate_batch(
        &self,
        category: &str,
        count: usize,
    ) -> impl Future<Output = Result<Vec<NewChallenge>>> + Send;
}

/// Generator used when no LLM endpoint is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoGenerator;

impl QuestionGenerator for NoGenerator {
    fn is_available(&self) -> bool {
        false
    }

    async fn generate_batch(&self, _category: &str, _count: usize) -> Result<Vec<NewChallenge>> {
        bail!("question generator not configured")
    }
}

#[derive(Debug, Clone)]
pub struct GlmConfig {
    pub api_url: String,
    pub api_key: String,
    pub model: String,
}

/// Chat-completions client for GLM style endpoints.
pub struct GlmGenerator {
    client: Client,
    config: GlmConfig,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct GeneratedQuestion {
    #[serde(default)]
    option_a: String,
    #[serde(default)]
    option_b: String,
    #[serde(default)]
    category: String,
}

impl GlmGenerator {
    pub fn new(config: GlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client, config })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    async fn request(&self, category: &str, count: usize) -> Result<String> {
        let body = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt(category, count),
                },
            ],
            temperature: 0.9,
            max_tokens: 4096,
        };

        let resp = self
            .client
            .post(&self.config.api_url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&body)
            .send()
            .await
            .context("GLM request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            error!("GLM API error: status={}, body={}", status, text);
            bail!("GLM API returned status {}: {}", status, text);
        }

        let reply: ChatResponse = resp.json().await.context("Failed to parse GLM response")?;
        reply_content(reply)
    }
}

impl QuestionGenerator for GlmGenerator {
    fn is_available(&self) -> bool {
        !self.config.api_key.trim().is_empty()
    }

    async fn generate_batch(&self, category: &str, count: usize) -> Result<Vec<NewChallenge>> {
        if !self.is_available() {
            bail!("GLM API key not configured");
        }

        let category = normalize_category(category);
        let count = clamp_count(count);
        debug!("Requesting {} questions for category {} from {}", count, category, self.config.model);

        let content = self.request(&category, count).await?;
        let questions = parse_questions(&content, &category)?;
        info!("Generated {} questions for category {}", questions.len(), category);
        Ok(questions)
    }
}

fn user_prompt(category: &str, count: usize) -> String {
    format!(
        "Generate exactly {count} \"Would You Rather\" questions for the category \"{category}\". \
         Return a JSON array of objects shaped like \
         {{\"option_a\": \"...\", \"option_b\": \"...\", \"category\": \"{category}\"}}."
    )
}

fn normalize_category(category: &str) -> String {
    let trimmed = category.trim();
    if trimmed.is_empty() {
        DEFAULT_CATEGORY.to_string()
    } else {
        trimmed.to_string()
    }
}

fn clamp_count(count: usize) -> usize {
    match count {
        0 => DEFAULT_BATCH,
        n => n.min(MAX_BATCH),
    }
}

fn reply_content(reply: ChatResponse) -> Result<String> {
    if let Some(choice) = reply.choices.into_iter().next() {
        return Ok(choice.message.content);
    }
    reply
        .content
        .into_iter()
        .next()
        .map(|block| block.text)
        .ok_or_else(|| anyhow!("No content in GLM response"))
}

/// Strips a markdown code fence the model may wrap its answer in.
fn strip_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let trimmed = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    trimmed.strip_suffix("```").unwrap_or(trimmed).trim()
}

/// Parses the model's JSON array into challenges.
///
/// Entries missing either option are skipped. Categories are lower-cased and
/// fall back to `category`. An answer with no usable entry is an error.
pub fn parse_questions(content: &str, category: &str) -> Result<Vec<NewChallenge>> {
    let json = strip_fences(content);
    let raw: Vec<GeneratedQuestion> = serde_json::from_str(json).map_err(|e| {
        warn!("Failed to parse generated questions: {}", e);
        anyhow!("Failed to parse generated questions: {}", e)
    })?;

    let fallback = normalize_category(category).to_lowercase();
    let mut questions = Vec::with_capacity(raw.len());
    for (i, q) in raw.into_iter().enumerate() {
        let option_a = q.option_a.trim();
        let option_b = q.option_b.trim();
        if option_a.is_empty() || option_b.is_empty() {
            debug!("Skipping generated question {}: missing option", i);
            continue;
        }

        let category = match q.category.trim() {
            "" => fallback.clone(),
            c => c.to_lowercase(),
        };
        questions.push(NewChallenge::new(option_a, option_b, &category));
    }

    if questions.is_empty() {
        bail!("No valid questions generated");
    }
    Ok(questions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_is_clamped() {
        assert_eq!(clamp_count(0), 10);
        assert_eq!(clamp_count(7), 7);
        assert_eq!(clamp_count(50), 50);
        assert_eq!(clamp_count(500), 50);
    }

    #[test]
    fn blank_category_becomes_general() {
        assert_eq!(normalize_category("  "), "general");
        assert_eq!(normalize_category(" tech "), "tech");
    }

    #[test]
    fn fenced_reply_is_parsed_and_cleaned() {
        let content = "```json\n[\
            {\"option_a\": \"  Fly \", \"option_b\": \"Breathe underwater\", \"category\": \"SuperPower\"},\
            {\"option_a\": \"\", \"option_b\": \"Nothing\", \"category\": \"funny\"},\
            {\"option_a\": \"Read minds\", \"option_b\": \"Be invisible\"}\
        ]\n```";

        let questions = parse_questions(content, "superpower").unwrap();
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0], NewChallenge::new("Fly", "Breathe underwater", "superpower"));
        assert_eq!(questions[1].category, "superpower");
    }

    #[test]
    fn reply_without_valid_entries_is_an_error() {
        assert!(parse_questions("[]", "deep").is_err());
        assert!(parse_questions("[{\"option_a\": \"x\"}]", "deep").is_err());
        assert!(parse_questions("not json", "deep").is_err());
    }

    #[test]
    fn content_falls_back_to_content_blocks() {
        let reply: ChatResponse =
            serde_json::from_str(r#"{"content": [{"text": "[1]"}]}"#).unwrap();
        assert_eq!(reply_content(reply).unwrap(), "[1]");

        let reply: ChatResponse = serde_json::from_str(
            r#"{"choices": [{"message": {"role": "assistant", "content": "[2]"}}], "content": [{"text": "[1]"}]}"#,
        )
        .unwrap();
        assert_eq!(reply_content(reply).unwrap(), "[2]");

        let empty: ChatResponse = serde_json::from_str("{}").unwrap();
        assert!(reply_content(empty).is_err());
    }

    #[tokio::test]
    async fn no_generator_is_unavailable() {
        assert!(!NoGenerator.is_available());
        assert!(NoGenerator.generate_batch("deep", 3).await.is_err());
    }

    #[test]
    fn blank_key_means_unavailable() {
        let generator = GlmGenerator::new(GlmConfig {
            api_url: "http://localhost:1/v1/chat/completions".into(),
            api_key: "  ".into(),
            model: "glm-5".into(),
        })
        .unwrap();
        assert!(!generator.is_available());
        assert_eq!(generator.model(), "glm-5");
    }
}
