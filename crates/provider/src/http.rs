//! HTTP-backed provider adapter.
//!
//! Talks to any OpenAI-compatible chat-completions endpoint using
//! [`reqwest`]. The model is instructed to answer with a single JSON
//! document; the reply is parsed into wire types and then validated
//! with the core validators before it is handed upward, so malformed
//! model output never leaves this module as anything but
//! [`ProviderError::MalformedResponse`].

use async_trait::async_trait;
use serde::Deserialize;

use coursegen_core::content::{BlockKind, ContentBlock, GeneratedContent};
use coursegen_core::course::{ChapterSpec, CourseSpec, ProficiencyLevel};
use coursegen_core::quality::ValidationSignal;
use coursegen_core::{content, course};

use crate::adapter::ProviderAdapter;
use crate::error::ProviderError;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Connection settings for one OpenAI-compatible backend.
#[derive(Debug, Clone)]
pub struct HttpProviderConfig {
    /// Stable provider name, e.g. `openai-primary`.
    pub name: String,
    /// Base API URL without trailing slash, e.g. `https://api.openai.com/v1`.
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

/// Provider adapter over an OpenAI-compatible chat-completions API.
pub struct HttpProvider {
    config: HttpProviderConfig,
    client: reqwest::Client,
}

impl HttpProvider {
    pub fn new(config: HttpProviderConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    /// Reuse an existing [`reqwest::Client`] for connection pooling
    /// across providers.
    pub fn with_client(client: reqwest::Client, config: HttpProviderConfig) -> Self {
        Self { config, client }
    }

    // ---- HTTP plumbing ----

    /// Issue one chat completion and return the first choice's text.
    async fn complete(&self, system: &str, user: &str) -> Result<String, ProviderError> {
        let body = serde_json::json!({
            "model": self.config.model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user},
            ],
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(ProviderError::QuotaExceeded);
        }
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ProviderError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| ProviderError::MalformedResponse("empty choices array".to_string()))
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

// ---------------------------------------------------------------------------
// Wire formats
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct StructureWire {
    chapters: Vec<ChapterWire>,
}

#[derive(Deserialize)]
struct ChapterWire {
    title: String,
    objectives: Vec<String>,
    duration_minutes: u32,
    complexity: f64,
    #[serde(default)]
    prerequisites: Vec<String>,
}

#[derive(Deserialize)]
struct ContentWire {
    blocks: Vec<BlockWire>,
    #[serde(default)]
    key_concepts: Vec<String>,
    #[serde(default)]
    examples: Vec<String>,
    #[serde(default)]
    exercises: Vec<String>,
    summary: String,
}

#[derive(Deserialize)]
struct BlockWire {
    #[serde(default = "default_block_kind")]
    kind: BlockKind,
    body: String,
}

fn default_block_kind() -> BlockKind {
    BlockKind::Text
}

/// Parse and validate a structure reply. Sequence numbers and chapter
/// ids are assigned locally; the model only orders the list.
fn parse_structure(raw: &str) -> Result<Vec<ChapterSpec>, ProviderError> {
    let wire: StructureWire = serde_json::from_str(raw)
        .map_err(|e| ProviderError::MalformedResponse(format!("structure JSON: {e}")))?;

    let chapters: Vec<ChapterSpec> = wire
        .chapters
        .into_iter()
        .enumerate()
        .map(|(i, c)| ChapterSpec {
            id: uuid::Uuid::new_v4(),
            sequence_number: (i + 1) as u32,
            title: c.title,
            objectives: c.objectives,
            duration_minutes: c.duration_minutes,
            complexity: c.complexity,
            prerequisites: c.prerequisites,
        })
        .collect();

    course::validate_structure(&chapters)
        .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;
    Ok(chapters)
}

/// Parse and validate a content reply for one chapter. Block order is
/// taken from list position.
fn parse_content(
    raw: &str,
    chapter: &ChapterSpec,
) -> Result<GeneratedContent, ProviderError> {
    let wire: ContentWire = serde_json::from_str(raw)
        .map_err(|e| ProviderError::MalformedResponse(format!("content JSON: {e}")))?;

    let content = GeneratedContent {
        chapter_id: chapter.id,
        blocks: wire
            .blocks
            .into_iter()
            .enumerate()
            .map(|(i, b)| ContentBlock {
                kind: b.kind,
                order: (i + 1) as u32,
                body: b.body,
            })
            .collect(),
        key_concepts: wire.key_concepts,
        examples: wire.examples,
        exercises: wire.exercises,
        summary: wire.summary,
    };

    content::validate_content(&content)
        .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;
    Ok(content)
}

fn parse_validation(raw: &str) -> Result<ValidationSignal, ProviderError> {
    serde_json::from_str(raw)
        .map_err(|e| ProviderError::MalformedResponse(format!("validation JSON: {e}")))
}

// ---------------------------------------------------------------------------
// Prompts
// ---------------------------------------------------------------------------

const STRUCTURE_SYSTEM: &str = "You are a curriculum designer. Reply with a single \
JSON object {\"chapters\": [{\"title\", \"objectives\", \"duration_minutes\", \
\"complexity\", \"prerequisites\"}]}. Complexity is 1.0-5.0 and must not decrease \
across chapters. No prose outside the JSON.";

const CONTENT_SYSTEM: &str = "You are a course author. Reply with a single JSON \
object {\"blocks\": [{\"kind\", \"body\"}], \"key_concepts\", \"examples\", \
\"exercises\", \"summary\"}. Block kinds: text, code, image, video, diagram. \
No prose outside the JSON.";

const VALIDATION_SYSTEM: &str = "You are a course reviewer. Score the supplied \
chapter against its objectives. Reply with a single JSON object {\"overall\", \
\"readability\", \"pedagogy\", \"coverage\", \"accuracy\", \"issues\"} where all \
scores are 0.0-1.0 and issues is a list of strings. No prose outside the JSON.";

fn structure_prompt(spec: &CourseSpec) -> String {
    format!(
        "Design the chapter structure for a course.\n\
         Title: {}\nDomain: {}\nAudience: {}\nDuration: {} hours\n\
         Objectives:\n{}\nAssumed prerequisites:\n{}",
        spec.title,
        spec.domain,
        spec.level.label(),
        spec.duration_hours,
        bulleted(&spec.objectives),
        bulleted(&spec.prerequisites),
    )
}

fn content_prompt(
    chapter: &ChapterSpec,
    level: ProficiencyLevel,
    prior_concepts: &[String],
) -> String {
    format!(
        "Write chapter {} \"{}\" for a {} audience ({} minutes, complexity {}).\n\
         Objectives:\n{}\nConcepts already introduced in earlier chapters:\n{}",
        chapter.sequence_number,
        chapter.title,
        level.label(),
        chapter.duration_minutes,
        chapter.complexity,
        bulleted(&chapter.objectives),
        bulleted(prior_concepts),
    )
}

fn validation_prompt(
    content: &GeneratedContent,
    level: ProficiencyLevel,
    objectives: &[String],
    domain: &str,
) -> String {
    format!(
        "Review this {} chapter for a {} audience.\nObjectives:\n{}\n\nContent:\n{}",
        domain,
        level.label(),
        bulleted(objectives),
        content.combined_text(),
    )
}

fn bulleted(items: &[String]) -> String {
    if items.is_empty() {
        return "(none)".to_string();
    }
    items
        .iter()
        .map(|s| format!("- {s}"))
        .collect::<Vec<_>>()
        .join("\n")
}

// ---------------------------------------------------------------------------
// Adapter impl
// ---------------------------------------------------------------------------

#[async_trait]
impl ProviderAdapter for HttpProvider {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn generate_structure(
        &self,
        spec: &CourseSpec,
    ) -> Result<Vec<ChapterSpec>, ProviderError> {
        let raw = self
            .complete(STRUCTURE_SYSTEM, &structure_prompt(spec))
            .await?;
        parse_structure(&raw)
    }

    async fn generate_chapter_content(
        &self,
        chapter: &ChapterSpec,
        level: ProficiencyLevel,
        prior_concepts: &[String],
    ) -> Result<GeneratedContent, ProviderError> {
        let raw = self
            .complete(CONTENT_SYSTEM, &content_prompt(chapter, level, prior_concepts))
            .await?;
        parse_content(&raw, chapter)
    }

    async fn validate_content(
        &self,
        content: &GeneratedContent,
        level: ProficiencyLevel,
        objectives: &[String],
        domain: &str,
    ) -> Result<ValidationSignal, ProviderError> {
        let raw = self
            .complete(
                VALIDATION_SYSTEM,
                &validation_prompt(content, level, objectives, domain),
            )
            .await?;
        parse_validation(&raw)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
