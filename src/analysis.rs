//! AI summarization collaborator boundary.
//!
//! The core sends the deterministic summary prompt to an OpenAI-compatible
//! chat-completions endpoint and expects a single JSON object back. The
//! response shape is never trusted silently: content goes through code-fence
//! stripping and embedded-JSON recovery before a typed parse, and every
//! failure mode surfaces as a recoverable [`AnalysisError`]. The locally
//! computed score stays authoritative; the collaborator's
//! `compliance_percent` is only a consistency cross-check.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_ENDPOINT: &str = "https://api.groq.com/openai/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "meta-llama/llama-4-scout-17b-16e-instruct";

pub const ENV_ENDPOINT: &str = "INSPECTA_AI_URL";
pub const ENV_API_KEY: &str = "INSPECTA_AI_KEY";
pub const ENV_MODEL: &str = "INSPECTA_AI_MODEL";

/// Four ordered risk levels; ordering follows declaration order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn label(self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }
}

/// Parsed collaborator response. Unknown extra fields are tolerated; missing
/// required fields are a typed failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub executive_summary: String,
    pub risk_level: RiskLevel,
    #[serde(default)]
    pub critical_findings: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    /// Should equal the locally computed overall score; a float here is
    /// tolerated because some models echo `67.0`.
    pub compliance_percent: f64,
}

impl Analysis {
    /// Consistency cross-check against the local overall score.
    pub fn matches_local_score(&self, overall: u8) -> bool {
        self.compliance_percent.round() as u8 == overall
    }
}

/// Recoverable, retryable failures of the summarization call. None of these
/// touch the form snapshot.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("AI summarization is not configured: set INSPECTA_AI_KEY to your API key")]
    MissingApiKey,
    #[error("summarization request failed: {0}")]
    Transport(String),
    #[error("summarization service returned HTTP {0}")]
    Status(u16),
    #[error("summarization response was malformed: {0}")]
    Malformed(String),
}

/// Endpoint configuration, resolved from the environment with the hosted
/// defaults the original deployment used.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, AnalysisError> {
        let api_key = std::env::var(ENV_API_KEY)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or(AnalysisError::MissingApiKey)?;
        let endpoint =
            std::env::var(ENV_ENDPOINT).unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string());
        let model = std::env::var(ENV_MODEL).unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        Ok(Self {
            endpoint,
            api_key,
            model,
        })
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Send the prompt and parse the analysis out of the first choice.
pub fn request_analysis(config: &ClientConfig, prompt: &str) -> Result<Analysis, AnalysisError> {
    let body = serde_json::json!({
        "model": config.model,
        "messages": [{ "role": "user", "content": prompt }],
        "temperature": 0.3,
        "max_tokens": 2048,
    });
    let mut response = ureq::post(&config.endpoint)
        .header("Authorization", &format!("Bearer {}", config.api_key))
        .send_json(&body)
        .map_err(|err| match err {
            ureq::Error::StatusCode(code) => AnalysisError::Status(code),
            other => AnalysisError::Transport(other.to_string()),
        })?;
    let chat: ChatResponse = response
        .body_mut()
        .read_json()
        .map_err(|err| AnalysisError::Malformed(format!("response JSON failed to parse: {err}")))?;
    let content = chat
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| AnalysisError::Malformed("response contained no content".to_string()))?;
    parse_analysis(&content)
}

/// Parse the model's text into an [`Analysis`], tolerating markdown fences
/// and surrounding prose but never an unparseable or incomplete object.
pub fn parse_analysis(text: &str) -> Result<Analysis, AnalysisError> {
    let cleaned = strip_code_fences(text);
    let value: Value = match serde_json::from_str(&cleaned) {
        Ok(value) => value,
        Err(err) => extract_json_from_text(&cleaned).ok_or_else(|| {
            AnalysisError::Malformed(format!(
                "no JSON object found ({err}): {}",
                snippet(text, 200)
            ))
        })?,
    };
    serde_json::from_value(value)
        .map_err(|err| AnalysisError::Malformed(format!("{err}: {}", snippet(text, 200))))
}

/// Persist an analysis to the result slot. Last write wins.
pub fn write_analysis(path: &Path, analysis: &Analysis) -> Result<()> {
    let text = serde_json::to_string_pretty(analysis).context("serialize analysis")?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create parent dir {}", parent.display()))?;
    }
    std::fs::write(path, text.as_bytes()).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

/// Read back the last stored analysis, if any.
pub fn load_analysis(path: &Path) -> Result<Option<Analysis>> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err).with_context(|| format!("read {}", path.display())),
    };
    let analysis =
        serde_json::from_slice(&bytes).with_context(|| format!("parse {}", path.display()))?;
    Ok(Some(analysis))
}

fn strip_code_fences(raw: &str) -> String {
    let trimmed = raw.trim();
    if !trimmed.starts_with("```") {
        return trimmed.to_string();
    }
    let mut lines: Vec<&str> = trimmed.lines().collect();
    if let Some(first) = lines.first() {
        if first.trim_start().starts_with("```") {
            lines.remove(0);
        }
    }
    if let Some(last) = lines.last() {
        if last.trim_start().starts_with("```") {
            lines.pop();
        }
    }
    lines.join("\n").trim().to_string()
}

fn extract_json_from_text(raw: &str) -> Option<Value> {
    for (idx, ch) in raw.char_indices() {
        if ch != '{' {
            continue;
        }
        let mut deserializer = serde_json::Deserializer::from_str(&raw[idx..]);
        if let Ok(value) = Value::deserialize(&mut deserializer) {
            return Some(value);
        }
    }
    None
}

fn snippet(text: &str, max_bytes: usize) -> String {
    let mut out = String::new();
    for ch in text.chars() {
        if out.len() + ch.len_utf8() > max_bytes {
            break;
        }
        out.push(ch);
    }
    out
}
