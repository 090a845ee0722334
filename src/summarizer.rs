use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::warn;

use crate::api::models::ModuleEntry;
use crate::config::Config;

/// How much of a problematic model response is kept in error messages.
const RAW_RESPONSE_SNIPPET: usize = 500;

#[derive(Debug, thiserror::Error)]
pub enum StructureError {
    #[error("Summarizer not configured: GEMINI_API_KEY is missing")]
    NotConfigured,

    #[error("Language model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Model response is not valid JSON: {raw}")]
    MalformedJson { raw: String },

    #[error("Model returned no well-formed module entries")]
    EmptyResult,
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "responseMimeType")]
    response_mime_type: String,
}

/// Turns page text into a module/submodule hierarchy through one Gemini
/// `generateContent` call. Holds no per-request state; safe to share.
#[derive(Clone)]
pub struct Summarizer {
    api_key: Option<String>,
    endpoint: String,
    model: String,
    temperature: f32,
    timeout: Duration,
}

impl Summarizer {
    pub fn from_config(config: &Config) -> Self {
        Summarizer {
            api_key: config.gemini_api_key.clone(),
            endpoint: config.gemini_endpoint.clone(),
            model: config.gemini_model.clone(),
            temperature: config.model_temperature,
            timeout: config.model_timeout,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Single non-streaming model call followed by parse and validation.
    /// Fails with `NotConfigured` before any network access when no key is set.
    pub async fn structure(&self, text: &str, url: &str) -> Result<Vec<ModuleEntry>, StructureError> {
        let Some(api_key) = &self.api_key else {
            return Err(StructureError::NotConfigured);
        };

        let prompt = build_prompt(text, url);
        let raw = match tokio::time::timeout(self.timeout, self.invoke(api_key, &prompt)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(StructureError::ModelUnavailable(format!(
                    "model call timed out after {:?}",
                    self.timeout
                )));
            }
        };

        parse_model_response(&raw)
    }

    async fn invoke(&self, api_key: &str, prompt: &str) -> Result<String, StructureError> {
        let client = Client::new();
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                response_mime_type: "application/json".into(),
            },
        };

        let endpoint = format!(
            "{}/v1beta/models/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            self.model
        );

        let res = client
            .post(&endpoint)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| StructureError::ModelUnavailable(e.to_string()))?;

        let status = res.status();
        if !status.is_success() {
            return Err(StructureError::ModelUnavailable(format!(
                "model service returned HTTP {}",
                status
            )));
        }

        let json: Value = res
            .json()
            .await
            .map_err(|e| StructureError::ModelUnavailable(e.to_string()))?;
        let reply = json["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .ok_or_else(|| {
                StructureError::ModelUnavailable("unexpected response shape from model service".into())
            })?
            .to_string();

        Ok(reply)
    }
}

/// Instruction template sent to the model. Embeds the page text and pins the
/// exact JSON output shape; the model is told to emit nothing but that JSON.
fn build_prompt(content: &str, url: &str) -> String {
    format!(
        r#"You are given the textual content of a documentation or help page from {url}.
Analyze it and restructure it into JSON identifying the modules and submodules of the product being documented.

Definitions:
- Module: a major functional component or section of the product, typically spanning several related features.
- Submodule: a specific feature, capability or process belonging to a module.

For example, for Instagram "Reels" would be a module with submodules such as "Create Reels", "Edit Reels" and "Share Reels".

The page content, extracted as plain text:
---
{content}
---

Respond with ONLY a JSON array in exactly this shape, no commentary and no code fences:
[
  {{
    "module": "Module_Name",
    "Description": "Detailed description of the module",
    "Submodules": {{
      "Submodule_Name": "Detailed description of the submodule"
    }}
  }}
]

Ignore navigation chrome and boilerplate. If a module has no clear submodules, use an empty object for "Submodules". Base every description solely on the provided content."#
    )
}

/// Strips commentary and code fences around the JSON body by slicing from the
/// first `[` to the last `]`. Idempotent on already-clean input.
fn extract_json_array(raw: &str) -> Option<&str> {
    let start = raw.find('[')?;
    let end = raw.rfind(']')?;
    if end < start {
        return None;
    }
    Some(&raw[start..=end])
}

fn truncate_snippet(raw: &str) -> String {
    let snippet: String = raw.chars().take(RAW_RESPONSE_SNIPPET).collect();
    if raw.chars().count() > RAW_RESPONSE_SNIPPET {
        format!("{}...", snippet)
    } else {
        snippet
    }
}

fn malformed(raw: &str) -> StructureError {
    StructureError::MalformedJson {
        raw: truncate_snippet(raw),
    }
}

/// Decodes untrusted model output into module entries.
///
/// Fence-stripping happens before the decode; the decode itself does no
/// semantic repair. Individual entries without a module name are dropped,
/// but an empty result after filtering is an error.
pub fn parse_model_response(raw: &str) -> Result<Vec<ModuleEntry>, StructureError> {
    let payload = extract_json_array(raw).ok_or_else(|| malformed(raw))?;
    let value: Value = serde_json::from_str(payload).map_err(|_| malformed(raw))?;
    let Value::Array(items) = value else {
        return Err(malformed(raw));
    };

    let entries = filter_entries(&items);
    if entries.is_empty() {
        return Err(StructureError::EmptyResult);
    }
    Ok(entries)
}

/// Permissive filter over raw model entries: keeps every element with a
/// non-empty `module` name, drops the rest with a warning. Submodule values
/// that are not strings are dropped the same way.
pub fn filter_entries(items: &[Value]) -> Vec<ModuleEntry> {
    let mut entries = Vec::with_capacity(items.len());
    for item in items {
        let Some(name) = item
            .get("module")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|name| !name.is_empty())
        else {
            warn!(entry = %item, "dropping model entry without a module name");
            continue;
        };

        let description = item
            .get("Description")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let mut submodules = Map::new();
        if let Some(raw_submodules) = item.get("Submodules").and_then(Value::as_object) {
            for (sub_name, sub_description) in raw_submodules {
                match sub_description.as_str() {
                    Some(text) => {
                        submodules.insert(sub_name.clone(), Value::String(text.to_string()));
                    }
                    None => {
                        warn!(module = name, submodule = %sub_name, "dropping non-string submodule description");
                    }
                }
            }
        }

        entries.push(ModuleEntry {
            name: name.to_string(),
            description,
            submodules,
        });
    }
    entries
}
