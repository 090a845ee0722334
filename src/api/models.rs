use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Deserialize)]
pub struct SummarizeRequest {
    // Missing field decodes as "" so the handler can answer 400 instead of
    // axum's generic 422 rejection.
    #[serde(default)]
    pub url: String,
}

/// One module identified by the model. Field casing on the wire is inherited
/// from the model output contract: `module`, `Description`, `Submodules`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleEntry {
    #[serde(rename = "module")]
    pub name: String,
    #[serde(rename = "Description")]
    pub description: String,
    /// Submodule name to description, in the order the model produced them.
    #[serde(rename = "Submodules")]
    pub submodules: Map<String, Value>,
}

#[derive(Serialize)]
pub struct SummarizeResponse {
    pub status: String,
    pub data: Vec<ModuleEntry>,
    pub crawled_url: String,
    pub original_markdown_length: usize,
    pub summarized_markdown_length: usize,
}
