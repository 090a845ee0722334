use axum::{
    Router,
    extract::{Json, State},
    routing::post,
};
use tracing::{info, warn};

use crate::AppState;
use crate::api::models::{SummarizeRequest, SummarizeResponse};
use crate::crawler;
use crate::error::{ApiError, Result};
use tower_http::cors::{Any, CorsLayer};

pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/summarize/", post(summarize_handler))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(app_state)
}

async fn summarize_handler(
    State(state): State<AppState>,
    Json(req): Json<SummarizeRequest>,
) -> Result<Json<SummarizeResponse>> {
    info!(url = %req.url, "received summarize request");
    let start = std::time::Instant::now();

    let result = process_summarize_request(&state, &req.url).await;

    match &result {
        Ok(response) => info!(
            url = %req.url,
            modules = response.data.len(),
            elapsed = ?start.elapsed(),
            "request succeeded"
        ),
        Err(err) => warn!(
            url = %req.url,
            source = err.source(),
            error = %err,
            "request failed"
        ),
    }

    result.map(Json)
}

/// Runs the per-request pipeline: validate, fetch, structure, assemble.
/// Strictly sequential; the first failing stage terminates the request.
async fn process_summarize_request(state: &AppState, url: &str) -> Result<SummarizeResponse> {
    // Validating
    let url = url.trim();
    if url.is_empty() {
        return Err(ApiError::Validation("URL must be provided.".into()));
    }
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(ApiError::Validation(
            "Invalid URL format. Must start with http:// or https://".into(),
        ));
    }

    // Fetching
    let doc = crawler::fetch(url, state.config.fetch_timeout).await?;

    // Structuring; long pages are cut down before they go into the prompt
    let text_for_summary = truncate_chars(&doc.raw_content, state.config.max_prompt_chars);
    let summarized_length = text_for_summary.chars().count();
    if summarized_length < doc.content_length {
        warn!(
            url = %doc.url,
            original = doc.content_length,
            truncated = summarized_length,
            "page text truncated before the model call"
        );
    }

    let data = state.summarizer.structure(text_for_summary, &doc.url).await?;

    // Assembling
    Ok(SummarizeResponse {
        status: "success".to_string(),
        data,
        crawled_url: doc.url.clone(),
        original_markdown_length: doc.content_length,
        summarized_markdown_length: summarized_length,
    })
}

/// Character-based truncation, cut on a char boundary.
fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
