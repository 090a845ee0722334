use std::time::Duration;

use once_cell::sync::Lazy;
use reqwest::{Client, ClientBuilder};
use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

// Create a static client to reuse connections; the per-request deadline is
// enforced by the caller-supplied timeout in `fetch`.
static CLIENT: Lazy<Client> = Lazy::new(|| {
    ClientBuilder::new()
        .connect_timeout(Duration::from_secs(5))
        .pool_max_idle_per_host(10)
        .build()
        .expect("Failed to build HTTP client")
});

// Create static selectors to avoid recompiling them each time
static BODY_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("body").expect("Failed to parse body selector"));

/// Page content as extracted by the fetch stage. Request-scoped; built once
/// and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub url: String,
    pub raw_content: String,
    /// Character count of `raw_content`.
    pub content_length: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Invalid URL '{0}': must be an absolute http(s) URL")]
    InvalidUrl(String),

    #[error("Could not reach {url}: {reason}")]
    Unreachable { url: String, reason: String },

    #[error("No extractable content at {0}")]
    EmptyContent(String),

    #[error("Fetch engine failure for {url}: {reason}")]
    EngineFailure { url: String, reason: String },
}

/// Fetches a single page and extracts its primary textual content.
///
/// One network attempt, no retries, no link-following. The whole retrieval is
/// bounded by `timeout`; expiry maps to `Unreachable`.
pub async fn fetch(url: &str, timeout: Duration) -> Result<SourceDocument, FetchError> {
    let parsed = validate_url(url)?;

    let html = match tokio::time::timeout(timeout, fetch_html(parsed.as_str())).await {
        Ok(result) => result?,
        Err(_) => {
            return Err(FetchError::Unreachable {
                url: url.to_string(),
                reason: format!("fetch timed out after {:?}", timeout),
            });
        }
    };

    let text = extract_text(&html);
    if text.trim().is_empty() {
        return Err(FetchError::EmptyContent(url.to_string()));
    }

    debug!(url, chars = text.chars().count(), "extracted page text");
    let content_length = text.chars().count();
    Ok(SourceDocument {
        url: parsed.into(),
        raw_content: text,
        content_length,
    })
}

/// Rejects anything that is not an absolute http(s) URL with a host, before
/// any network access happens.
pub fn validate_url(url: &str) -> Result<Url, FetchError> {
    let parsed = Url::parse(url).map_err(|_| FetchError::InvalidUrl(url.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(FetchError::InvalidUrl(url.to_string()));
    }
    Ok(parsed)
}

async fn fetch_html(url: &str) -> Result<String, FetchError> {
    let response = CLIENT
        .get(url)
        .send()
        .await
        .map_err(|e| classify_reqwest_error(url, e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::EngineFailure {
            url: url.to_string(),
            reason: format!("page returned HTTP {}", status),
        });
    }

    response
        .text()
        .await
        .map_err(|e| classify_reqwest_error(url, e))
}

fn classify_reqwest_error(url: &str, err: reqwest::Error) -> FetchError {
    if err.is_timeout() || err.is_connect() {
        FetchError::Unreachable {
            url: url.to_string(),
            reason: err.to_string(),
        }
    } else {
        FetchError::EngineFailure {
            url: url.to_string(),
            reason: err.to_string(),
        }
    }
}

/// Extracts the visible text of the page body as markdown-like plain text:
/// headings get a `#` prefix, everything else becomes one line per text node.
/// Script, style and template contents are skipped.
pub fn extract_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let body = match document.select(&BODY_SELECTOR).next() {
        Some(body) => body,
        None => return String::new(),
    };

    let mut out = String::new();
    for node in body.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let skip = node.ancestors().any(|a| {
            matches!(
                a.value().as_element().map(|e| e.name()),
                Some("script" | "style" | "noscript" | "template")
            )
        });
        if skip {
            continue;
        }
        let trimmed = text.trim();
        if trimmed.is_empty() {
            continue;
        }

        let heading = node
            .ancestors()
            .find_map(|a| a.value().as_element().map(|e| e.name()));
        let prefix = match heading {
            Some("h1") => "# ",
            Some("h2") => "## ",
            Some("h3") => "### ",
            Some("h4") => "#### ",
            Some("h5") => "##### ",
            Some("h6") => "###### ",
            _ => "",
        };
        out.push_str(prefix);
        out.push_str(trimmed);
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_absolute_http_urls() {
        assert!(validate_url("https://example.com/docs/feature").is_ok());
        assert!(validate_url("http://127.0.0.1:8080/page").is_ok());
    }

    #[test]
    fn rejects_non_http_or_relative_urls() {
        for bad in ["", "   ", "example.com", "/docs/feature", "ftp://example.com", "https://"] {
            assert!(
                matches!(validate_url(bad), Err(FetchError::InvalidUrl(_))),
                "expected InvalidUrl for {:?}",
                bad
            );
        }
    }

    #[test]
    fn extracts_text_and_skips_scripts() {
        let html = r#"<html><head><title>t</title></head><body>
            <h1>Getting Started</h1>
            <p>Install the tool.</p>
            <script>var tracking = "noise";</script>
            <style>p { color: red; }</style>
        </body></html>"#;
        let text = extract_text(html);
        assert!(text.contains("# Getting Started"));
        assert!(text.contains("Install the tool."));
        assert!(!text.contains("tracking"));
        assert!(!text.contains("color"));
    }

    #[test]
    fn whitespace_only_body_yields_empty_text() {
        let text = extract_text("<html><body>   \n\t  </body></html>");
        assert!(text.trim().is_empty());
    }

    #[tokio::test]
    async fn invalid_url_fails_before_any_network_access() {
        let err = fetch("not a url", Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl(_)));
    }

    #[tokio::test]
    async fn unreachable_host_maps_to_unreachable() {
        // Port 9 on localhost is assumed closed.
        let err = fetch("http://127.0.0.1:9/", Duration::from_secs(2))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Unreachable { .. }));
    }

    #[tokio::test]
    async fn empty_page_maps_to_empty_content() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/empty")
            .with_status(200)
            .with_body("<html><body><script>only()</script></body></html>")
            .create_async()
            .await;

        let err = fetch(&format!("{}/empty", server.url()), Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::EmptyContent(_)));
    }

    #[tokio::test]
    async fn http_error_status_maps_to_engine_failure() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/missing")
            .with_status(404)
            .create_async()
            .await;

        let err = fetch(&format!("{}/missing", server.url()), Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::EngineFailure { .. }));
    }
}
