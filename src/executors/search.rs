//! Web search against an HTML results endpoint (DuckDuckGo layout)

use async_trait::async_trait;
use schemars::JsonSchema;
use scraper::{ Html, Selector };
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::info;

use super::{ ToolExecutor, parse_arguments };
use crate::errors::Error;
use crate::types::{ CallToolResult, Tool };

const DEFAULT_LIMIT: usize = 8;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct WebSearchParams {
    pub query: String,
    /// Maximum number of results, default 8
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

pub struct SearchExecutor {
    endpoint: String,
    client: reqwest::Client,
}

impl SearchExecutor {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, Error> {
        let client = reqwest::Client
            ::builder()
            .timeout(timeout)
            .user_agent(concat!("cop-rs/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Other(format!("Failed to build search client: {}", e)))?;
        Ok(Self {
            endpoint: endpoint.into(),
            client,
        })
    }

    async fn search(&self, params: WebSearchParams) -> Result<CallToolResult, Error> {
        let limit = params.limit.unwrap_or(DEFAULT_LIMIT);
        info!("Web search: '{}' limit={}", params.query, limit);

        let separator = if self.endpoint.contains('?') { '&' } else { '?' };
        let url = format!("{}{}q={}", self.endpoint, separator, urlencoding::encode(&params.query));

        let response = self.client
            .get(&url)
            .send().await
            .map_err(|e| Error::Execution(format!("Search request failed: {}", e)))?;
        if !response.status().is_success() {
            return Err(Error::Execution(format!("Search endpoint returned HTTP {}", response.status())));
        }
        let html = response
            .text().await
            .map_err(|e| Error::Execution(format!("Failed to read search results: {}", e)))?;

        let hits = parse_results(&html, limit);
        if hits.is_empty() {
            return Ok(CallToolResult::text(format!("No search results found for '{}'.", params.query)));
        }

        let mut output = format!("Search results for '{}':\n\n", params.query);
        for (i, hit) in hits.iter().enumerate() {
            output.push_str(&format!("{}. {}\n{}\n{}\n\n", i + 1, hit.title, hit.url, hit.snippet));
        }
        Ok(CallToolResult::text(output.trim_end().to_string()))
    }
}

fn text_of(element: Option<scraper::ElementRef<'_>>) -> String {
    element
        .map(|e| e.text().flat_map(str::split_whitespace).collect::<Vec<_>>().join(" "))
        .unwrap_or_default()
}

/// Extract result entries from a results page
pub fn parse_results(html: &str, limit: usize) -> Vec<SearchHit> {
    let (Ok(result), Ok(title), Ok(snippet), Ok(url)) = (
        Selector::parse(".result"),
        Selector::parse(".result__a"),
        Selector::parse(".result__snippet"),
        Selector::parse(".result__url"),
    ) else {
        return Vec::new();
    };

    let document = Html::parse_document(html);
    document
        .select(&result)
        .filter_map(|element| {
            let link = element.select(&title).next();
            let hit = SearchHit {
                title: text_of(link),
                url: match text_of(element.select(&url).next()) {
                    shown if !shown.is_empty() => shown,
                    _ =>
                        link
                            .and_then(|l| l.value().attr("href"))
                            .unwrap_or_default()
                            .to_string(),
                },
                snippet: text_of(element.select(&snippet).next()),
            };
            (!hit.title.is_empty()).then_some(hit)
        })
        .take(limit)
        .collect()
}

#[async_trait]
impl ToolExecutor for SearchExecutor {
    fn family(&self) -> &str {
        "search"
    }

    fn operations(&self) -> Vec<Tool> {
        vec![Tool::for_params::<WebSearchParams>("web_search", "Search the web and return titles, links and snippets")]
    }

    async fn execute(&self, operation: &str, arguments: Value) -> Result<CallToolResult, Error> {
        match operation {
            "web_search" => self.search(parse_arguments(operation, arguments)?).await,
            other => Err(Error::Execution(format!("search executor has no operation '{}'", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const RESULTS: &str =
        r#"<html><body>
        <div class="result">
          <h2><a class="result__a" href="https://www.rust-lang.org/">Rust Programming Language</a></h2>
          <a class="result__url">www.rust-lang.org</a>
          <a class="result__snippet">A language empowering everyone to build
             reliable and efficient software.</a>
        </div>
        <div class="result">
          <h2><a class="result__a" href="https://doc.rust-lang.org/book/">The Book</a></h2>
          <a class="result__snippet">Learn Rust.</a>
        </div>
        <div class="result"><span>ad slot</span></div>
        </body></html>"#;

    #[test]
    fn parses_results_page() {
        let hits = parse_results(RESULTS, 10);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].title, "Rust Programming Language");
        assert_eq!(hits[0].url, "www.rust-lang.org");
        assert_eq!(
            hits[0].snippet,
            "A language empowering everyone to build reliable and efficient software."
        );
        assert_eq!(hits[1].url, "https://doc.rust-lang.org/book/");

        assert_eq!(parse_results(RESULTS, 1).len(), 1);
        assert!(parse_results("<html></html>", 5).is_empty());
    }

    #[tokio::test]
    async fn queries_the_configured_endpoint() {
        use axum::{ Router, extract::Query, response::Html as HtmlBody, routing::get };
        use std::collections::HashMap;

        let app = Router::new().route(
            "/html/",
            get(|Query(q): Query<HashMap<String, String>>| async move {
                assert_eq!(q.get("q").map(String::as_str), Some("rust async"));
                HtmlBody(RESULTS)
            })
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let search = SearchExecutor::new(format!("http://{}/html/", addr), Duration::from_secs(5)).unwrap();
        let result = search
            .execute("web_search", json!({ "query": "rust async", "limit": 1 })).await
            .unwrap();
        let text = result.first_text().unwrap();
        assert!(text.starts_with("Search results for 'rust async':"));
        assert!(text.contains("1. Rust Programming Language"));
        assert!(!text.contains("The Book"));
    }
}
