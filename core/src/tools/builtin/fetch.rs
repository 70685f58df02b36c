//! fetch tool - fetch and process content from URLs

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::tools::{Tool, ToolContext, ToolMethod, ToolResult};

/// Fetch content from a URL, converting HTML to markdown
pub struct FetchTool;

#[async_trait]
impl Tool for FetchTool {
    fn tool_id(&self) -> &'static str {
        "WebFetch"
    }

    fn methods(&self) -> Vec<ToolMethod> {
        vec![ToolMethod::new(
            "fetch",
            "Fetch content from a URL. Converts HTML to markdown.",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "url": {
                        "type": "string",
                        "description": "URL to fetch"
                    }
                },
                "required": ["url"]
            }),
        )]
    }

    async fn call(&self, _method_name: &str, input: Value, _ctx: &ToolContext) -> ToolResult {
        debug!(?input, "FetchTool::call: called");
        let url = match input["url"].as_str() {
            Some(u) => u,
            None => return ToolResult::error("url is required"),
        };

        if !url.starts_with("http://") && !url.starts_with("https://") {
            return ToolResult::error("URL must start with http:// or https://");
        }

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent("agentcore/0.1 (fetch tool)")
            .build()
            .unwrap_or_default();

        let response = match client.get(url).send().await {
            Ok(r) => r,
            Err(e) => return ToolResult::error(format!("Failed to fetch URL: {}", e)),
        };

        if !response.status().is_success() {
            return ToolResult::error(format!("HTTP error: {}", response.status()));
        }

        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        let body = match response.text().await {
            Ok(b) => b,
            Err(e) => return ToolResult::error(format!("Failed to read response: {}", e)),
        };

        if body.len() > 1_000_000 {
            return ToolResult::error("Response too large (> 1MB)");
        }

        let content = if content_type.contains("text/html") || content_type.contains("application/xhtml") {
            html2md::rewrite_html(&body, false)
        } else if content_type.contains("application/json") {
            match serde_json::from_str::<Value>(&body) {
                Ok(json) => serde_json::to_string_pretty(&json).unwrap_or(body),
                Err(_) => body,
            }
        } else {
            body
        };

        let max_chars = 50_000;
        let output = if content.len() > max_chars {
            format!(
                "{}...\n\n[truncated, {} chars total]",
                &content[..max_chars],
                content.len()
            )
        } else {
            content
        };

        ToolResult::success(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_html_to_markdown() {
        let html = r#"
            <html>
                <body>
                    <h1>Hello World</h1>
                    <p>This is a paragraph.</p>
                    <ul>
                        <li>Item 1</li>
                        <li>Item 2</li>
                    </ul>
                </body>
            </html>
        "#;

        let md = html2md::rewrite_html(html, false);
        assert!(md.contains("Hello World"));
        assert!(md.contains("This is a paragraph"));
    }

    #[test]
    fn test_html_to_markdown_links() {
        let html = r#"<a href="https://example.com">Example Link</a>"#;
        let md = html2md::rewrite_html(html, false);
        assert!(md.contains("[Example Link]"));
        assert!(md.contains("https://example.com"));
    }

    #[tokio::test]
    async fn test_fetch_invalid_url() {
        let temp = tempdir().unwrap();
        let ctx = ToolContext::new(temp.path().to_path_buf(), "test".to_string());
        let tool = FetchTool;

        let result = tool.call("fetch", serde_json::json!({"url": "not-a-url"}), &ctx).await;

        assert!(result.is_error);
        assert!(result.content.contains("http"));
    }

    #[tokio::test]
    async fn test_fetch_missing_url() {
        let temp = tempdir().unwrap();
        let ctx = ToolContext::new(temp.path().to_path_buf(), "test".to_string());
        let tool = FetchTool;

        let result = tool.call("fetch", serde_json::json!({}), &ctx).await;

        assert!(result.is_error);
        assert!(result.content.contains("url is required"));
    }
}
