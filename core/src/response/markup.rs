//! Inline-markup tag scanner - finds `<tagName ...>...</tagName>` and
//! `<tagName .../>` invocations embedded in assistant text and extracts their
//! parameters per the owning tool method's [`InlineMarkupSchema`].

use std::collections::HashMap;

use regex::Regex;
use serde_json::Value;
use tracing::warn;

use crate::tools::{InlineMarkupSchema, ParamSource};

/// One inline-markup invocation found in assistant text, resolved to the
/// tool method it targets and its extracted parameters.
#[derive(Debug, Clone)]
pub struct InlineMarkupMatch {
    pub tool_id: String,
    pub method_name: String,
    pub params: HashMap<String, Value>,
}

/// Scan `content` for every registered inline-markup tag and return each
/// match found, in document order across tags (not interleaved - all matches
/// of the first tag, then all matches of the next).
pub fn scan(content: &str, methods: &[(String, String, InlineMarkupSchema)]) -> Vec<InlineMarkupMatch> {
    let mut matches = Vec::new();

    for (tool_id, method_name, schema) in methods {
        let Some(re) = tag_regex(&schema.tag_name) else { continue };

        for captured in re.captures_iter(content) {
            let attrs_str = captured.get(1).map(|m| m.as_str()).unwrap_or_default();
            let inner = captured.get(2).map(|m| m.as_str()).unwrap_or_default();
            let attrs = parse_attributes(attrs_str);

            let params = extract_params(schema, &attrs, inner);
            matches.push(InlineMarkupMatch { tool_id: tool_id.clone(), method_name: method_name.clone(), params });
        }
    }

    matches
}

fn tag_regex(tag_name: &str) -> Option<Regex> {
    let escaped = regex::escape(tag_name);
    let pattern = format!(r"(?s)<{escaped}([^>]*?)(?:/>|>(.*?)</{escaped}>)");
    Regex::new(&pattern)
        .inspect_err(|err| warn!(tag_name, %err, "failed to compile inline-markup tag regex, skipping"))
        .ok()
}

fn parse_attributes(attrs_str: &str) -> HashMap<String, String> {
    static ATTR_PATTERN: &str = r#"(\w+)\s*=\s*"([^"]*)""#;
    let Ok(re) = Regex::new(ATTR_PATTERN) else { return HashMap::new() };

    re.captures_iter(attrs_str)
        .map(|c| (c[1].to_string(), c[2].to_string()))
        .collect()
}

fn extract_params(schema: &InlineMarkupSchema, attrs: &HashMap<String, String>, inner: &str) -> HashMap<String, Value> {
    let mut params = HashMap::new();

    for param in &schema.params {
        match &param.source {
            ParamSource::Attribute => {
                if let Some(value) = attrs.get(&param.name) {
                    params.insert(param.name.clone(), Value::String(value.clone()));
                }
            }
            ParamSource::Content => {
                params.insert(param.name.clone(), Value::String(inner.trim().to_string()));
            }
            ParamSource::Element { path } => {
                warn!(
                    tag_name = %schema.tag_name,
                    param = %param.name,
                    %path,
                    "element-sourced inline-markup parameters are not supported yet, skipping"
                );
            }
        }
    }

    params
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::InlineParam;

    fn schema() -> InlineMarkupSchema {
        InlineMarkupSchema {
            tag_name: "web_search".to_string(),
            params: vec![InlineParam::attribute("query"), InlineParam::content("note")],
            example: "<web_search query=\"hotels\">find cheap ones</web_search>".to_string(),
        }
    }

    #[test]
    fn test_scan_extracts_attribute_and_content_params() {
        let methods = vec![("WebSearch".to_string(), "search".to_string(), schema())];
        let content = "Let me check. <web_search query=\"hotels\">find cheap ones</web_search> done.";

        let matches = scan(content, &methods);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].tool_id, "WebSearch");
        assert_eq!(matches[0].params.get("query").unwrap(), "hotels");
        assert_eq!(matches[0].params.get("note").unwrap(), "find cheap ones");
    }

    #[test]
    fn test_scan_handles_self_closing_tag() {
        let mut markup = schema();
        markup.params = vec![InlineParam::attribute("query")];
        let methods = vec![("WebSearch".to_string(), "search".to_string(), markup)];
        let content = "<web_search query=\"weather\"/>";

        let matches = scan(content, &methods);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].params.get("query").unwrap(), "weather");
    }

    #[test]
    fn test_scan_finds_multiple_occurrences() {
        let mut markup = schema();
        markup.params = vec![InlineParam::attribute("query")];
        let methods = vec![("WebSearch".to_string(), "search".to_string(), markup)];
        let content = r#"<web_search query="a"/> and then <web_search query="b"/>"#;

        let matches = scan(content, &methods);
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].params.get("query").unwrap(), "a");
        assert_eq!(matches[1].params.get("query").unwrap(), "b");
    }

    #[test]
    fn test_scan_returns_empty_when_tag_absent() {
        let methods = vec![("WebSearch".to_string(), "search".to_string(), schema())];
        let matches = scan("nothing to see here", &methods);
        assert!(matches.is_empty());
    }
}
