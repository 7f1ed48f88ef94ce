use crate::core::error::SearchError;
use crate::core::types::{ExtractionResult, SearchRequest, SearchResponse};
use crate::tools::search;
use crate::AppState;
use rmcp::model::{CallToolResult, Content, ErrorCode, ErrorData};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{info, warn};

/// Decode and validate the tool arguments.
pub fn parse_arguments(args: Option<&Map<String, Value>>) -> Result<SearchRequest, ErrorData> {
    let args = args.ok_or_else(|| {
        ErrorData::new(
            ErrorCode::INVALID_PARAMS,
            "Missing required arguments object",
            None,
        )
    })?;

    let request: SearchRequest = serde_json::from_value(Value::Object(args.clone()))
        .map_err(|e| ErrorData::new(ErrorCode::INVALID_PARAMS, format!("Invalid arguments: {}", e), None))?;

    request
        .validate()
        .map_err(|e| ErrorData::new(ErrorCode::INVALID_PARAMS, e.to_string(), None))
}

/// JSON text payload for a finished search.
pub fn render_results(results: Vec<ExtractionResult>) -> CallToolResult {
    let response = SearchResponse { results };
    match serde_json::to_string_pretty(&response) {
        Ok(json) => CallToolResult::success(vec![Content::text(json)]),
        Err(e) => CallToolResult::error(vec![Content::text(format!(
            "Failed to encode results: {}",
            e
        ))]),
    }
}

pub fn render_error(error: &SearchError) -> CallToolResult {
    CallToolResult::error(vec![Content::text(format!("Search failed: {}", error))])
}

pub async fn handle(
    state: Arc<AppState>,
    args: Option<&Map<String, Value>>,
) -> Result<CallToolResult, ErrorData> {
    let request = parse_arguments(args)?;
    info!(
        "web_search: '{}' (limit {}, {} excluded domains)",
        request.query,
        request.result_limit,
        request.exclude_domains.len()
    );

    match search::search(&request, &state.config).await {
        Ok(results) => Ok(render_results(results)),
        Err(e) => {
            warn!("web_search failed: {}", e);
            Ok(render_error(&e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().expect("object")
    }

    #[test]
    fn missing_arguments_are_invalid_params() {
        let err = parse_arguments(None).unwrap_err();
        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
    }

    #[test]
    fn wrong_types_are_invalid_params() {
        let map = args(json!({ "query": "btc", "resultLimit": "ten" }));
        let err = parse_arguments(Some(&map)).unwrap_err();
        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);

        let map = args(json!({ "query": "   " }));
        assert!(parse_arguments(Some(&map)).is_err());
    }

    #[test]
    fn arguments_are_normalized() {
        let map = args(json!({
            "query": " bitcoin ",
            "excludeDomains": ["a.com", "a.com"],
            "resultLimit": 2
        }));
        let request = parse_arguments(Some(&map)).unwrap();
        assert_eq!(request.query, "bitcoin");
        assert_eq!(request.exclude_domains, vec!["a.com"]);
        assert_eq!(request.result_limit, 2);
    }

    #[test]
    fn results_render_as_json_payload() {
        let result = render_results(vec![ExtractionResult {
            title: "T".to_string(),
            url: "https://a.example/".to_string(),
            content: "body".to_string(),
        }]);
        assert_eq!(result.is_error, Some(false));
        let text = result.content[0].as_text().expect("text").text.clone();
        let parsed: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["results"][0]["url"], "https://a.example/");
    }

    #[test]
    fn errors_render_as_error_content() {
        let result = render_error(&SearchError::Harvest("boom".to_string()));
        assert_eq!(result.is_error, Some(true));
    }
}
