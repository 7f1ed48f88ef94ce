use crate::core::types::SearchRequest;
use serde_json::{Map, Value};
use std::sync::Arc;

pub const WEB_SEARCH_TOOL: &str = "web_search";

#[derive(Clone, Debug)]
pub struct ToolCatalogEntry {
    pub name: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
}

/// Input schema for `web_search`, derived from [`SearchRequest`].
pub fn web_search_input_schema() -> Value {
    serde_json::to_value(schemars::schema_for!(SearchRequest))
        .unwrap_or_else(|_| serde_json::json!({ "type": "object" }))
}

pub fn tool_catalog() -> Vec<ToolCatalogEntry> {
    vec![ToolCatalogEntry {
        name: WEB_SEARCH_TOOL,
        title: "Web Search",
        description: "Search the web in a real browser, visit the top results and return each page's main content as Markdown.",
        input_schema: web_search_input_schema(),
    }]
}

pub fn schema_to_object_map(schema: &Value) -> Arc<Map<String, Value>> {
    match schema {
        Value::Object(map) => Arc::new(map.clone()),
        _ => Arc::new(Map::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_exposes_only_web_search() {
        let catalog = tool_catalog();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog[0].name, "web_search");
    }

    #[test]
    fn schema_uses_wire_names_and_requires_query() {
        let schema = web_search_input_schema();
        let props = schema["properties"].as_object().expect("properties");
        for key in [
            "query",
            "excludeDomains",
            "resultLimit",
            "contentTruncateLength",
            "showUI",
            "proxyAddress",
        ] {
            assert!(props.contains_key(key), "missing {}", key);
        }
        let required = schema["required"].as_array().expect("required");
        assert_eq!(required, &vec![Value::String("query".to_string())]);
    }

    #[test]
    fn non_object_schema_maps_to_empty() {
        assert!(schema_to_object_map(&Value::Null).is_empty());
    }
}
