//! OpenSearch query builders and response parsing.

use serde_json::{json, Value};
use uuid::Uuid;

use crate::errors::SearchError;
use resync_shared::{SearchHit, SearchQuery, SearchResponse};

/// Build an OpenSearch `query_string` request body.
///
/// `track_total_hits` is enabled so that `hits.total` is exact rather than
/// capped at 10,000.
pub fn build_search_query(query: &SearchQuery) -> Value {
    json!({
        "query": {
            "query_string": {
                "query": query.query
            }
        },
        "size": query.limit,
        "track_total_hits": true
    })
}

/// Parse a search response body.
pub fn parse_search_response(body: &Value) -> Result<SearchResponse, SearchError> {
    let hits = body
        .get("hits")
        .ok_or_else(|| SearchError::parse("response has no hits section"))?;

    // 7.x+ returns `{ "value": n, "relation": "eq" }`, older engines a bare number.
    let total = match hits.get("total") {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::Object(total)) => total.get("value").and_then(Value::as_u64),
        _ => None,
    }
    .ok_or_else(|| SearchError::parse("response has no hit total"))?;

    let hits = hits
        .get("hits")
        .and_then(Value::as_array)
        .map(|hits| hits.iter().filter_map(parse_hit).collect())
        .unwrap_or_default();

    Ok(SearchResponse { total, hits })
}

/// Parse a single hit, skipping hits whose id is not a UUID.
fn parse_hit(hit: &Value) -> Option<SearchHit> {
    let id = Uuid::parse_str(hit.get("_id")?.as_str()?).ok()?;
    let score = hit.get("_score").and_then(Value::as_f64).unwrap_or(0.0);
    let source = hit.get("_source").cloned().unwrap_or(Value::Null);

    Some(SearchHit { id, score, source })
}

/// Extract the most useful reason from an error response body.
pub fn error_reason(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            value
                .pointer("/error/root_cause/0/reason")
                .or_else(|| value.pointer("/error/reason"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.to_string())
}
