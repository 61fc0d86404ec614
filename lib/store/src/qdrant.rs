//! Qdrant-compatible vector search over HTTP.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

use flatmatch_core::{CandidateStore, Error, Listing, Result};

#[derive(Clone)]
pub struct QdrantStore {
    client: Client,
    base_url: String,
    collection: String,
}

impl QdrantStore {
    pub fn new(base_url: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            collection: collection.into(),
        }
    }

    fn search_endpoint(&self) -> String {
        format!(
            "{}/collections/{}/points/search",
            self.base_url.trim_end_matches('/'),
            self.collection
        )
    }
}

#[async_trait]
impl CandidateStore for QdrantStore {
    async fn search(&self, embedding: &[f32], top_k: usize) -> Result<Vec<Listing>> {
        let body = json!({
            "vector": embedding,
            "limit": top_k,
            "with_payload": true,
        });
        let response = self
            .client
            .post(self.search_endpoint())
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Store(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(Error::Store(format!(
                "search failed ({status}): {text}"
            )));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| Error::Store(format!("bad search response: {e}")))?;
        Ok(into_listings(parsed))
    }
}

/// Search responses come either wrapped in a `result` envelope or as a
/// bare array, depending on the server.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SearchResponse {
    Wrapped { result: Vec<ScoredPoint> },
    Bare(Vec<ScoredPoint>),
}

#[derive(Debug, Deserialize)]
struct ScoredPoint {
    id: Value,
    #[allow(dead_code)]
    score: f32,
    payload: Option<Value>,
}

fn into_listings(response: SearchResponse) -> Vec<Listing> {
    let points = match response {
        SearchResponse::Wrapped { result } => result,
        SearchResponse::Bare(points) => points,
    };
    points
        .into_iter()
        .filter_map(|point| {
            let payload = point.payload?;
            match serde_json::from_value::<Listing>(payload) {
                Ok(mut listing) => {
                    if listing.id.is_empty() {
                        listing.id = point_id_string(&point.id);
                    }
                    Some(listing)
                }
                Err(e) => {
                    warn!(id = %point.id, error = %e, "skipping malformed payload");
                    None
                }
            }
        })
        .collect()
}

fn point_id_string(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_wrapped_response() {
        let raw = json!({
            "result": [
                {"id": 7, "score": 0.91, "payload": {"title": "Bright double in Hackney", "price": 850}},
            ],
            "status": "ok",
        });
        let parsed: SearchResponse = serde_json::from_value(raw).unwrap();
        let listings = into_listings(parsed);
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].id, "7");
        assert_eq!(listings[0].price, Some(850));
    }

    #[test]
    fn parses_bare_array_response() {
        let raw = json!([
            {"id": "a1", "score": 0.5, "payload": {"id": "a1", "title": "Studio"}},
        ]);
        let parsed: SearchResponse = serde_json::from_value(raw).unwrap();
        let listings = into_listings(parsed);
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].id, "a1");
    }

    #[test]
    fn skips_points_without_payload() {
        let raw = json!({
            "result": [
                {"id": 1, "score": 0.9, "payload": null},
                {"id": 2, "score": 0.8, "payload": {"title": "Room", "price": 700}},
            ],
        });
        let parsed: SearchResponse = serde_json::from_value(raw).unwrap();
        assert_eq!(into_listings(parsed).len(), 1);
    }
}
