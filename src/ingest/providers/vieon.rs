use chrono::Utc;
use metrics::{counter, histogram};
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::ingest::types::{FetchedItem, RankingProvider};

/// Sent so the voting backend serves us the same payload as the web app.
const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/124.0.0.0 Safari/537.36";

/// Envelope of the VieON voting API: `code != 0` is a provider-reported
/// failure even with HTTP 200.
#[derive(Debug, Deserialize)]
struct Envelope {
    code: i64,
    #[serde(default)]
    message: String,
    /// Left loosely typed so a missing or non-array `result` is our own
    /// shape error instead of a silent empty snapshot.
    result: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    id: serde_json::Value,
    name: String,
    #[serde(default)]
    avatar_url: Option<String>,
    #[serde(default)]
    votes: Option<f64>,
    #[serde(default)]
    programme_id: Option<serde_json::Value>,
}

#[derive(Debug)]
pub struct VieOnProvider {
    client: reqwest::Client,
}

impl VieOnProvider {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Parse a raw response body into normalized items. Positions are
    /// assigned from result order, 1-based; every item shares one
    /// capture timestamp taken here.
    pub fn parse_snapshot(body: &str) -> Result<Vec<FetchedItem>> {
        let t0 = std::time::Instant::now();

        let envelope: Envelope = serde_json::from_str(body)
            .map_err(|e| Error::Fetch(format!("vieon: malformed payload: {e}")))?;

        if envelope.code != 0 {
            return Err(Error::Fetch(format!(
                "vieon: provider error code {}: {}",
                envelope.code, envelope.message
            )));
        }

        let result = match envelope.result {
            Some(serde_json::Value::Array(items)) => items,
            Some(other) => {
                return Err(Error::Fetch(format!(
                    "vieon: result is not an array (got {})",
                    json_type_name(&other)
                )))
            }
            None => return Err(Error::Fetch("vieon: result field missing".into())),
        };

        let fetched_at = Utc::now();
        let mut out = Vec::with_capacity(result.len());
        for (index, value) in result.into_iter().enumerate() {
            let c: Candidate = serde_json::from_value(value)
                .map_err(|e| Error::Fetch(format!("vieon: malformed result entry: {e}")))?;

            let mut metadata = serde_json::Map::new();
            if let Some(v) = c.votes {
                metadata.insert("votes".into(), serde_json::json!(v));
            }
            if let Some(p) = c.programme_id {
                metadata.insert("programme_id".into(), p);
            }

            out.push(FetchedItem {
                position: index as i64 + 1,
                item_id: json_scalar_to_string(&c.id),
                item_name: c.name,
                item_image: c.avatar_url,
                score: c.votes,
                metadata: if metadata.is_empty() {
                    None
                } else {
                    Some(serde_json::Value::Object(metadata))
                },
                fetched_at,
            });
        }

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("rankalert_fetch_parse_ms").record(ms);
        counter!("rankalert_items_fetched_total").increment(out.len() as u64);
        Ok(out)
    }
}

impl Default for VieOnProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl RankingProvider for VieOnProvider {
    async fn fetch(&self, source_url: &str) -> Result<Vec<FetchedItem>> {
        let resp = self
            .client
            .get(source_url)
            .header("User-Agent", USER_AGENT)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| Error::Fetch(format!("vieon: request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            counter!("rankalert_provider_errors_total").increment(1);
            return Err(Error::Fetch(format!("vieon: HTTP {status}")));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| Error::Fetch(format!("vieon: reading body: {e}")))?;

        Self::parse_snapshot(&body).inspect_err(|_| {
            counter!("rankalert_provider_errors_total").increment(1);
        })
    }

    fn name(&self) -> &'static str {
        "vieon"
    }
}

fn json_type_name(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// Provider ids show up as both strings and numbers across endpoints.
fn json_scalar_to_string(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OK_BODY: &str = r#"{
        "code": 0,
        "message": "success",
        "result": [
            {"id": "atsh-001", "campaign_id": 9, "name": "Anh Trai A", "avatar_url": "https://img.test/a.jpg", "order": 1, "position": 1, "votes": 15000},
            {"id": "atsh-002", "campaign_id": 9, "name": "Anh Trai B", "avatar_url": "https://img.test/b.jpg", "order": 2, "position": 2, "votes": 12000}
        ]
    }"#;

    #[test]
    fn parses_items_in_result_order() {
        let items = VieOnProvider::parse_snapshot(OK_BODY).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].position, 1);
        assert_eq!(items[0].item_id, "atsh-001");
        assert_eq!(items[0].item_name, "Anh Trai A");
        assert_eq!(items[0].score, Some(15000.0));
        assert_eq!(items[1].position, 2);
        // One shared capture timestamp per snapshot
        assert_eq!(items[0].fetched_at, items[1].fetched_at);
    }

    #[test]
    fn metadata_carries_votes() {
        let items = VieOnProvider::parse_snapshot(OK_BODY).unwrap();
        let meta = items[0].metadata.as_ref().unwrap();
        assert_eq!(meta["votes"], serde_json::json!(15000.0));
    }

    #[test]
    fn nonzero_code_is_a_fetch_error() {
        let body = r#"{"code": 1, "message": "rate limited", "result": []}"#;
        let err = VieOnProvider::parse_snapshot(body).unwrap_err();
        assert!(err.is_fetch(), "expected fetch error, got {err:?}");
        assert!(err.to_string().contains("rate limited"));
    }

    #[test]
    fn missing_result_is_a_fetch_error() {
        let body = r#"{"code": 0, "message": "success"}"#;
        let err = VieOnProvider::parse_snapshot(body).unwrap_err();
        assert!(err.to_string().contains("result field missing"));
    }

    #[test]
    fn non_array_result_is_a_fetch_error() {
        let body = r#"{"code": 0, "message": "success", "result": {"id": "x"}}"#;
        let err = VieOnProvider::parse_snapshot(body).unwrap_err();
        assert!(err.to_string().contains("not an array"));
    }

    #[test]
    fn numeric_ids_are_stringified() {
        let body = r#"{"code": 0, "message": "", "result": [{"id": 42, "name": "N", "votes": 1}]}"#;
        let items = VieOnProvider::parse_snapshot(body).unwrap();
        assert_eq!(items[0].item_id, "42");
    }
}
