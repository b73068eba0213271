//! Client for the task service: lookups, bulk records, notes and answer submission.

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::closure::{EntityKind, Lookup};
use crate::error::{RelsearchError, Result};
use crate::graph::RawRecord;

/// Request body for the people / places query endpoints
#[derive(Serialize)]
struct QueryRequest<'a> {
    apikey: &'a str,
    query: &'a str,
}

/// Reply from the people / places query endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct QueryReply {
    #[serde(default)]
    pub code: i64,
    pub message: String,
}

/// Request body for the database endpoint
#[derive(Serialize)]
struct DatabaseRequest<'a> {
    task: &'a str,
    apikey: &'a str,
    query: &'a str,
}

/// Reply from the database endpoint; `reply` is null when the query failed
#[derive(Deserialize)]
struct DatabaseResponse {
    reply: Option<Vec<RawRecord>>,
    #[serde(default)]
    error: Option<String>,
}

/// Request body for answer submission
#[derive(Serialize)]
struct AnswerRequest<'a> {
    task: &'a str,
    apikey: &'a str,
    answer: &'a serde_json::Value,
}

/// Task service client
///
/// One shared `reqwest::Client` with a request timeout; every call is a
/// single attempt.
#[derive(Clone)]
pub struct CentralClient {
    client: Client,
    api_key: String,
}

impl CentralClient {
    pub fn new(api_key: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RelsearchError::Http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, api_key })
    }

    /// Query a people / places endpoint.
    ///
    /// HTTP 400 means the service has nothing for this query and maps to
    /// `Ok(None)`; any other failure is an error.
    pub async fn query(&self, url: &str, query: &str) -> Result<Option<QueryReply>> {
        let response = self
            .client
            .post(url)
            .json(&QueryRequest {
                apikey: &self.api_key,
                query,
            })
            .send()
            .await
            .map_err(|e| RelsearchError::Http(format!("Network error querying {}: {}", url, e)))?;

        let status = response.status();
        if status == StatusCode::BAD_REQUEST {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(error_from_response(url, response).await);
        }

        let reply: QueryReply = response
            .json()
            .await
            .map_err(|e| RelsearchError::Parse(format!("Failed to parse reply from {}: {}", url, e)))?;
        Ok(Some(reply))
    }

    /// Run a query against the database endpoint and return its rows.
    pub async fn fetch_records(&self, url: &str, task: &str, query: &str) -> Result<Vec<RawRecord>> {
        let response = self
            .client
            .post(url)
            .json(&DatabaseRequest {
                task,
                apikey: &self.api_key,
                query,
            })
            .send()
            .await
            .map_err(|e| RelsearchError::Http(format!("Network error querying {}: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(error_from_response(url, response).await);
        }

        let body: DatabaseResponse = response
            .json()
            .await
            .map_err(|e| RelsearchError::Parse(format!("Failed to parse rows from {}: {}", url, e)))?;

        let rows = records_from_response(body, query)?;
        log::debug!("{} -> {} rows", query, rows.len());
        Ok(rows)
    }

    /// Fetch a plain-text document.
    pub async fn fetch_note(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| RelsearchError::Http(format!("Network error fetching {}: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(error_from_response(url, response).await);
        }

        response
            .text()
            .await
            .map_err(|e| RelsearchError::Http(format!("Failed to read body of {}: {}", url, e)))
    }

    /// Submit an answer and return the service's verdict.
    pub async fn submit_answer(
        &self,
        url: &str,
        task: &str,
        answer: &serde_json::Value,
    ) -> Result<serde_json::Value> {
        let response = self
            .client
            .post(url)
            .json(&AnswerRequest {
                task,
                apikey: &self.api_key,
                answer,
            })
            .send()
            .await
            .map_err(|e| RelsearchError::Http(format!("Network error submitting to {}: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(error_from_response(url, response).await);
        }

        response.json().await.map_err(|e| {
            RelsearchError::Parse(format!("Failed to parse verdict from {}: {}", url, e))
        })
    }
}

async fn error_from_response(url: &str, response: reqwest::Response) -> RelsearchError {
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unable to read error response".to_string());
    RelsearchError::Http(format!("{} returned {}: {}", url, status, body))
}

fn records_from_response(body: DatabaseResponse, query: &str) -> Result<Vec<RawRecord>> {
    match body.reply {
        Some(rows) => Ok(rows),
        None => Err(RelsearchError::Parse(format!(
            "No rows for {:?}: {}",
            query,
            body.error.unwrap_or_else(|| "reply is null".to_string())
        ))),
    }
}

/// [`Lookup`] backed by the people and places endpoints.
pub struct HttpLookup {
    client: CentralClient,
    people_url: String,
    places_url: String,
}

impl HttpLookup {
    pub fn new(client: CentralClient, people_url: String, places_url: String) -> Self {
        Self {
            client,
            people_url,
            places_url,
        }
    }

    /// People endpoint answers with places and vice versa.
    fn endpoint(&self, kind: EntityKind) -> &str {
        match kind {
            EntityKind::Person => &self.people_url,
            EntityKind::Place => &self.places_url,
        }
    }
}

impl Lookup for HttpLookup {
    async fn lookup(&self, kind: EntityKind, token: &str) -> Result<Option<String>> {
        let reply = self.client.query(self.endpoint(kind), token).await?;
        Ok(reply.map(|r| r.message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client() -> CentralClient {
        CentralClient::new("test-key".to_string(), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_query_request_shape() {
        let body = serde_json::to_value(QueryRequest {
            apikey: "k",
            query: "KRAKOW",
        })
        .unwrap();
        assert_eq!(body, json!({"apikey": "k", "query": "KRAKOW"}));
    }

    #[test]
    fn test_database_request_shape() {
        let body = serde_json::to_value(DatabaseRequest {
            task: "database",
            apikey: "k",
            query: "SELECT * FROM users",
        })
        .unwrap();
        assert_eq!(body["task"], "database");
        assert_eq!(body["query"], "SELECT * FROM users");
    }

    #[test]
    fn test_query_reply_parse() {
        let reply: QueryReply =
            serde_json::from_value(json!({"code": 0, "message": "RAFAL BARBARA"})).unwrap();
        assert_eq!(reply.message, "RAFAL BARBARA");
        let without_code: QueryReply = serde_json::from_value(json!({"message": "X"})).unwrap();
        assert_eq!(without_code.code, 0);
    }

    #[test]
    fn test_records_from_response() {
        let body: DatabaseResponse = serde_json::from_value(json!({
            "reply": [{"id": "1", "username": "Adam"}],
            "error": "OK"
        }))
        .unwrap();
        let rows = records_from_response(body, "SELECT * FROM users").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["username"], "Adam");
    }

    #[test]
    fn test_records_from_null_reply() {
        let body: DatabaseResponse =
            serde_json::from_value(json!({"reply": null, "error": "syntax error"})).unwrap();
        let err = records_from_response(body, "SELEC").unwrap_err();
        assert!(err.to_string().contains("syntax error"));
    }

    #[test]
    fn test_lookup_endpoint_by_kind() {
        let lookup = HttpLookup::new(
            client(),
            "https://svc.example/people".to_string(),
            "https://svc.example/places".to_string(),
        );
        assert_eq!(lookup.endpoint(EntityKind::Person), "https://svc.example/people");
        assert_eq!(lookup.endpoint(EntityKind::Place), "https://svc.example/places");
    }

    // Live calls need the real service and key; not exercised here.
}
