use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::{Row, RunResult, Statement, Storage, StorageError};

const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for a D1 database.
#[derive(Debug, Clone)]
pub struct D1Config {
    pub account_id: String,
    pub database_id: String,
    pub api_token: String,
    /// Override for tests; defaults to the public Cloudflare API.
    pub api_base: Option<String>,
}

impl D1Config {
    fn endpoint(&self) -> String {
        let base = self
            .api_base
            .as_deref()
            .unwrap_or(CLOUDFLARE_API_BASE)
            .trim_end_matches('/');
        format!(
            "{base}/accounts/{}/d1/database/{}/query",
            self.account_id, self.database_id
        )
    }
}

/// Cloudflare D1 backend, one HTTP round trip per statement.
#[derive(Clone)]
pub struct D1Storage {
    client: reqwest::Client,
    endpoint: String,
    api_token: String,
}

#[derive(Serialize)]
struct QueryBody<'a> {
    sql: &'a str,
    params: &'a [Value],
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    errors: Vec<ApiMessage>,
    #[serde(default)]
    result: Vec<QueryResult>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct QueryResult {
    #[serde(default)]
    results: Vec<Row>,
    #[serde(default)]
    meta: QueryMeta,
}

#[derive(Debug, Default, Deserialize)]
struct QueryMeta {
    #[serde(default)]
    changes: u64,
    #[serde(default)]
    last_row_id: i64,
}

impl D1Storage {
    pub fn new(config: D1Config) -> Result<Self, StorageError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint(),
            api_token: config.api_token,
        })
    }

    async fn query(&self, stmt: &Statement) -> Result<QueryResult, StorageError> {
        debug!(sql = %stmt.sql, params = stmt.params.len(), "d1 query");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_token)
            .json(&QueryBody {
                sql: &stmt.sql,
                params: &stmt.params,
            })
            .send()
            .await?;

        let status = response.status();
        let envelope: Envelope = match response.json().await {
            Ok(envelope) => envelope,
            Err(error) if !status.is_success() => {
                return Err(StorageError::Remote(format!("HTTP {status}: {error}")));
            }
            Err(error) => return Err(error.into()),
        };

        if !status.is_success() || !envelope.success {
            let message = envelope
                .errors
                .iter()
                .map(|e| format!("{} ({})", e.message, e.code))
                .collect::<Vec<_>>()
                .join("; ");
            warn!(%status, %message, "d1 query failed");
            return Err(StorageError::Remote(if message.is_empty() {
                format!("HTTP {status}")
            } else {
                message
            }));
        }

        envelope
            .result
            .into_iter()
            .next()
            .ok_or_else(|| StorageError::Remote("empty result set".to_string()))
    }
}

#[async_trait]
impl Storage for D1Storage {
    fn backend(&self) -> &'static str {
        "d1"
    }

    async fn all(&self, stmt: &Statement) -> Result<Vec<Row>, StorageError> {
        Ok(self.query(stmt).await?.results)
    }

    async fn run(&self, stmt: &Statement) -> Result<RunResult, StorageError> {
        let meta = self.query(stmt).await?.meta;
        Ok(RunResult {
            changes: meta.changes,
            last_row_id: meta.last_row_id,
        })
    }

    /// The HTTP API has no multi-statement transaction; statements run in
    /// order and the first failure aborts the remainder.
    async fn batch(&self, stmts: &[Statement]) -> Result<Vec<RunResult>, StorageError> {
        let mut results = Vec::with_capacity(stmts.len());
        for stmt in stmts {
            results.push(self.run(stmt).await?);
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_includes_account_and_database() {
        let config = D1Config {
            account_id: "acc".into(),
            database_id: "db".into(),
            api_token: "token".into(),
            api_base: None,
        };
        assert_eq!(
            config.endpoint(),
            "https://api.cloudflare.com/client/v4/accounts/acc/d1/database/db/query"
        );
    }

    #[test]
    fn envelope_parses_meta() {
        let body = serde_json::json!({
            "success": true,
            "errors": [],
            "result": [{
                "results": [{ "id": 1, "title": "Inbox" }],
                "meta": { "changes": 1, "last_row_id": 9, "duration": 0.2 },
                "success": true
            }]
        });
        let envelope: Envelope = serde_json::from_value(body).unwrap();
        let result = envelope.result.into_iter().next().unwrap();
        assert_eq!(result.meta.changes, 1);
        assert_eq!(result.meta.last_row_id, 9);
        assert_eq!(result.results[0]["title"], "Inbox");
    }
}
