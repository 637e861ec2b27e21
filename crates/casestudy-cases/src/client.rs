//! HTTP client for CourtListener's search and cluster endpoints.

use serde::de::DeserializeOwned;
use tracing::info;

use crate::{CaseQuery, CaseResults, CaseSummary, CasesError, Cluster, SearchResponse};

const DEFAULT_BASE_URL: &str = "https://www.courtlistener.com/api/rest/v4";

/// Read-only CourtListener client, authenticated with an API token.
pub struct CourtListenerClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl CourtListenerClient {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            token: token.into(),
        }
    }

    /// Point at another server, e.g. a local stub. No trailing slash needed.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get<T: DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&str, String)],
    ) -> Result<T, CasesError> {
        let resp = self
            .client
            .get(url)
            .query(params)
            .header("Authorization", format!("Token {}", self.token))
            .header("Accept", "application/json")
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(CasesError::Server {
                status: status.as_u16(),
                body,
            });
        }
        let body = resp.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Search opinions. The query is validated before any request is made.
    pub async fn search(&self, query: &CaseQuery) -> Result<CaseResults, CasesError> {
        query.validate()?;
        let url = format!("{}/search/", self.base_url);
        info!(url = %url, q = %query.query, limit = query.limit, "searching CourtListener");
        let response: SearchResponse = self.get(&url, &query.params()).await?;
        let results = CaseResults::from_response(&response);
        info!(
            count = results.cases.len(),
            total = results.total,
            has_more = results.has_more,
            "case search complete"
        );
        Ok(results)
    }

    /// Fetch a single opinion cluster by id.
    pub async fn cluster(&self, id: u64) -> Result<CaseSummary, CasesError> {
        let url = format!("{}/clusters/{id}/", self.base_url);
        info!(url = %url, "fetching CourtListener cluster");
        let cluster: Cluster = self.get(&url, &[]).await?;
        Ok(CaseSummary::from_cluster(&cluster))
    }
}
