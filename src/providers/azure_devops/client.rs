use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tokio::sync::Semaphore;
use url::Url;

use super::types::{Build, BuildTimeline, DefinitionReference, ListResponse};
use crate::analysis::{Run, Timeline};
use crate::auth::Token;
use crate::error::{RunLensError, Result};

const API_VERSION: &str = "6.0";
const MAX_RETRIES: u32 = 10;
const RETRY_DELAY_SECONDS: u64 = 10;
const MAX_CONCURRENT_REQUESTS: usize = 50;

/// Azure DevOps REST client for the build APIs of one organization.
pub struct AzureDevOpsClient {
    client: Client,
    org_url: Url,
    token: Option<Token>,
    semaphore: Arc<Semaphore>,
    retry_delay: Duration,
}

impl AzureDevOpsClient {
    /// Creates a client for `org_url` (e.g., <https://dev.azure.com/dnceng>).
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built or the URL is invalid.
    pub fn new(org_url: &str, token: Option<Token>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("RunLens/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RunLensError::Config(format!("Failed to create HTTP client: {e}")))?;

        let org_url = Url::parse(org_url)
            .map_err(|e| RunLensError::Config(format!("Invalid organization URL: {e}")))?;

        if org_url.cannot_be_a_base() {
            return Err(RunLensError::Config(format!(
                "Organization URL cannot be used as a base: {org_url}"
            )));
        }

        Ok(Self {
            client,
            org_url,
            token,
            semaphore: Arc::new(Semaphore::new(MAX_CONCURRENT_REQUESTS)),
            retry_delay: Duration::from_secs(RETRY_DELAY_SECONDS),
        })
    }

    #[cfg(test)]
    pub(crate) fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// Personal access tokens go in as the password of basic auth with an empty user.
    fn auth_request(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(token) = &self.token {
            request.basic_auth("", Some(token.as_str()))
        } else {
            request
        }
    }

    /// Builds `{org}/{project}/_apis/{path}?api-version=...&{query}`.
    fn api_url(&self, project: &str, path: &[&str], query: &[(&str, String)]) -> Result<Url> {
        let mut url = self.org_url.clone();
        url.path_segments_mut()
            .map_err(|()| RunLensError::Config(format!("Invalid organization URL: {}", self.org_url)))?
            .pop_if_empty()
            .push(project)
            .push("_apis")
            .extend(path);

        url.query_pairs_mut()
            .append_pair("api-version", API_VERSION)
            .extend_pairs(query.iter().map(|(key, value)| (*key, value.as_str())));

        Ok(url)
    }

    /// Sends a GET request, retrying on network errors, rate limits and server errors.
    async fn get(&self, url: Url) -> Result<Response> {
        // One permit per logical request, held across retries
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|e| RunLensError::Config(format!("Request limiter closed: {e}")))?;

        let mut retry_count = 0;
        loop {
            debug!("GET {url}");
            let request = self.auth_request(self.client.get(url.clone()));

            let response = match request.send().await {
                Ok(resp) => resp,
                Err(e) if e.is_connect() || e.is_timeout() || e.is_request() => {
                    if retry_count >= MAX_RETRIES {
                        return Err(e.into());
                    }
                    warn!(
                        "Network error ({}), retrying in {}s ({}/{})...",
                        e,
                        self.retry_delay.as_secs(),
                        retry_count + 1,
                        MAX_RETRIES
                    );
                    tokio::time::sleep(self.retry_delay).await;
                    retry_count += 1;
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let status = response.status();

            if status == 429 || status.is_server_error() {
                if retry_count >= MAX_RETRIES {
                    return Err(RunLensError::ApiErrorAfterRetries {
                        status: status.as_u16(),
                        retries: MAX_RETRIES,
                    });
                }

                warn!(
                    "Azure DevOps API error (status {status}). Waiting {}s before retry {}/{}...",
                    self.retry_delay.as_secs(),
                    retry_count + 1,
                    MAX_RETRIES
                );

                tokio::time::sleep(self.retry_delay).await;
                retry_count += 1;
                continue;
            }

            if !status.is_success() {
                let error_text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unable to read error response".to_string());
                return Err(RunLensError::Api {
                    status: status.as_u16(),
                    message: error_text,
                });
            }

            return Ok(response);
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let body = self.get(url).await?.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Identifiers of all build definitions named `name`.
    ///
    /// # Errors
    ///
    /// Returns `DefinitionNotFound` if no definition has that name.
    pub async fn fetch_definition_ids(&self, project: &str, name: &str) -> Result<Vec<u64>> {
        let url = self.api_url(
            project,
            &["build", "definitions"],
            &[("name", name.to_string())],
        )?;

        let definitions: ListResponse<DefinitionReference> = self.get_json(url).await?;
        if definitions.value.is_empty() {
            return Err(RunLensError::DefinitionNotFound(name.to_string()));
        }

        debug!(
            "Definition '{name}' resolved to {:?}",
            definitions
                .value
                .iter()
                .map(|d| (d.id, d.name.as_str()))
                .collect::<Vec<_>>()
        );

        Ok(definitions.value.into_iter().map(|d| d.id).collect())
    }

    /// The most recent completed, succeeded runs of `definition_ids` on `branch`.
    pub async fn fetch_runs(
        &self,
        project: &str,
        definition_ids: &[u64],
        branch: &str,
        limit: usize,
    ) -> Result<Vec<Run>> {
        let definitions = definition_ids
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");

        let url = self.api_url(
            project,
            &["build", "builds"],
            &[
                ("definitions", definitions),
                ("branchName", branch.to_string()),
                ("statusFilter", "completed".to_string()),
                ("resultFilter", "succeeded".to_string()),
                ("$top", limit.to_string()),
            ],
        )?;

        let builds: ListResponse<Build> = self.get_json(url).await?;
        debug!("Received {} builds", builds.count);

        let mut runs: Vec<Run> = builds.value.into_iter().map(Run::from).collect();
        runs.truncate(limit);
        Ok(runs)
    }

    pub async fn fetch_timeline(&self, project: &str, run_id: u64) -> Result<Timeline> {
        let url = self.api_url(
            project,
            &["build", "builds", &run_id.to_string(), "timeline"],
            &[],
        )?;

        let response = self.get(url).await?;
        let body = response.text().await?;

        // Builds that never started return an empty body instead of a timeline
        if body.trim().is_empty() {
            return Ok(Timeline::default());
        }

        let timeline: BuildTimeline = serde_json::from_str(&body)?;
        Ok(timeline.into())
    }

    /// Text lines of log `log_id` of run `run_id`.
    pub async fn fetch_log_lines(&self, project: &str, run_id: u64, log_id: u64) -> Result<Vec<String>> {
        let url = self.api_url(
            project,
            &["build", "builds", &run_id.to_string(), "logs", &log_id.to_string()],
            &[],
        )?;

        let text = self.get(url).await?.text().await?;
        Ok(text.lines().map(ToString::to_string).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    fn client_for(server: &Server) -> AzureDevOpsClient {
        AzureDevOpsClient::new(&format!("{}/dnceng", server.url()), Some(Token::from("pat")))
            .unwrap()
            .with_retry_delay(Duration::from_millis(1))
    }

    #[test]
    fn test_invalid_org_url() {
        assert!(matches!(
            AzureDevOpsClient::new("not a url", None),
            Err(RunLensError::Config(_))
        ));
    }

    #[test]
    fn test_api_url_encodes_segments_and_query() {
        let client = AzureDevOpsClient::new("https://dev.azure.com/dnceng/", None).unwrap();
        let url = client
            .api_url(
                "my project",
                &["build", "builds"],
                &[("branchName", "refs/heads/master".to_string())],
            )
            .unwrap();

        assert_eq!(
            url.as_str(),
            "https://dev.azure.com/dnceng/my%20project/_apis/build/builds?api-version=6.0&branchName=refs%2Fheads%2Fmaster"
        );
    }

    #[tokio::test]
    async fn test_fetch_definition_ids() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/dnceng/internal/_apis/build/definitions")
            .match_query(Matcher::UrlEncoded(
                "name".into(),
                "dotnet-runtime-official".into(),
            ))
            .match_header("authorization", Matcher::Regex("^Basic ".to_string()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"count": 1, "value": [{"id": 686, "name": "dotnet-runtime-official"}]}"#)
            .create_async()
            .await;

        let ids = client_for(&server)
            .fetch_definition_ids("internal", "dotnet-runtime-official")
            .await
            .unwrap();

        assert_eq!(ids, vec![686]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_unknown_definition() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/dnceng/internal/_apis/build/definitions")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"count": 0, "value": []}"#)
            .create_async()
            .await;

        let result = client_for(&server)
            .fetch_definition_ids("internal", "missing")
            .await;

        assert!(matches!(result, Err(RunLensError::DefinitionNotFound(ref name)) if name == "missing"));
    }

    #[tokio::test]
    async fn test_fetch_runs_sends_filters() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/dnceng/internal/_apis/build/builds")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("definitions".into(), "686,687".into()),
                Matcher::UrlEncoded("branchName".into(), "refs/heads/master".into()),
                Matcher::UrlEncoded("statusFilter".into(), "completed".into()),
                Matcher::UrlEncoded("resultFilter".into(), "succeeded".into()),
                Matcher::UrlEncoded("$top".into(), "2".into()),
            ]))
            .with_status(200)
            .with_body(
                r#"{"count": 2, "value": [
                    {"id": 1, "status": "completed", "result": "succeeded", "sourceBranch": "refs/heads/master",
                     "startTime": "2020-06-01T08:00:00Z", "finishTime": "2020-06-01T10:00:00Z", "project": {"name": "internal"}},
                    {"id": 2, "status": "completed", "result": "succeeded", "sourceBranch": "refs/heads/master",
                     "startTime": "2020-06-02T08:00:00Z", "finishTime": "2020-06-02T10:30:00Z", "project": {"name": "internal"}}
                ]}"#,
            )
            .create_async()
            .await;

        let runs = client_for(&server)
            .fetch_runs("internal", &[686, 687], "refs/heads/master", 2)
            .await
            .unwrap();

        assert_eq!(runs.len(), 2);
        assert_eq!(runs[1].id, 2);
        assert_eq!(runs[1].duration().unwrap(), chrono::Duration::minutes(150));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_log_lines() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/dnceng/internal/_apis/build/builds/42/logs/7")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "text/plain")
            .with_body("first line\r\na -> completed in 0:01:30\nlast line")
            .create_async()
            .await;

        let lines = client_for(&server)
            .fetch_log_lines("internal", 42, 7)
            .await
            .unwrap();

        assert_eq!(
            lines,
            vec!["first line", "a -> completed in 0:01:30", "last line"]
        );
    }

    #[tokio::test]
    async fn test_fetch_empty_timeline() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/dnceng/internal/_apis/build/builds/42/timeline")
            .match_query(Matcher::Any)
            .with_status(204)
            .create_async()
            .await;

        let timeline = client_for(&server)
            .fetch_timeline("internal", 42)
            .await
            .unwrap();

        assert!(timeline.records().is_empty());
    }

    #[tokio::test]
    async fn test_retries_server_errors() {
        let mut server = Server::new_async().await;
        let failing = server
            .mock("GET", "/dnceng/internal/_apis/build/builds/42/timeline")
            .match_query(Matcher::Any)
            .with_status(503)
            .expect(1)
            .create_async()
            .await;
        let succeeding = server
            .mock("GET", "/dnceng/internal/_apis/build/builds/42/timeline")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"records": [{"id": "a", "type": "Job", "name": "Signing Validation"}]}"#)
            .create_async()
            .await;

        let timeline = client_for(&server)
            .fetch_timeline("internal", 42)
            .await
            .unwrap();

        assert_eq!(timeline.records().len(), 1);
        failing.assert_async().await;
        succeeding.assert_async().await;
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/dnceng/internal/_apis/build/builds/42/logs/1")
            .match_query(Matcher::Any)
            .with_status(429)
            .expect_at_least(1)
            .create_async()
            .await;

        let result = client_for(&server).fetch_log_lines("internal", 42, 1).await;

        assert!(matches!(
            result,
            Err(RunLensError::ApiErrorAfterRetries { status: 429, retries: MAX_RETRIES })
        ));
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retried() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/dnceng/internal/_apis/build/builds/42/timeline")
            .match_query(Matcher::Any)
            .with_status(401)
            .with_body("Unauthorized")
            .expect(1)
            .create_async()
            .await;

        let result = client_for(&server).fetch_timeline("internal", 42).await;

        assert!(matches!(
            result,
            Err(RunLensError::Api { status: 401, ref message }) if message == "Unauthorized"
        ));
        mock.assert_async().await;
    }
}
