//! Paginated reads against the accounting API query endpoint.
//!
//! [`RecordSource`] fetches a single page, [`fetch_all`] drives the pagination
//! protocol on top of any source: start at position 1, advance by the number of
//! records returned and stop on the first page shorter than the page size.

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};
use url::Url;

use crate::{
    config::{ConfigError, EngineConfig, DEFAULT_PAGE_SIZE},
    credentials::CredentialProvider,
    error::{Error, Result},
};
use qbo_mirror_schemas::Phase;

/// One page of records starting at a 1-based position
#[async_trait]
pub trait RecordSource: Send + Sync {
    async fn fetch_page(
        &self,
        entity: &str,
        start_position: usize,
        page_size: usize,
    ) -> Result<Vec<Value>>;
}

/// HTTP client for `GET /v3/company/<realm>/query`
pub struct QueryClient {
    http: reqwest::Client,
    base_url: Url,
    credentials: Arc<dyn CredentialProvider>,
}

impl QueryClient {
    pub fn try_new(config: &EngineConfig, credentials: Arc<dyn CredentialProvider>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.api_base_url.clone(),
            credentials,
        })
    }

    /// Tenant-scoped query url for one page
    pub fn query_url(
        &self,
        realm_id: &str,
        entity: &str,
        start_position: usize,
        page_size: usize,
    ) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["v3", "company", realm_id, "query"]);
        }
        url.query_pairs_mut()
            .append_pair("query", &query_statement(entity, start_position, page_size));

        url
    }
}

/// `SELECT * FROM <entity> STARTPOSITION <p>`, with `MAXRESULTS` only when the page
/// size differs from the server default
pub fn query_statement(entity: &str, start_position: usize, page_size: usize) -> String {
    if page_size == DEFAULT_PAGE_SIZE {
        format!("SELECT * FROM {entity} STARTPOSITION {start_position}")
    } else {
        format!("SELECT * FROM {entity} STARTPOSITION {start_position} MAXRESULTS {page_size}")
    }
}

#[async_trait]
impl RecordSource for QueryClient {
    #[instrument(skip(self), err)]
    async fn fetch_page(
        &self,
        entity: &str,
        start_position: usize,
        page_size: usize,
    ) -> Result<Vec<Value>> {
        let credentials = self.credentials.credentials().await?;
        let url = self.query_url(&credentials.realm_id, entity, start_position, page_size);

        let transport = |source: reqwest::Error| Error::Transport {
            entity: entity.to_string(),
            position: start_position,
            source,
        };

        let response = self
            .http
            .get(url)
            .bearer_auth(&credentials.access_token)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        let body = response.text().await.map_err(transport)?;

        if status != reqwest::StatusCode::OK {
            return Err(Error::Upstream {
                status: status.as_u16(),
                body,
                entity: entity.to_string(),
                position: start_position,
            });
        }

        parse_page(entity, start_position, &body)
    }
}

/// Extract `QueryResponse.<entity>` from a response body, a missing array is an empty page
pub fn parse_page(entity: &str, start_position: usize, body: &str) -> Result<Vec<Value>> {
    let malformed = |reason: String| Error::Upstream {
        status: 200,
        body: reason,
        entity: entity.to_string(),
        position: start_position,
    };

    let mut document: Value =
        serde_json::from_str(body).map_err(|e| malformed(format!("invalid JSON: {e}: {body}")))?;

    match document
        .get_mut("QueryResponse")
        .and_then(|response| response.get_mut(entity))
        .map(Value::take)
    {
        None | Some(Value::Null) => Ok(vec![]),
        Some(Value::Array(records)) => Ok(records),
        Some(other) => Err(malformed(format!(
            "QueryResponse.{entity} is not an array: {other}"
        ))),
    }
}

/// Fetch every record of `entity`, serially and in ascending start position.
///
/// Termination is decided by the length of the returned page alone, any
/// `maxResults` echo in the payload is ignored. `on_page` is called with the
/// start position and length of every page received.
#[instrument(skip(source, cancel, on_page), err)]
pub async fn fetch_all(
    source: &dyn RecordSource,
    entity: &str,
    page_size: usize,
    cancel: &CancellationToken,
    mut on_page: impl FnMut(usize, usize) + Send,
) -> Result<Vec<Value>> {
    let mut records = Vec::new();
    let mut start_position = 1;

    loop {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled {
                phase: Phase::Fetch,
            });
        }

        let page = source.fetch_page(entity, start_position, page_size).await?;
        let len = page.len();

        debug!(start_position, len, "fetched page");
        on_page(start_position, len);

        records.extend(page);
        start_position += len;

        if len < page_size || len == 0 {
            break;
        }
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::StaticCredentials;
    use serde_json::json;
    use std::sync::Mutex;

    struct PagedSource {
        total: usize,
        max_results_echo: usize,
        calls: Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl RecordSource for PagedSource {
        async fn fetch_page(
            &self,
            entity: &str,
            start_position: usize,
            page_size: usize,
        ) -> Result<Vec<Value>> {
            self.calls.lock().unwrap().push(start_position);

            let end = (start_position - 1 + page_size).min(self.total);
            let records = (start_position..=end)
                .map(|id| json!({ "Id": id.to_string() }))
                .collect::<Vec<_>>();

            let body = json!({
                "QueryResponse": {
                    entity: records,
                    "maxResults": self.max_results_echo,
                    "startPosition": start_position
                }
            });

            parse_page(entity, start_position, &body.to_string())
        }
    }

    fn source(total: usize, max_results_echo: usize) -> PagedSource {
        PagedSource {
            total,
            max_results_echo,
            calls: Mutex::new(vec![]),
        }
    }

    #[rstest::rstest]
    #[case(137, 100, vec![1, 101])]
    #[case(37, 100, vec![1])]
    #[case(0, 100, vec![1])]
    #[case(200, 100, vec![1, 101, 201])]
    #[case(25, 10, vec![1, 11, 21])]
    #[tokio::test]
    async fn test_pagination_is_length_based(
        #[case] total: usize,
        #[case] page_size: usize,
        #[case] expected_positions: Vec<usize>,
    ) {
        // the echo claims full pages forever, it must not influence termination
        let source = source(total, page_size);
        let records = fetch_all(
            &source,
            "Bill",
            page_size,
            &CancellationToken::new(),
            |_, _| {},
        )
        .await
        .unwrap();

        assert_eq!(records.len(), total);
        assert_eq!(*source.calls.lock().unwrap(), expected_positions);
        if total > 0 {
            assert_eq!(records[total - 1]["Id"], total.to_string());
        }
    }

    #[tokio::test]
    async fn test_short_max_results_echo_does_not_stop_early() {
        let source = source(250, 7);
        let records = fetch_all(&source, "Deposit", 100, &CancellationToken::new(), |_, _| {})
            .await
            .unwrap();

        assert_eq!(records.len(), 250);
    }

    #[tokio::test]
    async fn test_on_page_reports_every_page() {
        let source = source(150, 100);
        let mut pages = vec![];
        fetch_all(&source, "Bill", 100, &CancellationToken::new(), |p, n| {
            pages.push((p, n))
        })
        .await
        .unwrap();

        assert_eq!(pages, vec![(1, 100), (101, 50)]);
    }

    #[tokio::test]
    async fn test_cancelled_before_first_page() {
        let source = source(10, 100);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = fetch_all(&source, "Bill", 100, &cancel, |_, _| {})
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::Cancelled {
                phase: Phase::Fetch
            }
        ));
        assert!(source.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_parse_page_defaults_to_empty() {
        assert!(parse_page("Bill", 1, r#"{"QueryResponse": {}}"#)
            .unwrap()
            .is_empty());
        assert!(parse_page("Bill", 1, r#"{"time": "2024-01-01"}"#)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_parse_page_rejects_non_array() {
        let err = parse_page("Bill", 101, r#"{"QueryResponse": {"Bill": {"Id": "1"}}}"#)
            .unwrap_err();

        assert!(matches!(
            err,
            Error::Upstream {
                status: 200,
                position: 101,
                ..
            }
        ));
    }

    #[test]
    fn test_parse_page_rejects_invalid_json() {
        let err = parse_page("Bill", 1, "<html>maintenance</html>").unwrap_err();
        assert!(err.to_string().contains("invalid JSON"));
    }

    #[test]
    fn test_query_url() {
        let config = EngineConfig::builder()
            .copy_iam_role("arn:aws:iam::1:role/copy")
            .build()
            .unwrap();
        let client =
            QueryClient::try_new(&config, Arc::new(StaticCredentials::new("t", "42"))).unwrap();

        let url = client.query_url("42", "JournalEntry", 101, 100);
        assert_eq!(url.path(), "/v3/company/42/query");

        let query = url.query_pairs().collect::<Vec<_>>();
        assert_eq!(query.len(), 1);
        assert_eq!(query[0].0, "query");
        assert_eq!(query[0].1, "SELECT * FROM JournalEntry STARTPOSITION 101");
    }

    #[test]
    fn test_query_statement_with_custom_page_size() {
        assert_eq!(
            query_statement("Purchase", 1, 50),
            "SELECT * FROM Purchase STARTPOSITION 1 MAXRESULTS 50"
        );
    }
}
