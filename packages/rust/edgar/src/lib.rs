//! EDGAR access: filing-index resolution and document location.
//!
//! This crate provides:
//! - [`EdgarClient`] — resolver + locator over the shared rate-limited fetcher
//! - [`submissions`] — submissions-JSON schema and latest-filing selection
//! - [`documents`] — document-bundle index scanning

pub mod documents;
pub mod submissions;

use std::sync::Arc;

use tracing::{debug, info};
use url::Url;

use thirteenf_fetch::Fetcher;
use thirteenf_shared::{Cik, FilingReference, PipelineConfig, Result, ThirteenfError};

pub use submissions::ResolvedFiling;

// ---------------------------------------------------------------------------
// Endpoints
// ---------------------------------------------------------------------------

/// The EDGAR endpoints a pipeline run talks to.
#[derive(Debug, Clone)]
pub struct EdgarEndpoints {
    /// Base for `CIK{padded}.json` submission indexes (no trailing slash).
    pub submissions_base: String,
    /// Base for `/edgar/data/...` archive paths (no trailing slash).
    pub archives_base: String,
    /// Filing form type to select, e.g. `13F-HR`.
    pub target_form: String,
}

impl EdgarEndpoints {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            submissions_base: config.submissions_base.trim_end_matches('/').to_string(),
            archives_base: config.archives_base.trim_end_matches('/').to_string(),
            target_form: config.target_form.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// EdgarClient
// ---------------------------------------------------------------------------

/// Resolver and locator for one EDGAR deployment, sharing the global fetcher.
pub struct EdgarClient {
    fetcher: Arc<Fetcher>,
    endpoints: EdgarEndpoints,
}

impl EdgarClient {
    pub fn new(fetcher: Arc<Fetcher>, endpoints: EdgarEndpoints) -> Self {
        Self { fetcher, endpoints }
    }

    /// Resolve a fund's most recent target-form filing.
    ///
    /// `Ok(None)` means the fund has never filed the target form — a valid
    /// terminal outcome with empty holdings, distinct from failing to reach
    /// the index at all.
    pub async fn latest_filing(&self, cik: &Cik) -> Result<Option<ResolvedFiling>> {
        let url = format!(
            "{}/CIK{}.json",
            self.endpoints.submissions_base,
            cik.padded()
        );
        let body = self.fetcher.get_text(&url).await?;

        let (fund_name, reference) =
            submissions::select_latest_filing(&body, cik, &self.endpoints.target_form)?;

        match reference {
            Some(reference) => {
                debug!(
                    %cik,
                    fund_name = %fund_name,
                    accession = %reference.accession,
                    filing_date = %reference.filing_date,
                    "resolved latest filing"
                );
                Ok(Some(ResolvedFiling {
                    reference,
                    fund_name,
                }))
            }
            None => {
                info!(%cik, fund_name = %fund_name, form = %self.endpoints.target_form, "fund has no qualifying filing");
                Ok(None)
            }
        }
    }

    /// Locate the information-table document within a filing's bundle.
    pub async fn information_table_url(&self, filing: &FilingReference) -> Result<Url> {
        let index_url = format!(
            "{}/edgar/data/{}/{}/{}-index.htm",
            self.endpoints.archives_base,
            filing.cik.raw(),
            filing.accession.dashless(),
            filing.accession
        );
        let body = self.fetcher.get_text(&index_url).await?;

        let href = documents::information_table_href(&body).ok_or_else(|| {
            ThirteenfError::DocumentMissing {
                cik: filing.cik.to_string(),
                accession: filing.accession.to_string(),
            }
        })?;

        let base = Url::parse(&self.endpoints.archives_base).map_err(|e| {
            ThirteenfError::config(format!(
                "invalid archives base {:?}: {e}",
                self.endpoints.archives_base
            ))
        })?;
        let url = base.join(&href).map_err(|e| {
            ThirteenfError::parse(format!("information table href {href:?}: {e}"))
        })?;

        debug!(cik = %filing.cik, %url, "located information table document");
        Ok(url)
    }

    /// Fetch the raw information-table markup.
    pub async fn fetch_document(&self, url: &Url) -> Result<String> {
        self.fetcher.get_text(url.as_str()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use thirteenf_fetch::{FetcherConfig, RetryPolicy};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_fetcher() -> Arc<Fetcher> {
        Arc::new(
            Fetcher::new(&FetcherConfig {
                user_agent: "thirteenf-tests (dev@example.com)".into(),
                timeout: Duration::from_secs(5),
                max_requests: 100,
                period: Duration::from_millis(100),
                retry: RetryPolicy {
                    max_attempts: 1,
                    backoff: Duration::from_millis(1),
                },
            })
            .unwrap(),
        )
    }

    fn endpoints_for(server: &MockServer) -> EdgarEndpoints {
        EdgarEndpoints {
            submissions_base: server.uri(),
            archives_base: server.uri(),
            target_form: "13F-HR".into(),
        }
    }

    fn fixture(rel: &str) -> String {
        std::fs::read_to_string(format!("../../../fixtures/{rel}"))
            .unwrap_or_else(|_| panic!("missing fixture: {rel}"))
    }

    #[tokio::test]
    async fn resolves_latest_filing_from_index() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/CIK0001067983.json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(fixture("json/submissions.fixture.json")),
            )
            .mount(&server)
            .await;

        let client = EdgarClient::new(test_fetcher(), endpoints_for(&server));
        let resolved = client
            .latest_filing(&Cik::new("1067983"))
            .await
            .unwrap()
            .expect("fund has filed");

        assert_eq!(resolved.fund_name, "BERKSHIRE HATHAWAY INC");
        assert_eq!(resolved.reference.accession.0, "0000950123-24-008740");
    }

    #[tokio::test]
    async fn locates_information_table_document() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(
                "/edgar/data/1067983/000095012324008740/0000950123-24-008740-index.htm",
            ))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(fixture("html/filing-index.fixture.html")),
            )
            .mount(&server)
            .await;

        let client = EdgarClient::new(test_fetcher(), endpoints_for(&server));
        let filing = FilingReference {
            cik: Cik::new("1067983"),
            filing_date: chrono::NaiveDate::from_ymd_opt(2024, 8, 14).unwrap(),
            accession: thirteenf_shared::AccessionNumber::new("0000950123-24-008740"),
        };

        let url = client.information_table_url(&filing).await.unwrap();
        assert_eq!(
            url.path(),
            "/Archives/edgar/data/1067983/000095012324008740/form13fInfoTable.xml"
        );
    }

    #[tokio::test]
    async fn bundle_without_information_table_is_document_missing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<table class="tableFile"><tr><td>1</td><td>PRIMARY DOCUMENT</td>
                   <td><a href="/arch/primary_doc.xml">primary_doc.xml</a></td></tr></table>"#,
            ))
            .mount(&server)
            .await;

        let client = EdgarClient::new(test_fetcher(), endpoints_for(&server));
        let filing = FilingReference {
            cik: Cik::new("55"),
            filing_date: chrono::NaiveDate::from_ymd_opt(2024, 8, 14).unwrap(),
            accession: thirteenf_shared::AccessionNumber::new("0001-24-000001"),
        };

        let err = client.information_table_url(&filing).await.unwrap_err();
        assert!(matches!(err, ThirteenfError::DocumentMissing { .. }));
    }

    #[tokio::test]
    async fn unreachable_index_is_a_network_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = EdgarClient::new(test_fetcher(), endpoints_for(&server));
        let err = client.latest_filing(&Cik::new("1")).await.unwrap_err();
        assert!(matches!(err, ThirteenfError::Network { .. }));
    }
}
