//! Concurrent per-fund scheduling with failure isolation.
//!
//! One task per fund runs the full sequential pipeline (resolve filing →
//! locate document → fetch table → parse) inside one of `worker_count`
//! semaphore slots. Each fund's failure is caught at its task boundary,
//! recorded with the stage it died in, and never allowed to abort or delay
//! sibling funds. Results are collected only by awaiting join handles, so
//! no task writes into shared state.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::Semaphore;
use tracing::{info, instrument, warn};

use thirteenf_edgar::EdgarClient;
use thirteenf_parser::{FilingContext, parse_holdings};
use thirteenf_shared::{AggregatedDataset, Cik, FundDataset, ThirteenfError};

use crate::aggregate::aggregate;

// ---------------------------------------------------------------------------
// Per-fund outcome
// ---------------------------------------------------------------------------

/// Where a fund's pipeline stopped when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Fetching or reading the fund's filing index.
    ResolveFiling,
    /// Scanning the filing's document bundle for the information table.
    LocateDocument,
    /// Fetching the information-table document.
    FetchTable,
    /// Parsing the holdings table.
    ParseTable,
    /// The task itself failed (panic or cancellation).
    Internal,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::ResolveFiling => "resolve-filing",
            Self::LocateDocument => "locate-document",
            Self::FetchTable => "fetch-table",
            Self::ParseTable => "parse-table",
            Self::Internal => "internal",
        };
        write!(f, "{name}")
    }
}

/// One fund's failure, as exposed in the run report.
#[derive(Debug)]
pub struct FundFailure {
    pub cik: Cik,
    pub stage: Stage,
    pub reason: String,
}

/// Successful terminal states of the per-fund pipeline.
enum FundOutcome {
    /// The fund's latest filing parsed into holdings (possibly zero rows).
    Holdings(FundDataset),
    /// The fund has never filed the target form — valid and empty.
    NoFiling,
}

/// A pipeline error tagged with the stage it occurred in.
struct StageError {
    stage: Stage,
    source: ThirteenfError,
}

trait StageResultExt<T> {
    fn at_stage(self, stage: Stage) -> Result<T, StageError>;
}

impl<T> StageResultExt<T> for Result<T, ThirteenfError> {
    fn at_stage(self, stage: Stage) -> Result<T, StageError> {
        self.map_err(|source| StageError { stage, source })
    }
}

// ---------------------------------------------------------------------------
// RunReport
// ---------------------------------------------------------------------------

/// Everything the run-level caller sees: the merged dataset plus failure
/// accounting. Partial data quality is never a fatal error.
#[derive(Debug)]
pub struct RunReport {
    /// Union of all successfully parsed fund datasets.
    pub dataset: AggregatedDataset,
    /// Funds whose pipeline failed, with stage and reason.
    pub failures: Vec<FundFailure>,
    /// Funds that produced at least an (possibly empty) parsed dataset.
    pub funds_succeeded: usize,
    /// Funds that have never filed the target form.
    pub funds_without_filing: usize,
    /// Total wall-clock time for the run.
    pub elapsed: Duration,
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Fans the per-fund pipeline out across a bounded worker pool.
pub struct Scheduler {
    client: Arc<EdgarClient>,
    worker_count: usize,
}

impl Scheduler {
    pub fn new(client: Arc<EdgarClient>, worker_count: usize) -> Self {
        Self {
            client,
            worker_count: worker_count.max(1),
        }
    }

    /// Run the pipeline for every fund and aggregate the survivors.
    #[instrument(skip_all, fields(funds = ciks.len(), workers = self.worker_count))]
    pub async fn run(&self, ciks: &[Cik]) -> RunReport {
        let start = Instant::now();
        let semaphore = Arc::new(Semaphore::new(self.worker_count));

        let mut handles = Vec::with_capacity(ciks.len());
        for cik in ciks {
            let client = self.client.clone();
            let semaphore = semaphore.clone();
            let cik = cik.clone();

            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire().await.expect("semaphore closed");
                let outcome = process_fund(&client, &cik).await;
                (cik, outcome)
            }));
        }

        let mut datasets: Vec<FundDataset> = Vec::new();
        let mut failures: Vec<FundFailure> = Vec::new();
        let mut funds_without_filing = 0usize;

        for handle in handles {
            match handle.await {
                Ok((cik, Ok(FundOutcome::Holdings(dataset)))) => {
                    info!(%cik, rows = dataset.len(), "fund pipeline complete");
                    datasets.push(dataset);
                }
                Ok((cik, Ok(FundOutcome::NoFiling))) => {
                    funds_without_filing += 1;
                    info!(%cik, "fund has no qualifying filing, empty result");
                }
                Ok((cik, Err(err))) => {
                    warn!(%cik, stage = %err.stage, reason = %err.source, "fund pipeline failed");
                    failures.push(FundFailure {
                        cik,
                        stage: err.stage,
                        reason: err.source.to_string(),
                    });
                }
                Err(join_err) => {
                    warn!(error = %join_err, "fund task aborted");
                    failures.push(FundFailure {
                        cik: Cik::new("unknown"),
                        stage: Stage::Internal,
                        reason: join_err.to_string(),
                    });
                }
            }
        }

        let funds_succeeded = datasets.len();
        let dataset = aggregate(datasets, Utc::now().date_naive());
        let elapsed = start.elapsed();

        info!(
            rows = dataset.len(),
            funds_succeeded,
            funds_without_filing,
            funds_failed = failures.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "ingestion run complete"
        );

        RunReport {
            dataset,
            failures,
            funds_succeeded,
            funds_without_filing,
            elapsed,
        }
    }
}

/// One fund's full sequential pipeline.
///
/// The `?`-chain realizes the per-fund state machine; each step tags its
/// error with the stage it stopped in.
async fn process_fund(client: &EdgarClient, cik: &Cik) -> Result<FundOutcome, StageError> {
    let resolved = client
        .latest_filing(cik)
        .await
        .at_stage(Stage::ResolveFiling)?;

    let Some(resolved) = resolved else {
        return Ok(FundOutcome::NoFiling);
    };

    let table_url = client
        .information_table_url(&resolved.reference)
        .await
        .at_stage(Stage::LocateDocument)?;

    let markup = client
        .fetch_document(&table_url)
        .await
        .at_stage(Stage::FetchTable)?;

    let filing = FilingContext {
        cik: cik.clone(),
        fund_name: resolved.fund_name,
        filing_date: resolved.reference.filing_date,
    };
    let dataset = parse_holdings(&markup, &filing).at_stage(Stage::ParseTable)?;

    Ok(FundOutcome::Holdings(dataset))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use thirteenf_edgar::EdgarEndpoints;
    use thirteenf_fetch::{Fetcher, FetcherConfig, RetryPolicy};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn scheduler_for(server: &MockServer, workers: usize) -> Scheduler {
        let fetcher = Arc::new(
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
        );
        let client = Arc::new(EdgarClient::new(
            fetcher,
            EdgarEndpoints {
                submissions_base: server.uri(),
                archives_base: server.uri(),
                target_form: "13F-HR".into(),
            },
        ));
        Scheduler::new(client, workers)
    }

    fn fixture(rel: &str) -> String {
        std::fs::read_to_string(format!("../../../fixtures/{rel}"))
            .unwrap_or_else(|_| panic!("missing fixture: {rel}"))
    }

    fn submissions_with_filing(name: &str, accession: &str) -> String {
        format!(
            r#"{{
                "name": "{name}",
                "filings": {{ "recent": {{
                    "accessionNumber": ["{accession}"],
                    "filingDate": ["2024-08-14"],
                    "form": ["13F-HR"]
                }}}}
            }}"#
        )
    }

    fn submissions_without_filing(name: &str) -> String {
        format!(
            r#"{{
                "name": "{name}",
                "filings": {{ "recent": {{
                    "accessionNumber": ["0001-24-000009"],
                    "filingDate": ["2024-03-01"],
                    "form": ["10-K"]
                }}}}
            }}"#
        )
    }

    fn bundle_index(info_table_href: &str) -> String {
        format!(
            r#"<table class="tableFile">
               <tr><td>1</td><td>PRIMARY DOCUMENT</td>
                   <td><a href="/arch/primary_doc.xml">primary_doc.xml</a></td></tr>
               <tr><td>2</td><td>INFORMATION TABLE</td>
                   <td><a href="{info_table_href}">infotable.xml</a></td></tr>
               </table>"#
        )
    }

    /// Mount the full happy-path chain for one fund.
    async fn mount_fund(server: &MockServer, cik_raw: &str, name: &str) {
        let accession = format!("0001-24-00000{cik_raw}");
        let dashless = accession.replace('-', "");
        let table_path = format!("/Archives/edgar/data/{cik_raw}/infotable.xml");

        Mock::given(method("GET"))
            .and(path(format!("/CIK{:0>10}.json", cik_raw)))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(submissions_with_filing(name, &accession)),
            )
            .mount(server)
            .await;

        Mock::given(method("GET"))
            .and(path(format!(
                "/edgar/data/{cik_raw}/{dashless}/{accession}-index.htm"
            )))
            .respond_with(ResponseTemplate::new(200).set_body_string(bundle_index(&table_path)))
            .mount(server)
            .await;

        Mock::given(method("GET"))
            .and(path(table_path))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(fixture("html/infotable-13col.fixture.html")),
            )
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn end_to_end_isolates_failures_from_successes() {
        let server = MockServer::start().await;

        // Fund 1: one valid filing with two holding rows.
        mount_fund(&server, "1", "FUND A").await;

        // Fund 2: has never filed 13F-HR — a valid empty result.
        Mock::given(method("GET"))
            .and(path("/CIK0000000002.json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(submissions_without_filing("FUND B")),
            )
            .mount(&server)
            .await;

        // Fund 3: index fetch fails outright.
        Mock::given(method("GET"))
            .and(path("/CIK0000000003.json"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let scheduler = scheduler_for(&server, 3);
        let report = scheduler
            .run(&[Cik::new("1"), Cik::new("2"), Cik::new("3")])
            .await;

        // Only fund A contributes rows, stamped with today's ingestion date.
        assert_eq!(report.dataset.len(), 2);
        let today = Utc::now().date_naive();
        assert!(report.dataset.records.iter().all(|r| {
            r.fund_name == "FUND A" && r.date_insert == Some(today)
        }));

        // Fund B is an empty success, not a failure.
        assert_eq!(report.funds_without_filing, 1);
        assert_eq!(report.funds_succeeded, 1);

        // Exactly one failure entry, for fund C, at the index stage.
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].cik, Cik::new("3"));
        assert_eq!(report.failures[0].stage, Stage::ResolveFiling);
        assert!(report.failures[0].reason.contains("HTTP 500"));
    }

    #[tokio::test]
    async fn missing_information_table_fails_at_locate_stage() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/CIK0000000004.json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(submissions_with_filing("FUND D", "0001-24-000004")),
            )
            .mount(&server)
            .await;

        // Bundle index lists no information table.
        Mock::given(method("GET"))
            .and(path("/edgar/data/4/000124000004/0001-24-000004-index.htm"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<table class="tableFile"><tr><td>1</td><td>PRIMARY DOCUMENT</td>
                   <td><a href="/arch/primary_doc.xml">doc</a></td></tr></table>"#,
            ))
            .mount(&server)
            .await;

        let scheduler = scheduler_for(&server, 2);
        let report = scheduler.run(&[Cik::new("4")]).await;

        assert!(report.dataset.is_empty());
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].stage, Stage::LocateDocument);
    }

    #[tokio::test]
    async fn empty_fund_list_yields_empty_report() {
        let server = MockServer::start().await;
        let scheduler = scheduler_for(&server, 5);
        let report = scheduler.run(&[]).await;

        assert!(report.dataset.is_empty());
        assert!(report.failures.is_empty());
        assert_eq!(report.funds_succeeded, 0);
    }

    #[tokio::test]
    async fn worker_pool_processes_more_funds_than_slots() {
        let server = MockServer::start().await;
        for i in 1..=6 {
            mount_fund(&server, &i.to_string(), &format!("FUND {i}")).await;
        }

        let scheduler = scheduler_for(&server, 2);
        let ciks: Vec<Cik> = (1..=6).map(|i| Cik::new(i.to_string())).collect();
        let report = scheduler.run(&ciks).await;

        assert_eq!(report.funds_succeeded, 6);
        assert!(report.failures.is_empty());
        // Two fixture rows per fund; dedup keys include the fund name, so
        // nothing collapses across funds.
        assert_eq!(report.dataset.len(), 12);
    }
}
