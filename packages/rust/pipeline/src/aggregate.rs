//! Aggregation of per-fund datasets into the final hand-off table.
//!
//! Concatenates successful fund datasets, scrubs sentinel text left by
//! upstream renderers, drops exact-duplicate rows, and stamps every row
//! with the ingestion date — the one mutation applied after parsing.

use std::collections::HashSet;

use chrono::NaiveDate;
use tracing::debug;

use thirteenf_shared::{AggregatedDataset, FundDataset, HoldingRecord};

/// Merge fund datasets into one [`AggregatedDataset`].
///
/// `ingestion_date` is injected so tests can pin it; the scheduler passes
/// the current date. An empty input yields an empty dataset, which is a
/// valid result rather than an error.
pub fn aggregate(datasets: Vec<FundDataset>, ingestion_date: NaiveDate) -> AggregatedDataset {
    let mut seen: HashSet<DedupKey> = HashSet::new();
    let mut records: Vec<HoldingRecord> = Vec::new();
    let mut duplicates = 0usize;

    for dataset in datasets {
        for mut record in dataset.records {
            scrub_sentinels(&mut record);

            if !seen.insert(DedupKey::of(&record)) {
                duplicates += 1;
                continue;
            }

            record.date_insert = Some(ingestion_date);
            records.push(record);
        }
    }

    debug!(rows = records.len(), duplicates, "aggregated fund datasets");
    AggregatedDataset { records }
}

/// Identity of a row for exact-duplicate detection: fund, filing date,
/// CUSIP, value, and the three voting counts.
#[derive(PartialEq, Eq, Hash)]
struct DedupKey {
    fund_name: String,
    trans_date: NaiveDate,
    cusip: String,
    value_bits: u64,
    voting_sole: Option<i64>,
    voting_shared: Option<i64>,
    voting_none: Option<i64>,
}

impl DedupKey {
    fn of(record: &HoldingRecord) -> Self {
        Self {
            fund_name: record.fund_name.clone(),
            trans_date: record.trans_date,
            cusip: record.cusip.clone(),
            value_bits: record.value.to_bits(),
            voting_sole: record.voting_sole,
            voting_shared: record.voting_shared,
            voting_none: record.voting_none,
        }
    }
}

/// Replace "none"-like sentinel text in the nullable text fields with
/// proper nulls.
fn scrub_sentinels(record: &mut HoldingRecord) {
    for field in [
        &mut record.figi,
        &mut record.put_call,
        &mut record.other_manager,
    ] {
        if field
            .as_deref()
            .is_some_and(|v| v.trim().is_empty() || v.trim().eq_ignore_ascii_case("none"))
        {
            *field = None;
        }
    }
}
