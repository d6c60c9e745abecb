//! Per-fund submissions index: JSON schema and latest-filing selection.
//!
//! The submissions endpoint returns the fund's display name plus columnar
//! arrays of its recent filings (`accessionNumber[i]`, `filingDate[i]`,
//! `form[i]` describe one filing together).

use chrono::NaiveDate;
use serde::Deserialize;

use thirteenf_shared::{AccessionNumber, Cik, FilingReference, Result, ThirteenfError};

/// Top-level submissions payload. Only the fields the resolver needs.
#[derive(Debug, Deserialize)]
pub(crate) struct Submissions {
    pub name: String,
    pub filings: Filings,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Filings {
    pub recent: RecentFilings,
}

/// Columnar recent-filings arrays; index `i` across all three describes one filing.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RecentFilings {
    pub accession_number: Vec<String>,
    pub filing_date: Vec<String>,
    pub form: Vec<String>,
}

/// A resolved filing: the reference plus the fund's display name.
#[derive(Debug, Clone)]
pub struct ResolvedFiling {
    pub reference: FilingReference,
    pub fund_name: String,
}

/// Parse a submissions payload and select the most recent `target_form` filing.
///
/// Returns the fund name together with `None` when the fund has never filed
/// the target form — a valid terminal outcome, not an error. A date tie
/// keeps the filing appearing first in index order; the index is never
/// re-sorted.
pub(crate) fn select_latest_filing(
    json: &str,
    cik: &Cik,
    target_form: &str,
) -> Result<(String, Option<FilingReference>)> {
    let submissions: Submissions = serde_json::from_str(json).map_err(|e| {
        ThirteenfError::parse(format!("submissions index for CIK {cik}: {e}"))
    })?;

    let recent = &submissions.filings.recent;
    let mut best: Option<FilingReference> = None;

    for ((accession, date), form) in recent
        .accession_number
        .iter()
        .zip(&recent.filing_date)
        .zip(&recent.form)
    {
        if form != target_form {
            continue;
        }

        let filing_date = NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|e| {
            ThirteenfError::parse(format!(
                "filing date {date:?} in submissions index for CIK {cik}: {e}"
            ))
        })?;

        // Strictly-greater keeps the first entry on a date tie.
        if best.as_ref().is_none_or(|b| filing_date > b.filing_date) {
            best = Some(FilingReference {
                cik: cik.clone(),
                filing_date,
                accession: AccessionNumber::new(accession.clone()),
            });
        }
    }

    Ok((submissions.name, best))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TARGET_FORM: &str = "13F-HR";

    fn fixture() -> String {
        std::fs::read_to_string("../../../fixtures/json/submissions.fixture.json")
            .expect("read submissions fixture")
    }

    #[test]
    fn selects_most_recent_target_form() {
        let cik = Cik::new("1067983");
        let (name, reference) = select_latest_filing(&fixture(), &cik, TARGET_FORM).unwrap();

        assert_eq!(name, "BERKSHIRE HATHAWAY INC");
        let reference = reference.expect("fund has filed 13F-HR");
        assert_eq!(reference.accession.0, "0000950123-24-008740");
        assert_eq!(
            reference.filing_date,
            NaiveDate::from_ymd_opt(2024, 8, 14).unwrap()
        );
        // Non-target forms in the index are ignored.
        assert_ne!(reference.accession.0, "0000950123-24-000999");
    }

    #[test]
    fn no_target_filing_is_not_an_error() {
        let json = r#"{
            "name": "SMALL FUND LP",
            "filings": { "recent": {
                "accessionNumber": ["0001-23-000001"],
                "filingDate": ["2023-02-01"],
                "form": ["10-K"]
            }}
        }"#;
        let (name, reference) =
            select_latest_filing(json, &Cik::new("99"), TARGET_FORM).unwrap();
        assert_eq!(name, "SMALL FUND LP");
        assert!(reference.is_none());
    }

    #[test]
    fn date_tie_keeps_index_order() {
        let json = r#"{
            "name": "TIED FUND",
            "filings": { "recent": {
                "accessionNumber": ["0001-24-000002", "0001-24-000003"],
                "filingDate": ["2024-05-15", "2024-05-15"],
                "form": ["13F-HR", "13F-HR"]
            }}
        }"#;
        let (_, reference) = select_latest_filing(json, &Cik::new("7"), TARGET_FORM).unwrap();
        assert_eq!(reference.unwrap().accession.0, "0001-24-000002");
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = select_latest_filing("{not json", &Cik::new("7"), TARGET_FORM).unwrap_err();
        assert!(matches!(err, ThirteenfError::Parse { .. }));
    }

    #[test]
    fn malformed_date_is_a_parse_error() {
        let json = r#"{
            "name": "BAD DATES INC",
            "filings": { "recent": {
                "accessionNumber": ["0001-24-000002"],
                "filingDate": ["15/05/2024"],
                "form": ["13F-HR"]
            }}
        }"#;
        let err = select_latest_filing(json, &Cik::new("7"), TARGET_FORM).unwrap_err();
        assert!(matches!(err, ThirteenfError::Parse { .. }));
    }
}
