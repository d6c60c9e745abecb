//! Holdings-table parser: raw information-table markup → normalized records.
//!
//! Pure transformation, no network access. The table layout varies by
//! filing: 13 data columns when the FIGI column is present, 12 when it is
//! absent. The variant is resolved once, up front, before any field-level
//! normalization runs; data-quality problems (unparseable numbers, short
//! rows, missing CUSIP) degrade individual rows and never fail the fund.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use thirteenf_shared::{Cik, FundDataset, HoldingRecord, Result, ThirteenfError};

/// Header/caption band rows preceding the data rows in the rendered table.
const HEADER_ROWS: usize = 3;

/// A value cell that is a pure digit string longer than three characters.
///
/// Legacy repair rule carried over from the previous ingestion system: such
/// a cell is treated as several values accidentally concatenated by the
/// source renderer and split into one row per character. Its correctness
/// against genuine long share counts is unverified; the behavior is kept
/// as-is rather than silently changed.
static CONCATENATED_DIGITS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4,}$").expect("digit-run regex"));

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// Filing identity attached to every parsed row.
#[derive(Debug, Clone)]
pub struct FilingContext {
    pub cik: Cik,
    pub fund_name: String,
    pub filing_date: NaiveDate,
}

// ---------------------------------------------------------------------------
// Layout variant
// ---------------------------------------------------------------------------

/// The two known information-table layouts, resolved once per table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layout {
    /// 13 data columns, FIGI in column 4.
    WithFigi,
    /// 12 data columns, no FIGI anywhere.
    WithoutFigi,
}

impl Layout {
    fn from_width(columns: usize) -> Result<Self> {
        match columns {
            13 => Ok(Self::WithFigi),
            12 => Ok(Self::WithoutFigi),
            _ => Err(ThirteenfError::SchemaError { columns }),
        }
    }

    fn width(self) -> usize {
        match self {
            Self::WithFigi => 13,
            Self::WithoutFigi => 12,
        }
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse raw information-table markup into one fund's normalized holdings.
///
/// Fails only with [`ThirteenfError::TableNotFound`] (no holdings table in
/// the document) or [`ThirteenfError::SchemaError`] (unrecognized column
/// count); everything else degrades per row. The result may be empty.
pub fn parse_holdings(markup: &str, filing: &FilingContext) -> Result<FundDataset> {
    let doc = Html::parse_document(markup);
    let table_sel =
        Selector::parse(r#"table[summary="Form 13F-NT Header Information"]"#)
            .expect("static selector");
    let row_sel = Selector::parse("tr").expect("static selector");
    let cell_sel = Selector::parse("td").expect("static selector");

    let table = doc
        .select(&table_sel)
        .next()
        .ok_or(ThirteenfError::TableNotFound)?;

    let rows: Vec<Vec<String>> = table
        .select(&row_sel)
        .skip(HEADER_ROWS)
        .map(|row| cell_texts(&row, &cell_sel))
        .collect();

    let Some(first) = rows.first() else {
        // A table with only its header band carries no holdings.
        return Ok(FundDataset {
            cik: filing.cik.clone(),
            fund_name: filing.fund_name.clone(),
            records: Vec::new(),
        });
    };

    let layout = Layout::from_width(first.len())?;

    let mut records = Vec::with_capacity(rows.len());
    let mut dropped = 0usize;

    for cells in &rows {
        if cells.len() != layout.width() {
            dropped += 1;
            continue;
        }
        let before = records.len();
        expand_row(cells, layout, filing, &mut records);
        if records.len() == before {
            dropped += 1;
        }
    }

    debug!(
        cik = %filing.cik,
        layout = ?layout,
        rows = records.len(),
        dropped,
        "parsed information table"
    );

    Ok(FundDataset {
        cik: filing.cik.clone(),
        fund_name: filing.fund_name.clone(),
        records,
    })
}

/// Normalized cell texts for one row: embedded newlines and runs of
/// whitespace collapse to single spaces, ends trimmed.
fn cell_texts(row: &ElementRef, cell_sel: &Selector) -> Vec<String> {
    row.select(cell_sel)
        .map(|cell| {
            cell.text()
                .collect::<String>()
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect()
}

/// Build zero or more records from one source row.
///
/// Zero when the row lacks a CUSIP or a coercible value; more than one when
/// the digit-concatenation repair rule splits the value cell.
fn expand_row(
    cells: &[String],
    layout: Layout,
    filing: &FilingContext,
    out: &mut Vec<HoldingRecord>,
) {
    let (figi, rest_offset) = match layout {
        Layout::WithFigi => (optional_text(&cells[3]), 4),
        Layout::WithoutFigi => (None, 3),
    };

    let cusip = cells[2].clone();
    if cusip.is_empty() {
        return;
    }

    let raw_value = &cells[rest_offset];
    for sub_value in split_concatenated_value(raw_value) {
        let Ok(value) = sub_value.parse::<f64>() else {
            continue;
        };

        out.push(HoldingRecord {
            name_of_issuer: cells[0].clone(),
            title_of_class: cells[1].clone(),
            cusip: cusip.clone(),
            figi: figi.clone(),
            value,
            prn_amt: coerce_int(&cells[rest_offset + 1]),
            prn: cells[rest_offset + 2].clone(),
            put_call: optional_text(&cells[rest_offset + 3]),
            discretion: cells[rest_offset + 4].clone(),
            other_manager: optional_text(&cells[rest_offset + 5]),
            voting_sole: coerce_int(&cells[rest_offset + 6]),
            voting_shared: coerce_int(&cells[rest_offset + 7]),
            voting_none: coerce_int(&cells[rest_offset + 8]),
            fund_name: filing.fund_name.clone(),
            trans_date: filing.filing_date,
            date_insert: None,
        });
    }
}

/// Apply the legacy digit-concatenation repair rule to a value cell.
///
/// A pure digit string longer than three characters becomes one sub-value
/// per character; everything else passes through as a single value.
fn split_concatenated_value(raw: &str) -> Vec<String> {
    if CONCATENATED_DIGITS_RE.is_match(raw) {
        raw.chars().map(String::from).collect()
    } else {
        vec![raw.to_string()]
    }
}

/// Nullable integer coercion: failures become null, never a row abort.
fn coerce_int(raw: &str) -> Option<i64> {
    raw.parse::<i64>().ok()
}

/// Empty cells in nullable text columns become null.
fn optional_text(raw: &str) -> Option<String> {
    if raw.is_empty() {
        None
    } else {
        Some(raw.to_string())
    }
}
