//! Core domain types for the 13F ingestion pipeline.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Cik
// ---------------------------------------------------------------------------

/// A fund's Central Index Key — the opaque identifier supplied by the caller.
///
/// Stored as given; [`Cik::padded`] yields the ten-digit zero-padded form the
/// submissions endpoint expects.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cik(pub String);

impl Cik {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Ten-digit zero-padded form used in `CIK{..}.json` submission URLs.
    pub fn padded(&self) -> String {
        format!("{:0>10}", self.0)
    }

    /// Raw form as supplied, used in archive directory paths.
    pub fn raw(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Cik {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Cik {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

// ---------------------------------------------------------------------------
// AccessionNumber
// ---------------------------------------------------------------------------

/// A filing accession number in its dashed form, e.g. `0000950123-24-008740`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessionNumber(pub String);

impl AccessionNumber {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Directory form with dashes stripped, used in archive URLs.
    pub fn dashless(&self) -> String {
        self.0.replace('-', "")
    }
}

impl std::fmt::Display for AccessionNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// FilingReference
// ---------------------------------------------------------------------------

/// Pointer to one filing's document bundle.
///
/// Created by the filing-index resolver, consumed by the document locator
/// and the parser; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilingReference {
    /// The fund this filing belongs to.
    pub cik: Cik,
    /// Date the filing was submitted.
    pub filing_date: NaiveDate,
    /// Accession number identifying the document bundle.
    pub accession: AccessionNumber,
}

// ---------------------------------------------------------------------------
// HoldingRecord
// ---------------------------------------------------------------------------

/// One normalized holding row in the canonical 13-field source schema, plus
/// the three pipeline-added fields.
///
/// The parser guarantees `cusip` and `value` are present (rows failing that
/// are dropped); `figi` is explicitly `None` when the source's 12-column
/// layout lacked the column. `date_insert` starts as `None` and is stamped
/// exactly once by the aggregator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldingRecord {
    pub name_of_issuer: String,
    pub title_of_class: String,
    pub cusip: String,
    pub figi: Option<String>,
    /// Reported market value. Always present after parsing.
    pub value: f64,
    /// Principal amount (share or principal count).
    pub prn_amt: Option<i64>,
    /// Principal-amount type, `SH` or `PRN`.
    pub prn: String,
    /// Put/call flag, present only for option positions.
    pub put_call: Option<String>,
    /// Investment discretion, e.g. `SOLE` or `DFND`.
    pub discretion: String,
    /// Other managers sharing discretion over the position.
    pub other_manager: Option<String>,
    pub voting_sole: Option<i64>,
    pub voting_shared: Option<i64>,
    pub voting_none: Option<i64>,
    /// Fund display name from the filing index.
    pub fund_name: String,
    /// Filing (transaction) date attached during parsing.
    pub trans_date: NaiveDate,
    /// Ingestion date, stamped once by the aggregator.
    pub date_insert: Option<NaiveDate>,
}

// ---------------------------------------------------------------------------
// Column schema for the storage hand-off
// ---------------------------------------------------------------------------

/// Per-column type hint for the consuming storage layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Text,
    NullableText,
    NullableInteger,
    NullableFloat,
    Date,
}

/// One column in the hand-off schema: name plus type hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub ty: ColumnType,
}

/// The hand-off schema, in column order.
pub const COLUMNS: &[ColumnSpec] = &[
    ColumnSpec { name: "name_of_issuer", ty: ColumnType::Text },
    ColumnSpec { name: "title_of_class", ty: ColumnType::Text },
    ColumnSpec { name: "cusip", ty: ColumnType::Text },
    ColumnSpec { name: "figi", ty: ColumnType::NullableText },
    ColumnSpec { name: "value", ty: ColumnType::NullableFloat },
    ColumnSpec { name: "prn_amt", ty: ColumnType::NullableInteger },
    ColumnSpec { name: "prn", ty: ColumnType::Text },
    ColumnSpec { name: "put_call", ty: ColumnType::NullableText },
    ColumnSpec { name: "discretion", ty: ColumnType::Text },
    ColumnSpec { name: "other_manager", ty: ColumnType::NullableText },
    ColumnSpec { name: "voting_sole", ty: ColumnType::NullableInteger },
    ColumnSpec { name: "voting_shared", ty: ColumnType::NullableInteger },
    ColumnSpec { name: "voting_none", ty: ColumnType::NullableInteger },
    ColumnSpec { name: "fund_name", ty: ColumnType::Text },
    ColumnSpec { name: "trans_date", ty: ColumnType::Date },
    ColumnSpec { name: "date_insert", ty: ColumnType::Date },
];

/// A single cell value in the tabular hand-off.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Text(String),
    Integer(i64),
    Float(f64),
    Date(NaiveDate),
}

impl From<Option<String>> for CellValue {
    fn from(v: Option<String>) -> Self {
        v.map_or(Self::Null, Self::Text)
    }
}

impl From<Option<i64>> for CellValue {
    fn from(v: Option<i64>) -> Self {
        v.map_or(Self::Null, Self::Integer)
    }
}

impl HoldingRecord {
    /// Cell values aligned with [`COLUMNS`].
    pub fn to_cells(&self) -> Vec<CellValue> {
        vec![
            CellValue::Text(self.name_of_issuer.clone()),
            CellValue::Text(self.title_of_class.clone()),
            CellValue::Text(self.cusip.clone()),
            self.figi.clone().into(),
            CellValue::Float(self.value),
            self.prn_amt.into(),
            CellValue::Text(self.prn.clone()),
            self.put_call.clone().into(),
            CellValue::Text(self.discretion.clone()),
            self.other_manager.clone().into(),
            self.voting_sole.into(),
            self.voting_shared.into(),
            self.voting_none.into(),
            CellValue::Text(self.fund_name.clone()),
            CellValue::Date(self.trans_date),
            self.date_insert.map_or(CellValue::Null, CellValue::Date),
        ]
    }
}

// ---------------------------------------------------------------------------
// FundDataset / AggregatedDataset
// ---------------------------------------------------------------------------

/// One fund's holdings, owned by its pipeline task until aggregation.
#[derive(Debug, Clone)]
pub struct FundDataset {
    pub cik: Cik,
    pub fund_name: String,
    pub records: Vec<HoldingRecord>,
}

impl FundDataset {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Union of all successful per-fund datasets — the unit handed to external
/// consumers. Row order is unspecified (it follows task-completion order)
/// and no consumer may rely on it.
#[derive(Debug, Clone, Default)]
pub struct AggregatedDataset {
    pub records: Vec<HoldingRecord>,
}

impl AggregatedDataset {
    /// The hand-off schema: column names with explicit type hints.
    pub fn schema() -> &'static [ColumnSpec] {
        COLUMNS
    }

    /// Row-major cell values aligned with [`AggregatedDataset::schema`].
    pub fn to_rows(&self) -> Vec<Vec<CellValue>> {
        self.records.iter().map(HoldingRecord::to_cells).collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
