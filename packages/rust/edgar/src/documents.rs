//! Document-bundle index scanning.
//!
//! A filing's `-index.htm` page lists the bundle's documents in a
//! `table.tableFile`; the holdings live in the row describing itself as the
//! information table.

use scraper::{Html, Selector};

/// Find the information-table document's href within a bundle-index page.
///
/// Returns `None` when the listing table is absent or no row mentions an
/// information table; the caller turns that into `DocumentMissing`.
pub(crate) fn information_table_href(markup: &str) -> Option<String> {
    let doc = Html::parse_document(markup);
    let table_sel = Selector::parse("table.tableFile").expect("static selector");
    let row_sel = Selector::parse("tr").expect("static selector");
    let link_sel = Selector::parse("a[href]").expect("static selector");

    for table in doc.select(&table_sel) {
        for row in table.select(&row_sel) {
            let text = row.text().collect::<String>().to_lowercase();
            if !text.contains("information table") {
                continue;
            }
            if let Some(href) = row
                .select(&link_sel)
                .next()
                .and_then(|a| a.value().attr("href"))
            {
                return Some(href.to_string());
            }
        }
    }

    None
}
