//! Monster search results.
//!
//! The search endpoint answers with XML shaped like
//! `<Data><Results><Monster>...</Monster>...</Results></Data>`.

use std::cmp::Ordering;

use serde::Deserialize;

use crate::error::ParseError;

/// One row of a monster keyword search.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SearchResultRow {
    #[serde(rename = "ID")]
    pub id: i32,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Level")]
    pub level: i32,
    #[serde(rename = "GroupRole", default)]
    pub group_role: String,
    #[serde(rename = "CombatRole", default)]
    pub combat_role: String,
    #[serde(rename = "SourceBook", default)]
    pub source_book: String,
}

#[derive(Debug, Deserialize)]
struct Data {
    #[serde(rename = "Results", default)]
    results: Results,
}

#[derive(Debug, Default, Deserialize)]
struct Results {
    #[serde(rename = "Monster", default)]
    monsters: Vec<SearchResultRow>,
}

/// Parse a search response body into rows ordered by level, then name.
pub fn parse_search_results(xml: &str) -> Result<Vec<SearchResultRow>, ParseError> {
    let data: Data = quick_xml::de::from_str(xml).map_err(ParseError::SearchResults)?;
    let mut rows = data.results.monsters;
    sort_rows(&mut rows);
    Ok(rows)
}

/// Order rows by level ascending, then name ascending.
pub fn sort_rows(rows: &mut [SearchResultRow]) {
    rows.sort_by(compare_rows);
}

fn compare_rows(a: &SearchResultRow, b: &SearchResultRow) -> Ordering {
    a.level.cmp(&b.level).then_with(|| a.name.cmp(&b.name))
}
