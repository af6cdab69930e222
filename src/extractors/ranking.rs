// src/extractors/ranking.rs

use crate::extractors::document::{class_tokens, Document};
use crate::extractors::payload::{self, cell_text, RankingPayload};
use crate::extractors::section::{is_section_at, payload_script, read_heading};
use crate::extractors::ExtractedTable;
use crate::table::Table;
use crate::utils::error::ExtractError;

// --- Constants ---
const APPENDICES_ID: &str = "appendices";
const RANKING_ID_SUFFIX: &str = "overall-ranking";
const RANKING_LEVEL: u32 = 4;

pub const IDENTITY_COLUMNS: [&str; 3] = ["COSD_SECTION_ID", "COSD_SECTION_NUM", "COSD_SECTION_NAME"];

/// Where the ranking table's column names live. Older reports only carried
/// them as `<th>` cells in the widget's HTML container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnSource {
    LegacyContainer(String),
    ColumnDefs(Vec<String>),
}

impl ColumnSource {
    fn from_payload(section_id: &str, payload: &RankingPayload) -> Result<Self, ExtractError> {
        let defs = &payload.options.column_defs;
        if defs.len() <= 1 {
            let container = payload.container.clone().ok_or_else(|| {
                ExtractError::PayloadNotFound(format!("'{}' legacy table has no container HTML", section_id))
            })?;
            return Ok(ColumnSource::LegacyContainer(container));
        }

        // The first definition describes the row index.
        defs[1..]
            .iter()
            .enumerate()
            .map(|(i, def)| {
                def.name.clone().ok_or_else(|| {
                    ExtractError::PayloadNotFound(format!("'{}' columnDefs[{}] has no name", section_id, i + 1))
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(ColumnSource::ColumnDefs)
    }

    /// Raw header names, before normalisation.
    pub fn names(&self) -> Vec<String> {
        match self {
            ColumnSource::LegacyContainer(html) => html
                .split("<th>")
                .skip(1)
                .map(|cell| cell.split("</th>").next().unwrap_or_default().to_string())
                .collect(),
            ColumnSource::ColumnDefs(names) => names.clone(),
        }
    }
}

/// Turns a report header into a warehouse column name.
pub fn normalize_column_name(name: &str) -> String {
    name.to_uppercase().replace(' ', "_").replace("(%)", "PER")
}

/// Extracts the single "overall ranking" appendix table.
pub struct RankingExtractor;

impl RankingExtractor {
    pub fn new() -> Self { Self {} }

    pub fn extract(&self, document: &Document) -> Result<ExtractedTable, ExtractError> {
        let appendices = document
            .find_first("div", APPENDICES_ID)
            .ok_or_else(|| ExtractError::SectionNotFound(format!("no div with id '{}'", APPENDICES_ID)))?;

        let candidates = document
            .find_all_in(appendices, "div", |classes| is_section_at(classes, RANKING_LEVEL))
            .into_iter()
            .filter(|el| el.value().id().is_some_and(|id| id.ends_with(RANKING_ID_SUFFIX)))
            .collect::<Vec<_>>();

        // Ambiguous documents resolve to the first match.
        let section = match candidates.as_slice() {
            [] => return Err(ExtractError::RankingTableNotFound(APPENDICES_ID.to_string())),
            [only] => *only,
            [first, ..] => {
                tracing::warn!(
                    "Found {} overall ranking sections, using the first ('{}')",
                    candidates.len(),
                    first.value().id().unwrap_or_default()
                );
                *first
            }
        };

        let section_id = section.value().id().unwrap_or_default().to_string();
        tracing::debug!("Ranking section '{}' classes {:?}", section_id, class_tokens(section));

        let heading = read_heading(&section_id, section)?;
        let raw = payload_script(&section_id, section)?;
        let ranking: RankingPayload = payload::decode(&section_id, &raw)?;

        let names = ColumnSource::from_payload(&section_id, &ranking)?
            .names()
            .iter()
            .map(|name| normalize_column_name(name))
            .collect::<Vec<_>>();

        let mut table = transpose(names, ranking.data)?;

        let dataset_id = section_id.replace('-', "_");
        table
            .prepend_columns(&[
                (IDENTITY_COLUMNS[0], dataset_id.as_str()),
                (IDENTITY_COLUMNS[1], heading.section_num.as_str()),
                (IDENTITY_COLUMNS[2], heading.section_name.as_str()),
            ])
            .map_err(|e| ExtractError::PayloadNotFound(format!("'{}': {}", section_id, e)))?;

        tracing::info!("Extracted overall ranking '{}' with {} rows", dataset_id, table.len());
        Ok(ExtractedTable { dataset_id, table })
    }
}

/// Builds rows from column-major data. Short columns are padded with empty cells.
fn transpose(names: Vec<String>, columns: Vec<payload::OneOrMany<serde_json::Value>>) -> Result<Table, ExtractError> {
    if columns.len() != names.len() {
        return Err(ExtractError::ColumnCountMismatch {
            names: names.len(),
            columns: columns.len(),
        });
    }

    let columns: Vec<Vec<String>> = columns
        .into_iter()
        .map(|column| column.into_vec().iter().map(cell_text).collect())
        .collect();
    let height = columns.iter().map(Vec::len).max().unwrap_or(0);

    let mut table = Table::new(names);
    for i in 0..height {
        let row = columns
            .iter()
            .map(|column| column.get(i).cloned().unwrap_or_default())
            .collect();
        table
            .push_row(row)
            .map_err(|e| ExtractError::SeriesShape(e.to_string()))?;
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn report(ranking_sections: &str) -> String {
        format!(
            r#"<html><body>
            <div id="appendices" class="section level2"><h2>A Appendices</h2>
              <div id="a1" class="section level3"><h3>A.1 Tables</h3>
                {}
              </div>
            </div>
            </body></html>"#,
            ranking_sections
        )
    }

    fn section(id: &str, payload: &str) -> String {
        format!(
            r#"<div id="{}" class="section level4">
                 <h4>A.1.1 Overall Ranking</h4>
                 <script type="application/json" data-for="htmlwidget-9">{}</script>
               </div>"#,
            id, payload
        )
    }

    const CURRENT: &str = r#"{"x":{
        "options":{"columnDefs":[{"targets":0},{"name":"Org Code"},{"name":"Cancer Site"},{"name":"Staged (%)"},{"name":"Rank"}]},
        "container":"<table></table>",
        "data":[["R1","R2","R3","R4"],["Lung","Lung","Skin","Skin"],[90.1,80,70,60],[1,2,3,4]]
    }}"#;

    #[test]
    fn current_layout_gives_identity_plus_payload_columns() {
        let doc = Document::parse_str(&report(&section("a1-1-overall-ranking", CURRENT))).unwrap();
        let extracted = RankingExtractor::new().extract(&doc).unwrap();

        assert_eq!(extracted.dataset_id, "a1_1_overall_ranking");
        assert_eq!(
            extracted.table.columns(),
            [
                "COSD_SECTION_ID",
                "COSD_SECTION_NUM",
                "COSD_SECTION_NAME",
                "ORG_CODE",
                "CANCER_SITE",
                "STAGED_PER",
                "RANK"
            ]
        );
        assert_eq!(extracted.table.len(), 4);
        assert_eq!(
            extracted.table.rows()[0],
            ["a1_1_overall_ranking", "A.1.1", "Overall Ranking", "R1", "Lung", "90.1", "1"]
        );
    }

    #[test]
    fn legacy_layout_reads_th_cells() {
        let legacy = r#"{"x":{
            "options":{"columnDefs":[{"className":"dt-right","targets":[1]}]},
            "container":"<table class=\"display\"><thead><tr><th>Org</th><th>Score (%)</th></tr></thead></table>",
            "data":[["X","Y"],[1,2]]
        }}"#;
        let doc = Document::parse_str(&report(&section("legacy-overall-ranking", legacy))).unwrap();
        let extracted = RankingExtractor::new().extract(&doc).unwrap();
        assert_eq!(&extracted.table.columns()[3..], ["ORG", "SCORE_PER"]);
        assert_eq!(extracted.table.column("SCORE_PER"), Some(vec!["1", "2"]));
    }

    #[test]
    fn first_of_several_matches_is_used() {
        let html = report(&format!(
            "{}{}",
            section("first-overall-ranking", CURRENT),
            section("second-overall-ranking", CURRENT)
        ));
        let doc = Document::parse_str(&html).unwrap();
        let extracted = RankingExtractor::new().extract(&doc).unwrap();
        assert_eq!(extracted.dataset_id, "first_overall_ranking");
    }

    #[test]
    fn missing_sections_are_reported() {
        let doc = Document::parse_str("<div id='intro' class='section level2'></div>").unwrap();
        let err = RankingExtractor::new().extract(&doc).unwrap_err();
        assert!(matches!(err, ExtractError::SectionNotFound(_)));

        let doc = Document::parse_str(&report(&section("not-the-ranking", CURRENT))).unwrap();
        let err = RankingExtractor::new().extract(&doc).unwrap_err();
        assert!(matches!(err, ExtractError::RankingTableNotFound(_)));
    }

    #[test]
    fn column_count_must_match_data() {
        let short = r#"{"x":{"options":{"columnDefs":[{},{"name":"A"},{"name":"B"}]},"data":[[1,2]]}}"#;
        let doc = Document::parse_str(&report(&section("x-overall-ranking", short))).unwrap();
        let err = RankingExtractor::new().extract(&doc).unwrap_err();
        assert!(matches!(err, ExtractError::ColumnCountMismatch { names: 2, columns: 1 }));
    }

    #[test]
    fn normalizing_twice_changes_nothing() {
        for name in ["Staged (%)", "org code", "Already_NORMAL", "  spaced  (%) (%)"] {
            let once = normalize_column_name(name);
            assert_eq!(normalize_column_name(&once), once);
        }
        assert_eq!(normalize_column_name("Staged (%)"), "STAGED_PER");
    }
}
