// src/extractors/tabs.rs

use crate::extractors::document::Document;
use crate::extractors::payload::{self, cell_text, ChartPayload, Series};
use crate::extractors::section::{payload_script, read_heading, SectionHeading, SectionNavigator};
use crate::extractors::ExtractedTable;
use crate::table::Table;
use crate::utils::error::ExtractError;

// --- Constants ---
const SCATTER: &str = "scatter";
const BAR: &str = "bar";
const NUMERATOR_MARKER: &str = "Numerator:";
const DENOMINATOR_MARKER: &str = "Denominator:";

pub const PLAIN_COLUMNS: [&str; 7] = [
    "COSD_SECTION_ID",
    "COSD_SECTION_NUM",
    "COSD_SECTION_NAME",
    "COSD_PLOT_NAME",
    "CATEGORY",
    "X",
    "Y",
];
pub const HOVER_COLUMNS: [&str; 2] = ["NUMERATOR", "DENOMINATOR"];

/// Pulls the chart series out of every tab of a report.
pub struct TabExtractor;

impl TabExtractor {
    pub fn new() -> Self { Self {} }

    /// Extracts one table per tab node, keyed by the tab id with hyphens
    /// replaced by underscores.
    pub fn extract_all(&self, document: &Document) -> Result<Vec<ExtractedTable>, ExtractError> {
        let navigator = SectionNavigator::new(document);
        let mut tables = Vec::new();

        for tab_id in navigator.tab_nodes()? {
            let table = self.extract_tab(&navigator, &tab_id)?;
            tracing::debug!("Extracted {} rows from tab '{}'", table.len(), tab_id);
            tables.push(ExtractedTable {
                dataset_id: tab_id.replace('-', "_"),
                table,
            });
        }

        Ok(tables)
    }

    /// Decodes a single tab's chart into series records.
    pub fn extract_tab(&self, navigator: &SectionNavigator<'_>, tab_id: &str) -> Result<Table, ExtractError> {
        let element = navigator.element(tab_id)?;
        let heading = read_heading(tab_id, element)?;
        let raw = payload_script(tab_id, element)?;
        let chart: ChartPayload = payload::decode(tab_id, &raw)?;

        let plot_name = plot_name(chart.layout.title.text());

        let chart_type = chart
            .data
            .first()
            .ok_or_else(|| ExtractError::PayloadNotFound(format!("'{}' chart has no series", tab_id)))?
            .kind
            .clone()
            .unwrap_or_default();

        let series: Vec<Series> = match chart_type.as_str() {
            // The first scatter trace is the reference line.
            SCATTER => chart.data.into_iter().skip(1).collect(),
            BAR => chart.data,
            other => {
                return Err(ExtractError::UnsupportedChart {
                    section_id: tab_id.to_string(),
                    chart_type: other.to_string(),
                })
            }
        };

        let hover_mode = chart_type == BAR && series.iter().any(|s| s.hovertemplate.is_some());
        let context = RowContext { tab_id, heading: &heading, plot_name: &plot_name };

        let mut table = if hover_mode {
            Table::new(PLAIN_COLUMNS.iter().chain(HOVER_COLUMNS.iter()).copied())
        } else {
            Table::new(PLAIN_COLUMNS)
        };

        for entry in series {
            let rows = if hover_mode {
                hover_rows(&context, entry)?
            } else {
                plain_rows(&context, entry)?
            };
            for row in rows {
                table
                    .push_row(row)
                    .map_err(|e| ExtractError::SeriesShape(format!("'{}': {}", tab_id, e)))?;
            }
        }

        Ok(table)
    }
}

struct RowContext<'a> {
    tab_id: &'a str,
    heading: &'a SectionHeading,
    plot_name: &'a str,
}

impl RowContext<'_> {
    fn row(&self, category: &str, x: String, y: String) -> Vec<String> {
        vec![
            self.tab_id.to_string(),
            self.heading.section_num.clone(),
            self.heading.section_name.clone(),
            self.plot_name.to_string(),
            category.to_string(),
            x,
            y,
        ]
    }
}

fn category(series: &Series) -> String {
    series.name.as_ref().map(cell_text).unwrap_or_default()
}

fn co_indexed(context: &RowContext<'_>, category: &str, series: Series) -> Result<Vec<(String, String)>, ExtractError> {
    let xs = series.x.into_vec();
    let ys = series.y.into_vec();
    if xs.len() != ys.len() {
        return Err(ExtractError::SeriesShape(format!(
            "'{}' series '{}' has {} x values but {} y values",
            context.tab_id, category, xs.len(), ys.len()
        )));
    }
    Ok(xs.iter().zip(ys.iter()).map(|(x, y)| (cell_text(x), cell_text(y))).collect())
}

fn plain_rows(context: &RowContext<'_>, series: Series) -> Result<Vec<Vec<String>>, ExtractError> {
    let category = category(&series);
    let points = co_indexed(context, &category, series)?;
    Ok(points.into_iter().map(|(x, y)| context.row(&category, x, y)).collect())
}

fn hover_rows(context: &RowContext<'_>, mut series: Series) -> Result<Vec<Vec<String>>, ExtractError> {
    let category = category(&series);
    let hovers = series
        .hovertemplate
        .take()
        .ok_or_else(|| {
            ExtractError::HoverFieldFormat(format!(
                "'{}' series '{}' has no hovertemplate",
                context.tab_id, category
            ))
        })?
        .into_vec();

    let points = co_indexed(context, &category, series)?;
    if hovers.len() != points.len() {
        return Err(ExtractError::SeriesShape(format!(
            "'{}' series '{}' has {} points but {} hover texts",
            context.tab_id, category, points.len(), hovers.len()
        )));
    }

    points
        .into_iter()
        .zip(hovers.iter())
        .map(|((x, y), hover)| {
            let (numerator, denominator) = hover_fields(hover).ok_or_else(|| {
                ExtractError::HoverFieldFormat(format!(
                    "'{}' hover text lacks Numerator/Denominator: {:?}",
                    context.tab_id, hover
                ))
            })?;
            let mut row = context.row(&category, x, y);
            row.push(numerator);
            row.push(denominator);
            Ok(row)
        })
        .collect()
}

/// Human readable plot name from a chart title such as
/// `"Figure 3 (2023) Stage at diagnosis"`: the text after the first `)`
/// that follows the first `(`. Titles without brackets are used whole.
pub fn plot_name(title: &str) -> String {
    let Some((_, after_open)) = title.split_once('(') else {
        return title.to_string();
    };
    let segment = after_open.split('(').next().unwrap_or_default();
    match segment.split(')').nth(1) {
        Some(name) => name.trim().to_string(),
        None => {
            tracing::debug!("Plot title has '(' without ')', using whole title: {:?}", title);
            title.trim().to_string()
        }
    }
}

/// Numerator and denominator from a hover string, each running from its
/// marker to the next `<`.
pub fn hover_fields(hover: &str) -> Option<(String, String)> {
    Some((field_after(hover, NUMERATOR_MARKER)?, field_after(hover, DENOMINATOR_MARKER)?))
}

fn field_after(text: &str, marker: &str) -> Option<String> {
    let (_, rest) = text.split_once(marker)?;
    let value = rest.split('<').next().unwrap_or_default();
    Some(value.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn tab_html(payload: &str) -> String {
        format!(
            r#"<html><body>
            <div id="incidence" class="section level2"><h2>1 Incidence</h2>
              <div id="by-site" class="section level3 tabset"><h3>1.1 By site</h3>
                <div id="lung-tab" class="section level4">
                  <h4>1.1.1 Lung cancer rates</h4>
                  <div class="plotly html-widget"></div>
                  <script type="application/json" data-for="htmlwidget-1">{}</script>
                </div>
              </div>
            </div>
            </body></html>"#,
            payload
        )
    }

    fn extract(payload: &str) -> Result<Table, ExtractError> {
        let doc = Document::parse_str(&tab_html(payload)).unwrap();
        let nav = SectionNavigator::new(&doc);
        TabExtractor::new().extract_tab(&nav, "lung-tab")
    }

    #[test]
    fn scatter_skips_first_series() {
        let table = extract(
            r#"{"x":{"layout":{"title":{"text":"Figure 1 (Lung) Rates over time"}},"data":[
                {"type":"scatter","name":"Target","x":["ignored"],"y":[99]},
                {"type":"scatter","name":"Trust","x":["2022","2023"],"y":[1.5,2]}
            ]}}"#,
        )
        .unwrap();

        assert_eq!(table.columns(), PLAIN_COLUMNS);
        assert_eq!(
            table.rows().to_vec(),
            vec![
                vec!["lung-tab", "1.1.1", "Lung cancer rates", "Rates over time", "Trust", "2022", "1.5"],
                vec!["lung-tab", "1.1.1", "Lung cancer rates", "Rates over time", "Trust", "2023", "2"],
            ]
            .into_iter()
            .map(|row| row.into_iter().map(String::from).collect::<Vec<_>>())
            .collect::<Vec<_>>()
        );
    }

    #[test]
    fn bar_hover_text_yields_numerator_and_denominator() {
        let table = extract(
            r#"{"x":{"layout":{"title":"Stage"},"data":[
                {"type":"bar","name":"Early","x":["Q1"],"y":[12],
                 "hovertemplate":["Rate: 12%<br>Numerator: 12<br>Denominator: 100<extra></extra>"]}
            ]}}"#,
        )
        .unwrap();

        assert_eq!(table.columns().len(), 9);
        assert_eq!(table.column("NUMERATOR"), Some(vec!["12"]));
        assert_eq!(table.column("DENOMINATOR"), Some(vec!["100"]));
        assert_eq!(table.column("COSD_PLOT_NAME"), Some(vec!["Stage"]));
    }

    #[test]
    fn bar_without_hover_is_plain() {
        let table = extract(
            r#"{"x":{"layout":{"title":"Counts"},"data":[
                {"type":"bar","name":"A","x":["a","b"],"y":[1,2]},
                {"type":"bar","name":"B","x":["a","b"],"y":[3,4]}
            ]}}"#,
        )
        .unwrap();
        assert_eq!(table.columns(), PLAIN_COLUMNS);
        assert_eq!(table.column("CATEGORY"), Some(vec!["A", "A", "B", "B"]));
    }

    #[test]
    fn scatter_hover_text_is_ignored() {
        let table = extract(
            r#"{"x":{"layout":{"title":"T"},"data":[
                {"type":"scatter","name":"line","x":[0],"y":[0]},
                {"type":"scatter","name":"A","x":[1],"y":[2],"hovertemplate":"no markers here"}
            ]}}"#,
        )
        .unwrap();
        assert_eq!(table.columns(), PLAIN_COLUMNS);
    }

    #[test]
    fn mismatched_series_lengths_fail() {
        let err = extract(
            r#"{"x":{"layout":{"title":"T"},"data":[{"type":"bar","name":"A","x":[1,2],"y":[1]}]}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ExtractError::SeriesShape(_)));
    }

    #[test]
    fn hover_without_markers_fails() {
        let err = extract(
            r#"{"x":{"layout":{"title":"T"},"data":[
                {"type":"bar","name":"A","x":[1],"y":[1],"hovertemplate":["Numerator: 1"]}
            ]}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ExtractError::HoverFieldFormat(_)));
    }

    #[test]
    fn unknown_chart_type_is_rejected() {
        let err = extract(r#"{"x":{"layout":{"title":"T"},"data":[{"type":"pie","x":[],"y":[]}]}}"#)
            .unwrap_err();
        assert!(matches!(err, ExtractError::UnsupportedChart { .. }));
    }

    #[test]
    fn missing_payload_is_reported() {
        let doc = Document::parse_str(
            r#"<div id="a" class="section level4"><h4>1 A</h4><script>var x = 1;</script></div>"#,
        )
        .unwrap();
        let nav = SectionNavigator::new(&doc);
        let err = TabExtractor::new().extract_tab(&nav, "a").unwrap_err();
        assert!(matches!(err, ExtractError::PayloadNotFound(_)));
    }

    #[test]
    fn extract_all_keys_tables_by_underscored_id() {
        let doc = Document::parse_str(&tab_html(
            r#"{"x":{"layout":{"title":"T"},"data":[{"type":"bar","name":"A","x":[1],"y":[2]}]}}"#,
        ))
        .unwrap();
        let tables = TabExtractor::new().extract_all(&doc).unwrap();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].dataset_id, "lung_tab");
    }

    #[test]
    fn plot_name_follows_bracket_rule() {
        assert_eq!(plot_name("Figure 2 (2023) Staging completeness"), "Staging completeness");
        assert_eq!(plot_name("No brackets at all"), "No brackets at all");
        assert_eq!(plot_name("A (b) c) d"), "c");
        assert_eq!(plot_name("A (b) c (d) e"), "c");
        assert_eq!(plot_name("Broken (title"), "Broken (title");
    }

    #[test]
    fn hover_fields_stop_at_next_tag() {
        assert_eq!(
            hover_fields("Numerator: 12<br>Denominator: 100"),
            Some(("12".to_string(), "100".to_string()))
        );
        assert_eq!(hover_fields("Denominator: 5"), None);
    }
}
